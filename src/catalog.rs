//! The fixed-size slotted catalog at the front of the file: one
//! [`TableDescriptor`] per occupied slot, in the contiguous prefix
//! `[0, table_count)`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use zerocopy::{AsBytes, FromBytes};

use crate::codec::{
    decode_name, encode_name, ColumnEntry, TableDescriptorPrefix, COLUMN_ENTRY_SIZE,
    TABLE_DESCRIPTOR_PREFIX_SIZE,
};
use crate::error::{Error, Result};
use crate::layout::{catalog_slot_offset, ColumnType, MAX_COLUMNS, NAME_MAX, TABLE_META_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub name: String,
    pub first_page: u16,
    pub last_page: u16,
    pub record_size: u16,
    pub columns: Vec<Column>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Reads and decodes the catalog slot at `index`, whether or not it is
/// currently occupied.
fn read_slot(file: &mut File, index: usize) -> Result<TableDescriptor> {
    file.seek(SeekFrom::Start(catalog_slot_offset(index)))?;

    let mut prefix_bytes = [0u8; TABLE_DESCRIPTOR_PREFIX_SIZE as usize];
    file.read_exact(&mut prefix_bytes)?;
    let prefix = TableDescriptorPrefix::read_from(&prefix_bytes[..]).expect("fixed-size prefix");

    let column_count = prefix.column_count as usize;
    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let mut entry_bytes = [0u8; COLUMN_ENTRY_SIZE as usize];
        file.read_exact(&mut entry_bytes)?;
        let entry = ColumnEntry::read_from(&entry_bytes[..]).expect("fixed-size entry");
        let ty = ColumnType::from_code(entry.type_code)
            .ok_or(Error::UnknownType { code: entry.type_code })?;
        columns.push(Column {
            name: decode_name(&entry.name),
            ty,
        });
    }

    Ok(TableDescriptor {
        name: decode_name(&prefix.name),
        first_page: prefix.first_page.get(),
        last_page: prefix.last_page.get(),
        record_size: prefix.record_size.get(),
        columns,
    })
}

/// Scans occupied slots `[0, table_count)` for `name`, returning its slot
/// index alongside the decoded descriptor. The first match wins; duplicate
/// names are permitted by [`create_table`] and never detected here.
pub fn find_table(
    file: &mut File,
    table_count: u8,
    name: &str,
) -> Result<(usize, TableDescriptor)> {
    for index in 0..table_count as usize {
        let descriptor = read_slot(file, index)?;
        if descriptor.name == name {
            return Ok((index, descriptor));
        }
    }
    Err(Error::TableNotFound(name.to_owned()))
}

/// Encodes and writes a full catalog slot (prefix, column entries, and
/// zero-padding out to [`TABLE_META_SIZE`]).
pub fn write_slot(file: &mut File, index: usize, descriptor: &TableDescriptor) -> Result<()> {
    let name = encode_name(&descriptor.name).ok_or_else(|| Error::NameTooLong {
        name: descriptor.name.clone(),
        max: NAME_MAX,
    })?;

    let prefix = TableDescriptorPrefix {
        name,
        first_page: descriptor.first_page.into(),
        last_page: descriptor.last_page.into(),
        record_size: descriptor.record_size.into(),
        column_count: descriptor.columns.len() as u8,
    };

    let mut slot = Vec::with_capacity(TABLE_META_SIZE as usize);
    slot.extend_from_slice(prefix.as_bytes());
    for column in &descriptor.columns {
        let entry = ColumnEntry {
            name: encode_name(&column.name).ok_or_else(|| Error::NameTooLong {
                name: column.name.clone(),
                max: NAME_MAX,
            })?,
            type_code: column.ty.code(),
        };
        slot.extend_from_slice(entry.as_bytes());
    }
    slot.resize(TABLE_META_SIZE as usize, 0);

    file.seek(SeekFrom::Start(catalog_slot_offset(index)))?;
    file.write_all(&slot)?;
    Ok(())
}

/// Updates only the `last_page` field of an already-written slot, leaving
/// the rest untouched (used by insert's page-spill path).
pub fn write_last_page(file: &mut File, index: usize, last_page: u16) -> Result<()> {
    let offset = catalog_slot_offset(index) + NAME_MAX as u64 + 2;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&last_page.to_le_bytes())?;
    Ok(())
}

/// Validates a prospective column list against the catalog's capacity and
/// naming rules, without writing anything.
pub fn validate_columns(columns: &[(String, ColumnType)]) -> Result<()> {
    if columns.len() > MAX_COLUMNS {
        return Err(Error::TooManyColumns { max: MAX_COLUMNS });
    }
    for (name, _) in columns {
        if name.as_bytes().len() > NAME_MAX {
            return Err(Error::NameTooLong {
                name: name.clone(),
                max: NAME_MAX,
            });
        }
    }
    Ok(())
}

/// Shifts every slot after `removed_index` down by one, then zeroes the
/// vacated trailing slot. `table_count` is the count *before* removal.
pub fn compact_after_remove(file: &mut File, table_count: u8, removed_index: usize) -> Result<()> {
    let following = table_count as usize - removed_index - 1;
    if following > 0 {
        let mut remaining = vec![0u8; following * TABLE_META_SIZE as usize];
        file.seek(SeekFrom::Start(catalog_slot_offset(removed_index + 1)))?;
        file.read_exact(&mut remaining)?;
        file.seek(SeekFrom::Start(catalog_slot_offset(removed_index)))?;
        file.write_all(&remaining)?;
    }

    let last_index = table_count as usize - 1;
    file.seek(SeekFrom::Start(catalog_slot_offset(last_index)))?;
    file.write_all(&vec![0u8; TABLE_META_SIZE as usize])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::tempdir;

    fn scratch_file() -> (tempfile::TempDir, File) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.db");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .unwrap();
        file.set_len(catalog_slot_offset(MAX_COLUMNS + 1)).unwrap();
        (dir, file)
    }

    fn descriptor(name: &str, page: u16) -> TableDescriptor {
        TableDescriptor {
            name: name.to_owned(),
            first_page: page,
            last_page: page,
            record_size: 259,
            columns: vec![
                Column { name: "id".into(), ty: ColumnType::Int },
                Column { name: "name".into(), ty: ColumnType::Str },
            ],
        }
    }

    #[test]
    fn write_then_find_round_trips_a_slot() {
        let (_dir, mut file) = scratch_file();
        write_slot(&mut file, 0, &descriptor("widgets", 3)).unwrap();

        let (index, found) = find_table(&mut file, 1, "widgets").unwrap();
        assert_eq!(index, 0);
        assert_eq!(found.first_page, 3);
        assert_eq!(found.columns.len(), 2);
        assert_eq!(found.columns[1].name, "name");
    }

    #[test]
    fn find_table_reports_table_not_found_for_an_absent_name() {
        let (_dir, mut file) = scratch_file();
        write_slot(&mut file, 0, &descriptor("widgets", 3)).unwrap();

        assert!(matches!(
            find_table(&mut file, 1, "gadgets"),
            Err(Error::TableNotFound(_))
        ));
    }

    #[test]
    fn duplicate_names_resolve_to_the_lowest_indexed_slot() {
        let (_dir, mut file) = scratch_file();
        write_slot(&mut file, 0, &descriptor("t", 1)).unwrap();
        write_slot(&mut file, 1, &descriptor("t", 2)).unwrap();

        let (index, found) = find_table(&mut file, 2, "t").unwrap();
        assert_eq!(index, 0);
        assert_eq!(found.first_page, 1);
    }

    #[test]
    fn compact_after_remove_shifts_trailing_slots_down_and_zeroes_the_tail() {
        let (_dir, mut file) = scratch_file();
        write_slot(&mut file, 0, &descriptor("a", 1)).unwrap();
        write_slot(&mut file, 1, &descriptor("b", 2)).unwrap();
        write_slot(&mut file, 2, &descriptor("c", 3)).unwrap();

        // remove "b" at index 1; "c" should shift down into slot 1.
        compact_after_remove(&mut file, 3, 1).unwrap();

        let (index, found) = find_table(&mut file, 2, "c").unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.first_page, 3);

        assert!(matches!(
            find_table(&mut file, 2, "b"),
            Err(Error::TableNotFound(_))
        ));

        let mut tail = vec![0u8; TABLE_META_SIZE as usize];
        file.seek(SeekFrom::Start(catalog_slot_offset(2))).unwrap();
        file.read_exact(&mut tail).unwrap();
        assert!(tail.iter().all(|&b| b == 0));
    }

    #[test]
    fn validate_columns_enforces_the_cap_and_name_length() {
        assert!(validate_columns(&[("ok".to_owned(), ColumnType::Int)]).is_ok());

        let too_many: Vec<(String, ColumnType)> = (0..(MAX_COLUMNS + 1))
            .map(|i| (format!("c{i}"), ColumnType::Int))
            .collect();
        assert!(matches!(
            validate_columns(&too_many),
            Err(Error::TooManyColumns { .. })
        ));

        assert!(matches!(
            validate_columns(&[("x".repeat(17), ColumnType::Int)]),
            Err(Error::NameTooLong { .. })
        ));
    }
}
