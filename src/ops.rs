//! The five DML operations plus `create_table`, implemented against
//! [`crate::db::Database`], [`crate::catalog`], [`crate::pager`], and
//! [`crate::record`].

use std::collections::VecDeque;
use std::fs::File;

use tracing::instrument;

use crate::catalog::{self, Column, TableDescriptor};
use crate::codec::PageHeader;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::layout::{ColumnType, DEAD_END, MAX_TABLES, NAME_MAX, PAGE_HEADER_SIZE, PAGE_SIZE};
use crate::pager;
use crate::record;
use crate::value::{AcceptAll, Cell, Predicate, Row};

/// A projected row: the requested columns, in the order they were
/// requested, each paired with its decoded value.
pub type ProjectedRow = Vec<(String, Cell)>;

impl Database {
    /// Creates a new table. Column order is preserved; it determines both
    /// the on-disk record layout and the default `"*"` projection order.
    #[instrument(skip(self, columns), fields(table = name))]
    pub fn create_table(&self, name: &str, columns: &[(String, ColumnType)]) -> Result<()> {
        if name.as_bytes().len() > NAME_MAX {
            return Err(Error::NameTooLong {
                name: name.to_owned(),
                max: NAME_MAX,
            });
        }
        catalog::validate_columns(columns)?;

        let mut locked = self.open_write()?;

        let mut header = pager::read_global_header(&mut locked.file)?;
        if header.table_count as usize >= MAX_TABLES {
            return Err(Error::CatalogFull { max: MAX_TABLES });
        }

        let record_size: u64 = columns.iter().map(|(_, ty)| ty.size()).sum();
        let page = pager::allocate_page(&mut locked.file, &mut header)?;

        let descriptor = TableDescriptor {
            name: name.to_owned(),
            first_page: page as u16,
            last_page: page as u16,
            record_size: record_size as u16,
            columns: columns
                .iter()
                .map(|(name, ty)| Column {
                    name: name.clone(),
                    ty: *ty,
                })
                .collect(),
        };

        catalog::write_slot(&mut locked.file, header.table_count as usize, &descriptor)?;
        header.table_count += 1;
        pager::write_global_header(&mut locked.file, &header)?;

        locked.sync_if_configured()?;
        Ok(())
    }

    /// Appends one tuple to the end of a table's page chain, spilling onto
    /// a freshly allocated page when the tail is full.
    #[instrument(skip(self, values), fields(table))]
    pub fn insert(&self, table: &str, values: &[Cell]) -> Result<()> {
        let mut locked = self.open_write()?;

        let mut header = pager::read_global_header(&mut locked.file)?;
        let (slot_index, descriptor) =
            catalog::find_table(&mut locked.file, header.table_count, table)?;

        if values.len() != descriptor.columns.len() {
            return Err(Error::Arity {
                expected: descriptor.columns.len(),
                got: values.len(),
            });
        }
        let packed = record::pack(&descriptor.columns, values)?;
        let record_size = descriptor.record_size as u64;

        let tail = descriptor.last_page as u32;
        let tail_header = pager::read_page_header(&mut locked.file, tail)?;
        if tail_header.next_page.get() != DEAD_END {
            return Err(Error::Corrupt(format!(
                "table {table:?}'s last_page is not chain-terminal"
            )));
        }
        let count = tail_header.record_count.get();

        if PAGE_HEADER_SIZE + (count as u64 + 1) * record_size <= PAGE_SIZE {
            pager::write_record_count(&mut locked.file, tail, count + 1)?;
            pager::write_record_at(&mut locked.file, tail, record_size, count as u64, &packed)?;
        } else {
            let spilled = pager::allocate_page(&mut locked.file, &mut header)?;
            pager::write_next_page(&mut locked.file, tail, spilled)?;
            catalog::write_last_page(&mut locked.file, slot_index, spilled as u16)?;
            pager::write_page_header(&mut locked.file, spilled, &PageHeader::dead_tail(1))?;
            pager::write_record_at(&mut locked.file, spilled, record_size, 0, &packed)?;
            pager::write_global_header(&mut locked.file, &header)?;
        }

        locked.sync_if_configured()?;
        Ok(())
    }

    /// Scans a table's whole chain, returning the column types and rows for
    /// the requested projection among rows matching `predicate`.
    #[instrument(skip(self, predicate), fields(table))]
    pub fn select(
        &self,
        table: &str,
        columns: &[String],
        predicate: &dyn Predicate,
    ) -> Result<(Vec<(String, ColumnType)>, Vec<ProjectedRow>)> {
        let mut locked = self.open_read()?;

        let header = pager::read_global_header(&mut locked.file)?;
        let (_, descriptor) = catalog::find_table(&mut locked.file, header.table_count, table)?;

        let projected: Vec<&Column> = if columns.len() == 1 && columns[0] == "*" {
            descriptor.columns.iter().collect()
        } else {
            columns
                .iter()
                .map(|name| {
                    descriptor.column(name).ok_or_else(|| Error::UnknownColumn {
                        table: table.to_owned(),
                        column: name.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };
        let column_types = projected.iter().map(|c| (c.name.clone(), c.ty)).collect();

        let rows = scan_chain(&mut locked.file, &descriptor)?;
        let projected_rows = rows
            .into_iter()
            .filter(|row| predicate.evaluate(row))
            .map(|row| {
                projected
                    .iter()
                    .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap()))
                    .collect()
            })
            .collect();

        Ok((column_types, projected_rows))
    }

    /// Rewrites every record whose decoded row matches `predicate`, merging
    /// in `assignments`. Record count and page layout are unaffected.
    #[instrument(skip(self, assignments, predicate), fields(table))]
    pub fn update(&self, table: &str, assignments: &Row, predicate: &dyn Predicate) -> Result<()> {
        let mut locked = self.open_write()?;

        let header = pager::read_global_header(&mut locked.file)?;
        let (_, descriptor) = catalog::find_table(&mut locked.file, header.table_count, table)?;

        for (column_name, value) in assignments {
            let column = descriptor
                .column(column_name)
                .ok_or_else(|| Error::UnknownColumn {
                    table: table.to_owned(),
                    column: column_name.clone(),
                })?;
            if !value.matches_type(column.ty) {
                return Err(Error::Type {
                    column: column.name.clone(),
                    expected: type_name(column.ty),
                });
            }
        }

        let record_size = descriptor.record_size as u64;
        let mut page = descriptor.first_page as u32;
        loop {
            let page_header = pager::read_page_header(&mut locked.file, page)?;
            let count = page_header.record_count.get();
            if count == 0 {
                break;
            }

            let mut body =
                pager::read_page_body(&mut locked.file, page, count as u64 * record_size)?;
            let mut changed = false;
            for index in 0..count as u64 {
                let start = (index * record_size) as usize;
                let end = start + record_size as usize;
                let mut row = record::unpack(&descriptor.columns, &body[start..end]);
                if predicate.evaluate(&row) {
                    for (key, value) in assignments {
                        row.insert(key.clone(), value.clone());
                    }
                    let repacked = record::pack_row(&descriptor.columns, &row)?;
                    body[start..end].copy_from_slice(&repacked);
                    changed = true;
                }
            }
            if changed {
                pager::write_page_body(&mut locked.file, page, &body)?;
            }

            let next = page_header.next_page.get();
            if next == DEAD_END {
                break;
            }
            page = next;
        }

        locked.sync_if_configured()?;
        Ok(())
    }

    /// The compacting delete: rebuilds the whole chain in one pass,
    /// splicing pages no longer needed onto the free list. Reproduces the
    /// source's exact free-list relink sequence, including its unconditional
    /// overwrite of `free_head` even on a run where no page was freed.
    #[instrument(skip(self, predicate), fields(table))]
    pub fn delete(&self, table: &str, predicate: &dyn Predicate) -> Result<()> {
        let mut locked = self.open_write()?;

        let mut header = pager::read_global_header(&mut locked.file)?;
        let (slot_index, descriptor) =
            catalog::find_table(&mut locked.file, header.table_count, table)?;

        let mut survivors: VecDeque<Vec<u8>> = scan_chain(&mut locked.file, &descriptor)?
            .into_iter()
            .filter(|row| !predicate.evaluate(row))
            .map(|row| record::pack_row(&descriptor.columns, &row))
            .collect::<Result<VecDeque<_>>>()?;

        let record_size = descriptor.record_size as u64;
        let old_last_page = descriptor.last_page as u32;
        let old_free_head = header.free_head.get() as u32;

        let mut next_page = descriptor.first_page as u32;
        let mut new_last_page = next_page;
        let mut staged_free_head = old_free_head;
        let mut transferred = false;

        while next_page != DEAD_END {
            let current = next_page;
            if !transferred {
                new_last_page = current;
            }

            let current_header = pager::read_page_header(&mut locked.file, current)?;
            let orig_next = current_header.next_page.get();
            if !transferred && orig_next != DEAD_END {
                staged_free_head = orig_next;
            }

            let mut body = Vec::new();
            let mut rec_count: u16 = 0;
            while let Some(rec) = survivors.front() {
                if PAGE_HEADER_SIZE + (rec_count as u64 + 1) * record_size > PAGE_SIZE {
                    break;
                }
                body.extend_from_slice(rec);
                survivors.pop_front();
                rec_count += 1;
            }
            transferred = survivors.is_empty();
            body.resize((PAGE_SIZE - PAGE_HEADER_SIZE) as usize, 0);

            pager::write_page_body(&mut locked.file, current, &body)?;
            pager::write_record_count(&mut locked.file, current, rec_count)?;

            next_page = orig_next;
        }

        if !survivors.is_empty() {
            return Err(Error::Corrupt(format!(
                "table {table:?}: delete could not fit surviving rows back into its chain"
            )));
        }

        if old_last_page != new_last_page {
            pager::write_next_page(&mut locked.file, old_last_page, old_free_head)?;
        }
        pager::write_next_page(&mut locked.file, new_last_page, DEAD_END)?;
        header.free_head.set(staged_free_head as u16);
        pager::write_global_header(&mut locked.file, &header)?;
        catalog::write_last_page(&mut locked.file, slot_index, new_last_page as u16)?;

        locked.sync_if_configured()?;
        Ok(())
    }

    /// Empties a table via [`Database::delete`], recycles its sole
    /// remaining page onto the free list, and compacts the catalog.
    #[instrument(skip(self), fields(table))]
    pub fn drop_table(&self, table: &str) -> Result<()> {
        self.delete(table, &AcceptAll)?;

        let mut locked = self.open_write()?;

        let mut header = pager::read_global_header(&mut locked.file)?;
        let (slot_index, descriptor) =
            catalog::find_table(&mut locked.file, header.table_count, table)?;

        let table_count_before = header.table_count;
        pager::release_page(&mut locked.file, &mut header, descriptor.first_page as u32)?;
        header.table_count -= 1;
        pager::write_global_header(&mut locked.file, &header)?;
        catalog::compact_after_remove(&mut locked.file, table_count_before, slot_index)?;

        locked.sync_if_configured()?;
        Ok(())
    }
}

/// Scans a table's whole page chain into memory, decoding every record.
/// Terminates early on an empty page, matching the source's short-circuit
/// (an empty page can only be a valid chain tail).
fn scan_chain(file: &mut File, descriptor: &TableDescriptor) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let record_size = descriptor.record_size as u64;
    let mut page = descriptor.first_page as u32;

    loop {
        let page_header = pager::read_page_header(file, page)?;
        let count = page_header.record_count.get();
        if count == 0 {
            break;
        }

        let body = pager::read_page_body(file, page, count as u64 * record_size)?;
        for index in 0..count as u64 {
            let start = (index * record_size) as usize;
            let end = start + record_size as usize;
            rows.push(record::unpack(&descriptor.columns, &body[start..end]));
        }

        let next = page_header.next_page.get();
        if next == DEAD_END {
            break;
        }
        page = next;
    }

    Ok(rows)
}

fn type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Int => "int",
        ColumnType::Float => "float",
        ColumnType::Str => "string",
    }
}
