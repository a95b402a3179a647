//! Per-table fixed-width record packing and unpacking.
//!
//! A record is the concatenation of each column's encoded cell, in
//! declaration order; its width is the table's `record_size`. This module
//! knows nothing about pages or chains — it only turns a `&[Cell]` into
//! bytes and back.

use crate::catalog::Column;
use crate::codec::{decode_str_cell, encode_str_cell};
use crate::error::{Error, Result};
use crate::layout::ColumnType;
use crate::value::{Cell, Row};

/// Packs `values`, one per `columns` entry in order, into a `record_size`
/// byte buffer. Every value must already match its column's declared type;
/// arity is the caller's responsibility (insert's `Arity` check happens
/// before this is called).
pub fn pack(columns: &[Column], values: &[Cell]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(columns.iter().map(|c| c.ty.size() as usize).sum());
    for (column, value) in columns.iter().zip(values) {
        if !value.matches_type(column.ty) {
            return Err(Error::Type {
                column: column.name.clone(),
                expected: type_name(column.ty),
            });
        }
        match value {
            Cell::Int(n) => out.extend_from_slice(&n.to_le_bytes()),
            Cell::Float(f) => out.extend_from_slice(&f.to_le_bytes()),
            Cell::Str(s) => out.extend_from_slice(&encode_str_cell(s)),
        }
    }
    Ok(out)
}

/// Packs a row keyed by column name, in the table's declared column order.
/// Used by delete's rebuild, where surviving rows arrive as decoded [`Row`]s
/// rather than positional value lists.
pub fn pack_row(columns: &[Column], row: &Row) -> Result<Vec<u8>> {
    let values: Vec<Cell> = columns
        .iter()
        .map(|c| row.get(&c.name).cloned().unwrap_or(Cell::Int(0)))
        .collect();
    pack(columns, &values)
}

/// Unpacks exactly one `record_size`-byte record into a row keyed by column
/// name, in declaration order.
pub fn unpack(columns: &[Column], bytes: &[u8]) -> Row {
    let mut row = Row::new();
    let mut offset = 0usize;
    for column in columns {
        let size = column.ty.size() as usize;
        let cell_bytes = &bytes[offset..offset + size];
        let cell = match column.ty {
            ColumnType::Int => Cell::Int(i32::from_le_bytes(cell_bytes.try_into().unwrap())),
            ColumnType::Float => Cell::Float(f32::from_le_bytes(cell_bytes.try_into().unwrap())),
            ColumnType::Str => Cell::Str(decode_str_cell(cell_bytes)),
        };
        row.insert(column.name.clone(), cell);
        offset += size;
    }
    row
}

fn type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Int => "int",
        ColumnType::Float => "float",
        ColumnType::Str => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column {
                name: "id".into(),
                ty: ColumnType::Int,
            },
            Column {
                name: "name".into(),
                ty: ColumnType::Str,
            },
        ]
    }

    #[test]
    fn round_trips_a_record() {
        let columns = columns();
        let values = vec![Cell::Int(42), Cell::Str("alice".into())];
        let packed = pack(&columns, &values).unwrap();
        assert_eq!(packed.len(), 4 + 255);

        let row = unpack(&columns, &packed);
        assert_eq!(row.get("id"), Some(&Cell::Int(42)));
        assert_eq!(row.get("name"), Some(&Cell::Str("alice".into())));
    }

    #[test]
    fn rejects_mismatched_types() {
        let columns = columns();
        let values = vec![Cell::Str("oops".into()), Cell::Str("alice".into())];
        assert!(matches!(
            pack(&columns, &values),
            Err(Error::Type { .. })
        ));
    }
}
