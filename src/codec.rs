//! Fixed little-endian binary layouts shared by the global header, the
//! catalog, and data pages.
//!
//! Every layout here is a zero-copy, `#[repr(C)]` struct rather than
//! hand-rolled byte slicing: the struct's field order *is* the wire format,
//! and `zerocopy` guarantees there is no hidden padding or host-endianness
//! leak.

use zerocopy::{little_endian::U16 as LeU16, little_endian::U32 as LeU32, AsBytes, FromBytes};

use crate::layout::{ColumnType, DEAD_END, NAME_MAX};

/// The 3-byte global header at file offset 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, zerocopy::FromZeroes, FromBytes, AsBytes, zerocopy::Unaligned,
)]
#[repr(C)]
pub struct GlobalHeader {
    pub table_count: u8,
    pub free_head: LeU16,
}

impl Default for GlobalHeader {
    fn default() -> Self {
        Self {
            table_count: 0,
            free_head: 0.into(),
        }
    }
}

/// One column's entry within a table descriptor: 17 bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, zerocopy::FromZeroes, FromBytes, AsBytes, zerocopy::Unaligned,
)]
#[repr(C)]
pub struct ColumnEntry {
    pub name: [u8; NAME_MAX],
    pub type_code: u8,
}

/// The fixed 23-byte prefix of a catalog slot, before its column entries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, zerocopy::FromZeroes, FromBytes, AsBytes, zerocopy::Unaligned,
)]
#[repr(C)]
pub struct TableDescriptorPrefix {
    pub name: [u8; NAME_MAX],
    pub first_page: LeU16,
    pub last_page: LeU16,
    pub record_size: LeU16,
    pub column_count: u8,
}

pub const TABLE_DESCRIPTOR_PREFIX_SIZE: u64 = 23;
pub const COLUMN_ENTRY_SIZE: u64 = 17;

/// The 6-byte header at the front of every data/free page, when interpreted
/// as a data page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, zerocopy::FromZeroes, FromBytes, AsBytes, zerocopy::Unaligned,
)]
#[repr(C)]
pub struct PageHeader {
    pub next_page: LeU32,
    pub record_count: LeU16,
}

impl PageHeader {
    pub fn dead_tail(record_count: u16) -> Self {
        Self {
            next_page: DEAD_END.into(),
            record_count: record_count.into(),
        }
    }
}

/// Encodes a name (table or column) into a null-padded `NAME_MAX`-byte array.
pub fn encode_name(name: &str) -> Option<[u8; NAME_MAX]> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_MAX {
        return None;
    }
    let mut out = [0u8; NAME_MAX];
    out[..bytes.len()].copy_from_slice(bytes);
    Some(out)
}

/// Decodes a null-padded name, taking the prefix up to (excluding) the first
/// `0x00` byte.
pub fn decode_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encodes a string cell, truncating at a UTF-8 char boundary if it would
/// otherwise overflow 255 bytes, then null-padding the remainder.
pub fn encode_str_cell(value: &str) -> [u8; 255] {
    let mut out = [0u8; 255];
    let bytes = value.as_bytes();
    let take = if bytes.len() > 255 {
        let mut cut = 255;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        cut
    } else {
        bytes.len()
    };
    out[..take].copy_from_slice(&bytes[..take]);
    out
}

/// Decodes a string cell: the UTF-8 prefix before the first `0x00`.
pub fn decode_str_cell(bytes: &[u8]) -> String {
    decode_name(bytes)
}

/// Encoded byte width of a column type, by code.
pub fn type_size(type_code: u8) -> Option<u64> {
    ColumnType::from_code(type_code).map(ColumnType::size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_name_rejects_names_over_the_cap() {
        assert!(encode_name("exactly_16_bytes").is_some());
        assert!(encode_name("seventeen_bytes!!").is_none());
    }

    #[test]
    fn decode_name_stops_at_the_first_nul() {
        let mut bytes = [0u8; NAME_MAX];
        bytes[..3].copy_from_slice(b"abc");
        assert_eq!(decode_name(&bytes), "abc");
    }

    #[test]
    fn string_cell_truncates_at_a_char_boundary_not_mid_utf8() {
        // "é" is 2 bytes in UTF-8; pad the value so the 255-byte cutoff
        // would otherwise land inside its second byte.
        let mut value = "a".repeat(254);
        value.push('é');
        let encoded = encode_str_cell(&value);
        let decoded = decode_str_cell(&encoded);
        assert!(value.starts_with(&decoded));
        assert!(decoded.is_char_boundary(decoded.len()));
    }

    #[test]
    fn short_string_cell_round_trips_with_nul_padding() {
        let encoded = encode_str_cell("hi");
        assert_eq!(&encoded[..2], b"hi");
        assert_eq!(encoded[2], 0);
        assert_eq!(decode_str_cell(&encoded), "hi");
    }
}
