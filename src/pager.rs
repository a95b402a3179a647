//! File-level I/O primitives: the global header, the free-page allocator,
//! and raw page header/body access.
//!
//! Nothing above this module seeks into the file directly; everything goes
//! through `read_*`/`write_*` here so the byte offsets in [`crate::layout`]
//! have exactly one set of call sites.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use tracing::debug;
use zerocopy::{AsBytes, FromBytes};

use crate::codec::{GlobalHeader, PageHeader};
use crate::error::Result;
use crate::layout::{page_count, page_offset, DEAD_END, PAGES_OFFSET, PAGE_HEADER_SIZE, PAGE_SIZE};

/// Reads the 3-byte global header at offset 0.
pub fn read_global_header(file: &mut File) -> Result<GlobalHeader> {
    let mut bytes = [0u8; 3];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut bytes)?;
    Ok(GlobalHeader::read_from(&bytes[..]).expect("fixed-size header"))
}

/// Writes the 3-byte global header at offset 0.
pub fn write_global_header(file: &mut File, header: &GlobalHeader) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(header.as_bytes())?;
    Ok(())
}

/// Reads a page's 6-byte header (`next_page`, `record_count`).
pub fn read_page_header(file: &mut File, page: u32) -> Result<PageHeader> {
    let mut bytes = [0u8; PAGE_HEADER_SIZE as usize];
    file.seek(SeekFrom::Start(page_offset(page)))?;
    file.read_exact(&mut bytes)?;
    Ok(PageHeader::read_from(&bytes[..]).expect("fixed-size header"))
}

/// Writes a page's 6-byte header, leaving the body untouched.
pub fn write_page_header(file: &mut File, page: u32, header: &PageHeader) -> Result<()> {
    file.seek(SeekFrom::Start(page_offset(page)))?;
    file.write_all(header.as_bytes())?;
    Ok(())
}

/// Reads `len` bytes of a page's body, starting right after the page header.
pub fn read_page_body(file: &mut File, page: u32, len: u64) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len as usize];
    file.seek(SeekFrom::Start(page_offset(page) + PAGE_HEADER_SIZE))?;
    file.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Writes a page's body, starting right after the page header.
pub fn write_page_body(file: &mut File, page: u32, body: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(page_offset(page) + PAGE_HEADER_SIZE))?;
    file.write_all(body)?;
    Ok(())
}

/// Writes a single record's bytes at slot `index` within a page's body.
pub fn write_record_at(
    file: &mut File,
    page: u32,
    record_size: u64,
    index: u64,
    record: &[u8],
) -> Result<()> {
    file.seek(SeekFrom::Start(
        page_offset(page) + PAGE_HEADER_SIZE + index * record_size,
    ))?;
    file.write_all(record)?;
    Ok(())
}

/// Reads the 4-byte "next free page" field at the front of a page currently
/// interpreted as a free page.
fn read_free_next(file: &mut File, page: u32) -> Result<u32> {
    let mut bytes = [0u8; 4];
    file.seek(SeekFrom::Start(page_offset(page)))?;
    file.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Writes the 4-byte "next free page" field at the front of a page, without
/// touching the rest of the page.
pub fn write_free_next(file: &mut File, page: u32, next: u32) -> Result<()> {
    file.seek(SeekFrom::Start(page_offset(page)))?;
    file.write_all(&next.to_le_bytes())?;
    Ok(())
}

/// Writes just a page's `next_page` field (the same 4 bytes as
/// [`write_free_next`], named separately because the callers reason about it
/// as a chain link rather than a free-list link).
pub fn write_next_page(file: &mut File, page: u32, next: u32) -> Result<()> {
    write_free_next(file, page, next)
}

/// Writes just a page's `record_count` field, leaving `next_page` untouched.
pub fn write_record_count(file: &mut File, page: u32, record_count: u16) -> Result<()> {
    file.seek(SeekFrom::Start(page_offset(page) + 4))?;
    file.write_all(&record_count.to_le_bytes())?;
    Ok(())
}

/// Appends exactly one fresh page to the file, initialized as a free page
/// with `next = DEAD_END`. Returns the new page's index.
pub fn extend_file(file: &mut File) -> Result<u32> {
    let len = file.seek(SeekFrom::End(0))?;
    debug_assert!((len - PAGES_OFFSET) % PAGE_SIZE == 0);
    let page_index = page_count(len);

    let mut page = vec![0u8; PAGE_SIZE as usize];
    page[..4].copy_from_slice(&DEAD_END.to_le_bytes());
    file.write_all(&page)?;

    debug!(page = page_index, "extended file by one free page");
    Ok(page_index)
}

/// Removes the page at the head of the free list, re-preparing it as an
/// empty data page (`next = DEAD_END`, `record_count = 0`), and returns its
/// index. Extends the file when the free list would otherwise run dry.
pub fn allocate_page(file: &mut File, header: &mut GlobalHeader) -> Result<u32> {
    let claimed = header.free_head.get() as u32;
    let next_free = read_free_next(file, claimed)?;

    if next_free == DEAD_END {
        let new_page = extend_file(file)?;
        header.free_head.set(new_page as u16);
    } else {
        header.free_head.set(next_free as u16);
    }

    write_page_header(file, claimed, &PageHeader::dead_tail(0))?;
    debug!(page = claimed, "allocated page from free list");
    Ok(claimed)
}

/// Pushes `page` onto the head of the free list.
pub fn release_page(file: &mut File, header: &mut GlobalHeader, page: u32) -> Result<()> {
    write_free_next(file, page, header.free_head.get() as u32)?;
    header.free_head.set(page as u16);
    debug!(page, "released page to free list");
    Ok(())
}
