use super::headers::DatabaseHeader;
use crate::sqlite::utils::{read_u16_be, read_u32_be, read_varint, Varint};
use anyhow::{bail, Result};
use std::fs::File;
use std::io::{Read, Seek};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PageType {
    InteriorIndexBTreePage,
    InteriorTableBTreePage,
    LeafIndexBTreePage,
    LeafTableBTreePage,
}

impl PageType {
    fn read_page_type(value: u8) -> Option<PageType> {
        match value {
            0x02 => Some(PageType::InteriorIndexBTreePage),
            0x05 => Some(PageType::InteriorTableBTreePage),
            0x0A => Some(PageType::LeafIndexBTreePage),
            0x0D => Some(PageType::LeafTableBTreePage),
            _ => None,
        }
    }
}

// container for the btree page header
#[derive(Debug)]
pub struct PageHeader {
    pub page_type: PageType,
    pub first_freeblock: u16,
    pub cell_count: u16,
    pub cell_content_start: u32,
    pub fragmented_free_bytes: u8,
    pub right_pointer: Option<u32>,
    // embedded payload thresholds derived from the usable page size
    pub min_overflow_payload_size: u32,
    pub max_overflow_payload_size: u32,
}

impl PageHeader {
    pub fn new(header_buffer: &[u8], info: &DatabaseHeader) -> Result<PageHeader> {
        let Some(page_type) = PageType::read_page_type(header_buffer[0]) else {
            bail!("page has invalid type: {}", header_buffer[0])
        };
        let first_freeblock = read_u16_be(&header_buffer[1..3]);
        let cell_count = read_u16_be(&header_buffer[3..5]);
        let cell_content_start = match read_u16_be(&header_buffer[5..7]) {
            0 => 65536_u32,
            other => other as u32,
        };
        let fragmented_free_bytes = header_buffer[7];
        let right_pointer = match page_type {
            PageType::InteriorTableBTreePage | PageType::InteriorIndexBTreePage => {
                Some(read_u32_be(&header_buffer[8..12]))
            }
            _ => None,
        };

        // thresholds from https://www.sqlite.org/fileformat2.html#b_tree_pages
        let usable = info.usable_page_size;
        let min_overflow_payload_size = ((usable - 12) * 32 / 255) - 23;
        let max_overflow_payload_size = match page_type {
            PageType::InteriorIndexBTreePage | PageType::LeafIndexBTreePage => {
                ((usable - 12) * 64 / 255) - 23
            }
            PageType::InteriorTableBTreePage | PageType::LeafTableBTreePage => usable - 35,
        };

        Ok(PageHeader {
            page_type,
            first_freeblock,
            cell_count,
            cell_content_start,
            fragmented_free_bytes,
            right_pointer,
            min_overflow_payload_size,
            max_overflow_payload_size,
        })
    }

    pub fn len(&self) -> usize {
        match self.right_pointer {
            Some(_) => 12,
            None => 8,
        }
    }
}

// one fully read btree page: header, cell pointer array and raw bytes;
// cell offsets are relative to the start of the page
pub struct Page {
    pub number: u32,
    pub header: PageHeader,
    pub pointer_array: Vec<u16>,
    pub data: Vec<u8>,
}

impl Page {
    pub fn new(file: &mut File, page_number: u32, info: &DatabaseHeader) -> Result<Page> {
        if page_number < 1 {
            bail!("invalid page number: {page_number}");
        }

        let page_start = (page_number as u64 - 1) * info.page_size as u64;
        file.seek(std::io::SeekFrom::Start(page_start))?;

        let mut data = vec![0_u8; info.page_size as usize];
        file.read_exact(&mut data)?;

        // the first page carries the 100 byte file header before its btree header
        let header_start = if page_number == 1 { 100 } else { 0 };

        let header = PageHeader::new(&data[header_start..header_start + 12], info)?;
        debug!(
            page_number,
            page_type = ?header.page_type,
            cell_count = header.cell_count,
            cell_content_start = header.cell_content_start,
            right_pointer = ?header.right_pointer,
            "decoded page header"
        );

        let mut pointer_array: Vec<u16> = Vec::with_capacity(header.cell_count.into());
        let array_start = header_start + header.len();
        for i in 0..header.cell_count as usize {
            let offset = array_start + 2 * i;
            if offset + 2 > data.len() {
                bail!("malformed page: cell pointer array out of range");
            }
            pointer_array.push(read_u16_be(&data[offset..offset + 2]));
        }

        Ok(Page {
            number: page_number,
            header,
            pointer_array,
            data,
        })
    }

    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }
}

// interior table cell: left child pointer plus the largest rowid stored
// in that subtree; the right-most pointer is appended with a -1 sentinel
#[derive(Debug, Clone, Copy)]
pub struct InteriorTableEntry {
    pub child_page: u32,
    pub key: i64,
}

pub fn interior_table_entries(page: &Page) -> Result<Vec<InteriorTableEntry>> {
    let mut entries: Vec<InteriorTableEntry> = Vec::with_capacity(page.pointer_array.len() + 1);

    for &pointer in &page.pointer_array {
        let offset = pointer as usize;
        if offset + 4 > page.data.len() {
            bail!("malformed page: interior table cell out of range");
        }
        let child_page = read_u32_be(&page.data[offset..offset + 4]);
        let Varint { value: key, .. } = read_varint(&page.data[offset + 4..]);
        trace!(child_page, key, "interior table cell");
        entries.push(InteriorTableEntry { child_page, key });
    }

    let Some(right_pointer) = page.header.right_pointer else {
        bail!("interior table page {} missing right-most pointer", page.number)
    };
    entries.push(InteriorTableEntry {
        child_page: right_pointer,
        key: -1,
    });

    Ok(entries)
}

// leaf table cell: payload size varint, rowid varint, then the record
// payload (reassembled through the overflow chain when it spills)
pub struct LeafTableCell {
    pub rowid: i64,
    pub payload: Vec<u8>,
}

pub fn leaf_table_cells(
    file: &mut File,
    info: &DatabaseHeader,
    page: &Page,
) -> Result<Vec<LeafTableCell>> {
    let mut cells: Vec<LeafTableCell> = Vec::with_capacity(page.pointer_array.len());

    for &pointer in &page.pointer_array {
        let mut offset = pointer as usize;
        if offset >= page.data.len() {
            bail!("malformed page: cell pointer out of range");
        }
        let Varint {
            value: payload_size,
            byte_size,
        } = read_varint(&page.data[offset..]);
        offset += byte_size;
        let Varint {
            value: rowid,
            byte_size,
        } = read_varint(tail(&page.data, offset));
        offset += byte_size;

        let payload = read_cell_payload(file, info, page, offset, payload_size)?;
        cells.push(LeafTableCell { rowid, payload });
    }

    Ok(cells)
}

// interior index cell: left child pointer plus the key record; the
// right-most pointer is appended with an empty payload sentinel
pub struct InteriorIndexEntry {
    pub child_page: u32,
    pub key_payload: Vec<u8>,
}

pub fn interior_index_entries(
    file: &mut File,
    info: &DatabaseHeader,
    page: &Page,
) -> Result<Vec<InteriorIndexEntry>> {
    let mut entries: Vec<InteriorIndexEntry> = Vec::with_capacity(page.pointer_array.len() + 1);

    for &pointer in &page.pointer_array {
        let mut offset = pointer as usize;
        if offset + 4 > page.data.len() {
            bail!("malformed page: interior index cell out of range");
        }
        let child_page = read_u32_be(&page.data[offset..offset + 4]);
        offset += 4;
        let Varint {
            value: payload_size,
            byte_size,
        } = read_varint(&page.data[offset..]);
        offset += byte_size;

        let key_payload = read_cell_payload(file, info, page, offset, payload_size)?;
        entries.push(InteriorIndexEntry {
            child_page,
            key_payload,
        });
    }

    let Some(right_pointer) = page.header.right_pointer else {
        bail!("interior index page {} missing right-most pointer", page.number)
    };
    entries.push(InteriorIndexEntry {
        child_page: right_pointer,
        key_payload: Vec::new(),
    });

    Ok(entries)
}

// leaf index cell: payload size varint followed by the key record
pub fn leaf_index_cells(
    file: &mut File,
    info: &DatabaseHeader,
    page: &Page,
) -> Result<Vec<Vec<u8>>> {
    let mut cells: Vec<Vec<u8>> = Vec::with_capacity(page.pointer_array.len());

    for &pointer in &page.pointer_array {
        let mut offset = pointer as usize;
        if offset >= page.data.len() {
            bail!("malformed page: cell pointer out of range");
        }
        let Varint {
            value: payload_size,
            byte_size,
        } = read_varint(&page.data[offset..]);
        offset += byte_size;

        cells.push(read_cell_payload(file, info, page, offset, payload_size)?);
    }

    Ok(cells)
}

fn tail(data: &[u8], offset: usize) -> &[u8] {
    data.get(offset..).unwrap_or(&[])
}

// copy the inline payload, or reassemble it through the overflow chain
// when it exceeds the page's embedded maximum
fn read_cell_payload(
    file: &mut File,
    info: &DatabaseHeader,
    page: &Page,
    offset: usize,
    payload_size: i64,
) -> Result<Vec<u8>> {
    if payload_size < 0 {
        bail!("malformed page: negative payload size");
    }
    if payload_size <= page.header.max_overflow_payload_size as i64 {
        let end = offset + payload_size as usize;
        if end > page.data.len() {
            bail!("malformed page: payload out of range");
        }
        return Ok(page.data[offset..end].to_vec());
    }
    read_payload_with_overflow(file, info, page, offset, payload_size)
}

fn read_payload_with_overflow(
    file: &mut File,
    info: &DatabaseHeader,
    page: &Page,
    offset: usize,
    payload_size: i64,
) -> Result<Vec<u8>> {
    let (chunk_size, mut remaining_size) = overflow_sizes(&page.header, info, payload_size);
    debug!(
        payload_size,
        chunk_size, remaining_size, "reassembling payload through overflow chain"
    );

    let chunk_end = offset + chunk_size as usize;
    if chunk_end + 4 > page.data.len() {
        bail!("malformed page: overflow cell out of range");
    }
    let mut payload = page.data[offset..chunk_end].to_vec();
    let mut overflow_page = read_u32_be(&page.data[chunk_end..chunk_end + 4]);

    while overflow_page != 0 {
        let (next, data) = get_overflow_page(file, info, overflow_page)?;
        let size = (data.len() as i64).min(remaining_size);
        payload.extend_from_slice(&data[..size as usize]);
        remaining_size -= size;
        if next == 0 && remaining_size > 0 {
            bail!("missing link on overflow chain");
        }
        if next != 0 && remaining_size == 0 {
            bail!("unexpected next link on overflow chain");
        }
        overflow_page = next;
    }

    Ok(payload)
}

// the first chunk of a spilled payload stays inline: min + ((payload - min)
// mod (usable - 4)) bytes when that fits under the maximum, otherwise min
pub fn overflow_sizes(
    header: &PageHeader,
    info: &DatabaseHeader,
    payload_size: i64,
) -> (i64, i64) {
    let min_size = header.min_overflow_payload_size as i64;
    let max_size = header.max_overflow_payload_size as i64;
    let threshold = min_size + ((payload_size - min_size) % (info.usable_page_size as i64 - 4));
    if threshold <= max_size {
        (threshold, payload_size - threshold)
    } else {
        (min_size, payload_size - min_size)
    }
}

// an overflow page is 4 bytes of next-page number (0 terminates the
// chain) followed by payload data up to the usable page size
pub fn get_overflow_page(
    file: &mut File,
    info: &DatabaseHeader,
    page_number: u32,
) -> Result<(u32, Vec<u8>)> {
    if page_number < 1 {
        bail!("invalid page number: {page_number}");
    }

    let page_start = (page_number as u64 - 1) * info.page_size as u64;
    file.seek(std::io::SeekFrom::Start(page_start))?;

    let mut data = vec![0_u8; info.page_size as usize];
    file.read_exact(&mut data)?;

    let next = read_u32_be(&data[0..4]);
    data.truncate(info.usable_page_size as usize);
    data.drain(0..4);

    Ok((next, data))
}
