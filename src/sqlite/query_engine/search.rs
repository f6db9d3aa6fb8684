use super::TableRecord;
use crate::sqlite::data_containers::page::{
    interior_index_entries, interior_table_entries, leaf_index_cells, leaf_table_cells, Page,
    PageType,
};
use crate::sqlite::data_containers::record::{parse_record, Value};
use crate::sqlite::utils::compare_values;
use crate::sqlite::DbContext;
use anyhow::{bail, Result};
use std::cmp::Ordering;

fn ordering_to_int(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

// a decoded single-column index key is (value, rowid); anything wider is
// out of scope for this engine
fn index_key_rowid(key: &[Value]) -> Result<i64> {
    let Some(Value::Int(rowid)) = key.last() else {
        bail!("index record missing trailing rowid")
    };
    Ok(*rowid)
}

impl DbContext {
    // point lookup through the table btree: interior keys hold the largest
    // rowid of their left subtree, so a binary search picks the subtree
    pub fn get_record_by_rowid(
        &mut self,
        page_number: u32,
        rowid: i64,
    ) -> Result<Option<TableRecord>> {
        let page = Page::new(&mut self.file, page_number, &self.info)?;
        match page.page_type() {
            PageType::InteriorTableBTreePage => {
                let entries = interior_table_entries(&page)?;
                let mut lo = 0_isize;
                let mut hi = entries.len() as isize - 1;
                while lo <= hi {
                    let mid = (lo + hi) / 2;
                    if mid == entries.len() as isize - 1 {
                        // right-most child holds everything past the last key
                        lo = mid;
                        break;
                    } else if entries[mid as usize].key == rowid {
                        lo = mid;
                        break;
                    } else if rowid < entries[mid as usize].key {
                        hi = mid - 1;
                    } else {
                        lo = mid + 1;
                    }
                }
                self.get_record_by_rowid(entries[lo as usize].child_page, rowid)
            }
            PageType::LeafTableBTreePage => {
                let cells = leaf_table_cells(&mut self.file, &self.info, &page)?;
                let mut lo = 0_isize;
                let mut hi = cells.len() as isize - 1;
                while lo <= hi {
                    let mid = (lo + hi) / 2;
                    let cell = &cells[mid as usize];
                    match rowid.cmp(&cell.rowid) {
                        Ordering::Equal => {
                            let columns = parse_record(&cell.payload, self.info.text_encoding)?;
                            return Ok(Some(TableRecord { rowid, columns }));
                        }
                        Ordering::Less => hi = mid - 1,
                        Ordering::Greater => lo = mid + 1,
                    }
                }
                Ok(None)
            }
            other => bail!("unexpected page type when walking table btree: {other:?}"),
        }
    }

    // primary key lookup for tables whose storage root is an index btree;
    // the key record carries the row itself
    pub fn get_record_by_pk(
        &mut self,
        page_number: u32,
        pk_column_number: usize,
        key: &Value,
    ) -> Result<Option<TableRecord>> {
        let page = Page::new(&mut self.file, page_number, &self.info)?;
        match page.page_type() {
            PageType::InteriorIndexBTreePage => {
                let entries = interior_index_entries(&mut self.file, &self.info, &page)?;
                let mut lo = 0_isize;
                let mut hi = entries.len() as isize - 1;
                while lo <= hi {
                    let mid = (lo + hi) / 2;
                    if mid == entries.len() as isize - 1 {
                        // right-most child
                        lo = mid;
                        break;
                    }
                    let columns =
                        parse_record(&entries[mid as usize].key_payload, self.info.text_encoding)?;
                    let Some(stored) = columns.get(pk_column_number) else {
                        bail!("malformed index record: missing key column")
                    };
                    match compare_values(key, stored)? {
                        Ordering::Equal => {
                            return Ok(Some(TableRecord { rowid: -1, columns }));
                        }
                        Ordering::Less => hi = mid - 1,
                        Ordering::Greater => lo = mid + 1,
                    }
                }
                self.get_record_by_pk(entries[lo as usize].child_page, pk_column_number, key)
            }
            PageType::LeafIndexBTreePage => {
                let cells = leaf_index_cells(&mut self.file, &self.info, &page)?;
                let mut lo = 0_isize;
                let mut hi = cells.len() as isize - 1;
                while lo <= hi {
                    let mid = (lo + hi) / 2;
                    let columns = parse_record(&cells[mid as usize], self.info.text_encoding)?;
                    let Some(stored) = columns.get(pk_column_number) else {
                        bail!("malformed index record: missing key column")
                    };
                    match compare_values(key, stored)? {
                        Ordering::Equal => return Ok(Some(TableRecord { rowid: -1, columns })),
                        Ordering::Less => hi = mid - 1,
                        Ordering::Greater => lo = mid + 1,
                    }
                }
                Ok(None)
            }
            PageType::LeafTableBTreePage => {
                // rowid tables reach here when the declared key has no usable
                // index; rows are not ordered by that key, so scan in place
                let cells = leaf_table_cells(&mut self.file, &self.info, &page)?;
                for cell in cells {
                    let columns = parse_record(&cell.payload, self.info.text_encoding)?;
                    let Some(stored) = columns.get(pk_column_number) else {
                        bail!("malformed record: missing key column")
                    };
                    if compare_values(key, stored)? == Ordering::Equal {
                        return Ok(Some(TableRecord {
                            rowid: cell.rowid,
                            columns,
                        }));
                    }
                }
                Ok(None)
            }
            other => bail!("unexpected page type when walking table btree: {other:?}"),
        }
    }

    // collect the rowids of every index entry equal to the filter value;
    // index_sort_order flips the comparisons for DESC indexes
    pub fn walk_btree_index_pages(
        &mut self,
        page_number: u32,
        filter_value: &Value,
        index_sort_order: i32,
        rowids: &mut Vec<i64>,
    ) -> Result<()> {
        let page = Page::new(&mut self.file, page_number, &self.info)?;
        match page.page_type() {
            PageType::InteriorIndexBTreePage => {
                let entries = interior_index_entries(&mut self.file, &self.info, &page)?;
                let mut lo = 0_isize;
                let mut hi = entries.len() as isize - 1;
                while lo <= hi {
                    let mid = (lo + hi) / 2;
                    if mid == entries.len() as isize - 1 {
                        // right-most child
                        lo = mid;
                        break;
                    }
                    let key =
                        parse_record(&entries[mid as usize].key_payload, self.info.text_encoding)?;
                    if key.len() > 2 {
                        bail!("multi-column index not implemented");
                    }
                    let Some(first) = key.first() else {
                        bail!("malformed index record: no key column")
                    };
                    if compare_values(first, filter_value)? == Ordering::Equal {
                        // the interior cell itself points to a valid row that
                        // is not on any leaf page
                        rowids.push(index_key_rowid(&key)?);
                        lo = mid;
                        break;
                    } else if index_sort_order
                        * ordering_to_int(compare_values(filter_value, first)?)
                        < 0
                    {
                        hi = mid - 1;
                    } else {
                        lo = mid + 1;
                    }
                }
                // matching rows may continue past the located child's boundary
                let end = (lo + 2).min(entries.len() as isize);
                for entry in &entries[lo as usize..end as usize] {
                    self.walk_btree_index_pages(
                        entry.child_page,
                        filter_value,
                        index_sort_order,
                        rowids,
                    )?;
                }
            }
            PageType::LeafIndexBTreePage => {
                let cells = leaf_index_cells(&mut self.file, &self.info, &page)?;
                let mut lo = 0_isize;
                let mut hi = cells.len() as isize - 1;
                // find the first key not below the filter value
                while lo <= hi {
                    let mid = (lo + hi) / 2;
                    let key = parse_record(&cells[mid as usize], self.info.text_encoding)?;
                    let Some(first) = key.first() else {
                        bail!("malformed index record: no key column")
                    };
                    if index_sort_order * ordering_to_int(compare_values(filter_value, first)?) <= 0
                    {
                        hi = mid - 1;
                    } else {
                        lo = mid + 1;
                    }
                }
                // collect forward while the key still matches
                for cell in &cells[lo.max(0) as usize..] {
                    let key = parse_record(cell, self.info.text_encoding)?;
                    if key.len() > 2 {
                        bail!("multi-column index not implemented");
                    }
                    let Some(first) = key.first() else {
                        bail!("malformed index record: no key column")
                    };
                    if index_sort_order * ordering_to_int(compare_values(first, filter_value)?) > 0
                    {
                        break;
                    }
                    rowids.push(index_key_rowid(&key)?);
                }
            }
            other => bail!("unexpected page type when walking index btree: {other:?}"),
        }
        Ok(())
    }
}
