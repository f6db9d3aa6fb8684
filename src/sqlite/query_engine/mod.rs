use crate::sqlite::data_containers::page::{
    interior_index_entries, interior_table_entries, leaf_index_cells, leaf_table_cells, Page,
    PageType,
};
use crate::sqlite::data_containers::record::{parse_record, Value};
use crate::sqlite::DbContext;
use anyhow::{bail, Result};

mod search;

// one materialized result row; rowid is -1 for rows that come out of
// index btrees, where no rowid applies
#[derive(Debug, Clone)]
pub struct TableRecord {
    pub rowid: i64,
    pub columns: Vec<Value>,
}

impl DbContext {
    // count rows without decoding any payload: leaf pages contribute their
    // cell count, and every interior index cell itself carries a row
    pub fn fast_count_rows(&mut self, page_number: u32) -> Result<u64> {
        let page = Page::new(&mut self.file, page_number, &self.info)?;
        match page.page_type() {
            PageType::InteriorTableBTreePage => {
                let mut total = 0_u64;
                for entry in interior_table_entries(&page)? {
                    total += self.fast_count_rows(entry.child_page)?;
                }
                Ok(total)
            }
            PageType::InteriorIndexBTreePage => {
                let mut total = page.header.cell_count as u64;
                for entry in interior_index_entries(&mut self.file, &self.info, &page)? {
                    total += self.fast_count_rows(entry.child_page)?;
                }
                Ok(total)
            }
            PageType::LeafTableBTreePage | PageType::LeafIndexBTreePage => {
                Ok(page.header.cell_count as u64)
            }
        }
    }

    pub fn full_table_scan(&mut self, root_page: u32) -> Result<Vec<TableRecord>> {
        let mut table_data: Vec<TableRecord> = Vec::new();
        self.walk_btree_table_pages(root_page, &mut table_data)?;
        Ok(table_data)
    }

    // in-order walk of a table btree; index pages also show up here when a
    // table's storage root is an index btree (WITHOUT ROWID tables)
    fn walk_btree_table_pages(
        &mut self,
        page_number: u32,
        table_data: &mut Vec<TableRecord>,
    ) -> Result<()> {
        let page = Page::new(&mut self.file, page_number, &self.info)?;
        match page.page_type() {
            PageType::InteriorTableBTreePage => {
                for entry in interior_table_entries(&page)? {
                    self.walk_btree_table_pages(entry.child_page, table_data)?;
                }
            }
            PageType::LeafTableBTreePage => {
                let encoding = self.info.text_encoding;
                for cell in leaf_table_cells(&mut self.file, &self.info, &page)? {
                    let columns = parse_record(&cell.payload, encoding)?;
                    table_data.push(TableRecord {
                        rowid: cell.rowid,
                        columns,
                    });
                }
            }
            PageType::InteriorIndexBTreePage => {
                for entry in interior_index_entries(&mut self.file, &self.info, &page)? {
                    // the right-most pointer has no payload of its own
                    if !entry.key_payload.is_empty() {
                        let columns = parse_record(&entry.key_payload, self.info.text_encoding)?;
                        table_data.push(TableRecord { rowid: -1, columns });
                    }
                    self.walk_btree_table_pages(entry.child_page, table_data)?;
                }
            }
            PageType::LeafIndexBTreePage => {
                for payload in leaf_index_cells(&mut self.file, &self.info, &page)? {
                    let columns = parse_record(&payload, self.info.text_encoding)?;
                    table_data.push(TableRecord { rowid: -1, columns });
                }
            }
        }
        Ok(())
    }

    // translate an equality filter into rowids via the index btree, then
    // point-lookup each rowid back in the table btree
    pub fn indexed_table_scan(
        &mut self,
        root_page: u32,
        filter_index_page: u32,
        filter_value: &Value,
        index_sort_order: i32,
    ) -> Result<Vec<TableRecord>> {
        let mut rowids: Vec<i64> = Vec::new();
        self.walk_btree_index_pages(filter_index_page, filter_value, index_sort_order, &mut rowids)?;
        rowids.sort_unstable();

        let mut table_data: Vec<TableRecord> = Vec::with_capacity(rowids.len());
        for rowid in rowids {
            let Some(record) = self.get_record_by_rowid(root_page, rowid)? else {
                bail!("unexpected missing rowid: {rowid}")
            };
            table_data.push(record);
        }
        Ok(table_data)
    }
}
