pub mod commands;
pub mod data_containers;
pub mod query_engine;
pub mod utils;

/* This module holds the sqlite specific logic
* 1. utilities for reading the on-disk encodings: big endian integers,
*    sqlite varints and the dynamic value comparator
* 2. types that represent the on disk data structures
*       - the 100 byte database file header
*       - btree pages and their four cell layouts
*       - the self describing record format and its serial types
* 3. the query engine on top of them
*       - fast row counting without payload decoding
*       - full table scans
*       - rowid point lookups through the table btree
*       - primary key lookups for index-rooted tables
*       - secondary index scans that collect rowids and join back
* */

use crate::parser::schema::{parse_create_index, parse_create_table, ColumnDef};
use anyhow::{bail, Context, Result};
use data_containers::headers::DatabaseHeader;
use data_containers::record::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Table,
    Index,
    Trigger,
    View,
}

impl TryFrom<&str> for SchemaType {
    type Error = String;
    fn try_from(value: &str) -> Result<SchemaType, Self::Error> {
        match value {
            "table" => Ok(Self::Table),
            "index" => Ok(Self::Index),
            "trigger" => Ok(Self::Trigger),
            "view" => Ok(Self::View),
            other => Err(format!("invalid schema object type: {other:?}")),
        }
    }
}

// one row of the schema table, with its DDL parsed where applicable
#[derive(Debug)]
pub struct SchemaEntry {
    pub entry_type: SchemaType,
    pub name: String,
    pub table_name: String,
    pub root_page: i64,
    pub sql: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<String>,
}

// the database context: an open file, its decoded header and the parsed
// schema; immutable once opened, read-only throughout
#[derive(Debug)]
pub struct DbContext {
    pub(crate) file: File,
    pub info: DatabaseHeader,
    pub schema: Vec<SchemaEntry>,
}

impl DbContext {
    pub fn open(path: impl AsRef<Path>) -> Result<DbContext> {
        let mut file = File::open(&path)
            .with_context(|| format!("cannot open {}", path.as_ref().display()))?;

        let mut header_buffer = [0_u8; 100];
        file.read_exact(&mut header_buffer)?;
        let info = DatabaseHeader::new(&header_buffer)?;

        let mut db = DbContext {
            file,
            info,
            schema: Vec::new(),
        };
        db.read_schema()?;
        Ok(db)
    }

    // the schema table is an ordinary table btree rooted at page 1 with
    // the columns (type, name, tbl_name, rootpage, sql)
    fn read_schema(&mut self) -> Result<()> {
        let schema_rows = self.full_table_scan(1)?;

        let mut schema: Vec<SchemaEntry> = Vec::with_capacity(schema_rows.len());
        let mut schema_size = 0_usize;

        for row in schema_rows {
            if row.columns.len() < 5 {
                bail!("malformed schema row: expected 5 columns");
            }
            let Value::Text(type_text) = &row.columns[0] else {
                bail!("malformed schema row: object type is not text")
            };
            let entry_type = match SchemaType::try_from(type_text.as_str()) {
                Ok(entry_type) => entry_type,
                Err(e) => bail!(e),
            };
            let Value::Text(name) = &row.columns[1] else {
                bail!("malformed schema row: object name is not text")
            };
            let Value::Text(table_name) = &row.columns[2] else {
                bail!("malformed schema row: table name is not text")
            };
            let Value::Int(root_page) = &row.columns[3] else {
                bail!("malformed schema row: root page is not an integer")
            };
            // internal objects such as auto-indexes carry no DDL
            let sql = match &row.columns[4] {
                Value::Text(sql) => sql.clone(),
                Value::Null => String::new(),
                other => bail!("malformed schema row: sql column is {other:?}"),
            };

            let mut entry = SchemaEntry {
                entry_type,
                name: name.clone(),
                table_name: table_name.clone(),
                root_page: *root_page,
                sql,
                columns: Vec::new(),
                constraints: Vec::new(),
            };

            match entry_type {
                SchemaType::Table => {
                    self.info.number_of_tables += 1;
                    if !entry.sql.is_empty() {
                        let (_, columns, constraints) = parse_create_table(&entry.sql)
                            .with_context(|| {
                                format!("error parsing schema for table {:?}", entry.name)
                            })?;
                        entry.columns = columns;
                        entry.constraints = constraints;
                    }
                }
                SchemaType::Index => {
                    self.info.number_of_indexes += 1;
                    if !entry.sql.is_empty() {
                        let (_, _, columns) = parse_create_index(&entry.sql).with_context(|| {
                            format!("error parsing schema for index {:?}", entry.name)
                        })?;
                        entry.columns = columns;
                    }
                }
                SchemaType::Trigger => self.info.number_of_triggers += 1,
                SchemaType::View => self.info.number_of_views += 1,
            }

            schema_size += entry.sql.len();
            schema.push(entry);
        }

        self.info.schema_size = schema_size as u32;
        self.schema = schema;
        Ok(())
    }
}
