use crate::parser::schema::{parse_create_table, ColumnDef};
use crate::parser::{parse_select_statement, SelectStatement};
use crate::sqlite::data_containers::record::Value;
use crate::sqlite::query_engine::TableRecord;
use crate::sqlite::utils::compare_values;
use crate::sqlite::{DbContext, SchemaType};
use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::io::Write;
use tracing::debug;

// the schema table itself has no stored definition; this is the one from
// https://www.sqlite.org/fileformat.html#storage_of_the_sql_database_schema
const SCHEMA_TABLE_DDL: &str =
    "CREATE TABLE sqlite_schema(type text, name text, tbl_name text, rootpage integer, sql text)";

impl DbContext {
    pub fn print_db_info<W: Write>(&self, writer: &mut W) -> Result<()> {
        let info = &self.info;
        writeln!(writer, "database page size:  {}", info.page_size)?;
        writeln!(writer, "write format:        {}", info.write_format)?;
        writeln!(writer, "read format:         {}", info.read_format)?;
        writeln!(writer, "reserved bytes:      {}", info.reserved_bytes)?;
        writeln!(writer, "file change counter: {}", info.file_change_counter)?;
        writeln!(writer, "database page count: {}", info.database_page_count)?;
        writeln!(writer, "freelist page count: {}", info.freelist_page_count)?;
        writeln!(writer, "schema cookie:       {}", info.schema_cookie)?;
        writeln!(writer, "schema format:       {}", info.schema_format)?;
        writeln!(writer, "default cache size:  {}", info.default_cache_size)?;
        writeln!(writer, "autovacuum top root: {}", info.autovacuum_top_root)?;
        writeln!(writer, "incremental vacuum:  {}", info.incremental_vacuum)?;
        writeln!(
            writer,
            "text encoding:       {}{}",
            info.text_encoding.code(),
            info.text_encoding.description()
        )?;
        writeln!(writer, "user version:        {}", info.user_version)?;
        writeln!(writer, "application id:      {}", info.application_id)?;
        writeln!(writer, "software version:    {}", info.software_version)?;
        writeln!(writer, "number of tables:    {}", info.number_of_tables)?;
        writeln!(writer, "number of indexes:   {}", info.number_of_indexes)?;
        writeln!(writer, "number of triggers:  {}", info.number_of_triggers)?;
        writeln!(writer, "number of views:     {}", info.number_of_views)?;
        writeln!(writer, "schema size:         {}", info.schema_size)?;
        Ok(())
    }

    // tables and views, sorted, hiding the sqlite_ internals
    pub fn print_tables<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut tables: Vec<&str> = self
            .schema
            .iter()
            .filter(|entry| {
                matches!(entry.entry_type, SchemaType::Table | SchemaType::View)
                    && !entry.name.starts_with("sqlite_")
            })
            .map(|entry| entry.name.as_str())
            .collect();
        tables.sort_unstable();
        writeln!(writer, "{}", tables.join(" "))?;
        Ok(())
    }

    pub fn print_indexes<W: Write>(&self, writer: &mut W) -> Result<()> {
        for entry in &self.schema {
            if entry.entry_type == SchemaType::Index {
                write!(writer, "{} ", entry.name)?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }

    pub fn print_schema<W: Write>(&self, writer: &mut W) -> Result<()> {
        for entry in &self.schema {
            if !entry.sql.is_empty() {
                writeln!(writer, "{};", entry.sql)?;
            }
        }
        Ok(())
    }

    pub fn handle_select<W: Write>(&mut self, query: &str, writer: &mut W) -> Result<()> {
        let SelectStatement {
            table,
            columns: query_column_names,
            filter_column,
            filter_value,
        } = parse_select_statement(query)?;

        // resolve the target's root page and column definitions
        let mut root_page = 0_i64;
        let mut table_columns: Vec<ColumnDef> = Vec::new();

        if table.eq_ignore_ascii_case("sqlite_schema") || table.eq_ignore_ascii_case("sqlite_master")
        {
            root_page = 1;
            let (_, columns, _) = parse_create_table(SCHEMA_TABLE_DDL)?;
            table_columns = columns;
        }

        for entry in &self.schema {
            if entry.entry_type == SchemaType::Table && table.eq_ignore_ascii_case(&entry.name) {
                root_page = entry.root_page;
                table_columns = entry.columns.clone();
                break;
            }
        }

        if root_page < 1 {
            bail!("no such table: {table}");
        }
        let root_page = root_page as u32;

        let counting_only = query_column_names[0].eq_ignore_ascii_case("COUNT(*)");

        // a fast count avoids decoding any row data
        if counting_only && filter_column.is_empty() {
            let row_count = self.fast_count_rows(root_page)?;
            writeln!(writer, "{row_count}")?;
            return Ok(());
        }

        let mut query_column_numbers: Vec<usize> = Vec::new();
        if !counting_only {
            if query_column_names.len() == 1 && query_column_names[0] == "*" {
                query_column_numbers = (0..table_columns.len()).collect();
            } else {
                for query_column_name in &query_column_names {
                    let Some(number) = table_columns
                        .iter()
                        .position(|column| query_column_name.eq_ignore_ascii_case(&column.name))
                    else {
                        bail!("no such column: {query_column_name}")
                    };
                    query_column_numbers.push(number);
                }
            }
        }

        // an INTEGER PRIMARY KEY column is stored as null and aliased to
        // the rowid; it must be filled in before output or comparison
        let aliased_pk_column_number = table_columns.iter().position(|column| {
            column.type_name.eq_ignore_ascii_case("INTEGER")
                && column
                    .constraints
                    .iter()
                    .any(|token| token.eq_ignore_ascii_case("PRIMARY"))
        });

        let mut filter_column_number: Option<usize> = None;
        let mut filter_index_page: Option<i64> = None;
        let mut index_sort_order = 1_i32;
        let mut rowid_filter = false;

        if filter_column.eq_ignore_ascii_case("rowid") {
            rowid_filter = true;
            filter_column_number = aliased_pk_column_number;
        } else if !filter_column.is_empty() {
            let Some(number) = table_columns
                .iter()
                .position(|column| filter_column.eq_ignore_ascii_case(&column.name))
            else {
                bail!("no such column: {filter_column}")
            };
            filter_column_number = Some(number);

            // a secondary index whose first column is the filter column can
            // service the query; its declared order drives the traversal
            for entry in &self.schema {
                if entry.entry_type == SchemaType::Index
                    && table.eq_ignore_ascii_case(&entry.table_name)
                    && entry
                        .columns
                        .first()
                        .is_some_and(|column| filter_column.eq_ignore_ascii_case(&column.name))
                {
                    filter_index_page = Some(entry.root_page);
                    if entry.columns[0].type_name.eq_ignore_ascii_case("DESC") {
                        index_sort_order = -1;
                    }
                    break;
                }
            }

            // no index, but a PRIMARY column: the table's own root serves as
            // the key btree (rowid alias or WITHOUT ROWID storage)
            if filter_index_page.is_none()
                && table_columns[number]
                    .constraints
                    .iter()
                    .any(|token| token.eq_ignore_ascii_case("PRIMARY"))
            {
                filter_index_page = Some(root_page as i64);
            }
        }

        debug!(
            table = %table,
            root_page,
            ?filter_column_number,
            ?filter_index_page,
            index_sort_order,
            rowid_filter,
            "selected query strategy"
        );

        let table_data: Vec<TableRecord> = if rowid_filter {
            let Value::Int(target) = &filter_value else {
                bail!("rowid lookup requires an integer literal")
            };
            match self.get_record_by_rowid(root_page, *target)? {
                Some(record) => vec![record],
                None => Vec::new(),
            }
        } else if let Some(index_page) = filter_index_page {
            if filter_column_number.is_some() && filter_column_number == aliased_pk_column_number {
                let Value::Int(target) = &filter_value else {
                    bail!("rowid lookup requires an integer literal")
                };
                match self.get_record_by_rowid(root_page, *target)? {
                    Some(record) => vec![record],
                    None => Vec::new(),
                }
            } else if index_page == root_page as i64 {
                let Some(number) = filter_column_number else {
                    bail!("primary key lookup without a filter column")
                };
                match self.get_record_by_pk(root_page, number, &filter_value)? {
                    Some(record) => vec![record],
                    None => Vec::new(),
                }
            } else {
                self.indexed_table_scan(
                    root_page,
                    index_page as u32,
                    &filter_value,
                    index_sort_order,
                )?
            }
        } else {
            self.full_table_scan(root_page)?
        };

        let mut row_count = 0_u64;
        for mut table_row in table_data {
            if let Some(pk) = aliased_pk_column_number {
                if pk < table_row.columns.len() {
                    table_row.columns[pk] = Value::Int(table_row.rowid);
                }
            }
            if let Some(number) = filter_column_number {
                let Some(stored) = table_row.columns.get(number) else {
                    continue;
                };
                if compare_values(stored, &filter_value)? != Ordering::Equal {
                    continue;
                }
            }
            if counting_only {
                row_count += 1;
                continue;
            }
            for (i, &number) in query_column_numbers.iter().enumerate() {
                if i > 0 {
                    write!(writer, "|")?;
                }
                if let Some(value) = table_row.columns.get(number) {
                    write!(writer, "{value}")?;
                }
            }
            writeln!(writer)?;
        }

        if counting_only {
            writeln!(writer, "{row_count}")?;
        }

        Ok(())
    }
}
