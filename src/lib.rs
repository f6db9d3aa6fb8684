/* A read-only query engine for SQLite database files.
*
* The crate is split into two halves:
*   - parser: a small tokenizer plus hand written parsers for the
*     CREATE TABLE / CREATE INDEX DDL found in the schema table and for
*     the supported SELECT subset
*   - sqlite: the file format decoders (header, btree pages, records)
*     and the query engine that walks them
*
* Everything hangs off DbContext, which owns the open file, the decoded
* header and the parsed schema.
* */

pub mod parser;
pub mod sqlite;

pub use sqlite::DbContext;
