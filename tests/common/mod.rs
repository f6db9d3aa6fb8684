use rusqlite::{params, Connection};
use std::path::PathBuf;
use tempfile::TempDir;

// fixture databases are generated with the reference sqlite library so
// the engine is always exercised against real files

pub fn sample_db(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("sample.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "PRAGMA page_size = 4096;
         CREATE TABLE apples
         (
             id integer primary key autoincrement,
             name text,
             color text
         );
         CREATE TABLE oranges
         (
             id integer primary key autoincrement,
             name text,
             description text
         );
         INSERT INTO apples (name, color) VALUES
             ('Granny Smith', 'Light Green'),
             ('Fuji', 'Red'),
             ('Honeycrisp', 'Blush Red'),
             ('Golden Delicious', 'Yellow');
         INSERT INTO oranges (name, description) VALUES
             ('Mandarin', 'great for snacking'),
             ('Tangelo', 'sweet and tart'),
             ('Tangerine', 'great for sweetness'),
             ('Clementine', 'usually seedless, great for snacking'),
             ('Valencia Orange', 'best for juicing'),
             ('Navel Orange', 'sweet with slight bitterness');",
    )
    .unwrap();
    path
}

// enough rows to force interior pages in both the table and index btrees
pub fn companies_db(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("companies.db");
    let mut conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "PRAGMA page_size = 4096;
         CREATE TABLE companies
         (
             id integer primary key,
             name text,
             country text
         );
         CREATE INDEX idx_companies_country ON companies (country);
         CREATE INDEX idx_companies_name_desc ON companies (name desc);",
    )
    .unwrap();

    let tx = conn.transaction().unwrap();
    {
        let mut insert = tx
            .prepare("INSERT INTO companies (id, name, country) VALUES (?1, ?2, ?3)")
            .unwrap();
        for i in 0..2000_i64 {
            insert
                .execute(params![
                    10_000 + i,
                    format!("company {i}"),
                    format!("country_{}", i % 20)
                ])
                .unwrap();
        }
        for (id, name, country) in [
            (6_387_751_i64, "fsm development bank", "micronesia"),
            (986_681, "isn network company limited", "tuvalu"),
            (3_583_436, "leiola group limited", "tonga"),
            (6_634_629, "asmara rental", "eritrea"),
            (2_828_420, "beacon point ltd", "north korea"),
        ] {
            insert.execute(params![id, name, country]).unwrap();
        }
    }
    tx.commit().unwrap();
    path
}

// one payload far past the embedded maximum, spilling across a chain of
// overflow pages, plus small neighbors and an empty table
pub fn docs_db(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("docs.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "PRAGMA page_size = 4096;
         CREATE TABLE docs
         (
             id integer primary key,
             title text,
             body text,
             score real,
             raw blob
         );
         CREATE TABLE empty (a text, b text);",
    )
    .unwrap();
    conn.execute(
        "INSERT INTO docs (id, title, body, score, raw) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![1, "short", "just a line", 1.5_f64, &b"plain bytes"[..]],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO docs (id, title, body, score, raw) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![2, "long", long_body(), 3_f64, &b"more bytes"[..]],
    )
    .unwrap();
    path
}

pub fn long_body() -> String {
    // 25_000 bytes with a recognizable tail
    let mut body = "abcdefghij".repeat(2_499);
    body.push_str("END-MARKER");
    body
}

// a table whose storage root is an index btree
pub fn keyed_db(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("keyed.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "PRAGMA page_size = 4096;
         CREATE TABLE kv (k text PRIMARY KEY, v text) WITHOUT ROWID;
         INSERT INTO kv (k, v) VALUES
             ('alpha', 'first'),
             ('beta', 'second'),
             ('gamma', 'third'),
             ('delta', 'fourth');",
    )
    .unwrap();
    path
}

pub fn utf16_db(dir: &TempDir, encoding: &str) -> PathBuf {
    let path = dir.path().join(format!("{encoding}.db"));
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        "PRAGMA encoding = '{encoding}';
         PRAGMA page_size = 4096;
         CREATE TABLE items
         (
             id integer primary key,
             label text
         );
         INSERT INTO items (id, label) VALUES
             (1, 'café'),
             (2, 'naïve'),
             (3, '日本語');"
    ))
    .unwrap();
    path
}
