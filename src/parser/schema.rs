use super::tokenizer::Tokenizer;
use anyhow::{bail, Result};

// keywords that open a table-level constraint
const TABLE_CONSTRAINT_KEYWORDS: [&str; 5] = ["PRIMARY", "CONSTRAINT", "UNIQUE", "CHECK", "FOREIGN"];

// keywords that end a column's type tokens and open its constraints
const COLUMN_CONSTRAINT_KEYWORDS: [&str; 10] = [
    "PRIMARY",
    "CONSTRAINT",
    "UNIQUE",
    "CHECK",
    "REFERENCES",
    "NOT",
    "NULL",
    "DEFAULT",
    "COLLATE",
    "GENERATED",
];

// one parsed column: name, free-form declared type (possibly empty) and
// the flat list of constraint tokens; index columns reuse the shape with
// the sort order carried in type_name
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: String,
    pub constraints: Vec<String>,
}

fn is_keyword(token: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| token.eq_ignore_ascii_case(k))
}

// CREATE [TEMP|TEMPORARY] TABLE [IF NOT EXISTS] name ( column_def | table_constraint, ... )
pub fn parse_create_table(sql: &str) -> Result<(String, Vec<ColumnDef>, Vec<String>)> {
    let mut t = Tokenizer::new(sql);

    t.must_match("CREATE")?;
    if !t.match_token("TEMP") {
        t.match_token("TEMPORARY");
    }
    t.must_match("TABLE")?;
    if t.match_token("IF") {
        t.must_match("NOT")?;
        t.must_match("EXISTS")?;
    }
    let table_name = t.must_get_identifier()?;
    t.must_match("(")?;

    // split the body on top-level commas; nested parens (type sizes,
    // CHECK expressions, key column lists) stay inside one definition
    let mut definitions: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut depth = 0_usize;
    loop {
        if t.at_end() {
            bail!("syntax error - unterminated CREATE TABLE body");
        }
        let token = t.must_get_identifier()?;
        match token.as_str() {
            "(" => {
                depth += 1;
                current.push(token);
            }
            ")" if depth == 0 => {
                if !current.is_empty() {
                    definitions.push(std::mem::take(&mut current));
                }
                break;
            }
            ")" => {
                depth -= 1;
                current.push(token);
            }
            "," if depth == 0 => definitions.push(std::mem::take(&mut current)),
            _ => current.push(token),
        }
    }

    let mut columns: Vec<ColumnDef> = Vec::new();
    let mut constraints: Vec<String> = Vec::new();

    for definition in definitions {
        let Some(first) = definition.first() else {
            bail!("syntax error - empty definition in CREATE TABLE");
        };
        if is_keyword(first, &TABLE_CONSTRAINT_KEYWORDS) {
            // table constraints keep their tokens flat, in order
            constraints.extend(definition);
            continue;
        }

        // column definitions always start with the column name
        let mut column = ColumnDef {
            name: definition[0].clone(),
            type_name: String::new(),
            constraints: Vec::new(),
        };
        let mut type_tokens: Vec<String> = Vec::new();
        let mut rest = definition[1..].iter();
        for token in rest.by_ref() {
            if is_keyword(token, &COLUMN_CONSTRAINT_KEYWORDS) {
                column.constraints.push(token.clone());
                break;
            }
            type_tokens.push(token.clone());
        }
        column.constraints.extend(rest.cloned());
        column.type_name = type_tokens.join(" ");
        columns.push(column);
    }

    reflect_table_primary_key(&mut columns, &constraints);

    Ok((table_name, columns, constraints))
}

// a table-level PRIMARY KEY (col) must show up on the target column so
// downstream code sees a uniform view; multi-column keys are out of scope
fn reflect_table_primary_key(columns: &mut [ColumnDef], constraints: &[String]) {
    for (i, token) in constraints.iter().enumerate() {
        if !token.eq_ignore_ascii_case("PRIMARY") {
            continue;
        }
        let Some(next) = constraints.get(i + 1) else {
            continue;
        };
        if !next.eq_ignore_ascii_case("KEY") {
            continue;
        }
        let mut j = i + 2;
        if constraints.get(j).map(String::as_str) == Some("(") {
            j += 1;
        }
        let Some(column_name) = constraints.get(j) else {
            continue;
        };
        let column_name = column_name.trim_matches(|c| c == '(' || c == ')');
        for column in columns.iter_mut() {
            if column.name.eq_ignore_ascii_case(column_name) {
                column.constraints.push("PRIMARY".to_string());
                column.constraints.push("KEY".to_string());
            }
        }
    }
}

// CREATE [UNIQUE] INDEX [IF NOT EXISTS] name ON table ( col [COLLATE c] [ASC|DESC], ... )
// the per-column sort order rides in type_name, ASC by default
pub fn parse_create_index(sql: &str) -> Result<(String, String, Vec<ColumnDef>)> {
    let mut t = Tokenizer::new(sql);

    t.must_match("CREATE")?;
    t.match_token("UNIQUE");
    t.must_match("INDEX")?;
    if t.match_token("IF") {
        t.must_match("NOT")?;
        t.must_match("EXISTS")?;
    }
    let index_name = t.must_get_identifier()?;
    t.must_match("ON")?;
    let table_name = t.must_get_identifier()?;
    t.must_match("(")?;

    let mut columns: Vec<ColumnDef> = Vec::new();
    loop {
        let name = t.must_get_identifier()?;
        if t.match_token("COLLATE") {
            t.must_get_identifier()?;
        }
        let mut order = "ASC";
        if t.match_token("DESC") {
            order = "DESC";
        } else {
            t.match_token("ASC");
        }
        columns.push(ColumnDef {
            name,
            type_name: order.to_string(),
            constraints: Vec::new(),
        });
        if !t.match_token(",") {
            break;
        }
    }
    t.must_match(")")?;

    Ok((index_name, table_name, columns))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_plain_table() {
        let (name, columns, constraints) =
            parse_create_table("CREATE TABLE apples (id integer primary key autoincrement, name text, color text)")
                .unwrap();
        assert_eq!(name, "apples");
        assert_eq!(constraints.len(), 0);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].type_name, "integer");
        assert_eq!(columns[0].constraints, ["primary", "key", "autoincrement"]);
        assert_eq!(columns[1].name, "name");
        assert_eq!(columns[1].type_name, "text");
        assert!(columns[1].constraints.is_empty());
    }

    #[test]
    fn parses_quoted_table_name_and_multiline_body() {
        let sql = r#"
            CREATE TABLE "superheroes" (
                id integer primary key autoincrement,
                name text not null,
                eye_color text,
                hair_color text,
                appearance_count integer,
                first_appearance text,
                first_appearance_year text
            )"#;
        let (name, columns, _) = parse_create_table(sql).unwrap();
        assert_eq!(name, "superheroes");
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[1].constraints, ["not", "null"]);
    }

    #[test]
    fn columns_without_types() {
        let (_, columns, _) = parse_create_table("CREATE TABLE sqlite_sequence(name,seq)").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "name");
        assert_eq!(columns[0].type_name, "");
        assert_eq!(columns[1].name, "seq");
    }

    #[test]
    fn multi_word_types_and_sizes() {
        let (_, columns, _) =
            parse_create_table("CREATE TABLE t (a varchar(10) not null, b unsigned big int)")
                .unwrap();
        assert_eq!(columns[0].type_name, "varchar ( 10 )");
        assert_eq!(columns[0].constraints, ["not", "null"]);
        assert_eq!(columns[1].type_name, "unsigned big int");
    }

    #[test]
    fn table_level_primary_key_reflects_on_column() {
        let (_, columns, constraints) =
            parse_create_table("CREATE TABLE t (k text, v text, PRIMARY KEY (k))").unwrap();
        assert!(constraints.iter().any(|c| c.eq_ignore_ascii_case("PRIMARY")));
        assert_eq!(columns[0].constraints, ["PRIMARY", "KEY"]);
        assert!(columns[1].constraints.is_empty());
    }

    #[test]
    fn if_not_exists_and_temp_prefixes() {
        let (name, columns, _) =
            parse_create_table("CREATE TEMP TABLE IF NOT EXISTS t (a integer)").unwrap();
        assert_eq!(name, "t");
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn non_create_ddl_is_fatal() {
        assert!(parse_create_table("ALTER TABLE t ADD COLUMN a").is_err());
        assert!(parse_create_table("").is_err());
    }

    #[test]
    fn parses_index_columns_and_orders() {
        let (index_name, table_name, columns) =
            parse_create_index("create index idx on tab (a, b desc, c asc)").unwrap();
        assert_eq!(index_name, "idx");
        assert_eq!(table_name, "tab");
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        let orders: Vec<&str> = columns.iter().map(|c| c.type_name.as_str()).collect();
        assert_eq!(orders, ["ASC", "DESC", "ASC"]);
    }

    #[test]
    fn parses_unique_index_with_collate() {
        let (index_name, table_name, columns) =
            parse_create_index("CREATE UNIQUE INDEX idx_u ON t (a COLLATE nocase DESC)").unwrap();
        assert_eq!(index_name, "idx_u");
        assert_eq!(table_name, "t");
        assert_eq!(columns[0].type_name, "DESC");
    }
}
