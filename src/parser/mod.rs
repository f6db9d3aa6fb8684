pub mod schema;
pub mod tokenizer;

use crate::sqlite::data_containers::record::Value;
use anyhow::{bail, Result};
use tokenizer::Tokenizer;

// the supported SELECT subset:
//   SELECT (COUNT(*) | ident) [, ...] FROM ident [WHERE ident = literal]
// filter_column stays empty and filter_value Null when no WHERE is given
#[derive(Debug, PartialEq)]
pub struct SelectStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub filter_column: String,
    pub filter_value: Value,
}

pub fn parse_select_statement(query: &str) -> Result<SelectStatement> {
    let mut t = Tokenizer::new(query);

    t.must_match("SELECT")?;

    let mut columns: Vec<String> = Vec::new();
    loop {
        if t.match_token("COUNT") {
            t.must_match("(")?;
            t.must_match("*")?;
            t.must_match(")")?;
            columns.push("COUNT(*)".to_string());
        } else {
            columns.push(t.must_get_identifier()?);
        }
        if !t.match_token(",") {
            break;
        }
    }

    t.must_match("FROM")?;
    let table = t.must_get_identifier()?;

    let mut filter_column = String::new();
    let mut filter_value = Value::Null;
    if t.match_token("WHERE") {
        filter_column = t.must_get_identifier()?;
        t.must_match("=")?;
        filter_value = parse_literal(&mut t)?;
    }

    Ok(SelectStatement {
        table,
        columns,
        filter_column,
        filter_value,
    })
}

// integer, float or single-quoted string; the tokenizer keeps the quotes
// on string literals so they are recognizable here
fn parse_literal(t: &mut Tokenizer) -> Result<Value> {
    if t.at_end() {
        bail!("syntax error - expected literal");
    }
    let token = t.must_get_identifier()?;

    if token.starts_with('\'') {
        return Ok(Value::Text(token.trim_matches('\'').to_string()));
    }
    if let Ok(integer) = token.parse::<i64>() {
        return Ok(Value::Int(integer));
    }
    if let Ok(float) = token.parse::<f64>() {
        return Ok(Value::Real(float));
    }
    bail!("invalid literal in WHERE clause: {token}");
}
