use anyhow::{bail, Result};
use std::iter::Peekable;
use std::str::Chars;

// splits DDL and query text into flat string tokens:
//   - whitespace separates, `-- ...` line comments are skipped
//   - "quoted" and [bracketed] identifiers lose their quoting
//   - 'string literals' keep their quotes so callers can tell them apart
//   - ( ) , * are single-character tokens
//   - numbers start with + - or a digit and run over + - . e E and digits
//   - anything else is an identifier-like run ended by whitespace or by
//     one of ( ) , * [ "
pub struct Tokenizer {
    tokens: Vec<String>,
    current: usize,
}

impl Tokenizer {
    pub fn new(source: &str) -> Tokenizer {
        Tokenizer {
            tokens: tokenize(source),
            current: 0,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    pub fn peek(&self) -> &str {
        if self.at_end() {
            ""
        } else {
            &self.tokens[self.current]
        }
    }

    pub fn previous(&self) -> &str {
        if self.current > 0 {
            &self.tokens[self.current - 1]
        } else {
            ""
        }
    }

    pub fn advance(&mut self) {
        if !self.at_end() {
            self.current += 1;
        }
    }

    // consume the next token when it matches case-insensitively
    pub fn match_token(&mut self, expected: &str) -> bool {
        if !self.at_end() && self.tokens[self.current].eq_ignore_ascii_case(expected) {
            self.current += 1;
            return true;
        }
        false
    }

    pub fn must_match(&mut self, expected: &str) -> Result<()> {
        if !self.match_token(expected) {
            bail!("syntax error near {:?} expected: {expected}", self.peek());
        }
        Ok(())
    }

    pub fn must_get_identifier(&mut self) -> Result<String> {
        if self.at_end() {
            bail!("syntax error - expected identifier");
        }
        let result = self.tokens[self.current].clone();
        self.current += 1;
        Ok(result)
    }
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }

        // line comments run to the end of the line
        if ch == '-' && chars.peek() == Some(&'-') {
            for c in chars.by_ref() {
                if c == '\n' {
                    break;
                }
            }
            continue;
        }

        match ch {
            '"' => tokens.push(take_until(&mut chars, '"')),
            '[' => tokens.push(take_until(&mut chars, ']')),
            '\'' => {
                // quotes stay part of the token
                let mut token = String::from('\'');
                for c in chars.by_ref() {
                    token.push(c);
                    if c == '\'' {
                        break;
                    }
                }
                tokens.push(token);
            }
            '(' | ')' | ',' | '*' => tokens.push(ch.to_string()),
            '-' | '+' | '0'..='9' => {
                let mut token = String::from(ch);
                while let Some(&c) = chars.peek() {
                    match c {
                        '-' | '+' | '0'..='9' | '.' | 'e' | 'E' => {
                            token.push(c);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                tokens.push(token);
            }
            _ => {
                let mut token = String::from(ch);
                while let Some(&c) = chars.peek() {
                    if matches!(c, '(' | ')' | ',' | '*' | '[' | '"') {
                        break;
                    }
                    chars.next();
                    if c.is_whitespace() {
                        break;
                    }
                    token.push(c);
                }
                tokens.push(token);
            }
        }
    }

    tokens
}

// collect characters up to a closing delimiter, dropping the delimiter
fn take_until(chars: &mut Peekable<Chars>, end: char) -> String {
    let mut token = String::new();
    for c in chars.by_ref() {
        if c == end {
            break;
        }
        token.push(c);
    }
    token
}
