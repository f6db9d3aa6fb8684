use anyhow::{bail, Result};
use litequery::DbContext;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, Write};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <database.db> [<command> ...]", args[0]);
    }

    let mut db = DbContext::open(&args[1])?;

    if args.len() == 2 {
        return repl(&mut db);
    }

    // batch mode stops at the first failing command
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    for command in &args[2..] {
        execute(&mut db, command, &mut writer)?;
    }
    Ok(())
}

fn execute<W: Write>(db: &mut DbContext, command: &str, writer: &mut W) -> Result<()> {
    match command {
        ".dbinfo" => db.print_db_info(writer),
        ".tables" => db.print_tables(writer),
        ".indexes" => db.print_indexes(writer),
        ".schema" => db.print_schema(writer),
        _ if command.to_uppercase().contains("SELECT") => db.handle_select(command, writer),
        _ => bail!("unknown command: {command:?}"),
    }
}

fn repl(db: &mut DbContext) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let command = line.trim();
                if command.is_empty() {
                    continue;
                }
                if command == ".exit" {
                    break;
                }
                let _ = editor.add_history_entry(command);
                let stdout = io::stdout();
                let mut writer = stdout.lock();
                // a failed command reports and the prompt resumes
                if let Err(e) = execute(db, command, &mut writer) {
                    eprintln!("error: {e:#}");
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
