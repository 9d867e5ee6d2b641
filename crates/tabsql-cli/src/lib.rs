//! Binary-facing glue: argument parsing, logging, script loading and
//! rendering of [`tabsql_engine::StatementResult`]s. The engine itself
//! (parsing, evaluation, commit) lives in `tabsql-engine`; this crate only
//! wires it to a process's argv/stdin/stdout.

use std::fs;
use std::io::Write;

use clap::Parser;
use tabsql_engine::{Engine, EngineConfig};

pub mod commands;
mod formatters;
mod logger;
mod stdin;

use commands::Cli;

pub fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let _ = logger::init();
    let cli = Cli::parse_from(args);

    match run(&cli) {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{message}");
            1
        }
    }
}

fn run(cli: &Cli) -> Result<i32, String> {
    let source = if stdin::is_stdin_flag(&cli.script) {
        stdin::read_stdin()?
    } else {
        fs::read_to_string(&cli.script).map_err(|e| format!("failed to read {}: {e}", cli.script.display()))?
    };

    let statements = tabsql_parser::parse_script(&source).map_err(|e| e.to_string())?;

    let base_dir = cli
        .base_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let config = EngineConfig {
        base_dir,
        default_delimiter: cli.delimiter_byte()?,
        default_encoding: cli.encoding.into(),
        default_line_break: cli.line_break(),
        default_no_header: cli.no_header,
        without_null: cli.without_null,
        ..EngineConfig::default()
    };

    let mut engine = Engine::new(config);
    let results = engine.execute_script(&statements).map_err(|e| e.to_string())?;

    let mut rendered = String::new();
    for result in &results {
        let line = formatters::render(result, cli.stats);
        if !line.is_empty() {
            rendered.push_str(&line);
            rendered.push('\n');
        }
    }

    match &cli.out {
        Some(path) => fs::write(path, rendered).map_err(|e| format!("failed to write {}: {e}", path.display()))?,
        None => {
            print!("{rendered}");
            std::io::stdout().flush().map_err(|e| e.to_string())?;
        }
    }

    Ok(0)
}
