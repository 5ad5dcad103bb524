mod cli;

use std::path::Path;
use std::process::ExitCode;

use attrsys::catalog::{self, CatalogEntry};
use attrsys::report::Report;
use attrsys::Grammar;
use clap::Parser;
use cli::Cli;
use tracing::{info, Level};

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn print_error(error: impl std::fmt::Display) {
    eprintln!("\x1b[31;49;1m[error]\x1b[39;49;1m  {}\x1b[0m", error);
}

// Picks the catalog entry asked for on the command line. A catalog that
// cannot be loaded is reported and replaced by the default grammar.
fn catalog_entry(path: &Path, cli: &Cli) -> Option<CatalogEntry> {
    let entries = match catalog::load(path) {
        Ok(entries) => entries,
        Err(error) => {
            print_error(&error);
            return Some(catalog::default_entry());
        }
    };

    let entry = if let Some(title) = &cli.title {
        catalog::find_by_title(&entries, title)
    } else if cli.random {
        catalog::choose_random(&entries)
    } else {
        entries.first()
    };

    if entry.is_none() {
        print_error(format!("No grammar titled '{}' in {}", cli.title.as_deref().unwrap_or_default(), path.display()));
    }
    entry.cloned()
}

fn grammar_text(cli: &Cli) -> Option<String> {
    if let Some(path) = &cli.file {
        return match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(error) => {
                print_error(format!("{}: {}", path.display(), error));
                None
            }
        };
    }

    let entry = match &cli.catalog {
        Some(path) => catalog_entry(path, cli)?,
        None => catalog::default_entry(),
    };

    info!(title = %entry.title, "analysing catalog grammar");
    println!("{}\n", entry.title);
    Some(entry.grammar_text())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(text) = grammar_text(&cli) else {
        return ExitCode::FAILURE;
    };

    let grammar = Grammar::new(&text);
    if grammar.has_errors() {
        for error in grammar.errors() {
            print_error(error);
        }
        return ExitCode::FAILURE;
    }

    print!("{}", Report::new(&grammar, cli.iterations));
    ExitCode::SUCCESS
}
