use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// File containing the attribute grammar (default: the lecture slides example)
    #[arg(conflicts_with = "catalog")]
    pub file: Option<PathBuf>,

    /// JSON file with a list of titled grammars
    #[arg(short, long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Title of the catalog grammar to analyse (default: first in the catalog)
    #[arg(short, long, value_name = "TITLE", requires = "catalog", conflicts_with = "random")]
    pub title: Option<String>,

    /// Analyse a catalog grammar picked at random
    #[arg(short, long, requires = "catalog")]
    pub random: bool,

    /// Show every round of the strong acyclicity test
    #[arg(short, long)]
    pub iterations: bool,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
