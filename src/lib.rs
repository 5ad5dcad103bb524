pub mod analysis;
pub mod catalog;
pub mod error_handling;
pub mod grammar;
pub mod parser;
pub mod report;

pub use analysis::AnalysisOptions;
pub use grammar::Grammar;
