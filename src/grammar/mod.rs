/*
    This module stores attribute grammars and the results of analysing them
*/

mod dependency;
mod iteration;
mod symbol;

use std::collections::HashSet;
use std::fmt::Display;

use itertools::Itertools;

use crate::analysis::{self, AnalysisOptions};
use crate::parser::{self, GrammarError};

pub use dependency::*;
pub use iteration::*;
pub use symbol::*;

// A non-terminal followed by the sequence of symbols it derives
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRule {
    // Entry 0 is the left-hand side, the rest is the right-hand side
    symbols: Vec<Symbol>,
    iterations: Vec<ProductionRuleIteration>,
}

impl ProductionRule {
    pub fn new(left_side: Symbol, right_side: Vec<Symbol>) -> Self {
        let mut symbols = Vec::with_capacity(right_side.len() + 1);
        symbols.push(left_side);
        symbols.extend(right_side);

        ProductionRule {
            symbols,
            iterations: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut [Symbol] {
        &mut self.symbols
    }

    pub fn symbol_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(Symbol::name)
    }

    pub fn has(&self, symbol_name: &str) -> bool {
        self.symbol_names().any(|name| name == symbol_name)
    }

    pub fn number_of_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn max_index(&self) -> usize {
        self.number_of_symbols() - 1
    }

    pub fn empty_word_on_the_right(&self) -> bool {
        self.number_of_symbols() == 1
    }

    pub fn left_side(&self) -> &Symbol {
        &self.symbols[0]
    }

    pub fn right_side(&self) -> &[Symbol] {
        &self.symbols[1..]
    }

    pub fn right_side_length(&self) -> usize {
        self.right_side().len()
    }

    pub fn iterations(&self) -> &[ProductionRuleIteration] {
        &self.iterations
    }

    pub fn iteration(&self, round: usize) -> Option<&ProductionRuleIteration> {
        self.iterations.get(round)
    }

    pub fn add_iteration(&mut self) {
        self.iterations.push(ProductionRuleIteration::default());
    }

    pub(crate) fn current_iteration_mut(&mut self) -> Option<&mut ProductionRuleIteration> {
        self.iterations.last_mut()
    }

    pub fn attribute_at(&self, symbol_index: usize, attribute_index: usize) -> Option<&Attribute> {
        self.symbols.get(symbol_index)?.attributes().get_at(attribute_index)
    }
}

impl Display for ProductionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ->", self.left_side().name())?;

        if self.empty_word_on_the_right() {
            write!(f, " ε")
        } else {
            write!(f, " {}", self.right_side().iter().map(Symbol::name).join(" "))
        }
    }
}

/// An attribute grammar parsed from text, together with its strong
/// acyclicity analysis.
///
/// Built once by [`Grammar::new`]. Rows with errors are left out and reported
/// in [`Grammar::errors`]; everything else is still parsed and analysed so
/// that all problems can be shown at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    // All names in order of first appearance
    pub(crate) all_symbol_names: Vec<String>,
    pub(crate) all_nonterminal_names: HashSet<String>,
    pub(crate) all_terminal_names: Vec<String>,
    pub(crate) all_attribute_names: Vec<String>,
    pub(crate) production_rules: Vec<ProductionRule>,
    pub(crate) errors: Vec<GrammarError>,
    // Symbols plus attributes (graph nodes) of each production rule
    pub(crate) number_of_elements_per_rule: Vec<usize>,
    pub(crate) strong_acyclicity: StrongAcyclicity,
}

impl Grammar {
    pub fn new(grammar_text: &str) -> Self {
        Grammar::with_options(grammar_text, &AnalysisOptions::default())
    }

    pub fn with_options(grammar_text: &str, options: &AnalysisOptions) -> Self {
        let mut grammar = parser::parse_grammar(grammar_text);
        analysis::compute_strong_acyclicity(&mut grammar, options);
        return grammar;
    }

    pub fn errors(&self) -> &[GrammarError] {
        &self.errors
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn production_rules(&self) -> &[ProductionRule] {
        &self.production_rules
    }

    pub fn all_symbol_names(&self) -> &[String] {
        &self.all_symbol_names
    }

    pub fn all_nonterminal_names(&self) -> &HashSet<String> {
        &self.all_nonterminal_names
    }

    // Non-terminals in order of first appearance as a left-hand side
    pub fn nonterminal_names(&self) -> impl Iterator<Item = &str> {
        self.strong_acyclicity.nonterminals().iter().map(Nonterminal::name)
    }

    pub fn all_terminal_names(&self) -> &[String] {
        &self.all_terminal_names
    }

    pub fn is_terminal(&self, symbol_name: &str) -> bool {
        self.all_terminal_names.iter().any(|name| name == symbol_name)
    }

    pub fn is_nonterminal(&self, symbol_name: &str) -> bool {
        self.all_nonterminal_names.contains(symbol_name)
    }

    pub fn all_attribute_names(&self) -> &[String] {
        &self.all_attribute_names
    }

    pub fn all_attribute_names_array(&self) -> Vec<String> {
        self.all_attribute_names.clone()
    }

    pub fn number_of_elements_per_rule(&self) -> &[usize] {
        &self.number_of_elements_per_rule
    }

    pub fn strong_acyclicity(&self) -> &StrongAcyclicity {
        &self.strong_acyclicity
    }

    pub fn nonterminal(&self, name: &str) -> Option<&Nonterminal> {
        self.strong_acyclicity.nonterminal(name)
    }

    pub fn production_rules_of<'a>(&'a self, nonterminal: &'a Nonterminal) -> impl Iterator<Item = &'a ProductionRule> {
        nonterminal
            .production_rule_indices()
            .iter()
            .filter_map(|&index| self.production_rules.get(index))
    }

    // The round that found no new relations, shown to the learner as the final one
    pub fn final_iteration_index(&self) -> Option<usize> {
        self.strong_acyclicity.number_of_iterations().checked_sub(1)
    }
}
