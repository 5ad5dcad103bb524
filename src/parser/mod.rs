/*
    This module parses attribute grammars written as text
*/

pub mod lexer;
mod reconcile;

use std::collections::BTreeSet;
use std::fmt::Display;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::error_handling::*;
use crate::grammar::{AttributeCoordinate, DependencyKey, Grammar};
use lexer::*;

pub const FORBIDDEN_SYMBOLS: [char; 4] = ['[', ']', ';', '='];

#[derive(Debug, PartialEq, Clone)]
pub enum GrammarErrorType {
    // A row contains more than one `:`
    MultipleSeparators,
    // The production rule does not contain exactly one `->`
    MissingArrow,
    // Nothing in front of the arrow
    MissingNonterminal,
    // A left-hand side contains one of the forbidden symbols
    ForbiddenCharacters,
    // A right-hand side contains one of the forbidden symbols, most likely
    // because the `:` in front of the equations is missing
    ForbiddenCharactersOnTheRight,
    // More than one symbol in front of the arrow
    MultipleNonterminals,
    // An equation without `=`
    MissingEquals,
    // An equation with more than one `=`
    MultipleEquals,
    // No `name[index]` on the left of an equation
    MalformedLeftAttribute,
    // Several `name[index]` on the left of an equation
    MultipleLeftAttributes,
    // An index beyond the last symbol of the rule, in the given equation half
    IndexOutOfRange(String),
    // A dependency points to an attribute its symbol does not have
    // This is a problem with attrsys, not the grammar
    UnresolvedDependency,
}

impl ErrorType for GrammarErrorType {}

impl Display for GrammarErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let forbidden = FORBIDDEN_SYMBOLS.iter().join(" ");
        match self {
            GrammarErrorType::MultipleSeparators => write!(f, "There can only be one separator ':' in a row."),
            GrammarErrorType::MissingArrow => write!(f, "The production rule must be separated by one arrow '->'."),
            GrammarErrorType::MissingNonterminal => write!(f, "A non-terminal is missing on the left-hand side of the production."),
            GrammarErrorType::ForbiddenCharacters => write!(f, "The characters '{}' are not allowed as (non-)terminals.", forbidden),
            GrammarErrorType::ForbiddenCharactersOnTheRight => write!(
                f,
                "The characters '{}' are not allowed as (non-)terminals. \
                 Maybe you forgot the ':' as a separation between the production rule and the attribute equations?",
                forbidden
            ),
            GrammarErrorType::MultipleNonterminals => write!(f, "There may only be one non-terminal on the left-hand side of a production rule."),
            GrammarErrorType::MissingEquals => write!(f, "The attribute equation must have a '='."),
            GrammarErrorType::MultipleEquals => write!(f, "There can only be one equals sign '=' in an equation."),
            GrammarErrorType::MalformedLeftAttribute => write!(f, "The attribute on the left-hand side of the equation is wrongly formatted."),
            GrammarErrorType::MultipleLeftAttributes => write!(f, "There can only be one attribute on the left-hand side of the equation."),
            GrammarErrorType::IndexOutOfRange(half) => write!(f, "The index in '{}' is higher than the number of symbols in the production.", half),
            GrammarErrorType::UnresolvedDependency => write!(
                f,
                "An unexpected bug occurred while resolving attribute indices. Please report it, together with the used grammar."
            ),
        }
    }
}

pub type GrammarError = Error<GrammarErrorType>;
pub type GrammarErrors = Errors<GrammarErrorType>;

pub type LineResult<T> = std::result::Result<T, GrammarError>;

fn line_error(line: usize, fragment: &str, error: GrammarErrorType) -> GrammarError {
    GrammarError {
        location: Location::Line(line),
        fragment: fragment.to_string(),
        error,
    }
}

// An attribute as written in one rule, its dependencies still unresolved
#[derive(PartialEq, Debug, Clone)]
struct DraftAttribute {
    name: String,
    dependencies: BTreeSet<DependencyKey>,
}

#[derive(PartialEq, Debug, Clone)]
struct DraftSymbol {
    name: String,
    attributes: Vec<DraftAttribute>,
}

impl DraftSymbol {
    fn new(name: &str) -> Self {
        DraftSymbol {
            name: name.to_string(),
            attributes: Vec::new(),
        }
    }

    // Adds the attribute, or merges the dependency into the existing one of the same name
    fn add_attribute(&mut self, name: &str, dependency: Option<DependencyKey>) {
        let position = match self.attributes.iter().position(|a| a.name == name) {
            Some(position) => position,
            None => {
                self.attributes.push(DraftAttribute {
                    name: name.to_string(),
                    dependencies: BTreeSet::new(),
                });
                self.attributes.len() - 1
            }
        };

        if let Some(dependency) = dependency {
            self.attributes[position].dependencies.insert(dependency);
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
struct DraftRule {
    symbols: Vec<DraftSymbol>,
}

impl DraftRule {
    fn max_index(&self) -> usize {
        self.symbols.len() - 1
    }

    fn left_side(&self) -> &str {
        &self.symbols[0].name
    }
}

// Everything gathered from the rows before attributes are reconciled
#[derive(PartialEq, Debug, Default)]
struct DraftGrammar {
    rules: Vec<DraftRule>,
    symbol_names: Vec<String>,
    // Left-hand sides that parsed, including those of rules dropped for errors
    nonterminal_names: Vec<String>,
    attribute_names: Vec<String>,
    errors: GrammarErrors,
}

impl DraftGrammar {
    fn register_symbol(&mut self, name: &str) {
        register(&mut self.symbol_names, name);
    }

    fn register_nonterminal(&mut self, name: &str) {
        register(&mut self.symbol_names, name);
        register(&mut self.nonterminal_names, name);
    }

    fn register_attribute(&mut self, name: &str) {
        register(&mut self.attribute_names, name);
    }
}

fn register(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

fn parse_left_side(line: usize, rule_text: &str, left_text: &str) -> LineResult<DraftSymbol> {
    let words = split_into_words(left_text);

    let nonterminal = match words.first() {
        Some(word) => *word,
        None => return Err(line_error(line, rule_text, GrammarErrorType::MissingNonterminal)),
    };

    if contains_any(nonterminal, &FORBIDDEN_SYMBOLS) {
        return Err(line_error(line, nonterminal, GrammarErrorType::ForbiddenCharacters));
    }

    if words.len() > 1 {
        return Err(line_error(line, rule_text, GrammarErrorType::MultipleNonterminals));
    }

    Ok(DraftSymbol::new(nonterminal))
}

fn parse_right_side(line: usize, right_text: &str) -> LineResult<Vec<DraftSymbol>> {
    // An empty right-hand side stands for the empty word
    if text_is_empty(right_text) {
        return Ok(Vec::new());
    }

    if contains_any(right_text, &FORBIDDEN_SYMBOLS) {
        return Err(line_error(line, right_text, GrammarErrorType::ForbiddenCharactersOnTheRight));
    }

    Ok(split_into_words(right_text).into_iter().map(DraftSymbol::new).collect())
}

// Parses `X -> Y z`. Both sides are checked even if one fails so that all
// errors of the row are reported together. The names of a side that parsed
// are registered even when the other side did not.
fn parse_production_rule(
    line: usize,
    rule_text: &str,
    draft: &mut DraftGrammar,
) -> std::result::Result<DraftRule, GrammarErrors> {
    let halves = rule_text.split("->").collect_vec();
    if halves.len() != 2 {
        return Err(vec![line_error(line, rule_text, GrammarErrorType::MissingArrow)]);
    }

    let left = parse_left_side(line, rule_text, halves[0]);
    if let Ok(nonterminal) = &left {
        draft.register_nonterminal(&nonterminal.name);
    }

    let right = parse_right_side(line, halves[1]);
    if let Ok(symbols) = &right {
        for symbol in symbols {
            draft.register_symbol(&symbol.name);
        }
    }

    match (left, right) {
        (Ok(left), Ok(right)) => {
            let mut symbols = vec![left];
            symbols.extend(right);
            Ok(DraftRule { symbols })
        }
        (left, right) => Err(left.err().into_iter().chain(right.err()).collect()),
    }
}

// Parses the left half of `z[0] = ...`, attaching the attribute to its symbol
fn parse_left_attribute(
    line: usize,
    equation: &str,
    left_half: &str,
    rule: &mut DraftRule,
    draft: &mut DraftGrammar,
) -> LineResult<AttributeCoordinate> {
    let tokens = scan_attributes(left_half);

    let token = match tokens.as_slice() {
        [] => return Err(line_error(line, equation, GrammarErrorType::MalformedLeftAttribute)),
        [token] => token,
        _ => return Err(line_error(line, equation, GrammarErrorType::MultipleLeftAttributes)),
    };

    let symbol_index = token.index_within(rule.max_index()).ok_or_else(|| {
        line_error(line, equation, GrammarErrorType::IndexOutOfRange(left_half.to_string()))
    })?;

    draft.register_attribute(&token.name);
    rule.symbols[symbol_index].add_attribute(&token.name, None);

    Ok(AttributeCoordinate::new(symbol_index, &token.name))
}

// Parses the right half of an equation. Every attribute found there gets a
// dependency pointing at the left attribute. An out-of-range index stops
// the scan, keeping what was attached before it.
fn parse_right_attributes(
    line: usize,
    equation: &str,
    right_half: &str,
    left: &AttributeCoordinate,
    rule: &mut DraftRule,
    draft: &mut DraftGrammar,
) -> LineResult<()> {
    for token in scan_attributes(right_half) {
        let symbol_index = token.index_within(rule.max_index()).ok_or_else(|| {
            line_error(line, equation, GrammarErrorType::IndexOutOfRange(right_half.to_string()))
        })?;

        draft.register_attribute(&token.name);

        let dependency = DependencyKey::new(AttributeCoordinate::new(symbol_index, &token.name), left.clone());
        rule.symbols[symbol_index].add_attribute(&token.name, Some(dependency));
    }

    Ok(())
}

fn parse_equation(line: usize, equation: &str, rule: &mut DraftRule, draft: &mut DraftGrammar) -> LineResult<()> {
    let halves = equation.split('=').collect_vec();
    match halves.len() {
        1 => return Err(line_error(line, equation, GrammarErrorType::MissingEquals)),
        2 => {}
        _ => return Err(line_error(line, equation, GrammarErrorType::MultipleEquals)),
    }

    let left = parse_left_attribute(line, equation, halves[0], rule, draft)?;
    parse_right_attributes(line, equation, halves[1], &left, rule, draft)
}

// Parses `z[0] = z[1]; y[0] = 0`. A broken equation is reported and skipped.
fn parse_attributes(line: usize, attributes_text: &str, rule: &mut DraftRule, draft: &mut DraftGrammar) {
    for equation in attributes_text.split(';').filter(|equation| !text_is_empty(equation)) {
        if let Err(error) = parse_equation(line, equation, rule, draft) {
            draft.errors.push(error);
        }
    }
}

fn parse_row(line: usize, row: &str, draft: &mut DraftGrammar) {
    let row_halves = row.split(':').collect_vec();

    if row_halves.len() > 2 {
        draft.errors.push(line_error(line, row, GrammarErrorType::MultipleSeparators));
    }

    let mut rule = match parse_production_rule(line, row_halves[0], draft) {
        Ok(rule) => rule,
        Err(errors) => {
            draft.errors.extend(errors);
            return;
        }
    };

    // Equations are optional
    if row_halves.len() == 2 {
        parse_attributes(line, row_halves[1], &mut rule, draft);
    }

    trace!(line, nonterminal = rule.left_side(), symbols = rule.symbols.len(), "parsed production rule");
    draft.rules.push(rule);
}

fn parse_rows(grammar_text: &str) -> DraftGrammar {
    let mut draft = DraftGrammar::default();

    for (num, row) in split_into_rows(grammar_text).iter().enumerate() {
        if text_is_empty(row) {
            continue;
        }
        parse_row(num + 1, row, &mut draft);
    }

    return draft;
}

/// Parses grammar text into a [`Grammar`] whose attributes are reconciled
/// and whose dependencies are resolved. The strong acyclicity analysis is
/// not run here.
pub fn parse_grammar(grammar_text: &str) -> Grammar {
    let draft = parse_rows(grammar_text);
    debug!(rules = draft.rules.len(), errors = draft.errors.len(), "parsed grammar rows");

    reconcile::reconcile(draft)
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use super::*;

    fn symbol_names(rule: &DraftRule) -> Vec<&str> {
        rule.symbols.iter().map(|s| s.name.as_str()).collect()
    }

    fn key(from: (usize, &str), to: (usize, &str)) -> DependencyKey {
        DependencyKey::new(AttributeCoordinate::new(from.0, from.1), AttributeCoordinate::new(to.0, to.1))
    }

    fn error_types(errors: &GrammarErrors) -> Vec<GrammarErrorType> {
        errors.iter().map(|e| e.error.clone()).collect()
    }

    #[test]
    fn parse_normal_production_rules() {
        let texts = vec!["S -> L", "L -> a b ", "S -> ", " E->E plus T"];
        let answers = vec![vec!["S", "L"], vec!["L", "a", "b"], vec!["S"], vec!["E", "E", "plus", "T"]];

        for (text, answer) in zip(texts, answers) {
            assert_eq!(symbol_names(&parse_production_rule(1, text, &mut DraftGrammar::default()).unwrap()), answer);
        }
    }

    #[test]
    fn parse_malformed_production_rules() {
        let texts = vec!["S = A", "S -> A -> B", " -> a", "S T -> a", "S[0] -> a", "S -> a = b", "S T -> a;"];
        let answers = vec![
            vec![GrammarErrorType::MissingArrow],
            vec![GrammarErrorType::MissingArrow],
            vec![GrammarErrorType::MissingNonterminal],
            vec![GrammarErrorType::MultipleNonterminals],
            vec![GrammarErrorType::ForbiddenCharacters],
            vec![GrammarErrorType::ForbiddenCharactersOnTheRight],
            vec![GrammarErrorType::MultipleNonterminals, GrammarErrorType::ForbiddenCharactersOnTheRight],
        ];

        for (text, answer) in zip(texts, answers) {
            assert_eq!(error_types(&parse_production_rule(4, text, &mut DraftGrammar::default()).unwrap_err()), answer, "{}", text);
        }
    }

    #[test]
    fn errors_carry_fragments() {
        let errors = parse_production_rule(2, "S[0] -> a", &mut DraftGrammar::default()).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Line 2: 'S[0]'  The characters '[ ] ; =' are not allowed as (non-)terminals."
        );
    }

    #[test]
    fn parse_equations_into_dependencies() {
        let draft = parse_rows("S -> L : h[0] = h[1]; i[1] = j[1]; k[0] = max(h[1], j[1]); i[0] = 0");
        assert!(draft.errors.is_empty());

        let rule = &draft.rules[0];
        let root = &rule.symbols[0];
        let child = &rule.symbols[1];

        assert_eq!(root.attributes.iter().map(|a| a.name.as_str()).collect_vec(), vec!["h", "k", "i"]);
        assert_eq!(child.attributes.iter().map(|a| a.name.as_str()).collect_vec(), vec!["h", "i", "j"]);

        let h = &child.attributes[0];
        assert_eq!(
            h.dependencies.iter().cloned().collect_vec(),
            vec![key((1, "h"), (0, "h")), key((1, "h"), (0, "k"))]
        );
        let j = &child.attributes[2];
        assert_eq!(
            j.dependencies.iter().cloned().collect_vec(),
            vec![key((1, "j"), (0, "k")), key((1, "j"), (1, "i"))]
        );
        assert_eq!(draft.attribute_names, vec!["h", "i", "j", "k"]);
    }

    #[test]
    fn parse_malformed_equations() {
        let texts = vec![
            "S -> a : z[0]",
            "S -> a : z[0] = y[0] = x[0]",
            "S -> a : 0 = z[0]",
            "S -> a : z[0] y[0] = 1",
            "S -> a : z[2] = 1",
        ];
        let answers = vec![
            GrammarErrorType::MissingEquals,
            GrammarErrorType::MultipleEquals,
            GrammarErrorType::MalformedLeftAttribute,
            GrammarErrorType::MultipleLeftAttributes,
            GrammarErrorType::IndexOutOfRange(" z[2] ".to_string()),
        ];

        for (text, answer) in zip(texts, answers) {
            let draft = parse_rows(text);
            assert_eq!(error_types(&draft.errors), vec![answer], "{}", text);
            // The rule itself survives broken equations
            assert_eq!(draft.rules.len(), 1);
        }
    }

    #[test]
    fn broken_equation_does_not_stop_the_next() {
        let draft = parse_rows("S -> a : z[0] = ; y[0] y[1] = 1; x[0] = z[0]");
        assert_eq!(error_types(&draft.errors), vec![GrammarErrorType::MultipleLeftAttributes]);

        let root = &draft.rules[0].symbols[0];
        assert_eq!(root.attributes.iter().map(|a| a.name.as_str()).collect_vec(), vec!["z", "x"]);
    }

    #[test]
    fn out_of_range_right_attribute_keeps_earlier_ones() {
        let draft = parse_rows("S -> a : z[0] = f(y[1], x[2], w[1])");
        assert_eq!(
            error_types(&draft.errors),
            vec![GrammarErrorType::IndexOutOfRange(" f(y[1], x[2], w[1])".to_string())]
        );

        let child = &draft.rules[0].symbols[1];
        assert_eq!(child.attributes.iter().map(|a| a.name.as_str()).collect_vec(), vec!["y"]);
        assert_eq!(draft.attribute_names, vec!["z", "y"]);
    }

    #[test]
    fn blank_equations_are_ignored() {
        for text in ["S -> : ", "S -> a : z[0] = 1;", "S -> a : ;;"] {
            let draft = parse_rows(text);
            assert!(draft.errors.is_empty(), "{}", text);
            assert_eq!(draft.rules.len(), 1);
        }
    }

    #[test]
    fn multiple_separators_keep_the_rule() {
        let draft = parse_rows("S -> a : z[0] = 1 : y[0] = 2");
        assert_eq!(error_types(&draft.errors), vec![GrammarErrorType::MultipleSeparators]);
        assert_eq!(draft.rules.len(), 1);
        assert!(draft.rules[0].symbols[0].attributes.is_empty());
    }

    #[test]
    fn malformed_row_does_not_stop_later_rows() {
        let draft = parse_rows("S = A\n\nS -> A\nA -> a");

        assert_eq!(draft.errors.len(), 1);
        assert_eq!(draft.errors[0].location, Location::Line(1));
        assert_eq!(draft.errors[0].fragment, "S = A");
        assert_eq!(draft.rules.len(), 2);
        assert_eq!(draft.symbol_names, vec!["S", "A", "a"]);
    }

    #[test]
    fn failed_rows_register_the_side_that_parsed() {
        let texts = vec!["S T -> a b", "S -> a = b", "S[0] -> a = b", "S -> A -> B"];
        let answers = vec![
            (vec!["a", "b"], vec![]),
            (vec!["S"], vec!["S"]),
            (vec![], vec![]),
            (vec![], vec![]),
        ];

        for (text, (symbols, nonterminals)) in zip(texts, answers) {
            let draft = parse_rows(text);
            assert_eq!(draft.rules.len(), 0, "{}", text);
            assert_eq!(draft.symbol_names, symbols, "{}", text);
            assert_eq!(draft.nonterminal_names, nonterminals, "{}", text);
        }
    }

    #[test]
    fn line_numbers_count_blank_lines() {
        let draft = parse_rows("S -> a\n\n\nS -> b : z[4] = 1");
        assert_eq!(draft.errors[0].location, Location::Line(4));
    }
}
