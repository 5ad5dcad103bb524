use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::warn;

use super::{DraftGrammar, DraftRule, GrammarError, GrammarErrorType};
use crate::error_handling::Location;
use crate::grammar::*;

// Every attribute name attached to each symbol name, in any production rule
type AttributesBySymbol<'a> = HashMap<&'a str, BTreeSet<&'a str>>;

fn attributes_by_symbol(rules: &[DraftRule]) -> AttributesBySymbol<'_> {
    let mut attributes = AttributesBySymbol::new();

    for symbol in rules.iter().flat_map(|rule| rule.symbols.iter()) {
        attributes
            .entry(symbol.name.as_str())
            .or_default()
            .extend(symbol.attributes.iter().map(|a| a.name.as_str()));
    }

    return attributes;
}

// Gives every occurrence of a symbol all attributes the symbol has anywhere,
// sorted by name. Attributes not written in this rule are marked as
// identified indirectly.
fn merge_and_sort(rule: &DraftRule, attributes_by_symbol: &AttributesBySymbol) -> Vec<Symbol> {
    rule.symbols
        .iter()
        .map(|draft_symbol| {
            let mut attributes = AttributeMap::new();

            for draft_attribute in &draft_symbol.attributes {
                attributes.add_if_absent(Attribute::new(&draft_attribute.name));
            }

            if let Some(names) = attributes_by_symbol.get(draft_symbol.name.as_str()) {
                for name in names {
                    attributes.add_if_absent(Attribute::indirectly_identified(name));
                }
            }

            attributes.sort();
            Symbol::new(&draft_symbol.name, attributes)
        })
        .collect()
}

fn resolve(symbols: &[Symbol], coordinate: &AttributeCoordinate) -> Option<ResolvedEndpoint> {
    let attribute_index = symbols
        .get(coordinate.symbol_index)?
        .attributes()
        .index_of(&coordinate.attribute_name)?;

    Some(ResolvedEndpoint {
        coordinate: coordinate.clone(),
        attribute_index,
    })
}

// Now that attribute positions are final, turns the dependency keys written
// while parsing into dependencies carrying both positions
fn resolve_dependencies(
    rule_index: usize,
    draft: &DraftRule,
    symbols: &mut [Symbol],
    errors: &mut Vec<GrammarError>,
) {
    let keys = draft
        .symbols
        .iter()
        .flat_map(|symbol| symbol.attributes.iter())
        .flat_map(|attribute| attribute.dependencies.iter());

    for key in keys {
        let endpoints = resolve(symbols, &key.from).zip(resolve(symbols, &key.to));

        let Some((from, to)) = endpoints else {
            warn!(rule_index, dependency = %key, "dependency target not found after sorting");
            errors.push(GrammarError {
                location: Location::Rule(rule_index),
                fragment: key.to_string(),
                error: GrammarErrorType::UnresolvedDependency,
            });
            continue;
        };

        let symbol_index = from.coordinate.symbol_index;
        if let Some(attribute) = symbols[symbol_index].attributes_mut().get_at_mut(from.attribute_index) {
            attribute.add_dependency(Dependency::new(from, to));
        }
    }
}

// Symbols plus attributes: the number of nodes in the rule's dependency graph
fn count_elements(symbols: &[Symbol]) -> usize {
    symbols.iter().map(|symbol| 1 + symbol.attributes().len()).sum()
}

/// Second phase of parsing: builds the final grammar from the draft rows.
pub(super) fn reconcile(draft: DraftGrammar) -> Grammar {
    let DraftGrammar {
        rules: draft_rules,
        symbol_names,
        nonterminal_names,
        attribute_names,
        mut errors,
    } = draft;

    let attributes_by_symbol = attributes_by_symbol(&draft_rules);

    let mut production_rules = Vec::with_capacity(draft_rules.len());
    let mut number_of_elements_per_rule = Vec::with_capacity(draft_rules.len());
    let mut strong_acyclicity = StrongAcyclicity::default();

    // A non-terminal whose rules all failed still exists, without rules
    for name in &nonterminal_names {
        strong_acyclicity.add_nonterminal(name);
    }

    for (rule_index, draft_rule) in draft_rules.iter().enumerate() {
        let mut symbols = merge_and_sort(draft_rule, &attributes_by_symbol);
        resolve_dependencies(rule_index, draft_rule, &mut symbols, &mut errors);
        number_of_elements_per_rule.push(count_elements(&symbols));

        let mut symbols = symbols.into_iter();
        let Some(left_side) = symbols.next() else {
            continue;
        };

        let nonterminal_index = strong_acyclicity.add_nonterminal(left_side.name());
        strong_acyclicity.nonterminals_mut()[nonterminal_index].add_production_rule(production_rules.len());

        production_rules.push(ProductionRule::new(left_side, symbols.collect()));
    }

    let all_nonterminal_names: HashSet<String> = nonterminal_names.into_iter().collect();

    // A terminal never appears on the left of a production rule
    let all_terminal_names = symbol_names
        .iter()
        .filter(|name| !all_nonterminal_names.contains(*name))
        .cloned()
        .collect();

    Grammar {
        all_symbol_names: symbol_names,
        all_nonterminal_names,
        all_terminal_names,
        all_attribute_names: attribute_names,
        production_rules,
        errors,
        number_of_elements_per_rule,
        strong_acyclicity,
    }
}
