/*
    This module tests attribute grammars for strong acyclicity
*/

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::grammar::*;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisOptions {
    // Upper bound on fixpoint rounds (default: derived from the grammar)
    pub max_rounds: Option<usize>,
}

// What the closure of one production rule found in one round
#[derive(Debug, Default)]
struct Closure {
    cycle_found: bool,
    root_projections: Vec<Dependency>,
}

/// Rounds needed to settle: relations only ever appear between root
/// attributes, so each non-terminal can change at most (attributes)² times.
/// Plus the first round and the final stable one.
fn round_bound(rules: &[ProductionRule], acyclicity: &StrongAcyclicity) -> usize {
    let relation_keys: usize = acyclicity
        .nonterminals()
        .iter()
        .filter_map(|nonterminal| nonterminal.production_rule_indices().first())
        .filter_map(|&index| rules.get(index))
        .map(|rule| rule.left_side().attributes().len().pow(2))
        .sum();

    relation_keys + 2
}

// Removes what redecoration attached to the attributes in the previous round
fn empty_redecorated_dependencies(rule: &mut ProductionRule) {
    for symbol in rule.symbols_mut() {
        for attribute in symbol.attributes_mut().iter_mut() {
            attribute.empty_redecorated_dependencies();
        }
    }
}

// The relations of each non-terminal child, as they stood before this round,
// moved onto the child's position in this rule
fn redecorations(
    rule: &ProductionRule,
    round: usize,
    nonterminal_names: &HashSet<String>,
    acyclicity: &StrongAcyclicity,
) -> Vec<Dependency> {
    let mut redecorated = Vec::new();

    for (symbol_index, symbol) in rule.symbols().iter().enumerate().skip(1) {
        // Terminals are never roots and have no relations to pass on
        if !symbol.is_nonterminal(nonterminal_names) {
            continue;
        }
        let Some(child) = acyclicity.nonterminal(symbol.name()) else {
            continue;
        };

        for relation in child.previous_iteration(round).transitive_relations().values() {
            let relation = relation.redecorate_to(symbol_index);

            let source = symbol.attributes().get_at(relation.from_attribute_index_inside_symbol());
            let Some(source) = source.filter(|source| source.name() == relation.from_attribute_name()) else {
                warn!(symbol = symbol.name(), relation = %relation, "redecorated relation has no source attribute");
                continue;
            };

            // Relations the rule already declares are not added again
            if !source.has_dependency(&relation.key()) {
                redecorated.push(relation);
            }
        }
    }

    return redecorated;
}

fn redecorate(rule: &mut ProductionRule, redecorated: Vec<Dependency>) {
    for relation in redecorated {
        let symbol_index = relation.from_symbol_index();
        let attribute_index = relation.from_attribute_index_inside_symbol();

        if let Some(attribute) = rule.symbols_mut()[symbol_index].attributes_mut().get_at_mut(attribute_index) {
            attribute.add_redecorated_dependency(relation.clone());
        }
        if let Some(iteration) = rule.current_iteration_mut() {
            iteration.add_redecorated_relation(relation);
        }
    }
}

// Walks the discovery path back from a root attribute just reached. Every
// root attribute on the way is the source of a root projection onto it.
fn root_projections_onto(target: &ResolvedEndpoint, parents: &HashMap<AttributeCoordinate, ResolvedEndpoint>) -> Vec<Dependency> {
    let mut projections = Vec::new();
    let mut parent = parents.get(&target.coordinate);

    while let Some(ancestor) = parent {
        if ancestor.coordinate.is_root() {
            projections.push(Dependency::new(ancestor.clone(), target.clone()));
        }
        parent = parents.get(&ancestor.coordinate);
    }

    return projections;
}

/// Depth-first search from every attribute of the rule over declared and
/// redecorated dependencies. Reaching the start attribute again is a cycle
/// and ends the search from that attribute. Paths between root attributes
/// become root projections.
fn transitive_closure(rule: &ProductionRule) -> Closure {
    let mut closure = Closure::default();

    for (symbol_index, symbol) in rule.symbols().iter().enumerate() {
        for attribute in symbol.attributes().iter() {
            let start = AttributeCoordinate::new(symbol_index, attribute.name());

            let mut visited = HashSet::new();
            // Reached attribute -> source of the edge it was first reached by
            let mut parents = HashMap::new();
            let mut stack: Vec<&Dependency> = attribute.all_dependencies().collect();

            while let Some(dependency) = stack.pop() {
                let target = dependency.target();

                if target.coordinate == start {
                    trace!(rule = %rule, attribute = %start, "cycle found");
                    closure.cycle_found = true;
                    break;
                }

                if !visited.insert(target.coordinate.clone()) {
                    continue;
                }
                parents.insert(target.coordinate.clone(), dependency.source().clone());

                if let Some(target_attribute) = rule.attribute_at(target.coordinate.symbol_index, target.attribute_index) {
                    stack.extend(target_attribute.all_dependencies());
                }

                if target.coordinate.is_root() {
                    closure.root_projections.extend(root_projections_onto(target, &parents));
                }
            }
        }
    }

    return closure;
}

// Compares this round's relations with the previous round's. Round 0 is
// never stable.
fn nonterminal_is_unstable(nonterminal: &mut Nonterminal, round: usize) -> bool {
    if round == 0 {
        return true;
    }

    let stable = match nonterminal.iterations().last() {
        Some(current) => current.has_same_relations_as(nonterminal.previous_iteration(round)),
        None => false,
    };

    if stable {
        if let Some(current) = nonterminal.current_iteration_mut() {
            current.is_stable = true;
        }
    }

    return !stable;
}

// Runs one round over all non-terminals. Returns whether all were stable.
fn compute_round(
    round: usize,
    rules: &mut [ProductionRule],
    nonterminal_names: &HashSet<String>,
    acyclicity: &mut StrongAcyclicity,
) -> bool {
    acyclicity.add_iteration();
    let mut some_nonterminal_is_unstable = false;

    for nonterminal_index in 0..acyclicity.nonterminals().len() {
        acyclicity.nonterminals_mut()[nonterminal_index].add_iteration();
        let rule_indices = acyclicity.nonterminals()[nonterminal_index].production_rule_indices().to_vec();

        for rule_index in rule_indices {
            let Some(rule) = rules.get_mut(rule_index) else {
                continue;
            };

            rule.add_iteration();
            empty_redecorated_dependencies(rule);

            let redecorated = redecorations(rule, round, nonterminal_names, acyclicity);
            redecorate(rule, redecorated);

            let closure = transitive_closure(rule);
            trace!(
                round,
                rule = %rule,
                cycle_found = closure.cycle_found,
                root_projections = closure.root_projections.len(),
                "computed transitive closure"
            );

            if let Some(iteration) = rule.current_iteration_mut() {
                iteration.cycle_found = closure.cycle_found;
                for projection in &closure.root_projections {
                    iteration.add_root_projection(projection.clone());
                }
            }

            if closure.cycle_found {
                acyclicity.is_strongly_acyclic = false;
            }

            if let Some(current) = acyclicity.nonterminals_mut()[nonterminal_index].current_iteration_mut() {
                for projection in closure.root_projections {
                    current.add_transitive_relation(projection);
                }
            }
        }

        if nonterminal_is_unstable(&mut acyclicity.nonterminals_mut()[nonterminal_index], round) {
            some_nonterminal_is_unstable = true;
            acyclicity.set_iteration_unstable(round);
        }
    }

    return !some_nonterminal_is_unstable;
}

/// Iterates transitive closures and redecoration over all production rules
/// until no non-terminal's relations change, recording every round in the
/// grammar's iteration snapshots.
pub fn compute_strong_acyclicity(grammar: &mut Grammar, options: &AnalysisOptions) {
    let Grammar {
        production_rules,
        all_nonterminal_names,
        strong_acyclicity,
        ..
    } = grammar;

    let max_rounds = match options.max_rounds {
        Some(max_rounds) => max_rounds,
        None => round_bound(production_rules, strong_acyclicity),
    };

    let mut round = 0;
    loop {
        let stable = compute_round(round, production_rules, all_nonterminal_names, strong_acyclicity);
        debug!(round, stable, "finished strong acyclicity round");

        if stable {
            break;
        }

        round += 1;
        if round >= max_rounds {
            warn!(rounds = round, "strong acyclicity test stopped before reaching a fixpoint");
            break;
        }
    }

    debug!(
        rounds = strong_acyclicity.number_of_iterations(),
        strongly_acyclic = strong_acyclicity.is_strongly_acyclic(),
        "strong acyclicity test finished"
    );
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use itertools::Itertools;

    use super::*;

    const LECTURE_GRAMMAR: &str = "S -> L : h[0] = h[1]; i[1] = j[1]; j[0] = j[1]; k[1] = h[1]; i[0] = 0; k[0] = 0\n\
                                   L -> a : j[0] = k[0]; h[0] = 0; i[0] = 0\n\
                                   L -> b : h[0] = i[0]; j[0] = 0; k[0] = 0";

    // S passes x down to A, A computes y from it, S reads y back
    const REDECORATION_GRAMMAR: &str = "S -> A : z[1] = x[0]; y[0] = y[1]\n\
                                        A -> a : y[0] = z[0]";

    fn keys(relations: &std::collections::BTreeMap<DependencyKey, Dependency>) -> Vec<String> {
        relations.keys().map(ToString::to_string).collect()
    }

    fn relations_per_round(grammar: &Grammar, nonterminal: &str) -> Vec<String> {
        grammar
            .nonterminal(nonterminal)
            .unwrap()
            .iterations()
            .iter()
            .map(NonterminalIteration::transitive_relations_string)
            .collect()
    }

    fn cycles_per_round(rule: &ProductionRule) -> Vec<bool> {
        rule.iterations().iter().map(ProductionRuleIteration::cycle_found).collect()
    }

    #[test]
    fn chain_without_attributes() {
        let grammar = Grammar::new("S -> A\nA -> a");
        let acyclicity = grammar.strong_acyclicity();

        assert!(grammar.errors().is_empty());
        assert!(acyclicity.is_strongly_acyclic());
        assert_eq!(acyclicity.is_iteration_stable(), &[false, true]);
        assert_eq!(relations_per_round(&grammar, "S"), vec!["", ""]);
    }

    #[test]
    fn direct_self_cycle() {
        let grammar = Grammar::new("S -> a : x[0] = y[0]; y[0] = x[0]");
        let rule = &grammar.production_rules()[0];

        assert!(rule.iterations()[0].cycle_found());
        assert!(!grammar.strong_acyclicity().is_strongly_acyclic());
    }

    #[test]
    fn constant_attribute_has_nothing_to_redecorate() {
        let grammar = Grammar::new("S -> A : z[0] = z[1]\nA -> a : z[0] = 0");
        let acyclicity = grammar.strong_acyclicity();

        assert_eq!(relations_per_round(&grammar, "A"), vec!["", ""]);
        assert!(grammar.production_rules()[0]
            .iterations()
            .iter()
            .all(|iteration| iteration.redecorated_relations().is_empty()));
        assert!(acyclicity.is_strongly_acyclic());
        assert_eq!(acyclicity.number_of_iterations(), 2);
    }

    #[test]
    fn lecture_grammar_is_not_strongly_acyclic() {
        let grammar = Grammar::new(LECTURE_GRAMMAR);
        let acyclicity = grammar.strong_acyclicity();

        assert!(grammar.errors().is_empty());
        assert_eq!(acyclicity.is_iteration_stable(), &[false, true]);
        assert!(!acyclicity.is_strongly_acyclic());

        assert_eq!(relations_per_round(&grammar, "S"), vec!["", ""]);
        assert_eq!(relations_per_round(&grammar, "L"), vec!["(i,h),(k,j)", "(i,h),(k,j)"]);

        let rules = grammar.production_rules();
        assert_eq!(cycles_per_round(&rules[0]), vec![false, true]);
        assert_eq!(cycles_per_round(&rules[1]), vec![false, false]);
        assert_eq!(cycles_per_round(&rules[2]), vec![false, false]);

        // L's relations land on the L below S in the second round
        assert!(rules[0].iterations()[0].redecorated_relations().is_empty());
        assert_eq!(
            keys(rules[0].iterations()[1].redecorated_relations()),
            vec!["i[1] -> h[1]", "k[1] -> j[1]"]
        );
        assert_eq!(keys(rules[1].iterations()[0].root_projections()), vec!["k[0] -> j[0]"]);
        assert_eq!(keys(rules[2].iterations()[0].root_projections()), vec!["i[0] -> h[0]"]);
    }

    #[test]
    fn redecoration_creates_root_projection() {
        let grammar = Grammar::new(REDECORATION_GRAMMAR);
        let acyclicity = grammar.strong_acyclicity();
        let rule = &grammar.production_rules()[0];

        assert!(acyclicity.is_strongly_acyclic());
        assert_eq!(acyclicity.is_iteration_stable(), &[false, false, true]);
        assert_eq!(relations_per_round(&grammar, "S"), vec!["", "(x,y)", "(x,y)"]);
        assert_eq!(relations_per_round(&grammar, "A"), vec!["(z,y)", "(z,y)", "(z,y)"]);

        assert_eq!(keys(rule.iterations()[1].redecorated_relations()), vec!["z[1] -> y[1]"]);
        assert_eq!(keys(rule.iterations()[1].root_projections()), vec!["x[0] -> y[0]"]);

        let s = grammar.nonterminal("S").unwrap();
        let stable = s.iterations().iter().map(NonterminalIteration::is_stable).collect_vec();
        assert_eq!(stable, vec![false, false, true]);
    }

    #[test]
    fn nonterminal_order_does_not_change_relations() {
        let reordered = "A -> a : y[0] = z[0]\nS -> A : z[1] = x[0]; y[0] = y[1]";
        let first = Grammar::new(REDECORATION_GRAMMAR);
        let second = Grammar::new(reordered);

        for name in ["S", "A"] {
            let first_last = relations_per_round(&first, name).pop();
            let second_last = relations_per_round(&second, name).pop();
            assert_eq!(first_last, second_last, "{}", name);
        }
        assert_eq!(second.strong_acyclicity().is_iteration_stable(), &[false, false, true]);
    }

    #[test]
    fn redecorated_dependencies_do_not_leak_into_the_grammar() {
        let grammar = Grammar::new(REDECORATION_GRAMMAR);
        let rule = &grammar.production_rules()[0];
        let z = rule.symbols()[1].attributes().get("z").unwrap();

        // Only the last round's redecoration is left, never an accumulation
        assert_eq!(z.redecorated_dependencies().len(), 1);
        assert_eq!(z.dependencies().count(), 0);
    }

    #[test]
    fn declared_relations_are_not_redecorated() {
        // The rule already declares y[1] = z[1], which is what A's relation says
        let grammar = Grammar::new("S -> A : y[1] = z[1]\nA -> a : y[0] = z[0]");
        let rule = &grammar.production_rules()[0];

        assert!(rule.iterations().iter().all(|iteration| iteration.redecorated_relations().is_empty()));
    }

    #[test]
    fn cycle_through_redecoration() {
        // A says y depends on z, S says z of A depends on y of A
        let grammar = Grammar::new("S -> A : z[1] = y[1]\nA -> a : y[0] = z[0]");
        let rule = &grammar.production_rules()[0];

        assert_eq!(cycles_per_round(rule), vec![false, true]);
        assert!(!grammar.strong_acyclicity().is_strongly_acyclic());
    }

    #[test]
    fn cycles_are_found_in_several_rules() {
        let grammar = Grammar::new("S -> a : x[0] = y[0]; y[0] = x[0]\nS -> b\nT -> c : u[0] = u[0]");
        let rules = grammar.production_rules();

        let answers = vec![true, false, true];
        for (rule, answer) in zip(rules, answers) {
            assert_eq!(rule.iterations()[0].cycle_found(), answer, "{}", rule);
        }
    }

    #[test]
    fn cycle_stops_only_its_own_search() {
        let texts = vec![
            "S -> a : z[0] = y[0]; u[0] = u[0]",
            "S -> a : z[0] = y[0]; x[0] = u[0]; u[0] = x[0]",
        ];
        let answers = vec!["(y,z)", "(u,x),(x,u),(y,z)"];

        for (text, answer) in zip(texts, answers) {
            let grammar = Grammar::new(text);
            assert!(grammar.production_rules()[0].iterations()[0].cycle_found(), "{}", text);
            assert!(!grammar.strong_acyclicity().is_strongly_acyclic());
            assert_eq!(relations_per_round(&grammar, "S")[0], answer, "{}", text);
        }
    }

    #[test]
    fn round_limit_stops_the_fixpoint() {
        let options = AnalysisOptions { max_rounds: Some(1) };
        let grammar = Grammar::with_options(REDECORATION_GRAMMAR, &options);

        assert_eq!(grammar.strong_acyclicity().number_of_iterations(), 1);
        assert_eq!(grammar.final_iteration_index(), Some(0));
    }

    #[test]
    fn every_round_has_one_snapshot_per_participant() {
        let grammar = Grammar::new(LECTURE_GRAMMAR);
        let rounds = grammar.strong_acyclicity().number_of_iterations();

        for nonterminal in grammar.strong_acyclicity().nonterminals() {
            assert_eq!(nonterminal.iterations().len(), rounds);
        }
        for rule in grammar.production_rules() {
            assert_eq!(rule.iterations().len(), rounds);
        }
    }

    #[test]
    fn empty_grammar_takes_one_round() {
        let grammar = Grammar::new("");
        assert_eq!(grammar.strong_acyclicity().is_iteration_stable(), &[true]);
        assert!(grammar.strong_acyclicity().is_strongly_acyclic());
    }
}
