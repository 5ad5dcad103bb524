/*
    This module renders an analysed grammar as plain text
*/

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result};

use itertools::Itertools;

use crate::grammar::*;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn relations(relations: &BTreeMap<DependencyKey, Dependency>) -> String {
    if relations.is_empty() {
        "-".to_string()
    } else {
        relations.values().join(", ")
    }
}

// Attributes identified only through other rules are marked with `~`
fn attribute_list(symbol: &Symbol) -> String {
    symbol
        .attributes()
        .iter()
        .map(|attribute| {
            if attribute.is_indirectly_identified() {
                format!("~{}", attribute.name())
            } else {
                attribute.name().to_string()
            }
        })
        .join(", ")
}

pub struct Report<'a> {
    grammar: &'a Grammar,
    show_iterations: bool,
}

impl<'a> Report<'a> {
    pub fn new(grammar: &'a Grammar, show_iterations: bool) -> Self {
        Report { grammar, show_iterations }
    }

    fn fmt_production_rules(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Production rules:")?;

        for (index, rule) in self.grammar.production_rules().iter().enumerate() {
            let elements = self.grammar.number_of_elements_per_rule().get(index).copied().unwrap_or(0);
            writeln!(f, "  ({}) {}    [{} elements]", index, rule, elements)?;

            for (symbol_index, symbol) in rule.symbols().iter().enumerate() {
                if symbol.attributes().is_empty() {
                    continue;
                }
                writeln!(f, "      {}[{}]: {}", symbol.name(), symbol_index, attribute_list(symbol))?;
            }

            let dependencies = rule
                .symbols()
                .iter()
                .flat_map(|symbol| symbol.attributes().iter())
                .flat_map(Attribute::dependencies)
                .join(", ");
            if !dependencies.is_empty() {
                writeln!(f, "      dependencies: {}", dependencies)?;
            }
        }

        Ok(())
    }

    fn fmt_names(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Non-terminals: {}", self.grammar.nonterminal_names().join(", "))?;
        writeln!(f, "Terminals: {}", self.grammar.all_terminal_names().iter().join(", "))?;
        writeln!(f, "Attributes: {}", self.grammar.all_attribute_names().iter().join(", "))
    }

    fn fmt_round(&self, f: &mut Formatter<'_>, round: usize, stable: bool) -> Result {
        writeln!(f, "  Round {} (stable: {})", round, yes_no(stable))?;

        for nonterminal in self.grammar.strong_acyclicity().nonterminals() {
            let Some(iteration) = nonterminal.iteration(round) else {
                continue;
            };
            writeln!(
                f,
                "    {}: {{{}}}",
                nonterminal.name(),
                iteration.transitive_relations_string()
            )?;

            for rule in self.grammar.production_rules_of(nonterminal) {
                let Some(rule_iteration) = rule.iteration(round) else {
                    continue;
                };
                writeln!(f, "      {}", rule)?;
                writeln!(f, "        redecorated: {}", relations(rule_iteration.redecorated_relations()))?;
                writeln!(f, "        root projections: {}", relations(rule_iteration.root_projections()))?;
                writeln!(f, "        cycle found: {}", yes_no(rule_iteration.cycle_found()))?;
            }
        }

        Ok(())
    }

    fn fmt_strong_acyclicity(&self, f: &mut Formatter<'_>) -> Result {
        let acyclicity = self.grammar.strong_acyclicity();
        writeln!(f, "Strong acyclicity test ({} rounds):", acyclicity.number_of_iterations())?;

        if self.show_iterations {
            for (round, &stable) in acyclicity.is_iteration_stable().iter().enumerate() {
                self.fmt_round(f, round, stable)?;
            }
        }

        if let Some(last) = self.grammar.final_iteration_index() {
            writeln!(f, "Final transitive relations:")?;
            for nonterminal in acyclicity.nonterminals() {
                let relations = nonterminal
                    .iteration(last)
                    .map(NonterminalIteration::transitive_relations_string)
                    .unwrap_or_default();
                writeln!(f, "  {}: {{{}}}", nonterminal.name(), relations)?;
            }
        }

        writeln!(f, "Strongly acyclic: {}", yes_no(acyclicity.is_strongly_acyclic()))
    }
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.fmt_production_rules(f)?;
        self.fmt_names(f)?;
        self.fmt_strong_acyclicity(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_chain() {
        let grammar = Grammar::new("S -> A\nA -> a");
        let report = Report::new(&grammar, false).to_string();

        assert_eq!(
            report,
            "Production rules:\n\
             \x20 (0) S -> A    [2 elements]\n\
             \x20 (1) A -> a    [2 elements]\n\
             Non-terminals: S, A\n\
             Terminals: a\n\
             Attributes: \n\
             Strong acyclicity test (2 rounds):\n\
             Final transitive relations:\n\
             \x20 S: {}\n\
             \x20 A: {}\n\
             Strongly acyclic: yes\n"
        );
    }

    #[test]
    fn report_marks_indirect_attributes() {
        let grammar = Grammar::new("S -> A : x[0] = y[1]\nA -> a : z[0] = 1");
        let report = Report::new(&grammar, false).to_string();

        assert!(report.contains("      A[1]: y, ~z\n"));
        assert!(report.contains("      dependencies: y_0[1] -> x_0[0]\n"));
    }

    #[test]
    fn report_iterations() {
        let grammar = Grammar::new("S -> A : z[1] = y[1]\nA -> a : y[0] = z[0]");
        let report = Report::new(&grammar, true).to_string();

        assert!(report.contains("  Round 0 (stable: no)\n"));
        assert!(report.contains("  Round 1 (stable: yes)\n"));
        assert!(report.contains("        redecorated: z_1[1] -> y_0[1]\n"));
        assert!(report.contains("        cycle found: yes\n"));
        assert!(report.contains("  A: {(z,y)}\n"));
        assert!(report.ends_with("Strongly acyclic: no\n"));
    }
}
