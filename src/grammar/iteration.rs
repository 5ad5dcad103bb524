use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;

use super::dependency::{Dependency, DependencyKey};

// What one fixpoint round found out about a non-terminal
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NonterminalIteration {
    pub(crate) is_stable: bool,
    // Root-to-root relations implied by the non-terminal's production rules
    pub(crate) transitive_relations: BTreeMap<DependencyKey, Dependency>,
}

static EMPTY_NONTERMINAL_ITERATION: NonterminalIteration = NonterminalIteration {
    is_stable: false,
    transitive_relations: BTreeMap::new(),
};

impl NonterminalIteration {
    pub fn empty() -> &'static NonterminalIteration {
        &EMPTY_NONTERMINAL_ITERATION
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    pub fn transitive_relations(&self) -> &BTreeMap<DependencyKey, Dependency> {
        &self.transitive_relations
    }

    pub fn add_transitive_relation(&mut self, relation: Dependency) {
        self.transitive_relations.insert(relation.key(), relation);
    }

    pub fn has_same_relations_as(&self, other: &NonterminalIteration) -> bool {
        self.transitive_relations.keys().eq(other.transitive_relations.keys())
    }

    pub fn transitive_relations_string(&self) -> String {
        self.transitive_relations
            .values()
            .map(Dependency::relation_string)
            .sorted()
            .join(",")
    }
}

// What one fixpoint round found out about a production rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductionRuleIteration {
    pub(crate) cycle_found: bool,
    pub(crate) root_projections: BTreeMap<DependencyKey, Dependency>,
    pub(crate) redecorated_relations: BTreeMap<DependencyKey, Dependency>,
}

impl ProductionRuleIteration {
    pub fn cycle_found(&self) -> bool {
        self.cycle_found
    }

    pub fn root_projections(&self) -> &BTreeMap<DependencyKey, Dependency> {
        &self.root_projections
    }

    pub fn redecorated_relations(&self) -> &BTreeMap<DependencyKey, Dependency> {
        &self.redecorated_relations
    }

    pub fn add_root_projection(&mut self, projection: Dependency) {
        self.root_projections.insert(projection.key(), projection);
    }

    pub fn add_redecorated_relation(&mut self, relation: Dependency) {
        self.redecorated_relations.insert(relation.key(), relation);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Nonterminal {
    name: String,
    // Indices into the grammar's production rules, in declaration order
    production_rules: Vec<usize>,
    iterations: Vec<NonterminalIteration>,
}

impl Nonterminal {
    pub fn new(name: &str) -> Self {
        Nonterminal {
            name: name.to_string(),
            production_rules: Vec::new(),
            iterations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn production_rule_indices(&self) -> &[usize] {
        &self.production_rules
    }

    pub(crate) fn add_production_rule(&mut self, rule_index: usize) {
        self.production_rules.push(rule_index);
    }

    pub fn iterations(&self) -> &[NonterminalIteration] {
        &self.iterations
    }

    pub fn iteration(&self, round: usize) -> Option<&NonterminalIteration> {
        self.iterations.get(round)
    }

    pub fn add_iteration(&mut self) {
        self.iterations.push(NonterminalIteration::default());
    }

    pub(crate) fn current_iteration_mut(&mut self) -> Option<&mut NonterminalIteration> {
        self.iterations.last_mut()
    }

    /// The relations known before `round` updated this non-terminal.
    ///
    /// Within a round non-terminals are visited one after another, so when a
    /// rule of an earlier non-terminal asks for this one's relations, this
    /// one's snapshot for `round` may or may not exist yet:
    /// - round 0 has no predecessor, so the answer is an empty snapshot
    /// - history shorter than or equal to `round`: not updated yet, the last
    ///   snapshot is the previous one
    /// - otherwise the snapshot for `round` is last, the previous one is the
    ///   penultimate
    pub fn previous_iteration(&self, round: usize) -> &NonterminalIteration {
        if round == 0 {
            return NonterminalIteration::empty();
        }

        let length = self.iterations.len();
        let previous = if length <= round {
            self.iterations.last()
        } else {
            length.checked_sub(2).and_then(|index| self.iterations.get(index))
        };

        previous.unwrap_or(NonterminalIteration::empty())
    }
}

/// Result of the strong acyclicity test, round by round.
#[derive(Debug, Clone, PartialEq)]
pub struct StrongAcyclicity {
    // In order of first appearance as a left-hand side
    nonterminals: Vec<Nonterminal>,
    nonterminal_indices: HashMap<String, usize>,
    pub(crate) is_strongly_acyclic: bool,
    pub(crate) is_iteration_stable: Vec<bool>,
}

impl Default for StrongAcyclicity {
    fn default() -> Self {
        StrongAcyclicity {
            nonterminals: Vec::new(),
            nonterminal_indices: HashMap::new(),
            is_strongly_acyclic: true,
            is_iteration_stable: Vec::new(),
        }
    }
}

impl StrongAcyclicity {
    pub fn nonterminals(&self) -> &[Nonterminal] {
        &self.nonterminals
    }

    pub(crate) fn nonterminals_mut(&mut self) -> &mut [Nonterminal] {
        &mut self.nonterminals
    }

    pub fn nonterminal(&self, name: &str) -> Option<&Nonterminal> {
        self.nonterminal_index(name).map(|index| &self.nonterminals[index])
    }

    pub fn nonterminal_index(&self, name: &str) -> Option<usize> {
        self.nonterminal_indices.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.nonterminal_indices.contains_key(name)
    }

    // Returns the index of the named non-terminal, registering it if new
    pub(crate) fn add_nonterminal(&mut self, name: &str) -> usize {
        if let Some(index) = self.nonterminal_index(name) {
            return index;
        }

        self.nonterminals.push(Nonterminal::new(name));
        let index = self.nonterminals.len() - 1;
        self.nonterminal_indices.insert(name.to_string(), index);
        return index;
    }

    pub fn is_strongly_acyclic(&self) -> bool {
        self.is_strongly_acyclic
    }

    pub fn is_iteration_stable(&self) -> &[bool] {
        &self.is_iteration_stable
    }

    pub fn number_of_iterations(&self) -> usize {
        self.is_iteration_stable.len()
    }

    // Starts a round, stable until some non-terminal proves otherwise
    pub fn add_iteration(&mut self) {
        self.is_iteration_stable.push(true);
    }

    pub fn set_iteration_unstable(&mut self, round: usize) {
        if let Some(stable) = self.is_iteration_stable.get_mut(round) {
            *stable = false;
        }
    }
}
