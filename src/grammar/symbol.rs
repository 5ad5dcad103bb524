use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use itertools::Itertools;

use super::dependency::{Dependency, DependencyKey};

// A named value attached to one occurrence of a symbol in a production rule
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    // Dependencies starting at this attribute, keyed by their endpoints
    dependencies: BTreeMap<DependencyKey, Dependency>,
    // Relations redecorated onto this attribute during the current round only
    redecorated_dependencies: Vec<Dependency>,
    // Declared on this symbol in another production rule, not in this one
    indirectly_identified: bool,
}

impl Attribute {
    pub fn new(name: &str) -> Self {
        Attribute {
            name: name.to_string(),
            dependencies: BTreeMap::new(),
            redecorated_dependencies: Vec::new(),
            indirectly_identified: false,
        }
    }

    pub fn indirectly_identified(name: &str) -> Self {
        Attribute {
            indirectly_identified: true,
            ..Attribute::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_indirectly_identified(&self) -> bool {
        self.indirectly_identified
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        self.dependencies.insert(dependency.key(), dependency);
    }

    pub fn has_dependency(&self, key: &DependencyKey) -> bool {
        self.dependencies.contains_key(key)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values()
    }

    pub fn redecorated_dependencies(&self) -> &[Dependency] {
        &self.redecorated_dependencies
    }

    pub fn add_redecorated_dependency(&mut self, dependency: Dependency) {
        self.redecorated_dependencies.push(dependency);
    }

    pub fn empty_redecorated_dependencies(&mut self) {
        self.redecorated_dependencies.clear();
    }

    // Declared and redecorated dependencies together, as walked by the closure
    pub fn all_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values().chain(self.redecorated_dependencies.iter())
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.dependencies.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}->{{{}}}", self.name, self.dependencies.values().join(", "))
        }
    }
}

/// The attributes of one symbol occurrence, addressable by name and by
/// position. After reconciliation the positions are the alphabetical order
/// of the names, identical for every occurrence of the same symbol.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeMap {
    attributes: Vec<Attribute>,
}

impl AttributeMap {
    pub fn new() -> Self {
        AttributeMap { attributes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|attribute| attribute.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|attribute| attribute.name == name)
    }

    pub fn get_at(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut Attribute> {
        self.attributes.get_mut(index)
    }

    // Adds the attribute unless one with the same name is already present
    pub fn add_if_absent(&mut self, attribute: Attribute) {
        if !self.has(&attribute.name) {
            self.attributes.push(attribute);
        }
    }

    pub fn sort(&mut self) {
        self.attributes.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.attributes.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attribute| attribute.name.as_str())
    }
}

// A terminal or non-terminal occurring in a production rule
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    name: String,
    attributes: AttributeMap,
}

impl Symbol {
    pub fn new(name: &str, attributes: AttributeMap) -> Self {
        Symbol {
            name: name.to_string(),
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }

    pub fn is_nonterminal(&self, nonterminal_names: &HashSet<String>) -> bool {
        nonterminal_names.contains(&self.name)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.attributes.is_empty() {
            write!(f, "({})", self.name)
        } else {
            write!(f, "({}: {})", self.name, self.attributes.names().join(", "))
        }
    }
}
