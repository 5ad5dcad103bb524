use std::fmt::Display;

// Index of the root (left-hand) symbol inside a production rule
pub const ROOT_SYMBOL_INDEX: usize = 0;

pub fn symbol_is_root(symbol_index: usize) -> bool {
    symbol_index == ROOT_SYMBOL_INDEX
}

/// Identifies one attribute occurrence inside a production rule by the
/// position of its symbol and the attribute's name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeCoordinate {
    pub symbol_index: usize,
    pub attribute_name: String,
}

impl AttributeCoordinate {
    pub fn new(symbol_index: usize, attribute_name: &str) -> Self {
        AttributeCoordinate {
            symbol_index,
            attribute_name: attribute_name.to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        symbol_is_root(self.symbol_index)
    }
}

impl Display for AttributeCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.attribute_name, self.symbol_index)
    }
}

/// The identity of a dependency: both endpoints as coordinates.
///
/// Before attributes are sorted this is all a dependency knows about itself,
/// so the parser stores dependencies as bare keys and the reconciliation pass
/// turns them into [`Dependency`] values once indices can be resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyKey {
    pub from: AttributeCoordinate,
    pub to: AttributeCoordinate,
}

impl DependencyKey {
    pub fn new(from: AttributeCoordinate, to: AttributeCoordinate) -> Self {
        DependencyKey { from, to }
    }
}

impl Display for DependencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Position of an attribute in its symbol's sorted attribute map, next to its
/// coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub coordinate: AttributeCoordinate,
    pub attribute_index: usize,
}

impl ResolvedEndpoint {
    pub fn new(symbol_index: usize, attribute_name: &str, attribute_index: usize) -> Self {
        ResolvedEndpoint {
            coordinate: AttributeCoordinate::new(symbol_index, attribute_name),
            attribute_index,
        }
    }
}

/// A directed "is computed from" edge: the value of `to` depends on `from`.
/// Only the source attribute stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    from: ResolvedEndpoint,
    to: ResolvedEndpoint,
}

impl Dependency {
    pub fn new(from: ResolvedEndpoint, to: ResolvedEndpoint) -> Self {
        Dependency { from, to }
    }

    /// Re-expresses a relation of a non-terminal's own root so that both
    /// endpoints sit on the symbol at `symbol_index` of another rule.
    pub fn redecorate_to(&self, symbol_index: usize) -> Dependency {
        Dependency {
            from: ResolvedEndpoint::new(symbol_index, self.from_attribute_name(), self.from.attribute_index),
            to: ResolvedEndpoint::new(symbol_index, self.to_attribute_name(), self.to.attribute_index),
        }
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(self.from.coordinate.clone(), self.to.coordinate.clone())
    }

    pub fn source(&self) -> &ResolvedEndpoint {
        &self.from
    }

    pub fn target(&self) -> &ResolvedEndpoint {
        &self.to
    }

    pub fn from_attribute_name(&self) -> &str {
        &self.from.coordinate.attribute_name
    }

    pub fn to_attribute_name(&self) -> &str {
        &self.to.coordinate.attribute_name
    }

    pub fn from_symbol_index(&self) -> usize {
        self.from.coordinate.symbol_index
    }

    pub fn to_symbol_index(&self) -> usize {
        self.to.coordinate.symbol_index
    }

    pub fn from_attribute_index_inside_symbol(&self) -> usize {
        self.from.attribute_index
    }

    pub fn to_attribute_index_inside_symbol(&self) -> usize {
        self.to.attribute_index
    }

    // `(from,to)`, the notation learners type their answers in
    pub fn relation_string(&self) -> String {
        format!("({},{})", self.from_attribute_name(), self.to_attribute_name())
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}[{}] -> {}_{}[{}]",
            self.from_attribute_name(),
            self.from.attribute_index,
            self.from_symbol_index(),
            self.to_attribute_name(),
            self.to.attribute_index,
            self.to_symbol_index()
        )
    }
}
