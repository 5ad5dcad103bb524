use std::fmt::Display;

pub trait ErrorType: Display + PartialEq {}

// Where in the grammar an error was found
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Location {
    // 1-based line of the grammar text
    Line(usize),
    // 0-based index of a production rule, for errors found after parsing
    Rule(usize),
    // No position applies (e.g. a whole file)
    Nowhere,
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Line(line) => write!(f, "Line {}", line),
            Location::Rule(index) => write!(f, "Production rule {}", index),
            Location::Nowhere => Ok(()),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Error<T: ErrorType> {
    pub location: Location,
    // The piece of text the error is about
    pub fragment: String,
    pub error: T,
}

impl<T: ErrorType> Display for Error<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.location, self.fragment.is_empty()) {
            (Location::Nowhere, true) => write!(f, "{}", self.error),
            (Location::Nowhere, false) => write!(f, "'{}'  {}", self.fragment, self.error),
            (location, true) => write!(f, "{}:  {}", location, self.error),
            (location, false) => write!(f, "{}: '{}'  {}", location, self.fragment, self.error),
        }
    }
}

pub type Errors<T> = Vec<Error<T>>;
