use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MacrostateSetError {
    #[error("At least one macrostate must be declared")]
    Empty,
    #[error("Macrostate '{0}' is declared more than once")]
    Duplicate(String),
    #[error("Macrostate names cannot be blank")]
    BlankName,
}

/// The fixed `{name -> index}` table of macrostates being modeled.
///
/// Indices follow declaration order and are used to address the macrostate
/// axis of every model and every weight vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacrostateSet {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl MacrostateSet {
    pub fn new<I, S>(names: I) -> Result<Self, MacrostateSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut indices = HashMap::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(MacrostateSetError::BlankName);
            }
            if indices.insert(name.clone(), ordered.len()).is_some() {
                return Err(MacrostateSetError::Duplicate(name));
            }
            ordered.push(name);
        }
        if ordered.is_empty() {
            return Err(MacrostateSetError::Empty);
        }
        Ok(Self {
            names: ordered,
            indices,
        })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name.trim()).copied()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
