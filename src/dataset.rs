//! Labeled examples and the append-only dataset the classifier trains on.

use serde::{Deserialize, Serialize};

/// One labeled training record.
///
/// The Spanish field names (`descripcion`, `tipo`) are accepted when
/// deserializing so exported datasets can be imported as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Example {
    #[serde(alias = "descripcion")]
    pub description: String,
    #[serde(alias = "tipo")]
    pub label: String,
}

impl Example {
    pub fn new(description: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            label: label.into(),
        }
    }

    fn matches(&self, description: &str, label: &str) -> bool {
        self.description == description && self.label == label
    }
}

/// Ordered, insertion-preserving collection of examples.
///
/// The dataset only grows. [`Dataset::insert_unique`] enforces the
/// no-duplicate-pair rule; [`Dataset::push`] records unconditionally and is
/// reserved for corrections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    examples: Vec<Example>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in bootstrap set used when no dataset has been stored yet.
    pub fn bootstrap() -> Self {
        Self::from(vec![
            Example::new(
                "El trabajador sufrió una lesión lumbar tras levantar una caja pesada.",
                "Sobretensión/Sobre-esfuerzo",
            ),
            Example::new(
                "El trabajador quedó atrapado entre dos máquinas.",
                "Atrapado entre o debajo",
            ),
            Example::new("Un objeto en movimiento golpeó a la persona.", "Golpeado por"),
        ])
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Example> {
        self.examples.iter()
    }

    pub fn contains(&self, description: &str, label: &str) -> bool {
        self.examples.iter().any(|e| e.matches(description, label))
    }

    /// Appends `example` unless the exact (description, label) pair is already present.
    ///
    /// Returns `true` if the example was added.
    pub fn insert_unique(&mut self, example: Example) -> bool {
        if self.contains(&example.description, &example.label) {
            return false;
        }
        self.examples.push(example);
        true
    }

    /// Appends `example` without a duplicate check.
    pub fn push(&mut self, example: Example) {
        self.examples.push(example);
    }

    /// Merges `incoming` with the duplicate rule of [`Dataset::insert_unique`].
    ///
    /// Returns the number of examples actually added.
    pub fn merge<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Example>,
    {
        let mut added = 0;
        for example in incoming {
            if self.insert_unique(example) {
                added += 1;
            }
        }
        added
    }
}

impl From<Vec<Example>> for Dataset {
    fn from(examples: Vec<Example>) -> Self {
        Self { examples }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Example;
    type IntoIter = std::slice::Iter<'a, Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples.iter()
    }
}
