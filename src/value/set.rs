//! Unordered, hash-based collections of Values.
//!
//! Backed by an insertion-ordered `Vec` rather than `std::collections::HashSet`
//! so that `index`/iteration order is deterministic (needed since a Set is
//! also a Collection with a defined element order for `for`/`map`/etc.),
//! matching the original's `unordered_set` only in the "no duplicates" sense.

use super::Value;
use crate::error::{Error, MusiqueError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Set {
    pub elements: Vec<Value>,
}

impl Set {
    pub fn new(elements: Vec<Value>) -> Self {
        let mut set = Set { elements: Vec::new() };
        for e in elements {
            set.insert(e);
        }
        set
    }

    pub fn insert(&mut self, value: Value) {
        if !self.elements.contains(&value) {
            self.elements.push(value);
        }
    }

    pub fn size(&self) -> usize {
        self.elements.len()
    }

    pub fn index(&self, position: usize) -> Result<Value> {
        self.elements.get(position).cloned().ok_or_else(|| {
            Error::from(MusiqueError::Out_Of_Range {
                required_index: position,
                size: self.elements.len(),
            })
        })
    }
}

impl std::hash::Hash for Set {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Order-independent so that two Sets built from the same elements in
        // different insertion order still hash identically.
        let mut acc: u64 = 0;
        for e in &self.elements {
            let mut h = std::collections::hash_map::DefaultHasher::new();
            e.hash(&mut h);
            acc ^= std::hash::Hasher::finish(&h);
        }
        state.write_u64(acc);
    }
}

impl std::fmt::Display for Set {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;

    #[test]
    fn insert_deduplicates() {
        let s = Set::new(vec![
            Value::Number(Number::integer(1)),
            Value::Number(Number::integer(1)),
            Value::Number(Number::integer(2)),
        ]);
        assert_eq!(s.size(), 2);
    }
}
