//! Ordered, owned sequences of Values.

use super::Value;
use crate::error::{Error, MusiqueError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Array {
    pub elements: Vec<Value>,
}

impl Array {
    pub fn new(elements: Vec<Value>) -> Self {
        Array { elements }
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

impl std::fmt::Display for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

impl PartialOrd for Array {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.elements.iter().partial_cmp(other.elements.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;

    #[test]
    fn index_and_size() {
        let a = Array::new(vec![Value::Number(Number::integer(1)), Value::Nil]);
        assert_eq!(a.size(), 2);
        assert_eq!(a.index(0).unwrap(), Value::Number(Number::integer(1)));
        assert!(a.index(5).is_err());
    }
}
