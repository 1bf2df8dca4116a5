//! Chords: ordered collections of [`Note`]s, also callable to build up
//! sequences of chords note-by-note.
//!
//! Ported from `original_source/musique/chord.hh`/`value/chord.cc`. A single
//! Note literal is represented as a one-element Chord — the language has no
//! separate "Note value" variant, matching the original's modeling.

use super::note::Note;
use super::Value;
use crate::error::{Error, MusiqueError, Result};
use crate::interpreter::Interpreter;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Chord {
    pub notes: Vec<Note>,
}

impl Chord {
    pub fn new(notes: Vec<Note>) -> Self {
        Chord { notes }
    }

    pub fn single(note: Note) -> Self {
        Chord { notes: vec![note] }
    }

    pub fn index(&self, position: usize) -> Result<Value> {
        self.notes
            .get(position)
            .map(|n| Value::Chord(Chord::single(*n)))
            .ok_or_else(|| {
                Error::from(MusiqueError::Out_Of_Range {
                    required_index: position,
                    size: self.notes.len(),
                })
            })
    }

    pub fn size(&self) -> usize {
        self.notes.len()
    }

    /// The call-semantics of a chord value, building up a sequence of
    /// chords from trailing length/collection arguments. See
    /// `original_source/musique/value/chord.cc`'s `Chord::operator()`.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        #[derive(PartialEq)]
        enum State {
            Waiting_For_Length,
            Waiting_For_Note,
        }

        let mut array: Vec<Chord> = Vec::new();
        let mut current: Vec<Chord> = vec![self.clone()];
        let mut state = State::Waiting_For_Length;

        fn set_length(chord: &mut Chord, length: crate::number::Number) {
            for note in &mut chord.notes {
                note.length = Some(length);
            }
        }

        for arg in arguments {
            match arg {
                Value::Number(n) if state == State::Waiting_For_Length => {
                    for c in &mut current {
                        set_length(c, n);
                    }
                    state = State::Waiting_For_Note;
                }
                Value::Chord(next) => {
                    array.append(&mut current);
                    current = vec![next];
                    state = State::Waiting_For_Length;
                }
                other => {
                    if let Some(size) = other.collection_size() {
                        if state == State::Waiting_For_Length {
                            // Ring-extend current to match the collection's size.
                            if !current.is_empty() && current.len() < size {
                                let template = current.clone();
                                current.clear();
                                for i in 0..size {
                                    current.push(template[i % template.len()].clone());
                                }
                            }
                            for i in 0..current.len().min(size) {
                                if let Some(Ok(Value::Number(n))) = other.collection_index(interpreter, i) {
                                    set_length(&mut current[i], n);
                                }
                            }
                            state = State::Waiting_For_Note;
                            continue;
                        }
                    }
                    return Err(MusiqueError::Unsupported_Types_For {
                        operator_or_function: "function",
                        name: "chord call".into(),
                        possibilities: vec![
                            "(music) (number) -> music",
                            "(music) (array of number) -> music",
                        ],
                    }
                    .into());
                }
            }
        }
        array.append(&mut current);

        if array.len() == 1 {
            Ok(Value::Chord(array.pop().unwrap()))
        } else {
            Ok(Value::Array(super::array::Array::new(
                array.into_iter().map(Value::Chord).collect(),
            )))
        }
    }
}

impl std::fmt::Display for Chord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.notes.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl PartialOrd for Chord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        for (a, b) in self.notes.iter().zip(other.notes.iter()) {
            match a.partial_cmp(b) {
                Some(std::cmp::Ordering::Equal) => continue,
                other => return other,
            }
        }
        self.notes.len().partial_cmp(&other.notes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_note_indexing() {
        let c = Chord::single(Note::new(Some(0), Some(4), None));
        assert_eq!(c.size(), 1);
        assert!(c.index(0).is_ok());
        assert!(c.index(1).is_err());
    }
}
