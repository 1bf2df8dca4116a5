//! A single musical note: an optional pitch class, octave and length.
//!
//! Ported from `original_source/musique/note.hh`/`value/note.cc`.

use crate::number::Number;
use std::cmp::Ordering;

/// Maps a note-letter to its pitch class within an octave (c=0 .. b=11).
pub fn base_of_letter(letter: char) -> Option<i32> {
    match letter {
        'c' => Some(0),
        'd' => Some(2),
        'e' => Some(4),
        'f' => Some(5),
        'g' => Some(7),
        'a' => Some(9),
        'h' => Some(11),
        'b' => Some(11),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub base: Option<i32>,
    pub octave: Option<i8>,
    pub length: Option<Number>,
}

impl Note {
    pub fn pause() -> Self {
        Note {
            base: None,
            octave: None,
            length: None,
        }
    }

    pub fn new(base: Option<i32>, octave: Option<i8>, length: Option<Number>) -> Self {
        let mut n = Note { base, octave, length };
        n.simplify_inplace();
        n
    }

    /// Parses a chord/note literal's source text: a base letter or `p`
    /// (pause), a run of accidentals (`#`/`s` raise, `b`/`f` lower), then
    /// optional octave digits.
    pub fn from_source(source: &str) -> Option<Note> {
        let mut chars = source.chars();
        let first = chars.next()?;

        if first == 'p' {
            return Some(Note::pause());
        }

        let mut base = base_of_letter(first)?;
        let mut rest = chars.as_str();

        loop {
            match rest.chars().next() {
                Some('#') | Some('s') => {
                    base += 1;
                    rest = &rest[1..];
                }
                Some('b') | Some('f') => {
                    base -= 1;
                    rest = &rest[1..];
                }
                _ => break,
            }
        }

        let octave = if rest.is_empty() {
            None
        } else {
            Some(rest.parse::<i8>().ok()?)
        };

        Some(Note::new(Some(base), octave, None))
    }

    /// `(octave+1)*12 + base`, using the given default octave if unset.
    pub fn into_midi_note(&self, default_octave: i8) -> Option<i32> {
        let base = self.base?;
        let octave = self.octave.unwrap_or(default_octave) as i32;
        Some((octave + 1) * 12 + base)
    }

    /// Folds base overflow into the octave, clamping octave to [-1, 9] and
    /// normalizing base into [0, 11] — but only once an octave is actually
    /// attached. With no octave, `base` is left raw/unbounded so its full
    /// magnitude survives until an octave is later filled in, at which point
    /// `into_midi_note`'s `(octave+1)*12 + base` reconstructs the right pitch.
    pub fn simplify_inplace(&mut self) {
        if let (Some(base), Some(octave)) = (self.base, self.octave) {
            let mut octave = octave as i32;
            let mut b = base;
            octave += b.div_euclid(12);
            b = b.rem_euclid(12);
            octave = octave.clamp(-1, 9);
            self.base = Some(b);
            self.octave = Some(octave as i8);
        }
    }

    pub fn fill(&self, default_octave: i8, default_length: Number) -> Note {
        Note {
            base: self.base,
            octave: self.octave.or(Some(default_octave)),
            length: self.length.or(Some(default_length)),
        }
    }
}

impl PartialOrd for Note {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.base, other.base) {
            (None, None) => match (self.length, other.length) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
            (Some(_), Some(_)) => match (self.octave, other.octave) {
                (Some(ao), Some(bo)) => {
                    let a = 12 * ao as i32 + self.base.unwrap();
                    let b = 12 * bo as i32 + other.base.unwrap();
                    a.partial_cmp(&b)
                }
                (None, None) => self.base.partial_cmp(&other.base),
                _ => None,
            },
            _ => None,
        }
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [&str; 12] = [
            "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b",
        ];
        match self.base {
            None => write!(f, "p")?,
            Some(b) => write!(f, "{}", NAMES[(b.rem_euclid(12)) as usize])?,
        }
        if let Some(o) = self.octave {
            write!(f, "{}", o)?;
        }
        if let Some(l) = self.length {
            write!(f, " {}", l)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_note() {
        let n = Note::from_source("c").unwrap();
        assert_eq!(n.base, Some(0));
        assert_eq!(n.octave, None);
    }

    #[test]
    fn parses_sharp_and_octave() {
        let n = Note::from_source("c#4").unwrap();
        assert_eq!(n.base, Some(1));
        assert_eq!(n.octave, Some(4));
    }

    #[test]
    fn parses_flat() {
        let n = Note::from_source("eb3").unwrap();
        assert_eq!(n.base, Some(3));
        assert_eq!(n.octave, Some(3));
    }

    #[test]
    fn pause_has_no_base() {
        let n = Note::from_source("p").unwrap();
        assert_eq!(n.base, None);
    }

    #[test]
    fn midi_formula() {
        let n = Note::new(Some(0), Some(4), None);
        assert_eq!(n.into_midi_note(4), Some(60));
    }

    #[test]
    fn overflow_carries_into_octave() {
        let n = Note::new(Some(12), Some(4), None);
        assert_eq!(n.base, Some(0));
        assert_eq!(n.octave, Some(5));
    }

    #[test]
    fn base_stays_raw_without_an_octave() {
        // No octave attached yet: base is left unreduced so its full
        // magnitude survives until an octave is filled in later.
        let n = Note::new(Some(12), None, None);
        assert_eq!(n.base, Some(12));
        assert_eq!(n.octave, None);
        assert_eq!(n.into_midi_note(4), Note::new(Some(0), None, None).into_midi_note(4).map(|m| m + 12));
    }

    #[test]
    fn octave_clamps_to_valid_range() {
        let n = Note::new(Some(0), Some(20), None);
        assert_eq!(n.octave, Some(9));
        let n = Note::new(Some(0), Some(-20), None);
        assert_eq!(n.octave, Some(-1));
    }
}
