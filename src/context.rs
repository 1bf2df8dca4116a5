//! Ambient musical defaults: octave, length, BPM, and the MIDI port handle.
//!
//! Ported from `original_source/musique/interpreter/context.hh`/`.cc`.

use crate::midi::MidiPort;
use crate::number::Number;
use crate::value::Note;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone)]
pub struct Context {
    pub octave: i8,
    pub length: Number,
    pub bpm: u32,
    pub port: Option<Rc<RefCell<dyn MidiPort>>>,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            octave: 4,
            length: Number::new(1, 4),
            bpm: 120,
            port: None,
        }
    }
}

impl Context {
    /// Fills a note's missing octave/length from the context defaults.
    pub fn fill(&self, note: &Note) -> Note {
        note.fill(self.octave, self.length)
    }

    /// Converts a length (fraction of a whole note) into real time, given
    /// the current BPM: `l.num * 60 / (bpm/4) / l.den` seconds.
    pub fn length_to_duration(&self, length: Number) -> Duration {
        let seconds = (length.num as f64 * 60.0) / (self.bpm as f64 / 4.0) / (length.den as f64);
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_values() {
        let ctx = Context::default();
        assert_eq!(ctx.octave, 4);
        assert_eq!(ctx.length, Number::new(1, 4));
        assert_eq!(ctx.bpm, 120);
    }

    #[test]
    fn quarter_note_at_120_bpm_is_half_a_second() {
        let ctx = Context::default();
        let d = ctx.length_to_duration(Number::new(1, 4));
        assert!((d.as_secs_f64() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fill_only_replaces_missing_fields() {
        let ctx = Context::default();
        let note = Note::new(Some(0), None, None);
        let filled = ctx.fill(&note);
        assert_eq!(filled.octave, Some(4));
        assert_eq!(filled.length, Some(Number::new(1, 4)));
    }
}
