//! End-to-end scenarios and boundary cases from the language specification,
//! run through the full lexer → parser → evaluator pipeline. Scheduler
//! scenarios (`play`/`par`/`sim`) drive a `NullPort` so they run without
//! real MIDI hardware.

use std::cell::RefCell;
use std::rc::Rc;

use musique::interpreter::Interpreter;
use musique::midi::{MidiEvent, NullPort};
use musique::number::Number;
use musique::parser::parse;
use musique::value::Value;

fn eval(source: &str) -> Value {
    let ast = parse(source, "t.mq").expect("parse failed");
    Interpreter::new().eval(ast).expect("eval failed")
}

fn eval_with_port(source: &str) -> (Value, Vec<MidiEvent>) {
    let mut interp = Interpreter::new();
    let port = Rc::new(RefCell::new(NullPort::new("test")));
    interp.context.port = Some(port.clone());
    let ast = parse(source, "t.mq").expect("parse failed");
    let value = interp.eval(ast).expect("eval failed");
    let sent = port.borrow().sent.clone();
    (value, sent)
}

fn n(v: i64) -> Value {
    Value::Number(Number::integer(v))
}

#[test]
fn say_prints_and_returns_its_argument() {
    assert_eq!(eval("say (1 + 2)"), n(3));
}

#[test]
fn play_a_single_note_emits_on_then_off() {
    let (_, events) = eval_with_port("play c");
    assert_eq!(
        events,
        vec![
            MidiEvent::NoteOn { channel: 0, note: 60, velocity: 127 },
            MidiEvent::NoteOff { channel: 0, note: 60, velocity: 127 },
        ]
    );
}

#[test]
fn par_sustains_the_lead_chord_across_the_rest() {
    let (_, events) = eval_with_port("par c b b e");
    // c (midi 60) turns on first and off last; b (71) and e (64) sound and
    // release in between while c sustains.
    assert_eq!(events.first(), Some(&MidiEvent::NoteOn { channel: 0, note: 60, velocity: 127 }));
    assert_eq!(events.last(), Some(&MidiEvent::NoteOff { channel: 0, note: 60, velocity: 127 }));
    let on_notes: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            MidiEvent::NoteOn { note, .. } => Some(*note),
            _ => None,
        })
        .collect();
    assert!(on_notes.contains(&71)); // b4
    assert!(on_notes.contains(&64)); // e4
}

#[test]
fn sim_interleaves_two_tracks_sorted_by_time() {
    let (_, events) = eval_with_port("sim (c e g) (c5 e5 g5)");
    // Each track is its own sequential timeline starting at t=0, so the
    // two tracks' opening notes (60 and 72) sound simultaneously first.
    assert_eq!(
        &events[0..2],
        &[
            MidiEvent::NoteOn { channel: 0, note: 60, velocity: 127 },
            MidiEvent::NoteOn { channel: 0, note: 72, velocity: 127 },
        ]
    );
    let on_count = events.iter().filter(|e| matches!(e, MidiEvent::NoteOn { .. })).count();
    let off_count = events.iter().filter(|e| matches!(e, MidiEvent::NoteOff { .. })).count();
    assert_eq!(on_count, 6);
    assert_eq!(off_count, 6);
}

#[test]
fn update_replaces_an_array_element_in_place() {
    assert_eq!(eval("A := down 5\nupdate A 3 7\nA . 3"), n(7));
}

#[test]
fn nprimes_returns_the_first_n_primes() {
    assert_eq!(eval("nprimes 4").to_string(), "(2, 3, 5, 7)");
}

#[test]
fn lambda_applied_immediately() {
    assert_eq!(eval("(i | i + 1) 3"), n(4));
}

#[test]
fn fraction_literal_equals_decimal_literal() {
    assert_eq!(eval("1 / 2"), eval("0.5"));
}

#[test]
fn leading_dot_decimal_literal() {
    assert_eq!(eval(".75"), eval("3 / 4"));
}

#[test]
fn chord_plus_twelve_raises_an_octave() {
    match eval("(c4) + 12") {
        Value::Chord(chord) => {
            assert_eq!(chord.notes.len(), 1);
            assert_eq!(chord.notes[0].octave, Some(5));
        }
        other => panic!("expected a chord, got {other:?}"),
    }
}

#[test]
fn chord_plus_twelve_raises_an_octave_with_no_explicit_octave() {
    let interp = Interpreter::new();
    let before = match eval("(c)") {
        Value::Chord(chord) => interp.context.fill(&chord.notes[0]),
        other => panic!("expected a chord, got {other:?}"),
    };
    let after = match eval("(c) + 12") {
        Value::Chord(chord) => interp.context.fill(&chord.notes[0]),
        other => panic!("expected a chord, got {other:?}"),
    };
    assert_eq!(
        after.into_midi_note(interp.context.octave),
        before.into_midi_note(interp.context.octave).map(|m| m + 12),
    );
}

#[test]
fn octave_saturates_at_nine() {
    match eval("(c9) + 1200") {
        Value::Chord(chord) => assert_eq!(chord.notes[0].octave, Some(9)),
        other => panic!("expected a chord, got {other:?}"),
    }
}

#[test]
fn range_with_equal_bounds_is_empty() {
    match eval("range 0 0 1") {
        Value::Array(a) => assert!(a.elements.is_empty()),
        other => panic!("expected an array, got {other:?}"),
    }
}

#[test]
fn up_zero_is_empty() {
    match eval("up 0") {
        Value::Array(a) => assert!(a.elements.is_empty()),
        other => panic!("expected an array, got {other:?}"),
    }
}

#[test]
fn active_notes_are_empty_after_play_completes() {
    let mut interp = Interpreter::new();
    let port = Rc::new(RefCell::new(NullPort::new("test")));
    interp.context.port = Some(port);
    let ast = parse("play c", "t.mq").unwrap();
    interp.eval(ast).unwrap();
    assert!(interp.active_notes.is_empty());
}
