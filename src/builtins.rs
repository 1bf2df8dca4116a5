//! The standard library: every name in `Env::global()` at startup beyond the
//! note-length constants. Ported from `original_source/musique/builtin_functions.cc`.

use crate::env::Env;
use crate::error::{Error, MusiqueError, Result};
use crate::interpreter::Interpreter;
use crate::number::Number;
use crate::value::{flatten, Array, Chord, Note, Set, Value};

fn wrong_arity(name: &str, expected: usize, actual: usize) -> Error {
    MusiqueError::Wrong_Arity_Of {
        name: name.into(),
        expected,
        actual,
    }
    .into()
}

fn unsupported(name: &str, possibilities: Vec<&'static str>) -> Error {
    MusiqueError::Unsupported_Types_For {
        operator_or_function: "function",
        name: name.into(),
        possibilities,
    }
    .into()
}

fn expect_number(name: &str, v: &Value) -> Result<Number> {
    match v {
        Value::Number(n) => Ok(*n),
        _ => Err(unsupported(name, vec!["number"])),
    }
}

fn expect_exactly(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(wrong_arity(name, n, args.len()));
    }
    Ok(())
}

fn collect_elements(interp: &mut Interpreter, v: &Value) -> Result<Vec<Value>> {
    let size = v
        .collection_size()
        .ok_or_else(|| unsupported("collection", vec!["collection"]))?;
    let mut out = Vec::with_capacity(size);
    for i in 0..size {
        out.push(v.collection_index(interp, i).unwrap()?);
    }
    Ok(out)
}

fn rebuild_like(original: &Value, elements: Vec<Value>) -> Value {
    match original {
        Value::Set(_) => Value::Set(Set::new(elements)),
        _ => Value::Array(Array::new(elements)),
    }
}

// --- context accessors --------------------------------------------------

fn bpm(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    if let Some(arg) = args.into_iter().next() {
        let n = expect_number("bpm", &arg)?;
        interp.context.bpm = n.as_int().max(1) as u32;
    }
    Ok(Value::Number(Number::integer(interp.context.bpm as i64)))
}

fn oct(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    if let Some(arg) = args.into_iter().next() {
        let n = expect_number("oct", &arg)?;
        interp.context.octave = n.as_int() as i8;
    }
    Ok(Value::Number(Number::integer(interp.context.octave as i64)))
}

fn len(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    if let Some(arg) = args.into_iter().next() {
        match &arg {
            Value::Number(n) => interp.context.length = *n,
            other if other.is_collection() => return Ok(Value::Number(Number::integer(other.size()? as i64))),
            _ => return Err(unsupported("len", vec!["number", "collection"])),
        }
    }
    Ok(Value::Number(interp.context.length))
}

// --- math / transforms ---------------------------------------------------

fn floor_fn(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("floor", &args, 1)?;
    let n = expect_number("floor", &args[0])?;
    Ok(Value::Number(n.floor()))
}

fn ceil_fn(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("ceil", &args, 1)?;
    let n = expect_number("ceil", &args[0])?;
    Ok(Value::Number(n.ceil()))
}

fn round_fn(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("round", &args, 1)?;
    let n = expect_number("round", &args[0])?;
    Ok(Value::Number(n.round()))
}

fn range(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (start, stop, step) = match args.len() {
        1 => (Number::integer(0), expect_number("range", &args[0])?, Number::integer(1)),
        2 => (expect_number("range", &args[0])?, expect_number("range", &args[1])?, Number::integer(1)),
        3 => (
            expect_number("range", &args[0])?,
            expect_number("range", &args[1])?,
            expect_number("range", &args[2])?,
        ),
        n => return Err(wrong_arity("range", 2, n)),
    };
    let mut out = Vec::new();
    let ascending = step.as_int() >= 0;
    let mut current = start;
    let limit = 100_000;
    let mut guard = 0;
    loop {
        if ascending {
            if current >= stop {
                break;
            }
        } else if current <= stop {
            break;
        }
        out.push(Value::Number(current));
        current = current + step;
        guard += 1;
        if guard > limit {
            break;
        }
    }
    Ok(Value::Array(Array::new(out)))
}

/// `range 0 n 1`: 0, 1, ..., n-1. Matches `original_source`'s `up`, which
/// is literally the same `range<Up>` instantiation as `range` itself.
fn up(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("up", &args, 1)?;
    range(interp, args)
}

/// n-1, n-2, ..., 0. Mirrors `original_source`'s `range<Down>`, which
/// counts stop down towards start and emits `stop - 1` each step rather
/// than reusing the ascending loop with a negative step.
fn down(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("down", &args, 1)?;
    let n = expect_number("down", &args[0])?;
    let mut out = Vec::new();
    let mut current = n.as_int() - 1;
    while current >= 0 {
        out.push(Value::Number(Number::integer(current)));
        current -= 1;
    }
    Ok(Value::Array(Array::new(out)))
}

fn sieve_primes(limit: usize) -> Vec<i64> {
    if limit < 2 {
        return Vec::new();
    }
    let mut is_composite = vec![false; limit + 1];
    let mut primes = Vec::new();
    for n in 2..=limit {
        if !is_composite[n] {
            primes.push(n as i64);
            let mut m = n * n;
            while m <= limit {
                is_composite[m] = true;
                m += n;
            }
        }
    }
    primes
}

/// Returns the first `n` primes, sizing the sieve via the prime-counting
/// upper bound `n * (ln n + ln ln n)` for n >= 6, doubling and re-sieving if
/// that bound falls short.
fn nprimes(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("nprimes", &args, 1)?;
    let count = expect_number("nprimes", &args[0])?.as_int().max(0) as usize;
    if count == 0 {
        return Ok(Value::Array(Array::new(Vec::new())));
    }
    let mut limit = if count < 6 {
        15
    } else {
        let n = count as f64;
        (n * (n.ln() + n.ln().ln())).ceil() as usize + 10
    };
    loop {
        let primes = sieve_primes(limit);
        if primes.len() >= count {
            return Ok(Value::Array(Array::new(
                primes.into_iter().take(count).map(Number::integer).map(Value::Number).collect(),
            )));
        }
        limit *= 2;
    }
}

// --- collection operations ------------------------------------------------

fn flat(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    Ok(Value::Array(Array::new(flatten(interp, args)?)))
}

fn sort_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("sort", &args, 1)?;
    let mut elements = collect_elements(interp, &args[0])?;
    elements.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(rebuild_like(&args[0], elements))
}

fn reverse(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("reverse", &args, 1)?;
    let mut elements = collect_elements(interp, &args[0])?;
    elements.reverse();
    Ok(rebuild_like(&args[0], elements))
}

fn shuffle_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("shuffle", &args, 1)?;
    let mut elements = collect_elements(interp, &args[0])?;
    crate::random::shuffle(&mut interp.rng, &mut elements);
    Ok(rebuild_like(&args[0], elements))
}

/// Lexicographic next-permutation of the collection's current element
/// order, per `std::next_permutation` in the original. Wraps back to the
/// ascending order once the last permutation is reached.
fn permute(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("permute", &args, 1)?;
    let mut elements = collect_elements(interp, &args[0])?;
    next_permutation(&mut elements);
    Ok(rebuild_like(&args[0], elements))
}

fn next_permutation(elements: &mut [Value]) {
    let n = elements.len();
    if n < 2 {
        return;
    }
    let cmp = |a: &Value, b: &Value| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal);
    let mut i = n - 1;
    while i > 0 && cmp(&elements[i - 1], &elements[i]) != std::cmp::Ordering::Less {
        i -= 1;
    }
    if i == 0 {
        elements.reverse();
        return;
    }
    let mut j = n - 1;
    while cmp(&elements[j], &elements[i - 1]) != std::cmp::Ordering::Greater {
        j -= 1;
    }
    elements.swap(i - 1, j);
    elements[i..].reverse();
}

fn pick(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("pick", &args, 1)?;
    let elements = collect_elements(interp, &args[0])?;
    if elements.is_empty() {
        return Ok(Value::Nil);
    }
    let i = crate::random::uniform(&mut interp.rng, 0, elements.len() as i64 - 1) as usize;
    Ok(elements[i].clone())
}

/// `rotate n xs` — xs rotated left by n positions (negative n rotates
/// right), per §4.8's `rotate n xs` signature.
fn rotate(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("rotate", &args, 2)?;
    let by = expect_number("rotate", &args[0])?.as_int();
    let mut elements = collect_elements(interp, &args[1])?;
    let n = elements.len();
    if n == 0 {
        return Ok(rebuild_like(&args[1], elements));
    }
    let shift = by.rem_euclid(n as i64) as usize;
    elements.rotate_left(shift);
    Ok(rebuild_like(&args[1], elements))
}

fn unique(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("unique", &args, 1)?;
    let elements = collect_elements(interp, &args[0])?;
    let mut out: Vec<Value> = Vec::new();
    for e in elements {
        if !out.contains(&e) {
            out.push(e);
        }
    }
    Ok(rebuild_like(&args[0], out))
}

fn uniq(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("uniq", &args, 1)?;
    let elements = collect_elements(interp, &args[0])?;
    let mut out: Vec<Value> = Vec::new();
    for e in elements {
        if out.last() != Some(&e) {
            out.push(e);
        }
    }
    Ok(rebuild_like(&args[0], out))
}

fn partition(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("partition", &args, 2)?;
    let elements = collect_elements(interp, &args[0])?;
    let predicate = args[1].clone();
    let mut yes = Vec::new();
    let mut no = Vec::new();
    for e in elements {
        if predicate.call(interp, vec![e.clone()])?.truthy() {
            yes.push(e);
        } else {
            no.push(e);
        }
    }
    Ok(Value::Array(Array::new(vec![
        Value::Array(Array::new(yes)),
        Value::Array(Array::new(no)),
    ])))
}

fn min_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("min", &args, 1)?;
    let elements = collect_elements(interp, &args[0])?;
    elements
        .into_iter()
        .reduce(|a, b| if b.partial_cmp(&a) == Some(std::cmp::Ordering::Less) { b } else { a })
        .ok_or_else(|| MusiqueError::Out_Of_Range { required_index: 0, size: 0 }.into())
}

fn max_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("max", &args, 1)?;
    let elements = collect_elements(interp, &args[0])?;
    elements
        .into_iter()
        .reduce(|a, b| if b.partial_cmp(&a) == Some(std::cmp::Ordering::Greater) { b } else { a })
        .ok_or_else(|| MusiqueError::Out_Of_Range { required_index: 0, size: 0 }.into())
}

fn len_of(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("size", &args, 1)?;
    Ok(Value::Number(Number::integer(args[0].size()? as i64)))
}

fn update(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("update", &args, 3)?;
    let mut elements = collect_elements(interp, &args[0])?;
    let index = expect_number("update", &args[1])?.as_int();
    if index < 0 || index as usize >= elements.len() {
        return Err(MusiqueError::Out_Of_Range {
            required_index: index.max(0) as usize,
            size: elements.len(),
        }
        .into());
    }
    elements[index as usize] = args[2].clone();
    Ok(rebuild_like(&args[0], elements))
}

/// Interleaves several collections' elements round-robin, per the mix-down
/// usage pattern in `original_source/musique/builtin_functions.cc`.
fn mix(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Array(Array::new(Vec::new())));
    }
    let lists: Vec<Vec<Value>> = args
        .iter()
        .map(|v| collect_elements(interp, v))
        .collect::<Result<Vec<_>>>()?;
    let max_len = lists.iter().map(|l| l.len()).max().unwrap_or(0);
    let mut out = Vec::new();
    for i in 0..max_len {
        for list in &lists {
            if !list.is_empty() {
                out.push(list[i % list.len()].clone());
            }
        }
    }
    Ok(Value::Array(Array::new(out)))
}

fn digits(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("digits", &args, 1)?;
    let n = expect_number("digits", &args[0])?.as_int();
    let digits: Vec<Value> = n
        .abs()
        .to_string()
        .chars()
        .map(|c| Value::Number(Number::integer(c.to_digit(10).unwrap() as i64)))
        .collect();
    Ok(Value::Array(Array::new(digits)))
}

// --- higher-order functions -----------------------------------------------

/// `for xs f` — calls f once per element of xs for its side effects,
/// returning only the last call's result (nil if xs is empty).
fn for_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("for", &args, 2)?;
    let elements = collect_elements(interp, &args[0])?;
    let block = args[1].clone();
    let mut result = Value::Nil;
    for e in elements {
        result = block.call(interp, vec![e])?;
    }
    Ok(result)
}

/// `map f xs` — a new collection of f applied to each element of xs.
fn collecting_map(interp: &mut Interpreter, block: &Value, elements: Vec<Value>) -> Result<Value> {
    let mut out = Vec::with_capacity(elements.len());
    for e in elements {
        out.push(block.call(interp, vec![e])?);
    }
    Ok(Value::Array(Array::new(out)))
}

/// `map f xs` — the callback comes first, per §4.8, the mirror image of
/// `for`'s `(xs, f)` order.
fn map_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("map", &args, 2)?;
    let elements = collect_elements(interp, &args[1])?;
    collecting_map(interp, &args[0], elements)
}

/// `fold f init xs` — left fold of xs with f, starting from init.
fn fold(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("fold", &args, 3)?;
    let block = args[0].clone();
    let mut acc = args[1].clone();
    let elements = collect_elements(interp, &args[2])?;
    for e in elements {
        acc = block.call(interp, vec![acc, e])?;
    }
    Ok(acc)
}

/// `scan f xs` — an inclusive prefix scan: the result has the same length
/// as xs, its first element unchanged and each following one
/// `f(previous_result, current_element)`.
fn scan(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("scan", &args, 2)?;
    let block = args[0].clone();
    let elements = collect_elements(interp, &args[1])?;
    let mut out: Vec<Value> = Vec::with_capacity(elements.len());
    let mut elements = elements.into_iter();
    if let Some(first) = elements.next() {
        out.push(first);
        for e in elements {
            let acc = block.call(interp, vec![out.last().unwrap().clone(), e])?;
            out.push(acc);
        }
    }
    Ok(Value::Array(Array::new(out)))
}

fn call_fn(interp: &mut Interpreter, mut args: Vec<Value>) -> Result<Value> {
    if args.is_empty() {
        return Err(wrong_arity("call", 1, 0));
    }
    let callee = args.remove(0);
    callee.call(interp, args)
}

fn if_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    if args.len() != 2 && args.len() != 3 {
        return Err(wrong_arity("if", 2, args.len()));
    }
    if args[0].truthy() {
        args[1].call(interp, vec![])
    } else if let Some(else_branch) = args.get(2) {
        else_branch.call(interp, vec![])
    } else {
        Ok(Value::Nil)
    }
}

fn while_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("while", &args, 2)?;
    let condition = args[0].clone();
    let body = args[1].clone();
    let mut result = Value::Nil;
    while condition.call(interp, vec![])?.truthy() {
        result = body.call(interp, vec![])?;
    }
    Ok(result)
}

fn try_fn(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("try", &args, 1)?;
    let block = args[0].clone();
    match block.call(interp, vec![]) {
        Ok(v) => Ok(v),
        Err(_) => Ok(Value::Nil),
    }
}

// --- music -----------------------------------------------------------------

fn chord_fn(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let mut notes = Vec::new();
    for arg in args {
        match arg {
            Value::Chord(c) => notes.extend(c.notes),
            _ => return Err(unsupported("chord", vec!["music"])),
        }
    }
    Ok(Value::Chord(Chord::new(notes)))
}

fn set_len(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("set_len", &args, 2)?;
    let length = expect_number("set_len", &args[1])?;
    match &args[0] {
        Value::Chord(c) => {
            let mut c = c.clone();
            for n in &mut c.notes {
                n.length = Some(length);
            }
            Ok(Value::Chord(c))
        }
        _ => Err(unsupported("set_len", vec!["(music, number)"])),
    }
}

fn set_oct(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("set_oct", &args, 2)?;
    let octave = expect_number("set_oct", &args[1])?;
    match &args[0] {
        Value::Chord(c) => {
            let mut c = c.clone();
            for n in &mut c.notes {
                n.octave = Some(octave.as_int() as i8);
            }
            Ok(Value::Chord(c))
        }
        _ => Err(unsupported("set_oct", vec!["(music, number)"])),
    }
}

fn duration(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("duration", &args, 1)?;
    match &args[0] {
        Value::Chord(c) => {
            let total = c
                .notes
                .iter()
                .map(|n| n.length.unwrap_or(interp.context.length))
                .fold(Number::integer(0), |acc, l| if l > acc { l } else { acc });
            Ok(Value::Number(total))
        }
        _ => Err(unsupported("duration", vec!["music"])),
    }
}

fn play(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("play", &args, 1)?;
    let previous_action = interp.default_action.replace(play);
    let saved_context = interp.context.clone();
    let result = walk_and_play(interp, args[0].clone());
    interp.context = saved_context;
    interp.default_action = previous_action;
    result?;
    Ok(Value::Nil)
}

fn walk_and_play(interp: &mut Interpreter, value: Value) -> Result<()> {
    match value {
        Value::Chord(c) => interp.play_chord(&c),
        Value::Array(a) => {
            for e in a.elements {
                walk_and_play(interp, e)?;
            }
            Ok(())
        }
        Value::Block(b) => {
            let result = b.call(interp, vec![])?;
            walk_and_play(interp, result)
        }
        _ => Ok(()),
    }
}

/// Plays its first argument while evaluating the rest concurrently with it —
/// approximated here by sustaining the first chord's notes, running the
/// remaining arguments to completion, then releasing.
fn par(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    if args.is_empty() {
        return Err(wrong_arity("par", 1, 0));
    }
    let mut args = args.into_iter();
    let lead = args.next().unwrap();
    if let Value::Chord(c) = &lead {
        let port = interp.require_port("par")?;
        let channel = 0u8;
        let notes: Vec<Note> = c.notes.iter().map(|n| interp.context.fill(n)).collect();
        for n in &notes {
            if let Some(midi) = n.into_midi_note(interp.context.octave) {
                port.borrow_mut().send_note_on(channel, midi as u8, 127);
                interp.active_notes.push((channel, midi as u8));
            }
        }
        for rest in args {
            walk_and_play(interp, rest)?;
        }
        for n in &notes {
            if let Some(midi) = n.into_midi_note(interp.context.octave) {
                port.borrow_mut().send_note_off(channel, midi as u8, 127);
                interp.active_notes.retain(|&(c, v)| !(c == channel && v == midi as u8));
            }
        }
    } else {
        walk_and_play(interp, lead)?;
        for rest in args {
            walk_and_play(interp, rest)?;
        }
    }
    Ok(Value::Nil)
}

/// Flattens every track argument to a sequence of chords, lays out each
/// track's own running clock, then merges and replays the combined
/// note-on/off timeline in time order.
fn sim(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Kind {
        On,
        Off,
    }
    struct Event {
        time: Number,
        kind: Kind,
        channel: u8,
        note: u8,
    }

    let port = interp.require_port("sim")?;
    let mut events = Vec::new();
    for track in args {
        let elements = collect_elements(interp, &track).unwrap_or_else(|_| vec![track]);
        let mut clock = Number::integer(0);
        for e in elements {
            if let Value::Chord(c) = e {
                let notes: Vec<Note> = c.notes.iter().map(|n| interp.context.fill(n)).collect();
                let step = notes
                    .iter()
                    .map(|n| n.length.unwrap_or(interp.context.length))
                    .fold(Number::integer(0), |acc, l| if l > acc { l } else { acc });
                for n in &notes {
                    if let Some(midi) = n.into_midi_note(interp.context.octave) {
                        let length = n.length.unwrap_or(interp.context.length);
                        events.push(Event {
                            time: clock,
                            kind: Kind::On,
                            channel: 0,
                            note: midi as u8,
                        });
                        events.push(Event {
                            time: clock + length,
                            kind: Kind::Off,
                            channel: 0,
                            note: midi as u8,
                        });
                    }
                }
                clock = clock + step;
            }
        }
    }
    events.sort_by(|a, b| a.time.cmp(&b.time).then(a.kind.cmp(&b.kind)));

    let mut elapsed = Number::integer(0);
    for event in events {
        let wait = event.time - elapsed;
        if wait > Number::integer(0) {
            interp.sleep(interp.context.length_to_duration(wait))?;
        }
        elapsed = event.time;
        match event.kind {
            Kind::On => {
                port.borrow_mut().send_note_on(event.channel, event.note, 127);
                interp.active_notes.push((event.channel, event.note));
            }
            Kind::Off => {
                port.borrow_mut().send_note_off(event.channel, event.note, 127);
                interp.active_notes.retain(|&(c, n)| !(c == event.channel && n == event.note));
            }
        }
    }
    Ok(Value::Nil)
}

fn program_change(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("program_change", &args, 1)?;
    let program = expect_number("program_change", &args[0])?.as_int();
    let port = interp.require_port("program_change")?;
    port.borrow_mut().send_program_change(0, program as u8);
    Ok(Value::Nil)
}

fn note_on(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("note_on", &args, 1)?;
    match &args[0] {
        Value::Chord(c) => {
            let port = interp.require_port("note_on")?;
            for n in &c.notes {
                let filled = interp.context.fill(n);
                if let Some(midi) = filled.into_midi_note(interp.context.octave) {
                    port.borrow_mut().send_note_on(0, midi as u8, 127);
                    interp.active_notes.push((0, midi as u8));
                }
            }
            Ok(Value::Nil)
        }
        _ => Err(unsupported("note_on", vec!["music"])),
    }
}

fn note_off(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("note_off", &args, 1)?;
    match &args[0] {
        Value::Chord(c) => {
            let port = interp.require_port("note_off")?;
            for n in &c.notes {
                let filled = interp.context.fill(n);
                if let Some(midi) = filled.into_midi_note(interp.context.octave) {
                    port.borrow_mut().send_note_off(0, midi as u8, 0);
                    interp.active_notes.retain(|&(c, v)| !(c == 0 && v == midi as u8));
                }
            }
            Ok(Value::Nil)
        }
        _ => Err(unsupported("note_off", vec!["music"])),
    }
}

fn say(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    println!("{}", parts.join(" "));
    Ok(args.into_iter().next().unwrap_or(Value::Nil))
}

// --- meta --------------------------------------------------------------

fn typeof_fn(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("typeof", &args, 1)?;
    Ok(Value::Symbol(args[0].type_name().to_string()))
}

fn hash_fn(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    expect_exactly("hash", &args, 1)?;
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    args[0].hash(&mut hasher);
    Ok(Value::Number(Number::integer(hasher.finish() as i64)))
}

/// Populates `env` with every intrinsic named in the built-in library
/// contract. Called once from `Interpreter::new`.
pub fn register(env: &Env) {
    let entries: &[(&'static str, crate::value::intrinsic::Intrinsic_Fn)] = &[
        ("bpm", bpm),
        ("oct", oct),
        ("len", len),
        ("floor", floor_fn),
        ("ceil", ceil_fn),
        ("round", round_fn),
        ("range", range),
        ("up", up),
        ("down", down),
        ("nprimes", nprimes),
        ("flat", flat),
        ("sort", sort_fn),
        ("reverse", reverse),
        ("shuffle", shuffle_fn),
        ("permute", permute),
        ("pick", pick),
        ("rotate", rotate),
        ("unique", unique),
        ("uniq", uniq),
        ("partition", partition),
        ("min", min_fn),
        ("max", max_fn),
        ("size", len_of),
        ("update", update),
        ("mix", mix),
        ("digits", digits),
        ("for", for_fn),
        ("map", map_fn),
        ("fold", fold),
        ("scan", scan),
        ("call", call_fn),
        ("if", if_fn),
        ("while", while_fn),
        ("try", try_fn),
        ("chord", chord_fn),
        ("set_len", set_len),
        ("set_oct", set_oct),
        ("duration", duration),
        ("play", play),
        ("par", par),
        ("sim", sim),
        ("program_change", program_change),
        ("patch", program_change),
        ("note_on", note_on),
        ("note_off", note_off),
        ("typeof", typeof_fn),
        ("hash", hash_fn),
        ("say", say),
    ];
    for (name, function) in entries {
        env.force_define(*name, Value::Intrinsic(crate::value::intrinsic::Intrinsic { name, function: *function }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str) -> Result<Value> {
        let ast = parse(source, "t.mq")?;
        Interpreter::new().eval(ast)
    }

    #[test]
    fn range_builds_ascending_array() {
        let v = run("range 1 5").unwrap();
        match v {
            Value::Array(a) => assert_eq!(a.elements.len(), 4),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn nprimes_returns_requested_count() {
        let v = run("nprimes 5").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![2, 3, 5, 7, 11]
                    .into_iter()
                    .map(|n| Value::Number(Number::integer(n)))
                    .collect::<Vec<_>>()
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn fold_sums_a_range() {
        assert_eq!(run("fold (acc, x | acc + x) 0 (range 1 4)").unwrap(), Value::Number(Number::integer(6)));
    }

    #[test]
    fn for_returns_only_the_last_result() {
        assert_eq!(run("for (1, 2, 3) (x | x * 10)").unwrap(), Value::Number(Number::integer(30)));
    }

    #[test]
    fn map_applies_callback_to_each_element() {
        let v = run("map (x | x * 2) (1, 2, 3)").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![2, 4, 6].into_iter().map(|n| Value::Number(Number::integer(n))).collect::<Vec<_>>()
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn scan_yields_running_totals() {
        let v = run("scan (acc, x | acc + x) (1, 2, 3, 4)").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![1, 3, 6, 10].into_iter().map(|n| Value::Number(Number::integer(n))).collect::<Vec<_>>()
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn sort_orders_numbers() {
        let v = run("sort (3, 1, 2)").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![1, 2, 3].into_iter().map(|n| Value::Number(Number::integer(n))).collect::<Vec<_>>()
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn typeof_reports_music() {
        assert_eq!(run("typeof c4").unwrap(), Value::Symbol("music".to_string()));
    }

    #[test]
    fn if_builtin_picks_a_branch() {
        assert_eq!(run("if true (1) (2)").unwrap(), Value::Number(Number::integer(1)));
    }

    #[test]
    fn say_returns_its_first_argument() {
        assert_eq!(run("say (1 + 2)").unwrap(), Value::Number(Number::integer(3)));
    }

    #[test]
    fn rotate_takes_count_before_collection() {
        let v = run("rotate 2 (1, 2, 3, 4)").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![3, 4, 1, 2].into_iter().map(|n| Value::Number(Number::integer(n))).collect::<Vec<_>>()
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn permute_advances_to_next_lexicographic_order() {
        let v = run("permute (1, 2, 3)").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![1, 3, 2].into_iter().map(|n| Value::Number(Number::integer(n))).collect::<Vec<_>>()
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn permute_wraps_after_last_permutation() {
        let v = run("permute (3, 2, 1)").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![1, 2, 3].into_iter().map(|n| Value::Number(Number::integer(n))).collect::<Vec<_>>()
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }
}
