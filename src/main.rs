//! Command-line front-end: argument parsing, config loading, MIDI port
//! connection and the REPL. Generalizes the teacher's hand-rolled
//! `env::args()` loop in `main.rs` into the subcommand grammar §6 requires,
//! using `clap`'s derive API the way `rothfield-music-text`'s `Cargo.toml`
//! pulls it in. Grounded on `original_source/musique/main.cc`'s flag
//! vocabulary (`-o/--output`, `-I/--interactive/--repl`, `-c/--run`) and REPL
//! colon-commands (`:exit`, `:help`, `:clear`, `:load`).

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use musique::config::{config_path, Config};
use musique::error::MusiqueError;
use musique::interpreter::Interpreter;
use musique::midi::{MidiPort, MidirPort};
use musique::parser::parse;
use musique::value::Value;

const EXIT_SUCCESS: u8 = 0;
const EXIT_RECOVERABLE_ERROR: u8 = 1;
const EXIT_INTERNAL_BUG: u8 = 42;

#[derive(Parser)]
#[command(name = "musique", version, about = "An interactive language for algorithmic music composition and live coding")]
struct Cli {
    /// MIDI output port name (or substring); connects to the first
    /// available port if omitted.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Print the AST instead of evaluating it.
    #[arg(long = "ast")]
    ast_only: bool,

    /// Suppress the "Connected MIDI output..." banner.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a source file.
    Run { file: String },
    /// Parse a file and register it as a parameterless function, named
    /// after its stem, without executing the top-level sequence.
    Load { file: String },
    /// Evaluate inline source code.
    Eval { code: String },
    /// Print a one-line description of a builtin.
    Doc { name: String },
    /// Enter the line-oriented read-eval-print loop.
    Repl,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = config_path().map(|p| Config::load(&p)).unwrap_or_default();
    debug!("loaded config: {:?}", config);

    let mut interpreter = Interpreter::new();
    if let Some(bpm) = config.default_bpm {
        interpreter.context.bpm = bpm;
    }
    if let Some(octave) = config.default_octave {
        interpreter.context.octave = octave;
    }

    let port_name = cli.output.clone().or_else(|| config.midi_port_name.clone());
    if let Some(substring) = port_name.as_deref() {
        connect_midi(&mut interpreter, substring, cli.quiet);
    } else if !matches!(cli.command, Some(Command::Doc { .. })) {
        connect_midi(&mut interpreter, "", cli.quiet);
    }

    let result = match cli.command {
        Some(Command::Run { file }) => run_file(&mut interpreter, &file, cli.ast_only),
        Some(Command::Load { file }) => load_file(&mut interpreter, &file, cli.ast_only),
        Some(Command::Eval { code }) => run_source(&mut interpreter, &code, "<arguments>", cli.ast_only, true),
        Some(Command::Doc { name }) => {
            print_doc(&name);
            Ok(())
        }
        Some(Command::Repl) | None => {
            repl(&mut interpreter, cli.ast_only);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(Failure::Recoverable(message)) => {
            eprintln!("{}", message);
            ExitCode::from(EXIT_RECOVERABLE_ERROR)
        }
        Err(Failure::Internal(message)) => {
            eprintln!("internal error: {}", message);
            ExitCode::from(EXIT_INTERNAL_BUG)
        }
    }
}

enum Failure {
    Recoverable(String),
    Internal(String),
}

fn connect_midi(interpreter: &mut Interpreter, substring: &str, quiet: bool) {
    match MidirPort::open(substring) {
        Ok(port) => {
            let name = port.name().to_string();
            if !quiet {
                println!("Connected MIDI output to port {}. Ready to play!", name);
            }
            interpreter.context.port = Some(Rc::new(std::cell::RefCell::new(port)));
        }
        Err(e) => {
            warn!("no MIDI output connected: {}", e);
        }
    }
}

/// Reads the whole file, keeping its contents allocated for the duration of
/// the run since parsed `Ast` ranges only ever borrow the filename, not the
/// source text, but errors render against the original string.
fn read_source(path: &str) -> Result<String, Failure> {
    std::fs::read_to_string(path).map_err(|e| Failure::Recoverable(format!("cannot read {}: {}", path, e)))
}

fn run_file(interpreter: &mut Interpreter, path: &str, ast_only: bool) -> Result<(), Failure> {
    let source = read_source(path)?;
    run_source(interpreter, &source, path, ast_only, false)
}

fn run_source(
    interpreter: &mut Interpreter,
    source: &str,
    filename: &str,
    ast_only: bool,
    print_result: bool,
) -> Result<(), Failure> {
    info!("running {} ({} bytes)", filename, source.len());
    let ast = parse(source, filename.to_string()).map_err(|e| Failure::Recoverable(e.render(source)))?;
    if ast_only {
        println!("{:#?}", ast);
        return Ok(());
    }
    match interpreter.eval(ast) {
        Ok(value) => {
            if print_result && !matches!(value, Value::Nil) {
                println!("{}", value);
            }
            Ok(())
        }
        Err(e) if matches!(e.details, MusiqueError::Interrupted) => Ok(()),
        Err(e) => Err(Failure::Recoverable(e.render(source))),
    }
}

/// Derives a parameterless function name from a path's filename stem, same
/// shape as the original's `filename_to_function_name`: non-identifier
/// characters become underscores.
fn filename_to_function_name(path: &str) -> String {
    let stem = std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("source");
    let mut name = String::new();
    for (i, ch) in stem.chars().enumerate() {
        let is_ident = if i == 0 {
            musique::unicode::is_identifier_start(ch)
        } else {
            musique::unicode::is_identifier_continuation(ch)
        };
        name.push(if is_ident { ch } else { '_' });
    }
    name
}

fn load_file(interpreter: &mut Interpreter, path: &str, ast_only: bool) -> Result<(), Failure> {
    let source = read_source(path)?;
    let ast = parse(&source, path.to_string()).map_err(|e| Failure::Recoverable(e.render(&source)))?;
    if ast_only {
        println!("{:#?}", ast);
        return Ok(());
    }
    let name = filename_to_function_name(path);
    let block = musique::value::block::Block {
        parameters: Vec::new(),
        location: ast.location.clone(),
        body: ast,
        context: interpreter.env.clone(),
    };
    println!("Defined function {} as file {}", name, path);
    interpreter.env.force_define(name, Value::Block(block));
    Ok(())
}

/// One entry per builtin documented in the standard library contract. Kept
/// in `main.rs` rather than `builtins.rs` since it is CLI presentation, not
/// interpreter behavior.
const BUILTIN_DOCS: &[(&str, &str)] = &[
    ("bpm", "bpm n — sets (or, with no args, reads) the context's beats-per-minute"),
    ("oct", "oct n — sets (or, with no args, reads) the context's default octave"),
    ("len", "len n — sets (or, with no args, reads) the context's default note length"),
    ("floor", "floor n — rounds a Number down towards negative infinity"),
    ("ceil", "ceil n — rounds a Number up towards positive infinity"),
    ("round", "round n — rounds a Number to the nearest integer, ties away from zero"),
    ("range", "range start stop step — an array of Numbers from start to stop exclusive"),
    ("up", "up n — range 0 n 1"),
    ("down", "down n — range n 0 -1"),
    ("nprimes", "nprimes n — an array of the first n prime numbers"),
    ("flat", "flat xs — flattens one level of nested collections"),
    ("sort", "sort xs — a new collection sorted ascending"),
    ("reverse", "reverse xs — a new collection in reverse order"),
    ("shuffle", "shuffle xs — a new collection in a random order"),
    ("permute", "permute xs — the next lexicographic permutation of xs, wrapping after the last"),
    ("pick", "pick xs — a uniformly random element of xs"),
    ("rotate", "rotate n xs — xs rotated left by n positions"),
    ("unique", "unique xs — xs with adjacent duplicates removed"),
    ("uniq", "uniq xs — xs with all duplicates removed, order preserved"),
    ("partition", "partition pred xs — two arrays: matches then non-matches"),
    ("min", "min xs — the smallest element of xs"),
    ("max", "max xs — the largest element of xs"),
    ("size", "size xs — the number of elements in xs"),
    ("update", "update xs i v — xs with index i replaced by v"),
    ("mix", "mix xs — layers several chords into one simultaneous chord"),
    ("digits", "digits n — an array of the decimal digits of n"),
    ("for", "for xs f — calls f once per element of xs for its side effects, yielding the last call's result"),
    ("map", "map f xs — a new collection of f applied to each element"),
    ("fold", "fold f init xs — left fold of xs with f, starting from init"),
    ("scan", "scan f xs — an inclusive prefix scan: same length as xs, each result after the first is f(previous, current)"),
    ("call", "call f xs — applies f to the elements of xs as separate arguments"),
    ("if", "if cond then else — evaluates then if cond is truthy, else otherwise"),
    ("while", "while cond body — evaluates body while cond is truthy"),
    ("try", "try f — evaluates f, converting a raised error into nil"),
    ("chord", "chord xs — builds a Chord value from an array of notes"),
    ("play", "play notes — plays notes sequentially on the connected MIDI port"),
    ("par", "par notes — sustains the first note while the rest play sequentially"),
    ("sim", "sim tracks... — plays several note sequences as parallel tracks"),
    ("program_change", "program_change chan program — sends a MIDI program change"),
    ("patch", "patch chan program — alias for program_change"),
    ("note_on", "note_on chan note vel — sends a raw MIDI note-on"),
    ("note_off", "note_off chan note vel — sends a raw MIDI note-off"),
    ("typeof", "typeof v — the name of v's runtime type as a Symbol"),
    ("hash", "hash v — a structural hash of v"),
    ("say", "say v... — prints its arguments separated by spaces, then a newline; returns the first argument"),
];

fn print_doc(name: &str) {
    match BUILTIN_DOCS.iter().find(|(n, _)| *n == name) {
        Some((_, doc)) => println!("{}", doc),
        None => println!("no documentation for '{}'", name),
    }
}

fn print_repl_help() {
    println!("REPL commands:");
    println!("  :exit, :quit     leave the REPL");
    println!("  :help            show this message");
    println!("  :clear           clear the screen");
    println!("  :load <file>     run a file in the current session");
    println!("  :ast             toggle printing the AST instead of evaluating");
}

/// Handles a `:`-prefixed REPL command. Returns whether `input` was one.
fn handle_repl_command(input: &str, interpreter: &mut Interpreter, ast_only: &mut bool) -> bool {
    let Some(rest) = input.strip_prefix(':') else {
        return false;
    };
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("");
    let arg = parts.next().map(str::trim);
    match command {
        "exit" | "quit" => std::process::exit(0),
        "clear" => print!("\x1b[1;1H\x1b[2J"),
        "help" => print_repl_help(),
        "ast" => {
            *ast_only = !*ast_only;
            println!("ast printing {}", if *ast_only { "on" } else { "off" });
        }
        "load" => match arg {
            Some(path) if !path.is_empty() => {
                if let Err(Failure::Recoverable(message)) = load_file(interpreter, path, *ast_only) {
                    eprintln!("{}", message);
                }
            }
            _ => eprintln!(":load requires a path to a file"),
        },
        other => eprintln!("unknown REPL command ':{}'", other),
    }
    io::stdout().flush().ok();
    true
}

fn repl(interpreter: &mut Interpreter, mut ast_only: bool) {
    println!("Musique REPL. Type :help for commands, :exit to leave.");
    let stdin = io::stdin();
    let mut line_number = 1usize;
    loop {
        print!("musique[{}]> ", line_number);
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("input error: {}", e);
                break;
            }
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }
        if handle_repl_command(trimmed, interpreter, &mut ast_only) {
            continue;
        }
        let filename = format!("<repl:{}>", line_number);
        if let Err(Failure::Recoverable(message)) = run_source(interpreter, trimmed, &filename, ast_only, true) {
            eprintln!("{}", message);
        }
        line_number += 1;
    }
}
