//! # Musique
//!
//! An interactive, domain-specific language for algorithmic music
//! composition, live coding and ensemble performance. A program describes
//! musical values (notes, chords, lengths, octaves) and control over a MIDI
//! output stream; the interpreter evaluates it, issuing timed note-on/
//! note-off events to a MIDI port.
//!
//! ## Pipeline
//!
//! ```text
//! source → lexer → parser → evaluator (env + context + builtins) → MIDI port
//! ```
//!
//! 1. **Lexer** ([`lexer`]) — source text into a token stream
//! 2. **Parser** ([`parser`]) — tokens into an [`ast::Ast`] via precedence climbing
//! 3. **Evaluator** ([`interpreter`]) — a tree walk over the AST, consulting
//!    [`env`] for lexical scope and [`context`] for musical defaults, and
//!    dispatching into [`builtins`]
//! 4. **Value model** ([`value`]) — the polymorphic Nil/Bool/Number/Symbol/
//!    Chord/Array/Set/Block/Intrinsic union every expression evaluates to
//!
//! ## Quick start
//!
//! ```rust
//! use musique::parser::parse;
//! use musique::interpreter::Interpreter;
//!
//! let ast = parse("1 + 2 * 3", "inline").unwrap();
//! let value = Interpreter::new().eval(ast).unwrap();
//! assert_eq!(value.to_string(), "7");
//! ```
//!
//! ## Module structure
//!
//! - [`unicode`] — rune classification used by the lexer
//! - [`location`] — source file ranges
//! - [`token`] — lexer token types
//! - [`lexer`] — source text to token stream
//! - [`ast`] — AST node types
//! - [`parser`] — tokens to AST
//! - [`number`] — exact rational arithmetic
//! - [`value`] — the polymorphic value model (Note/Chord/Array/Set/Block/…)
//! - [`env`] — lexically nested name→value environments
//! - [`context`] — ambient octave/length/BPM defaults and the MIDI port handle
//! - [`error`] — the typed error taxonomy and pretty-printer
//! - [`interpreter`] — the tree-walking evaluator and scheduler
//! - [`builtins`] — the standard library registered into the global environment
//! - [`midi`] — the abstract MIDI output/input port contract
//! - [`random`] — deterministic uniform sampling and shuffling
//! - [`config`] — INI configuration file loading

pub mod unicode;
pub mod location;
pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod number;
pub mod value;
pub mod env;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod builtins;
pub mod midi;
pub mod random;
pub mod config;

pub use error::{Error, MusiqueError, Result};
pub use interpreter::Interpreter;
pub use parser::parse;
pub use value::Value;
