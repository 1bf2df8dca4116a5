//! The tree-walking evaluator: a single-threaded `eval` over [`Ast`] nodes,
//! a global operator table, and the `play`/`sim` scheduler's note-on/note-off
//! bookkeeping. Ported from `original_source/musique/interpreter/interpreter.cc`.

use crate::ast::{Ast, Ast_Type};
use crate::builtins;
use crate::context::Context;
use crate::env::Env;
use crate::error::{Error, MusiqueError, Result};
use crate::number::Number;
use crate::token::Token_Type;
use crate::unicode::{NOTE_LENGTH_SYMBOL_END, NOTE_LENGTH_SYMBOL_START, REST_LENGTH_SYMBOL_END, REST_LENGTH_SYMBOL_START};
use crate::value::array::Array;
use crate::value::intrinsic::{Intrinsic, Intrinsic_Fn};
use crate::value::{Chord, Note, Value};
use log::trace;
use rand::Rng;
use rand_core::SeedableRng;
use rand_pcg::Pcg64;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Registers `wn`/`hn`/`qn`/... and their Unicode musical-symbol-block
/// equivalents, per `register_note_length_constants` in the original.
fn register_note_length_constants(env: &Env) {
    let ascii: &[(&str, Number)] = &[
        ("wn", Number::new(1, 1)),
        ("fn", Number::new(1, 1)),
        ("dwn", Number::new(3, 2)),
        ("hn", Number::new(1, 2)),
        ("dhn", Number::new(3, 4)),
        ("ddhn", Number::new(7, 8)),
        ("qn", Number::new(1, 4)),
        ("dqn", Number::new(3, 8)),
        ("ddqn", Number::new(7, 16)),
        ("en", Number::new(1, 8)),
        ("den", Number::new(3, 16)),
        ("dden", Number::new(7, 32)),
        ("sn", Number::new(1, 16)),
        ("dsn", Number::new(3, 32)),
        ("tn", Number::new(1, 32)),
        ("dtn", Number::new(3, 64)),
    ];
    for (name, value) in ascii {
        env.force_define(*name, Value::Number(*value));
    }

    let mut pow2: i64 = 1;
    for rune in NOTE_LENGTH_SYMBOL_START..=NOTE_LENGTH_SYMBOL_END {
        if let Some(ch) = char::from_u32(rune) {
            env.force_define(ch.to_string(), Value::Number(Number::new(1, pow2)));
        }
        pow2 *= 2;
    }

    let mut pow2: i64 = 1;
    for rune in REST_LENGTH_SYMBOL_START..=REST_LENGTH_SYMBOL_END {
        if let Some(ch) = char::from_u32(rune) {
            env.force_define(
                ch.to_string(),
                Value::Chord(Chord::single(Note::new(None, None, Some(Number::new(1, pow2))))),
            );
        }
        pow2 *= 2;
    }
}

fn wrong_arity(name: &str, expected: usize, actual: usize) -> Error {
    MusiqueError::Wrong_Arity_Of {
        name: name.into(),
        expected,
        actual,
    }
    .into()
}

fn pair(mut args: Vec<Value>, name: &str) -> Result<(Value, Value)> {
    if args.len() != 2 {
        return Err(wrong_arity(name, 2, args.len()));
    }
    let rhs = args.pop().unwrap();
    let lhs = args.pop().unwrap();
    Ok((lhs, rhs))
}

fn unsupported(op: &str, possibilities: Vec<&'static str>) -> Error {
    MusiqueError::Unsupported_Types_For {
        operator_or_function: "operator",
        name: op.into(),
        possibilities,
    }
    .into()
}

fn number_to_index(n: Number) -> Result<usize> {
    let i = n.as_int();
    if i < 0 {
        return Err(MusiqueError::Out_Of_Range {
            required_index: 0,
            size: 0,
        }
        .into());
    }
    Ok(i as usize)
}

fn op_add(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "+")?;
    interp.plus_minus_pair("+", lhs, rhs)
}
fn op_sub(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "-")?;
    interp.plus_minus_pair("-", lhs, rhs)
}
fn op_mul(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "*")?;
    interp.multiplication_pair(lhs, rhs)
}
fn op_div(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "/")?;
    interp.numeric_binary_pair("/", lhs, rhs, |a, b| a.checked_div(b))
}
fn op_rem(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "%")?;
    interp.numeric_binary_pair("%", lhs, rhs, |a, b| a.checked_rem(b))
}
fn op_pow(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "**")?;
    interp.numeric_binary_pair("**", lhs, rhs, |a, b| a.pow(b))
}
fn op_lt(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "<")?;
    interp.comparison_pair("<", lhs, rhs, |o| o == Ordering::Less)
}
fn op_gt(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, ">")?;
    interp.comparison_pair(">", lhs, rhs, |o| o == Ordering::Greater)
}
fn op_le(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "<=")?;
    interp.comparison_pair("<=", lhs, rhs, |o| o != Ordering::Greater)
}
fn op_ge(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, ">=")?;
    interp.comparison_pair(">=", lhs, rhs, |o| o != Ordering::Less)
}
fn op_eq(args: Vec<Value>, interp_name: &str) -> Result<Value> {
    let (lhs, rhs) = pair(args, interp_name)?;
    Ok(Value::Bool(lhs == rhs))
}
fn op_eq_eq(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    op_eq(args, "==")
}
fn op_ne(_interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "!=")?;
    Ok(Value::Bool(lhs != rhs))
}
fn op_index(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, ".")?;
    interp.index_pair(lhs, rhs)
}
fn op_amp(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
    let (lhs, rhs) = pair(args, "&")?;
    interp.ampersand_pair(lhs, rhs)
}

fn build_operators() -> HashMap<&'static str, Intrinsic> {
    let mut map = HashMap::new();
    let entries: &[(&'static str, Intrinsic_Fn)] = &[
        ("+", op_add),
        ("-", op_sub),
        ("*", op_mul),
        ("/", op_div),
        ("%", op_rem),
        ("**", op_pow),
        ("<", op_lt),
        (">", op_gt),
        ("<=", op_le),
        (">=", op_ge),
        ("==", op_eq_eq),
        ("!=", op_ne),
        (".", op_index),
        ("&", op_amp),
    ];
    for (name, function) in entries {
        map.insert(*name, Intrinsic { name, function: *function });
    }
    map
}

/// The single-threaded tree-walking evaluator.
pub struct Interpreter {
    pub env: Env,
    pub context: Context,
    pub rng: Pcg64,
    /// Installed by `play` for the duration of its walk so that nested
    /// Sequence evaluation also sounds its intermediate values.
    pub default_action: Option<Intrinsic_Fn>,
    /// (channel, midi note) pairs with an outstanding note-on, mirrored so
    /// an interrupt or teardown can send the matching note-offs.
    pub active_notes: Vec<(u8, u8)>,
    operators: HashMap<&'static str, Intrinsic>,
    interrupt: Arc<(Mutex<bool>, Condvar)>,
}

impl Interpreter {
    pub fn new() -> Self {
        let env = Env::global();
        register_note_length_constants(&env);
        let seed: u64 = rand::thread_rng().gen();
        let mut interp = Interpreter {
            env,
            context: Context::default(),
            rng: Pcg64::seed_from_u64(seed),
            default_action: None,
            active_notes: Vec::new(),
            operators: build_operators(),
            interrupt: Arc::new((Mutex::new(false), Condvar::new())),
        };
        builtins::register(&interp.env);
        interp
    }

    /// A handle other threads can use to request an interrupt (e.g. a REPL
    /// listening for Ctrl-C while a `play` call is sleeping).
    pub fn interrupt_handle(&self) -> Arc<(Mutex<bool>, Condvar)> {
        self.interrupt.clone()
    }

    pub fn issue_interrupt(&self) {
        let (lock, condvar) = &*self.interrupt;
        *lock.lock().unwrap() = true;
        condvar.notify_all();
    }

    fn check_interrupted(&self) -> Result<()> {
        let (lock, _) = &*self.interrupt;
        let mut flag = lock.lock().unwrap();
        if *flag {
            *flag = false;
            return Err(MusiqueError::Interrupted.into());
        }
        Ok(())
    }

    /// Sleeps up to `duration`, waking early (and clearing the flag) if
    /// interrupted. Mirrors `Interpreter::sleep`'s condvar wait.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let (lock, condvar) = &*self.interrupt;
        let guard = lock.lock().unwrap();
        if *guard {
            return Err(MusiqueError::Interrupted.into());
        }
        let (mut guard, _timeout) = condvar.wait_timeout(guard, duration).unwrap();
        if *guard {
            *guard = false;
            return Err(MusiqueError::Interrupted.into());
        }
        Ok(())
    }

    pub fn apply_operator(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let intrinsic = *self
            .operators
            .get(name)
            .ok_or_else(|| -> Error { MusiqueError::Undefined_Operator { name: name.into() }.into() })?;
        intrinsic.call(self, args)
    }

    pub fn eval(&mut self, ast: Ast) -> Result<Value> {
        self.check_interrupted()?;
        match ast.r#type {
            Ast_Type::Literal => self.eval_literal(ast),
            Ast_Type::Unary => self.eval_unary(ast),
            Ast_Type::Binary => self.eval_binary(ast),
            Ast_Type::Call => self.eval_call(ast),
            Ast_Type::Sequence => self.eval_sequence(ast),
            Ast_Type::Block => self.eval_block_literal(ast),
            Ast_Type::Lambda => self.eval_lambda_literal(ast),
            Ast_Type::Variable_Declaration => self.eval_variable_declaration(ast),
            Ast_Type::If => self.eval_if(ast),
        }
    }

    /// Evaluates `ast` with `env` temporarily substituted for the current
    /// environment, restoring it on the way out. Depended on by
    /// `value::Block::index`/`call`.
    pub fn eval_in(&mut self, env: Env, ast: Ast) -> Result<Value> {
        let previous = std::mem::replace(&mut self.env, env);
        let result = self.eval(ast);
        self.env = previous;
        result
    }

    fn eval_literal(&mut self, ast: Ast) -> Result<Value> {
        match ast.token.r#type {
            Token_Type::Numeric => Ok(Value::Number(crate::number::parse(&ast.token.source)?)),
            Token_Type::Chord => {
                let note = Note::from_source(&ast.token.source).ok_or_else(|| -> Error {
                    MusiqueError::Failed_Numeric_Parsing {
                        source: ast.token.source.clone(),
                    }
                    .into()
                })?;
                Ok(Value::Chord(Chord::single(note)))
            }
            Token_Type::Keyword if ast.token.source == "true" => Ok(Value::Bool(true)),
            Token_Type::Keyword if ast.token.source == "false" => Ok(Value::Bool(false)),
            Token_Type::Keyword if ast.token.source == "nil" => Ok(Value::Nil),
            Token_Type::Symbol if ast.token.source.starts_with('\'') => {
                let name = &ast.token.source[1..];
                if let Some(op) = self.operators.get(name) {
                    Ok(Value::Intrinsic(*op))
                } else {
                    Ok(Value::Symbol(name.to_string()))
                }
            }
            Token_Type::Symbol | Token_Type::Keyword => self
                .env
                .find(&ast.token.source)
                .ok_or_else(|| -> Error {
                    MusiqueError::Missing_Variable {
                        name: ast.token.source.clone(),
                    }
                    .into()
                }),
            _ => Err(MusiqueError::Unexpected_Token {
                found: ast.token.source.clone(),
            }
            .into()),
        }
    }

    fn eval_unary(&mut self, ast: Ast) -> Result<Value> {
        let mut args = ast.arguments.into_iter();
        let operand = self.eval(args.next().unwrap())?;
        let result = match ast.token.source.as_str() {
            "-" => self.negate(operand),
            "+" => self.identity(operand),
            other => Err(MusiqueError::Undefined_Operator { name: other.into() }.into()),
        };
        result.map_err(|e| e.with(ast.location))
    }

    fn negate(&mut self, value: Value) -> Result<Value> {
        match value {
            Value::Number(n) => Ok(Value::Number(-n)),
            other if other.is_collection() => {
                let size = other.collection_size().unwrap();
                let mut out = Vec::with_capacity(size);
                for i in 0..size {
                    let elem = other.collection_index(self, i).unwrap()?;
                    out.push(self.negate(elem)?);
                }
                Ok(Value::Array(Array::new(out)))
            }
            _ => Err(unsupported("-", vec!["number", "collection of numbers"])),
        }
    }

    fn identity(&mut self, value: Value) -> Result<Value> {
        match &value {
            Value::Number(_) => Ok(value),
            other if other.is_collection() => Ok(value),
            _ => Err(unsupported("+", vec!["number", "collection of numbers"])),
        }
    }

    fn eval_sequence(&mut self, ast: Ast) -> Result<Value> {
        let n = ast.arguments.len();
        let mut result = Value::Nil;
        for (i, child) in ast.arguments.into_iter().enumerate() {
            result = self.eval(child)?;
            if i + 1 < n {
                if let Some(action) = self.default_action {
                    action(self, vec![result.clone()])?;
                }
            }
        }
        Ok(result)
    }

    fn eval_block_literal(&mut self, ast: Ast) -> Result<Value> {
        let location = ast.location.clone();
        let body = ast.arguments.into_iter().next().unwrap();
        Ok(Value::Block(crate::value::Block {
            parameters: Vec::new(),
            body,
            context: self.env.clone(),
            location,
        }))
    }

    fn eval_lambda_literal(&mut self, ast: Ast) -> Result<Value> {
        let location = ast.location.clone();
        let parameters: Vec<String> = ast.lambda_parameters().iter().map(|p| p.token.source.clone()).collect();
        let body = ast.body().clone();
        Ok(Value::Block(crate::value::Block {
            parameters,
            body,
            context: self.env.clone(),
            location,
        }))
    }

    fn eval_variable_declaration(&mut self, ast: Ast) -> Result<Value> {
        let name = ast.token.source.clone();
        let value = self.eval(ast.arguments.into_iter().next().unwrap())?;
        self.env.force_define(name, value.clone());
        Ok(value)
    }

    fn eval_if(&mut self, ast: Ast) -> Result<Value> {
        let mut args = ast.arguments.into_iter();
        let condition = self.eval(args.next().unwrap())?;
        let then_branch = args.next().unwrap();
        let else_branch = args.next();
        if condition.truthy() {
            self.eval_branch(then_branch)
        } else if let Some(branch) = else_branch {
            self.eval_branch(branch)
        } else {
            Ok(Value::Nil)
        }
    }

    /// A Block branch descends directly into its body, running in the
    /// current scope rather than pushing a child one.
    fn eval_branch(&mut self, branch: Ast) -> Result<Value> {
        if branch.r#type == Ast_Type::Block {
            self.eval(branch.arguments.into_iter().next().unwrap())
        } else {
            self.eval(branch)
        }
    }

    fn eval_call(&mut self, ast: Ast) -> Result<Value> {
        let location = ast.location.clone();
        let mut args = ast.arguments.into_iter();
        let head_ast = args.next().unwrap();
        let head_location = head_ast.location.clone();
        let rest: Vec<Ast> = args.collect();

        let head = self.eval(head_ast).map_err(|e| e.with(head_location))?;

        let mut values = Vec::with_capacity(rest.len());
        for arg in rest {
            let arg_location = arg.location.clone();
            values.push(self.eval(arg).map_err(|e| e.with(arg_location))?);
        }
        head.call(self, values).map_err(|e| e.with(location))
    }

    fn eval_binary(&mut self, ast: Ast) -> Result<Value> {
        let op = ast.token.source.clone();
        let location = ast.location.clone();
        let mut args = ast.arguments.into_iter();
        let lhs_ast = args.next().unwrap();
        let rhs_ast = args.next().unwrap();

        if op == "=" {
            return self.eval_assignment(lhs_ast, rhs_ast, None).map_err(|e| e.with(location));
        }
        if op == "and" || op == "or" {
            let lhs = self.eval(lhs_ast)?;
            let short_circuits = if op == "or" { lhs.truthy() } else { lhs.falsy() };
            if short_circuits {
                return Ok(lhs);
            }
            return self.eval(rhs_ast);
        }

        if self.operators.contains_key(op.as_str()) {
            let lhs = self.eval(lhs_ast)?;
            let rhs = self.eval(rhs_ast)?;
            return self.apply_operator(&op, vec![lhs, rhs]).map_err(|e| e.with(location));
        }

        if let Some(base) = op.strip_suffix('=') {
            if self.operators.contains_key(base) {
                let base = base.to_string();
                return self
                    .eval_assignment(lhs_ast, rhs_ast, Some(base))
                    .map_err(|e| e.with(location));
            }
        }

        Err(MusiqueError::Undefined_Operator { name: op }.into()).map_err(|e: Error| e.with(location))
    }

    fn eval_assignment(&mut self, lvalue: Ast, rhs: Ast, compound_base: Option<String>) -> Result<Value> {
        if lvalue.r#type != Ast_Type::Literal || lvalue.token.r#type != Token_Type::Symbol {
            return Err(unsupported("=", vec!["(identifier, value)"]));
        }
        let name = lvalue.token.source.clone();
        let rhs_value = self.eval(rhs)?;

        let new_value = match compound_base {
            Some(base) => {
                let current = self
                    .env
                    .find(&name)
                    .ok_or_else(|| -> Error { MusiqueError::Missing_Variable { name: name.clone() }.into() })?;
                self.apply_operator(&base, vec![current, rhs_value])?
            }
            None => rhs_value,
        };

        if !self.env.assign(&name, new_value.clone()) {
            return Err(MusiqueError::Missing_Variable { name }.into());
        }
        Ok(new_value)
    }

    fn vectorize_binary(
        &mut self,
        lhs: Value,
        rhs: Value,
        f: &dyn Fn(&mut Interpreter, Value, Value) -> Result<Value>,
    ) -> Result<Value> {
        let lhs_size = lhs.collection_size();
        let rhs_size = rhs.collection_size();
        match (lhs_size, rhs_size) {
            (Some(size), None) => {
                let mut out = Vec::with_capacity(size);
                for i in 0..size {
                    let l = lhs.collection_index(self, i).unwrap()?;
                    out.push(f(self, l, rhs.clone())?);
                }
                Ok(Value::Array(Array::new(out)))
            }
            (None, Some(size)) => {
                let mut out = Vec::with_capacity(size);
                for i in 0..size {
                    let r = rhs.collection_index(self, i).unwrap()?;
                    out.push(f(self, lhs.clone(), r)?);
                }
                Ok(Value::Array(Array::new(out)))
            }
            (Some(ls), Some(rs)) => {
                if ls != rs {
                    return Err(unsupported("vectorized", vec!["collections of equal size"]));
                }
                let mut out = Vec::with_capacity(ls);
                for i in 0..ls {
                    let l = lhs.collection_index(self, i).unwrap()?;
                    let r = rhs.collection_index(self, i).unwrap()?;
                    out.push(f(self, l, r)?);
                }
                Ok(Value::Array(Array::new(out)))
            }
            (None, None) => unreachable!("scalar/scalar handled by caller"),
        }
    }

    fn plus_minus_pair(&mut self, op: &str, lhs: Value, rhs: Value) -> Result<Value> {
        match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(if op == "+" { *a + *b } else { *a - *b })),
            (Value::Chord(c), Value::Number(n)) => {
                let delta = if op == "+" { n.as_int() } else { -n.as_int() };
                let mut chord = c.clone();
                for note in &mut chord.notes {
                    if let Some(base) = note.base {
                        note.base = Some(base + delta as i32);
                        note.simplify_inplace();
                    }
                }
                Ok(Value::Chord(chord))
            }
            _ if lhs.is_collection() || rhs.is_collection() => {
                let op = op.to_string();
                self.vectorize_binary(lhs, rhs, &move |i, l, r| i.plus_minus_pair(&op, l, r))
            }
            _ => Err(unsupported(op, vec!["(number, number)", "(music, number)", "(collection, scalar)"])),
        }
    }

    fn multiplication_pair(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(*a * *b)),
            (Value::Number(n), Value::Chord(c)) | (Value::Chord(c), Value::Number(n)) => {
                let count = number_to_index(*n)?;
                let repeated = (0..count).map(|_| Value::Chord(c.clone())).collect();
                Ok(Value::Array(Array::new(repeated)))
            }
            _ if lhs.is_collection() || rhs.is_collection() => {
                self.vectorize_binary(lhs, rhs, &|i, l, r| i.multiplication_pair(l, r))
            }
            _ => Err(unsupported("*", vec!["(number, number)", "(number, music)", "(collection, scalar)"])),
        }
    }

    fn numeric_binary_pair(
        &mut self,
        name: &str,
        lhs: Value,
        rhs: Value,
        f: fn(Number, Number) -> Result<Number>,
    ) -> Result<Value> {
        match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b)?)),
            _ if lhs.is_collection() || rhs.is_collection() => {
                let name = name.to_string();
                self.vectorize_binary(lhs, rhs, &move |i, l, r| i.numeric_binary_pair(&name, l, r, f))
            }
            _ => Err(unsupported(name, vec!["(number, number)", "(collection, scalar)"])),
        }
    }

    fn comparison_pair(&mut self, name: &str, lhs: Value, rhs: Value, pred: fn(Ordering) -> bool) -> Result<Value> {
        if lhs.is_collection() || rhs.is_collection() {
            let name = name.to_string();
            return self.vectorize_binary(lhs, rhs, &move |i, l, r| i.comparison_pair(&name, l, r, pred));
        }
        match lhs.partial_cmp(&rhs) {
            Some(ordering) => Ok(Value::Bool(pred(ordering))),
            None => Err(unsupported(name, vec!["comparable same-type values"])),
        }
    }

    fn index_pair(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        if !lhs.is_collection() {
            return Err(unsupported(".", vec!["(collection, number)", "(collection, bool)", "(collection, collection of indices)"]));
        }
        match rhs {
            Value::Number(n) => {
                let index = number_to_index(n)?;
                lhs.index(self, index)
            }
            Value::Bool(b) => lhs.index(self, if b { 1 } else { 0 }),
            other if other.is_collection() => {
                let size = other.collection_size().unwrap();
                let mut out = Vec::with_capacity(size);
                for i in 0..size {
                    let index_value = other.collection_index(self, i).unwrap()?;
                    out.push(self.index_pair(lhs.clone(), index_value)?);
                }
                Ok(Value::Array(Array::new(out)))
            }
            _ => Err(unsupported(".", vec!["(collection, number)", "(collection, bool)", "(collection, collection of indices)"])),
        }
    }

    fn ampersand_pair(&mut self, lhs: Value, rhs: Value) -> Result<Value> {
        match (lhs, rhs) {
            (Value::Chord(mut a), Value::Chord(b)) => {
                if a.notes.len() >= b.notes.len() {
                    a.notes.extend(b.notes);
                    Ok(Value::Chord(a))
                } else {
                    let mut b = b;
                    b.notes.extend(a.notes);
                    Ok(Value::Chord(b))
                }
            }
            (l, r) if l.is_collection() && r.is_collection() => {
                let mut out = Vec::new();
                for i in 0..l.collection_size().unwrap() {
                    out.push(l.collection_index(self, i).unwrap()?);
                }
                for i in 0..r.collection_size().unwrap() {
                    out.push(r.collection_index(self, i).unwrap()?);
                }
                Ok(Value::Array(Array::new(out)))
            }
            _ => Err(unsupported("&", vec!["(music, music)", "(collection, collection)"])),
        }
    }

    /// Ensures a MIDI output connection is available, per §6's contract.
    pub fn require_port(&self, operation: &str) -> Result<Rc<std::cell::RefCell<dyn crate::midi::MidiPort>>> {
        self.context.port.clone().ok_or_else(|| -> Error {
            MusiqueError::Operation_Requires_Midi_Connection {
                is_input: false,
                name: Some(operation.to_string()),
            }
            .into()
        })
    }

    /// The chord-playing procedure: fill from context, sort ascending by
    /// length, sound every voiced note, then release each at its length
    /// boundary. Empty chords simply sleep one context length.
    pub fn play_chord(&mut self, chord: &Chord) -> Result<()> {
        self.check_interrupted()?;
        if chord.notes.is_empty() {
            return self.sleep(self.context.length_to_duration(self.context.length));
        }

        let port = self.require_port("play")?;
        let mut notes: Vec<Note> = chord.notes.iter().map(|n| self.context.fill(n)).collect();
        notes.sort_by(|a, b| a.length.unwrap().cmp(&b.length.unwrap()));

        let channel = 0u8;
        for note in &notes {
            if let Some(midi) = note.into_midi_note(self.context.octave) {
                trace!("note on chan={} note={}", channel, midi);
                port.borrow_mut().send_note_on(channel, midi as u8, 127);
                self.active_notes.push((channel, midi as u8));
            }
        }

        let mut elapsed = Number::integer(0);
        for note in &notes {
            let length = note.length.unwrap();
            let wait = length - elapsed;
            if wait != Number::integer(0) {
                self.sleep(self.context.length_to_duration(wait))?;
            }
            elapsed = length;
            if let Some(midi) = note.into_midi_note(self.context.octave) {
                trace!("note off chan={} note={}", channel, midi);
                port.borrow_mut().send_note_off(channel, midi as u8, 127);
                self.active_notes.retain(|&(c, n)| !(c == channel && n == midi as u8));
            }
        }
        Ok(())
    }

    /// Sends note-off for every still-sounding note and forgets it. Invoked
    /// on interrupt and at interpreter teardown.
    pub fn turn_off_all_active_notes(&mut self) {
        if !self.active_notes.is_empty() {
            trace!("tearing down {} active notes", self.active_notes.len());
        }
        if let Some(port) = self.context.port.clone() {
            for (channel, note) in self.active_notes.drain(..) {
                port.borrow_mut().send_note_off(channel, note, 0);
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
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
    fn arithmetic_precedence() {
        assert_eq!(run("1 + 2 * 3").unwrap(), Value::Number(Number::integer(7)));
    }

    #[test]
    fn variable_declaration_and_assignment() {
        assert_eq!(run("x := 1\nx = x + 1\nx").unwrap(), Value::Number(Number::integer(2)));
    }

    #[test]
    fn compound_assignment_uses_base_operator() {
        assert_eq!(run("x := 5\nx += 3\nx").unwrap(), Value::Number(Number::integer(8)));
    }

    #[test]
    fn assigning_undefined_variable_errors() {
        assert!(run("x = 1").is_err());
    }

    #[test]
    fn and_or_short_circuit() {
        assert_eq!(run("false and (1/0)").unwrap(), Value::Bool(false));
        assert_eq!(run("true or (1/0)").unwrap(), Value::Bool(true));
    }

    #[test]
    fn lambda_application() {
        assert_eq!(run("(i | i + 1) 3").unwrap(), Value::Number(Number::integer(4)));
    }

    #[test]
    fn if_with_block_branches() {
        assert_eq!(run("if true (1) (2)").unwrap(), Value::Number(Number::integer(1)));
        assert_eq!(run("if false (1) (2)").unwrap(), Value::Number(Number::integer(2)));
    }

    #[test]
    fn vectorized_addition_over_array() {
        let v = run("(1, 2, 3) + 1").unwrap();
        match v {
            Value::Array(a) => assert_eq!(
                a.elements,
                vec![
                    Value::Number(Number::integer(2)),
                    Value::Number(Number::integer(3)),
                    Value::Number(Number::integer(4)),
                ]
            ),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn note_length_constants_are_registered() {
        assert_eq!(run("qn").unwrap(), Value::Number(Number::new(1, 4)));
    }

    #[test]
    fn chord_shift_by_semitone() {
        let v = run("c4 + 1").unwrap();
        match v {
            Value::Chord(c) => assert_eq!(c.notes[0].base, Some(1)),
            other => panic!("expected chord, got {other:?}"),
        }
    }

    #[test]
    fn quoted_symbol_yields_operator_or_bare_symbol() {
        assert!(matches!(run("'+").unwrap(), Value::Intrinsic(_)));
        assert_eq!(run("'foo").unwrap(), Value::Symbol("foo".to_string()));
    }

    #[test]
    fn missing_variable_errors() {
        assert!(run("undefined_name").is_err());
    }
}
