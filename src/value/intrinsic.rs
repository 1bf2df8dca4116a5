//! Host-implemented callables: an [`Intrinsic`] receives evaluated arguments.
//! Identity is by function pointer, matching
//! `original_source/musique/value/intrinsic.hh`.

use super::Value;
use crate::error::Result;
use crate::interpreter::Interpreter;

pub type Intrinsic_Fn = fn(&mut Interpreter, Vec<Value>) -> Result<Value>;

#[derive(Debug, Clone, Copy)]
pub struct Intrinsic {
    pub name: &'static str,
    pub function: Intrinsic_Fn,
}

impl PartialEq for Intrinsic {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.function as *const (), other.function as *const ())
    }
}
impl Eq for Intrinsic {}

impl std::hash::Hash for Intrinsic {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.function as usize).hash(state);
    }
}

impl Intrinsic {
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
        (self.function)(interpreter, args)
    }
}
