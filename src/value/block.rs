//! First-class closures: a parameter list, a captured environment, and a
//! body AST. A zero-parameter Block also behaves as an indexable lazy
//! collection. Ported from `original_source/musique/value/block.hh`/`.cc`.

use super::Value;
use crate::ast::{Ast, Ast_Type};
use crate::env::Env;
use crate::error::{Error, MusiqueError, Result};
use crate::interpreter::Interpreter;
use crate::location::FileRange;

#[derive(Debug, Clone)]
pub struct Block {
    pub parameters: Vec<String>,
    pub body: Ast,
    pub context: Env,
    pub location: FileRange,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters && self.body == other.body && self.context.ptr_eq(&other.context)
    }
}

fn is_ast_collection(t: Ast_Type) -> bool {
    t == Ast_Type::Sequence
}

impl Block {
    pub fn is_collection(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn size(&self) -> usize {
        if is_ast_collection(self.body.r#type) {
            self.body.arguments.len()
        } else {
            1
        }
    }

    pub fn index(&self, interpreter: &mut Interpreter, position: usize) -> Result<Value> {
        if !self.parameters.is_empty() {
            return Err(MusiqueError::Not_Callable {
                type_name: "block",
            }
            .into());
        }
        if is_ast_collection(self.body.r#type) {
            let arg = self
                .body
                .arguments
                .get(position)
                .ok_or_else(|| {
                    Error::from(MusiqueError::Out_Of_Range {
                        required_index: position,
                        size: self.body.arguments.len(),
                    })
                })?
                .clone();
            interpreter.eval_in(self.context.clone(), arg)
        } else {
            if position != 0 {
                return Err(MusiqueError::Out_Of_Range {
                    required_index: position,
                    size: 1,
                }
                .into());
            }
            interpreter.eval_in(self.context.clone(), self.body.clone())
        }
    }

    pub fn call(&self, interpreter: &mut Interpreter, mut arguments: Vec<Value>) -> Result<Value> {
        if self.parameters.len() > arguments.len() {
            return Err(MusiqueError::Wrong_Arity_Of {
                name: "<block>".into(),
                expected: self.parameters.len(),
                actual: arguments.len(),
            }
            .into());
        }

        let call_scope = self.context.enter();
        for (name, value) in self.parameters.iter().zip(arguments.drain(..self.parameters.len())) {
            call_scope.force_define(name.clone(), value);
        }

        interpreter.eval_in(call_scope, self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, Token_Type};

    fn range() -> FileRange {
        FileRange::new(std::rc::Rc::from("t.mq"), 0, 1)
    }

    #[test]
    fn zero_parameter_block_is_a_collection_of_size_one_for_non_sequence_body() {
        let body = Ast::literal(range(), Token::new(Token_Type::Numeric, "1", 0));
        let block = Block {
            parameters: vec![],
            body,
            context: Env::global(),
            location: range(),
        };
        assert!(block.is_collection());
        assert_eq!(block.size(), 1);
    }
}
