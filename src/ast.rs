//! # Abstract Syntax Tree (AST) Types
//!
//! An AST node is (type, file-range, token, children). Equality is
//! structural on (type, token lexeme, children) — captured environments and
//! other runtime state never enter the AST, so `#[derive(PartialEq)]` is
//! sufficient. Ported from `original_source/musique/ast.hh`, using the nine
//! node types the top-level specification lists (the legacy header's
//! `Ast::Type` omits `Unary`/`If`, which is a version-drift artifact — the
//! evaluator clearly needs both).

use crate::location::FileRange;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ast_Type {
    Literal,
    Unary,
    Binary,
    Call,
    Sequence,
    Block,
    Lambda,
    Variable_Declaration,
    If,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ast {
    pub r#type: Ast_Type,
    pub location: FileRange,
    pub token: Token,
    pub arguments: Vec<Ast>,
}

impl Ast {
    pub fn new(r#type: Ast_Type, location: FileRange, token: Token, arguments: Vec<Ast>) -> Self {
        Ast {
            r#type,
            location,
            token,
            arguments,
        }
    }

    pub fn literal(location: FileRange, token: Token) -> Self {
        Ast::new(Ast_Type::Literal, location, token, Vec::new())
    }

    pub fn unary(location: FileRange, token: Token, operand: Ast) -> Self {
        Ast::new(Ast_Type::Unary, location, token, vec![operand])
    }

    pub fn binary(location: FileRange, token: Token, lhs: Ast, rhs: Ast) -> Self {
        Ast::new(Ast_Type::Binary, location, token, vec![lhs, rhs])
    }

    pub fn call(location: FileRange, token: Token, arguments: Vec<Ast>) -> Self {
        Ast::new(Ast_Type::Call, location, token, arguments)
    }

    pub fn sequence(location: FileRange, token: Token, elements: Vec<Ast>) -> Self {
        Ast::new(Ast_Type::Sequence, location, token, elements)
    }

    pub fn block(location: FileRange, token: Token, body: Ast) -> Self {
        Ast::new(Ast_Type::Block, location, token, vec![body])
    }

    pub fn lambda(location: FileRange, token: Token, mut parameters: Vec<Ast>, body: Ast) -> Self {
        parameters.push(body);
        Ast::new(Ast_Type::Lambda, location, token, parameters)
    }

    pub fn variable_declaration(location: FileRange, token: Token, value: Ast) -> Self {
        Ast::new(Ast_Type::Variable_Declaration, location, token, vec![value])
    }

    pub fn if_expression(location: FileRange, token: Token, condition: Ast, then: Ast, r#else: Option<Ast>) -> Self {
        let mut arguments = vec![condition, then];
        if let Some(e) = r#else {
            arguments.push(e);
        }
        Ast::new(Ast_Type::If, location, token, arguments)
    }

    /// A Lambda's parameter identifiers (all children but the last, the body).
    pub fn lambda_parameters(&self) -> &[Ast] {
        debug_assert_eq!(self.r#type, Ast_Type::Lambda);
        &self.arguments[..self.arguments.len() - 1]
    }

    /// A Lambda's or Block's body (its last child).
    pub fn body(&self) -> &Ast {
        debug_assert!(matches!(self.r#type, Ast_Type::Lambda | Ast_Type::Block));
        self.arguments.last().expect("block/lambda always has a body")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token_Type;
    use std::rc::Rc;

    fn tok(src: &str) -> Token {
        Token::new(Token_Type::Symbol, src, 0)
    }

    fn range() -> FileRange {
        FileRange::new(Rc::from("t.mq"), 0, 1)
    }

    #[test]
    fn lambda_splits_parameters_from_body() {
        let p1 = Ast::literal(range(), tok("i"));
        let body = Ast::literal(range(), tok("i"));
        let lambda = Ast::lambda(range(), tok("lambda"), vec![p1.clone()], body.clone());
        assert_eq!(lambda.lambda_parameters(), &[p1]);
        assert_eq!(lambda.body(), &body);
    }

    #[test]
    fn structural_equality_ignores_nothing_but_shape() {
        let a = Ast::literal(range(), tok("x"));
        let b = Ast::literal(range(), tok("x"));
        assert_eq!(a, b);
        let c = Ast::literal(range(), tok("y"));
        assert_ne!(a, c);
    }
}
