//! Tokens → AST: a single-pass recursive-descent parser with Pratt-style
//! precedence climbing for infix operators, layered on top of dedicated
//! productions for indexing, calls and blocks/lambdas.
//!
//! Ported from `original_source/musique/parser/parser.cc`'s `Parser`
//! (`token_id`/`tokens` cursor, `expect`/`consume`, `parse_rhs_of_infix`'s
//! fold-by-precedence shape) — the legacy file leaves several productions
//! `unimplemented()` (block/lambda parsing, unary prefix), so those are
//! written fresh from §4.2 of the top-level specification instead of ported.

use crate::ast::{Ast, Ast_Type};
use crate::error::{Error, MusiqueError, Result};
use crate::lexer::Lexer;
use crate::location::FileRange;
use crate::token::{Token, Token_Type};
use log::debug;
use std::rc::Rc;

/// Binding power of each infix operator; lower binds looser. Operators not
/// listed here (including compound-assignment forms like `+=`) have no
/// defined precedence — matching §4.2, they only parse when they appear as
/// the sole operator of an infix chain (so `i += 2` still parses even though
/// `+=` has no table entry, since precedence is only consulted when folding
/// a *second* operator in the same chain).
fn precedence(op: &str) -> Option<i32> {
    match op {
        ":=" => Some(0),
        "=" => Some(10),
        "or" => Some(100),
        "and" => Some(150),
        "<" | ">" | "<=" | ">=" | "==" | "!=" => Some(200),
        "+" | "-" => Some(300),
        "*" | "/" | "%" | "&" => Some(400),
        "**" => Some(500),
        _ => None,
    }
}

/// Parses Musique source into a top-level Sequence AST.
pub fn parse(source: &str, filename: impl Into<Rc<str>>) -> Result<Ast> {
    let filename = filename.into();
    let tokens = Lexer::new(filename.clone(), source).tokenize()?;
    debug!("parsing {} ({} tokens)", filename, tokens.len());
    let mut parser = Parser {
        filename,
        tokens,
        pos: 0,
    };
    let sequence = parser.parse_sequence()?;

    if parser.pos < parser.tokens.len() {
        let tok = parser.tokens[parser.pos].clone();
        let loc = parser.range_of(&tok);
        if tok.r#type == Token_Type::Close_Paren || tok.r#type == Token_Type::Close_Bracket {
            return Err(parser.err_at(loc, MusiqueError::Closing_Token_Without_Opening { token: tok.source }));
        }
        return Err(parser.err_at(loc, MusiqueError::Unexpected_Token { found: tok.source }));
    }

    Ok(sequence)
}

struct Parser {
    filename: Rc<str>,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn range_of(&self, token: &Token) -> FileRange {
        token.range(self.filename.clone())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect(&self, t: Token_Type) -> bool {
        self.peek().map(|tok| tok.r#type == t).unwrap_or(false)
    }

    fn expect_lexeme(&self, t: Token_Type, lexeme: &str) -> bool {
        self.peek()
            .map(|tok| tok.r#type == t && tok.source == lexeme)
            .unwrap_or(false)
    }

    fn expect_at_lexeme(&self, offset: usize, t: Token_Type, lexeme: &str) -> bool {
        self.tokens
            .get(self.pos + offset)
            .map(|tok| tok.r#type == t && tok.source == lexeme)
            .unwrap_or(false)
    }

    fn consume(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn err_here(&self, details: MusiqueError) -> Error {
        let range = match self.peek() {
            Some(tok) => self.range_of(tok),
            None => self
                .tokens
                .last()
                .map(|t| self.range_of(t))
                .unwrap_or_else(|| FileRange::new(self.filename.clone(), 0, 0)),
        };
        Error::new(details).with(range)
    }

    fn err_at(&self, location: FileRange, details: MusiqueError) -> Error {
        Error::new(details).with(location)
    }

    fn is_infix_operator_start(&self) -> bool {
        self.expect(Token_Type::Operator)
            || self.expect_lexeme(Token_Type::Keyword, "and")
            || self.expect_lexeme(Token_Type::Keyword, "or")
    }

    /// Whether the current token can start an atom juxtaposed as a call
    /// argument — everything atom-shaped except `and`/`or`, which the
    /// enclosing infix loop must be left free to claim as operators.
    fn can_start_juxtaposed_atom(&self) -> bool {
        match self.peek() {
            Some(tok) => match tok.r#type {
                Token_Type::Symbol | Token_Type::Chord | Token_Type::Numeric => true,
                Token_Type::Keyword => tok.source != "and" && tok.source != "or",
                _ => false,
            },
            None => false,
        }
    }

    // ---- Sequences -----------------------------------------------------

    fn is_separator(&self) -> bool {
        self.expect(Token_Type::Comma) || self.expect(Token_Type::Newline)
    }

    fn skip_separators(&mut self) {
        while self.is_separator() {
            self.consume();
        }
    }

    fn parse_sequence(&mut self) -> Result<Ast> {
        self.skip_separators();

        let start = self
            .peek()
            .map(|t| self.range_of(t))
            .unwrap_or_else(|| FileRange::new(self.filename.clone(), 0, 0));

        let mut elements = Vec::new();
        if self.at_end() || self.expect(Token_Type::Close_Paren) || self.expect(Token_Type::Close_Bracket) {
            return Ok(Ast::sequence(start.clone(), synthetic_token(&start), elements));
        }

        loop {
            let expr = self.parse_expression()?;
            elements.push(expr);

            if !self.is_separator() {
                break;
            }
            self.skip_separators();
            if self.at_end() || self.expect(Token_Type::Close_Paren) || self.expect(Token_Type::Close_Bracket) {
                break;
            }
        }

        let end = elements
            .last()
            .map(|a| a.location.clone())
            .unwrap_or_else(|| start.clone());
        Ok(Ast::sequence(start.join(&end), synthetic_token(&start), elements))
    }

    /// Parses `( ... sequence ... )`, already past the opening paren, and
    /// consumes the matching close paren.
    fn parse_sequence_inside_parens(&mut self, start_loc: FileRange) -> Result<Ast> {
        let inner = self.parse_sequence()?;
        if !self.expect(Token_Type::Close_Paren) {
            return Err(self.err_at(start_loc, MusiqueError::Unexpected_Empty_Source));
        }
        self.consume();
        Ok(inner)
    }

    fn parse_sequence_inside_brackets(&mut self, start_loc: FileRange) -> Result<Ast> {
        let inner = self.parse_sequence()?;
        if !self.expect(Token_Type::Close_Bracket) {
            return Err(self.err_at(start_loc, MusiqueError::Unexpected_Empty_Source));
        }
        self.consume();
        Ok(inner)
    }

    // ---- Expressions -----------------------------------------------------

    fn parse_expression(&mut self) -> Result<Ast> {
        if self.expect(Token_Type::Symbol) && self.expect_at_lexeme(1, Token_Type::Operator, "=") {
            return self.parse_assignment();
        }
        if self.expect(Token_Type::Symbol) && self.expect_at_lexeme(1, Token_Type::Operator, ":=") {
            return self.parse_variable_declaration();
        }
        self.parse_infix()
    }

    fn parse_assignment(&mut self) -> Result<Ast> {
        let name = self.consume();
        let name_loc = self.range_of(&name);
        let lvalue = Ast::literal(name_loc.clone(), name);
        let eq = self.consume();
        let rhs = self.parse_expression()?;
        let loc = name_loc.join(&rhs.location);
        Ok(Ast::binary(loc, eq, lvalue, rhs))
    }

    fn parse_variable_declaration(&mut self) -> Result<Ast> {
        let name = self.consume();
        let name_loc = self.range_of(&name);
        self.consume(); // ":="
        let rhs = self.parse_expression()?;
        let loc = name_loc.join(&rhs.location);
        Ok(Ast::variable_declaration(loc, name, rhs))
    }

    fn parse_infix(&mut self) -> Result<Ast> {
        let lhs = self.parse_arithmetic_prefix()?;

        if !self.is_infix_operator_start() {
            return Ok(lhs);
        }

        let op = self.consume();
        let loc = self.range_of(&op).join(&lhs.location);
        let ast = Ast::new(Ast_Type::Binary, loc, op, vec![lhs]);
        self.parse_rhs_of_infix(ast)
    }

    fn parse_rhs_of_infix(&mut self, mut lhs: Ast) -> Result<Ast> {
        let rhs = self.parse_arithmetic_prefix()?;

        if !self.is_infix_operator_start() {
            lhs.location = lhs.location.join(&rhs.location);
            lhs.arguments.push(rhs);
            return Ok(lhs);
        }

        let op = self.consume();
        let lhs_prec = precedence(&lhs.token.source)
            .ok_or_else(|| self.err_here(MusiqueError::Undefined_Operator { name: lhs.token.source.clone() }))?;
        let op_prec = precedence(&op.source)
            .ok_or_else(|| self.err_here(MusiqueError::Undefined_Operator { name: op.source.clone() }))?;

        if lhs_prec >= op_prec {
            lhs.arguments.push(rhs);
            let loc = self.range_of(&op).join(&lhs.location);
            let ast = Ast::new(Ast_Type::Binary, loc, op, vec![lhs]);
            self.parse_rhs_of_infix(ast)
        } else {
            let loc = self.range_of(&op).join(&rhs.location);
            let rhs_ast = Ast::new(Ast_Type::Binary, loc, op, vec![rhs]);
            let folded = self.parse_rhs_of_infix(rhs_ast)?;
            lhs.location = lhs.location.join(&folded.location);
            lhs.arguments.push(folded);
            Ok(lhs)
        }
    }

    fn parse_arithmetic_prefix(&mut self) -> Result<Ast> {
        if self.expect_lexeme(Token_Type::Operator, "-") || self.expect_lexeme(Token_Type::Operator, "+") {
            let op = self.consume();
            let operand = self.parse_arithmetic_prefix()?;
            let loc = self.range_of(&op).join(&operand.location);
            return Ok(Ast::unary(loc, op, operand));
        }
        self.parse_call()
    }

    /// `(...)` immediately following an atom, or one or more juxtaposed
    /// atoms, turn the head into a Call.
    fn parse_call(&mut self) -> Result<Ast> {
        let head = self.parse_index()?;
        let mut args: Vec<Ast> = Vec::new();

        loop {
            if self.expect(Token_Type::Open_Paren) {
                let open = self.consume();
                let start_loc = self.range_of(&open);
                let inner = self.parse_sequence_inside_parens(start_loc)?;
                match inner.r#type {
                    Ast_Type::Sequence => args.extend(inner.arguments),
                    _ => args.push(inner),
                }
                continue;
            }
            if self.can_start_juxtaposed_atom() {
                args.push(self.parse_index()?);
                continue;
            }
            break;
        }

        if args.is_empty() {
            return Ok(head);
        }

        let loc = args
            .iter()
            .fold(head.location.clone(), |acc, a| acc.join(&a.location));
        let token = head.token.clone();
        let mut all = vec![head];
        all.extend(args);
        Ok(Ast::call(loc, token, all))
    }

    /// Postfix `expr[...]`, left-associative, tighter than call application.
    /// Desugars to the same Binary `.` node the index operator produces.
    fn parse_index(&mut self) -> Result<Ast> {
        let mut result = self.parse_atomic()?;

        while self.expect(Token_Type::Open_Bracket) {
            let open = self.consume();
            let start_loc = self.range_of(&open);
            let inner = self.parse_sequence_inside_brackets(start_loc.clone())?;
            let loc = result.location.join(&inner.location);
            let dot = Token::new(Token_Type::Operator, ".", open.start);
            result = Ast::binary(loc, dot, result, inner);
        }

        Ok(result)
    }

    fn parse_atomic(&mut self) -> Result<Ast> {
        let Some(tok) = self.peek().cloned() else {
            return Err(self.err_here(MusiqueError::Unexpected_Empty_Source));
        };

        match tok.r#type {
            Token_Type::Numeric | Token_Type::Symbol | Token_Type::Chord | Token_Type::Keyword => {
                self.consume();
                Ok(Ast::literal(self.range_of(&tok), tok))
            }
            Token_Type::Open_Paren => self.parse_paren_form(),
            _ => Err(self.err_here(MusiqueError::Unexpected_Token { found: tok.source })),
        }
    }

    /// `(...)`: a group if it holds exactly one expression, a Block if it
    /// holds several, or a Lambda if a top-level `|` separates parameters
    /// from the body.
    fn parse_paren_form(&mut self) -> Result<Ast> {
        let open = self.consume();
        let start_loc = self.range_of(&open);

        if let Some(parameters) = self.try_parse_lambda_params(&start_loc)? {
            let body = self.parse_sequence()?;
            if !self.expect(Token_Type::Close_Paren) {
                return Err(self.err_at(start_loc, MusiqueError::Unexpected_Empty_Source));
            }
            let close = self.consume();
            let loc = start_loc.join(&self.range_of(&close));
            return Ok(Ast::lambda(loc, open, parameters, body));
        }

        let body = self.parse_sequence_inside_parens(start_loc.clone())?;
        match body.r#type {
            Ast_Type::Sequence if body.arguments.len() == 1 => Ok(body.arguments.into_iter().next().unwrap()),
            Ast_Type::Sequence if body.arguments.is_empty() => Ok(Ast::block(start_loc.clone(), open, body)),
            Ast_Type::Sequence => Ok(Ast::block(start_loc, open, body)),
            _ => Ok(body),
        }
    }

    /// Attempts to parse a lambda parameter list (`p1 p2 ... |`) right after
    /// an opening paren. Returns `Ok(None)` and rewinds if this isn't a
    /// lambda header; raises `Literal_As_Identifier` if a top-level `|`
    /// exists but the tokens before it aren't all bare symbols.
    fn try_parse_lambda_params(&mut self, start_loc: &FileRange) -> Result<Option<Vec<Ast>>> {
        let start = self.pos;
        let mut parameters = Vec::new();

        loop {
            if self.expect(Token_Type::Symbol) {
                let tok = self.consume();
                parameters.push(Ast::literal(self.range_of(&tok), tok));
            } else {
                break;
            }
        }

        if self.expect(Token_Type::Parameter_Separator) {
            self.consume();
            return Ok(Some(parameters));
        }

        if self.scan_for_top_level_bar_before_close() {
            let bad = self.tokens[self.pos].clone();
            return Err(self.err_at(
                start_loc.clone(),
                MusiqueError::Literal_As_Identifier {
                    what: bad.source,
                    context: "block parameter list",
                },
            ));
        }

        self.pos = start;
        Ok(None)
    }

    fn scan_for_top_level_bar_before_close(&self) -> bool {
        let mut depth: i32 = 0;
        let mut i = self.pos;
        while let Some(tok) = self.tokens.get(i) {
            match tok.r#type {
                Token_Type::Open_Paren => depth += 1,
                Token_Type::Close_Paren => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                Token_Type::Parameter_Separator if depth == 0 => return true,
                _ => {}
            }
            i += 1;
        }
        false
    }
}

fn synthetic_token(range: &FileRange) -> Token {
    Token::new(Token_Type::Comma, ",", range.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast_Type;

    fn parse_ok(src: &str) -> Ast {
        parse(src, "t.mq").unwrap_or_else(|e| panic!("parse error in {:?}: {:?}", src, e))
    }

    #[test]
    fn parses_simple_arithmetic_with_precedence() {
        let ast = parse_ok("1 + 2 * 3");
        assert_eq!(ast.r#type, Ast_Type::Sequence);
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Binary);
        assert_eq!(expr.token.source, "+");
        assert_eq!(expr.arguments[1].token.source, "*");
    }

    #[test]
    fn parses_call_by_juxtaposition() {
        let ast = parse_ok("say 1 2");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Call);
        assert_eq!(expr.arguments.len(), 3);
    }

    #[test]
    fn parses_call_with_parens() {
        let ast = parse_ok("f(1, 2)");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Call);
        assert_eq!(expr.arguments.len(), 3);
    }

    #[test]
    fn parses_lambda_applied_immediately() {
        let ast = parse_ok("(i | i + 1) 3");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Call);
        assert_eq!(expr.arguments[0].r#type, Ast_Type::Lambda);
    }

    #[test]
    fn single_expression_in_parens_is_just_grouping() {
        let ast = parse_ok("(1 + 2) * 3");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Binary);
        assert_eq!(expr.token.source, "*");
        assert_eq!(expr.arguments[0].token.source, "+");
    }

    #[test]
    fn multi_statement_parens_become_a_block() {
        let ast = parse_ok("(1, 2)");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Block);
    }

    #[test]
    fn variable_declaration_uses_colon_equals() {
        let ast = parse_ok("A := down 5");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Variable_Declaration);
    }

    #[test]
    fn plain_equals_is_binary_assignment() {
        let ast = parse_ok("x = 5");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Binary);
        assert_eq!(expr.token.source, "=");
    }

    #[test]
    fn indexing_desugars_to_dot_binary() {
        let ast = parse_ok("A . 3");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Binary);
        assert_eq!(expr.token.source, ".");
    }

    #[test]
    fn bracket_indexing_desugars_to_dot_binary() {
        let ast = parse_ok("A[3]");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Binary);
        assert_eq!(expr.token.source, ".");
    }

    #[test]
    fn mismatched_closing_paren_is_an_error() {
        assert!(parse(")", "t.mq").is_err());
    }

    #[test]
    fn unterminated_block_reports_opening_location() {
        let err = parse("(1 + 2", "t.mq").unwrap_err();
        assert!(matches!(err.details, MusiqueError::Unexpected_Empty_Source));
    }

    #[test]
    fn non_symbol_block_parameter_is_rejected() {
        let err = parse("(1 2 | 3)", "t.mq").unwrap_err();
        assert!(matches!(err.details, MusiqueError::Literal_As_Identifier { .. }));
    }

    #[test]
    fn sequence_separators_allow_commas_and_newlines() {
        let ast = parse_ok("1, 2\n3");
        assert_eq!(ast.arguments.len(), 3);
    }

    #[test]
    fn unary_minus_parses_before_call() {
        let ast = parse_ok("-5");
        let expr = &ast.arguments[0];
        assert_eq!(expr.r#type, Ast_Type::Unary);
        assert_eq!(expr.token.source, "-");
    }
}
