//! Precedence-climbing parser for the expression language (C3).
//!
//! Grounded on the teacher's `core::array_calculator::parser` recursive
//! descent shape, retuned to this engine's precedence ladder (spec §4.3):
//!
//! `|| < && < == != < < <= > >= < + - < * / < unary - < **`
//!
//! `**` is right-associative; everything else left-associative. Unary
//! minus binds *looser* than `**` but tighter than binary `-` — so
//! `-2 ** 2 == -(2 ** 2) == -4`, per spec §9's explicit resolution of the
//! ambiguity: "this specification fixes the ordering: unary minus is
//! looser than `**`, yielding `-(2**2) = -4`." The parenthesized example
//! in spec §4.3/§8, `(-2) ** 2 == 4`, is not evidence to the contrary —
//! `(-2)` is already a literal before `**` ever runs, so it evaluates to
//! 4 under either convention. See DESIGN.md.

use super::ast::Expr;
use super::tokenizer::{tokenize, Token};
use crate::error::EngineError;

pub fn parse(formula: &str) -> Result<Expr, EngineError> {
    let tokens = tokenize(formula)?;
    Parser::new(tokens).parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, EngineError> {
        if self.tokens.is_empty() {
            return Err(EngineError::ExpressionError {
                offset: 0,
                message: "empty expression".to_string(),
            });
        }
        let expr = self.or_expr()?;
        if !self.is_at_end() {
            return Err(EngineError::ExpressionError {
                offset: self.pos,
                message: format!("unexpected token after expression: {:?}", self.peek()),
            });
        }
        Ok(expr)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.tokens.get(self.pos - 1)
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any_op(&mut self, ops: &[&str]) -> Option<String> {
        if let Some(Token::Operator(s)) = self.peek() {
            if ops.contains(&s.as_str()) {
                let op = s.clone();
                self.advance();
                return Some(op);
            }
        }
        None
    }

    fn or_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.and_expr()?;
        while self.match_any_op(&["||"]).is_some() {
            let right = self.and_expr()?;
            left = Expr::Bin("||".to_string(), Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.equality()?;
        while self.match_any_op(&["&&"]).is_some() {
            let right = self.equality()?;
            left = Expr::Bin("&&".to_string(), Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.relational()?;
        while let Some(op) = self.match_any_op(&["==", "!="]) {
            let right = self.relational()?;
            left = Expr::Bin(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.additive()?;
        while let Some(op) = self.match_any_op(&["<=", ">=", "<", ">"]) {
            let right = self.additive()?;
            left = Expr::Bin(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.multiplicative()?;
        while let Some(op) = self.match_any_op(&["+", "-"]) {
            let right = self.multiplicative()?;
            left = Expr::Bin(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, EngineError> {
        let mut left = self.unary()?;
        while let Some(op) = self.match_any_op(&["*", "/"]) {
            let right = self.unary()?;
            left = Expr::Bin(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `unary := "-" unary | power` — unary minus is looser than `**` (it
    /// wraps a whole power chain, so `-2 ** 2` is `-(2 ** 2)`) but tighter
    /// than `*`/`/` and `+`/`-`, per spec §9.
    fn unary(&mut self) -> Result<Expr, EngineError> {
        if self.match_any_op(&["-"]).is_some() {
            let operand = self.unary()?;
            Ok(Expr::Unary("-".to_string(), Box::new(operand)))
        } else {
            self.power()
        }
    }

    /// `power := primary ( "**" unary )?` — right-associative; the
    /// right-hand side is parsed via `unary` (not `power` directly) so an
    /// exponent may itself carry a leading unary minus, e.g. `2 ** -3`.
    fn power(&mut self) -> Result<Expr, EngineError> {
        let left = self.primary()?;
        if self.match_any_op(&["**"]).is_some() {
            let right = self.unary()?;
            Ok(Expr::Bin("**".to_string(), Box::new(left), Box::new(right)))
        } else {
            Ok(left)
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, EngineError> {
        let mut args = Vec::new();
        if let Some(Token::CloseParen) = self.peek() {
            return Ok(args);
        }
        args.push(self.or_expr()?);
        while self.match_token(&Token::Comma) {
            args.push(self.or_expr()?);
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, EngineError> {
        let token = self.peek().cloned();
        match token {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Num(n))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                if self.match_token(&Token::OpenParen) {
                    let args = self.arguments()?;
                    if !self.match_token(&Token::CloseParen) {
                        return Err(EngineError::ExpressionError {
                            offset: self.pos,
                            message: "expected ')' after function arguments".to_string(),
                        });
                    }
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::OpenParen) => {
                self.advance();
                let expr = self.or_expr()?;
                if !self.match_token(&Token::CloseParen) {
                    return Err(EngineError::ExpressionError {
                        offset: self.pos,
                        message: "expected ')' after expression".to_string(),
                    });
                }
                Ok(expr)
            }
            Some(other) => Err(EngineError::ExpressionError {
                offset: self.pos,
                message: format!("unexpected token: {:?}", other),
            }),
            None => Err(EngineError::ExpressionError {
                offset: self.pos,
                message: "unexpected end of expression".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_mul_over_add() {
        // 2 + 3 * 4 == 14
        let expr = parse("2 + 3 * 4").unwrap();
        assert_eq!(
            expr,
            Expr::Bin(
                "+".into(),
                Box::new(Expr::Num(2.0)),
                Box::new(Expr::Bin("*".into(), Box::new(Expr::Num(3.0)), Box::new(Expr::Num(4.0))))
            )
        );
    }

    #[test]
    fn power_is_right_associative() {
        // 2 ** 3 ** 2 == 2 ** (3 ** 2)
        let expr = parse("2 ** 3 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Bin(
                "**".into(),
                Box::new(Expr::Num(2.0)),
                Box::new(Expr::Bin("**".into(), Box::new(Expr::Num(3.0)), Box::new(Expr::Num(2.0))))
            )
        );
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        // -2 ** 2 == -(2 ** 2)
        let expr = parse("-2 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary(
                "-".into(),
                Box::new(Expr::Bin("**".into(), Box::new(Expr::Num(2.0)), Box::new(Expr::Num(2.0)))),
            )
        );
    }

    #[test]
    fn unary_minus_in_exponent() {
        // 2 ** -3 == 2 ** (-3)
        let expr = parse("2 ** -3").unwrap();
        assert_eq!(
            expr,
            Expr::Bin(
                "**".into(),
                Box::new(Expr::Num(2.0)),
                Box::new(Expr::Unary("-".into(), Box::new(Expr::Num(3.0)))),
            )
        );
    }

    #[test]
    fn function_call_with_args() {
        let expr = parse("round(weight/((height/100)**2),2)").unwrap();
        assert!(matches!(expr, Expr::Call(ref name, ref args) if name == "round" && args.len() == 2));
    }

    #[test]
    fn identifier_dollar_stripped() {
        assert_eq!(parse("$bmi_value").unwrap(), Expr::Ident("bmi_value".to_string()));
    }

    #[test]
    fn logical_precedence() {
        // a || b && c  ==  a || (b && c)
        let expr = parse("a || b && c").unwrap();
        assert_eq!(
            expr,
            Expr::Bin(
                "||".into(),
                Box::new(Expr::Ident("a".into())),
                Box::new(Expr::Bin(
                    "&&".into(),
                    Box::new(Expr::Ident("b".into())),
                    Box::new(Expr::Ident("c".into()))
                ))
            )
        );
    }

    #[test]
    fn empty_expression_errors() {
        assert!(parse("").is_err());
    }

    #[test]
    fn unclosed_paren_errors() {
        let err = parse("round(a, b").unwrap_err();
        match err {
            EngineError::ExpressionError { message, .. } => assert!(message.contains("')'")),
            other => panic!("expected ExpressionError, got {:?}", other),
        }
    }
}
