//! AST node types for the expression language (C3).

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Ident(String),
    Call(String, Vec<Expr>),
    Bin(String, Box<Expr>, Box<Expr>),
    Unary(String, Box<Expr>),
}
