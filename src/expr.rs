//! Arithmetic, comparison and logic over the text produced by rendering a
//! `math` body or a `case` attribute.
//!
//! Precedence, lowest first: `||`, `&&`, comparisons (`==` `=` `!=` `<`
//! `<=` `>` `>=`), `+ -`, `* / %`, unary `- + !`, `^` (right-associative).
//! Any operand that is not a number is a text operand, so
//! `Qentem = Qentem` compares two words.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::error::ExprError;
use crate::value::format_number;
use std::cmp::Ordering;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn from_bool(b: bool) -> Self {
        Scalar::Number(if b { 1.0 } else { 0.0 })
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Number(n) => *n != 0.0,
            Scalar::Text(s) => !s.is_empty(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Scalar::Number(n) => format_number(*n),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn as_number(&self) -> Result<f64, ExprError> {
        match self {
            Scalar::Number(n) => Ok(*n),
            Scalar::Text(s) => Err(ExprError::NotANumber(s.clone())),
        }
    }
}

/// Parses and evaluates `src` in one step.
pub fn evaluate(src: &str, max_depth: usize) -> Result<Scalar, ExprError> {
    let expr = parse(src, max_depth)?;
    eval(&expr)
}

pub fn parse(src: &str, max_depth: usize) -> Result<Expr, ExprError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let expr = parser.parse_or()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(Tok::RParen) => Err(ExprError::Unbalanced),
        Some(tok) => Err(ExprError::Unexpected(tok.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Word(String),
    Op(BinOp),
    Not,
    LParen,
    RParen,
}

impl std::fmt::Display for Tok {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Number(n) => f.write_str(&format_number(*n)),
            Tok::Word(w) => f.write_str(w),
            Tok::Op(op) => f.write_str(op_symbol(*op)),
            Tok::Not => f.write_str("!"),
            Tok::LParen => f.write_str("("),
            Tok::RParen => f.write_str(")"),
        }
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::Pow => "^",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '^' | '%' | '(' | ')' | '=' | '!' | '<' | '>' | '&' | '|'
    )
}

fn tokenize(src: &str) -> Result<Vec<Tok>, ExprError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    loop {
        rest = rest.trim_start();
        let Some(c) = rest.chars().next() else {
            return Ok(tokens);
        };

        if !is_operator_char(c) {
            let end = operand_end(rest);
            tokens.push(operand(rest[..end].trim_end()));
            rest = &rest[end..];
            continue;
        }

        let two = rest.get(..2).unwrap_or("");
        let (tok, len) = match two {
            "==" => (Tok::Op(BinOp::Eq), 2),
            "!=" => (Tok::Op(BinOp::Ne), 2),
            "<=" => (Tok::Op(BinOp::Le), 2),
            ">=" => (Tok::Op(BinOp::Ge), 2),
            "&&" => (Tok::Op(BinOp::And), 2),
            "||" => (Tok::Op(BinOp::Or), 2),
            _ => match c {
                '+' => (Tok::Op(BinOp::Add), 1),
                '-' => (Tok::Op(BinOp::Sub), 1),
                '*' => (Tok::Op(BinOp::Mul), 1),
                '/' => (Tok::Op(BinOp::Div), 1),
                '%' => (Tok::Op(BinOp::Rem), 1),
                '^' => (Tok::Op(BinOp::Pow), 1),
                '=' => (Tok::Op(BinOp::Eq), 1),
                '<' => (Tok::Op(BinOp::Lt), 1),
                '>' => (Tok::Op(BinOp::Gt), 1),
                '!' => (Tok::Not, 1),
                '(' => (Tok::LParen, 1),
                ')' => (Tok::RParen, 1),
                other => return Err(ExprError::Unexpected(other.to_string())),
            },
        };
        tokens.push(tok);
        rest = &rest[len..];
    }
}

/// End of the operand at the start of `rest`. A sign right after the
/// exponent marker of a numeric literal (`1e+3`) belongs to the literal.
fn operand_end(rest: &str) -> usize {
    let mut from = 0;
    while let Some(i) = rest[from..].find(is_operator_char).map(|i| from + i) {
        if !(matches!(rest.as_bytes()[i], b'+' | b'-') && is_exponent_prefix(&rest[..i])) {
            return i;
        }
        from = i + 1;
    }
    rest.len()
}

fn is_exponent_prefix(head: &str) -> bool {
    let Some(mantissa) = head.strip_suffix(|c: char| c == 'e' || c == 'E') else {
        return false;
    };
    mantissa.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn operand(word: &str) -> Tok {
    let numeric = word.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && word
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if numeric {
        if let Ok(n) = word.parse::<f64>() {
            return Tok::Number(n);
        }
    }
    match word {
        "true" => Tok::Number(1.0),
        "false" => Tok::Number(0.0),
        "null" => Tok::Word(String::new()),
        _ => Tok::Word(word.to_string()),
    }
}

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn peek_op(&self, ops: &[BinOp]) -> Option<BinOp> {
        match self.peek() {
            Some(Tok::Op(op)) if ops.contains(op) => Some(*op),
            _ => None,
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }

    fn binary_level(
        &mut self,
        ops: &[BinOp],
        next: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut lhs = next(self)?;
        // Each fold adds a level to the left-deep tree.
        let mut folded = 0;
        while let Some(op) = self.peek_op(ops) {
            self.pos += 1;
            self.descend()?;
            folded += 1;
            let rhs = next(self)?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        self.depth -= folded;
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::Or], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::And], Self::parse_cmp)
    }

    fn parse_cmp(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[
                BinOp::Eq,
                BinOp::Ne,
                BinOp::Lt,
                BinOp::Le,
                BinOp::Gt,
                BinOp::Ge,
            ],
            Self::parse_sum,
        )
    }

    fn parse_sum(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::Add, BinOp::Sub], Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinOp::Mul, BinOp::Div, BinOp::Rem], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Tok::Op(BinOp::Sub)) => UnaryOp::Neg,
            Some(Tok::Op(BinOp::Add)) => UnaryOp::Plus,
            Some(Tok::Not) => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_power(&mut self) -> Result<Expr, ExprError> {
        let base = self.parse_primary()?;
        if self.peek_op(&[BinOp::Pow]).is_some() {
            self.pos += 1;
            self.descend()?;
            let exponent = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Binary(Box::new(base), BinOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Tok::Number(n)) => Ok(Expr::Number(n)),
            Some(Tok::Word(w)) => Ok(Expr::Text(w)),
            Some(Tok::LParen) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err(ExprError::Unbalanced),
                }
            }
            Some(Tok::RParen) => Err(ExprError::Unbalanced),
            Some(tok) => Err(ExprError::Unexpected(tok.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

pub fn eval(expr: &Expr) -> Result<Scalar, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Scalar::Number(*n)),
        Expr::Text(s) => Ok(Scalar::Text(s.clone())),
        Expr::Unary(op, operand) => {
            let value = eval(operand)?;
            match op {
                UnaryOp::Not => Ok(Scalar::from_bool(!value.is_truthy())),
                UnaryOp::Neg => Ok(Scalar::Number(-value.as_number()?)),
                UnaryOp::Plus => Ok(Scalar::Number(value.as_number()?)),
            }
        }
        Expr::Binary(lhs, BinOp::And, rhs) => {
            let result = eval(lhs)?.is_truthy() && eval(rhs)?.is_truthy();
            Ok(Scalar::from_bool(result))
        }
        Expr::Binary(lhs, BinOp::Or, rhs) => {
            let result = eval(lhs)?.is_truthy() || eval(rhs)?.is_truthy();
            Ok(Scalar::from_bool(result))
        }
        Expr::Binary(lhs, op, rhs) => {
            let l = eval(lhs)?;
            let r = eval(rhs)?;
            binary(&l, *op, &r)
        }
    }
}

fn binary(l: &Scalar, op: BinOp, r: &Scalar) -> Result<Scalar, ExprError> {
    match op {
        BinOp::Eq => Ok(Scalar::from_bool(loose_eq(l, r))),
        BinOp::Ne => Ok(Scalar::from_bool(!loose_eq(l, r))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = order(l, r)?;
            let result = match op {
                BinOp::Lt => ordering == Ordering::Less,
                BinOp::Le => ordering != Ordering::Greater,
                BinOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Scalar::from_bool(result))
        }
        _ => {
            let a = l.as_number()?;
            let b = r.as_number()?;
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div | BinOp::Rem if b == 0.0 => return Err(ExprError::DivisionByZero),
                BinOp::Div => a / b,
                BinOp::Rem => a % b,
                _ => a.powf(b),
            };
            if !result.is_finite() {
                return Err(ExprError::NonFinite);
            }
            Ok(Scalar::Number(result))
        }
    }
}

/// Numbers compare numerically; anything else by canonical text.
fn loose_eq(l: &Scalar, r: &Scalar) -> bool {
    match (l, r) {
        (Scalar::Number(a), Scalar::Number(b)) => a == b,
        _ => l.render() == r.render(),
    }
}

fn order(l: &Scalar, r: &Scalar) -> Result<Ordering, ExprError> {
    match (l, r) {
        (Scalar::Number(a), Scalar::Number(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| ExprError::Incomparable(l.render(), r.render())),
        (Scalar::Text(a), Scalar::Text(b)) => Ok(a.cmp(b)),
        _ => Err(ExprError::Incomparable(l.render(), r.render())),
    }
}
