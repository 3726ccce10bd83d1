//! Sandboxed boolean conditions over measurement values.
//!
//! A trigger condition such as `env.system.time > 10 and humidity < 80` is
//! parsed once at registration time and evaluated against the measurement
//! snapshot on every inference call. The language has numbers, booleans,
//! arithmetic, chained comparisons and `and`/`or`/`not`; nothing else.

mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;

use parser::{ArithOp, CmpOp, Expr};

use crate::error::{EvaluationError, Result};
use lexer::Lexer;
use parser::Parser;

/// Runtime value of a condition sub-expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Num(f64),
    Bool(bool),
}

impl Value {
    pub fn truthy(self) -> bool {
        match self {
            Value::Num(n) => n != 0.0,
            Value::Bool(b) => b,
        }
    }

    fn num(self, operator: &'static str) -> std::result::Result<f64, EvaluationError> {
        match self {
            Value::Num(n) => Ok(n),
            Value::Bool(_) => Err(EvaluationError::TypeMismatch { operator, expected: "number" }),
        }
    }
}

/// A parsed condition plus the sanitized identifiers it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
    identifiers: Vec<String>,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        let tokens = Lexer::new(source).tokenize()?;
        let expr = Parser::new(source, tokens).parse()?;
        let mut identifiers = Vec::new();
        collect_identifiers(&expr, &mut identifiers);
        Ok(Self { source: source.to_string(), expr, identifiers })
    }

    /// Sanitized identifiers in order of first appearance.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn evaluate(&self, values: &HashMap<String, f64>) -> std::result::Result<bool, EvaluationError> {
        eval(&self.expr, values).map(Value::truthy)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn collect_identifiers(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Num(_) | Expr::Bool(_) => {}
        Expr::Ident(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Expr::Neg(e) | Expr::Not(e) => collect_identifiers(e, out),
        Expr::And(a, b) | Expr::Or(a, b) | Expr::Arith(_, a, b) => {
            collect_identifiers(a, out);
            collect_identifiers(b, out);
        }
        Expr::Compare(first, rest) => {
            collect_identifiers(first, out);
            rest.iter().for_each(|(_, e)| collect_identifiers(e, out));
        }
    }
}

fn eval(expr: &Expr, values: &HashMap<String, f64>) -> std::result::Result<Value, EvaluationError> {
    Ok(match expr {
        Expr::Num(n) => Value::Num(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Ident(name) => values
            .get(name)
            .copied()
            .map(Value::Num)
            .ok_or_else(|| EvaluationError::UnknownIdentifier(name.clone()))?,
        Expr::Neg(e) => Value::Num(-eval(e, values)?.num("-")?),
        Expr::Not(e) => Value::Bool(!eval(e, values)?.truthy()),
        Expr::And(a, b) => Value::Bool(eval(a, values)?.truthy() && eval(b, values)?.truthy()),
        Expr::Or(a, b) => Value::Bool(eval(a, values)?.truthy() || eval(b, values)?.truthy()),
        Expr::Arith(op, a, b) => Value::Num(arith(*op, eval(a, values)?, eval(b, values)?)?),
        Expr::Compare(first, rest) => {
            let mut lhs = eval(first, values)?;
            for (op, e) in rest {
                let rhs = eval(e, values)?;
                if !compare(*op, lhs, rhs)? {
                    return Ok(Value::Bool(false));
                }
                lhs = rhs;
            }
            Value::Bool(true)
        }
    })
}

fn arith(op: ArithOp, a: Value, b: Value) -> std::result::Result<f64, EvaluationError> {
    let symbol = match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
        ArithOp::Rem => "%",
    };
    let (a, b) = (a.num(symbol)?, b.num(symbol)?);
    Ok(match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div | ArithOp::Rem if b == 0.0 => return Err(EvaluationError::DivisionByZero),
        ArithOp::Div => a / b,
        // Floored modulo: the result takes the sign of the divisor.
        ArithOp::Rem => a - b * (a / b).floor(),
    })
}

fn compare(op: CmpOp, a: Value, b: Value) -> std::result::Result<bool, EvaluationError> {
    match (op, a, b) {
        (CmpOp::Eq, Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (CmpOp::Ne, Value::Bool(x), Value::Bool(y)) => Ok(x != y),
        (_, Value::Num(x), Value::Num(y)) => Ok(match op {
            CmpOp::Lt => x < y,
            CmpOp::Le => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Ge => x >= y,
            CmpOp::Eq => x == y,
            CmpOp::Ne => x != y,
        }),
        _ => Err(EvaluationError::TypeMismatch {
            operator: match op {
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
                CmpOp::Eq => "==",
                CmpOp::Ne => "!=",
            },
            expected: "operands of the same type",
        }),
    }
}
