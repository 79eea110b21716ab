// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tree-walking evaluator for the expression AST.
//!
//! Pure and total over well-formed ASTs: no I/O, no assignment, no function
//! definitions. `now()` reads from an injected clock so evaluation stays
//! deterministic under test instead of reading wall-clock time directly.

use crate::ast::{BinaryOp, Expr, Literal, UnaryOp};
use crate::error::{ExprError, ExprResult};
use serde_json::{Map, Number, Value};

/// Scope exposed to an expression: `{outputs, variables, nodeStates, inputs,
/// loopCount, index, item, total, true, false, null}` per §4.3.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    scope: Map<String, Value>,
    now_ms: i64,
}

impl EvalContext {
    pub fn new(now_ms: i64) -> Self {
        Self {
            scope: Map::new(),
            now_ms,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.scope.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scope.get(key)
    }
}

pub fn eval(expr: &Expr, ctx: &EvalContext) -> ExprResult<Value> {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::Ident(name) => resolve_ident(name, ctx),
        Expr::Unary { op, expr } => eval_unary(*op, eval(expr, ctx)?),
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, eval(lhs, ctx)?, eval(rhs, ctx)?),
        Expr::Ternary {
            cond,
            if_true,
            if_false,
        } => {
            if is_truthy(&eval(cond, ctx)?) {
                eval(if_true, ctx)
            } else {
                eval(if_false, ctx)
            }
        }
        Expr::Member { target, field } => {
            let value = eval(target, ctx)?;
            Ok(member_access(&value, field))
        }
        Expr::Index { target, index } => {
            let value = eval(target, ctx)?;
            let idx = eval(index, ctx)?;
            index_access(&value, &idx)
        }
        Expr::Call { name, args } => {
            let values: Vec<Value> = args.iter().map(|a| eval(a, ctx)).collect::<ExprResult<_>>()?;
            call_builtin(name, &values, ctx)
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::from(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn resolve_ident(name: &str, ctx: &EvalContext) -> ExprResult<Value> {
    match name {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        "null" => Ok(Value::Null),
        _ => Ok(ctx.get(name).cloned().unwrap_or(Value::Null)),
    }
}

fn member_access(value: &Value, field: &str) -> Value {
    match value {
        Value::Object(map) => map.get(field).cloned().unwrap_or(Value::Null),
        Value::Null => Value::Null,
        _ => Value::Null,
    }
}

fn index_access(value: &Value, index: &Value) -> ExprResult<Value> {
    match (value, index) {
        (Value::Array(arr), Value::Number(n)) => {
            let i = n.as_i64().unwrap_or(0);
            if i < 0 {
                return Ok(Value::Null);
            }
            Ok(arr.get(i as usize).cloned().unwrap_or(Value::Null))
        }
        (Value::Object(map), Value::String(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        (Value::Null, _) => Ok(Value::Null),
        (other, _) => Err(ExprError::NotASequence(other.to_string())),
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> ExprResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
        UnaryOp::Neg => Ok(Value::from(-as_number(&value)?)),
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> ExprResult<Value> {
    use BinaryOp::*;
    match op {
        Add => {
            if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
                Ok(Value::String(format!("{}{}", as_display(&lhs), as_display(&rhs))))
            } else {
                Ok(Value::from(as_number(&lhs)? + as_number(&rhs)?))
            }
        }
        Sub => Ok(Value::from(as_number(&lhs)? - as_number(&rhs)?)),
        Mul => Ok(Value::from(as_number(&lhs)? * as_number(&rhs)?)),
        Div => {
            let divisor = as_number(&rhs)?;
            if divisor == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::from(as_number(&lhs)? / divisor))
        }
        Rem => {
            let divisor = as_number(&rhs)?;
            if divisor == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::from(as_number(&lhs)? % divisor))
        }
        Lt => Ok(Value::Bool(compare(&lhs, &rhs)? == std::cmp::Ordering::Less)),
        Le => Ok(Value::Bool(compare(&lhs, &rhs)? != std::cmp::Ordering::Greater)),
        Gt => Ok(Value::Bool(compare(&lhs, &rhs)? == std::cmp::Ordering::Greater)),
        Ge => Ok(Value::Bool(compare(&lhs, &rhs)? != std::cmp::Ordering::Less)),
        Eq => Ok(Value::Bool(lhs == rhs)),
        Ne => Ok(Value::Bool(lhs != rhs)),
        And => Ok(Value::Bool(is_truthy(&lhs) && is_truthy(&rhs))),
        Or => Ok(Value::Bool(is_truthy(&lhs) || is_truthy(&rhs))),
    }
}

fn compare(lhs: &Value, rhs: &Value) -> ExprResult<std::cmp::Ordering> {
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return Ok(a.cmp(b));
    }
    let a = as_number(lhs)?;
    let b = as_number(rhs)?;
    a.partial_cmp(&b)
        .ok_or_else(|| ExprError::Type(format!("cannot compare {lhs} and {rhs}")))
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn as_number(value: &Value) -> ExprResult<f64> {
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| ExprError::Type(format!("{s:?} is not a number"))),
        other => Err(ExprError::Type(format!("{other} is not a number"))),
    }
}

fn as_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const BUILTINS: &[&str] = &[
    "len", "has", "get", "str", "num", "bool", "now", "floor", "ceil", "round", "min", "max", "abs",
];

fn call_builtin(name: &str, args: &[Value], ctx: &EvalContext) -> ExprResult<Value> {
    if !BUILTINS.contains(&name) {
        return Err(ExprError::UnknownFunction(name.to_string()));
    }
    match name {
        "len" => {
            let v = arg(args, 0, name)?;
            Ok(Value::from(match v {
                Value::String(s) => s.chars().count() as i64,
                Value::Array(a) => a.len() as i64,
                Value::Object(o) => o.len() as i64,
                Value::Null => 0,
                _ => return Err(ExprError::Type(format!("len() expects a sequence, got {v}"))),
            }))
        }
        "has" => {
            let target = arg(args, 0, name)?;
            let key = arg(args, 1, name)?;
            Ok(Value::Bool(match (target, key) {
                (Value::Object(map), Value::String(k)) => map.contains_key(k),
                (Value::Array(arr), Value::Number(n)) => {
                    let i = n.as_i64().unwrap_or(-1);
                    i >= 0 && (i as usize) < arr.len()
                }
                _ => false,
            }))
        }
        "get" => {
            let target = arg(args, 0, name)?.clone();
            let key = arg(args, 1, name)?.clone();
            let default = args.get(2).cloned().unwrap_or(Value::Null);
            let result = index_access(&target, &key).unwrap_or(Value::Null);
            Ok(if result.is_null() { default } else { result })
        }
        "str" => Ok(Value::String(as_display(arg(args, 0, name)?))),
        "num" => Ok(Value::from(as_number(arg(args, 0, name)?)?)),
        "bool" => Ok(Value::Bool(is_truthy(arg(args, 0, name)?))),
        "now" => Ok(Value::from(ctx.now_ms)),
        "floor" => Ok(number_result(as_number(arg(args, 0, name)?)?.floor())),
        "ceil" => Ok(number_result(as_number(arg(args, 0, name)?)?.ceil())),
        "round" => Ok(number_result(as_number(arg(args, 0, name)?)?.round())),
        "abs" => Ok(number_result(as_number(arg(args, 0, name)?)?.abs())),
        "min" => reduce_numeric(args, name, f64::min),
        "max" => reduce_numeric(args, name, f64::max),
        _ => unreachable_builtin(name),
    }
}

fn unreachable_builtin(name: &str) -> ExprResult<Value> {
    Err(ExprError::UnknownFunction(name.to_string()))
}

fn reduce_numeric(args: &[Value], name: &str, f: fn(f64, f64) -> f64) -> ExprResult<Value> {
    if args.is_empty() {
        return Err(ExprError::ArityMismatch {
            func: name.to_string(),
            expected: "at least 1".into(),
            got: 0,
        });
    }
    let mut acc = as_number(&args[0])?;
    for v in &args[1..] {
        acc = f(acc, as_number(v)?);
    }
    Ok(number_result(acc))
}

fn number_result(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn arg<'a>(args: &'a [Value], idx: usize, func: &str) -> ExprResult<&'a Value> {
    args.get(idx).ok_or_else(|| ExprError::ArityMismatch {
        func: func.to_string(),
        expected: format!("at least {}", idx + 1),
        got: args.len(),
    })
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
