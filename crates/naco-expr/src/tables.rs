//! Operator and function tables consulted during evaluation.
//!
//! Both tables are built once at startup from their default entries,
//! optionally overridden, and passed into [`crate::Engine::new`]. There is
//! no global registration: a table is plain data owned by its engine.

use std::collections::HashMap;

use crate::ast::{BinOp, CmpOp};
use crate::error::{ExprError, ExprResult};
use crate::value::Value;

/// Identity of a binary operator, the key space of [`OperatorTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKey {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl From<BinOp> for OpKey {
    fn from(op: BinOp) -> Self {
        match op {
            BinOp::Add => OpKey::Add,
            BinOp::Sub => OpKey::Sub,
            BinOp::Mul => OpKey::Mul,
            BinOp::Div => OpKey::Div,
            BinOp::Mod => OpKey::Mod,
        }
    }
}

impl From<CmpOp> for OpKey {
    fn from(op: CmpOp) -> Self {
        match op {
            CmpOp::Eq => OpKey::Eq,
            CmpOp::Ne => OpKey::Ne,
            CmpOp::Lt => OpKey::Lt,
            CmpOp::Le => OpKey::Le,
            CmpOp::Gt => OpKey::Gt,
            CmpOp::Ge => OpKey::Ge,
            CmpOp::In => OpKey::In,
            CmpOp::NotIn => OpKey::NotIn,
        }
    }
}

/// Evaluator for one binary operator
pub type BinFn = fn(&Value, &Value) -> ExprResult<Value>;

/// Implementation of one callable function
pub type CallFn = fn(&[Value]) -> ExprResult<Value>;

/// Map from operator identity to its evaluator
#[derive(Debug, Clone)]
pub struct OperatorTable {
    entries: HashMap<OpKey, BinFn>,
}

impl OperatorTable {
    /// The default operator set: arithmetic, comparison, and strict
    /// membership (a `Null` right-hand side is an error).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut entries: HashMap<OpKey, BinFn> = HashMap::new();
        entries.insert(OpKey::Add, op_add);
        entries.insert(OpKey::Sub, op_sub);
        entries.insert(OpKey::Mul, op_mul);
        entries.insert(OpKey::Div, op_div);
        entries.insert(OpKey::Mod, op_mod);
        entries.insert(OpKey::Eq, op_eq);
        entries.insert(OpKey::Ne, op_ne);
        entries.insert(OpKey::Lt, op_lt);
        entries.insert(OpKey::Le, op_le);
        entries.insert(OpKey::Gt, op_gt);
        entries.insert(OpKey::Ge, op_ge);
        entries.insert(OpKey::In, op_in);
        entries.insert(OpKey::NotIn, op_not_in);
        OperatorTable { entries }
    }

    /// Replace (or add) the evaluator for `key`
    pub fn set(&mut self, key: OpKey, op: BinFn) {
        self.entries.insert(key, op);
    }

    pub(crate) fn apply(&self, key: OpKey, left: &Value, right: &Value) -> ExprResult<Value> {
        let op = self.entries.get(&key).ok_or_else(|| {
            ExprError::InvalidExpression(format!("operator {key:?} is not available"))
        })?;
        op(left, right)
    }
}

/// Map from function name to its implementation
#[derive(Debug, Clone)]
pub struct FunctionTable {
    entries: HashMap<String, CallFn>,
}

impl FunctionTable {
    /// The default builtins: `int`, `float`, `str`, `len`
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut table = FunctionTable {
            entries: HashMap::new(),
        };
        table.set("int", fn_int);
        table.set("float", fn_float);
        table.set("str", fn_str);
        table.set("len", fn_len);
        table
    }

    /// Replace (or add) the implementation for `name`
    pub fn set(&mut self, name: &str, call: CallFn) {
        self.entries.insert(name.to_string(), call);
    }

    pub(crate) fn call(&self, name: &str, args: &[Value]) -> ExprResult<Value> {
        let call = self.entries.get(name).ok_or_else(|| {
            ExprError::InvalidExpression(format!("function '{name}' is not defined"))
        })?;
        call(args)
    }
}

fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    Some((left.as_f64()?, right.as_f64()?))
}

fn op_add(left: &Value, right: &Value) -> ExprResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| ExprError::Runtime("integer overflow".to_string())),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.clone();
            items.extend(b.iter().cloned());
            Ok(Value::List(items))
        }
        _ => numeric_pair(left, right)
            .map(|(a, b)| Value::Float(a + b))
            .ok_or_else(|| type_error("+", left, right)),
    }
}

fn op_sub(left: &Value, right: &Value) -> ExprResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| ExprError::Runtime("integer overflow".to_string())),
        _ => numeric_pair(left, right)
            .map(|(a, b)| Value::Float(a - b))
            .ok_or_else(|| type_error("-", left, right)),
    }
}

fn op_mul(left: &Value, right: &Value) -> ExprResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| ExprError::Runtime("integer overflow".to_string())),
        _ => numeric_pair(left, right)
            .map(|(a, b)| Value::Float(a * b))
            .ok_or_else(|| type_error("*", left, right)),
    }
}

fn op_div(left: &Value, right: &Value) -> ExprResult<Value> {
    // True division: the result is always a float
    let (a, b) = numeric_pair(left, right).ok_or_else(|| type_error("/", left, right))?;
    if b == 0.0 {
        return Err(ExprError::Runtime("division by zero".to_string()));
    }
    Ok(Value::Float(a / b))
}

fn op_mod(left: &Value, right: &Value) -> ExprResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(ExprError::Runtime("division by zero".to_string()))
            } else {
                Ok(Value::Int(a.rem_euclid(*b)))
            }
        }
        _ => {
            let (a, b) =
                numeric_pair(left, right).ok_or_else(|| type_error("%", left, right))?;
            if b == 0.0 {
                return Err(ExprError::Runtime("division by zero".to_string()));
            }
            Ok(Value::Float(a.rem_euclid(b)))
        }
    }
}

fn op_eq(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(left.loose_eq(right)))
}

fn op_ne(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(!left.loose_eq(right)))
}

fn ordering(op: &'static str, left: &Value, right: &Value) -> ExprResult<std::cmp::Ordering> {
    if let Some((a, b)) = numeric_pair(left, right) {
        return a
            .partial_cmp(&b)
            .ok_or_else(|| ExprError::Runtime(format!("'{op}' comparison of NaN")));
    }
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return Ok(a.cmp(b));
    }
    Err(type_error(op, left, right))
}

fn op_lt(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(ordering("<", left, right)?.is_lt()))
}

fn op_le(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(ordering("<=", left, right)?.is_le()))
}

fn op_gt(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(ordering(">", left, right)?.is_gt()))
}

fn op_ge(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(ordering(">=", left, right)?.is_ge()))
}

fn op_in(left: &Value, right: &Value) -> ExprResult<Value> {
    match right {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item.loose_eq(left)))),
        Value::Str(haystack) => match left {
            Value::Str(needle) => Ok(Value::Bool(haystack.contains(needle.as_str()))),
            _ => Err(ExprError::InvalidExpression(format!(
                "'in <string>' requires a string left operand, not {}",
                left.type_name()
            ))),
        },
        _ => Err(ExprError::InvalidExpression(format!(
            "argument of type '{}' is not iterable",
            right.type_name()
        ))),
    }
}

fn op_not_in(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(!op_in(left, right)?.is_truthy()))
}

fn type_error(op: &str, left: &Value, right: &Value) -> ExprError {
    ExprError::InvalidExpression(format!(
        "'{op}' not supported between {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

fn one_arg<'v>(name: &str, args: &'v [Value]) -> ExprResult<&'v Value> {
    match args {
        [arg] => Ok(arg),
        _ => Err(ExprError::InvalidExpression(format!(
            "{name}() takes exactly one argument ({} given)",
            args.len()
        ))),
    }
}

fn fn_int(args: &[Value]) -> ExprResult<Value> {
    let arg = one_arg("int", args)?;
    match arg {
        Value::Int(n) => Ok(Value::Int(*n)),
        #[allow(clippy::cast_possible_truncation)]
        Value::Float(x) => Ok(Value::Int(*x as i64)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            ExprError::InvalidExpression(format!("invalid literal for int(): '{s}'"))
        }),
        _ => Err(ExprError::InvalidExpression(format!(
            "int() argument must be a string or a number, not {}",
            arg.type_name()
        ))),
    }
}

fn fn_float(args: &[Value]) -> ExprResult<Value> {
    let arg = one_arg("float", args)?;
    match arg {
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Bool(b) => Ok(Value::Float(f64::from(*b))),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            ExprError::InvalidExpression(format!("invalid literal for float(): '{s}'"))
        }),
        _ => Err(ExprError::InvalidExpression(format!(
            "float() argument must be a string or a number, not {}",
            arg.type_name()
        ))),
    }
}

fn fn_str(args: &[Value]) -> ExprResult<Value> {
    let arg = one_arg("str", args)?;
    Ok(Value::Str(arg.to_string()))
}

#[allow(clippy::cast_possible_wrap)]
fn fn_len(args: &[Value]) -> ExprResult<Value> {
    let arg = one_arg("len", args)?;
    let len = match arg {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        _ => {
            return Err(ExprError::InvalidExpression(format!(
                "object of type '{}' has no len()",
                arg.type_name()
            )))
        }
    };
    Ok(Value::Int(len as i64))
}
