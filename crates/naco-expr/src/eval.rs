//! Tree-walking evaluator over compiled expressions

use crate::ast::{BinOp, BoolOp, Expr, UnaryOp};
use crate::error::{ExprError, ExprResult};
use crate::parser::Expression;
use crate::tables::{FunctionTable, OperatorTable};
use crate::value::Value;

/// Read-only name resolution for evaluation.
///
/// Missing names resolve to [`Value::Null`] rather than raising; filters
/// are routinely written against directives that many records lack.
pub trait Scope {
    /// Resolve `name` to a value; `Value::Null` when absent
    fn lookup(&self, name: &str) -> Value;
}

/// Name resolution plus the restricted mutation surface used by update
/// expressions.
pub trait ScopeMut: Scope {
    /// The stored string for `name` exactly as written, without coercion.
    /// Augmented assignment treats this as a comma-joined collection.
    fn raw(&self, name: &str) -> Option<String>;

    /// Store `value` under `name`. A `Null` or empty-string value removes
    /// the entry entirely.
    ///
    /// # Errors
    /// Implementations reject writes to computed read-only names.
    fn set(&mut self, name: &str, value: Value) -> ExprResult<()>;
}

/// Scope over a plain name/value mapping, mainly useful in tests and for
/// expressions that bind no record at all.
pub struct MapScope<'a>(pub &'a [(&'a str, Value)]);

impl Scope for MapScope<'_> {
    fn lookup(&self, name: &str) -> Value {
        self.0
            .iter()
            .find(|(k, _)| *k == name)
            .map_or(Value::Null, |(_, v)| v.clone())
    }
}

/// Expression evaluator: an operator table plus a function table.
///
/// Engines are cheap to construct and hold no evaluation state; one engine
/// serves any number of compiled expressions and scopes.
pub struct Engine {
    operators: OperatorTable,
    functions: FunctionTable,
}

impl Engine {
    /// Build an engine from explicit tables
    #[must_use]
    pub fn new(operators: OperatorTable, functions: FunctionTable) -> Self {
        Engine {
            operators,
            functions,
        }
    }

    /// Engine with the default tables
    #[must_use]
    pub fn with_defaults() -> Self {
        Engine::new(OperatorTable::with_defaults(), FunctionTable::with_defaults())
    }

    /// Evaluate a filter expression against `scope`.
    ///
    /// # Errors
    /// `InvalidExpression` or `Runtime` depending on the violation; also
    /// `InvalidExpression` if the expression is a mutation form.
    pub fn eval<S: Scope + ?Sized>(&self, expr: &Expression, scope: &S) -> ExprResult<Value> {
        if expr.root().is_mutation() {
            return Err(ExprError::InvalidExpression(
                "assignment requires an update evaluation".to_string(),
            ));
        }
        self.eval_node(expr.root(), scope)
    }

    /// Evaluate an update expression against a mutable scope and return
    /// the resulting value (for assignments, the assigned value).
    ///
    /// # Errors
    /// `Runtime` when an assigned value is not a string, integer, float,
    /// or null; otherwise as [`Engine::eval`].
    pub fn eval_update<S: ScopeMut + ?Sized>(
        &self,
        expr: &Expression,
        scope: &mut S,
    ) -> ExprResult<Value> {
        match expr.root() {
            Expr::Assign { target, value } => {
                let assigned = self.eval_node(value, scope)?;
                check_assignable(target, &assigned)?;
                scope.set(target, assigned.clone())?;
                Ok(assigned)
            }
            Expr::AugAssign { target, op, value } => {
                self.eval_aug_assign(target, *op, value, scope)
            }
            node => self.eval_node(node, scope),
        }
    }

    /// `+=`/`-=` treat the directive as a comma-joined collection; any
    /// other augmented operator falls back to plain arithmetic on the
    /// coerced current value.
    fn eval_aug_assign<S: ScopeMut + ?Sized>(
        &self,
        target: &str,
        op: BinOp,
        value: &Expr,
        scope: &mut S,
    ) -> ExprResult<Value> {
        if !matches!(op, BinOp::Add | BinOp::Sub) {
            let current = scope.lookup(target);
            let rhs = self.eval_node(value, scope)?;
            let result = self.operators.apply(op.into(), &current, &rhs)?;
            check_assignable(target, &result)?;
            scope.set(target, result.clone())?;
            return Ok(result);
        }

        let mut members: Vec<String> = match scope.raw(target) {
            Some(raw) if !raw.is_empty() => raw.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };
        let rhs = self.eval_node(value, scope)?;
        let member = match &rhs {
            Value::Str(s) => s.clone(),
            Value::Int(_) | Value::Float(_) => rhs.to_string(),
            other => {
                return Err(ExprError::Runtime(format!(
                    "cannot use {} value as a collection member of '{target}'",
                    other.type_name()
                )))
            }
        };
        match op {
            BinOp::Add => {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
            BinOp::Sub => {
                if let Some(pos) = members.iter().position(|m| *m == member) {
                    members.remove(pos);
                }
            }
            _ => unreachable!(),
        }
        let joined = members.join(",");
        let assigned = if joined.is_empty() {
            Value::Null
        } else {
            Value::Str(joined)
        };
        scope.set(target, assigned.clone())?;
        Ok(assigned)
    }

    fn eval_node<S: Scope + ?Sized>(&self, node: &Expr, scope: &S) -> ExprResult<Value> {
        match node {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_node(item, scope))
                    .collect::<ExprResult<Vec<_>>>()?;
                Ok(Value::List(values))
            }
            Expr::Name(name) => Ok(scope.lookup(name)),
            Expr::Unary { op, operand } => {
                let value = self.eval_node(operand, scope)?;
                eval_unary(*op, &value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_node(left, scope)?;
                let right = self.eval_node(right, scope)?;
                self.operators.apply((*op).into(), &left, &right)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval_node(first, scope)?;
                let mut result = Value::Bool(true);
                for (op, rhs) in rest {
                    let right = self.eval_node(rhs, scope)?;
                    result = self.operators.apply((*op).into(), &left, &right)?;
                    if !result.is_truthy() {
                        return Ok(result);
                    }
                    left = right;
                }
                Ok(result)
            }
            Expr::Bool { op, operands } => {
                // Operand-value semantics: the deciding operand is the
                // result, not a coerced boolean.
                let mut value = Value::Null;
                for operand in operands {
                    value = self.eval_node(operand, scope)?;
                    match op {
                        BoolOp::And if !value.is_truthy() => return Ok(value),
                        BoolOp::Or if value.is_truthy() => return Ok(value),
                        _ => {}
                    }
                }
                Ok(value)
            }
            Expr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval_node(arg, scope))
                    .collect::<ExprResult<Vec<_>>>()?;
                self.functions.call(name, &values)
            }
            Expr::Assign { .. } | Expr::AugAssign { .. } => Err(ExprError::InvalidExpression(
                "assignment is only valid at the top level of an update expression".to_string(),
            )),
        }
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> ExprResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(ExprError::InvalidExpression(format!(
                "bad operand type for unary -: {}",
                other.type_name()
            ))),
        },
        UnaryOp::Pos => match value {
            Value::Int(_) | Value::Float(_) => Ok(value.clone()),
            other => Err(ExprError::InvalidExpression(format!(
                "bad operand type for unary +: {}",
                other.type_name()
            ))),
        },
    }
}

/// Only strings, integers, floats, and null ("remove") may be assigned to
/// a directive.
fn check_assignable(target: &str, value: &Value) -> ExprResult<()> {
    match value {
        Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Null => Ok(()),
        other => Err(ExprError::Runtime(format!(
            "cannot assign {} value to '{target}'",
            other.type_name()
        ))),
    }
}
