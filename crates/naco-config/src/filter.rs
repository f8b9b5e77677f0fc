//! Expression engine tuning for object definition data.
//!
//! Directives are frequently absent, so the default membership operators
//! (which reject a null right-hand side) are overridden with lenient
//! variants, and the `has_member` builtin understands comma-separated
//! collection directives such as `contacts` and `hostgroups`.

use naco_expr::{Engine, ExprError, ExprResult, FunctionTable, OpKey, OperatorTable, Value};

/// Build the engine used to evaluate filters and updates against object
/// definitions: default tables plus the overrides described above.
#[must_use]
pub fn objdef_engine() -> Engine {
    let mut operators = OperatorTable::with_defaults();
    operators.set(OpKey::In, in_collection);
    operators.set(OpKey::NotIn, not_in_collection);
    let mut functions = FunctionTable::with_defaults();
    functions.set("has_member", has_member);
    Engine::new(operators, functions)
}

/// `in` with an empty or missing right-hand side yields false instead of
/// failing
fn in_collection(left: &Value, right: &Value) -> ExprResult<Value> {
    if !right.is_truthy() {
        return Ok(Value::Bool(false));
    }
    match right {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|item| item.loose_eq(left)))),
        Value::Str(haystack) => match left {
            Value::Str(needle) => Ok(Value::Bool(haystack.contains(needle.as_str()))),
            other => Err(ExprError::InvalidExpression(format!(
                "'in <string>' requires a string left operand, not {}",
                other.type_name()
            ))),
        },
        other => Err(ExprError::InvalidExpression(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// `not in` inverts [`in_collection`], so it yields true for an empty or
/// missing right-hand side
fn not_in_collection(left: &Value, right: &Value) -> ExprResult<Value> {
    Ok(Value::Bool(!in_collection(left, right)?.is_truthy()))
}

/// `has_member(collection, member...)`: true when every requested member
/// appears in the comma-separated `collection`, with per-element whitespace
/// trimming. A falsy collection contains nothing.
fn has_member(args: &[Value]) -> ExprResult<Value> {
    let Some((collection, members)) = args.split_first() else {
        return Err(ExprError::InvalidExpression(
            "has_member() requires a collection argument".to_string(),
        ));
    };
    if !collection.is_truthy() {
        return Ok(Value::Bool(false));
    }
    let elements: Vec<String> = match collection {
        Value::Str(joined) => joined.split(',').map(|e| e.trim().to_string()).collect(),
        Value::List(items) => items.iter().map(ToString::to_string).collect(),
        other => {
            return Err(ExprError::InvalidExpression(format!(
                "has_member() collection must be a string, not {}",
                other.type_name()
            )))
        }
    };
    let all_present = members
        .iter()
        .all(|member| elements.iter().any(|e| *e == member.to_string()));
    Ok(Value::Bool(all_present))
}
