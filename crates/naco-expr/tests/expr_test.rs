//! Integration tests for compile-once / evaluate-many expression behavior
//!
//! Collection-valued update semantics against a real record type are
//! covered in the naco-config test suite; here a plain string store stands
//! in for the record.

use naco_expr::{Engine, ExprError, ExprResult, Expression, MapScope, Scope, ScopeMut, Value};

/// Minimal mutable scope: a list of (name, stored string) pairs
#[derive(Default)]
struct StringStore {
    entries: Vec<(String, String)>,
}

impl StringStore {
    fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Scope for StringStore {
    fn lookup(&self, name: &str) -> Value {
        self.get(name)
            .map_or(Value::Null, |v| Value::Str(v.to_string()))
    }
}

impl ScopeMut for StringStore {
    fn raw(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    fn set(&mut self, name: &str, value: Value) -> ExprResult<()> {
        let rendered = value.to_string();
        if rendered.is_empty() {
            self.entries.retain(|(k, _)| k != name);
            return Ok(());
        }
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == name) {
            entry.1 = rendered;
        } else {
            self.entries.push((name.to_string(), rendered));
        }
        Ok(())
    }
}

fn update(store: &mut StringStore, text: &str) -> ExprResult<Value> {
    let expr = Expression::compile_update(text)?;
    Engine::with_defaults().eval_update(&expr, store)
}

#[test]
fn test_expression_reuse_across_scopes() {
    let expr = Expression::compile("foo + bar").unwrap();
    let engine = Engine::with_defaults();

    let ints = [("foo", Value::Int(1)), ("bar", Value::Int(2))];
    assert_eq!(engine.eval(&expr, &MapScope(&ints)).unwrap(), Value::Int(3));

    let strs = [
        ("foo", Value::Str("a".to_string())),
        ("bar", Value::Str("b".to_string())),
    ];
    assert_eq!(
        engine.eval(&expr, &MapScope(&strs)).unwrap(),
        Value::Str("ab".to_string())
    );
}

#[test]
fn test_source_text_is_retained() {
    let expr = Expression::compile("register == 1").unwrap();
    assert_eq!(expr.source(), "register == 1");
}

#[test]
fn test_augmented_collection_sequence() {
    let mut store = StringStore::default();

    update(&mut store, "contacts += 'foo'").unwrap();
    assert_eq!(store.get("contacts"), Some("foo"));

    update(&mut store, "contacts += 'bar'").unwrap();
    assert_eq!(store.get("contacts"), Some("foo,bar"));

    // Idempotent append
    update(&mut store, "contacts += 'foo'").unwrap();
    assert_eq!(store.get("contacts"), Some("foo,bar"));

    update(&mut store, "contacts -= 'foo'").unwrap();
    assert_eq!(store.get("contacts"), Some("bar"));

    // Removing the last member removes the entry, not an empty string
    update(&mut store, "contacts -= 'bar'").unwrap();
    assert_eq!(store.get("contacts"), None);

    // Removing from an absent entry is not an error
    update(&mut store, "contacts -= 'bar'").unwrap();
    assert_eq!(store.get("contacts"), None);
}

#[test]
fn test_assignment_returns_assigned_value() {
    let mut store = StringStore::default();
    let value = update(&mut store, "register = 0").unwrap();
    assert_eq!(value, Value::Int(0));
    assert_eq!(store.get("register"), Some("0"));
}

#[test]
fn test_assignment_of_null_removes() {
    let mut store = StringStore::default();
    update(&mut store, "notes = 'temp'").unwrap();
    update(&mut store, "notes = None").unwrap();
    assert_eq!(store.get("notes"), None);
}

#[test]
fn test_assignment_of_empty_string_removes() {
    let mut store = StringStore::default();
    update(&mut store, "notes = 'temp'").unwrap();
    update(&mut store, "notes = ''").unwrap();
    assert_eq!(store.get("notes"), None);
}

#[test]
fn test_assignment_rejects_boolean_and_list() {
    let mut store = StringStore::default();
    assert!(matches!(
        update(&mut store, "register = True"),
        Err(ExprError::Runtime(_))
    ));
    assert!(matches!(
        update(&mut store, "contacts = ['a', 'b']"),
        Err(ExprError::Runtime(_))
    ));
}

#[test]
fn test_assignment_accepts_string_int_float() {
    let mut store = StringStore::default();
    update(&mut store, "a = 'text'").unwrap();
    update(&mut store, "b = 3").unwrap();
    update(&mut store, "c = 2.5").unwrap();
    assert_eq!(store.get("a"), Some("text"));
    assert_eq!(store.get("b"), Some("3"));
    assert_eq!(store.get("c"), Some("2.5"));
}

#[test]
fn test_other_augmented_operators_fall_back_to_arithmetic() {
    let mut store = StringStore::default();
    update(&mut store, "weight = 4").unwrap();
    // `*=` is plain arithmetic, not collection manipulation; this store
    // reads everything back as a string, so multiplication is a type
    // violation rather than an append.
    assert!(matches!(
        update(&mut store, "weight *= 2"),
        Err(ExprError::InvalidExpression(_))
    ));
    // An explicit conversion makes the same arithmetic succeed.
    update(&mut store, "weight = int(weight) * 2").unwrap();
    assert_eq!(store.get("weight"), Some("8"));
}

#[test]
fn test_filter_compilation_rejects_mutation() {
    assert!(matches!(
        Expression::compile("register = 0"),
        Err(ExprError::InvalidExpression(_))
    ));
    assert!(matches!(
        Expression::compile("contacts += 'x'"),
        Err(ExprError::InvalidExpression(_))
    ));
}

#[test]
fn test_syntax_error_carries_text_and_offset() {
    let err = Expression::compile("host_name == ").unwrap_err();
    match &err {
        ExprError::Syntax { text, offset } => {
            assert_eq!(text, "host_name == ");
            assert_eq!(*offset, 13);
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
    let diagnostic = err.caret_diagnostic().unwrap();
    assert!(diagnostic.ends_with('^'));
}

#[test]
fn test_update_mode_allows_plain_expressions() {
    let mut store = StringStore::default();
    let value = update(&mut store, "1 + 1").unwrap();
    assert_eq!(value, Value::Int(2));
}
