//! The object definition record and its canonical serialization

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use naco_expr::{ExprError, ExprResult, Scope, ScopeMut, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::registry::ObjectType;

/// Column the directive value starts at in canonical output
pub const KEY_WIDTH: usize = 30;

/// Directives coerced to integers on lookup. Coercion failures fall back
/// to the stored string.
const INT_DIRECTIVES: &[&str] = &[
    "active_checks_enabled",
    "check_freshness",
    "check_interval",
    "event_handler_enabled",
    "first_notification_delay",
    "flap_detection_enabled",
    "freshness_threshold",
    "high_flap_threshold",
    "hourly_value",
    "is_volatile",
    "low_flap_threshold",
    "max_check_attempts",
    "notification_interval",
    "notifications_enabled",
    "obsess",
    "obsess_over_host",
    "obsess_over_service",
    "passive_checks_enabled",
    "process_perf_data",
    "register",
    "retain_nonstatus_information",
    "retain_status_information",
    "retry_interval",
];

/// One parsed object definition: an ordered directive mapping with an
/// immutable type tag and a source reference for diagnostics.
///
/// Directive keys are unique (last write wins) and iterate in insertion
/// order, which governs canonical output.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDefinition {
    objtype: ObjectType,
    directives: Vec<(String, String)>,
    linenum: usize,
    source: Option<PathBuf>,
}

impl ObjectDefinition {
    /// New empty definition of `objtype`
    #[must_use]
    pub fn new(objtype: ObjectType, linenum: usize, source: Option<&Path>) -> Self {
        ObjectDefinition {
            objtype,
            directives: Vec::new(),
            linenum,
            source: source.map(Path::to_path_buf),
        }
    }

    /// The type tag fixed at construction
    #[must_use]
    pub fn objtype(&self) -> &ObjectType {
        &self.objtype
    }

    /// 1-based source line of the block opener; 0 when unknown
    #[must_use]
    pub fn linenum(&self) -> usize {
        self.linenum
    }

    /// The stored string for `key`, exactly as written
    #[must_use]
    pub fn raw_get(&self, key: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up `key`: computed names first, then the stored directive with
    /// table-driven integer coercion. Missing keys yield `Value::Null`.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        if self.objtype.is_computed(key) {
            return self.computed(key);
        }
        match self.raw_get(key) {
            Some(value) => coerce(key, value),
            None => Value::Null,
        }
    }

    fn computed(&self, key: &str) -> Value {
        match key {
            "type" => Value::Str(self.objtype.name().to_string()),
            _ => Value::Null,
        }
    }

    /// Insert or replace a directive, preserving first-insertion order
    pub fn set_directive(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.directives.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            self.directives.push((key.to_string(), value.to_string()));
        }
    }

    /// Remove a directive; absent keys are ignored
    pub fn remove_directive(&mut self, key: &str) {
        self.directives.retain(|(k, _)| k != key);
    }

    /// Directives in insertion order
    pub fn directives(&self) -> impl Iterator<Item = (&str, &str)> {
        self.directives
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Identifier under this record's type rule, if derivable
    #[must_use]
    pub fn identifier(&self) -> Option<String> {
        self.objtype.identifier(self)
    }

    /// Human-readable source reference for diagnostics
    #[must_use]
    pub fn location(&self) -> String {
        match (&self.source, self.linenum) {
            (Some(path), 0) => path.display().to_string(),
            (Some(path), line) => format!("{} line {line}", path.display()),
            (None, 0) => String::new(),
            (None, line) => format!("line {line}"),
        }
    }

    /// Canonical configuration rendering of this record
    #[must_use]
    pub fn render(&self) -> String {
        self.render_selected(None)
    }

    /// Canonical rendering restricted to `selected` keys (all when `None`).
    /// Directives with empty values are omitted.
    #[must_use]
    pub fn render_selected(&self, selected: Option<&[String]>) -> String {
        let mut out = format!("define {} {{\n", self.objtype.name());
        for (key, value) in &self.directives {
            if value.is_empty() {
                continue;
            }
            if let Some(keys) = selected {
                if !keys.iter().any(|k| k == key) {
                    continue;
                }
            }
            let _ = writeln!(out, "    {key:<width$} {value}", width = KEY_WIDTH);
        }
        out.push_str("}\n");
        out
    }
}

fn coerce(key: &str, value: &str) -> Value {
    if INT_DIRECTIVES.contains(&key) {
        if let Ok(parsed) = value.trim().parse::<i64>() {
            return Value::Int(parsed);
        }
    }
    Value::Str(value.to_string())
}

impl Scope for ObjectDefinition {
    fn lookup(&self, name: &str) -> Value {
        self.get(name)
    }
}

impl ScopeMut for ObjectDefinition {
    fn raw(&self, name: &str) -> Option<String> {
        self.raw_get(name).map(str::to_string)
    }

    fn set(&mut self, name: &str, value: Value) -> ExprResult<()> {
        if self.objtype.is_computed(name) {
            return Err(ExprError::InvalidExpression(format!(
                "'{name}' is a computed directive and cannot be assigned"
            )));
        }
        let rendered = value.to_string();
        if rendered.is_empty() {
            self.remove_directive(name);
        } else {
            self.set_directive(name, &rendered);
        }
        Ok(())
    }
}

impl Serialize for ObjectDefinition {
    /// Serialize as a map with `type` first and directives in insertion
    /// order; stored directives shadowed by computed names are skipped.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.directives.len() + 1))?;
        map.serialize_entry("type", self.objtype.name())?;
        for (key, value) in &self.directives {
            if self.objtype.is_computed(key) {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
