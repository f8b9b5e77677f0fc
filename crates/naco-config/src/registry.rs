//! The closed set of recognized object definition types

use crate::object::ObjectDefinition;

/// Type tag of an object definition.
///
/// The set of recognized types is closed; adding one means extending this
/// enum and the declaration table in [`TypeRegistry::builtin`]. Unrecognized
/// type names parse into [`ObjectType::Generic`], which keeps the name as
/// ordinary state and derives no identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectType {
    Host,
    Service,
    Command,
    Contact,
    Contactgroup,
    Hostgroup,
    Servicegroup,
    Timeperiod,
    /// Unregistered type, keeping the name as written
    Generic(String),
}

impl ObjectType {
    /// The configuration keyword for this type
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ObjectType::Host => "host",
            ObjectType::Service => "service",
            ObjectType::Command => "command",
            ObjectType::Contact => "contact",
            ObjectType::Contactgroup => "contactgroup",
            ObjectType::Hostgroup => "hostgroup",
            ObjectType::Servicegroup => "servicegroup",
            ObjectType::Timeperiod => "timeperiod",
            ObjectType::Generic(name) => name,
        }
    }

    /// Derive the identifier of `objdef` under this type's rule.
    ///
    /// Services identify as `host_name;service_description`, falling back
    /// to `hostgroup_name;service_description`, else the bare description.
    /// The other registered types identify by their `<type>_name`
    /// directive. Generic objects have no identifier.
    #[must_use]
    pub fn identifier(&self, objdef: &ObjectDefinition) -> Option<String> {
        let name_of = |key: &str| objdef.raw_get(key).map(str::to_string);
        match self {
            ObjectType::Host => name_of("host_name"),
            ObjectType::Service => {
                let description = name_of("service_description")?;
                let owner = name_of("host_name").or_else(|| name_of("hostgroup_name"));
                match owner {
                    Some(owner) => Some(format!("{owner};{description}")),
                    None => Some(description),
                }
            }
            ObjectType::Command => name_of("command_name"),
            ObjectType::Contact => name_of("contact_name"),
            ObjectType::Contactgroup => name_of("contactgroup_name"),
            ObjectType::Hostgroup => name_of("hostgroup_name"),
            ObjectType::Servicegroup => name_of("servicegroup_name"),
            ObjectType::Timeperiod => name_of("timeperiod_name"),
            ObjectType::Generic(_) => None,
        }
    }

    /// Computed read-only directive names for this type. These shadow
    /// stored directives on lookup and reject assignment.
    #[must_use]
    pub fn computed_names(&self) -> &'static [&'static str] {
        &["type"]
    }

    /// Whether `key` names a computed directive of this type
    #[must_use]
    pub fn is_computed(&self, key: &str) -> bool {
        self.computed_names().contains(&key)
    }
}

/// Registry resolving type keywords to their [`ObjectType`].
///
/// Built once at startup from the static declaration list below and passed
/// explicitly into parser constructors; there is no global registration.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    registered: Vec<(&'static str, ObjectType)>,
}

impl TypeRegistry {
    /// The built-in Naemon object types
    #[must_use]
    pub fn builtin() -> Self {
        TypeRegistry {
            registered: vec![
                ("host", ObjectType::Host),
                ("service", ObjectType::Service),
                ("command", ObjectType::Command),
                ("contact", ObjectType::Contact),
                ("contactgroup", ObjectType::Contactgroup),
                ("hostgroup", ObjectType::Hostgroup),
                ("servicegroup", ObjectType::Servicegroup),
                ("timeperiod", ObjectType::Timeperiod),
            ],
        }
    }

    /// Resolve a type keyword, falling back to a generic record type
    #[must_use]
    pub fn resolve(&self, name: &str) -> ObjectType {
        self.registered
            .iter()
            .find(|(keyword, _)| *keyword == name)
            .map_or_else(
                || ObjectType::Generic(name.to_string()),
                |(_, objtype)| objtype.clone(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered() {
        let registry = TypeRegistry::builtin();
        assert_eq!(registry.resolve("host"), ObjectType::Host);
        assert_eq!(registry.resolve("timeperiod"), ObjectType::Timeperiod);
    }

    #[test]
    fn test_resolve_unregistered_falls_back_to_generic() {
        let registry = TypeRegistry::builtin();
        assert_eq!(
            registry.resolve("widget"),
            ObjectType::Generic("widget".to_string())
        );
        assert_eq!(registry.resolve("widget").name(), "widget");
    }
}
