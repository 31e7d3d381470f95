use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::criteria::Criterion;
use crate::error::ParseError;
use crate::flag::FlagDefinition;
use crate::identity::FlagId;
use crate::value::ValueKind;

/// The minimum structural shape language needed to validate `STRUCT` flag
/// values without pulling in a general-purpose JSON-schema DSL. Closed,
/// recursive, and declared once per struct-typed flag at container-init
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Bool,
    Int,
    Float,
    Str,
    Enum(String),
    List(Box<FieldShape>),
    Nested(Vec<(String, FieldShape)>),
}

impl FieldShape {
    /// Structural validation: numbers accept both Int and Float shapes the
    /// way `serde_json::Value::Number` does not distinguish them on the
    /// wire, but an Int shape rejects a fractional value.
    pub fn validate(&self, value: &Value, flag_id: &FlagId, field: &str) -> Result<(), ParseError> {
        let violation = |reason: &str| ParseError::SchemaViolation {
            flag_id: flag_id.render(),
            field: field.to_string(),
            reason: reason.to_string(),
        };
        match (self, value) {
            (FieldShape::Bool, Value::Bool(_)) => Ok(()),
            (FieldShape::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (FieldShape::Float, Value::Number(_)) => Ok(()),
            (FieldShape::Str, Value::String(_)) => Ok(()),
            (FieldShape::Enum(_), Value::String(_)) => Ok(()),
            (FieldShape::List(inner), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item, flag_id, &format!("{field}[{i}]"))?;
                }
                Ok(())
            }
            (FieldShape::Nested(fields), Value::Object(obj)) => {
                for (name, shape) in fields {
                    let nested_field = format!("{field}.{name}");
                    match obj.get(name) {
                        Some(v) => shape.validate(v, flag_id, &nested_field)?,
                        None => return Err(violation(&format!("missing field {name:?}"))),
                    }
                }
                Ok(())
            }
            _ => Err(violation("value does not match declared shape")),
        }
    }
}

/// Per-flag schema entry: the flag as declared in source (its default
/// value, kind, and compile-time rules -- used to fill in missing flags
/// under `MissingDeclaredFlagStrategy::UseSourceDeclared`), the field shape
/// for struct-typed flags, and any source-declared criteria (chiefly
/// `Criterion::Custom`) merged into a decoded rule by its `note`.
#[derive(Debug, Clone)]
pub struct FlagSchema {
    pub source_declared: FlagDefinition,
    pub struct_shape: Option<FieldShape>,
    pub extra_criteria_by_note: HashMap<String, Vec<Criterion>>,
}

impl FlagSchema {
    pub fn new(source_declared: FlagDefinition) -> Self {
        FlagSchema {
            source_declared,
            struct_shape: None,
            extra_criteria_by_note: HashMap::new(),
        }
    }

    pub fn with_struct_shape(mut self, shape: FieldShape) -> Self {
        self.struct_shape = Some(shape);
        self
    }

    /// Custom predicates are never serialized into snapshots (design notes:
    /// "rules with custom predicates exist only in source-declared form").
    /// Registering them here is how a decoded rule -- identified by its
    /// `note` -- gets its custom criteria back at decode time.
    pub fn with_extra_criteria(mut self, note: impl Into<String>, criteria: Vec<Criterion>) -> Self {
        self.extra_criteria_by_note.insert(note.into(), criteria);
        self
    }

    pub fn value_kind(&self) -> ValueKind {
        self.source_declared.value_kind()
    }
}

/// A container's compiled schema: one entry per declared `FlagId`,
/// produced once from static declarations and cached thereafter. The
/// decoder is schema-directed -- it never reflects over Rust types.
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    flags: BTreeMap<FlagId, FlagSchema>,
}

impl CompiledSchema {
    pub fn new() -> Self {
        CompiledSchema::default()
    }

    pub fn declare(&mut self, id: FlagId, schema: FlagSchema) -> &mut Self {
        self.flags.insert(id, schema);
        self
    }

    pub fn get(&self, id: &FlagId) -> Option<&FlagSchema> {
        self.flags.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &FlagId> {
        self.flags.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_shape_requires_all_fields() {
        let shape = FieldShape::Nested(vec![
            ("enabled".to_string(), FieldShape::Bool),
            ("limit".to_string(), FieldShape::Int),
        ]);
        let id = FlagId::new("acme", "quota").unwrap();
        let ok = serde_json::json!({"enabled": true, "limit": 5});
        assert!(shape.validate(&ok, &id, "root").is_ok());

        let missing = serde_json::json!({"enabled": true});
        assert!(shape.validate(&missing, &id, "root").is_err());

        let wrong_type = serde_json::json!({"enabled": true, "limit": 5.5});
        assert!(shape.validate(&wrong_type, &id, "root").is_err());
    }

    #[test]
    fn list_shape_validates_each_item() {
        let shape = FieldShape::List(Box::new(FieldShape::Str));
        let id = FlagId::new("acme", "tags").unwrap();
        assert!(shape
            .validate(&serde_json::json!(["a", "b"]), &id, "tags")
            .is_ok());
        assert!(shape
            .validate(&serde_json::json!(["a", 1]), &id, "tags")
            .is_err());
    }
}
