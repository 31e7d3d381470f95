use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of variants a flag's value may take. A runtime value
/// whose tag disagrees with the flag's declared type is a parse error, not
/// a silent coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FlagValue {
    #[serde(rename = "BOOLEAN")]
    Boolean(bool),
    #[serde(rename = "INTEGER")]
    Integer(i64),
    #[serde(rename = "DOUBLE")]
    Double(f64),
    #[serde(rename = "STRING")]
    String(String),
    #[serde(rename = "ENUM")]
    Enum(EnumValue),
    #[serde(rename = "STRUCT")]
    Struct(StructValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub variant: String,
}

/// A structured tree of named fields, kept in key order so `encode` is
/// deterministic without a separate sort pass. Leaves are plain JSON:
/// shape is enforced separately by the flag's declared `FieldShape`
/// (see `schema` module), not by recursive `FlagValue` tagging.
pub type StructValue = BTreeMap<String, serde_json::Value>;

/// The tag identifying which `FlagValue` variant a flag declares. Used by
/// the parse boundary to reject a value whose variant disagrees with the
/// flag's declared type, and by custom-predicate declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    Integer,
    Double,
    String,
    Enum,
    Struct,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Boolean => "BOOLEAN",
            ValueKind::Integer => "INTEGER",
            ValueKind::Double => "DOUBLE",
            ValueKind::String => "STRING",
            ValueKind::Enum => "ENUM",
            ValueKind::Struct => "STRUCT",
        };
        write!(f, "{s}")
    }
}

impl FlagValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FlagValue::Boolean(_) => ValueKind::Boolean,
            FlagValue::Integer(_) => ValueKind::Integer,
            FlagValue::Double(_) => ValueKind::Double,
            FlagValue::String(_) => ValueKind::String,
            FlagValue::Enum(_) => ValueKind::Enum,
            FlagValue::Struct(_) => ValueKind::Struct,
        }
    }
}

/// Narrows an untyped `FlagValue` into the caller's declared Rust type and
/// back. This is the "phantom tag that narrows accessors" the design notes
/// describe in place of first-class generic variants: a flag is declared in
/// source as `Flag<bool>`, `Flag<MyEnum>`, etc, and this trait is the seam
/// between the closed `FlagValue` wire representation and that declared
/// type.
pub trait FlagValueType: Sized + Clone + Send + Sync + 'static {
    fn kind() -> ValueKind;
    fn from_value(value: &FlagValue) -> Option<Self>;
    fn into_value(self) -> FlagValue;
}

impl FlagValueType for bool {
    fn kind() -> ValueKind {
        ValueKind::Boolean
    }

    fn from_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn into_value(self) -> FlagValue {
        FlagValue::Boolean(self)
    }
}

impl FlagValueType for i64 {
    fn kind() -> ValueKind {
        ValueKind::Integer
    }

    fn from_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    fn into_value(self) -> FlagValue {
        FlagValue::Integer(self)
    }
}

impl FlagValueType for f64 {
    fn kind() -> ValueKind {
        ValueKind::Double
    }

    fn from_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    fn into_value(self) -> FlagValue {
        FlagValue::Double(self)
    }
}

impl FlagValueType for String {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn from_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> FlagValue {
        FlagValue::String(self)
    }
}

/// The untyped narrowing for `ENUM`-kind flags: hosts that want a real Rust
/// enum (`MyTier::Gold`) implement `FlagValueType` on their own type instead,
/// converting to/from `EnumValue` in `from_value`/`into_value`; this impl
/// covers the case where a caller is content to work with the raw
/// `(name, variant)` pair.
impl FlagValueType for EnumValue {
    fn kind() -> ValueKind {
        ValueKind::Enum
    }

    fn from_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Enum(e) => Some(e.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> FlagValue {
        FlagValue::Enum(self)
    }
}

/// The untyped narrowing for `STRUCT`-kind flags, mirroring `EnumValue`
/// above: hosts wanting a concrete struct type convert to/from `StructValue`
/// in their own `FlagValueType` impl.
impl FlagValueType for StructValue {
    fn kind() -> ValueKind {
        ValueKind::Struct
    }

    fn from_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Struct(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> FlagValue {
        FlagValue::Struct(self)
    }
}
