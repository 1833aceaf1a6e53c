use std::fmt;

use serde::{Deserialize, Serialize};

use crate::container::AttributeContainer;

/// The value type an [`Attribute`] classifies its values under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Str => write!(f, "str"),
        }
    }
}

/// A typed, named dimension along which variants are classified.
///
/// Identity is `name` + `kind`; two attributes are equal iff both are equal.
/// Attributes are immutable, cheap to clone, and used as map keys throughout
/// the engine. Ordering is by name first, which also fixes the deterministic
/// disambiguation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute {
    name: String,
    kind: ValueKind,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// String-valued attribute, the common case for variant dimensions.
    pub fn str(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Str)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Bool)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Int)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// A concrete attribute value.
///
/// `Ord + Hash` so values can key the per-attribute candidate groups during
/// disambiguation and participate in structural cache keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl AttrValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttrValue::Bool(_) => ValueKind::Bool,
            AttrValue::Int(_) => ValueKind::Int,
            AttrValue::Str(_) => ValueKind::Str,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Resolution result for one attribute against one schema and one container.
///
/// Exactly one state holds: the schema knows the attribute and the container
/// carries a value (`Present`), the schema knows it but the container has no
/// entry (`Missing`), or the schema does not recognize the attribute at all
/// (`Unknown`). Every consumer of this type matches all three states
/// exhaustively; only `Present` exposes the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Present(AttrValue),
    Missing,
    Unknown,
}

impl AttributeValue {
    pub fn is_present(&self) -> bool {
        matches!(self, AttributeValue::Present(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, AttributeValue::Missing)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AttributeValue::Unknown)
    }

    /// The resolved value, `None` unless `Present`.
    pub fn get(&self) -> Option<&AttrValue> {
        match self {
            AttributeValue::Present(value) => Some(value),
            AttributeValue::Missing | AttributeValue::Unknown => None,
        }
    }
}

/// A candidate variant: anything that carries an attribute container.
pub trait HasAttributes {
    fn attributes(&self) -> &AttributeContainer;
}

impl HasAttributes for AttributeContainer {
    fn attributes(&self) -> &AttributeContainer {
        self
    }
}

impl<T: HasAttributes> HasAttributes for &T {
    fn attributes(&self) -> &AttributeContainer {
        (*self).attributes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_identity_is_name_and_kind() {
        assert_eq!(Attribute::str("flavor"), Attribute::str("flavor"));
        assert_ne!(Attribute::str("flavor"), Attribute::str("abi"));
        assert_ne!(Attribute::str("flavor"), Attribute::bool("flavor"));
    }

    #[test]
    fn attr_value_kind_matches_variant() {
        assert_eq!(AttrValue::from("release").kind(), ValueKind::Str);
        assert_eq!(AttrValue::from(7i64).kind(), ValueKind::Int);
        assert_eq!(AttrValue::from(true).kind(), ValueKind::Bool);
    }

    #[test]
    fn only_present_exposes_a_value() {
        let present = AttributeValue::Present(AttrValue::from("release"));
        assert!(present.is_present());
        assert_eq!(present.get(), Some(&AttrValue::from("release")));

        assert_eq!(AttributeValue::Missing.get(), None);
        assert_eq!(AttributeValue::Unknown.get(), None);
        assert!(AttributeValue::Missing.is_missing());
        assert!(AttributeValue::Unknown.is_unknown());
    }
}
