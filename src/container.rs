use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MatchError;
use crate::types::{AttrValue, Attribute};

/// An immutable mapping from [`Attribute`] to a value of that attribute's
/// kind.
///
/// Containers are plain value types: `Clone` produces the immutable snapshot
/// the result cache keys on, and `Eq`/`Hash` are structural, so two
/// containers built independently from the same entries are interchangeable.
/// Keys iterate in attribute order, which keeps every downstream walk
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributeContainer {
    entries: BTreeMap<Attribute, AttrValue>,
}

// Serialized as a sequence of (attribute, value) pairs: attribute identities
// are structured keys, which map-shaped formats like JSON cannot carry.
impl Serialize for AttributeContainer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

impl<'de> Deserialize<'de> for AttributeContainer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(Attribute, AttrValue)>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for (attribute, value) in pairs {
            if value.kind() != attribute.kind() {
                return Err(D::Error::custom(format!(
                    "attribute `{}` holds {} values, got a {} value",
                    attribute.name(),
                    attribute.kind(),
                    value.kind()
                )));
            }
            entries.insert(attribute, value);
        }
        Ok(Self { entries })
    }
}

impl AttributeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `attribute`, consuming and returning the container.
    ///
    /// Rejects values whose kind does not match the attribute's declared
    /// kind; binding the same attribute twice keeps the later value.
    pub fn set(
        mut self,
        attribute: Attribute,
        value: impl Into<AttrValue>,
    ) -> Result<Self, MatchError> {
        let value = value.into();
        if value.kind() != attribute.kind() {
            return Err(MatchError::TypeMismatch {
                attribute: attribute.name().to_string(),
                expected: attribute.kind(),
                actual: value.kind(),
            });
        }
        self.entries.insert(attribute, value);
        Ok(self)
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.entries.contains_key(attribute)
    }

    pub fn get(&self, attribute: &Attribute) -> Option<&AttrValue> {
        self.entries.get(attribute)
    }

    /// Attributes bound in this container, in attribute order.
    pub fn keys(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
