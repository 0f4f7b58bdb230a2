use std::collections::BTreeMap;

/// A single attribute value
pub type AttributeValue = serde_json::Value;

/// Attribute name to value, ordered by name for deterministic encoding
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// A live, mutable draftable entity
///
/// The attribute bag is the in-memory state hooks mutate. It is only written
/// to the persistence collaborator by a draft manager PERSIST step, and only
/// replaced wholesale by `DraftManager::reload`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: String,
    entity_type: String,
    attributes: AttributeMap,
}

impl Entity {
    /// Create a new entity with a fresh UUIDv7 identifier and no attributes
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::now_v7().to_string(), entity_type)
    }

    /// Create an entity handle for a known identifier
    pub fn with_id(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            attributes: AttributeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// String attribute accessor; `None` when absent or not a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_str())
    }

    /// Set an attribute, returning the previous value
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    /// Builder-style attribute assignment
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.set(name, value);
        self
    }

    /// Replace the whole attribute bag (used on reload)
    pub fn replace_attributes(&mut self, attributes: AttributeMap) {
        self.attributes = attributes;
    }
}
