//! Draftable entity types and their hook registrations

use std::collections::{BTreeSet, HashMap};

use crate::errors::{ExError, ExErrorKind, Result};
use crate::hooks::{Hook, HookPhase, HookRegistry};
use crate::model::{Entity, OperationType};

/// Declaration of one draftable entity type
///
/// An empty attribute list is an open schema: every attribute is captured.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    attributes: BTreeSet<String>,
    hooks: HookRegistry,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeSet::new(),
            hooks: HookRegistry::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    pub fn with_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(String::as_str)
    }

    /// True when snapshots of this type capture `name`
    pub fn declares(&self, name: &str) -> bool {
        self.attributes.is_empty() || self.attributes.contains(name)
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Builder-style [`HookRegistry::register_hook`]
    ///
    /// # Errors
    ///
    /// `InvalidInput` unless `phase` is BEFORE or AFTER.
    pub fn on(
        mut self,
        operation: OperationType,
        phase: HookPhase,
        hook: impl Hook + 'static,
    ) -> Result<Self> {
        self.hooks.register_hook(operation, phase, hook)?;
        Ok(self)
    }

    /// Builder-style [`HookRegistry::register_around`]
    pub fn around(
        mut self,
        operation: OperationType,
        pre: impl Hook + 'static,
        post: impl Hook + 'static,
    ) -> Self {
        self.hooks.register_around(operation, pre, post);
        self
    }

    /// Fresh, never persisted entity of this type
    pub fn new_entity(&self) -> Entity {
        Entity::new(self.name.clone())
    }
}

/// Entity types enrolled in drafting
#[derive(Debug, Clone, Default)]
pub struct DraftRegistry {
    schemas: HashMap<String, EntitySchema>,
}

impl DraftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrol an entity type
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a schema with the same name is registered.
    pub fn register(&mut self, schema: EntitySchema) -> Result<()> {
        if self.schemas.contains_key(schema.name()) {
            return Err(ExError::new(ExErrorKind::AlreadyExists)
                .with_op("register_schema")
                .with_message(format!("Entity type already registered: {}", schema.name())));
        }
        self.schemas.insert(schema.name().to_string(), schema);
        Ok(())
    }

    pub fn get(&self, entity_type: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity_type)
    }

    pub fn draftable(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }

    /// Registered type names, sorted
    pub fn entity_types(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
