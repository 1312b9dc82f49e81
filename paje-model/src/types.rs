//! The type tree of a trace
//!
//! Every container and every entity recorded on a container is classified by
//! a type. Types form a tree rooted at the container type `"0"`: container
//! types may contain further types, the other kinds are leaves. Event, state
//! and link types additionally own a set of declared symbolic values.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

use paje_core::color::Color;
use paje_core::error::types::TypeError;

/// The five kinds of types a trace can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeNature {
    /// Classifies containers; the only kind that may contain other types
    Container,
    /// Classifies instantaneous events
    Event,
    /// Classifies state intervals built from a push/pop stack
    State,
    /// Classifies piecewise-constant numeric samples
    Variable,
    /// Classifies links pairing a start and an end container
    Link,
}

impl TypeNature {
    /// Returns the nature as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeNature::Container => "container",
            TypeNature::Event => "event",
            TypeNature::State => "state",
            TypeNature::Variable => "variable",
            TypeNature::Link => "link",
        }
    }
}

impl fmt::Display for TypeNature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbolic value declared on an event, state or link type
///
/// Values carry an identifier (what later events reference), a display name,
/// and an optional color for renderers.
#[derive(Debug)]
pub struct EntityValue {
    identifier: String,
    name: String,
    color: Option<Color>,
}

impl EntityValue {
    fn new(identifier: String, name: String, color: Option<Color>) -> Self {
        Self {
            identifier,
            name,
            color,
        }
    }

    /// The identifier subsequent trace events use to reference this value
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The display name of this value
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared color, if any
    pub fn color(&self) -> Option<Color> {
        self.color
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The set of values declared on one type, indexed by identifier
#[derive(Debug, Default)]
struct ValueSet {
    by_identifier: DashMap<String, Arc<EntityValue>>,
    ordered: RwLock<Vec<Arc<EntityValue>>>,
}

impl ValueSet {
    fn get(&self, identifier: &str) -> Option<Arc<EntityValue>> {
        self.by_identifier.get(identifier).map(|v| v.clone())
    }

    fn insert(&self, value: Arc<EntityValue>) {
        self.by_identifier
            .insert(value.identifier().to_string(), value.clone());
        self.ordered.write().push(value);
    }

    fn values(&self) -> Vec<Arc<EntityValue>> {
        self.ordered.read().clone()
    }
}

/// Per-nature payload of a type node
#[derive(Debug)]
enum TypePayload {
    Container {
        children: RwLock<Vec<Arc<EntityType>>>,
    },
    Event {
        values: ValueSet,
    },
    State {
        values: ValueSet,
    },
    Variable {
        color: Option<Color>,
    },
    Link {
        values: ValueSet,
        start_type: Weak<EntityType>,
        end_type: Weak<EntityType>,
    },
}

/// A node of the type tree
///
/// Types are shared through `Arc`; the parent link is a non-owning
/// back-reference, children lists are the sole owners. The root container
/// type carries the literal identifier and name `"0"`.
#[derive(Debug)]
pub struct EntityType {
    identifier: String,
    name: String,
    parent: Weak<EntityType>,
    payload: TypePayload,
}

impl EntityType {
    fn new(
        identifier: String,
        name: String,
        parent: Weak<EntityType>,
        payload: TypePayload,
    ) -> Arc<Self> {
        Arc::new(Self {
            identifier,
            name,
            parent,
            payload,
        })
    }

    pub(crate) fn new_container(
        identifier: String,
        name: String,
        parent: Weak<EntityType>,
    ) -> Arc<Self> {
        Self::new(
            identifier,
            name,
            parent,
            TypePayload::Container {
                children: RwLock::new(Vec::new()),
            },
        )
    }

    pub(crate) fn new_event(
        identifier: String,
        name: String,
        parent: Weak<EntityType>,
    ) -> Arc<Self> {
        Self::new(
            identifier,
            name,
            parent,
            TypePayload::Event {
                values: ValueSet::default(),
            },
        )
    }

    pub(crate) fn new_state(
        identifier: String,
        name: String,
        parent: Weak<EntityType>,
    ) -> Arc<Self> {
        Self::new(
            identifier,
            name,
            parent,
            TypePayload::State {
                values: ValueSet::default(),
            },
        )
    }

    pub(crate) fn new_variable(
        identifier: String,
        name: String,
        parent: Weak<EntityType>,
        color: Option<Color>,
    ) -> Arc<Self> {
        Self::new(identifier, name, parent, TypePayload::Variable { color })
    }

    pub(crate) fn new_link(
        identifier: String,
        name: String,
        parent: Weak<EntityType>,
        start_type: &Arc<EntityType>,
        end_type: &Arc<EntityType>,
    ) -> Arc<Self> {
        Self::new(
            identifier,
            name,
            parent,
            TypePayload::Link {
                values: ValueSet::default(),
                start_type: Arc::downgrade(start_type),
                end_type: Arc::downgrade(end_type),
            },
        )
    }

    /// The identifier subsequent trace events use to reference this type
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The display name of this type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of this type
    pub fn nature(&self) -> TypeNature {
        match &self.payload {
            TypePayload::Container { .. } => TypeNature::Container,
            TypePayload::Event { .. } => TypeNature::Event,
            TypePayload::State { .. } => TypeNature::State,
            TypePayload::Variable { .. } => TypeNature::Variable,
            TypePayload::Link { .. } => TypeNature::Link,
        }
    }

    /// True for container types
    pub fn is_container(&self) -> bool {
        matches!(self.payload, TypePayload::Container { .. })
    }

    /// The parent type, `None` only for the root
    pub fn parent(&self) -> Option<Arc<EntityType>> {
        self.parent.upgrade()
    }

    /// True if `candidate` is this type's parent
    pub fn is_child_of(&self, candidate: &Arc<EntityType>) -> bool {
        self.parent
            .upgrade()
            .is_some_and(|p| Arc::ptr_eq(&p, candidate))
    }

    /// The types contained in this container type, in declaration order
    ///
    /// Empty for non-container types.
    pub fn children(&self) -> Vec<Arc<EntityType>> {
        match &self.payload {
            TypePayload::Container { children } => children.read().clone(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn add_child(&self, child: Arc<EntityType>) {
        if let TypePayload::Container { children } = &self.payload {
            children.write().push(child);
        }
    }

    /// The declared color of a variable type
    pub fn color(&self) -> Option<Color> {
        match &self.payload {
            TypePayload::Variable { color } => *color,
            _ => None,
        }
    }

    /// The container type expected at the start of links of this type
    pub fn start_type(&self) -> Option<Arc<EntityType>> {
        match &self.payload {
            TypePayload::Link { start_type, .. } => start_type.upgrade(),
            _ => None,
        }
    }

    /// The container type expected at the end of links of this type
    pub fn end_type(&self) -> Option<Arc<EntityType>> {
        match &self.payload {
            TypePayload::Link { end_type, .. } => end_type.upgrade(),
            _ => None,
        }
    }

    fn value_set(&self) -> Option<&ValueSet> {
        match &self.payload {
            TypePayload::Event { values }
            | TypePayload::State { values }
            | TypePayload::Link { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Looks up a declared value by identifier
    pub fn value(&self, identifier: &str) -> Option<Arc<EntityValue>> {
        self.value_set().and_then(|set| set.get(identifier))
    }

    /// All values declared on this type, in declaration order
    pub fn values(&self) -> Vec<Arc<EntityValue>> {
        self.value_set().map(|set| set.values()).unwrap_or_default()
    }

    /// Declares a value on this type
    ///
    /// The value's identifier is the alias when one is given, the name
    /// otherwise. Container and variable types reject value declarations,
    /// and the identifier must be fresh within this type.
    ///
    /// # Arguments
    ///
    /// * `alias` - The short identifier, may be empty
    /// * `name` - The display name
    /// * `color` - Optional color for renderers
    pub fn add_value(
        &self,
        alias: &str,
        name: &str,
        color: Option<Color>,
    ) -> Result<Arc<EntityValue>, TypeError> {
        let set = self.value_set().ok_or_else(|| {
            TypeError::invalid_for_value(format!(
                "value '{}' declared on {} type '{}'",
                name,
                self.nature(),
                self.name
            ))
        })?;
        let identifier = if alias.is_empty() { name } else { alias };
        if set.get(identifier).is_some() {
            return Err(TypeError::duplicate_value(format!(
                "value '{}' on type '{}'",
                identifier, self.name
            )));
        }
        let value = Arc::new(EntityValue::new(
            identifier.to_string(),
            name.to_string(),
            color,
        ));
        set.insert(value.clone());
        Ok(value)
    }

    /// Resolves a value by identifier, declaring it on the fly when absent
    ///
    /// Trace events may reference values that were never declared; such
    /// values are created with identifier and name equal to the raw string
    /// and no color.
    pub fn find_or_declare_value(&self, raw: &str) -> Result<Arc<EntityValue>, TypeError> {
        match self.value(raw) {
            Some(value) => Ok(value),
            None => self.add_value(raw, raw, None),
        }
    }

    /// Depth of this type in the type tree; the root is at depth 0
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.upgrade();
        while let Some(node) = current {
            depth += 1;
            current = node.parent.upgrade();
        }
        depth
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.identifier == self.name {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.identifier)
        }
    }
}
