//! Identifier and name registries for types and containers
//!
//! Trace events reference types and containers by identifier (the alias of
//! the declaring event when one was given, the name otherwise); user
//! interfaces look them up by name. Each registry keeps both indices and
//! they are updated together, so the two never disagree.

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

use paje_core::color::Color;
use paje_core::error::container::ContainerError;
use paje_core::error::types::TypeError;
use paje_core::time::Timestamp;

use crate::container::Container;
use crate::types::{EntityType, EntityValue};

/// The identifier a definition registers under: the alias when one was
/// supplied, the name otherwise
fn choose_identifier<'a>(name: &'a str, alias: &'a str) -> &'a str {
    if alias.is_empty() { name } else { alias }
}

/// The global registry of trace types
///
/// Owns the root container type (identifier and name `"0"`) and resolves
/// every type a trace declares. Definitions check that the parent resolves
/// to a container type and that the chosen identifier and name are fresh
/// before anything is inserted.
///
/// # Examples
///
/// ```rust
/// use paje_model::{TypeRegistry, TypeNature};
///
/// let types = TypeRegistry::new();
/// let proc_type = types.define_container_type("0", "Process", "P").unwrap();
/// assert_eq!(proc_type.nature(), TypeNature::Container);
/// assert!(types.get("P").is_some());
/// assert!(types.get_by_name("Process").is_some());
/// ```
#[derive(Debug)]
pub struct TypeRegistry {
    root: Arc<EntityType>,
    by_identifier: DashMap<String, Arc<EntityType>>,
    by_name: DashMap<String, Arc<EntityType>>,
}

impl TypeRegistry {
    /// Creates a registry holding only the root container type
    pub fn new() -> Self {
        let root = EntityType::new_container("0".to_string(), "0".to_string(), Weak::new());
        let registry = Self {
            root: root.clone(),
            by_identifier: DashMap::new(),
            by_name: DashMap::new(),
        };
        registry.register(&root);
        registry
    }

    /// The root container type
    pub fn root(&self) -> Arc<EntityType> {
        self.root.clone()
    }

    /// Resolves a type by identifier
    pub fn get(&self, identifier: &str) -> Option<Arc<EntityType>> {
        self.by_identifier.get(identifier).map(|t| t.clone())
    }

    /// Resolves a type by display name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<EntityType>> {
        self.by_name.get(name).map(|t| t.clone())
    }

    /// Number of registered types, the root included
    pub fn type_count(&self) -> usize {
        self.by_identifier.len()
    }

    fn register(&self, node: &Arc<EntityType>) {
        self.by_identifier
            .insert(node.identifier().to_string(), node.clone());
        self.by_name.insert(node.name().to_string(), node.clone());
    }

    fn resolve_parent(&self, parent_identifier: &str) -> Result<Arc<EntityType>, TypeError> {
        let parent = self.get(parent_identifier).ok_or_else(|| {
            TypeError::unknown(format!("container type '{}'", parent_identifier))
        })?;
        if !parent.is_container() {
            return Err(TypeError::not_container(format!(
                "type '{}'",
                parent_identifier
            )));
        }
        Ok(parent)
    }

    fn ensure_fresh(&self, identifier: &str, name: &str) -> Result<(), TypeError> {
        if self.by_identifier.contains_key(identifier) || self.by_name.contains_key(name) {
            return Err(TypeError::duplicate(format!("type '{}'", identifier)));
        }
        Ok(())
    }

    fn define<F>(
        &self,
        parent_identifier: &str,
        name: &str,
        alias: &str,
        construct: F,
    ) -> Result<Arc<EntityType>, TypeError>
    where
        F: FnOnce(String, String, Weak<EntityType>) -> Arc<EntityType>,
    {
        let parent = self.resolve_parent(parent_identifier)?;
        let identifier = choose_identifier(name, alias);
        self.ensure_fresh(identifier, name)?;
        let node = construct(
            identifier.to_string(),
            name.to_string(),
            Arc::downgrade(&parent),
        );
        parent.add_child(node.clone());
        self.register(&node);
        debug!(nature = %node.nature(), identifier = %node.identifier(), parent = %parent.identifier(), "defined type");
        Ok(node)
    }

    /// Defines a container type under an existing container type
    pub fn define_container_type(
        &self,
        parent_identifier: &str,
        name: &str,
        alias: &str,
    ) -> Result<Arc<EntityType>, TypeError> {
        self.define(parent_identifier, name, alias, EntityType::new_container)
    }

    /// Defines an event type under an existing container type
    pub fn define_event_type(
        &self,
        parent_identifier: &str,
        name: &str,
        alias: &str,
    ) -> Result<Arc<EntityType>, TypeError> {
        self.define(parent_identifier, name, alias, EntityType::new_event)
    }

    /// Defines a state type under an existing container type
    pub fn define_state_type(
        &self,
        parent_identifier: &str,
        name: &str,
        alias: &str,
    ) -> Result<Arc<EntityType>, TypeError> {
        self.define(parent_identifier, name, alias, EntityType::new_state)
    }

    /// Defines a variable type under an existing container type
    pub fn define_variable_type(
        &self,
        parent_identifier: &str,
        name: &str,
        alias: &str,
        color: Option<Color>,
    ) -> Result<Arc<EntityType>, TypeError> {
        self.define(parent_identifier, name, alias, |identifier, name, parent| {
            EntityType::new_variable(identifier, name, parent, color)
        })
    }

    /// Defines a link type under an existing container type
    ///
    /// The start and end identifiers must resolve to container types; they
    /// need not be descendants of the parent.
    pub fn define_link_type(
        &self,
        parent_identifier: &str,
        name: &str,
        alias: &str,
        start_identifier: &str,
        end_identifier: &str,
    ) -> Result<Arc<EntityType>, TypeError> {
        self.resolve_parent(parent_identifier)?;
        let start_type = self.resolve_endpoint(start_identifier, "start")?;
        let end_type = self.resolve_endpoint(end_identifier, "end")?;
        self.define(parent_identifier, name, alias, |identifier, name, parent| {
            EntityType::new_link(identifier, name, parent, &start_type, &end_type)
        })
    }

    fn resolve_endpoint(
        &self,
        identifier: &str,
        side: &str,
    ) -> Result<Arc<EntityType>, TypeError> {
        let endpoint = self.get(identifier).ok_or_else(|| {
            TypeError::unknown(format!(
                "{} container type '{}' for link definition",
                side, identifier
            ))
        })?;
        if !endpoint.is_container() {
            return Err(TypeError::not_container(format!(
                "{} container type '{}' for link definition",
                side, identifier
            )));
        }
        Ok(endpoint)
    }

    /// Declares a value on an existing event, state or link type
    pub fn define_value(
        &self,
        type_identifier: &str,
        name: &str,
        alias: &str,
        color: Option<Color>,
    ) -> Result<Arc<EntityValue>, TypeError> {
        let owner = self
            .get(type_identifier)
            .ok_or_else(|| TypeError::unknown(format!("type '{}'", type_identifier)))?;
        owner.add_value(alias, name, color)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The global registry of containers
///
/// Owns the root container (identifier and name `"0"`, created at time 0)
/// and resolves every container the trace creates. Like the type registry
/// it is indexed both by identifier and by name.
#[derive(Debug)]
pub struct ContainerRegistry {
    root: Arc<Container>,
    by_identifier: DashMap<String, Arc<Container>>,
    by_name: DashMap<String, Arc<Container>>,
}

impl ContainerRegistry {
    /// Creates a registry holding only the root container
    ///
    /// # Arguments
    ///
    /// * `root_type` - The root container type classifying the root container
    pub fn new(root_type: Arc<EntityType>) -> Self {
        let root = Container::new(
            "0".to_string(),
            "0".to_string(),
            root_type,
            Weak::new(),
            0.0,
        );
        let registry = Self {
            root: root.clone(),
            by_identifier: DashMap::new(),
            by_name: DashMap::new(),
        };
        registry.register(&root);
        registry
    }

    /// The root container
    pub fn root(&self) -> Arc<Container> {
        self.root.clone()
    }

    /// Resolves a container by identifier
    pub fn get(&self, identifier: &str) -> Option<Arc<Container>> {
        self.by_identifier.get(identifier).map(|c| c.clone())
    }

    /// Resolves a container by display name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<Container>> {
        self.by_name.get(name).map(|c| c.clone())
    }

    /// Number of registered containers, the root included
    pub fn container_count(&self) -> usize {
        self.by_identifier.len()
    }

    fn register(&self, container: &Arc<Container>) {
        self.by_identifier
            .insert(container.identifier().to_string(), container.clone());
        self.by_name
            .insert(container.name().to_string(), container.clone());
    }

    /// Creates a container under an existing parent
    ///
    /// The chosen identifier (alias-or-name) and the name must both be
    /// fresh. The caller is responsible for checking that the container
    /// type's parent matches the parent container's type.
    pub fn create(
        &self,
        container_type: &Arc<EntityType>,
        parent: &Arc<Container>,
        name: &str,
        alias: &str,
        time: Timestamp,
    ) -> Result<Arc<Container>, ContainerError> {
        let identifier = choose_identifier(name, alias);
        if self.by_identifier.contains_key(identifier) || self.by_name.contains_key(name) {
            return Err(ContainerError::duplicate(format!(
                "(container, name: '{}' alias: '{}')",
                name, alias
            )));
        }
        let container = Container::new(
            identifier.to_string(),
            name.to_string(),
            container_type.clone(),
            Arc::downgrade(parent),
            time,
        );
        parent.attach_child(container.clone());
        self.register(&container);
        debug!(identifier = %container.identifier(), parent = %parent.identifier(), time, "created container");
        Ok(container)
    }

    /// Destroys every container still alive at the given time
    ///
    /// Walks the whole tree from the root, closing open states, variables
    /// and pending link starts along the way. Used at end of input.
    pub fn recursive_destroy_at(&self, time: Timestamp) {
        self.root.destroy(time);
    }
}
