//! The container tree and its entity recorders
//!
//! A container is one node of the reconstructed system: it owns its child
//! containers and, per attached type, the ordered sequence of entities the
//! trace recorded on it. While the trace is simulated the container also
//! runs the open-ended machinery those entities are built from: a push/pop
//! stack per state type, a scalar register per variable type, and a
//! key-indexed pairing table per link type.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use paje_core::error::container::ContainerError;
use paje_core::time::Timestamp;

use crate::entity::Entity;
use crate::types::{EntityType, EntityValue};

/// An open state on the per-type stack, not yet closed into an interval
#[derive(Debug)]
struct OpenState {
    start: Timestamp,
    value: Arc<EntityValue>,
    depth: usize,
}

/// The scalar register a variable type accumulates into
#[derive(Debug)]
struct VariableRegister {
    current: f64,
    open_since: Timestamp,
}

/// Pending link endpoints of one link type, indexed by pairing key
#[derive(Debug, Default)]
struct LinkEndpoints {
    starts: HashMap<String, PendingEndpoint>,
    ends: HashMap<String, PendingEndpoint>,
}

#[derive(Debug)]
struct PendingEndpoint {
    time: Timestamp,
    value: Arc<EntityValue>,
    endpoint: Weak<Container>,
}

/// A link end that never found its matching start
///
/// Collected during finalization and reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanLinkEnd {
    /// Identifier of the container the end was recorded on
    pub container: String,
    /// Identifier of the link type
    pub link_type: String,
    /// The pairing key that never matched
    pub key: String,
}

/// A node of the container tree
///
/// Containers are shared through `Arc`; the parent link is a non-owning
/// back-reference, children lists are the sole owners. The root container
/// carries the literal identifier and name `"0"` and is created at time 0.
///
/// All mutation goes through `&self`: the recorders guard their working
/// state behind locks, and appends happen exclusively from the simulator's
/// active event handler.
#[derive(Debug)]
pub struct Container {
    identifier: String,
    name: String,
    container_type: Arc<EntityType>,
    parent: Weak<Container>,
    children: RwLock<Vec<Arc<Container>>>,
    creation_time: Timestamp,
    destruction: RwLock<Option<Timestamp>>,
    /// Closed entities per type identifier, in emission order
    entities: RwLock<HashMap<String, Vec<Entity>>>,
    state_stacks: Mutex<HashMap<String, Vec<OpenState>>>,
    variables: Mutex<HashMap<String, VariableRegister>>,
    links: Mutex<HashMap<String, LinkEndpoints>>,
}

impl Container {
    pub(crate) fn new(
        identifier: String,
        name: String,
        container_type: Arc<EntityType>,
        parent: Weak<Container>,
        creation_time: Timestamp,
    ) -> Arc<Self> {
        Arc::new(Self {
            identifier,
            name,
            container_type,
            parent,
            children: RwLock::new(Vec::new()),
            creation_time,
            destruction: RwLock::new(None),
            entities: RwLock::new(HashMap::new()),
            state_stacks: Mutex::new(HashMap::new()),
            variables: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn attach_child(&self, child: Arc<Container>) {
        self.children.write().push(child);
    }

    /// The identifier subsequent trace events use to reference this container
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The display name of this container
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The container type classifying this container
    pub fn container_type(&self) -> Arc<EntityType> {
        self.container_type.clone()
    }

    /// The parent container, `None` only for the root
    pub fn parent(&self) -> Option<Arc<Container>> {
        self.parent.upgrade()
    }

    /// The child containers, in creation order
    pub fn children(&self) -> Vec<Arc<Container>> {
        self.children.read().clone()
    }

    /// When this container was created
    pub fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    /// When this container was destroyed, if it has been
    pub fn destruction_time(&self) -> Option<Timestamp> {
        *self.destruction.read()
    }

    /// True once the container has been destroyed
    pub fn is_destroyed(&self) -> bool {
        self.destruction.read().is_some()
    }

    fn ensure_alive(&self) -> Result<(), ContainerError> {
        if self.is_destroyed() {
            return Err(ContainerError::destroyed(format!(
                "container '{}'",
                self.name
            )));
        }
        Ok(())
    }

    fn append(&self, type_identifier: &str, entity: Entity) {
        self.entities
            .write()
            .entry(type_identifier.to_string())
            .or_default()
            .push(entity);
    }

    /// Records an instantaneous event
    pub fn record_event(
        &self,
        event_type: &Arc<EntityType>,
        time: Timestamp,
        value: Arc<EntityValue>,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        trace!(container = %self.identifier, event_type = %event_type.identifier(), time, "event");
        self.append(event_type.identifier(), Entity::Event { time, value });
        Ok(())
    }

    /// Opens a new state at the current stack depth
    pub fn push_state(
        &self,
        state_type: &Arc<EntityType>,
        time: Timestamp,
        value: Arc<EntityValue>,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        let mut stacks = self.state_stacks.lock();
        let stack = stacks
            .entry(state_type.identifier().to_string())
            .or_default();
        let depth = stack.len();
        trace!(container = %self.identifier, state_type = %state_type.identifier(), time, depth, "push state");
        stack.push(OpenState { start: time, value, depth });
        Ok(())
    }

    /// Replaces the top of the stack: closes it and opens the new state at
    /// the same depth, or at depth 0 when the stack is empty
    pub fn set_state(
        &self,
        state_type: &Arc<EntityType>,
        time: Timestamp,
        value: Arc<EntityValue>,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        let mut stacks = self.state_stacks.lock();
        let stack = stacks
            .entry(state_type.identifier().to_string())
            .or_default();
        let depth = match stack.pop() {
            Some(open) => {
                let depth = open.depth;
                self.append(
                    state_type.identifier(),
                    Entity::State {
                        start: open.start,
                        end: time,
                        value: open.value,
                        imbrication: open.depth,
                    },
                );
                depth
            }
            None => 0,
        };
        stack.push(OpenState { start: time, value, depth });
        Ok(())
    }

    /// Closes the state on top of the stack
    pub fn pop_state(
        &self,
        state_type: &Arc<EntityType>,
        time: Timestamp,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        let mut stacks = self.state_stacks.lock();
        let open = stacks
            .get_mut(state_type.identifier())
            .and_then(|stack| stack.pop())
            .ok_or_else(|| {
                ContainerError::underflow_pop_state(format!(
                    "state type '{}' on container '{}'",
                    state_type.name(),
                    self.name
                ))
            })?;
        self.append(
            state_type.identifier(),
            Entity::State {
                start: open.start,
                end: time,
                value: open.value,
                imbrication: open.depth,
            },
        );
        Ok(())
    }

    /// Closes every open state of the given type, deepest first
    pub fn reset_state(
        &self,
        state_type: &Arc<EntityType>,
        time: Timestamp,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        let mut stacks = self.state_stacks.lock();
        if let Some(stack) = stacks.get_mut(state_type.identifier()) {
            self.drain_stack(state_type.identifier(), stack, time);
        }
        Ok(())
    }

    fn drain_stack(&self, type_identifier: &str, stack: &mut Vec<OpenState>, time: Timestamp) {
        while let Some(open) = stack.pop() {
            self.append(
                type_identifier,
                Entity::State {
                    start: open.start,
                    end: time,
                    value: open.value,
                    imbrication: open.depth,
                },
            );
        }
    }

    fn update_variable<F: FnOnce(f64) -> f64>(
        &self,
        variable_type: &Arc<EntityType>,
        time: Timestamp,
        update: F,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        let mut variables = self.variables.lock();
        match variables.get_mut(variable_type.identifier()) {
            Some(register) => {
                self.append(
                    variable_type.identifier(),
                    Entity::Variable {
                        start: register.open_since,
                        end: time,
                        value: register.current,
                    },
                );
                register.current = update(register.current);
                register.open_since = time;
            }
            None => {
                // First sample of this variable: nothing to close, the prior
                // value is taken as 0.
                variables.insert(
                    variable_type.identifier().to_string(),
                    VariableRegister {
                        current: update(0.0),
                        open_since: time,
                    },
                );
            }
        }
        Ok(())
    }

    /// Overwrites the variable, closing the interval open until now
    pub fn set_variable(
        &self,
        variable_type: &Arc<EntityType>,
        time: Timestamp,
        value: f64,
    ) -> Result<(), ContainerError> {
        self.update_variable(variable_type, time, |_| value)
    }

    /// Adds to the variable, closing the interval open until now
    pub fn add_variable(
        &self,
        variable_type: &Arc<EntityType>,
        time: Timestamp,
        value: f64,
    ) -> Result<(), ContainerError> {
        self.update_variable(variable_type, time, |current| current + value)
    }

    /// Subtracts from the variable, closing the interval open until now
    pub fn sub_variable(
        &self,
        variable_type: &Arc<EntityType>,
        time: Timestamp,
        value: f64,
    ) -> Result<(), ContainerError> {
        self.update_variable(variable_type, time, |current| current - value)
    }

    /// Records the start endpoint of a link
    ///
    /// When an end with the same key is already pending the two are paired
    /// into a finished link entity; otherwise the start waits for its end.
    pub fn start_link(
        &self,
        link_type: &Arc<EntityType>,
        time: Timestamp,
        value: Arc<EntityValue>,
        endpoint: &Arc<Container>,
        key: &str,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        let mut links = self.links.lock();
        let slots = links
            .entry(link_type.identifier().to_string())
            .or_default();
        match slots.ends.remove(key) {
            Some(end) => {
                trace!(container = %self.identifier, link_type = %link_type.identifier(), key, "link paired");
                self.append(
                    link_type.identifier(),
                    Entity::Link {
                        start: time,
                        end: end.time,
                        value,
                        start_container: Arc::downgrade(endpoint),
                        end_container: end.endpoint,
                        key: key.to_string(),
                    },
                );
            }
            None => {
                slots.starts.insert(
                    key.to_string(),
                    PendingEndpoint {
                        time,
                        value,
                        endpoint: Arc::downgrade(endpoint),
                    },
                );
            }
        }
        Ok(())
    }

    /// Records the end endpoint of a link
    ///
    /// The finished link keeps the value its start endpoint carried.
    pub fn end_link(
        &self,
        link_type: &Arc<EntityType>,
        time: Timestamp,
        value: Arc<EntityValue>,
        endpoint: &Arc<Container>,
        key: &str,
    ) -> Result<(), ContainerError> {
        self.ensure_alive()?;
        let mut links = self.links.lock();
        let slots = links
            .entry(link_type.identifier().to_string())
            .or_default();
        match slots.starts.remove(key) {
            Some(start) => {
                trace!(container = %self.identifier, link_type = %link_type.identifier(), key, "link paired");
                self.append(
                    link_type.identifier(),
                    Entity::Link {
                        start: start.time,
                        end: time,
                        value: start.value,
                        start_container: start.endpoint,
                        end_container: Arc::downgrade(endpoint),
                        key: key.to_string(),
                    },
                );
            }
            None => {
                slots.ends.insert(
                    key.to_string(),
                    PendingEndpoint {
                        time,
                        value,
                        endpoint: Arc::downgrade(endpoint),
                    },
                );
            }
        }
        Ok(())
    }

    fn close_states(&self, time: Timestamp) {
        let mut stacks = self.state_stacks.lock();
        let mut drained: Vec<(String, Vec<OpenState>)> = Vec::new();
        for (type_identifier, stack) in stacks.iter_mut() {
            if !stack.is_empty() {
                drained.push((type_identifier.clone(), std::mem::take(stack)));
            }
        }
        for (type_identifier, mut stack) in drained {
            self.drain_stack(&type_identifier, &mut stack, time);
        }
    }

    fn close_variables(&self, time: Timestamp) {
        let mut variables = self.variables.lock();
        for (type_identifier, register) in variables.drain() {
            self.append(
                &type_identifier,
                Entity::Variable {
                    start: register.open_since,
                    end: time,
                    value: register.current,
                },
            );
        }
    }

    fn close_pending_link_starts(&self, time: Timestamp) {
        let mut links = self.links.lock();
        for (type_identifier, slots) in links.iter_mut() {
            for (key, start) in slots.starts.drain() {
                self.append(
                    type_identifier,
                    Entity::Link {
                        start: start.time,
                        end: time,
                        value: start.value,
                        start_container: start.endpoint,
                        end_container: Weak::new(),
                        key,
                    },
                );
            }
        }
    }

    /// Destroys this container and all its descendants
    ///
    /// Every open state, variable register and pending link start is closed
    /// at the destruction time. Destroying an already destroyed container
    /// leaves it untouched. The container stays in the model; its entities
    /// remain queryable.
    pub fn destroy(&self, time: Timestamp) {
        if self.destruction.read().is_none() {
            self.close_states(time);
            self.close_variables(time);
            self.close_pending_link_starts(time);
            *self.destruction.write() = Some(time);
            debug!(container = %self.identifier, time, "destroyed container");
        }
        for child in self.children.read().iter() {
            child.destroy(time);
        }
    }

    /// Removes and reports every link end still waiting for its start,
    /// recursively over the subtree
    pub fn drain_orphan_link_ends(&self, out: &mut Vec<OrphanLinkEnd>) {
        {
            let mut links = self.links.lock();
            for (type_identifier, slots) in links.iter_mut() {
                for key in slots.ends.drain().map(|(key, _)| key) {
                    out.push(OrphanLinkEnd {
                        container: self.identifier.clone(),
                        link_type: type_identifier.clone(),
                        key,
                    });
                }
            }
        }
        for child in self.children.read().iter() {
            child.drain_orphan_link_ends(out);
        }
    }

    /// The recorded entities of one type, in emission order
    pub fn entities(&self, entity_type: &Arc<EntityType>) -> Vec<Entity> {
        self.entities
            .read()
            .get(entity_type.identifier())
            .cloned()
            .unwrap_or_default()
    }

    /// The recorded entities of one type intersecting `[from, until]`
    pub fn entities_between(
        &self,
        entity_type: &Arc<EntityType>,
        from: Timestamp,
        until: Timestamp,
    ) -> Vec<Entity> {
        self.entities
            .read()
            .get(entity_type.identifier())
            .map(|sequence| {
                sequence
                    .iter()
                    .filter(|entity| entity.overlaps(from, until))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entities recorded on this container alone
    pub fn own_entity_count(&self) -> usize {
        self.entities.read().values().map(Vec::len).sum()
    }

    /// Number of entities recorded on this container and all descendants
    pub fn entity_count(&self) -> usize {
        let mut count = self.own_entity_count();
        for child in self.children.read().iter() {
            count += child.entity_count();
        }
        count
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.identifier == self.name {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.identifier)
        }
    }
}
