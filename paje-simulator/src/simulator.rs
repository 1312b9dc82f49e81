//! The trace simulator
//!
//! `Simulator` is the top-level coordinator: it owns the type and container
//! registries, dispatches every incoming trace event to the handler
//! registered for its kind, and closes the whole model at end of input.
//! Handlers validate fully before mutating, so a rejected event leaves the
//! model exactly as it was.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

use paje_core::color::Color;
use paje_core::error::container::ContainerError;
use paje_core::error::types::TypeError;
use paje_core::time::{Timestamp, parse_number};
use paje_model::{Container, ContainerRegistry, EntityType, EntityValue, TypeNature, TypeRegistry};

use crate::config::SimulatorConfig;
use crate::error::{SimulationError, SimulationResult};
use crate::event::{SimulatorEvent, SimulatorEventPublisher, SimulatorListener};
use crate::trace::{EventKind, Field, TraceEvent};

/// Handler invoked for one event kind
type EventHandler = fn(&Simulator, &TraceEvent) -> SimulationResult<()>;

/// Counts of what a simulation has reconstructed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorStatistics {
    /// Registered types, the root included
    pub type_count: usize,
    /// Registered containers, the root included
    pub container_count: usize,
    /// Entities recorded over the whole container tree
    pub entity_count: usize,
}

/// Builder for a configured simulator
///
/// # Examples
///
/// ```rust
/// use paje_simulator::{Simulator, SimulatorConfig};
///
/// let simulator = Simulator::builder()
///     .with_config(SimulatorConfig::new().with_stop_at(100.0))
///     .build();
/// assert!(simulator.keep_simulating());
/// ```
#[derive(Default)]
pub struct SimulatorBuilder {
    config: SimulatorConfig,
    listeners: Vec<Arc<dyn SimulatorListener>>,
}

impl SimulatorBuilder {
    /// Creates a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration
    pub fn with_config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the configuration from a TOML or YAML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    pub fn with_config_file<P: AsRef<std::path::Path>>(
        mut self,
        path: P,
    ) -> SimulationResult<Self> {
        self.config = SimulatorConfig::from_file(path)?;
        Ok(self)
    }

    /// Sets the simulation cutoff
    pub fn with_stop_at(mut self, time: Timestamp) -> Self {
        self.config.stop_at = Some(time);
        self
    }

    /// Registers a listener before the simulation starts
    pub fn with_listener(mut self, listener: Arc<dyn SimulatorListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the simulator
    pub fn build(self) -> Simulator {
        let simulator = Simulator::with_config(self.config);
        for listener in self.listeners {
            simulator.add_listener(listener);
        }
        simulator
    }
}

/// The trace simulator
///
/// Feeds on a time-ordered stream of [`TraceEvent`]s and reconstructs the
/// traced system in memory: a tree of containers classified by a tree of
/// types, each container carrying its recorded entities. Ingestion is
/// single-threaded and synchronous; when the producer stops pushing events
/// it must call [`finish`](Simulator::finish) to obtain a consistent closed
/// model.
///
/// # Examples
///
/// ```rust
/// use paje_simulator::{EventKind, Field, Simulator, TraceEvent};
///
/// let simulator = Simulator::new();
/// simulator
///     .input_event(
///         &TraceEvent::new(EventKind::DefineContainerType)
///             .with_field(Field::Name, "Process")
///             .with_field(Field::Type, "0")
///             .with_field(Field::Alias, "P"),
///     )
///     .unwrap();
/// assert!(simulator.type_by_id("P").is_some());
/// ```
pub struct Simulator {
    types: TypeRegistry,
    containers: ContainerRegistry,
    dispatch: HashMap<EventKind, EventHandler>,
    config: SimulatorConfig,
    last_known_time: RwLock<Option<Timestamp>>,
    selection: RwLock<Option<(Timestamp, Timestamp)>>,
    publisher: SimulatorEventPublisher,
    finished: RwLock<bool>,
}

impl Simulator {
    /// Creates a simulator with the default configuration
    pub fn new() -> Self {
        Self::with_config(SimulatorConfig::default())
    }

    /// Creates a simulator with the given configuration
    pub fn with_config(config: SimulatorConfig) -> Self {
        let types = TypeRegistry::new();
        let containers = ContainerRegistry::new(types.root());
        Self {
            types,
            containers,
            dispatch: Self::dispatch_table(),
            config,
            last_known_time: RwLock::new(None),
            selection: RwLock::new(None),
            publisher: SimulatorEventPublisher::new(),
            finished: RwLock::new(false),
        }
    }

    /// Starts building a configured simulator
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::new()
    }

    fn dispatch_table() -> HashMap<EventKind, EventHandler> {
        let mut table: HashMap<EventKind, EventHandler> = HashMap::new();
        table.insert(
            EventKind::DefineContainerType,
            Self::define_container_type as EventHandler,
        );
        table.insert(EventKind::DefineLinkType, Self::define_link_type);
        table.insert(EventKind::DefineEventType, Self::define_event_type);
        table.insert(EventKind::DefineStateType, Self::define_state_type);
        table.insert(EventKind::DefineVariableType, Self::define_variable_type);
        table.insert(EventKind::DefineEntityValue, Self::define_entity_value);
        table.insert(EventKind::CreateContainer, Self::create_container);
        table.insert(EventKind::DestroyContainer, Self::destroy_container);
        table.insert(EventKind::NewEvent, Self::new_event);
        table.insert(EventKind::SetState, Self::set_state);
        table.insert(EventKind::PushState, Self::push_state);
        table.insert(EventKind::PopState, Self::pop_state);
        table.insert(EventKind::ResetState, Self::reset_state);
        table.insert(EventKind::SetVariable, Self::set_variable);
        table.insert(EventKind::AddVariable, Self::add_variable);
        table.insert(EventKind::SubVariable, Self::sub_variable);
        table.insert(EventKind::StartLink, Self::start_link);
        table.insert(EventKind::EndLink, Self::end_link);
        table
    }

    /// The active configuration
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Registers a listener for structural notifications
    pub fn add_listener(&self, listener: Arc<dyn SimulatorListener>) {
        self.publisher.register(listener);
    }

    /// Ingests one trace event
    ///
    /// The event's `Time` field (when present) advances the last known
    /// time, then the handler registered for the event's kind validates and
    /// applies it. A validation failure aborts the event and leaves the
    /// model in its pre-event state.
    pub fn input_event(&self, event: &TraceEvent) -> SimulationResult<()> {
        let time = self.advance_time(event)?;
        if let (Some(stop), Some(time)) = (self.config.stop_at, time) {
            if time > stop {
                warn!(%event, time, stop, "event beyond simulation cutoff discarded");
                return Ok(());
            }
        }
        let handler = self
            .dispatch
            .get(&event.kind())
            .ok_or_else(|| SimulationError::unknown_event_kind(event.to_string()))?;
        handler(self, event)
    }

    /// True while no cutoff is configured or the trace has not reached it
    pub fn keep_simulating(&self) -> bool {
        match (self.config.stop_at, *self.last_known_time.read()) {
            (Some(stop), Some(time)) => time <= stop,
            _ => true,
        }
    }

    /// Closes the whole model at the effective end time
    ///
    /// Every still-open container, state, variable and link is closed at
    /// the configured cutoff, or at the last known time when no cutoff is
    /// set. Structural notifications are emitted and the selection window
    /// is initialized to the full trace. Calling `finish` a second time is
    /// a no-op.
    ///
    /// Link ends that never found their start are reported as a single
    /// aggregated error; the model is fully finalized regardless.
    pub fn finish(&self) -> SimulationResult<()> {
        {
            let mut finished = self.finished.write();
            if *finished {
                return Ok(());
            }
            *finished = true;
        }
        let start = self.start_time();
        let end = self.end_time();
        debug!(start, end, "closing the model");
        self.containers.recursive_destroy_at(end);
        let mut orphans = Vec::new();
        self.containers.root().drain_orphan_link_ends(&mut orphans);
        self.publisher
            .publish(&SimulatorEvent::HierarchyChanged { simulator: self });
        self.publisher
            .publish(&SimulatorEvent::TimeLimitsChanged { start, end });
        self.set_selection(start, end);
        if orphans.is_empty() {
            Ok(())
        } else {
            let description = orphans
                .iter()
                .map(|orphan| {
                    format!(
                        "key '{}' of link type '{}' on container '{}'",
                        orphan.key, orphan.link_type, orphan.container
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            Err(ContainerError::orphan_link_end(description).into())
        }
    }

    // ---- time bookkeeping ----

    fn advance_time(&self, event: &TraceEvent) -> SimulationResult<Option<Timestamp>> {
        let Some(raw) = event.field(Field::Time) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let time = parse_number(raw).map_err(|_| {
            SimulationError::invalid_number(Field::Time.as_str(), raw, event.to_string())
        })?;
        let mut last = self.last_known_time.write();
        if self.config.enforce_monotonic_time {
            if let Some(last_known) = *last {
                if time < last_known {
                    return Err(SimulationError::non_monotonic_time(
                        time,
                        last_known,
                        event.to_string(),
                    ));
                }
            }
        }
        *last = Some(time);
        Ok(Some(time))
    }

    fn current_time(&self) -> Timestamp {
        (*self.last_known_time.read()).unwrap_or_else(|| self.start_time())
    }

    /// Start of the trace: the root container's creation time
    pub fn start_time(&self) -> Timestamp {
        self.containers.root().creation_time()
    }

    /// End of the trace: the cutoff when one is configured, the last known
    /// time otherwise
    pub fn end_time(&self) -> Timestamp {
        self.config
            .stop_at
            .or(*self.last_known_time.read())
            .unwrap_or_else(|| self.start_time())
    }

    // ---- selection window ----

    /// Moves the selection window and notifies listeners
    pub fn set_selection(&self, start: Timestamp, end: Timestamp) {
        *self.selection.write() = Some((start, end));
        self.publisher
            .publish(&SimulatorEvent::SelectionChanged { start, end });
    }

    /// Start of the selection window, unset before `finish`
    pub fn selection_start(&self) -> Option<Timestamp> {
        (*self.selection.read()).map(|(start, _)| start)
    }

    /// End of the selection window, unset before `finish`
    pub fn selection_end(&self) -> Option<Timestamp> {
        (*self.selection.read()).map(|(_, end)| end)
    }

    // ---- downstream queries ----

    /// The root container type
    pub fn root_type(&self) -> Arc<EntityType> {
        self.types.root()
    }

    /// The root container
    pub fn root_container(&self) -> Arc<Container> {
        self.containers.root()
    }

    /// Resolves a type by identifier
    pub fn type_by_id(&self, identifier: &str) -> Option<Arc<EntityType>> {
        self.types.get(identifier)
    }

    /// Resolves a type by display name
    pub fn type_by_name(&self, name: &str) -> Option<Arc<EntityType>> {
        self.types.get_by_name(name)
    }

    /// Resolves a container by identifier
    pub fn container_by_id(&self, identifier: &str) -> Option<Arc<Container>> {
        self.containers.get(identifier)
    }

    /// Resolves a container by display name
    pub fn container_by_name(&self, name: &str) -> Option<Arc<Container>> {
        self.containers.get_by_name(name)
    }

    /// The types contained in a container type
    pub fn contained_types(&self, container_type: &Arc<EntityType>) -> Vec<Arc<EntityType>> {
        container_type.children()
    }

    /// The child containers of a container
    pub fn children(&self, container: &Arc<Container>) -> Vec<Arc<Container>> {
        container.children()
    }

    /// Counts of the reconstructed model
    pub fn statistics(&self) -> SimulatorStatistics {
        SimulatorStatistics {
            type_count: self.types.type_count(),
            container_count: self.containers.container_count(),
            entity_count: self.containers.root().entity_count(),
        }
    }

    /// Renders the type tree depth-indented, one node per line
    pub fn type_hierarchy_dump(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self.types.root()];
        while let Some(node) = stack.pop() {
            let _ = writeln!(
                out,
                "{}{} ({})",
                "| ".repeat(node.depth()),
                node.name(),
                node.nature()
            );
            let mut children = node.children();
            while let Some(child) = children.pop() {
                stack.push(child);
            }
        }
        out
    }

    // ---- shared handler plumbing ----

    fn resolve_type(&self, identifier: &str, event: &TraceEvent) -> SimulationResult<Arc<EntityType>> {
        self.types.get(identifier).ok_or_else(|| {
            TypeError::unknown(format!("type '{}'", identifier))
                .with_context(event)
                .into()
        })
    }

    fn resolve_container(
        &self,
        identifier: &str,
        event: &TraceEvent,
    ) -> SimulationResult<Arc<Container>> {
        self.containers.get(identifier).ok_or_else(|| {
            ContainerError::unknown(format!("container '{}'", identifier))
                .with_context(event)
                .into()
        })
    }

    fn expect_nature(
        entity_type: &Arc<EntityType>,
        nature: TypeNature,
        event: &TraceEvent,
    ) -> SimulationResult<()> {
        if entity_type.nature() != nature {
            return Err(TypeError::kind_mismatch(format!(
                "type '{}' is not a {} type",
                entity_type, nature
            ))
            .with_context(event)
            .into());
        }
        Ok(())
    }

    fn expect_child_type(
        entity_type: &Arc<EntityType>,
        container: &Arc<Container>,
        event: &TraceEvent,
    ) -> SimulationResult<()> {
        let container_type = container.container_type();
        if !entity_type.is_child_of(&container_type) {
            return Err(TypeError::hierarchy_mismatch(format!(
                "type '{}' is not child type of container type '{}'",
                entity_type, container_type
            ))
            .with_context(event)
            .into());
        }
        Ok(())
    }

    /// Resolves container, type and time for an entity-recording event,
    /// validating the type's kind and its place in the hierarchy
    fn resolve_entity_context(
        &self,
        event: &TraceEvent,
        nature: TypeNature,
    ) -> SimulationResult<(Arc<Container>, Arc<EntityType>, Timestamp)> {
        let container = self.resolve_container(event.field_or_empty(Field::Container), event)?;
        let entity_type = self.resolve_type(event.field_or_empty(Field::Type), event)?;
        Self::expect_nature(&entity_type, nature, event)?;
        Self::expect_child_type(&entity_type, &container, event)?;
        Ok((container, entity_type, self.current_time()))
    }

    /// Resolves the event's `Value` field against the type's declared
    /// values, declaring a fresh one on the fly when absent
    fn resolve_value(
        entity_type: &Arc<EntityType>,
        event: &TraceEvent,
    ) -> SimulationResult<Arc<EntityValue>> {
        entity_type
            .find_or_declare_value(event.field_or_empty(Field::Value))
            .map_err(|error| error.with_context(event).into())
    }

    fn parse_color_field(event: &TraceEvent) -> SimulationResult<Option<Color>> {
        let raw = event.field_or_empty(Field::Color);
        if raw.is_empty() {
            return Ok(None);
        }
        Color::parse(raw)
            .map(Some)
            .map_err(|_| SimulationError::invalid_color(raw, event.to_string()))
    }

    fn parse_scalar_field(event: &TraceEvent) -> SimulationResult<f64> {
        let raw = event.field_or_empty(Field::Value);
        parse_number(raw).map_err(|_| {
            SimulationError::invalid_number(Field::Value.as_str(), raw, event.to_string())
        })
    }

    // ---- type definition handlers ----

    fn define_container_type(&self, event: &TraceEvent) -> SimulationResult<()> {
        self.types
            .define_container_type(
                event.field_or_empty(Field::Type),
                event.field_or_empty(Field::Name),
                event.field_or_empty(Field::Alias),
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn define_link_type(&self, event: &TraceEvent) -> SimulationResult<()> {
        self.types
            .define_link_type(
                event.field_or_empty(Field::Type),
                event.field_or_empty(Field::Name),
                event.field_or_empty(Field::Alias),
                event.field_or_empty(Field::StartContainerType),
                event.field_or_empty(Field::EndContainerType),
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn define_event_type(&self, event: &TraceEvent) -> SimulationResult<()> {
        self.types
            .define_event_type(
                event.field_or_empty(Field::Type),
                event.field_or_empty(Field::Name),
                event.field_or_empty(Field::Alias),
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn define_state_type(&self, event: &TraceEvent) -> SimulationResult<()> {
        self.types
            .define_state_type(
                event.field_or_empty(Field::Type),
                event.field_or_empty(Field::Name),
                event.field_or_empty(Field::Alias),
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn define_variable_type(&self, event: &TraceEvent) -> SimulationResult<()> {
        let color = Self::parse_color_field(event)?;
        self.types
            .define_variable_type(
                event.field_or_empty(Field::Type),
                event.field_or_empty(Field::Name),
                event.field_or_empty(Field::Alias),
                color,
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn define_entity_value(&self, event: &TraceEvent) -> SimulationResult<()> {
        let color = Self::parse_color_field(event)?;
        self.types
            .define_value(
                event.field_or_empty(Field::Type),
                event.field_or_empty(Field::Name),
                event.field_or_empty(Field::Alias),
                color,
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    // ---- container lifecycle handlers ----

    fn create_container(&self, event: &TraceEvent) -> SimulationResult<()> {
        let container_type = self.resolve_type(event.field_or_empty(Field::Type), event)?;
        if !container_type.is_container() {
            return Err(TypeError::not_container(format!("type '{}'", container_type))
                .with_context(event)
                .into());
        }
        let parent = self.resolve_container(event.field_or_empty(Field::Container), event)?;
        Self::expect_child_type(&container_type, &parent, event)?;
        self.containers
            .create(
                &container_type,
                &parent,
                event.field_or_empty(Field::Name),
                event.field_or_empty(Field::Alias),
                self.current_time(),
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn destroy_container(&self, event: &TraceEvent) -> SimulationResult<()> {
        let container_type = self.resolve_type(event.field_or_empty(Field::Type), event)?;
        let container = self.resolve_container(event.field_or_empty(Field::Name), event)?;
        if !Arc::ptr_eq(&container.container_type(), &container_type) {
            return Err(TypeError::hierarchy_mismatch(format!(
                "container '{}' does not have type '{}'",
                container, container_type
            ))
            .with_context(event)
            .into());
        }
        container.destroy(self.current_time());
        Ok(())
    }

    // ---- entity handlers ----

    fn new_event(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::Event)?;
        let value = Self::resolve_value(&entity_type, event)?;
        container
            .record_event(&entity_type, time, value)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn set_state(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::State)?;
        let value = Self::resolve_value(&entity_type, event)?;
        container
            .set_state(&entity_type, time, value)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn push_state(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::State)?;
        let value = Self::resolve_value(&entity_type, event)?;
        container
            .push_state(&entity_type, time, value)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn pop_state(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::State)?;
        container
            .pop_state(&entity_type, time)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn reset_state(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::State)?;
        container
            .reset_state(&entity_type, time)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn set_variable(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::Variable)?;
        let value = Self::parse_scalar_field(event)?;
        container
            .set_variable(&entity_type, time, value)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn add_variable(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::Variable)?;
        let value = Self::parse_scalar_field(event)?;
        container
            .add_variable(&entity_type, time, value)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn sub_variable(&self, event: &TraceEvent) -> SimulationResult<()> {
        let (container, entity_type, time) =
            self.resolve_entity_context(event, TypeNature::Variable)?;
        let value = Self::parse_scalar_field(event)?;
        container
            .sub_variable(&entity_type, time, value)
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    // ---- link handlers ----

    fn start_link(&self, event: &TraceEvent) -> SimulationResult<()> {
        let container = self.resolve_container(event.field_or_empty(Field::Container), event)?;
        let endpoint =
            self.resolve_container(event.field_or_empty(Field::StartContainer), event)?;
        let entity_type = self.resolve_type(event.field_or_empty(Field::Type), event)?;
        Self::expect_nature(&entity_type, TypeNature::Link, event)?;
        Self::expect_child_type(&entity_type, &container, event)?;
        Self::expect_endpoint_type(&entity_type, entity_type.start_type(), &endpoint, "start", event)?;
        let value = Self::resolve_value(&entity_type, event)?;
        container
            .start_link(
                &entity_type,
                self.current_time(),
                value,
                &endpoint,
                event.field_or_empty(Field::Key),
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn end_link(&self, event: &TraceEvent) -> SimulationResult<()> {
        let container = self.resolve_container(event.field_or_empty(Field::Container), event)?;
        let endpoint = self.resolve_container(event.field_or_empty(Field::EndContainer), event)?;
        let entity_type = self.resolve_type(event.field_or_empty(Field::Type), event)?;
        Self::expect_nature(&entity_type, TypeNature::Link, event)?;
        Self::expect_child_type(&entity_type, &container, event)?;
        Self::expect_endpoint_type(&entity_type, entity_type.end_type(), &endpoint, "end", event)?;
        let value = Self::resolve_value(&entity_type, event)?;
        container
            .end_link(
                &entity_type,
                self.current_time(),
                value,
                &endpoint,
                event.field_or_empty(Field::Key),
            )
            .map_err(|error| error.with_context(event))?;
        Ok(())
    }

    fn expect_endpoint_type(
        link_type: &Arc<EntityType>,
        expected: Option<Arc<EntityType>>,
        endpoint: &Arc<Container>,
        side: &str,
        event: &TraceEvent,
    ) -> SimulationResult<()> {
        let endpoint_type = endpoint.container_type();
        let matches = expected
            .as_ref()
            .is_some_and(|expected| Arc::ptr_eq(expected, &endpoint_type));
        if !matches {
            return Err(TypeError::link_endpoint_mismatch(format!(
                "type '{}' of container '{}' is not the container type expected for the {} of link type '{}'",
                endpoint_type, endpoint, side, link_type
            ))
            .with_context(event)
            .into());
        }
        Ok(())
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}
