//! # Paje - A Simulator Core for Paje Execution Traces
//!
//! Paje reconstructs, in memory, the system described by a [Paje-format]
//! execution trace: a hierarchy of **containers** (machines, processes,
//! threads, tasks) classified by a hierarchy of **types**, each container
//! carrying the time-stamped **entities** the trace recorded on it: events,
//! state intervals, variable samples and links.
//!
//! [Paje-format]: https://paje.sourceforge.net/
//!
//! ## Crate Layout
//!
//! The simulator is architected as a small layered workspace:
//!
//! - **paje-core**: foundation types (the error taxonomy, trace time
//!   scalars and the color parser)
//! - **paje-model**: the reconstructed model (type tree, container tree,
//!   entity recorders and the identifier/name registries)
//! - **paje-simulator**: the coordinator (event demultiplexer, validation,
//!   finalization, configuration and the notification surface)
//!
//! This facade crate re-exports the public surface of all three.
//!
//! ## What It Does
//!
//! - **Strict validation**: every incoming event is checked against the
//!   declared type hierarchy and the container tree before anything is
//!   mutated; failures surface as typed errors attributed to the offending
//!   event
//! - **State imbrication**: overlapping states of one type are kept on a
//!   push/pop stack and each closed interval remembers the depth it was
//!   open at, so renderers can draw nested states
//! - **Link pairing**: start and end endpoints are joined by key, across
//!   containers, in either arrival order
//! - **Piecewise-constant variables**: set/add/sub operations close the
//!   previous interval and open the next one
//!
//! ## Quick Start
//!
//! ```rust
//! use paje::{EventKind, Field, Simulator, TraceEvent};
//!
//! let simulator = Simulator::new();
//!
//! for event in [
//!     TraceEvent::new(EventKind::DefineContainerType)
//!         .with_field(Field::Name, "Process")
//!         .with_field(Field::Type, "0"),
//!     TraceEvent::new(EventKind::DefineStateType)
//!         .with_field(Field::Name, "State")
//!         .with_field(Field::Type, "Process"),
//!     TraceEvent::new(EventKind::CreateContainer)
//!         .with_field(Field::Time, "0")
//!         .with_field(Field::Type, "Process")
//!         .with_field(Field::Container, "0")
//!         .with_field(Field::Name, "p1"),
//!     TraceEvent::new(EventKind::PushState)
//!         .with_field(Field::Time, "1")
//!         .with_field(Field::Type, "State")
//!         .with_field(Field::Container, "p1")
//!         .with_field(Field::Value, "Running"),
//!     TraceEvent::new(EventKind::PopState)
//!         .with_field(Field::Time, "2")
//!         .with_field(Field::Type, "State")
//!         .with_field(Field::Container, "p1"),
//! ] {
//!     simulator.input_event(&event).unwrap();
//! }
//! simulator.finish().unwrap();
//!
//! let p1 = simulator.container_by_id("p1").unwrap();
//! let state_type = simulator.type_by_id("State").unwrap();
//! assert_eq!(p1.entities(&state_type).len(), 1);
//! ```

// Re-export foundation types
pub use paje_core::color::{Color, ColorParseError};
pub use paje_core::error;
pub use paje_core::time::Timestamp;

// Re-export the reconstructed model
pub use paje_model::{
    Container, ContainerRegistry, Entity, EntityType, EntityValue, OrphanLinkEnd, TypeNature,
    TypeRegistry,
};

// Re-export the simulator surface
pub use paje_simulator::{
    EventKind, Field, SimulationError, SimulationResult, Simulator, SimulatorBuilder,
    SimulatorConfig, SimulatorEvent, SimulatorEventPublisher, SimulatorListener,
    SimulatorStatistics, TraceEvent,
};
