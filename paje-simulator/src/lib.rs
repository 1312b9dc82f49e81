//! Paje Trace Simulator - Event-driven reconstruction of a traced system
//!
//! This crate drives the reconstruction of a Paje trace: a parser feeds
//! typed [`TraceEvent`]s into a [`Simulator`], which validates each event
//! against the declared type hierarchy and the container tree, then mutates
//! the model held by `paje-model`.
//!
//! # Core Features
//!
//! * **Event Demultiplexer**: a tag-to-handler dispatch table routes each of
//!   the eighteen Paje event kinds to its validator and recorder
//! * **Strict Validation**: handlers validate fully before mutating; a
//!   rejected event surfaces as a typed [`SimulationError`] and the model
//!   stays in its pre-event state
//! * **Finalization**: [`Simulator::finish`] closes every still-open
//!   container, state, variable and link at the effective end time
//! * **Notifications**: hierarchy, time-bound and selection changes are
//!   broadcast to registered [`SimulatorListener`]s
//! * **Configuration**: a simulation cutoff and optional monotonic-time
//!   enforcement, loadable from TOML or YAML files
//!
//! # Quick Start
//!
//! ```rust
//! use paje_simulator::{EventKind, Field, Simulator, TraceEvent};
//!
//! let simulator = Simulator::new();
//!
//! // DefineContainerType Name="Process" Type="0"
//! simulator
//!     .input_event(
//!         &TraceEvent::new(EventKind::DefineContainerType)
//!             .with_field(Field::Name, "Process")
//!             .with_field(Field::Type, "0"),
//!     )
//!     .unwrap();
//!
//! // CreateContainer Time=0 Type="Process" Container="0" Name="p1"
//! simulator
//!     .input_event(
//!         &TraceEvent::new(EventKind::CreateContainer)
//!             .with_field(Field::Time, "0")
//!             .with_field(Field::Type, "Process")
//!             .with_field(Field::Container, "0")
//!             .with_field(Field::Name, "p1"),
//!     )
//!     .unwrap();
//!
//! simulator.finish().unwrap();
//! assert_eq!(simulator.root_container().children().len(), 1);
//! ```

mod config;
mod error;
mod event;
mod simulator;
mod trace;

pub use config::SimulatorConfig;
pub use error::{SimulationError, SimulationResult};
pub use event::{SimulatorEvent, SimulatorEventPublisher, SimulatorListener};
pub use simulator::{Simulator, SimulatorBuilder, SimulatorStatistics};
pub use trace::{EventKind, Field, TraceEvent};
