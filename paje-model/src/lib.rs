//! Paje Trace Model - Reconstructed model of a traced system
//!
//! This crate holds the in-memory model a trace simulation builds: the tree of
//! **types** classifying what a trace can record, the tree of **containers**
//! (processes, threads, tasks) the trace describes, and the time-stamped
//! **entities** recorded on each container (events, state intervals, variable
//! samples, links).
//!
//! ## Core pieces
//!
//! * **Type tree**: a container type may contain further types of any kind;
//!   event, state, variable and link types are leaves. Event, state and link
//!   types declare symbolic values; link types name the container types their
//!   endpoints must have.
//! * **Container tree**: every container has a parent whose type is the parent
//!   of the container's own type. Containers carry their creation and
//!   destruction times and their per-type entity sequences.
//! * **Recorders**: each container runs a push/pop stack per state type (with
//!   imbrication levels), a scalar register per variable type, and a key-index
//!   per link type that pairs start and end endpoints.
//! * **Registries**: types and containers are resolved by identifier or by
//!   name through concurrent-map registries, both indices kept consistent.
//!
//! # Quick Start
//!
//! ```rust
//! use paje_model::{ContainerRegistry, TypeRegistry};
//!
//! let types = TypeRegistry::new();
//! let proc_type = types.define_container_type("0", "Process", "P").unwrap();
//! let state_type = types.define_state_type("P", "State", "S").unwrap();
//!
//! let containers = ContainerRegistry::new(types.root());
//! let p1 = containers
//!     .create(&proc_type, &containers.root(), "p1", "", 0.0)
//!     .unwrap();
//!
//! let running = state_type.find_or_declare_value("Running").unwrap();
//! p1.push_state(&state_type, 1.0, running).unwrap();
//! p1.pop_state(&state_type, 2.0).unwrap();
//! assert_eq!(p1.entities(&state_type).len(), 1);
//! ```

mod container;
mod entity;
mod registry;
mod types;

pub use container::{Container, OrphanLinkEnd};
pub use entity::Entity;
pub use registry::{ContainerRegistry, TypeRegistry};
pub use types::{EntityType, EntityValue, TypeNature};
