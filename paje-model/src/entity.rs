//! Time-stamped records on a container
//!
//! Entities are the closed records a container accumulates while the trace
//! is simulated: instantaneous events, state intervals with their
//! imbrication level, piecewise-constant variable samples, and links joining
//! two endpoint containers.

use std::sync::{Arc, Weak};

use paje_core::time::Timestamp;

use crate::container::Container;
use crate::types::EntityValue;

/// One recorded occurrence on a container
///
/// Link endpoints are non-owning handles; the containers are owned by the
/// container tree, and a link finalized without a matching end carries a
/// dangling end handle.
#[derive(Debug, Clone)]
pub enum Entity {
    /// An instantaneous event
    Event {
        /// When the event occurred
        time: Timestamp,
        /// The declared value the event took
        value: Arc<EntityValue>,
    },
    /// A state interval
    State {
        /// When the state was entered
        start: Timestamp,
        /// When the state was left
        end: Timestamp,
        /// The declared value of the state
        value: Arc<EntityValue>,
        /// Depth in the open-state stack while the state was active
        imbrication: usize,
    },
    /// A piecewise-constant variable sample
    Variable {
        /// Start of the constant interval
        start: Timestamp,
        /// End of the constant interval
        end: Timestamp,
        /// The scalar held over the interval
        value: f64,
    },
    /// A link between two containers
    Link {
        /// When the link started
        start: Timestamp,
        /// When the link ended
        end: Timestamp,
        /// The declared value of the link
        value: Arc<EntityValue>,
        /// The container the link started on
        start_container: Weak<Container>,
        /// The container the link ended on; dangling for unfinished links
        end_container: Weak<Container>,
        /// The key the two endpoints were paired by
        key: String,
    },
}

impl Entity {
    /// The time this entity starts at
    pub fn start_time(&self) -> Timestamp {
        match self {
            Entity::Event { time, .. } => *time,
            Entity::State { start, .. }
            | Entity::Variable { start, .. }
            | Entity::Link { start, .. } => *start,
        }
    }

    /// The time this entity ends at; equals the start for events
    pub fn end_time(&self) -> Timestamp {
        match self {
            Entity::Event { time, .. } => *time,
            Entity::State { end, .. } | Entity::Variable { end, .. } | Entity::Link { end, .. } => {
                *end
            }
        }
    }

    /// True when the entity intersects the closed window `[from, until]`
    pub fn overlaps(&self, from: Timestamp, until: Timestamp) -> bool {
        self.end_time() >= from && self.start_time() <= until
    }
}
