//! Simulator notification surface
//!
//! The simulator broadcasts structural notifications to registered
//! listeners: the container hierarchy changed, the trace's time bounds
//! changed, or the selection window moved. Views hang their refresh logic
//! off these notifications instead of polling the model.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use paje_core::time::Timestamp;

use crate::simulator::Simulator;

/// Simulator notification events
///
/// # Examples
///
/// ```rust
/// use paje_simulator::SimulatorEvent;
///
/// fn handle_event(event: &SimulatorEvent<'_>) {
///     match event {
///         SimulatorEvent::HierarchyChanged { .. } => println!("hierarchy changed"),
///         SimulatorEvent::TimeLimitsChanged { start, end } => {
///             println!("trace spans [{}, {}]", start, end);
///         }
///         SimulatorEvent::SelectionChanged { start, end } => {
///             println!("selection moved to [{}, {}]", start, end);
///         }
///     }
/// }
/// ```
pub enum SimulatorEvent<'a> {
    /// The container tree gained or lost structure
    HierarchyChanged {
        /// The simulator whose model changed
        simulator: &'a Simulator,
    },
    /// The overall time bounds of the trace changed
    TimeLimitsChanged {
        /// Start of the trace
        start: Timestamp,
        /// End of the trace
        end: Timestamp,
    },
    /// The selection window moved
    SelectionChanged {
        /// Start of the selection
        start: Timestamp,
        /// End of the selection
        end: Timestamp,
    },
}

impl fmt::Debug for SimulatorEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatorEvent::HierarchyChanged { .. } => f.write_str("HierarchyChanged"),
            SimulatorEvent::TimeLimitsChanged { start, end } => {
                write!(f, "TimeLimitsChanged([{}, {}])", start, end)
            }
            SimulatorEvent::SelectionChanged { start, end } => {
                write!(f, "SelectionChanged([{}, {}])", start, end)
            }
        }
    }
}

/// Trait for implementing simulator event listeners
///
/// Listeners must be thread-safe; publishing is synchronous and calls every
/// listener in registration order.
///
/// # Examples
///
/// ```rust
/// use paje_simulator::{SimulatorEvent, SimulatorListener};
///
/// struct RefreshListener;
///
/// impl SimulatorListener for RefreshListener {
///     fn on_simulator_event(&self, _event: &SimulatorEvent<'_>) {
///         // schedule a redraw
///     }
/// }
/// ```
pub trait SimulatorListener: Send + Sync {
    /// Called when a notification is published
    ///
    /// # Arguments
    ///
    /// * `event` - The notification that occurred
    fn on_simulator_event(&self, event: &SimulatorEvent<'_>);
}

/// Publisher for simulator notifications
///
/// Keeps the registered listeners and dispatches each published event to
/// all of them in sequence. Registration is explicit; the simulator owns
/// exactly one publisher and there is no process-wide registry.
#[derive(Default)]
pub struct SimulatorEventPublisher {
    listeners: RwLock<Vec<Arc<dyn SimulatorListener>>>,
}

impl SimulatorEventPublisher {
    /// Creates an empty publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for all subsequent notifications
    pub fn register(&self, listener: Arc<dyn SimulatorListener>) {
        self.listeners.write().push(listener);
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Publishes an event to all registered listeners
    pub fn publish(&self, event: &SimulatorEvent<'_>) {
        for listener in self.listeners.read().iter() {
            listener.on_simulator_event(event);
        }
    }
}
