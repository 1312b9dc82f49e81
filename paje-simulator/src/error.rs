//! Simulation error types
//!
//! This module defines the error type surfaced by the simulator itself,
//! wrapping the type-hierarchy and container-tree errors of `paje-core` and
//! adding the failures only the event demultiplexer can detect: unknown
//! event kinds, malformed scalar fields, and configuration problems.

use std::fmt;

use paje_core::error::container::ContainerError;
use paje_core::error::types::TypeError;
use paje_core::time::Timestamp;

/// Result alias for simulator operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Simulation errors
///
/// `SimulationError` represents the conditions that abort an incoming trace
/// event. The model always stays in its pre-event state: handlers validate
/// fully before mutating anything.
///
/// # Examples
///
/// ```rust
/// use paje_simulator::SimulationError;
///
/// let error = SimulationError::invalid_number("Value", "ten", "SetVariable (Time: '1')");
/// assert!(matches!(error, SimulationError::InvalidNumber { .. }));
/// ```
#[derive(Debug)]
pub enum SimulationError {
    /// The event's kind tag has no registered handler
    UnknownEventKind {
        /// The rendered offending event
        event: String,
    },

    /// A color field could not be understood
    InvalidColor {
        /// The raw color field
        raw: String,
        /// The rendered offending event
        event: String,
    },

    /// A numeric field could not be parsed
    InvalidNumber {
        /// The field that failed to parse
        field: String,
        /// The raw field contents
        raw: String,
        /// The rendered offending event
        event: String,
    },

    /// A timed event moved backwards while monotonicity enforcement is on
    NonMonotonicTime {
        /// The offending event's time
        time: Timestamp,
        /// The greatest time seen before it
        last_known: Timestamp,
        /// The rendered offending event
        event: String,
    },

    /// A configuration source could not be loaded
    Configuration {
        /// Description of the problem
        message: String,
    },

    /// A type-hierarchy validation failed
    Type(TypeError),

    /// A container-tree validation failed
    Container(ContainerError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::UnknownEventKind { event } => {
                write!(f, "Unknown event kind in {}", event)
            }
            SimulationError::InvalidColor { raw, event } => {
                write!(f, "Could not understand color parameter '{}' in {}", raw, event)
            }
            SimulationError::InvalidNumber { field, raw, event } => {
                write!(f, "Could not parse number '{}' for field '{}' in {}", raw, field, event)
            }
            SimulationError::NonMonotonicTime {
                time,
                last_known,
                event,
            } => {
                write!(
                    f,
                    "Time {} is earlier than the last known time {} in {}",
                    time, last_known, event
                )
            }
            SimulationError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            SimulationError::Type(error) => error.fmt(f),
            SimulationError::Container(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Type(error) => Some(error),
            SimulationError::Container(error) => Some(error),
            _ => None,
        }
    }
}

impl SimulationError {
    /// Creates an unknown event kind error
    ///
    /// # Arguments
    ///
    /// * `event` - The rendered offending event
    pub fn unknown_event_kind(event: impl Into<String>) -> Self {
        Self::UnknownEventKind {
            event: event.into(),
        }
    }

    /// Creates an invalid color error
    pub fn invalid_color(raw: impl Into<String>, event: impl Into<String>) -> Self {
        Self::InvalidColor {
            raw: raw.into(),
            event: event.into(),
        }
    }

    /// Creates an invalid number error
    pub fn invalid_number(
        field: impl Into<String>,
        raw: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self::InvalidNumber {
            field: field.into(),
            raw: raw.into(),
            event: event.into(),
        }
    }

    /// Creates a non-monotonic time error
    pub fn non_monotonic_time(
        time: Timestamp,
        last_known: Timestamp,
        event: impl Into<String>,
    ) -> Self {
        Self::NonMonotonicTime {
            time,
            last_known,
            event: event.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<TypeError> for SimulationError {
    fn from(error: TypeError) -> Self {
        SimulationError::Type(error)
    }
}

impl From<ContainerError> for SimulationError {
    fn from(error: ContainerError) -> Self {
        SimulationError::Container(error)
    }
}
