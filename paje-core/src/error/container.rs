//! Container-tree error types and implementations
//!
//! This module defines error types raised while mutating the container tree:
//! container creation and destruction, entity recording, and the per-container
//! state machines (state stacks and link pairing).

use std::fmt;

/// The main error type for container-tree operations
///
/// `ContainerError` represents the failure conditions that can occur while
/// creating or destroying containers and while recording entities on them.
///
/// # Examples
///
/// ```rust
/// use paje_core::error::container::{ContainerError, ContainerErrorKind};
///
/// let error = ContainerError::unknown("container 'p1'");
/// println!("{}", error); // Prints: "Unknown container: container 'p1'"
/// ```
#[derive(Debug)]
pub struct ContainerError {
    /// The specific kind of error that occurred
    pub kind: ContainerErrorKind,
    /// A human-readable error message describing the issue
    pub message: String,
    /// Optional source error that caused this error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Enumeration of different types of container-tree errors
#[derive(Debug, PartialEq, Eq)]
pub enum ContainerErrorKind {
    /// A referenced container identifier does not resolve
    Unknown,
    /// The chosen identifier or name is already registered
    Duplicate,
    /// An entity was recorded on an already destroyed container
    Destroyed,
    /// PopState was applied to an empty state stack
    UnderflowPopState,
    /// An EndLink was never paired with a StartLink
    OrphanLinkEnd,
}

impl fmt::Display for ContainerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerErrorKind::Unknown => write!(f, "Unknown container"),
            ContainerErrorKind::Duplicate => write!(f, "Container already exists"),
            ContainerErrorKind::Destroyed => write!(f, "Container already destroyed"),
            ContainerErrorKind::UnderflowPopState => write!(f, "PopState on empty stack"),
            ContainerErrorKind::OrphanLinkEnd => write!(f, "Link end without matching start"),
        }
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl ContainerError {
    /// Creates a new ContainerError with the specified kind and message
    ///
    /// # Arguments
    ///
    /// * `kind` - The kind of error that occurred
    /// * `message` - A descriptive error message
    pub fn new<M: Into<String>>(kind: ContainerErrorKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Adds a source error to this ContainerError
    ///
    /// # Arguments
    ///
    /// * `err` - The source error that caused this error
    pub fn with_source<E>(mut self, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(err));
        self
    }

    /// Appends the rendering of the offending trace event to the message
    ///
    /// # Arguments
    ///
    /// * `context` - The rendered form of the offending event
    pub fn with_context<C: fmt::Display>(mut self, context: C) -> Self {
        self.message = format!("{} in {}", self.message, context);
        self
    }

    /// Creates a new "unknown container" error
    pub fn unknown<M: Into<String>>(message: M) -> Self {
        Self::new(ContainerErrorKind::Unknown, message)
    }

    /// Creates a new "duplicate container" error
    pub fn duplicate<M: Into<String>>(message: M) -> Self {
        Self::new(ContainerErrorKind::Duplicate, message)
    }

    /// Creates a new "container already destroyed" error
    pub fn destroyed<M: Into<String>>(message: M) -> Self {
        Self::new(ContainerErrorKind::Destroyed, message)
    }

    /// Creates a new "pop on empty state stack" error
    pub fn underflow_pop_state<M: Into<String>>(message: M) -> Self {
        Self::new(ContainerErrorKind::UnderflowPopState, message)
    }

    /// Creates a new "orphan link end" error
    pub fn orphan_link_end<M: Into<String>>(message: M) -> Self {
        Self::new(ContainerErrorKind::OrphanLinkEnd, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_error_creation() {
        let error = ContainerError::unknown("container 'p1'");
        assert_eq!(error.kind, ContainerErrorKind::Unknown);
        assert_eq!(error.message, "container 'p1'");
        assert!(error.source.is_none());
    }

    #[test]
    fn test_container_error_display() {
        let error = ContainerError::underflow_pop_state("state type 'ST' on container 'p1'");
        assert_eq!(
            error.to_string(),
            "PopState on empty stack: state type 'ST' on container 'p1'"
        );
    }

    #[test]
    fn test_container_error_with_context() {
        let error = ContainerError::duplicate("container 'p1'").with_context("CreateContainer");
        assert_eq!(error.message, "container 'p1' in CreateContainer");
    }

    #[test]
    fn test_all_error_kinds() {
        let errors = vec![
            ContainerError::unknown("a"),
            ContainerError::duplicate("b"),
            ContainerError::destroyed("c"),
            ContainerError::underflow_pop_state("d"),
            ContainerError::orphan_link_end("e"),
        ];

        let expected_kinds = vec![
            ContainerErrorKind::Unknown,
            ContainerErrorKind::Duplicate,
            ContainerErrorKind::Destroyed,
            ContainerErrorKind::UnderflowPopState,
            ContainerErrorKind::OrphanLinkEnd,
        ];

        for (error, expected_kind) in errors.iter().zip(expected_kinds.iter()) {
            assert_eq!(&error.kind, expected_kind);
        }
    }
}
