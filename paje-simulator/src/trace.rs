//! The upstream contract between parser and simulator
//!
//! A parser feeds the simulator `TraceEvent`s: a kind tag plus the textual
//! fields of the trace line. All fields arrive as strings; numeric coercion
//! (times, variable values, colors) happens inside the simulator.

use std::fmt;

/// The kinds of events a Paje trace can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DefineContainerType,
    DefineLinkType,
    DefineEventType,
    DefineStateType,
    DefineVariableType,
    DefineEntityValue,
    CreateContainer,
    DestroyContainer,
    NewEvent,
    SetState,
    PushState,
    PopState,
    ResetState,
    SetVariable,
    AddVariable,
    SubVariable,
    StartLink,
    EndLink,
}

impl EventKind {
    /// All event kinds, in their canonical declaration order
    pub const ALL: [EventKind; 18] = [
        EventKind::DefineContainerType,
        EventKind::DefineLinkType,
        EventKind::DefineEventType,
        EventKind::DefineStateType,
        EventKind::DefineVariableType,
        EventKind::DefineEntityValue,
        EventKind::CreateContainer,
        EventKind::DestroyContainer,
        EventKind::NewEvent,
        EventKind::SetState,
        EventKind::PushState,
        EventKind::PopState,
        EventKind::ResetState,
        EventKind::SetVariable,
        EventKind::AddVariable,
        EventKind::SubVariable,
        EventKind::StartLink,
        EventKind::EndLink,
    ];

    /// Returns the kind as its trace spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DefineContainerType => "DefineContainerType",
            EventKind::DefineLinkType => "DefineLinkType",
            EventKind::DefineEventType => "DefineEventType",
            EventKind::DefineStateType => "DefineStateType",
            EventKind::DefineVariableType => "DefineVariableType",
            EventKind::DefineEntityValue => "DefineEntityValue",
            EventKind::CreateContainer => "CreateContainer",
            EventKind::DestroyContainer => "DestroyContainer",
            EventKind::NewEvent => "NewEvent",
            EventKind::SetState => "SetState",
            EventKind::PushState => "PushState",
            EventKind::PopState => "PopState",
            EventKind::ResetState => "ResetState",
            EventKind::SetVariable => "SetVariable",
            EventKind::AddVariable => "AddVariable",
            EventKind::SubVariable => "SubVariable",
            EventKind::StartLink => "StartLink",
            EventKind::EndLink => "EndLink",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields a trace event may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Time,
    Name,
    Type,
    Alias,
    Container,
    StartContainer,
    EndContainer,
    StartContainerType,
    EndContainerType,
    Value,
    Key,
    Color,
}

impl Field {
    /// Returns the field as its trace spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Time => "Time",
            Field::Name => "Name",
            Field::Type => "Type",
            Field::Alias => "Alias",
            Field::Container => "Container",
            Field::StartContainer => "StartContainer",
            Field::EndContainer => "EndContainer",
            Field::StartContainerType => "StartContainerType",
            Field::EndContainerType => "EndContainerType",
            Field::Value => "Value",
            Field::Key => "Key",
            Field::Color => "Color",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed event as handed over by the parser
///
/// Fields keep their arrival order so the debug rendering reproduces the
/// trace line faithfully; lookups scan the (short) field list.
///
/// # Examples
///
/// ```rust
/// use paje_simulator::{EventKind, Field, TraceEvent};
///
/// let event = TraceEvent::new(EventKind::CreateContainer)
///     .with_field(Field::Time, "0")
///     .with_field(Field::Type, "P")
///     .with_field(Field::Container, "0")
///     .with_field(Field::Name, "p1");
/// assert_eq!(event.field(Field::Name), Some("p1"));
/// assert_eq!(event.field(Field::Alias), None);
/// ```
#[derive(Debug, Clone)]
pub struct TraceEvent {
    kind: EventKind,
    fields: Vec<(Field, String)>,
}

impl TraceEvent {
    /// Creates an event of the given kind with no fields
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Adds or replaces a field, builder style
    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set_field(field, value);
        self
    }

    /// Adds or replaces a field
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// The kind tag of this event
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Looks up a field, `None` when the trace line did not carry it
    pub fn field(&self, field: Field) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Looks up a field, treating an absent field as empty text
    pub fn field_or_empty(&self, field: Field) -> &str {
        self.field(field).unwrap_or("")
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.kind)?;
        for (index, (field, value)) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: '{}'", field, value)?;
        }
        f.write_str(")")
    }
}
