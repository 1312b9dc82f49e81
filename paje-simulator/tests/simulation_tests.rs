//! End-to-end simulation tests: full event streams through the simulator.

use std::sync::Arc;

use parking_lot::Mutex;

use paje_core::error::container::ContainerErrorKind;
use paje_core::error::types::TypeErrorKind;
use paje_model::Entity;
use paje_simulator::{
    EventKind, Field, SimulationError, Simulator, SimulatorConfig, SimulatorEvent,
    SimulatorListener, TraceEvent,
};

fn define_container_type(parent: &str, name: &str, alias: &str) -> TraceEvent {
    TraceEvent::new(EventKind::DefineContainerType)
        .with_field(Field::Name, name)
        .with_field(Field::Type, parent)
        .with_field(Field::Alias, alias)
}

fn define_state_type(parent: &str, name: &str) -> TraceEvent {
    TraceEvent::new(EventKind::DefineStateType)
        .with_field(Field::Name, name)
        .with_field(Field::Type, parent)
}

fn define_event_type(parent: &str, name: &str) -> TraceEvent {
    TraceEvent::new(EventKind::DefineEventType)
        .with_field(Field::Name, name)
        .with_field(Field::Type, parent)
}

fn define_variable_type(parent: &str, name: &str) -> TraceEvent {
    TraceEvent::new(EventKind::DefineVariableType)
        .with_field(Field::Name, name)
        .with_field(Field::Type, parent)
}

fn define_link_type(parent: &str, name: &str, start: &str, end: &str) -> TraceEvent {
    TraceEvent::new(EventKind::DefineLinkType)
        .with_field(Field::Name, name)
        .with_field(Field::Type, parent)
        .with_field(Field::StartContainerType, start)
        .with_field(Field::EndContainerType, end)
}

fn create_container(time: &str, container_type: &str, parent: &str, name: &str) -> TraceEvent {
    TraceEvent::new(EventKind::CreateContainer)
        .with_field(Field::Time, time)
        .with_field(Field::Type, container_type)
        .with_field(Field::Container, parent)
        .with_field(Field::Name, name)
}

fn destroy_container(time: &str, container_type: &str, name: &str) -> TraceEvent {
    TraceEvent::new(EventKind::DestroyContainer)
        .with_field(Field::Time, time)
        .with_field(Field::Type, container_type)
        .with_field(Field::Name, name)
}

fn state_event(kind: EventKind, time: &str, state_type: &str, container: &str) -> TraceEvent {
    TraceEvent::new(kind)
        .with_field(Field::Time, time)
        .with_field(Field::Type, state_type)
        .with_field(Field::Container, container)
}

fn valued_event(
    kind: EventKind,
    time: &str,
    entity_type: &str,
    container: &str,
    value: &str,
) -> TraceEvent {
    TraceEvent::new(kind)
        .with_field(Field::Time, time)
        .with_field(Field::Type, entity_type)
        .with_field(Field::Container, container)
        .with_field(Field::Value, value)
}

/// Defines PROC under the root with a state and an event type, and creates
/// container p1 at time 0.
fn process_fixture() -> Simulator {
    let simulator = Simulator::new();
    simulator
        .input_event(&define_container_type("0", "PROC", ""))
        .unwrap();
    simulator.input_event(&define_state_type("PROC", "ST")).unwrap();
    simulator.input_event(&define_event_type("PROC", "EV")).unwrap();
    simulator
        .input_event(&create_container("0", "PROC", "0", "p1"))
        .unwrap();
    simulator
}

#[test]
fn type_hierarchy_definitions() {
    let simulator = process_fixture();

    let proc_type = simulator.type_by_id("PROC").unwrap();
    let state_type = simulator.type_by_id("ST").unwrap();
    let event_type = simulator.type_by_id("EV").unwrap();
    assert!(proc_type.is_container());
    assert_eq!(state_type.nature(), paje_model::TypeNature::State);
    assert!(state_type.is_child_of(&proc_type));
    assert!(event_type.is_child_of(&proc_type));

    let err = simulator
        .input_event(&define_state_type("PROC", "ST"))
        .unwrap_err();
    match err {
        SimulationError::Type(error) => assert_eq!(error.kind, TypeErrorKind::Duplicate),
        other => panic!("expected a type error, got {:?}", other),
    }
}

#[test]
fn definitions_resolve_to_the_same_type() {
    let simulator = process_fixture();
    let first = simulator.type_by_id("PROC").unwrap();
    // Later events routed through the registry hit the same node.
    simulator
        .input_event(&create_container("1", "PROC", "0", "p2"))
        .unwrap();
    let second = simulator.type_by_id("PROC").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    let p2 = simulator.container_by_id("p2").unwrap();
    assert!(Arc::ptr_eq(&p2.container_type(), &first));
}

#[test]
fn container_create_and_destroy() {
    let simulator = process_fixture();
    simulator
        .input_event(&destroy_container("10", "PROC", "p1"))
        .unwrap();

    let root = simulator.root_container();
    let children = root.children();
    assert_eq!(children.len(), 1);
    let p1 = &children[0];
    assert_eq!(p1.identifier(), "p1");
    assert_eq!(p1.creation_time(), 0.0);
    assert_eq!(p1.destruction_time(), Some(10.0));
}

#[test]
fn destruction_resolves_by_identifier_not_name() {
    let simulator = Simulator::new();
    simulator
        .input_event(&define_container_type("0", "PROC", ""))
        .unwrap();
    simulator
        .input_event(
            &create_container("0", "PROC", "0", "Process 1").with_field(Field::Alias, "p1"),
        )
        .unwrap();
    // The destroy event names the container by its identifier (the alias),
    // matching the rule CreateContainer registered it under.
    simulator
        .input_event(&destroy_container("5", "PROC", "p1"))
        .unwrap();
    assert!(simulator.container_by_id("p1").unwrap().is_destroyed());
    assert!(simulator.container_by_name("Process 1").unwrap().is_destroyed());
}

#[test]
fn state_imbrication_levels() {
    let simulator = process_fixture();
    simulator
        .input_event(&valued_event(EventKind::PushState, "1", "ST", "p1", "A"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::PushState, "2", "ST", "p1", "B"))
        .unwrap();
    simulator
        .input_event(&state_event(EventKind::PopState, "3", "ST", "p1"))
        .unwrap();
    simulator
        .input_event(&state_event(EventKind::PopState, "4", "ST", "p1"))
        .unwrap();

    let p1 = simulator.container_by_id("p1").unwrap();
    let state_type = simulator.type_by_id("ST").unwrap();
    let states: Vec<(f64, f64, String, usize)> = p1
        .entities(&state_type)
        .iter()
        .map(|entity| match entity {
            Entity::State {
                start,
                end,
                value,
                imbrication,
            } => (*start, *end, value.name().to_string(), *imbrication),
            other => panic!("expected state, got {:?}", other),
        })
        .collect();
    assert_eq!(
        states,
        vec![
            (2.0, 3.0, "B".to_string(), 1),
            (1.0, 4.0, "A".to_string(), 0),
        ]
    );
}

#[test]
fn pop_state_on_empty_stack_leaves_model_unchanged() {
    let simulator = process_fixture();
    let before = simulator.statistics();
    let err = simulator
        .input_event(&state_event(EventKind::PopState, "3", "ST", "p1"))
        .unwrap_err();
    match err {
        SimulationError::Container(error) => {
            assert_eq!(error.kind, ContainerErrorKind::UnderflowPopState);
        }
        other => panic!("expected a container error, got {:?}", other),
    }
    assert_eq!(simulator.statistics(), before);
}

#[test]
fn reset_state_closes_every_open_state() {
    let simulator = process_fixture();
    for (time, value) in [("1", "A"), ("2", "B"), ("3", "C")] {
        simulator
            .input_event(&valued_event(EventKind::PushState, time, "ST", "p1", value))
            .unwrap();
    }
    simulator
        .input_event(&state_event(EventKind::ResetState, "9", "ST", "p1"))
        .unwrap();

    let p1 = simulator.container_by_id("p1").unwrap();
    let state_type = simulator.type_by_id("ST").unwrap();
    let states = p1.entities(&state_type);
    assert_eq!(states.len(), 3);
    assert!(states.iter().all(|state| state.end_time() == 9.0));
    // The stack is empty again: another pop underflows.
    assert!(
        simulator
            .input_event(&state_event(EventKind::PopState, "10", "ST", "p1"))
            .is_err()
    );
}

#[test]
fn variable_aggregation() {
    let simulator = process_fixture();
    simulator
        .input_event(&define_variable_type("PROC", "V"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::SetVariable, "0", "V", "p1", "10"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::AddVariable, "5", "V", "p1", "2"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::SubVariable, "7", "V", "p1", "3"))
        .unwrap();
    simulator
        .input_event(&destroy_container("10", "PROC", "p1"))
        .unwrap();

    let p1 = simulator.container_by_id("p1").unwrap();
    let variable_type = simulator.type_by_id("V").unwrap();
    let intervals: Vec<(f64, f64, f64)> = p1
        .entities(&variable_type)
        .iter()
        .map(|entity| match entity {
            Entity::Variable { start, end, value } => (*start, *end, *value),
            other => panic!("expected variable, got {:?}", other),
        })
        .collect();
    assert_eq!(
        intervals,
        vec![(0.0, 5.0, 10.0), (5.0, 7.0, 12.0), (7.0, 10.0, 9.0)]
    );
}

#[test]
fn variable_value_must_be_numeric() {
    let simulator = process_fixture();
    simulator
        .input_event(&define_variable_type("PROC", "V"))
        .unwrap();
    let err = simulator
        .input_event(&valued_event(EventKind::SetVariable, "1", "V", "p1", "ten"))
        .unwrap_err();
    assert!(matches!(err, SimulationError::InvalidNumber { .. }));
}

#[test]
fn link_pairing_by_key() {
    let simulator = process_fixture();
    simulator
        .input_event(&create_container("0", "PROC", "0", "p2"))
        .unwrap();
    simulator
        .input_event(&define_link_type("0", "L", "PROC", "PROC"))
        .unwrap();
    simulator
        .input_event(
            &valued_event(EventKind::StartLink, "1", "L", "0", "msg")
                .with_field(Field::StartContainer, "p1")
                .with_field(Field::Key, "k"),
        )
        .unwrap();
    simulator
        .input_event(
            &valued_event(EventKind::EndLink, "4", "L", "0", "msg")
                .with_field(Field::EndContainer, "p2")
                .with_field(Field::Key, "k"),
        )
        .unwrap();

    let root = simulator.root_container();
    let link_type = simulator.type_by_id("L").unwrap();
    let links = root.entities(&link_type);
    assert_eq!(links.len(), 1);
    match &links[0] {
        Entity::Link {
            start,
            end,
            value,
            start_container,
            end_container,
            key,
        } => {
            assert_eq!((*start, *end), (1.0, 4.0));
            assert_eq!(value.name(), "msg");
            assert_eq!(start_container.upgrade().unwrap().identifier(), "p1");
            assert_eq!(end_container.upgrade().unwrap().identifier(), "p2");
            assert_eq!(key, "k");
        }
        other => panic!("expected link, got {:?}", other),
    }

    // A second end with the same key has no start left to pair with; it is
    // reported when the model is closed.
    simulator
        .input_event(
            &valued_event(EventKind::EndLink, "6", "L", "0", "msg")
                .with_field(Field::EndContainer, "p2")
                .with_field(Field::Key, "k"),
        )
        .unwrap();
    let err = simulator.finish().unwrap_err();
    match err {
        SimulationError::Container(error) => {
            assert_eq!(error.kind, ContainerErrorKind::OrphanLinkEnd);
            assert!(error.message.contains("'k'"));
        }
        other => panic!("expected a container error, got {:?}", other),
    }
    // Pairing stayed one-to-one.
    assert_eq!(root.entities(&link_type).len(), 1);
}

#[test]
fn link_endpoint_type_is_checked() {
    let simulator = process_fixture();
    simulator
        .input_event(&define_container_type("PROC", "TASK", ""))
        .unwrap();
    simulator
        .input_event(&create_container("0", "TASK", "p1", "t1"))
        .unwrap();
    simulator
        .input_event(&define_link_type("0", "L", "PROC", "PROC"))
        .unwrap();
    let err = simulator
        .input_event(
            &valued_event(EventKind::StartLink, "1", "L", "0", "msg")
                .with_field(Field::StartContainer, "t1")
                .with_field(Field::Key, "k"),
        )
        .unwrap_err();
    match err {
        SimulationError::Type(error) => {
            assert_eq!(error.kind, TypeErrorKind::LinkEndpointMismatch);
        }
        other => panic!("expected a type error, got {:?}", other),
    }
}

#[test]
fn unfinished_link_start_is_closed_at_trace_end() {
    let simulator = process_fixture();
    simulator
        .input_event(&define_link_type("0", "L", "PROC", "PROC"))
        .unwrap();
    simulator
        .input_event(
            &valued_event(EventKind::StartLink, "3", "L", "0", "msg")
                .with_field(Field::StartContainer, "p1")
                .with_field(Field::Key, "lost"),
        )
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::NewEvent, "8", "EV", "p1", "tick"))
        .unwrap();
    simulator.finish().unwrap();

    let link_type = simulator.type_by_id("L").unwrap();
    let links = simulator.root_container().entities(&link_type);
    assert_eq!(links.len(), 1);
    match &links[0] {
        Entity::Link {
            start,
            end,
            end_container,
            ..
        } => {
            assert_eq!((*start, *end), (3.0, 8.0));
            assert!(end_container.upgrade().is_none());
        }
        other => panic!("expected link, got {:?}", other),
    }
}

#[test]
fn inline_value_declaration_on_new_event() {
    let simulator = process_fixture();
    let event_type = simulator.type_by_id("EV").unwrap();
    assert!(event_type.values().is_empty());

    simulator
        .input_event(&valued_event(EventKind::NewEvent, "2", "EV", "p1", "oops"))
        .unwrap();

    let declared = event_type.value("oops").unwrap();
    assert_eq!(declared.identifier(), "oops");
    assert_eq!(declared.name(), "oops");
    assert!(declared.color().is_none());

    let p1 = simulator.container_by_id("p1").unwrap();
    let events = p1.entities(&event_type);
    assert_eq!(events.len(), 1);
    match &events[0] {
        Entity::Event { time, value } => {
            assert_eq!(*time, 2.0);
            assert!(Arc::ptr_eq(value, &declared));
        }
        other => panic!("expected event, got {:?}", other),
    }
}

#[test]
fn create_container_with_mismatched_parent_type() {
    let simulator = process_fixture();
    // TASK's parent is PROC, so a TASK cannot sit directly under the root.
    simulator
        .input_event(&define_container_type("PROC", "TASK", ""))
        .unwrap();
    let before = simulator.statistics();
    let err = simulator
        .input_event(&create_container("1", "TASK", "0", "t1"))
        .unwrap_err();
    match err {
        SimulationError::Type(error) => {
            assert_eq!(error.kind, TypeErrorKind::HierarchyMismatch);
        }
        other => panic!("expected a type error, got {:?}", other),
    }
    assert!(simulator.container_by_id("t1").is_none());
    assert_eq!(simulator.statistics(), before);
}

#[test]
fn entity_events_require_the_right_type_kind() {
    let simulator = process_fixture();
    let err = simulator
        .input_event(&valued_event(EventKind::PushState, "1", "EV", "p1", "A"))
        .unwrap_err();
    match err {
        SimulationError::Type(error) => assert_eq!(error.kind, TypeErrorKind::KindMismatch),
        other => panic!("expected a type error, got {:?}", other),
    }

    let err = simulator
        .input_event(&valued_event(EventKind::NewEvent, "1", "EV", "ghost", "A"))
        .unwrap_err();
    match err {
        SimulationError::Container(error) => assert_eq!(error.kind, ContainerErrorKind::Unknown),
        other => panic!("expected a container error, got {:?}", other),
    }
}

#[test]
fn finish_closes_everything_and_is_idempotent() {
    let simulator = process_fixture();
    simulator
        .input_event(&define_variable_type("PROC", "V"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::PushState, "1", "ST", "p1", "A"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::SetVariable, "2", "V", "p1", "4"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::NewEvent, "6", "EV", "p1", "tick"))
        .unwrap();

    simulator.finish().unwrap();

    let p1 = simulator.container_by_id("p1").unwrap();
    assert_eq!(p1.destruction_time(), Some(6.0));
    let state_type = simulator.type_by_id("ST").unwrap();
    let variable_type = simulator.type_by_id("V").unwrap();
    assert_eq!(p1.entities(&state_type)[0].end_time(), 6.0);
    assert_eq!(p1.entities(&variable_type)[0].end_time(), 6.0);
    assert_eq!(simulator.selection_start(), Some(0.0));
    assert_eq!(simulator.selection_end(), Some(6.0));

    // A second finish changes nothing.
    let before = simulator.statistics();
    simulator.finish().unwrap();
    assert_eq!(simulator.statistics(), before);
    assert_eq!(p1.entities(&state_type).len(), 1);
}

#[test]
fn simulation_cutoff_discards_late_events() {
    let simulator = Simulator::builder().with_stop_at(10.0).build();
    simulator
        .input_event(&define_container_type("0", "PROC", ""))
        .unwrap();
    simulator.input_event(&define_state_type("PROC", "ST")).unwrap();
    simulator
        .input_event(&create_container("0", "PROC", "0", "p1"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::PushState, "5", "ST", "p1", "A"))
        .unwrap();
    assert!(simulator.keep_simulating());

    // Beyond the cutoff: accepted but discarded.
    simulator
        .input_event(&valued_event(EventKind::PushState, "15", "ST", "p1", "B"))
        .unwrap();
    assert!(!simulator.keep_simulating());

    simulator.finish().unwrap();
    let p1 = simulator.container_by_id("p1").unwrap();
    let state_type = simulator.type_by_id("ST").unwrap();
    let states = p1.entities(&state_type);
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].end_time(), 10.0);
    assert_eq!(simulator.end_time(), 10.0);
}

#[test]
fn monotonic_time_enforcement_is_opt_in() {
    let relaxed = process_fixture();
    relaxed
        .input_event(&valued_event(EventKind::PushState, "5", "ST", "p1", "A"))
        .unwrap();
    // Out-of-order times are silently accepted by default.
    relaxed
        .input_event(&valued_event(EventKind::PushState, "3", "ST", "p1", "B"))
        .unwrap();

    let strict = Simulator::with_config(
        SimulatorConfig::new().with_monotonic_enforcement(true),
    );
    strict
        .input_event(&define_container_type("0", "PROC", ""))
        .unwrap();
    strict.input_event(&define_state_type("PROC", "ST")).unwrap();
    strict
        .input_event(&create_container("0", "PROC", "0", "p1"))
        .unwrap();
    strict
        .input_event(&valued_event(EventKind::PushState, "5", "ST", "p1", "A"))
        .unwrap();
    let err = strict
        .input_event(&valued_event(EventKind::PushState, "3", "ST", "p1", "B"))
        .unwrap_err();
    assert!(matches!(err, SimulationError::NonMonotonicTime { .. }));
}

#[derive(Default)]
struct RecordingListener {
    notifications: Mutex<Vec<String>>,
}

impl SimulatorListener for RecordingListener {
    fn on_simulator_event(&self, event: &SimulatorEvent<'_>) {
        let rendered = match event {
            SimulatorEvent::HierarchyChanged { simulator } => {
                format!("hierarchy:{}", simulator.statistics().container_count)
            }
            SimulatorEvent::TimeLimitsChanged { start, end } => {
                format!("limits:{}..{}", start, end)
            }
            SimulatorEvent::SelectionChanged { start, end } => {
                format!("selection:{}..{}", start, end)
            }
        };
        self.notifications.lock().push(rendered);
    }
}

#[test]
fn finish_notifies_listeners_in_order() {
    let listener = Arc::new(RecordingListener::default());
    let simulator = Simulator::builder()
        .with_listener(listener.clone())
        .build();
    simulator
        .input_event(&define_container_type("0", "PROC", ""))
        .unwrap();
    simulator
        .input_event(&create_container("0", "PROC", "0", "p1"))
        .unwrap();
    simulator
        .input_event(&destroy_container("7", "PROC", "p1"))
        .unwrap();
    simulator.finish().unwrap();

    let notifications = listener.notifications.lock();
    assert_eq!(
        *notifications,
        vec![
            "hierarchy:2".to_string(),
            "limits:0..7".to_string(),
            "selection:0..7".to_string(),
        ]
    );
}

#[test]
fn statistics_count_the_whole_tree() {
    let simulator = process_fixture();
    simulator
        .input_event(&valued_event(EventKind::NewEvent, "1", "EV", "p1", "a"))
        .unwrap();
    simulator
        .input_event(&valued_event(EventKind::NewEvent, "2", "EV", "p1", "b"))
        .unwrap();
    let stats = simulator.statistics();
    // Root type, PROC, ST, EV.
    assert_eq!(stats.type_count, 4);
    // Root container and p1.
    assert_eq!(stats.container_count, 2);
    assert_eq!(stats.entity_count, 2);
}
