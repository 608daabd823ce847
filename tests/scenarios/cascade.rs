//! Test: Cascade - forward propagation through a chain

use crate::helpers::*;
use workflow::core::StageStatus;
use workflow::execution::WorkflowEvent;

/// A parameter change upstream recomputes every stage, in chain order
#[test]
fn test_change_propagates_in_order() {
    let (mut workflow, ids, log) = recorder_chain(&["B", "C"]);
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    let versions_before: Vec<u64> = ids
        .iter()
        .map(|id| workflow.stage(*id).unwrap().result_version().unwrap())
        .collect();

    let report = workflow.set_parameter(a, "gain", 2.0).unwrap();

    assert_cycle_order(&workflow, &report, &["Source", "B", "C"]);
    assert_eq!(calls(&log, "apply:"), vec!["Source", "B", "C"]);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "validate:Source",
            "apply:Source",
            "validate:B",
            "apply:B",
            "validate:C",
            "apply:C"
        ]
    );

    for id in [a, b, c] {
        assert_eq!(status(&workflow, id), StageStatus::Valid);
    }

    let c_result = workflow.stage(c).unwrap().result().unwrap();
    assert_eq!(c_result.channel("FSC").unwrap(), &[100.0, 300.0, 500.0, 700.0]);

    // Every stage holds a newer result, versions rising down the chain
    let versions_after: Vec<u64> = ids
        .iter()
        .map(|id| workflow.stage(*id).unwrap().result_version().unwrap())
        .collect();
    for (before, after) in versions_before.iter().zip(&versions_after) {
        assert!(after > before);
    }
    assert!(versions_after.windows(2).all(|w| w[0] < w[1]));
    assert_settled(&workflow);
}

/// Setting a parameter to its current value triggers nothing
#[test]
fn test_unchanged_parameter_is_not_a_trigger() {
    let (mut workflow, ids, log) = recorder_chain(&["B"]);

    let report = workflow.set_parameter(ids[0], "gain", 1.0).unwrap();

    assert!(report.cycles.is_empty());
    assert!(log.lock().unwrap().is_empty());
}

/// Triggering twice without changes yields equal results
#[test]
fn test_repeated_update_is_idempotent() {
    let (mut workflow, ids, _log) = recorder_chain(&["B", "C"]);
    let tail = *ids.last().unwrap();

    workflow.update(ids[0]).unwrap();
    let first = workflow.stage(tail).unwrap().result().unwrap().clone();
    let statuses: Vec<StageStatus> = ids.iter().map(|id| status(&workflow, *id)).collect();

    workflow.update(ids[0]).unwrap();
    let second = workflow.stage(tail).unwrap().result().unwrap().clone();

    assert_eq!(*first, *second);
    assert_eq!(
        statuses,
        ids.iter().map(|id| status(&workflow, *id)).collect::<Vec<_>>()
    );
}

/// A mid-chain rejection stops the cascade and invalidates exactly one hop
#[test]
fn test_rejection_invalidates_one_hop_only() {
    let (mut workflow, ids, log) = recorder_chain(&["B", "C", "D"]);
    let (b, c, d) = (ids[1], ids[2], ids[3]);

    let report = workflow.set_parameter(b, "reject", true).unwrap();

    assert_eq!(report.rejected, Some(b));
    assert_eq!(report.invalidated, vec![c]);
    assert_cycle_order(&workflow, &report, &["B"]);
    assert!(calls(&log, "validate:").iter().all(|name| name == "B"));

    assert_eq!(status(&workflow, b), StageStatus::Invalid);
    assert_eq!(status(&workflow, c), StageStatus::Invalid);
    // The forced transition does not cascade
    assert_eq!(status(&workflow, d), StageStatus::Valid);
    assert_settled(&workflow);
}

/// A downstream stage's cycle completes before the upstream cascade returns
#[test]
fn test_status_transitions_are_nested_in_order() {
    let (mut workflow, ids, _log) = recorder_chain(&["B"]);
    let events = record_events(&mut workflow);

    workflow.update(ids[0]).unwrap();

    let transitions: Vec<(String, StageStatus)> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            WorkflowEvent::StatusChanged { stage, to, .. } => Some((
                workflow.stage(*stage).unwrap().name().to_string(),
                *to,
            )),
            _ => None,
        })
        .collect();

    assert_eq!(
        transitions,
        vec![
            ("Source".to_string(), StageStatus::Updating),
            ("Source".to_string(), StageStatus::Valid),
            ("B".to_string(), StageStatus::Updating),
            ("B".to_string(), StageStatus::Valid),
        ]
    );
}

/// An external invalidation moves only the status of the next stage
#[test]
fn test_external_invalidation() {
    let (mut workflow, ids, log) = recorder_chain(&["B", "C"]);

    let report = workflow.invalidate(ids[0]).unwrap();

    assert!(report.cycles.is_empty());
    assert_eq!(report.invalidated, vec![ids[1]]);
    assert_eq!(status(&workflow, ids[0]), StageStatus::Invalid);
    assert_eq!(status(&workflow, ids[1]), StageStatus::Invalid);
    assert_eq!(status(&workflow, ids[2]), StageStatus::Valid);
    assert!(log.lock().unwrap().is_empty());

    // Results survive a status-only transition
    assert_eq!(events(&workflow, ids[1]), 4);
}
