//! Test: Structure - inserting and removing stages

use crate::helpers::*;
use workflow::core::StageStatus;
use workflow::operations::ThresholdOp;

#[test]
fn test_insert_after_recomputes_downstream() {
    let (mut workflow, ids, log) = recorder_chain(&["B"]);
    let (source, b) = (ids[0], ids[1]);

    let (gate, report) = workflow
        .insert_after(source, Box::new(ThresholdOp::new("Gate", "FSC", 300.0)))
        .unwrap();

    assert_eq!(workflow.ids(), vec![source, gate, b]);
    assert_eq!(report.invalidated, vec![b]);
    assert_cycle_order(&workflow, &report, &["Gate", "B"]);
    assert_eq!(calls(&log, "apply:"), vec!["B"]);
    assert_eq!(events(&workflow, b), 1);
    assert!(workflow.is_valid());
}

#[test]
fn test_insert_first_without_input_leaves_chain_invalid() {
    let (mut workflow, ids, _log) = recorder_chain(&["B"]);
    let (source, b) = (ids[0], ids[1]);

    // A gate with no predecessor has nothing to read
    let (gate, report) = workflow.insert_first(Box::new(ThresholdOp::new("Gate", "FSC", 0.0)));

    assert_eq!(workflow.head(), Some(gate));
    assert_eq!(workflow.ids(), vec![gate, source, b]);
    assert_eq!(report.rejected, Some(gate));
    assert_eq!(status(&workflow, gate), StageStatus::Invalid);
    assert_eq!(status(&workflow, source), StageStatus::Invalid);
    assert_eq!(status(&workflow, b), StageStatus::Valid);
}

#[test]
fn test_removing_head_promotes_successor() {
    let (mut workflow, ids, log) = recorder_chain(&["B", "C"]);

    let (operation, report) = workflow.remove(ids[0]).unwrap();

    assert_eq!(operation.name(), "Source");
    assert_eq!(workflow.head(), Some(ids[1]));
    assert_eq!(workflow.len(), 2);

    // B lost its input and rejects it
    let report = report.unwrap();
    assert_eq!(report.rejected, Some(ids[1]));
    assert_eq!(report.invalidated, vec![ids[2]]);
    assert_eq!(calls(&log, "validate:"), vec!["B"]);
    assert!(workflow.stage(ids[0]).is_none());
}

#[test]
fn test_removing_tail_runs_nothing() {
    let (mut workflow, ids, log) = recorder_chain(&["B"]);

    let (_, report) = workflow.remove(ids[1]).unwrap();

    assert!(report.is_none());
    assert_eq!(workflow.tail(), Some(ids[0]));
    assert!(log.lock().unwrap().is_empty());

    // Handles are never reused
    let (c, _) = workflow.push(Box::new(RecorderOp::new("C", &log)));
    assert_ne!(c, ids[1]);
    assert!(workflow.remove(ids[1]).is_err());
}
