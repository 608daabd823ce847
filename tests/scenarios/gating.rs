//! Test: Gating - a threshold gate feeding a histogram view

use crate::helpers::*;
use workflow::core::{StageStatus, ViewDescriptor, Workflow};
use workflow::operations::SelectOp;

/// An accepted threshold makes the gate valid with the filtered events
#[test]
fn test_accepted_threshold_filters_events() {
    let mut chain = gating_chain(0.0);
    chain
        .workflow
        .set_views(chain.histogram, vec![ViewDescriptor::new("histogram").with_channel("SSC")])
        .unwrap();

    let report = chain
        .workflow
        .set_parameter(chain.gate, "threshold", 200.0)
        .unwrap();

    assert!(report.is_clean());
    assert_cycle_order(&chain.workflow, &report, &["Gate", "Histogram"]);
    assert_eq!(status(&chain.workflow, chain.gate), StageStatus::Valid);
    assert_eq!(events(&chain.workflow, chain.gate), 2);

    let gated = chain.workflow.stage(chain.gate).unwrap().result().unwrap();
    assert_eq!(gated.channel("FSC").unwrap(), &[250.0, 350.0]);
    assert_eq!(gated.channel("SSC").unwrap(), &[25.0, 35.0]);

    assert_eq!(
        chain.workflow.available_channels(chain.histogram).unwrap(),
        vec!["FSC".to_string(), "SSC".to_string()]
    );
    assert_settled(&chain.workflow);
}

/// A rejected parameter keeps the last result and invalidates one hop down
#[test]
fn test_rejected_parameter_keeps_prior_result() {
    let mut chain = gating_chain(200.0);
    let before = chain.workflow.stage(chain.gate).unwrap().result().unwrap().clone();
    assert_eq!(status(&chain.workflow, chain.histogram), StageStatus::Valid);

    let report = chain
        .workflow
        .set_parameter(chain.gate, "channel", "CD4")
        .unwrap();

    assert_eq!(report.rejected, Some(chain.gate));
    assert_eq!(report.invalidated, vec![chain.histogram]);
    assert_cycle_order(&chain.workflow, &report, &["Gate"]);

    assert_eq!(status(&chain.workflow, chain.gate), StageStatus::Invalid);
    assert_eq!(status(&chain.workflow, chain.histogram), StageStatus::Invalid);

    let after = chain.workflow.stage(chain.gate).unwrap().result().unwrap();
    assert!(std::sync::Arc::ptr_eq(&before, after));

    // The histogram's own result is untouched, only its status moved
    assert_eq!(events(&chain.workflow, chain.histogram), 2);
    assert!(calls(&chain.log, "apply:").is_empty());
    assert_settled(&chain.workflow);
}

/// Recovering the gate brings the histogram back in the same cascade
#[test]
fn test_gate_recovers_after_rejection() {
    let mut chain = gating_chain(200.0);
    chain.workflow.set_parameter(chain.gate, "channel", "CD4").unwrap();

    let report = chain
        .workflow
        .set_parameter(chain.gate, "channel", "SSC")
        .unwrap();

    assert_cycle_order(&chain.workflow, &report, &["Gate", "Histogram"]);
    assert!(chain.workflow.is_valid());
    // Nothing in SSC reaches 200
    assert_eq!(events(&chain.workflow, chain.histogram), 0);
}

/// An invalid gate's result is not read downstream
#[test]
fn test_histogram_does_not_read_invalid_gate() {
    let mut chain = gating_chain(200.0);
    chain.workflow.set_parameter(chain.gate, "channel", "CD4").unwrap();
    clear(&chain.log);

    let report = chain.workflow.update(chain.histogram).unwrap();

    assert_eq!(report.rejected, Some(chain.histogram));
    assert_eq!(calls(&chain.log, "validate:"), vec!["Histogram"]);
    assert!(calls(&chain.log, "apply:").is_empty());
    assert_eq!(status(&chain.workflow, chain.histogram), StageStatus::Invalid);
}

/// Channels follow the predecessor when it is replaced
#[test]
fn test_available_channels_follow_predecessor_identity() {
    let mut chain = gating_chain(200.0);
    assert_eq!(
        chain.workflow.available_channels(chain.gate).unwrap(),
        vec!["FSC".to_string(), "SSC".to_string()]
    );

    // The source has no predecessor
    assert!(chain.workflow.available_channels(chain.source).unwrap().is_empty());

    let (_, report) = chain.workflow.remove(chain.gate).unwrap();
    assert!(report.is_some());
    assert_eq!(
        chain.workflow.available_channels(chain.histogram).unwrap(),
        vec!["FSC".to_string(), "SSC".to_string()]
    );
    assert_eq!(events(&chain.workflow, chain.histogram), 4);
}

/// Channels follow the predecessor's recomputed result
#[test]
fn test_available_channels_follow_predecessor_version() {
    let log = new_log();
    let mut workflow = Workflow::new("selection");
    workflow.push(Box::new(SourceOp::new("Source", &log)));
    let (select, _) = workflow.push(Box::new(SelectOp::new("Select", "FSC|SSC")));
    let (histogram, _) = workflow.push(Box::new(RecorderOp::new("Histogram", &log)));

    assert_eq!(
        workflow.available_channels(histogram).unwrap(),
        vec!["FSC".to_string(), "SSC".to_string()]
    );
    let version = workflow.stage(select).unwrap().result_version();

    let report = workflow.set_parameter(select, "pattern", "^SSC$").unwrap();

    assert_cycle_order(&workflow, &report, &["Select", "Histogram"]);
    assert_ne!(workflow.stage(select).unwrap().result_version(), version);
    assert_eq!(
        workflow.available_channels(histogram).unwrap(),
        vec!["SSC".to_string()]
    );
    // Repeated reads agree with the recomputed result
    assert_eq!(
        workflow.available_channels(histogram).unwrap(),
        vec!["SSC".to_string()]
    );
}
