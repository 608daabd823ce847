//! Test: Shared workflow - triggers from concurrent tasks

use crate::helpers::*;
use serde_json::json;
use workflow::core::StageStatus;
use workflow::execution::SharedWorkflow;

#[tokio::test]
async fn test_triggers_from_tasks_are_serialized() {
    let chain = gating_chain(100.0);
    let log = chain.log.clone();
    let shared = SharedWorkflow::new(chain.workflow);

    let mut handles = Vec::new();
    for threshold in [150.0, 250.0, 350.0] {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            shared
                .set_parameter("Gate", "threshold", json!(threshold))
                .await
        }));
    }
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(report.is_clean());
    }

    // Every cascade ran Gate then Histogram without interleaving
    let applied = calls(&log, "apply:");
    assert_eq!(applied, vec!["Histogram"; 3]);

    let snapshots = shared.snapshots().await;
    assert!(snapshots.iter().all(|s| s.status == StageStatus::Valid));
}

#[tokio::test]
async fn test_unknown_stage_is_an_error() {
    let chain = gating_chain(100.0);
    let shared = SharedWorkflow::new(chain.workflow);

    let result = shared.set_parameter("Missing", "threshold", json!(1.0)).await;
    assert!(result.is_err());

    let workflow = shared.try_into_inner().unwrap();
    assert_eq!(status(&workflow, chain.gate), StageStatus::Valid);
}
