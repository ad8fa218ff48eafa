use stepflow::engine::{FlowRuntime, FlowState};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn single_step_flow() -> serde_json::Value {
    json!({
        "steps": [
            {"id": "only", "type": "Noop"}
        ]
    })
}

#[tokio::test]
async fn test_flow_state_transitions() {
    let mut runtime = FlowRuntime::from_json(single_step_flow()).unwrap();

    // Initially Idle
    assert_eq!(runtime.state().name(), "Idle");

    // Start flow (Idle -> Starting -> Running)
    runtime.start().await.unwrap();
    assert_eq!(runtime.state().name(), "Running");

    // Stop flow (Running -> Completed)
    runtime.stop().await.unwrap();
    assert_eq!(runtime.state().name(), "Completed");
}

#[tokio::test]
async fn test_invalid_state_transition() {
    let mut runtime = FlowRuntime::from_json(single_step_flow()).unwrap();

    // Idle -> Completed skips a run
    let result = runtime.transition_to(FlowState::Completed { duration: None });

    assert!(result.is_err());
    assert_eq!(runtime.state().name(), "Idle");
}

#[tokio::test]
async fn test_valid_state_transition() {
    let mut runtime = FlowRuntime::from_json(single_step_flow()).unwrap();

    assert_ok!(runtime.transition_to(FlowState::Starting));
    assert_eq!(runtime.state().name(), "Starting");

    assert_ok!(runtime.transition_to(FlowState::Failed {
        error_msg: "boom".to_string()
    }));
    assert_ok!(runtime.transition_to(FlowState::Idle));
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let mut runtime = FlowRuntime::from_json(single_step_flow()).unwrap();

    runtime.start().await.unwrap();
    assert_err!(runtime.start().await);
    assert!(runtime.state().is_running());

    runtime.stop().await.unwrap();
}
