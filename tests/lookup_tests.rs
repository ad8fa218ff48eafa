mod common;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use common::{context, lookup_flow, lookup_settings, record, RecordingCallback};
use stepflow::components::{Lookup, LookupState};
use stepflow::core::{ComponentError, ComponentRuntime, Message, Payload, SendCallback, StepId, Value};

fn source_message(seq: u64, boundary: bool, rows: &[(&str, i64)]) -> Message {
    let records = rows
        .iter()
        .map(|(k, v)| record(&[("k", Value::from(*k)), ("v", Value::from(*v))]))
        .collect::<Vec<_>>();
    Message::content("source", seq, boundary, records)
}

fn main_message(seq: u64, boundary: bool, keys: &[&str]) -> Message {
    let records = keys
        .iter()
        .map(|k| record(&[("rk", Value::from(*k)), ("c", Value::from(seq as i64))]))
        .collect::<Vec<_>>();
    Message::content("main", seq, boundary, records)
}

/// Fails the first `failures` sends, then records like [`RecordingCallback`].
#[derive(Default)]
struct FailingCallback {
    failures: usize,
    inner: RecordingCallback,
}

#[async_trait]
impl SendCallback for FailingCallback {
    async fn send(
        &mut self,
        target: Option<&StepId>,
        payload: Payload,
        unit_of_work_boundary: bool,
    ) -> Result<()> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(anyhow!("downstream unavailable"));
        }
        self.inner.send(target, payload, unit_of_work_boundary).await
    }
}

async fn started_lookup() -> (Lookup, std::sync::Arc<stepflow::observability::ComponentStatistics>) {
    let ctx = context(lookup_flow(lookup_settings("source")), "lookup");
    let statistics = ctx.statistics().clone();
    let mut lookup = Lookup::default();
    lookup.start(0, ctx).await.unwrap();
    (lookup, statistics)
}

fn configuration_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ComponentError>(),
        Some(ComponentError::Configuration { .. })
    )
}

#[tokio::test]
async fn test_start_requires_source_step() {
    let settings = lookup_settings("source").with("lookup.data.source.step", "  ");
    let mut lookup = Lookup::default();

    let err = lookup
        .start(0, context(lookup_flow(settings), "lookup"))
        .await
        .unwrap_err();
    assert!(configuration_error(&err), "unexpected error: {err:#}");
}

#[tokio::test]
async fn test_start_rejects_source_step_outside_flow() {
    let settings = lookup_settings("nowhere");
    let mut lookup = Lookup::default();

    let err = lookup
        .start(0, context(lookup_flow(settings), "lookup"))
        .await
        .unwrap_err();
    assert!(configuration_error(&err));
    assert!(err.to_string().contains("nowhere"));
}

#[tokio::test]
async fn test_start_rejects_attribute_outside_model() {
    let settings = lookup_settings("source").with("replacement.value.attribute", "ghost");
    let mut lookup = Lookup::default();

    let err = lookup
        .start(0, context(lookup_flow(settings), "lookup"))
        .await
        .unwrap_err();
    assert!(configuration_error(&err));
}

#[tokio::test]
async fn test_handle_normal() {
    let (mut lookup, statistics) = started_lookup().await;
    let mut callback = RecordingCallback::default();

    lookup
        .handle(source_message(1, true, &[("A", 1), ("B", 2)]), &mut callback, false)
        .await
        .unwrap();
    assert!(callback.sent.is_empty(), "source messages are never forwarded");
    assert_eq!(lookup.state(), LookupState::Ready);

    lookup
        .handle(main_message(1, true, &["A"]), &mut callback, true)
        .await
        .unwrap();

    assert_eq!(callback.sent.len(), 1);
    let out = callback.records(0);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].value("rk"), &Value::from("A"));
    assert_eq!(out[0].value("rv"), &Value::from(1));
    assert!(callback.sent[0].unit_of_work_boundary);
    assert_eq!(callback.sent[0].target, None);
    assert_eq!(statistics.entities_processed(0), 1);
}

#[tokio::test]
async fn test_main_messages_wait_for_source_boundary() {
    let (mut lookup, statistics) = started_lookup().await;
    let mut callback = RecordingCallback::default();

    lookup.handle(main_message(1, false, &["B", "A"]), &mut callback, false).await.unwrap();
    lookup.handle(source_message(1, false, &[("A", 10)]), &mut callback, false).await.unwrap();
    lookup.handle(main_message(2, true, &["A"]), &mut callback, false).await.unwrap();

    assert!(callback.sent.is_empty());
    assert_eq!(lookup.state(), LookupState::Uninitialized);
    assert_eq!(lookup.pending_len(), 2);

    lookup.handle(source_message(2, true, &[("B", 20)]), &mut callback, false).await.unwrap();

    assert_eq!(lookup.pending_len(), 0);
    assert_eq!(callback.sent.len(), 2);

    let first = callback.records(0);
    assert_eq!(first[0].value("rv"), &Value::from(20));
    assert_eq!(first[1].value("rv"), &Value::from(10));
    assert_eq!(first[0].value("c"), &Value::from(1));
    assert!(!callback.sent[0].unit_of_work_boundary);

    let second = callback.records(1);
    assert_eq!(second[0].value("rv"), &Value::from(10));
    assert_eq!(second[0].value("c"), &Value::from(2));
    assert!(callback.sent[1].unit_of_work_boundary);

    assert_eq!(statistics.entities_processed(0), 3);
}

#[tokio::test]
async fn test_replay_precedes_later_main_messages() {
    let (mut lookup, _) = started_lookup().await;
    let mut callback = RecordingCallback::default();

    lookup.handle(main_message(1, false, &["A"]), &mut callback, false).await.unwrap();
    lookup.handle(source_message(1, true, &[("A", 1)]), &mut callback, false).await.unwrap();
    lookup.handle(main_message(2, true, &["A"]), &mut callback, false).await.unwrap();

    let order: Vec<&Value> = (0..callback.sent.len())
        .map(|i| callback.records(i)[0].value("c"))
        .collect();
    assert_eq!(order, vec![&Value::from(1), &Value::from(2)]);
}

#[tokio::test]
async fn test_missing_key_yields_null() {
    let (mut lookup, _) = started_lookup().await;
    let mut callback = RecordingCallback::default();

    lookup.handle(source_message(1, true, &[("A", 1)]), &mut callback, false).await.unwrap();
    lookup.handle(main_message(1, true, &["Z"]), &mut callback, true).await.unwrap();

    let out = callback.records(0);
    assert!(out[0].contains("rv"));
    assert_eq!(out[0].value("rv"), &Value::Null);
}

#[tokio::test]
async fn test_enriched_record_is_a_copy_with_one_field_overwritten() {
    let (mut lookup, _) = started_lookup().await;
    let mut callback = RecordingCallback::default();

    lookup.handle(source_message(1, true, &[("A", 1)]), &mut callback, false).await.unwrap();

    let input = record(&[
        ("rv", Value::from("stale")),
        ("rk", Value::from("A")),
        ("c", Value::from(7)),
    ]);
    let message = Message::content("main", 1, true, vec![input.clone()]);
    lookup.handle(message, &mut callback, true).await.unwrap();

    let out = &callback.records(0)[0];
    let keys: Vec<&str> = out.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["rv", "rk", "c"]);
    assert_eq!(out.value("rv"), &Value::from(1));
    assert_eq!(out.value("c"), input.value("c"));
}

#[tokio::test]
async fn test_ready_survives_later_source_messages() {
    let (mut lookup, _) = started_lookup().await;
    let mut callback = RecordingCallback::default();

    lookup.handle(source_message(1, true, &[("A", 1)]), &mut callback, false).await.unwrap();
    lookup.handle(source_message(2, false, &[("A", 5), ("B", 6)]), &mut callback, false).await.unwrap();

    assert_eq!(lookup.state(), LookupState::Ready);
    assert_eq!(lookup.table_len(), 2);

    lookup.handle(main_message(1, true, &["A"]), &mut callback, true).await.unwrap();
    assert_eq!(callback.records(0)[0].value("rv"), &Value::from(5));
}

#[tokio::test]
async fn test_stop_is_idempotent_and_restartable() {
    let (mut lookup, _) = started_lookup().await;
    let mut callback = RecordingCallback::default();

    lookup.handle(source_message(1, true, &[("A", 1)]), &mut callback, false).await.unwrap();
    lookup.handle(main_message(1, false, &["A"]), &mut callback, false).await.unwrap();

    lookup.stop().await.unwrap();
    lookup.stop().await.unwrap();
    assert_eq!(lookup.state(), LookupState::Uninitialized);
    assert_eq!(lookup.table_len(), 0);
    assert_eq!(lookup.pending_len(), 0);

    lookup
        .start(0, context(lookup_flow(lookup_settings("source")), "lookup"))
        .await
        .unwrap();
    lookup.handle(main_message(2, false, &["A"]), &mut callback, false).await.unwrap();
    assert_eq!(lookup.pending_len(), 1, "a restarted lookup waits for a fresh table");
}

#[tokio::test]
async fn test_pending_queue_limit_fails_fast() {
    let settings = lookup_settings("source").with("lookup.max.pending.messages", "2");
    let mut lookup = Lookup::default();
    lookup.start(0, context(lookup_flow(settings), "lookup")).await.unwrap();
    let mut callback = RecordingCallback::default();

    lookup.handle(main_message(1, false, &["A"]), &mut callback, false).await.unwrap();
    lookup.handle(main_message(2, false, &["A"]), &mut callback, false).await.unwrap();
    let err = lookup
        .handle(main_message(3, false, &["A"]), &mut callback, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ComponentError>(),
        Some(ComponentError::CapacityExceeded { limit: 2, .. })
    ));
    assert_eq!(lookup.pending_len(), 2);
}

#[tokio::test]
async fn test_table_limit_allows_updates_to_existing_keys() {
    let settings = lookup_settings("source").with("lookup.max.entries", "1");
    let mut lookup = Lookup::default();
    lookup.start(0, context(lookup_flow(settings), "lookup")).await.unwrap();
    let mut callback = RecordingCallback::default();

    lookup.handle(source_message(1, false, &[("A", 1), ("A", 2)]), &mut callback, false).await.unwrap();
    let err = lookup
        .handle(source_message(2, true, &[("B", 3)]), &mut callback, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ComponentError>(),
        Some(ComponentError::CapacityExceeded { .. })
    ));
}

#[tokio::test]
async fn test_invalid_limit_is_a_configuration_error() {
    let settings = lookup_settings("source").with("lookup.max.entries", "lots");
    let mut lookup = Lookup::default();

    let err = lookup
        .start(0, context(lookup_flow(settings), "lookup"))
        .await
        .unwrap_err();
    assert!(configuration_error(&err));
}

#[tokio::test]
async fn test_startup_messages_not_supported() {
    let lookup = Lookup::default();
    assert!(!lookup.supports_startup_messages());
}

#[tokio::test]
async fn test_rejected_source_message_leaves_table_untouched() {
    let settings = lookup_settings("source").with("lookup.max.entries", "1");
    let mut lookup = Lookup::default();
    lookup.start(0, context(lookup_flow(settings), "lookup")).await.unwrap();
    let mut callback = RecordingCallback::default();

    lookup.handle(main_message(1, true, &["A"]), &mut callback, false).await.unwrap();
    let err = lookup
        .handle(source_message(1, true, &[("A", 1), ("B", 2)]), &mut callback, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ComponentError>(),
        Some(ComponentError::CapacityExceeded { limit: 1, .. })
    ));
    assert_eq!(lookup.table_len(), 0);
    assert_eq!(lookup.state(), LookupState::Uninitialized);
    assert_eq!(lookup.pending_len(), 1);
    assert!(callback.sent.is_empty());

    lookup.handle(source_message(2, true, &[("A", 1)]), &mut callback, false).await.unwrap();
    assert_eq!(lookup.state(), LookupState::Ready);
    assert_eq!(callback.records(0)[0].value("rv"), &Value::from(1));
}

#[tokio::test]
async fn test_failed_replay_keeps_message_queued() {
    let (mut lookup, statistics) = started_lookup().await;
    let mut callback = FailingCallback {
        failures: 1,
        ..Default::default()
    };

    lookup.handle(main_message(1, false, &["A"]), &mut callback, false).await.unwrap();
    lookup.handle(main_message(2, false, &["A"]), &mut callback, false).await.unwrap();

    let err = lookup
        .handle(source_message(1, true, &[("A", 1)]), &mut callback, false)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "downstream unavailable");
    assert_eq!(lookup.state(), LookupState::Ready);
    assert_eq!(lookup.pending_len(), 2);
    assert_eq!(statistics.entities_processed(0), 0);

    // The next main message flushes the queue ahead of itself
    lookup.handle(main_message(3, true, &["A"]), &mut callback, true).await.unwrap();

    let order: Vec<&Value> = (0..callback.inner.sent.len())
        .map(|i| callback.inner.records(i)[0].value("c"))
        .collect();
    assert_eq!(order, vec![&Value::from(1), &Value::from(2), &Value::from(3)]);
    assert_eq!(lookup.pending_len(), 0);
    assert_eq!(statistics.entities_processed(0), 3);
}
