//! 投递器端到端：注册、匹配、超时扫描、排空与坏回调隔离。

use std::sync::Arc;
use std::time::Duration;

use courier_core::error::CourierError;
use courier_core::future::InvokeCallback;
use courier_core::invoke::{Request, Response};
use courier_core::test_stubs::{RecordingCallback, RecordingInterceptor};
use courier_dispatch::{DispatcherConfig, ResponseDispatcher, ResponseFuture};
use parking_lot::Mutex;
use serde_json::Value;

fn dispatcher() -> Arc<ResponseDispatcher> {
    ResponseDispatcher::start(DispatcherConfig {
        callback_concurrency: 4,
        sweep_interval: Duration::from_millis(20),
    })
}

fn pending(timeout: Duration) -> Arc<ResponseFuture> {
    let request = Request::builder("demo.Echo", "ping").build();
    ResponseFuture::new(request, timeout)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test(flavor = "multi_thread")]
async fn response_is_matched_and_callbacks_run_in_chain_order() {
    let dispatcher = dispatcher();
    let future = pending(Duration::from_secs(5));
    let callback = RecordingCallback::new();
    let chain_log = Arc::new(Mutex::new(Vec::new()));
    future.set_callback(callback.clone());
    future.add_interceptor(Arc::new(RecordingInterceptor::new("first", chain_log.clone())));
    future.add_interceptor(Arc::new(RecordingInterceptor::new("second", chain_log.clone())));
    dispatcher.register(future.clone()).unwrap();

    let response = Response::new(future.request_id(), Value::String("pong".into()));
    dispatcher.dispatch(future.request_id(), Ok(response));

    wait_until(|| !callback.events().is_empty()).await;
    assert_eq!(callback.events(), vec![r#"success:"pong""#.to_string()]);
    assert_eq!(
        chain_log.lock().clone(),
        vec!["before:first", "before:second", "after:first", "after:second"]
    );
    assert_eq!(dispatcher.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn awaiting_caller_observes_the_same_outcome() {
    let dispatcher = dispatcher();
    let future = pending(Duration::from_secs(5));
    dispatcher.register(future.clone()).unwrap();

    let waiter = future.clone();
    let task = tokio::spawn(async move { waiter.outcome().await });
    dispatcher.dispatch(
        future.request_id(),
        Ok(Response::new(future.request_id(), Value::Bool(true))),
    );
    let outcome = task.await.unwrap();
    assert_eq!(
        outcome.as_ref().as_ref().unwrap().payload(),
        &Value::Bool(true)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_correlation_id_is_rejected() {
    let dispatcher = dispatcher();
    let future = pending(Duration::from_secs(5));
    dispatcher.register(future.clone()).unwrap();

    let twin_request = Request::builder("demo.Echo", "ping")
        .request_id(future.request_id())
        .build();
    let twin = ResponseFuture::new(twin_request, Duration::from_secs(5));
    let err = dispatcher.register(twin).unwrap_err();
    assert_eq!(err.code(), "dispatch.invalid_state");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_correlation_id_is_discarded() {
    let dispatcher = dispatcher();
    dispatcher.dispatch(42, Ok(Response::new(42, Value::Null)));
    assert_eq!(dispatcher.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn sweeper_times_out_overdue_calls_and_later_response_is_a_no_op() {
    let dispatcher = dispatcher();
    let future = pending(Duration::from_millis(50));
    let callback = RecordingCallback::new();
    future.set_callback(callback.clone());
    dispatcher.register(future.clone()).unwrap();

    wait_until(|| !callback.events().is_empty()).await;
    assert_eq!(callback.events(), vec!["failure:call.timeout".to_string()]);
    assert_eq!(dispatcher.pending_count(), 0);

    // 迟到的响应只会被丢弃，回调不会第二次触发。
    dispatcher.dispatch(
        future.request_id(),
        Ok(Response::new(future.request_id(), Value::Null)),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(callback.events().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_drains_pending_calls_with_unavailable() {
    let dispatcher = dispatcher();
    let first = pending(Duration::from_secs(5));
    let second = pending(Duration::from_secs(5));
    let callback_a = RecordingCallback::new();
    let callback_b = RecordingCallback::new();
    first.set_callback(callback_a.clone());
    second.set_callback(callback_b.clone());
    dispatcher.register(first.clone()).unwrap();
    dispatcher.register(second.clone()).unwrap();

    dispatcher.shutdown();

    wait_until(|| !callback_a.events().is_empty() && !callback_b.events().is_empty()).await;
    assert_eq!(callback_a.events(), vec!["failure:cluster.unavailable".to_string()]);
    assert_eq!(callback_b.events(), vec!["failure:cluster.unavailable".to_string()]);

    let late = pending(Duration::from_secs(5));
    let err = dispatcher.register(late).unwrap_err();
    assert_eq!(err.code(), "dispatch.invalid_state");
}

/// 必定 panic 的回调，验证投递运行时的隔离性。
struct PanickingCallback;

impl InvokeCallback for PanickingCallback {
    fn on_success(&self, _response: &Response) {
        panic!("buggy user callback");
    }

    fn on_failure(&self, _error: &CourierError) {
        panic!("buggy user callback");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_callback_does_not_affect_other_pending_calls() {
    let dispatcher = dispatcher();
    let poisoned = pending(Duration::from_secs(5));
    poisoned.set_callback(Arc::new(PanickingCallback));
    let healthy = pending(Duration::from_secs(5));
    let callback = RecordingCallback::new();
    healthy.set_callback(callback.clone());
    dispatcher.register(poisoned.clone()).unwrap();
    dispatcher.register(healthy.clone()).unwrap();

    dispatcher.dispatch(
        poisoned.request_id(),
        Ok(Response::new(poisoned.request_id(), Value::Null)),
    );
    dispatcher.dispatch(
        healthy.request_id(),
        Ok(Response::new(healthy.request_id(), Value::Null)),
    );

    wait_until(|| !callback.events().is_empty()).await;
    assert_eq!(callback.events(), vec!["success:null".to_string()]);
}
