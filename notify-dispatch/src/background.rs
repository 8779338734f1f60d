//! 后台执行包装
//!
//! 将任意一种分发策略放到独立任务中运行：
//! - 调用方立即返回，不等待任何处理器；
//! - 每次运行都从作用域工厂新建独立作用域，运行结束即释放，不与调用方共享资源；
//! - 失败整理为 `FailureReport` 交给作用域内的上报器；没有上报器时失败被丢弃；
//! - 处理器 panic 只记录日志，不会波及调用方。
//!
use crate::policy::PublishPolicy;
use futures_util::FutureExt;
use notify_core::{FailureReport, HandlerBinding, HandlerContext, Notification, ScopeFactory};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span};

/// 在后台启动一次发布并立即返回
///
/// 必须在 tokio 运行时内调用；否则记录错误并放弃本次发布。
pub(crate) fn run_detached<N>(
    policy: PublishPolicy,
    bindings: Vec<HandlerBinding<N>>,
    notification: Arc<N>,
    scope_factory: Arc<dyn ScopeFactory>,
    cancellation: CancellationToken,
) where
    N: Notification,
{
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(
                notification = N::NAME,
                policy = policy.name(),
                error = %err,
                "no tokio runtime, background publish dropped"
            );
            return;
        }
    };

    let span = info_span!(
        "background_publish",
        notification = N::NAME,
        policy = policy.name()
    );

    runtime.spawn(
        run(policy, bindings, notification, scope_factory, cancellation).instrument(span),
    );
}

async fn run<N>(
    policy: PublishPolicy,
    bindings: Vec<HandlerBinding<N>>,
    notification: Arc<N>,
    scope_factory: Arc<dyn ScopeFactory>,
    cancellation: CancellationToken,
) where
    N: Notification,
{
    let scope = Arc::new(scope_factory.create_scope());
    let scope_id = scope.id();
    let sink = scope.failure_sink();
    let ctx = HandlerContext::new(scope, cancellation);

    debug!(%scope_id, handlers = bindings.len(), "background publish started");

    let outcome = AssertUnwindSafe(policy.dispatch(&bindings, notification, &ctx))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => debug!(%scope_id, "background publish completed"),
        Ok(Err(err)) => {
            let report = FailureReport::builder()
                .notification(N::NAME)
                .policy(policy.name())
                .scope_id(scope_id)
                .error(err)
                .build();

            match sink {
                Some(sink) => sink.report(&report),
                None => debug!(
                    %scope_id,
                    failures = report.failure_count(),
                    error = %report.error(),
                    "background publish failed, no failure sink configured"
                ),
            }
        }
        Err(panic) => error!(
            %scope_id,
            panic = %extract_panic_message(&panic),
            "background publish panicked"
        ),
    }
}

fn extract_panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
