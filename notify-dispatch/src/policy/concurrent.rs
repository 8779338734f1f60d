use futures_util::future::join_all;
use notify_core::{
    FailureRecord, HandlerBinding, HandlerContext, HandlerFuture, HandlerResult, Notification,
    PublishError,
};
use std::panic;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio_util::task::AbortOnDropHandle;
use tracing::{Instrument, Span, debug};

/// 并发执行全部处理器，等待全部结束后聚合失败
///
/// 失败分两段收集：
/// 1. 调用阶段：处理器在产生 future 之前就失败（同步失败），按绑定顺序立即记录；
///    这类调用从未进入等待集合，若不在此处记录就会丢失。
/// 2. 等待阶段：其余调用各自作为任务运行，全部结束后按绑定顺序逐个归类。
///
/// 最终失败顺序：同步失败在前，等待阶段的失败在后。
///
/// 不在 tokio 运行时内时，其余调用在当前 future 中就地并发推进，失败顺序不变。
pub(super) async fn dispatch<N>(
    bindings: &[HandlerBinding<N>],
    notification: Arc<N>,
    ctx: &HandlerContext,
) -> Result<(), PublishError>
where
    N: Notification,
{
    let mut immediate = FailureRecord::new();
    let mut pending = Vec::with_capacity(bindings.len());

    for binding in bindings {
        match binding.invoke(notification.clone(), ctx.clone()) {
            Ok(fut) => pending.push((binding.handler_name(), fut)),
            Err(err) => {
                debug!(
                    notification = N::NAME,
                    handler = binding.handler_name(),
                    error = %err,
                    "handler failed before yielding"
                );
                immediate.push(err);
            }
        }
    }

    let (names, futures): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
    let settled = settle(futures).await;

    let mut settled_failures = FailureRecord::new();
    for (handler, outcome) in names.into_iter().zip(settled) {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(notification = N::NAME, handler, error = %err, "handler failed");
                settled_failures.push(err);
            }
            Err(join_err) => classify_join_error(handler, join_err, &mut settled_failures),
        }
    }

    immediate.extend(settled_failures);
    immediate.into_result().map_err(PublishError::from)
}

/// 等待全部调用结束，结果与输入一一对应
async fn settle(futures: Vec<HandlerFuture>) -> Vec<Result<HandlerResult, JoinError>> {
    let Ok(runtime) = Handle::try_current() else {
        debug!(handlers = futures.len(), "no tokio runtime, driving handlers in place");
        return join_all(futures).await.into_iter().map(Ok).collect();
    };

    let handles = futures
        .into_iter()
        .map(|fut| AbortOnDropHandle::new(runtime.spawn(fut.instrument(Span::current()))));
    join_all(handles).await
}

/// 任务被中止时保留任务自身的取消错误；任务 panic 时恢复原始 panic
fn classify_join_error(handler: &'static str, join_err: JoinError, record: &mut FailureRecord) {
    if join_err.is_panic() {
        panic::resume_unwind(join_err.into_panic());
    }

    debug!(handler, "handler task was cancelled");
    record.push(anyhow::Error::new(join_err));
}
