use notify_core::{FailureRecord, HandlerBinding, HandlerContext, Notification, PublishError};
use std::sync::Arc;
use tracing::debug;

/// 逐个执行全部处理器；失败不打断后续处理器，最终扁平化聚合
///
/// panic 不会被捕获，直接向上展开。
pub(super) async fn dispatch<N>(
    bindings: &[HandlerBinding<N>],
    notification: Arc<N>,
    ctx: &HandlerContext,
) -> Result<(), PublishError>
where
    N: Notification,
{
    let mut record = FailureRecord::new();

    for binding in bindings {
        let outcome = match binding.invoke(notification.clone(), ctx.clone()) {
            Ok(pending) => pending.await,
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            debug!(
                notification = N::NAME,
                handler = binding.handler_name(),
                error = %err,
                "handler failed, continuing"
            );
            record.push(err);
        }
    }

    record.into_result().map_err(PublishError::from)
}
