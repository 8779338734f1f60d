use notify_core::{HandlerBinding, HandlerContext, Notification, PublishError};
use std::sync::Arc;
use tracing::debug;

/// 逐个执行；首个失败即停止，失败原样返回，其余处理器不再调用
pub(super) async fn dispatch<N>(
    bindings: &[HandlerBinding<N>],
    notification: Arc<N>,
    ctx: &HandlerContext,
) -> Result<(), PublishError>
where
    N: Notification,
{
    for (index, binding) in bindings.iter().enumerate() {
        let outcome = match binding.invoke(notification.clone(), ctx.clone()) {
            Ok(pending) => pending.await,
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            debug!(
                notification = N::NAME,
                handler = binding.handler_name(),
                skipped = bindings.len() - index - 1,
                "handler failed, stopping sequential publish"
            );
            return Err(PublishError::Handler(err));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::{
        Ping, Queue, canceled_ctx, checks_cancellation, ctx, fails, writes,
    };
    use notify_core::error::is_cancellation;
    use notify_core::{AggregateError, Canceled};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stops_at_first_failure() {
        let queue = Queue::default();
        let bindings = vec![
            writes(&queue, "A", 0),
            fails("B", 5),
            writes(&queue, "C", 0),
        ];

        let err = dispatch(&bindings, Arc::new(Ping), &ctx())
            .await
            .unwrap_err();

        assert_eq!(queue.values(), vec!["A"]);
        match err {
            PublishError::Handler(inner) => assert_eq!(inner.to_string(), "B"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn keeps_handler_aggregate_unwrapped() {
        let bindings = vec![HandlerBinding::<Ping>::from_fn("agg", |_, _| async {
            Err::<(), _>(anyhow::Error::from(AggregateError::new(vec![
                anyhow::anyhow!("1"),
                anyhow::anyhow!("2"),
            ])))
        })];

        let err = dispatch(&bindings, Arc::new(Ping), &ctx())
            .await
            .unwrap_err();

        let PublishError::Handler(inner) = err else {
            panic!("sequential must not wrap the failure");
        };
        assert_eq!(inner.downcast_ref::<AggregateError>().map(|a| a.len()), Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_stops_like_any_failure() {
        let queue = Queue::default();
        let bindings = vec![
            checks_cancellation(&queue, "A"),
            checks_cancellation(&queue, "B"),
        ];

        let err = dispatch(&bindings, Arc::new(Ping), &canceled_ctx())
            .await
            .unwrap_err();

        let PublishError::Handler(inner) = err else {
            panic!("sequential must not wrap the cancellation");
        };
        assert!(is_cancellation(&inner));
        assert_eq!(
            inner.downcast_ref::<Canceled>().map(Canceled::reason),
            Some("cancellation requested")
        );
        assert!(queue.values().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_bindings_succeed() {
        let bindings: Vec<HandlerBinding<Ping>> = Vec::new();
        assert!(dispatch(&bindings, Arc::new(Ping), &ctx()).await.is_ok());
    }
}
