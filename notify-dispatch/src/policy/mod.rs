//! 分发策略（PublishPolicy）
//!
//! 封闭的三种策略，共享同一签名 `dispatch(bindings, notification, ctx)`：
//! - `Sequential`：按序执行，首个失败即停止并原样返回；
//! - `SequentialAll`：按序执行全部处理器，失败扁平化后聚合；
//! - `Concurrent`：并发执行全部处理器，等待全部结束，失败扁平化后聚合。
//!
//! 致命失败（panic）在任何策略中都不会被聚合，直接向上展开。
//!
mod concurrent;
mod sequential;
mod sequential_all;

use notify_core::{HandlerBinding, HandlerContext, Notification, PublishError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPolicy {
    Sequential,
    SequentialAll,
    Concurrent,
}

impl PublishPolicy {
    pub fn name(self) -> &'static str {
        match self {
            PublishPolicy::Sequential => "sequential",
            PublishPolicy::SequentialAll => "sequential_all",
            PublishPolicy::Concurrent => "concurrent",
        }
    }

    /// 按策略将通知分发给全部处理器
    pub async fn dispatch<N>(
        self,
        bindings: &[HandlerBinding<N>],
        notification: Arc<N>,
        ctx: &HandlerContext,
    ) -> Result<(), PublishError>
    where
        N: Notification,
    {
        match self {
            PublishPolicy::Sequential => sequential::dispatch(bindings, notification, ctx).await,
            PublishPolicy::SequentialAll => {
                sequential_all::dispatch(bindings, notification, ctx).await
            }
            PublishPolicy::Concurrent => concurrent::dispatch(bindings, notification, ctx).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use notify_core::{Canceled, HandlerBinding, HandlerContext, Notification, Scope};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    pub(crate) struct Ping;

    impl Notification for Ping {
        const NAME: &'static str = "ping";
    }

    /// 记录处理器写入顺序的队列
    #[derive(Clone, Default)]
    pub(crate) struct Queue {
        inner: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Queue {
        pub(crate) fn write(&self, value: &'static str) {
            self.inner.lock().unwrap().push(value);
        }

        pub(crate) fn values(&self) -> Vec<&'static str> {
            self.inner.lock().unwrap().clone()
        }
    }

    pub(crate) fn ctx() -> HandlerContext {
        HandlerContext::new(Arc::new(Scope::new()), CancellationToken::new())
    }

    pub(crate) fn writes(queue: &Queue, value: &'static str, delay_ms: u64) -> HandlerBinding<Ping> {
        let queue = queue.clone();
        HandlerBinding::from_fn(value, move |_, ctx| {
            let queue = queue.clone();
            async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                    _ = ctx.cancellation().cancelled() => {
                        return Err(anyhow::Error::from(Canceled::new("stopped")));
                    }
                }
                queue.write(value);
                Ok(())
            }
        })
    }

    /// 先检查取消令牌，未取消时写入
    pub(crate) fn checks_cancellation(queue: &Queue, value: &'static str) -> HandlerBinding<Ping> {
        let queue = queue.clone();
        HandlerBinding::from_fn(value, move |_, ctx| {
            let queue = queue.clone();
            async move {
                Canceled::check(ctx.cancellation())?;
                queue.write(value);
                Ok::<(), anyhow::Error>(())
            }
        })
    }

    pub(crate) fn canceled_ctx() -> HandlerContext {
        let token = CancellationToken::new();
        token.cancel();
        HandlerContext::new(Arc::new(Scope::new()), token)
    }

    pub(crate) fn fails(message: &'static str, delay_ms: u64) -> HandlerBinding<Ping> {
        HandlerBinding::from_fn(message, move |_, _| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Err::<(), _>(anyhow::anyhow!(message))
        })
    }

    pub(crate) fn messages(err: &notify_core::PublishError) -> Vec<String> {
        err.leaves().iter().map(|e| e.to_string()).collect()
    }
}
