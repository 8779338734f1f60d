//! 通知处理器（NotificationHandler）与处理器绑定（HandlerBinding）
//!
//! 处理器的一次调用分为两段：
//! - 同步段：`validate`，在产生任何 future 之前执行，失败即“立即失败”；
//! - 异步段：`handle`，在挂起点之后失败即“异步失败”。
//!
//! `HandlerBinding` 将具体处理器擦除为统一的调用函数，供分发策略按顺序调用。
//!
use crate::error::HandlerResult;
use crate::notification::Notification;
use crate::scope::Scope;
use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 处理器调用返回的待完成任务
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

type InvokeFn<N> =
    Arc<dyn Fn(Arc<N>, HandlerContext) -> anyhow::Result<HandlerFuture> + Send + Sync>;

/// 通知处理器：处理某一类型的通知
#[async_trait]
pub trait NotificationHandler<N>: Send + Sync
where
    N: Notification,
{
    /// 同步前置校验，在进入任何挂起点之前执行
    fn validate(&self, _notification: &N) -> HandlerResult {
        Ok(())
    }

    /// 处理通知
    async fn handle(&self, notification: &N, ctx: &HandlerContext) -> HandlerResult;
}

/// 处理器上下文
///
/// 承载一次调用所需的横切信息：
/// - 取消令牌：同一次发布内所有处理器共享，处理器应协作式地观察；
/// - 资源作用域：前台发布为调用方的作用域，后台发布为新建的独立作用域。
#[derive(Clone, Debug)]
pub struct HandlerContext {
    cancellation: CancellationToken,
    scope: Arc<Scope>,
}

impl HandlerContext {
    pub fn new(scope: Arc<Scope>, cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            scope,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }
}

/// 处理器绑定：已解析的处理器实例 + 调用函数
pub struct HandlerBinding<N> {
    handler_name: &'static str,
    invoke: InvokeFn<N>,
}

impl<N> Clone for HandlerBinding<N> {
    fn clone(&self) -> Self {
        Self {
            handler_name: self.handler_name,
            invoke: self.invoke.clone(),
        }
    }
}

impl<N> fmt::Debug for HandlerBinding<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("handler_name", &self.handler_name)
            .finish()
    }
}

impl<N: Notification> HandlerBinding<N> {
    /// 绑定一个实现了 `NotificationHandler` 的处理器
    pub fn new<H>(handler: Arc<H>) -> Self
    where
        H: NotificationHandler<N> + 'static,
    {
        let invoke: InvokeFn<N> = Arc::new(move |notification: Arc<N>, ctx: HandlerContext| {
            handler.validate(&notification)?;

            let handler = handler.clone();
            Ok(async move { handler.handle(&notification, &ctx).await }.boxed())
        });

        Self {
            handler_name: type_name::<H>(),
            invoke,
        }
    }

    /// 以闭包形式绑定处理器（仅异步段）
    pub fn from_fn<F, Fut>(handler_name: &'static str, f: F) -> Self
    where
        F: Fn(Arc<N>, HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            handler_name,
            invoke: Arc::new(move |notification: Arc<N>, ctx: HandlerContext| {
                Ok(f(notification, ctx).boxed())
            }),
        }
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    /// 调用处理器
    ///
    /// 返回 `Err` 表示处理器在产生 future 之前就已失败。
    pub fn invoke(
        &self,
        notification: Arc<N>,
        ctx: HandlerContext,
    ) -> anyhow::Result<HandlerFuture> {
        (self.invoke)(notification, ctx)
    }
}
