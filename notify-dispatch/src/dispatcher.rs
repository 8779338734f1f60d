//! 通知调度器（Dispatcher）
//!
//! 根据调用方给出的 `PublishStrategy` 查表得到执行策略与执行方式：
//! - 前台：在调度器自身的作用域内执行策略，结果原样返回；
//! - 后台：交给后台执行包装，立即返回 `Ok(())`；
//! - `Default` 与无法识别的策略：以配置中的默认策略在前台执行。
//!
use crate::background;
use crate::config::DispatcherConfig;
use crate::policy::PublishPolicy;
use crate::registry::HandlerRegistry;
use crate::strategy::{ExecutionMode, PublishStrategy};
use bon::Builder;
use notify_core::{HandlerContext, Notification, PublishError, Scope, ScopeFactory};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::dispatcher_builder::{IsUnset, SetRegistry, State as BuilderState};

#[derive(Builder)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    /// 前台发布使用的作用域
    #[builder(default = Arc::new(Scope::new()))]
    scope: Arc<Scope>,
    /// 后台发布为每次运行创建新作用域
    #[builder(default = default_scope_factory())]
    scope_factory: Arc<dyn ScopeFactory>,
    #[builder(default)]
    config: DispatcherConfig,
}

fn default_scope_factory() -> Arc<dyn ScopeFactory> {
    Arc::new(Scope::new)
}

impl<S: BuilderState> DispatcherBuilder<S> {
    /// 直接接收注册表，内部包装为 `Arc`
    pub fn handlers(self, registry: HandlerRegistry) -> DispatcherBuilder<SetRegistry<S>>
    where
        <S as BuilderState>::Registry: IsUnset,
    {
        self.registry(Arc::new(registry))
    }
}

impl Dispatcher {
    /// 以默认策略发布，取消令牌永不触发
    pub async fn publish_default<N>(&self, notification: N) -> Result<(), PublishError>
    where
        N: Notification,
    {
        self.publish(notification, PublishStrategy::Default, CancellationToken::new())
            .await
    }

    /// 按策略发布通知
    pub async fn publish<N>(
        &self,
        notification: N,
        strategy: PublishStrategy,
        cancellation: CancellationToken,
    ) -> Result<(), PublishError>
    where
        N: Notification,
    {
        let bindings = self.registry.resolve::<N>();
        let notification = Arc::new(notification);

        let (policy, mode) = match strategy.route() {
            Some(route) => route,
            None => {
                debug!(
                    notification = N::NAME,
                    %strategy,
                    policy = self.config.default_policy.name(),
                    "no route for strategy, using default publish"
                );
                (self.config.default_policy, ExecutionMode::Foreground)
            }
        };

        match mode {
            ExecutionMode::Foreground => {
                let ctx = HandlerContext::new(self.scope.clone(), cancellation);
                policy.dispatch(&bindings, notification, &ctx).await
            }
            ExecutionMode::Background => {
                background::run_detached(
                    policy,
                    bindings,
                    notification,
                    self.scope_factory.clone(),
                    cancellation,
                );
                Ok(())
            }
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    pub fn default_policy(&self) -> PublishPolicy {
        self.config.default_policy
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("scope", &self.scope.id())
            .field("notifications", &self.registry.registered_notifications())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
