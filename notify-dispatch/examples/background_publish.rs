//! 演示：同一条通知分别以前台与后台策略发布
//!
//! 运行：`RUST_LOG=debug cargo run -p notify-dispatch --example background_publish`
//!
use async_trait::async_trait;
use notify_core::{
    Canceled, HandlerContext, HandlerResult, Notification, NotificationHandler, Scope,
};
use notify_dispatch::{Dispatcher, HandlerRegistry, PublishStrategy, TracingFailureSink};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
struct UserRegistered {
    email: String,
}

impl Notification for UserRegistered {
    const NAME: &'static str = "user_registered";
}

struct SendWelcomeEmail;

#[async_trait]
impl NotificationHandler<UserRegistered> for SendWelcomeEmail {
    fn validate(&self, notification: &UserRegistered) -> HandlerResult {
        if !notification.email.contains('@') {
            anyhow::bail!("invalid email address: {}", notification.email);
        }
        Ok(())
    }

    async fn handle(&self, notification: &UserRegistered, ctx: &HandlerContext) -> HandlerResult {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Canceled::check(ctx.cancellation())?;
        info!(email = %notification.email, scope_id = %ctx.scope().id(), "welcome email sent");
        Ok(())
    }
}

struct UpdateCrm;

#[async_trait]
impl NotificationHandler<UserRegistered> for UpdateCrm {
    async fn handle(&self, notification: &UserRegistered, _ctx: &HandlerContext) -> HandlerResult {
        tokio::time::sleep(Duration::from_millis(20)).await;
        anyhow::bail!("crm unavailable for {}", notification.email)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notify_dispatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = HandlerRegistry::new();
    registry.register::<UserRegistered, _>(Arc::new(SendWelcomeEmail));
    registry.register::<UserRegistered, _>(Arc::new(UpdateCrm));

    let dispatcher = Dispatcher::builder()
        .handlers(registry)
        .scope_factory(Arc::new(|| {
            Scope::new().with_failure_sink(Arc::new(TracingFailureSink))
        }))
        .build();

    let user = || UserRegistered {
        email: "someone@example.com".to_string(),
    };

    if let Err(err) = dispatcher
        .publish(user(), PublishStrategy::Concurrent, CancellationToken::new())
        .await
    {
        info!(failures = err.leaves().len(), error = %err, "foreground publish failed");
    }

    dispatcher
        .publish(
            user(),
            PublishStrategy::ConcurrentBackground,
            CancellationToken::new(),
        )
        .await?;
    info!("background publish handed off");

    // 给后台任务留出完成时间
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}
