//! 失败报告（FailureReport）与上报器（FailureSink）
//!
//! 后台运行的失败不会回到调用方，而是整理成一份报告交给作用域内的上报器。
//!
use crate::error::PublishError;
use bon::Builder;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 一次后台发布的失败报告
#[derive(Builder, Debug)]
pub struct FailureReport {
    /// 通知名称（`Notification::NAME`）
    notification: &'static str,
    /// 执行策略名称
    policy: &'static str,
    /// 后台运行所在作用域
    scope_id: Uuid,
    /// 失败时间
    #[builder(default = Utc::now())]
    occurred_at: DateTime<Utc>,
    error: PublishError,
}

impl FailureReport {
    pub fn notification(&self) -> &'static str {
        self.notification
    }

    pub fn policy(&self) -> &'static str {
        self.policy
    }

    pub fn scope_id(&self) -> Uuid {
        self.scope_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn error(&self) -> &PublishError {
        &self.error
    }

    /// 报告中包含的叶子失败数
    pub fn failure_count(&self) -> usize {
        self.error.leaves().len()
    }

    pub fn into_error(self) -> PublishError {
        self.error
    }
}

/// 失败上报器（例如日志）
pub trait FailureSink: Send + Sync {
    fn report(&self, report: &FailureReport);
}
