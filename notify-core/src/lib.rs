//! 通知分发基础库（notify-core）
//!
//! 定义通知分发引擎所依赖的协议与构件：
//! - 通知（`notification`）与处理器（`handler`）契约，以及处理器绑定；
//! - 失败模型（`error`）：聚合失败、取消失败、发布失败与扁平化规则；
//! - 资源作用域（`scope`）：一次运行独占、结束即释放的执行上下文；
//! - 失败报告（`report`）：后台运行失败的上报协议。
//!
//! 本 crate 不包含任何分发策略，策略与调度器位于 `notify-dispatch`。
//!
pub mod error;
pub mod handler;
pub mod notification;
pub mod report;
pub mod scope;

pub use error::{AggregateError, Canceled, FailureRecord, HandlerResult, PublishError};
pub use handler::{HandlerBinding, HandlerContext, HandlerFuture, NotificationHandler};
pub use notification::Notification;
pub use report::{FailureReport, FailureSink};
pub use scope::{Scope, ScopeFactory};
