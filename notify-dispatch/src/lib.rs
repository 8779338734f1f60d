//! 通知分发引擎（notify-dispatch）
//!
//! 将一条通知按选定的执行策略投递给全部已注册处理器，并给出确定的失败结果：
//! - `strategy`：调用方可选的发布策略与静态路由表；
//! - `policy`：顺序（首错即停）、顺序全量（聚合失败）、并发（聚合失败）三种策略；
//! - `background`：后台执行包装，独立作用域 + 失败上报；
//! - `dispatcher`：按策略路由并执行，未知策略回退到默认策略；
//! - `registry`：基于内存的处理器注册表；
//! - `config` / `sink`：调度器配置与基于 tracing 的失败上报器。
//!
mod background;
pub mod config;
pub mod dispatcher;
pub mod policy;
pub mod registry;
pub mod sink;
pub mod strategy;

pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use policy::PublishPolicy;
pub use registry::HandlerRegistry;
pub use sink::TracingFailureSink;
pub use strategy::{ExecutionMode, PublishStrategy};
