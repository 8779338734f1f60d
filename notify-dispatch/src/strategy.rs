//! 发布策略（PublishStrategy）与静态路由表
//!
//! 调用方通过 `PublishStrategy` 选择执行方式，调度器据此查表得到
//! `(PublishPolicy, ExecutionMode)`。`Default` 及任何无法识别的取值都不在表中，
//! 由调度器回退到默认策略，永远不会因此报错。
//!
use crate::policy::PublishPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 执行方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// 调用方等待全部处理器完成
    Foreground,
    /// 立即返回，真正的执行在后台独立进行
    Background,
}

/// 发布策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum PublishStrategy {
    /// 默认投递方式（由调度器配置决定）
    #[default]
    Default,
    /// 逐个执行并等待；首个失败即停止，其余处理器不再执行
    Sequential,
    /// 逐个执行并等待；遇到失败继续执行，全部失败扁平化后聚合返回
    SequentialAll,
    /// 并发执行全部处理器并等待全部结束；失败扁平化后聚合返回
    Concurrent,
    /// 后台执行 `Sequential`，立即返回，失败交给上报器
    SequentialBackground,
    /// 后台执行 `SequentialAll`，立即返回，失败交给上报器
    SequentialAllBackground,
    /// 后台执行 `Concurrent`，立即返回，失败交给上报器
    ConcurrentBackground,
}

/// 策略 → (执行策略, 执行方式)，编译期常量，运行期只读
const ROUTES: [(PublishStrategy, PublishPolicy, ExecutionMode); 6] = [
    (
        PublishStrategy::Sequential,
        PublishPolicy::Sequential,
        ExecutionMode::Foreground,
    ),
    (
        PublishStrategy::SequentialAll,
        PublishPolicy::SequentialAll,
        ExecutionMode::Foreground,
    ),
    (
        PublishStrategy::Concurrent,
        PublishPolicy::Concurrent,
        ExecutionMode::Foreground,
    ),
    (
        PublishStrategy::SequentialBackground,
        PublishPolicy::Sequential,
        ExecutionMode::Background,
    ),
    (
        PublishStrategy::SequentialAllBackground,
        PublishPolicy::SequentialAll,
        ExecutionMode::Background,
    ),
    (
        PublishStrategy::ConcurrentBackground,
        PublishPolicy::Concurrent,
        ExecutionMode::Background,
    ),
];

impl PublishStrategy {
    /// 查表；`Default` 返回 `None`
    pub fn route(self) -> Option<(PublishPolicy, ExecutionMode)> {
        ROUTES
            .iter()
            .find(|(strategy, _, _)| *strategy == self)
            .map(|&(_, policy, mode)| (policy, mode))
    }

    pub fn is_background(self) -> bool {
        matches!(self.route(), Some((_, ExecutionMode::Background)))
    }

    /// 稳定的数值编码：前台 1..=3，后台为对应前台编码 + 10
    pub fn code(self) -> u32 {
        match self {
            PublishStrategy::Default => 0,
            PublishStrategy::Sequential => 1,
            PublishStrategy::SequentialAll => 2,
            PublishStrategy::Concurrent => 3,
            PublishStrategy::SequentialBackground => 11,
            PublishStrategy::SequentialAllBackground => 12,
            PublishStrategy::ConcurrentBackground => 13,
        }
    }

    /// 由数值编码还原；未知编码回退为 `Default`
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => PublishStrategy::Sequential,
            2 => PublishStrategy::SequentialAll,
            3 => PublishStrategy::Concurrent,
            11 => PublishStrategy::SequentialBackground,
            12 => PublishStrategy::SequentialAllBackground,
            13 => PublishStrategy::ConcurrentBackground,
            _ => PublishStrategy::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PublishStrategy::Default => "default",
            PublishStrategy::Sequential => "sequential",
            PublishStrategy::SequentialAll => "sequential_all",
            PublishStrategy::Concurrent => "concurrent",
            PublishStrategy::SequentialBackground => "sequential_background",
            PublishStrategy::SequentialAllBackground => "sequential_all_background",
            PublishStrategy::ConcurrentBackground => "concurrent_background",
        }
    }
}

impl fmt::Display for PublishStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 宽松解析：忽略大小写与 `_`/`-` 分隔符，`when_all` 视同 `concurrent`；
/// 未知名称回退为 `Default`
impl From<&str> for PublishStrategy {
    fn from(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "sequential" => PublishStrategy::Sequential,
            "sequentialall" => PublishStrategy::SequentialAll,
            "concurrent" | "whenall" => PublishStrategy::Concurrent,
            "sequentialbackground" => PublishStrategy::SequentialBackground,
            "sequentialallbackground" => PublishStrategy::SequentialAllBackground,
            "concurrentbackground" | "whenallbackground" => PublishStrategy::ConcurrentBackground,
            _ => PublishStrategy::Default,
        }
    }
}

impl From<String> for PublishStrategy {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
