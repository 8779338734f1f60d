//! 通知分发统一错误定义
//!
//! - `AggregateError`：多个处理器失败的有序集合；
//! - `Canceled`：协作式取消产生的叶子失败，保留原始取消信息；
//! - `PublishError`：一次发布调用对调用方暴露的失败；
//! - `FailureRecord`：策略执行期间逐步构建的失败记录，始终保持扁平；
//! - `flatten`：将任意失败递归展开为叶子失败序列，所有聚合策略共用。
//!
//! 处理器侧使用 `anyhow::Error` 作为错误载体，引擎只在边界处转换为类型化错误。
//!
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// 处理器执行结果
pub type HandlerResult = anyhow::Result<()>;

/// 聚合失败：按顺序收集的多个失败
///
/// 由引擎产生的聚合失败只包含叶子失败；处理器自行构造的聚合失败允许嵌套，
/// 进入 `FailureRecord` 时会被递归展开。
#[derive(Debug, Error)]
#[error("{} notification handler(s) failed: [{}]", .failures.len(), join_messages(.failures))]
pub struct AggregateError {
    failures: Vec<anyhow::Error>,
}

impl AggregateError {
    pub fn new(failures: Vec<anyhow::Error>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[anyhow::Error] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<anyhow::Error> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

fn join_messages(failures: &[anyhow::Error]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// 取消失败：处理器观察到取消信号后返回的叶子失败
#[derive(Debug, Clone, Error)]
#[error("notification handling canceled: {reason}")]
pub struct Canceled {
    reason: Cow<'static, str>,
    canceled_at: DateTime<Utc>,
}

impl Canceled {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: reason.into(),
            canceled_at: Utc::now(),
        }
    }

    /// 若令牌已取消则返回 `Canceled`，便于处理器在挂起点之间使用 `?`
    pub fn check(token: &CancellationToken) -> Result<(), Canceled> {
        if token.is_cancelled() {
            return Err(Self::new("cancellation requested"));
        }
        Ok(())
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn canceled_at(&self) -> DateTime<Utc> {
        self.canceled_at
    }
}

/// 判断一个叶子失败是否为取消类失败（处理器返回的 `Canceled` 或被中止任务的 `JoinError`）
pub fn is_cancellation(error: &anyhow::Error) -> bool {
    error.downcast_ref::<Canceled>().is_some()
        || error
            .downcast_ref::<JoinError>()
            .is_some_and(JoinError::is_cancelled)
}

/// 发布失败
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PublishError {
    /// 顺序策略：首个失败，原样返回
    #[error(transparent)]
    Handler(anyhow::Error),

    /// 聚合策略：全部处理器的扁平失败集合
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl PublishError {
    /// 展开后的全部叶子失败（只读视图）
    pub fn leaves(&self) -> Vec<&anyhow::Error> {
        let mut leaves = Vec::new();
        for part in self.parts() {
            walk(part, &mut leaves);
        }
        leaves
    }

    pub fn into_leaves(self) -> Vec<anyhow::Error> {
        let mut leaves = Vec::new();
        for part in self.into_parts() {
            walk(part, &mut leaves);
        }
        leaves
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, PublishError::Aggregate(_))
    }

    fn parts(&self) -> Vec<&anyhow::Error> {
        match self {
            PublishError::Handler(inner) => vec![inner],
            PublishError::Aggregate(aggregate) => aggregate.failures().iter().collect(),
        }
    }

    fn into_parts(self) -> Vec<anyhow::Error> {
        match self {
            PublishError::Handler(inner) => vec![inner],
            PublishError::Aggregate(aggregate) => aggregate.into_failures(),
        }
    }
}

/// 展开时的失败节点，持有或借用均可
///
/// 两个方法只负责“拆开一层”，拆不开时原样交还；展开顺序与递归由 `walk` 决定。
trait FailureNode: Sized {
    fn split_aggregate(self) -> Result<Vec<Self>, Self>;
    fn split_publish(self) -> Result<Vec<Self>, Self>;
}

impl FailureNode for anyhow::Error {
    fn split_aggregate(self) -> Result<Vec<Self>, Self> {
        self.downcast::<AggregateError>()
            .map(AggregateError::into_failures)
    }

    fn split_publish(self) -> Result<Vec<Self>, Self> {
        self.downcast::<PublishError>().map(PublishError::into_parts)
    }
}

impl<'a> FailureNode for &'a anyhow::Error {
    fn split_aggregate(self) -> Result<Vec<Self>, Self> {
        self.downcast_ref::<AggregateError>()
            .map(|aggregate| aggregate.failures().iter().collect())
            .ok_or(self)
    }

    fn split_publish(self) -> Result<Vec<Self>, Self> {
        self.downcast_ref::<PublishError>()
            .map(PublishError::parts)
            .ok_or(self)
    }
}

/// 唯一的展开规则：聚合失败与嵌套发布失败逐层展开，其余为叶子
fn walk<T: FailureNode>(node: T, leaves: &mut Vec<T>) {
    let node = match node.split_aggregate() {
        Ok(parts) => {
            for part in parts {
                walk(part, leaves);
            }
            return;
        }
        Err(node) => node,
    };

    match node.split_publish() {
        Ok(parts) => {
            for part in parts {
                walk(part, leaves);
            }
        }
        Err(leaf) => leaves.push(leaf),
    }
}

/// 将失败递归展开为叶子失败
///
/// - `AggregateError` 与嵌套发布产生的 `PublishError::Aggregate` 逐层展开；
/// - `PublishError::Handler` 取出其内部失败继续判断；
/// - 其余失败视为叶子，原值保留。
pub fn flatten(error: anyhow::Error) -> Vec<anyhow::Error> {
    let mut leaves = Vec::new();
    walk(error, &mut leaves);
    leaves
}

/// 失败记录：一次策略执行内按顺序收集的叶子失败
///
/// 不变式：记录中永远不包含聚合失败。
#[derive(Debug, Default)]
pub struct FailureRecord {
    leaves: Vec<anyhow::Error>,
}

impl FailureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个失败，聚合失败会先被展开
    pub fn push(&mut self, error: anyhow::Error) {
        walk(error, &mut self.leaves);
    }

    pub fn extend(&mut self, other: FailureRecord) {
        self.leaves.extend(other.leaves);
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// 记录为空则成功，否则转换为单个聚合失败
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.leaves.is_empty() {
            return Ok(());
        }
        Err(AggregateError::new(self.leaves))
    }
}
