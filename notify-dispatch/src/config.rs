use crate::policy::PublishPolicy;
use serde::{Deserialize, Serialize};

/// 调度器配置
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// `PublishStrategy::Default` 及无法识别的策略所使用的前台策略
    pub default_policy: PublishPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_policy: PublishPolicy::Sequential,
        }
    }
}

impl DispatcherConfig {
    pub fn with_default_policy(mut self, policy: PublishPolicy) -> Self {
        self.default_policy = policy;
        self
    }
}
