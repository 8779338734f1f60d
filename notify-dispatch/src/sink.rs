use notify_core::{FailureReport, FailureSink};
use tracing::error;

/// 将后台失败写入 tracing 日志的上报器
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn report(&self, report: &FailureReport) {
        let failures: Vec<String> = report
            .error()
            .leaves()
            .iter()
            .map(|err| format!("{err:#}"))
            .collect();

        error!(
            notification = report.notification(),
            policy = report.policy(),
            scope_id = %report.scope_id(),
            occurred_at = %report.occurred_at(),
            failure_count = failures.len(),
            failures = ?failures,
            "background publish failed"
        );
    }
}
