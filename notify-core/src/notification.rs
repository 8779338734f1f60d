/// 通知（Notification）
///
/// 表达“已经发生的事实”，广播给零个或多个相互独立的处理器。
/// - 一次发布内对所有处理器只读共享（以 `Arc<N>` 传递）；
/// - 与命令不同，通知没有唯一处理者，也不返回业务数据。
///
/// 关联常量：
/// - `NAME`：通知的稳定名称，用于日志、失败报告与路由。避免依赖 `type_name::<T>()`。
pub trait Notification: Send + Sync + 'static {
    /// 通知的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;
}
