use dashmap::DashMap;
use notify_core::{HandlerBinding, HandlerContext, HandlerResult, Notification, NotificationHandler};
use std::any::{Any, TypeId};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

struct RegistryEntry {
    notification: &'static str,
    /// 实际类型为 `Vec<HandlerBinding<N>>`，与键的 `TypeId::of::<N>()` 一一对应
    bindings: Box<dyn Any + Send + Sync>,
}

/// 基于内存的处理器注册表
/// - 通过 TypeId 注册不同通知对应的处理器列表
/// - 同一通知可注册多个处理器，解析顺序即注册顺序
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<TypeId, RegistryEntry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册通知处理器
    pub fn register<N, H>(&self, handler: Arc<H>)
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
    {
        self.register_binding(HandlerBinding::new(handler));
    }

    /// 以闭包形式注册处理器
    pub fn register_fn<N, F, Fut>(&self, handler_name: &'static str, f: F)
    where
        N: Notification,
        F: Fn(Arc<N>, HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_binding(HandlerBinding::from_fn(handler_name, f));
    }

    pub fn register_binding<N>(&self, binding: HandlerBinding<N>)
    where
        N: Notification,
    {
        debug!(
            notification = N::NAME,
            handler = binding.handler_name(),
            "notification handler registered"
        );

        let mut entry = self
            .handlers
            .entry(TypeId::of::<N>())
            .or_insert_with(|| RegistryEntry {
                notification: N::NAME,
                bindings: Box::new(Vec::<HandlerBinding<N>>::new()),
            });

        // 键与值同一泛型 N，这里的 downcast 不会失败
        if let Some(bindings) = entry
            .bindings
            .downcast_mut::<Vec<HandlerBinding<N>>>()
        {
            bindings.push(binding);
        }
    }

    /// 解析某一通知的全部处理器；未注册时返回空列表
    pub fn resolve<N>(&self) -> Vec<HandlerBinding<N>>
    where
        N: Notification,
    {
        self.handlers
            .get(&TypeId::of::<N>())
            .and_then(|entry| {
                entry
                    .bindings
                    .downcast_ref::<Vec<HandlerBinding<N>>>()
                    .cloned()
            })
            .unwrap_or_default()
    }

    pub fn handler_count<N>(&self) -> usize
    where
        N: Notification,
    {
        self.handlers
            .get(&TypeId::of::<N>())
            .and_then(|entry| {
                entry
                    .bindings
                    .downcast_ref::<Vec<HandlerBinding<N>>>()
                    .map(Vec::len)
            })
            .unwrap_or(0)
    }

    /// 已注册处理器的通知名称
    pub fn registered_notifications(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .handlers
            .iter()
            .map(|entry| entry.value().notification)
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_core::Scope;
    use tokio_util::sync::CancellationToken;

    struct Signup;

    impl Notification for Signup {
        const NAME: &'static str = "signup";
    }

    struct Unregistered;

    impl Notification for Unregistered {
        const NAME: &'static str = "unregistered";
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn resolves_in_registration_order() {
        let registry = HandlerRegistry::new();
        registry.register_fn::<Signup, _, _>("first", |_, _| async { Ok::<(), anyhow::Error>(()) });
        registry.register_fn::<Signup, _, _>("second", |_, _| async {
            Err::<(), _>(anyhow::anyhow!("second failed"))
        });

        let bindings = registry.resolve::<Signup>();
        let names: Vec<_> = bindings.iter().map(HandlerBinding::handler_name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(registry.handler_count::<Signup>(), 2);

        let ctx = HandlerContext::new(Arc::new(Scope::new()), CancellationToken::new());
        let second = bindings[1]
            .invoke(Arc::new(Signup), ctx)
            .ok()
            .unwrap();
        assert_eq!(second.await.unwrap_err().to_string(), "second failed");
    }

    #[test]
    fn unregistered_notification_resolves_empty() {
        let registry = HandlerRegistry::new();
        registry.register_fn::<Signup, _, _>("only", |_, _| async { Ok::<(), anyhow::Error>(()) });

        assert!(registry.resolve::<Unregistered>().is_empty());
        assert_eq!(registry.handler_count::<Unregistered>(), 0);
        assert_eq!(registry.registered_notifications(), vec!["signup"]);
    }
}
