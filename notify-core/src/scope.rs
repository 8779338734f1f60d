//! 资源作用域（Scope）
//!
//! 一次运行独占的可释放执行上下文：
//! - 唯一标识 `id`，用于日志与失败报告；
//! - 类型化资源表，承载请求/运行级依赖（如数据库连接）；
//! - 可选的失败上报器（`FailureSink`），后台运行从新作用域中重新解析；
//! - 释放钩子，在最后一个持有者释放作用域时按注册顺序执行且仅执行一次。
//!
use crate::report::FailureSink;
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

type ReleaseHook = Box<dyn FnOnce(Uuid) + Send>;

/// 资源作用域
pub struct Scope {
    id: Uuid,
    resources: DashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
    failure_sink: Option<Arc<dyn FailureSink>>,
    release_hooks: Mutex<Vec<ReleaseHook>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            resources: DashMap::new(),
            failure_sink: None,
            release_hooks: Mutex::new(Vec::new()),
        }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为作用域挂载失败上报器
    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// 以链式方式放入资源
    pub fn with_resource<T>(self, resource: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.insert(Arc::new(resource));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 放入资源；同类型资源会被替换
    pub fn insert<T>(&self, resource: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        let resource: Arc<dyn Any + Send + Sync> = resource;
        self.resources
            .insert(TypeId::of::<T>(), (type_name::<T>(), resource));
    }

    /// 解析资源
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let entry = self.resources.get(&TypeId::of::<T>())?;
        entry.1.clone().downcast::<T>().ok()
    }

    /// 解析失败上报器；未注册时返回 `None`，这不是错误
    pub fn failure_sink(&self) -> Option<Arc<dyn FailureSink>> {
        self.failure_sink.clone()
    }

    /// 注册释放钩子
    pub fn on_release<F>(&self, hook: F)
    where
        F: FnOnce(Uuid) + Send + 'static,
    {
        self.release_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    /// 已放入的资源类型名（只读视图）
    pub fn resource_names(&self) -> Vec<&'static str> {
        self.resources.iter().map(|e| e.value().0).collect()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let hooks = std::mem::take(
            self.release_hooks
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let hook_count = hooks.len();
        for hook in hooks {
            hook(self.id);
        }
        debug!(scope_id = %self.id, hook_count, "scope released");
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("resources", &self.resource_names())
            .field("has_failure_sink", &self.failure_sink.is_some())
            .finish()
    }
}

/// 作用域工厂：按需创建新的资源作用域
pub trait ScopeFactory: Send + Sync {
    fn create_scope(&self) -> Scope;
}

impl<F> ScopeFactory for F
where
    F: Fn() -> Scope + Send + Sync,
{
    fn create_scope(&self) -> Scope {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FailureReport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Connection {
        dsn: &'static str,
    }

    struct NullSink;

    impl FailureSink for NullSink {
        fn report(&self, _report: &FailureReport) {}
    }

    #[test]
    fn resources_resolve_by_type() {
        let scope = Scope::new().with_resource(Connection { dsn: "pg://a" });

        let conn = scope.get::<Connection>().unwrap();
        assert_eq!(conn.dsn, "pg://a");
        assert!(scope.get::<String>().is_none());
        assert_eq!(scope.resource_names().len(), 1);
    }

    #[test]
    fn failure_sink_is_optional() {
        assert!(Scope::new().failure_sink().is_none());
        assert!(
            Scope::new()
                .with_failure_sink(Arc::new(NullSink))
                .failure_sink()
                .is_some()
        );
    }

    #[test]
    fn release_hooks_run_once_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let scope = Scope::new();
        let id = scope.id();

        for n in 0..3 {
            let calls = calls.clone();
            scope.on_release(move |scope_id| {
                calls.lock().unwrap().push((n, scope_id));
            });
        }
        drop(scope);

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![(0, id), (1, id), (2, id)]);
    }

    #[test]
    fn shared_scope_is_released_by_last_owner() {
        let released = Arc::new(AtomicUsize::new(0));
        let scope = Arc::new(Scope::new());
        {
            let released = released.clone();
            scope.on_release(move |_| {
                released.fetch_add(1, Ordering::SeqCst);
            });
        }

        let other = scope.clone();
        drop(scope);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(other);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_closure_creates_distinct_scopes() {
        let factory: Arc<dyn ScopeFactory> = Arc::new(Scope::new);
        assert_ne!(factory.create_scope().id(), factory.create_scope().id());
    }
}
