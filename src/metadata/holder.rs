//! Request-scoped storage for the current [`MetadataContext`].
//!
//! # Responsibilities
//! - Lazily create and seed a context on first access within a request
//! - Re-initialize from decoded upstream headers at ingress
//! - Carry the context into child tasks and blocking work of the same request
//! - Tear the context down when the request scope ends
//!
//! # Design Decisions
//! - Async requests run inside a tokio task-local scope; the scope owns the
//!   context, so it is dropped on completion, cancellation or panic
//! - Synchronous work uses a thread binding installed by [`MetadataContextHolder::sync_scope`],
//!   restored by a drop guard on every exit path
//! - The thread binding is only consulted while a sync scope is active, so
//!   unscoped access on a pooled worker never stores a context there
//! - Spawned tasks never inherit implicitly; [`MetadataContextHolder::spawn`] hands
//!   the parent's context over explicitly, so pooled workers cannot leak it

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;

use crate::error::MetadataError;
use crate::metadata::{Fragment, MetadataContext, MetadataMap, StaticMetadataManager};

type Slot = RefCell<Option<Arc<MetadataContext>>>;

tokio::task_local! {
    static TASK_CONTEXT: Slot;
}

thread_local! {
    static THREAD_CONTEXT: Slot = const { RefCell::new(None) };
    static SYNC_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static GLOBAL_HOLDER: OnceLock<MetadataContextHolder> = OnceLock::new();

/// Runs `f` against the innermost active scope. An active
/// [`MetadataContextHolder::sync_scope`] binding takes priority over the
/// task-local scope. `None` when no scope is active at all.
fn with_slot<R>(f: impl FnOnce(&Slot) -> R) -> Option<R> {
    if SYNC_DEPTH.with(Cell::get) > 0 {
        return Some(THREAD_CONTEXT.with(f));
    }
    TASK_CONTEXT.try_with(f).ok()
}

/// Restores the previous thread binding when a sync scope exits.
struct ThreadScopeGuard {
    previous: Option<Arc<MetadataContext>>,
}

impl Drop for ThreadScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = THREAD_CONTEXT.try_with(|slot| *slot.borrow_mut() = previous);
        let _ = SYNC_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Creates, seeds and scopes request metadata contexts.
#[derive(Debug, Clone)]
pub struct MetadataContextHolder {
    statics: Arc<StaticMetadataManager>,
}

impl MetadataContextHolder {
    pub fn new(statics: Arc<StaticMetadataManager>) -> Self {
        Self { statics }
    }

    /// Install this holder as the process-wide instance.
    pub fn install(self) -> Result<&'static Self, MetadataError> {
        GLOBAL_HOLDER
            .set(self)
            .map_err(|_| MetadataError::HolderAlreadyInstalled)?;
        Self::global()
    }

    /// The process-wide holder. Missing installation is a startup wiring bug.
    pub fn global() -> Result<&'static Self, MetadataError> {
        GLOBAL_HOLDER.get().ok_or(MetadataError::HolderNotInstalled)
    }

    pub fn statics(&self) -> &Arc<StaticMetadataManager> {
        &self.statics
    }

    /// A fresh context carrying the static transitive and disposable defaults.
    pub fn seed(&self) -> MetadataContext {
        let context = MetadataContext::new();
        context.put_fragment_context(
            Fragment::Transitive,
            self.statics.merged_transitive_metadata().clone(),
        );
        context.put_fragment_context(
            Fragment::Disposable,
            self.statics.merged_disposable_metadata().clone(),
        );
        context
    }

    /// Current context, created and seeded on first access.
    ///
    /// Outside any scope every call returns a fresh seeded context that is
    /// not stored anywhere.
    pub fn get(&self) -> Arc<MetadataContext> {
        with_slot(|slot| {
            let existing = slot.borrow().clone();
            if let Some(context) = existing {
                return context;
            }
            let context = Arc::new(self.seed());
            *slot.borrow_mut() = Some(context.clone());
            context
        })
        .unwrap_or_else(|| Arc::new(self.seed()))
    }

    /// Replace the current context with one built from decoded upstream metadata.
    ///
    /// Upstream transitive values win over the static defaults. Upstream
    /// disposable values land in [`Fragment::UpstreamDisposable`] so they are
    /// readable here but never forwarded further.
    pub fn init(
        &self,
        dynamic_transitive: MetadataMap,
        dynamic_disposable: MetadataMap,
    ) -> Arc<MetadataContext> {
        Self::remove();

        let context = self.seed();
        context.set_transitive_metadata(dynamic_transitive);
        context.put_fragment_context(Fragment::UpstreamDisposable, dynamic_disposable);

        let context = Arc::new(context);
        Self::set(context.clone());
        context
    }

    /// Current context without creating one.
    pub fn current() -> Option<Arc<MetadataContext>> {
        with_slot(|slot| slot.borrow().clone()).flatten()
    }

    /// Install a caller-supplied context as current. Ignored outside any scope.
    pub fn set(context: Arc<MetadataContext>) {
        if with_slot(|slot| *slot.borrow_mut() = Some(context)).is_none() {
            tracing::debug!("No active metadata scope, context not stored");
        }
    }

    /// Clear the current context. Safe to call any number of times.
    pub fn remove() {
        with_slot(|slot| {
            slot.borrow_mut().take();
        });
    }

    /// Run `future` inside a new request scope.
    ///
    /// `None` starts empty; the first [`get`](Self::get) seeds a context.
    /// The scope and its context are dropped together with the future.
    pub fn scope<F>(
        context: Option<Arc<MetadataContext>>,
        future: F,
    ) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        TASK_CONTEXT.scope(RefCell::new(context), future)
    }

    /// Re-attach a context carried explicitly (e.g. in request extensions).
    pub fn attach<F>(context: Arc<MetadataContext>, future: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        Self::scope(Some(context), future)
    }

    /// Run `f` with `context` bound to the current thread, restoring the
    /// previous binding afterwards (including on panic).
    pub fn sync_scope<R>(context: Option<Arc<MetadataContext>>, f: impl FnOnce() -> R) -> R {
        let previous = THREAD_CONTEXT.with(|slot| slot.replace(context));
        SYNC_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let _guard = ThreadScopeGuard { previous };
        f()
    }

    /// Spawn a child task that shares this request's context.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let context = self.get();
        tokio::spawn(Self::attach(context, future))
    }

    /// Run blocking work on the blocking pool with this request's context bound.
    pub fn spawn_blocking<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let context = self.get();
        tokio::task::spawn_blocking(move || Self::sync_scope(Some(context), f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetadataConfig;

    fn holder() -> MetadataContextHolder {
        let config = MetadataConfig {
            content: [("env", "prod"), ("lane", "blue"), ("once", "x")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            transitive: vec!["env".into(), "lane".into()],
            disposable: vec!["once".into()],
        };
        let statics = StaticMetadataManager::from_sources(&config, Vec::<(String, String)>::new());
        MetadataContextHolder::new(Arc::new(statics))
    }

    fn map(entries: &[(&str, &str)]) -> MetadataMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_get_seeds_once() {
        let holder = holder();
        MetadataContextHolder::scope(None, async {
            let first = holder.get();
            assert_eq!(first.get_transitive_custom_metadata("env").as_deref(), Some("prod"));
            assert_eq!(first.get_disposable_metadata().get("once").map(String::as_str), Some("x"));

            first.put_transitive_custom_metadata("added", "1");
            let second = holder.get();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(second.get_transitive_custom_metadata("added").as_deref(), Some("1"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_init_upstream_wins() {
        let holder = holder();
        MetadataContextHolder::scope(None, async {
            let stale = holder.get();
            stale.put_custom_metadata("stale", "1");

            let ctx = holder.init(map(&[("lane", "green"), ("user", "u1")]), map(&[("d", "1")]));

            assert!(!Arc::ptr_eq(&stale, &ctx));
            assert!(ctx.get_custom_metadata().is_empty());
            assert_eq!(
                *ctx.get_all_transitive_custom_metadata(),
                map(&[("env", "prod"), ("lane", "green"), ("user", "u1")])
            );
            assert_eq!(*ctx.get_upstream_disposable_metadata(), map(&[("d", "1")]));
            assert_eq!(*ctx.get_disposable_metadata(), map(&[("once", "x")]));
            assert!(Arc::ptr_eq(&ctx, &holder.get()));
        })
        .await;
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let holder = holder();
        MetadataContextHolder::scope(None, async {
            holder.get();
            MetadataContextHolder::remove();
            assert!(MetadataContextHolder::current().is_none());
            MetadataContextHolder::remove();
            assert!(MetadataContextHolder::current().is_none());
        })
        .await;
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let holder = holder();
        let a = MetadataContextHolder::scope(None, async {
            holder.get().put_transitive_custom_metadata("req", "a");
            tokio::task::yield_now().await;
            holder.get().get_transitive_custom_metadata("req")
        });
        let b = MetadataContextHolder::scope(None, async {
            tokio::task::yield_now().await;
            holder.get().get_transitive_custom_metadata("req")
        });
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.as_deref(), Some("a"));
        assert_eq!(b, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_no_leak_across_sequential_requests_on_one_worker() {
        let holder = holder();
        MetadataContextHolder::scope(None, async {
            holder.get().put_transitive_custom_metadata("user", "first");
        })
        .await;

        let seen = MetadataContextHolder::scope(None, async {
            holder.get().get_transitive_custom_metadata("user")
        })
        .await;
        assert_eq!(seen, None);
        assert!(MetadataContextHolder::current().is_none());
    }

    #[tokio::test]
    async fn test_spawned_child_inherits_context() {
        let holder = holder();
        MetadataContextHolder::scope(None, async {
            let parent = holder.get();
            parent.put_transitive_custom_metadata("trace", "t-1");

            let child_holder = holder.clone();
            let seen = holder
                .spawn(async move { child_holder.get().get_transitive_custom_metadata("trace") })
                .await
                .unwrap();
            assert_eq!(seen.as_deref(), Some("t-1"));

            let blocking = holder
                .spawn_blocking(|| {
                    MetadataContextHolder::current()
                        .and_then(|ctx| ctx.get_transitive_custom_metadata("trace"))
                })
                .await
                .unwrap();
            assert_eq!(blocking.as_deref(), Some("t-1"));
        })
        .await;

        let unrelated = tokio::spawn(async { MetadataContextHolder::current() }).await.unwrap();
        assert!(unrelated.is_none());
    }

    #[test]
    fn test_sync_scope_restores_on_panic() {
        let holder = holder();
        let ctx = Arc::new(holder.seed());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            MetadataContextHolder::sync_scope(Some(ctx.clone()), || {
                assert!(MetadataContextHolder::current().is_some());
                panic!("handler failed");
            })
        }));

        assert!(result.is_err());
        assert!(MetadataContextHolder::current().is_none());
    }

    #[test]
    fn test_sync_scopes_on_same_thread_do_not_leak() {
        let holder = holder();
        MetadataContextHolder::sync_scope(None, || {
            holder.get().put_transitive_custom_metadata("user", "first");
        });
        let seen = MetadataContextHolder::sync_scope(None, || {
            holder.get().get_transitive_custom_metadata("user")
        });
        assert_eq!(seen, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_unscoped_tasks_on_one_worker_share_nothing() {
        let holder = holder();

        let first = holder.clone();
        tokio::spawn(async move {
            first.get().put_transitive_custom_metadata("user", "first");
            MetadataContextHolder::set(Arc::new(first.seed()));
        })
        .await
        .unwrap();

        let second = holder.clone();
        let seen = tokio::spawn(async move {
            let context = second.get();
            (
                context.get_transitive_custom_metadata("user"),
                context.get_transitive_custom_metadata("env"),
                MetadataContextHolder::current().is_none(),
            )
        })
        .await
        .unwrap();

        assert_eq!(seen, (None, Some("prod".to_string()), true));
        assert!(!Arc::ptr_eq(&holder.get(), &holder.get()));
    }

    #[tokio::test]
    async fn test_sync_binding_wins_inside_async_scope() {
        let holder = holder();
        MetadataContextHolder::scope(None, async {
            let outer = holder.get();
            let inner = Arc::new(holder.seed());

            let seen = MetadataContextHolder::sync_scope(Some(inner.clone()), || holder.get());
            assert!(Arc::ptr_eq(&seen, &inner));
            assert!(Arc::ptr_eq(&holder.get(), &outer));
        })
        .await;
    }

    #[test]
    fn test_install_once() {
        assert!(matches!(
            MetadataContextHolder::global(),
            Err(MetadataError::HolderNotInstalled)
        ));
        holder().install().unwrap();
        assert!(MetadataContextHolder::global().is_ok());
        assert!(matches!(
            holder().install(),
            Err(MetadataError::HolderAlreadyInstalled)
        ));
    }
}
