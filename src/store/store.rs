use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::{StartOptions, StoreConfig};
use crate::error::failure_message;
use crate::lifecycle::{Lifecycle, Readiness};
use crate::loadable::Loadable;
use crate::observer::{Observer, ObserverRegistry, Subscription};
use crate::task::{notify_after, notify_later, run_detached};

type ZeroState<S> = Arc<dyn Fn() -> S + Send + Sync>;
type Loader<K, S> = Arc<dyn Fn(K) -> BoxFuture<'static, anyhow::Result<S>> + Send + Sync>;
type Summarizer<K, S, U> =
    Arc<dyn Fn(K, S) -> BoxFuture<'static, anyhow::Result<U>> + Send + Sync>;

pub(crate) struct StoreData<K, S, U> {
    state: S,
    summary: Option<U>,
    lifecycle: Lifecycle,
    // bumped by every begin; completions of older generations are discarded
    generation: u64,
    last_key: Option<K>,
}

struct StoreInner<K, S, U> {
    data: RwLock<StoreData<K, S, U>>,
    observers: ObserverRegistry,
    new_zero_state: ZeroState<S>,
    loader: Loader<K, S>,
    summarizer: Option<Summarizer<K, S, U>>,
    config: StoreConfig,
}

/// An observable unit of asynchronously loaded state.
///
/// The state is produced by a loader keyed by `K`; an optional summarizer
/// derives a `U` from it. Every operation is wrapped in a begin/end envelope:
/// observers are notified synchronously when it begins and, after
/// [`StoreConfig::notify_delay`], when it ends.
///
/// Cloning a store yields another handle to the same state.
///
/// # Examples
///
/// ```
/// use storekeeper::{StartOptions, Store};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store: Store<u32, String> = Store::new(String::new, |id: u32| async move {
///     Ok(format!("user-{id}"))
/// });
///
/// store.start(7, StartOptions::default()).await;
/// assert!(store.is_ready());
/// assert_eq!(store.state(), "user-7");
/// # }
/// ```
pub struct Store<K, S, U = ()> {
    inner: Arc<StoreInner<K, S, U>>,
}

impl<K, S, U> Clone for Store<K, S, U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Configures a [`Store`] before it is shared.
pub struct StoreBuilder<K, S, U> {
    new_zero_state: ZeroState<S>,
    loader: Loader<K, S>,
    summarizer: Option<Summarizer<K, S, U>>,
    config: StoreConfig,
}

impl<K, S, U> StoreBuilder<K, S, U>
where
    K: Clone + Debug + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    /// Derive a summary from freshly loaded state.
    pub fn summarizer<F, Fut>(mut self, summarize: F) -> Self
    where
        F: Fn(K, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<U>> + Send + 'static,
    {
        self.summarizer = Some(Arc::new(move |key, state| summarize(key, state).boxed()));
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Store<K, S, U> {
        let state = (self.new_zero_state)();
        Store {
            inner: Arc::new(StoreInner {
                data: RwLock::new(StoreData {
                    state,
                    summary: None,
                    lifecycle: Lifecycle::default(),
                    generation: 0,
                    last_key: None,
                }),
                observers: ObserverRegistry::new(),
                new_zero_state: self.new_zero_state,
                loader: self.loader,
                summarizer: self.summarizer,
                config: self.config,
            }),
        }
    }
}

impl<K, S, U> Store<K, S, U>
where
    K: Clone + Debug + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    /// Start configuring a store from a zero-state factory and a loader.
    pub fn builder<Z, L, Fut>(new_zero_state: Z, loader: L) -> StoreBuilder<K, S, U>
    where
        Z: Fn() -> S + Send + Sync + 'static,
        L: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        StoreBuilder {
            new_zero_state: Arc::new(new_zero_state),
            loader: Arc::new(move |key| loader(key).boxed()),
            summarizer: None,
            config: StoreConfig::default(),
        }
    }

    /// Create a store without a summarizer and with the default configuration.
    pub fn new<Z, L, Fut>(new_zero_state: Z, loader: L) -> Self
    where
        Z: Fn() -> S + Send + Sync + 'static,
        L: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        Self::builder(new_zero_state, loader).build()
    }

    /// Subscribe to lifecycle and data changes.
    ///
    /// Registering a second observer under the same `name` replaces the first.
    pub fn subscribe<F>(&self, name: impl Into<String>, observer: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(name, Some(Arc::new(observer)))
    }

    /// Like [`subscribe`](Self::subscribe), but an empty slot is accepted and
    /// silently skipped when notifying.
    pub fn subscribe_optional(
        &self,
        name: impl Into<String>,
        observer: Option<Observer>,
    ) -> Subscription {
        self.inner.observers.subscribe(name, observer)
    }

    /// Load the state for `key`.
    ///
    /// Does nothing when the store is ready or already loading, unless
    /// `options.force_reload` is set. Otherwise the begin notification is sent
    /// before this method returns, and the returned future runs the loader,
    /// then the summarizer (if `options.compute_summary`), and finally sends
    /// the end notification. Failures are captured in [`error`](Self::error).
    ///
    /// On a tokio runtime the load is spawned right away: dropping the
    /// returned future does not cancel it. Outside of a runtime the load runs
    /// when the future is polled, and dropping it unpolled ends the load as
    /// failed.
    pub fn start(&self, key: K, options: StartOptions) -> impl Future<Output = ()> + Send + 'static {
        let load = self.try_begin(&key, options.force_reload).map(|generation| {
            let guard = OperationGuard::new(self.clone(), generation);
            run_detached(Self::run_load(guard, key, options.compute_summary))
        });
        async move {
            if let Some(load) = load {
                load.await;
            }
        }
    }

    /// Recompute the summary from the current state without reloading.
    ///
    /// No-op without a summarizer, before the first `start`, or while another
    /// operation is in flight.
    pub fn do_summary(&self) -> impl Future<Output = ()> + Send + 'static {
        let task = self.try_begin_summary().map(|(summarizer, key, generation)| {
            let guard = OperationGuard::new(self.clone(), generation);
            run_detached(async move {
                let store = guard.store.clone();
                let outcome = summarizer(key, store.state()).await.map(|summary| {
                    move |data: &mut StoreData<K, S, U>| {
                        data.summary = Some(summary);
                        data.lifecycle.settle();
                    }
                });
                if guard.finish(outcome) {
                    notify_after(&store.inner.observers, store.inner.config.notify_delay).await;
                }
            })
        });
        async move {
            if let Some(task) = task {
                task.await;
            }
        }
    }

    /// Replace the state through an async transformation, under the same
    /// envelope as a load.
    ///
    /// Unlike [`start`](Self::start) this always runs. On success the store
    /// counts as freshly loaded; on failure the state is left untouched.
    pub fn update<F, Fut>(
        &self,
        transform: F,
        compute_summary: bool,
    ) -> impl Future<Output = ()> + Send + 'static
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        let guard = OperationGuard::new(self.clone(), self.begin(None));
        run_detached(async move {
            let store = guard.store.clone();
            let key = store.last_key();
            let outcome = async {
                let state = transform(store.state()).await?;
                let summary = match (&store.inner.summarizer, key, compute_summary) {
                    (Some(summarizer), Some(key), true) => Some(summarizer(key, state.clone()).await?),
                    _ => None,
                };
                Ok::<_, anyhow::Error>((state, summary))
            }
            .await;
            Self::complete_load(guard, outcome).await;
        })
    }

    /// Restore the zero state and drop the summary.
    ///
    /// The store goes back to not-started, so a later `start` loads again.
    pub fn reset(&self) {
        let generation = self.begin(None);
        let zero = (self.inner.new_zero_state)();
        let applied = self.end(
            generation,
            Ok(move |data: &mut StoreData<K, S, U>| {
                data.state = zero;
                data.summary = None;
                data.lifecycle = Lifecycle::default();
            }),
        );
        if applied {
            notify_later(&self.inner.observers, self.inner.config.notify_delay);
        }
    }

    /// Clear a captured error. No-op when there is none.
    pub fn clear_error(&self) {
        if self.inner.data.read().lifecycle.error.is_empty() {
            return;
        }
        let generation = self.begin(None);
        let applied = self.end(
            generation,
            Ok(|data: &mut StoreData<K, S, U>| data.lifecycle.settle()),
        );
        if applied {
            notify_later(&self.inner.observers, self.inner.config.notify_delay);
        }
    }

    /// A clone of the current state.
    pub fn state(&self) -> S {
        self.inner.data.read().state.clone()
    }

    /// Read the state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        f(&self.inner.data.read().state)
    }

    pub fn summary(&self) -> Option<U> {
        self.inner.data.read().summary.clone()
    }

    pub fn error(&self) -> String {
        self.inner.data.read().lifecycle.error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.data.read().lifecycle.loading
    }

    pub fn is_ready(&self) -> bool {
        self.inner.data.read().lifecycle.is_ready()
    }

    pub fn readiness(&self) -> Readiness {
        self.inner.data.read().lifecycle.readiness()
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.inner.data.read().lifecycle.last_updated_at
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.data.read().lifecycle.clone()
    }

    /// Key passed to the most recent `start`.
    pub fn last_key(&self) -> Option<K> {
        self.inner.data.read().last_key.clone()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Check-and-begin for `start`, under one write lock.
    fn try_begin(&self, key: &K, force_reload: bool) -> Option<u64> {
        let generation = {
            let mut data = self.inner.data.write();
            if !force_reload && (data.lifecycle.loading || data.lifecycle.is_ready()) {
                debug!(key = ?key, "store already loading or ready, start skipped");
                return None;
            }
            data.last_key = Some(key.clone());
            Self::begin_locked(&mut data)
        };
        debug!(key = ?key, generation, "store load started");
        self.inner.observers.notify();
        Some(generation)
    }

    /// Begin a summary recompute unless there is nothing to summarize or an
    /// operation is already running.
    fn try_begin_summary(&self) -> Option<(Summarizer<K, S, U>, K, u64)> {
        let summarizer = self.inner.summarizer.as_ref()?;
        let (key, generation) = {
            let mut data = self.inner.data.write();
            if data.lifecycle.loading {
                debug!(generation = data.generation, "operation in flight, summary skipped");
                return None;
            }
            let key = data.last_key.clone()?;
            (key, Self::begin_locked(&mut data))
        };
        debug!(generation, "summary recompute started");
        self.inner.observers.notify();
        Some((Arc::clone(summarizer), key, generation))
    }

    fn begin(&self, key: Option<K>) -> u64 {
        let generation = {
            let mut data = self.inner.data.write();
            if key.is_some() {
                data.last_key = key;
            }
            Self::begin_locked(&mut data)
        };
        debug!(generation, "store operation started");
        self.inner.observers.notify();
        generation
    }

    fn begin_locked(data: &mut StoreData<K, S, U>) -> u64 {
        data.lifecycle.begin();
        data.generation += 1;
        data.generation
    }

    /// Apply the outcome of the operation started as `generation`.
    ///
    /// Returns `false`, leaving the store untouched, if a later operation has
    /// begun since.
    fn end<F>(&self, generation: u64, outcome: anyhow::Result<F>) -> bool
    where
        F: FnOnce(&mut StoreData<K, S, U>),
    {
        let mut data = self.inner.data.write();
        if data.generation != generation {
            debug!(
                generation,
                latest = data.generation,
                "superseded operation finished, result discarded"
            );
            return false;
        }
        match outcome {
            Ok(apply) => {
                apply(&mut *data);
                debug!(generation, "store operation finished");
            }
            Err(err) => {
                let config = &self.inner.config;
                let message =
                    failure_message(&err, config.error_override.as_deref(), &config.fallback_error);
                warn!(generation, error = %message, "store operation failed");
                data.lifecycle.fail(message);
            }
        }
        true
    }

    async fn run_load(guard: OperationGuard<K, S, U>, key: K, compute_summary: bool) {
        let inner = Arc::clone(&guard.store.inner);
        let outcome = async {
            let state = (inner.loader)(key.clone()).await?;
            let summary = match (&inner.summarizer, compute_summary) {
                (Some(summarizer), true) => Some(summarizer(key, state.clone()).await?),
                _ => None,
            };
            Ok::<_, anyhow::Error>((state, summary))
        }
        .await;
        Self::complete_load(guard, outcome).await;
    }

    /// Commit loaded state (and summary) as one step, then send the end notification.
    async fn complete_load(guard: OperationGuard<K, S, U>, outcome: anyhow::Result<(S, Option<U>)>) {
        let outcome = outcome.map(|(state, summary)| {
            move |data: &mut StoreData<K, S, U>| {
                data.state = state;
                if summary.is_some() {
                    data.summary = summary;
                }
                data.lifecycle.succeed();
            }
        });
        let store = guard.store.clone();
        if guard.finish(outcome) {
            notify_after(&store.inner.observers, store.inner.config.notify_delay).await;
        }
    }
}

/// Ends the operation begun as `generation` as failed if it is dropped
/// before [`finish`](Self::finish) is called.
struct OperationGuard<K, S, U>
where
    K: Clone + Debug + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    store: Store<K, S, U>,
    generation: u64,
    finished: bool,
}

impl<K, S, U> OperationGuard<K, S, U>
where
    K: Clone + Debug + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn new(store: Store<K, S, U>, generation: u64) -> Self {
        Self {
            store,
            generation,
            finished: false,
        }
    }

    /// Apply `outcome`; `false` if a later operation superseded this one.
    fn finish<F>(mut self, outcome: anyhow::Result<F>) -> bool
    where
        F: FnOnce(&mut StoreData<K, S, U>),
    {
        self.finished = true;
        self.store.end(self.generation, outcome)
    }
}

impl<K, S, U> Drop for OperationGuard<K, S, U>
where
    K: Clone + Debug + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let outcome: anyhow::Result<fn(&mut StoreData<K, S, U>)> =
            Err(anyhow::anyhow!("operation cancelled"));
        if self.store.end(self.generation, outcome) {
            notify_later(&self.store.inner.observers, self.store.inner.config.notify_delay);
        }
    }
}

impl<K, S, U> Loadable<K> for Store<K, S, U>
where
    K: Clone + Debug + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    fn error(&self) -> String {
        Store::error(self)
    }

    fn is_loading(&self) -> bool {
        Store::is_loading(self)
    }

    fn is_ready(&self) -> bool {
        Store::is_ready(self)
    }

    fn subscribe(&self, name: String, observer: Observer) -> Subscription {
        self.subscribe_optional(name, Some(observer))
    }

    fn start(&self, key: K, options: StartOptions) -> BoxFuture<'static, ()> {
        Store::start(self, key, options).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct User {
        name: String,
        email: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Accidents(u32);

    const WAIT: Duration = Duration::from_millis(30);

    fn fast() -> StoreConfig {
        StoreConfig::default().with_notify_delay(Duration::from_millis(1))
    }

    fn user_store() -> Store<&'static str, User, Accidents> {
        Store::builder(User::default, |id: &'static str| async move {
            Ok(match id {
                "leela" => User {
                    name: "Leela".into(),
                    email: "turanga.leela@futurama.co".into(),
                },
                _ => User {
                    name: "Bender".into(),
                    email: "bender.rodriguez@futurama.co".into(),
                },
            })
        })
        .summarizer(|_id, user: User| async move {
            Ok(Accidents(if user.name == "Bender" { 10 } else { 1 }))
        })
        .config(fast())
        .build()
    }

    fn count_notifications<K, S, U>(store: &Store<K, S, U>) -> (Arc<AtomicUsize>, Subscription)
    where
        K: Clone + Debug + Send + Sync + 'static,
        S: Clone + Send + Sync + 'static,
        U: Clone + Send + Sync + 'static,
    {
        let called = Arc::new(AtomicUsize::new(0));
        let called_clone = called.clone();
        let sub = store.subscribe("test", move || {
            called_clone.fetch_add(1, Ordering::SeqCst);
        });
        (called, sub)
    }

    #[tokio::test]
    async fn begin_is_synchronous() {
        let store = user_store();
        let (called, _sub) = count_notifications(&store);

        let load = store.start("bender", StartOptions::default());
        assert!(store.is_loading());
        assert_eq!(store.readiness(), Readiness::Loading);
        assert_eq!(called.load(Ordering::SeqCst), 1);
        assert_eq!(store.last_key(), Some("bender"));

        load.await;
        tokio::time::sleep(WAIT).await;
        assert_eq!(called.load(Ordering::SeqCst), 2);
        assert_eq!(store.summary(), Some(Accidents(10)));
    }

    #[tokio::test]
    async fn second_start_while_loading_is_ignored() {
        let loads = Arc::new(AtomicUsize::new(0));
        let loads_clone = loads.clone();
        let store: Store<u8, u8> = Store::builder(
            || 0,
            move |key: u8| {
                let loads = loads_clone.clone();
                async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(key)
                }
            },
        )
        .config(fast())
        .build();

        let first = store.start(1, StartOptions::default());
        let second = store.start(2, StartOptions::default());
        tokio::join!(first, second);

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.state(), 1);
    }

    #[tokio::test]
    async fn dropped_start_still_finishes() {
        let store: Store<u8, u8> = Store::builder(
            || 0,
            |key: u8| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(key * 7)
            },
        )
        .config(fast())
        .build();
        let (called, _sub) = count_notifications(&store);

        drop(store.start(1, StartOptions::default()));
        assert!(store.is_loading());
        // still loading: skipped
        store.start(2, StartOptions::default()).await;
        tokio::time::sleep(WAIT).await;

        assert_eq!(store.readiness(), Readiness::Ready);
        assert_eq!(store.state(), 7);
        assert_eq!(called.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unpolled_start_outside_runtime_ends_as_failed() {
        let store: Store<u8, u8> = Store::builder(|| 0, |key: u8| async move { Ok(key) }).build();
        let (called, _sub) = count_notifications(&store);

        let load = store.start(1, StartOptions::default());
        assert!(store.is_loading());
        drop(load);

        assert_eq!(store.readiness(), Readiness::Errored);
        assert_eq!(store.error(), "operation cancelled");
        assert_eq!(store.state(), 0);
        assert_eq!(called.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn do_summary_does_not_interrupt_a_load() {
        let store: Store<u8, u8, u8> = Store::builder(
            || 0,
            |key: u8| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(key)
            },
        )
        .summarizer(|_key, state: u8| async move { Ok(state * 2) })
        .config(fast())
        .build();
        let (called, _sub) = count_notifications(&store);

        let load = store.start(7, StartOptions::default());
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.do_summary().await;
        assert!(store.is_loading());
        assert_eq!(called.load(Ordering::SeqCst), 1);

        load.await;
        assert_eq!(store.readiness(), Readiness::Ready);
        assert_eq!(store.state(), 7);
        assert_eq!(store.summary(), Some(14));
        assert_eq!(called.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn do_summary_without_summarizer_is_noop() {
        let store: Store<u8, u8> = Store::builder(|| 0, |key: u8| async move { Ok(key) })
            .config(fast())
            .build();
        store.start(3, StartOptions::default()).await;
        tokio::time::sleep(WAIT).await;
        let (called, _sub) = count_notifications(&store);

        store.do_summary().await;
        tokio::time::sleep(WAIT).await;

        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(store.summary(), None);
    }

    #[tokio::test]
    async fn summarizer_failure_keeps_previous_state() {
        let store: Store<u8, u8, u8> = Store::builder(|| 0, |key: u8| async move { Ok(key) })
            .summarizer(|_key, state: u8| async move {
                if state > 1 {
                    anyhow::bail!("FAIL");
                }
                Ok(state * 10)
            })
            .config(fast())
            .build();

        store.start(1, StartOptions::default()).await;
        assert_eq!(store.summary(), Some(10));

        store.start(2, StartOptions::forced()).await;
        assert_eq!(store.error(), "FAIL");
        assert_eq!(store.state(), 1);
        assert_eq!(store.summary(), Some(10));
        assert_eq!(store.readiness(), Readiness::Errored);
    }

    #[tokio::test]
    async fn error_override_replaces_message() {
        let store: Store<u8, u8> = Store::builder(|| 0, |_key: u8| async move {
            Err::<u8, _>(anyhow::anyhow!("connection refused"))
        })
        .config(fast().with_error_override("server unavailable"))
        .build();

        store.start(1, StartOptions::default()).await;

        assert_eq!(store.error(), "server unavailable");
        assert!(!store.is_ready());
    }

    #[tokio::test]
    async fn clear_error_only_acts_on_errors() {
        let store: Store<u8, u8> = Store::builder(|| 0, |key: u8| async move {
            if key == 0 {
                anyhow::bail!("STOP");
            }
            Ok(key)
        })
        .config(fast())
        .build();
        let (called, _sub) = count_notifications(&store);

        store.clear_error();
        assert_eq!(called.load(Ordering::SeqCst), 0);

        store.start(0, StartOptions::default()).await;
        tokio::time::sleep(WAIT).await;
        assert_eq!(store.error(), "STOP");
        assert_eq!(called.load(Ordering::SeqCst), 2);

        store.clear_error();
        tokio::time::sleep(WAIT).await;
        assert_eq!(store.error(), "");
        assert_eq!(store.readiness(), Readiness::NotStarted);
        assert_eq!(called.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn update_transforms_state_and_summary() {
        let store = user_store();
        store.start("leela", StartOptions::default()).await;
        assert_eq!(store.summary(), Some(Accidents(1)));

        store
            .update(
                |mut user: User| async move {
                    user.name = "Bender".into();
                    Ok(user)
                },
                true,
            )
            .await;

        assert_eq!(store.read(|user| user.name.clone()), "Bender");
        assert_eq!(store.summary(), Some(Accidents(10)));
        assert!(store.is_ready());
    }
}
