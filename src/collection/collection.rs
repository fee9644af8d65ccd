use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::readiness::ReadinessTable;
use crate::config::{StartOptions, StoreConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::lifecycle::{Lifecycle, Readiness};
use crate::loadable::Loadable;
use crate::observer::{Observer, ObserverRegistry, Subscription};
use crate::task::{has_runtime, notify_after, notify_later, spawn_detached};

static NEXT_COLLECTION_ID: AtomicUsize = AtomicUsize::new(0);

type ZeroSummary<V> = Arc<dyn Fn() -> V + Send + Sync>;
type Reducer<M, V> = Arc<dyn Fn(V, &M) -> V + Send + Sync>;

struct Reduction<M, V> {
    new_zero_summary: ZeroSummary<V>,
    reducer: Reducer<M, V>,
}

struct CollectionData<V> {
    lifecycle: Lifecycle,
    summary: Option<V>,
    round: u64,
    // set by `start`, cleared once the round completes, fails or is reset
    active_round: Option<u64>,
}

struct CollectionInner<K, M, V> {
    id: usize,
    members: IndexMap<K, M>,
    table: tokio::sync::Mutex<ReadinessTable<K>>,
    data: RwLock<CollectionData<V>>,
    reduction: Option<Reduction<M, V>>,
    observers: ObserverRegistry,
    config: StoreConfig,
    adapters: Mutex<Vec<Subscription>>,
}

/// A fixed set of named members behind one observable lifecycle.
///
/// [`start`](Self::start) starts every member concurrently. The collection
/// becomes ready once all members are ready, at which point the optional
/// reducer folds their summaries in declaration order, exactly once per
/// round. The first member failure of a round becomes the collection's error.
///
/// Starting requires a tokio runtime: member loads are spawned, not awaited.
pub struct Collection<K, M, V = ()> {
    inner: Arc<CollectionInner<K, M, V>>,
}

impl<K, M, V> Clone for Collection<K, M, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Configures a [`Collection`]; see [`Collection::builder`].
pub struct CollectionBuilder<K, M, V> {
    members: Vec<(K, M)>,
    new_zero_summary: Option<ZeroSummary<V>>,
    reducer: Option<Reducer<M, V>>,
    config: StoreConfig,
}

impl<K, M, V> CollectionBuilder<K, M, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Loadable<K>,
    V: Clone + Send + Sync + 'static,
{
    /// Factory for the value the reducer starts from. Requires [`reducer`](Self::reducer).
    pub fn zero_summary<F>(mut self, new_zero_summary: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.new_zero_summary = Some(Arc::new(new_zero_summary));
        self
    }

    /// Fold applied to every member, in declaration order, once all are ready.
    pub fn reducer<F>(mut self, reducer: F) -> Self
    where
        F: Fn(V, &M) -> V + Send + Sync + 'static,
    {
        self.reducer = Some(Arc::new(reducer));
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ConfigResult<Collection<K, M, V>> {
        let reduction = match (self.new_zero_summary, self.reducer) {
            (Some(new_zero_summary), Some(reducer)) => Some(Reduction {
                new_zero_summary,
                reducer,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::ReducerWithoutZeroSummary),
        };
        if self.members.is_empty() {
            return Err(ConfigError::EmptyCollection);
        }
        let mut members = IndexMap::with_capacity(self.members.len());
        for (key, member) in self.members {
            if members.contains_key(&key) {
                return Err(ConfigError::DuplicateKey(format!("{key:?}")));
            }
            members.insert(key, member);
        }

        let summary = reduction
            .as_ref()
            .map(|reduction| (reduction.new_zero_summary)());
        let inner = Arc::new(CollectionInner {
            id: NEXT_COLLECTION_ID.fetch_add(1, Ordering::SeqCst),
            table: tokio::sync::Mutex::new(ReadinessTable::new(members.keys())),
            members,
            data: RwLock::new(CollectionData {
                lifecycle: Lifecycle::default(),
                summary,
                round: 0,
                active_round: None,
            }),
            reduction,
            observers: ObserverRegistry::new(),
            config: self.config,
            adapters: Mutex::new(Vec::new()),
        });
        CollectionInner::attach_adapters(&inner);
        debug!(collection = inner.id, members = inner.members.len(), "collection created");
        Ok(Collection { inner })
    }
}

impl<K, M, V> Collection<K, M, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Loadable<K>,
    V: Clone + Send + Sync + 'static,
{
    /// Create one member per key with `factory`.
    ///
    /// Keys keep their order; it is the order the reducer visits members in.
    pub fn builder<I, F>(keys: I, mut factory: F) -> CollectionBuilder<K, M, V>
    where
        I: IntoIterator<Item = K>,
        F: FnMut(&K) -> M,
    {
        CollectionBuilder {
            members: keys
                .into_iter()
                .map(|key| {
                    let member = factory(&key);
                    (key, member)
                })
                .collect(),
            new_zero_summary: None,
            reducer: None,
            config: StoreConfig::default(),
        }
    }

    pub fn subscribe<F>(&self, name: impl Into<String>, observer: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(name, Some(Arc::new(observer)))
    }

    pub fn subscribe_optional(
        &self,
        name: impl Into<String>,
        observer: Option<Observer>,
    ) -> Subscription {
        self.inner.observers.subscribe(name, observer)
    }

    /// Start a new round.
    ///
    /// Does nothing when the collection is ready or a round is in progress,
    /// unless `options.force_reload` is set. Member loads are spawned on the
    /// current tokio runtime; the collection's completion is reported to
    /// observers only. Outside of a runtime nothing is started.
    pub fn start(&self, options: StartOptions) {
        let inner = &self.inner;
        if !has_runtime() {
            warn!(collection = inner.id, "no tokio runtime available, start skipped");
            return;
        }
        let round = {
            let mut data = inner.data.write();
            if !options.force_reload && (data.lifecycle.loading || data.lifecycle.is_ready()) {
                debug!(collection = inner.id, "collection already loading or ready, start skipped");
                return;
            }
            data.round += 1;
            data.active_round = Some(data.round);
            data.lifecycle.begin();
            data.round
        };
        debug!(collection = inner.id, round, "collection round started");
        inner.observers.notify();

        for (key, member) in &inner.members {
            spawn_detached(member.start(key.clone(), options));
        }
        // members that were ready already did not restart and will not notify
        for (key, member) in &inner.members {
            if member.is_ready() {
                let inner = Arc::clone(inner);
                let key = key.clone();
                spawn_detached(async move { inner.on_member_ready(key).await });
            }
        }
    }

    /// Restore the zero summary and return to not-started.
    ///
    /// A round in progress is abandoned: late member completions are ignored.
    pub fn reset(&self) {
        let inner = &self.inner;
        {
            let mut data = inner.data.write();
            data.round += 1;
            data.active_round = None;
            data.lifecycle.begin();
        }
        inner.observers.notify();
        {
            let mut data = inner.data.write();
            data.summary = inner
                .reduction
                .as_ref()
                .map(|reduction| (reduction.new_zero_summary)());
            data.lifecycle = Lifecycle::default();
        }
        debug!(collection = inner.id, "collection reset");
        notify_later(&inner.observers, inner.config.notify_delay);
    }

    pub fn member(&self, key: &K) -> Option<&M> {
        self.inner.members.get(key)
    }

    pub fn members(&self) -> impl Iterator<Item = (&K, &M)> {
        self.inner.members.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.members.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.members.is_empty()
    }

    /// The reduced summary; `None` if no reducer was configured.
    pub fn summary(&self) -> Option<V> {
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

    /// Number of rounds started (or reset) so far.
    pub fn round(&self) -> u64 {
        self.inner.data.read().round
    }
}

impl<K, M, V> CollectionInner<K, M, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Loadable<K>,
    V: Clone + Send + Sync + 'static,
{
    fn attach_adapters(this: &Arc<Self>) {
        let name = format!("collection#{}", this.id);
        let adapters = this
            .members
            .iter()
            .map(|(key, member)| {
                let collection = Arc::downgrade(this);
                let key = key.clone();
                member.subscribe(
                    name.clone(),
                    Arc::new(move || {
                        if let Some(collection) = collection.upgrade() {
                            Self::on_member_changed(&collection, &key);
                        }
                    }),
                )
            })
            .collect();
        *this.adapters.lock() = adapters;
    }

    /// Adapter body, run on every member notification.
    fn on_member_changed(this: &Arc<Self>, key: &K) {
        let Some(member) = this.members.get(key) else {
            return;
        };
        if this.data.read().active_round.is_none() {
            return;
        }
        let error = member.error();
        if !error.is_empty() {
            this.on_member_error(key, error);
        } else if member.is_ready() {
            let collection = Arc::clone(this);
            let key = key.clone();
            spawn_detached(async move { collection.on_member_ready(key).await });
        } else if !member.is_loading() {
            // reset mid-round: it will not report ready for this round
            this.on_member_error(key, format!("member {key:?} was reset"));
        }
    }

    /// Short-circuit: the first failure of a round ends it.
    ///
    /// Observers get only the end notification. The collection has been
    /// loading since the round began, so there is no separate begin.
    fn on_member_error(&self, key: &K, error: String) {
        {
            let mut data = self.data.write();
            let Some(round) = data.active_round else {
                return;
            };
            data.active_round = None;
            warn!(collection = self.id, round, key = ?key, error = %error, "member failed");
            data.lifecycle.fail(error);
        }
        notify_later(&self.observers, self.config.notify_delay);
    }

    async fn on_member_ready(self: Arc<Self>, key: K) {
        let mut table = self.table.lock().await;
        let active_round = self.data.read().active_round;
        let Some(round) = active_round else {
            return;
        };
        table.sync_round(round);
        if table.is_completed() {
            return;
        }
        match self.members.get(&key) {
            Some(member) if member.is_ready() => table.mark_ready(&key),
            _ => return,
        }
        if !table.all_ready() {
            debug!(collection = self.id, round, key = ?key, "member ready");
            return;
        }

        let summary = self.reduce();
        {
            let mut data = self.data.write();
            if data.active_round != Some(round) {
                return;
            }
            if summary.is_some() {
                data.summary = summary;
            }
            data.active_round = None;
            data.lifecycle.succeed();
        }
        table.complete();
        drop(table);

        info!(collection = self.id, round, members = self.members.len(), "all members ready");
        notify_after(&self.observers, self.config.notify_delay).await;
    }

    fn reduce(&self) -> Option<V> {
        self.reduction.as_ref().map(|reduction| {
            self.members
                .values()
                .fold((reduction.new_zero_summary)(), |summary, member| {
                    (reduction.reducer)(summary, member)
                })
        })
    }
}

impl<K, M, V, Q> Loadable<Q> for Collection<K, M, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    M: Loadable<K>,
    V: Clone + Send + Sync + 'static,
    Q: Send + 'static,
{
    fn error(&self) -> String {
        Collection::error(self)
    }

    fn is_loading(&self) -> bool {
        Collection::is_loading(self)
    }

    fn is_ready(&self) -> bool {
        Collection::is_ready(self)
    }

    fn subscribe(&self, name: String, observer: Observer) -> Subscription {
        self.subscribe_optional(name, Some(observer))
    }

    /// The key is ignored: a collection loads all of its own members.
    fn start(&self, _key: Q, options: StartOptions) -> BoxFuture<'static, ()> {
        Collection::start(self, options);
        futures::future::ready(()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use std::time::Duration;

    type Counter = Store<&'static str, u32, u32>;

    fn counter(value: u32) -> Counter {
        Store::builder(|| 0, move |_key: &'static str| async move { Ok(value) })
            .summarizer(|_key, state: u32| async move { Ok(state) })
            .config(StoreConfig::default().with_notify_delay(Duration::from_millis(1)))
            .build()
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn reducer_requires_zero_summary() {
        let result = Collection::builder(["A"], |_| counter(1))
            .reducer(|acc: u32, member: &Counter| acc + member.summary().unwrap_or(0))
            .build();
        assert_eq!(result.err(), Some(ConfigError::ReducerWithoutZeroSummary));

        let result = Collection::<_, Counter, u32>::builder(["A"], |_| counter(1))
            .zero_summary(|| 0)
            .build();
        assert_eq!(result.err(), Some(ConfigError::ReducerWithoutZeroSummary));
    }

    #[test]
    fn rejects_empty_and_duplicate_keys() {
        let empty: [&'static str; 0] = [];
        let result = Collection::<_, Counter, ()>::builder(empty, |_| counter(1)).build();
        assert_eq!(result.err(), Some(ConfigError::EmptyCollection));

        let result = Collection::<_, Counter, ()>::builder(["A", "A"], |_| counter(1)).build();
        assert_eq!(result.err(), Some(ConfigError::DuplicateKey("\"A\"".into())));
    }

    #[test]
    fn summary_is_none_without_reducer() {
        let collection = Collection::<_, Counter, ()>::builder(["A", "B"], |_| counter(1))
            .build()
            .unwrap();
        assert_eq!(collection.summary(), None);
        assert_eq!(collection.readiness(), Readiness::NotStarted);
        assert_eq!(collection.keys().copied().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(collection.member(&"A").map(|m| m.observer_count()), Some(1));
    }

    #[tokio::test]
    async fn completes_with_members_already_loaded() {
        let a = counter(2);
        let b = counter(5);
        a.start("A", StartOptions::default()).await;
        b.start("B", StartOptions::default()).await;

        let mut members = vec![a, b].into_iter();
        let collection = Collection::builder(["A", "B"], |_| members.next().unwrap())
            .zero_summary(|| 0)
            .reducer(|acc: u32, member: &Counter| acc + member.summary().unwrap_or(0))
            .build()
            .unwrap();

        collection.start(StartOptions::default());
        wait_until(|| collection.is_ready()).await;
        assert_eq!(collection.summary(), Some(7));

        // ready and not forced: no new round
        collection.start(StartOptions::default());
        assert_eq!(collection.round(), 1);
    }

    #[tokio::test]
    async fn reset_restores_zero_summary() {
        let collection = Collection::builder(["A", "B"], |_| counter(3))
            .zero_summary(|| 100)
            .reducer(|acc: u32, member: &Counter| acc + member.summary().unwrap_or(0))
            .build()
            .unwrap();
        assert_eq!(collection.summary(), Some(100));

        collection.start(StartOptions::default());
        wait_until(|| collection.is_ready()).await;
        assert_eq!(collection.summary(), Some(106));

        collection.reset();
        assert_eq!(collection.summary(), Some(100));
        assert_eq!(collection.readiness(), Readiness::NotStarted);
    }

    #[test]
    fn start_outside_runtime_does_nothing() {
        let collection = Collection::<_, Counter, ()>::builder(["A", "B"], |_| counter(1))
            .build()
            .unwrap();

        collection.start(StartOptions::default());

        assert_eq!(collection.readiness(), Readiness::NotStarted);
        assert_eq!(collection.round(), 0);
        assert!(collection.members().all(|(_, member)| !member.is_loading()));
    }

    fn slow_counter(delay_ms: u64) -> Counter {
        Store::builder(
            || 0,
            move |_key: &'static str| async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(1)
            },
        )
        .summarizer(|_key, state: u32| async move { Ok(state) })
        .config(StoreConfig::default().with_notify_delay(Duration::from_millis(1)))
        .build()
    }

    #[tokio::test]
    async fn member_reset_mid_round_fails_the_round() {
        let collection = Collection::builder(["A", "B"], |key| {
            slow_counter(if *key == "A" { 1 } else { 50 })
        })
        .zero_summary(|| 0)
        .reducer(|acc: u32, member: &Counter| acc + member.summary().unwrap_or(0))
        .build()
        .unwrap();

        collection.start(StartOptions::default());
        let b = collection.member(&"B").unwrap();
        assert!(b.is_loading());
        b.reset();

        wait_until(|| !collection.error().is_empty()).await;
        assert_eq!(collection.error(), "member \"B\" was reset");
        assert_eq!(collection.readiness(), Readiness::Errored);

        // not stuck: a plain start begins a new round that completes
        collection.start(StartOptions::default());
        assert_eq!(collection.round(), 2);
        wait_until(|| collection.is_ready()).await;
        assert_eq!(collection.summary(), Some(2));
    }

    #[tokio::test]
    async fn member_summary_mid_round_does_not_stall() {
        let collection = Collection::builder(["A", "B"], |_| slow_counter(20))
            .zero_summary(|| 0)
            .reducer(|acc: u32, member: &Counter| acc + member.summary().unwrap_or(0))
            .build()
            .unwrap();

        collection.start(StartOptions::default());
        tokio::time::sleep(Duration::from_millis(2)).await;
        collection.member(&"A").unwrap().do_summary().await;

        wait_until(|| collection.is_ready()).await;
        assert_eq!(collection.summary(), Some(2));
        assert_eq!(collection.member(&"A").unwrap().state(), 1);
    }

    #[tokio::test]
    async fn collections_nest() {
        let inner_a = Collection::builder(["A1", "A2"], |_| counter(1))
            .zero_summary(|| 0)
            .reducer(|acc: u32, member: &Counter| acc + member.summary().unwrap_or(0))
            .build()
            .unwrap();
        let inner_b = Collection::builder(["B1"], |_| counter(10))
            .zero_summary(|| 0)
            .reducer(|acc: u32, member: &Counter| acc + member.summary().unwrap_or(0))
            .build()
            .unwrap();
        let mut inners = vec![inner_a, inner_b].into_iter();

        type Inner = Collection<&'static str, Counter, u32>;
        let outer = Collection::builder(["a", "b"], |_| inners.next().unwrap())
            .zero_summary(|| 0)
            .reducer(|acc: u32, member: &Inner| acc + member.summary().unwrap_or(0))
            .build()
            .unwrap();

        outer.start(StartOptions::default());
        wait_until(|| outer.is_ready()).await;
        assert_eq!(outer.summary(), Some(12));
    }
}
