//! Top-level lookups over a lazily loaded, shared range store.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use tokio::runtime::Handle;

use crate::address::Address;
use crate::config::Config;
use crate::dns::DnsResolver;
use crate::error::{CloudInfoError, Result};
use crate::snapshot::SnapshotLoader;
use crate::store::{CloudInfoResult, RangeStore};

type LoadOutcome = std::result::Result<Arc<RangeStore>, Arc<CloudInfoError>>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// Observable lifecycle of the cached range store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded; the next query starts a load.
    Uninitialized,
    /// A load is in flight; queries wait for it.
    Loading,
    /// A store is cached and served to every query.
    Ready,
}

enum StoreState {
    Uninitialized,
    Loading { generation: u64, load: SharedLoad },
    Ready(Arc<RangeStore>),
}

struct Cache {
    generation: u64,
    state: StoreState,
}

/// Answers "which cloud owns this host?" against a cached [`RangeStore`].
///
/// The store is loaded on first use. Concurrent callers that arrive while a
/// load is in flight wait for that same load and all see its outcome. A
/// failed load leaves the cache uninitialized, so the next query retries.
/// The load runs as its own `tokio` task, so dropping a pending query never
/// cancels it. Starting a load outside a Tokio runtime fails with
/// `NoRuntime`.
///
/// Cloning is cheap and clones share the cache.
///
/// # Example
///
/// ```ignore
/// use cloud_info::{CloudInfo, Config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), cloud_info::CloudInfoError> {
///     let cloud_info = CloudInfo::from_config(&Config::from_env())?;
///     let result = cloud_info.query(Some("13.248.118.1")).await?;
///     assert!(result.is_aws);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct CloudInfo {
    dns: DnsResolver,
    loader: Arc<SnapshotLoader>,
    cache: Arc<Mutex<Cache>>,
}

impl CloudInfo {
    pub fn new(loader: SnapshotLoader, dns: DnsResolver) -> Self {
        Self {
            dns,
            loader: Arc::new(loader),
            cache: Arc::new(Mutex::new(Cache {
                generation: 0,
                state: StoreState::Uninitialized,
            })),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            SnapshotLoader::from_config(config)?,
            DnsResolver::new(config.dns_timeout()),
        ))
    }

    /// Look up which providers' ranges contain `host`.
    ///
    /// An absent or empty host yields all-false without any lookup. Literal
    /// IP addresses are used as-is; anything else is resolved through DNS.
    ///
    /// # Errors
    ///
    /// - `ResolutionFailed`/`ResolutionTimeout` if `host` cannot be resolved
    /// - `SnapshotUnavailable` if the range store cannot be loaded
    pub async fn query(&self, host: Option<&str>) -> Result<CloudInfoResult> {
        let Some(host) = host.filter(|host| !host.is_empty()) else {
            return Ok(CloudInfoResult::default());
        };

        let address = self.dns.resolve(host).await?;
        self.query_address(address).await
    }

    /// Look up an already-parsed address.
    ///
    /// The address is matched strictly by family; IPv4-mapped IPv6 addresses
    /// are not collapsed unless the caller does so with
    /// [`Address::to_canonical`].
    pub async fn query_address(&self, address: impl Into<Address>) -> Result<CloudInfoResult> {
        let address = address.into();
        let store = self.store().await?;
        let result = store.lookup(&address);
        debug!("{address}: {result:?}");
        Ok(result)
    }

    /// The cached store, loading it first if needed.
    pub async fn store(&self) -> Result<Arc<RangeStore>> {
        let load = {
            let mut cache = self.lock();
            let in_flight = match &cache.state {
                StoreState::Ready(store) => return Ok(Arc::clone(store)),
                StoreState::Loading { load, .. } => Some(load.clone()),
                StoreState::Uninitialized => None,
            };
            match in_flight {
                Some(load) => {
                    debug!("Waiting for in-flight snapshot load");
                    load
                }
                None => self.begin_load(&mut cache)?,
            }
        };

        load.await.map_err(unavailable)
    }

    /// Load a fresh store and swap it in, bypassing the cache.
    ///
    /// Queries keep using the previous store until the new one is ready. On
    /// failure the previous state is left untouched.
    pub async fn reload(&self) -> Result<Arc<RangeStore>> {
        let store = Arc::new(self.loader.load().await?);
        self.replace_store(Arc::clone(&store));
        Ok(store)
    }

    /// Atomically replace the cached store.
    ///
    /// Any load still in flight keeps serving its own waiters but no longer
    /// updates the cache.
    pub fn replace_store(&self, store: impl Into<Arc<RangeStore>>) {
        let mut cache = self.lock();
        cache.generation += 1;
        cache.state = StoreState::Ready(store.into());
    }

    /// Drop the cached store; the next query loads again.
    pub fn invalidate(&self) {
        let mut cache = self.lock();
        cache.generation += 1;
        cache.state = StoreState::Uninitialized;
    }

    pub fn load_state(&self) -> LoadState {
        match self.lock().state {
            StoreState::Uninitialized => LoadState::Uninitialized,
            StoreState::Loading { .. } => LoadState::Loading,
            StoreState::Ready(_) => LoadState::Ready,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the load task and record it as in flight.
    fn begin_load(&self, cache: &mut Cache) -> Result<SharedLoad> {
        let runtime = Handle::try_current().map_err(|_| CloudInfoError::NoRuntime)?;
        cache.generation += 1;
        let generation = cache.generation;
        debug!("Starting snapshot load (generation {generation})");

        let loader = Arc::clone(&self.loader);
        let task_cache = Arc::clone(&self.cache);
        let task = runtime.spawn(async move {
            let outcome: LoadOutcome = loader.load().await.map(Arc::new).map_err(Arc::new);
            settle(&task_cache, generation, &outcome);
            outcome
        });

        let join_cache = Arc::clone(&self.cache);
        let load = task
            .map(move |joined| {
                joined.unwrap_or_else(|err| {
                    let outcome = Err(Arc::new(CloudInfoError::LoadAborted(err.to_string())));
                    settle(&join_cache, generation, &outcome);
                    outcome
                })
            })
            .boxed()
            .shared();

        cache.state = StoreState::Loading {
            generation,
            load: load.clone(),
        };
        Ok(load)
    }
}

/// Record a finished load, unless the cache has moved on since it started.
fn settle(cache: &Mutex<Cache>, generation: u64, outcome: &LoadOutcome) {
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    let current = matches!(
        cache.state,
        StoreState::Loading { generation: loading, .. } if loading == generation
    );
    if !current {
        return;
    }

    cache.state = match outcome {
        Ok(store) => StoreState::Ready(Arc::clone(store)),
        Err(err) => {
            warn!("Snapshot load failed; next query will retry: {err}");
            StoreState::Uninitialized
        }
    };
}

fn unavailable(err: Arc<CloudInfoError>) -> CloudInfoError {
    match &*err {
        CloudInfoError::SnapshotUnavailable(source) => {
            CloudInfoError::SnapshotUnavailable(Arc::clone(source))
        }
        _ => CloudInfoError::SnapshotUnavailable(err),
    }
}

impl fmt::Debug for CloudInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudInfo")
            .field("dns", &self.dns)
            .field("loader", &self.loader)
            .field("state", &self.load_state())
            .finish()
    }
}
