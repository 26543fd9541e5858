//! Cacheable demo
//!
//! Walks a small user repository through cached reads, scoped invalidation
//! and a full clear against the backend chosen by `CACHE_BACKEND`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cacheable::{
    BackendKind, CacheBinding, CacheDecorator, CacheError, Call, Config, InMemoryBackend,
    Invalidation,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

/// Stand-in for a slow data source; counts every load that reaches it.
#[derive(Default)]
struct UserStore {
    users: RwLock<HashMap<u64, User>>,
    loads: AtomicUsize,
}

struct UserRepository {
    store: Arc<UserStore>,
    cache: CacheBinding,
}

impl UserRepository {
    fn new(cache: CacheBinding) -> Self {
        Self {
            store: Arc::new(UserStore::default()),
            cache,
        }
    }

    async fn get_user(&self, user_id: u64) -> Result<Option<User>, CacheError> {
        let call = Call::new("get_user").kwarg("user_id", user_id);
        self.cache
            .cache(&call, None, || {
                let store = self.store.clone();
                async move {
                    store.loads.fetch_add(1, Ordering::SeqCst);
                    Ok(store.users.read().await.get(&user_id).cloned())
                }
            })
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>, CacheError> {
        self.cache
            .cache(&Call::new("list_users"), None, || {
                let store = self.store.clone();
                async move {
                    store.loads.fetch_add(1, Ordering::SeqCst);
                    let mut users: Vec<User> = store.users.read().await.values().cloned().collect();
                    users.sort_by_key(|u| u.id);
                    Ok(users)
                }
            })
            .await
    }

    async fn save_user(&self, user: User) -> Result<(), CacheError> {
        let call = Call::new("save_user").kwarg("user_id", user.id);
        let rules = [
            Invalidation::new("get_user").with_mapping([("user_id", "user_id")]),
            Invalidation::new("list_users"),
        ];
        self.cache
            .invalidate_many(&rules, &call, || async {
                self.store.users.write().await.insert(user.id, user.clone());
                Ok(())
            })
            .await
    }

    async fn reset(&self) -> Result<(), CacheError> {
        self.cache
            .invalidate_all(|| async {
                self.store.users.write().await.clear();
                Ok(())
            })
            .await
    }

    fn loads(&self) -> usize {
        self.store.loads.load(Ordering::SeqCst)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cacheable=info,cacheable_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={:?}, default_ttl={:?}",
        config.backend, config.default_ttl
    );

    let memory = InMemoryBackend::new();
    let decorator = match config.backend {
        BackendKind::Memory => CacheDecorator::from_backend(memory.clone(), config.default_ttl),
        _ => CacheDecorator::from_config(&config)
            .await
            .context("failed to build cache backend")?,
    };
    let repo = UserRepository::new(CacheBinding::new(decorator).with_context("demo"));

    repo.save_user(User {
        id: 1,
        name: "Alice".to_string(),
    })
    .await?;

    let first = repo.get_user(1).await?;
    let second = repo.get_user(1).await?;
    info!("get_user(1) twice -> {:?} / {:?}, loads={}", first, second, repo.loads());

    let missing = repo.get_user(42).await?;
    info!("get_user(42) -> {:?} (not cached), loads={}", missing, repo.loads());

    repo.save_user(User {
        id: 1,
        name: "Alicia".to_string(),
    })
    .await?;
    let updated = repo.get_user(1).await?;
    info!("after save_user: {:?}, loads={}", updated, repo.loads());

    let all = repo.list_users().await?;
    info!("list_users -> {} user(s), loads={}", all.len(), repo.loads());

    repo.reset().await?;
    let after_reset = repo.list_users().await?;
    info!("after reset: {} user(s), loads={}", after_reset.len(), repo.loads());

    if config.backend == BackendKind::Memory {
        let stats = memory.stats().await;
        info!(
            "Backend stats: hit_rate={:.2} {}",
            stats.hit_rate(),
            serde_json::to_string(&stats)?
        );
    }

    Ok(())
}
