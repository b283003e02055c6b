// Live editing sessions held for the lifetime of a dashboard view
use crate::application::dashboard_session::{DashboardSession, SessionMode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub type SharedSession = Arc<Mutex<DashboardSession>>;

struct Entry {
    session: SharedSession,
    last_access: Instant,
}

/// Sessions are independent; two sessions on one dashboard save last-write-wins
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionRegistry {
    pub async fn insert(&self, session: DashboardSession) -> (String, SharedSession) {
        let id = uuid::Uuid::new_v4().to_string();
        let shared = Arc::new(Mutex::new(session));
        let entry = Entry {
            session: shared.clone(),
            last_access: Instant::now(),
        };
        self.sessions.write().await.insert(id.clone(), entry);
        (id, shared)
    }

    /// Looks a session up and marks it as recently used
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_access = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions untouched for `idle_timeout` that nobody is watching.
    ///
    /// Sessions that are locked, saving or streaming events are kept.
    pub async fn evict_idle(&self, idle_timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_access) >= idle_timeout && is_abandoned(&entry.session))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }
}

fn is_abandoned(session: &SharedSession) -> bool {
    match session.try_lock() {
        Ok(session) => session.subscriber_count() == 0 && session.mode() != SessionMode::Saving,
        Err(_) => false,
    }
}

/// Periodically evicts idle sessions for as long as the server runs
pub fn spawn_idle_sweep(registry: SessionRegistry, idle_timeout: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let evicted = registry.evict_idle(idle_timeout).await;
            if !evicted.is_empty() {
                tracing::info!("Evicted {} idle sessions", evicted.len());
                tracing::debug!("Evicted sessions {:?}", evicted);
            }
        }
    })
}

/// Recomputes the field catalog without holding the session across the fetches.
///
/// If the tile set changes meanwhile, the session drops the stale result.
pub async fn refresh_catalog(session: SharedSession) -> bool {
    let (request, resolver) = {
        let session = session.lock().await;
        (session.begin_field_resolution(), session.resolver())
    };
    let resolution = resolver.resolve(request.revision, &request.tiles).await;
    session.lock().await.apply_field_resolution(resolution)
}

pub fn spawn_catalog_refresh(session: SharedSession) {
    tokio::spawn(refresh_catalog(session));
}
