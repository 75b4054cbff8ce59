//! Presence of the users currently working on the shared records.
//!
//! A registered session keeps its `active_users` row fresh with a periodic
//! heartbeat. Every session also runs a cooperative sweep that deletes rows
//! whose last activity is older than the staleness threshold, so a session
//! that vanished without closing disappears from everyone's list.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use orcamentos_net::RemoteRecordService;
use orcamentos_shared::constants::{
    CLEANUP_INTERVAL_SECS, COLOR_PALETTE, HEARTBEAT_INTERVAL_SECS, PRESENCE_STALE_AFTER_SECS,
};
use orcamentos_shared::{ActiveUser, NewActiveUser};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub heartbeat_interval: Duration,
    pub cleanup_interval: Duration,
    pub stale_after: chrono::Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(HEARTBEAT_INTERVAL_SECS),
            cleanup_interval: Duration::from_secs(CLEANUP_INTERVAL_SECS),
            stale_after: chrono::Duration::seconds(PRESENCE_STALE_AFTER_SECS),
        }
    }
}

/// What this session last reported about itself.
#[derive(Debug, Clone)]
struct Registration {
    user: ActiveUser,
    current_page: Option<String>,
    editing_quote_id: Option<String>,
}

pub struct PresenceManager {
    remote: RemoteRecordService,
    config: PresenceConfig,
    registration: Arc<Mutex<Option<Registration>>>,
    heartbeat: StdMutex<Option<JoinHandle<()>>>,
    sweeper: StdMutex<Option<JoinHandle<()>>>,
}

impl PresenceManager {
    pub fn new(remote: RemoteRecordService, config: PresenceConfig) -> Self {
        Self {
            remote,
            config,
            registration: Arc::new(Mutex::new(None)),
            heartbeat: StdMutex::new(None),
            sweeper: StdMutex::new(None),
        }
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Register this session under a random display name and color, then
    /// start the heartbeat. Registering again returns the existing user.
    pub async fn register(&self) -> Result<ActiveUser> {
        let mut registration = self.registration.lock().await;
        if let Some(existing) = registration.as_ref() {
            return Ok(existing.user.clone());
        }

        let new_user = NewActiveUser {
            name: random_display_name(),
            color: random_color(),
            last_activity: Utc::now(),
            current_page: None,
            editing_quote_id: None,
        };
        let user = self
            .remote
            .insert_active_user(&new_user)
            .await
            .ok_or(ClientError::RemoteWriteFailed("registrar o usuário ativo"))?;

        info!(id = %user.id, name = %user.name, "Presence registered");
        *registration = Some(Registration {
            user: user.clone(),
            current_page: None,
            editing_quote_id: None,
        });
        drop(registration);

        self.start_heartbeat();
        Ok(user)
    }

    pub async fn current_user(&self) -> Option<ActiveUser> {
        self.registration
            .lock()
            .await
            .as_ref()
            .map(|r| r.user.clone())
    }

    /// Record activity. `current_page` of `None` keeps the last reported page;
    /// `editing_quote_id` replaces the editing marker, `None` clears it.
    pub async fn update_activity(
        &self,
        current_page: Option<&str>,
        editing_quote_id: Option<&str>,
    ) -> bool {
        let mut registration = self.registration.lock().await;
        let Some(reg) = registration.as_mut() else {
            return false;
        };
        if let Some(page) = current_page {
            reg.current_page = Some(page.to_string());
        }
        reg.editing_quote_id = editing_quote_id.map(str::to_string);

        self.remote
            .touch_active_user(
                &reg.user.id,
                reg.current_page.as_deref(),
                reg.editing_quote_id.as_deref(),
            )
            .await
    }

    /// Users whose last activity is within the staleness threshold.
    pub async fn online_users(&self) -> Vec<ActiveUser> {
        let now = Utc::now();
        self.remote
            .list_active_users()
            .await
            .into_iter()
            .filter(|u| !u.is_stale(now, self.config.stale_after))
            .collect()
    }

    /// Delete every presence row older than the staleness threshold.
    pub async fn sweep_stale(&self) -> bool {
        sweep(&self.remote, self.config.stale_after).await
    }

    /// Start the periodic sweep. Restarting replaces the running sweep.
    pub fn start_cleanup(&self) {
        let remote = self.remote.clone();
        let stale_after = self.config.stale_after;
        let period = self.config.cleanup_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                sweep(&remote, stale_after).await;
            }
        });
        replace_task(&self.sweeper, Some(handle));
    }

    /// Stop the background tasks and delete this session's presence row.
    pub async fn remove(&self) -> bool {
        self.stop();
        let Some(registration) = self.registration.lock().await.take() else {
            return false;
        };
        let removed = self.remote.delete_active_user(&registration.user.id).await;
        info!(id = %registration.user.id, removed, "Presence removed");
        removed
    }

    /// Abort the heartbeat and sweep without touching the backend.
    pub fn stop(&self) {
        replace_task(&self.heartbeat, None);
        replace_task(&self.sweeper, None);
    }

    fn start_heartbeat(&self) {
        let remote = self.remote.clone();
        let registration = self.registration.clone();
        let period = self.config.heartbeat_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let snapshot = registration.lock().await.clone();
                let Some(reg) = snapshot else {
                    break;
                };
                let ok = remote
                    .touch_active_user(
                        &reg.user.id,
                        reg.current_page.as_deref(),
                        reg.editing_quote_id.as_deref(),
                    )
                    .await;
                debug!(id = %reg.user.id, ok, "Presence heartbeat");
            }
        });
        replace_task(&self.heartbeat, Some(handle));
    }
}

impl Drop for PresenceManager {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep(remote: &RemoteRecordService, stale_after: chrono::Duration) -> bool {
    let cutoff = Utc::now() - stale_after;
    let ok = remote.delete_stale_users(cutoff).await;
    if !ok {
        warn!("Presence sweep failed");
    }
    ok
}

fn replace_task(slot: &StdMutex<Option<JoinHandle<()>>>, handle: Option<JoinHandle<()>>) {
    let mut slot = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(previous) = std::mem::replace(&mut *slot, handle) {
        previous.abort();
    }
}

/// `Usuário N` with N between 1 and 1000.
pub fn random_display_name() -> String {
    format!("Usuário {}", rand::thread_rng().gen_range(1..=1000))
}

pub fn random_color() -> String {
    COLOR_PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(COLOR_PALETTE[0])
        .to_string()
}
