// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle: when the derived key is held in memory.
//!
//! States are `Locked` (initial) and `Unlocked`. While unlocked a tokio
//! task ticks every `check_interval` and locks the session once
//! `now - last_activity >= lock_timeout_minutes * 60_000`. At most one
//! timer task runs per manager; starting a new one cancels the previous.
//!
//! The key never leaves the manager. Callers borrow it for the duration of
//! one closure through [`SessionManager::with_key`], so a lock that lands
//! between two operations makes the second one fail with `VaultLocked`.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use lockbox_config::model;
use lockbox_core::types::{LockReason, SessionStatus, Settings};
use lockbox_core::{Clock, LockboxError, SettingsStore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::kdf::DerivedKey;

/// Accepted lock timeout range, in minutes.
pub const LOCK_TIMEOUT_BOUNDS: RangeInclusive<u32> = model::LOCK_TIMEOUT_RANGE;

/// Lock timeout used until settings say otherwise.
pub const DEFAULT_LOCK_TIMEOUT_MINUTES: u32 = model::DEFAULT_LOCK_TIMEOUT_MINUTES;

/// Default cadence of the inactivity check.
pub const DEFAULT_CHECK_INTERVAL: Duration =
    Duration::from_secs(model::DEFAULT_CHECK_INTERVAL_SECS);

/// Handle returned by [`SessionManager::on_lock`].
pub type ListenerId = u64;

type LockListener = Arc<dyn Fn(LockReason) + Send + Sync>;

/// Clamps `minutes` into [`LOCK_TIMEOUT_BOUNDS`].
pub fn clamp_lock_timeout(minutes: u32) -> u32 {
    minutes.clamp(*LOCK_TIMEOUT_BOUNDS.start(), *LOCK_TIMEOUT_BOUNDS.end())
}

/// Owner of the live [`DerivedKey`].
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: Mutex<SessionState>,
    listeners: Mutex<Vec<(ListenerId, LockListener)>>,
    next_listener: AtomicU64,
    clock: Arc<dyn Clock>,
    settings: Option<Arc<dyn SettingsStore>>,
    check_interval: Duration,
}

struct SessionState {
    key: Option<DerivedKey>,
    last_activity_ms: i64,
    lock_timeout_minutes: u32,
    timer: Option<CancellationToken>,
}

impl SessionManager {
    /// A locked session with default timeout and check interval.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::build(clock, None, DEFAULT_CHECK_INTERVAL, DEFAULT_LOCK_TIMEOUT_MINUTES)
    }

    /// A locked session that persists its timeout through `settings`.
    pub fn with_settings(
        clock: Arc<dyn Clock>,
        settings: Arc<dyn SettingsStore>,
        check_interval: Duration,
        lock_timeout_minutes: u32,
    ) -> Self {
        Self::build(clock, Some(settings), check_interval, lock_timeout_minutes)
    }

    fn build(
        clock: Arc<dyn Clock>,
        settings: Option<Arc<dyn SettingsStore>>,
        check_interval: Duration,
        lock_timeout_minutes: u32,
    ) -> Self {
        let now = clock.now_millis();
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState {
                    key: None,
                    last_activity_ms: now,
                    lock_timeout_minutes: clamp_lock_timeout(lock_timeout_minutes),
                    timer: None,
                }),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                clock,
                settings,
                check_interval: check_interval.max(Duration::from_millis(1)),
            }),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.inner.state().key.is_some()
    }

    /// `Locked -> Unlocked`. Takes ownership of `key`, stamps activity and
    /// (re)starts the inactivity timer. Unlocking an unlocked session swaps
    /// the key and zeroes the old one.
    ///
    /// Must be called inside a tokio runtime.
    pub fn unlock(&self, key: DerivedKey) -> Result<(), LockboxError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            LockboxError::Internal("session timer requires a tokio runtime".into())
        })?;

        let mut state = self.inner.state();
        if let Some(mut old) = state.key.replace(key) {
            old.clear();
        }
        state.last_activity_ms = self.inner.clock.now_millis();
        if let Some(old) = state.timer.take() {
            old.cancel();
        }
        state.timer = Some(spawn_timer(
            &handle,
            Arc::downgrade(&self.inner),
            self.inner.check_interval,
        ));
        debug!(
            lock_timeout_minutes = state.lock_timeout_minutes,
            "session unlocked"
        );
        Ok(())
    }

    /// Records user or store activity. No-op while locked.
    pub fn activity(&self) {
        let now = self.inner.clock.now_millis();
        let mut state = self.inner.state();
        if state.key.is_some() {
            state.last_activity_ms = now;
        }
    }

    /// Explicit lock. Returns `false` if the session was already locked.
    pub fn lock(&self) -> bool {
        self.inner.lock_if(LockReason::Manual, |_, _| true)
    }

    /// Runs one inactivity check now. Returns `true` if it locked the
    /// session.
    pub fn tick(&self) -> bool {
        self.inner.check_inactivity()
    }

    /// Runs `f` with the live key. Fails with `VaultLocked` when locked.
    pub fn with_key<R>(&self, f: impl FnOnce(&DerivedKey) -> R) -> Result<R, LockboxError> {
        let state = self.inner.state();
        match state.key.as_ref() {
            Some(key) => Ok(f(key)),
            None => Err(LockboxError::VaultLocked),
        }
    }

    /// Registers a callback fired after every `Unlocked -> Locked`
    /// transition, with the reason.
    pub fn on_lock<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(LockReason) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners().push((id, Arc::new(listener)));
        id
    }

    /// Unregisters a lock callback. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn lock_timeout_minutes(&self) -> u32 {
        self.inner.state().lock_timeout_minutes
    }

    /// Clamps `minutes` to 1..=60, applies it and persists it. Works in
    /// either state. Returns the applied value.
    pub async fn set_lock_timeout(&self, minutes: u32) -> Result<u32, LockboxError> {
        let applied = clamp_lock_timeout(minutes);
        if applied != minutes {
            debug!(requested = minutes, applied, "lock timeout clamped");
        }
        if let Some(store) = &self.inner.settings {
            store
                .save_settings(&Settings {
                    lock_timeout_minutes: applied,
                })
                .await?;
        }
        self.inner.state().lock_timeout_minutes = applied;
        info!(lock_timeout_minutes = applied, "lock timeout updated");
        Ok(applied)
    }

    /// Loads the persisted timeout, if any, and applies it (clamped).
    pub async fn restore_settings(&self) -> Result<u32, LockboxError> {
        let Some(store) = &self.inner.settings else {
            return Ok(self.lock_timeout_minutes());
        };
        let loaded = store.load_settings().await?;
        let mut state = self.inner.state();
        if let Some(settings) = loaded {
            state.lock_timeout_minutes = clamp_lock_timeout(settings.lock_timeout_minutes);
        }
        Ok(state.lock_timeout_minutes)
    }

    pub fn status(&self) -> SessionStatus {
        let now = self.inner.clock.now_millis();
        let state = self.inner.state();
        let unlocked = state.key.is_some();
        let timeout_ms = i64::from(state.lock_timeout_minutes) * 60_000;
        SessionStatus {
            unlocked,
            last_activity_ms: state.last_activity_ms,
            lock_timeout_minutes: state.lock_timeout_minutes,
            remaining_ms: unlocked
                .then(|| (timeout_ms - (now - state.last_activity_ms)).max(0)),
        }
    }

    /// Whether an inactivity timer task is currently scheduled.
    pub fn timer_running(&self) -> bool {
        self.inner
            .state()
            .timer
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        if let Some(mut key) = state.key.take() {
            key.clear();
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("SessionManager")
            .field("unlocked", &status.unlocked)
            .field("lock_timeout_minutes", &status.lock_timeout_minutes)
            .finish_non_exhaustive()
    }
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, LockListener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_inactivity(&self) -> bool {
        let now = self.clock.now_millis();
        self.lock_if(LockReason::Inactivity, |state, _| {
            now - state.last_activity_ms >= i64::from(state.lock_timeout_minutes) * 60_000
        })
    }

    /// Locks when unlocked and `cond` holds, in one critical section, then
    /// notifies listeners outside it.
    fn lock_if(&self, reason: LockReason, cond: impl FnOnce(&SessionState, i64) -> bool) -> bool {
        {
            let mut state = self.state();
            if state.key.is_none() || !cond(&state, self.clock.now_millis()) {
                return false;
            }
            if let Some(mut key) = state.key.take() {
                key.clear();
            }
            if let Some(timer) = state.timer.take() {
                timer.cancel();
            }
        }
        info!(reason = %reason, "session locked");

        let listeners: Vec<LockListener> =
            self.listeners().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(reason);
        }
        true
    }
}

fn spawn_timer(
    handle: &tokio::runtime::Handle,
    inner: Weak<SessionInner>,
    period: Duration,
) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    handle.spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let Some(inner) = inner.upgrade() else {
                        warn!("session dropped without cancelling its timer");
                        break;
                    };
                    if inner.check_inactivity() {
                        break;
                    }
                }
                _ = token.cancelled() => break,
            }
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::AtomicI64;

    struct TestClock(AtomicI64);

    impl Clock for TestClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn manager() -> (SessionManager, Arc<TestClock>) {
        let clock = Arc::new(TestClock(AtomicI64::new(1_000_000)));
        (SessionManager::new(clock.clone()), clock)
    }

    fn key() -> DerivedKey {
        DerivedKey::from_bytes([5u8; 32])
    }

    #[tokio::test]
    async fn starts_locked_and_unlocks() {
        let (session, _) = manager();
        assert!(!session.is_unlocked());
        assert!(session.with_key(|_| ()).unwrap_err().is_locked());

        session.unlock(key()).unwrap();
        assert!(session.is_unlocked());
        assert!(session.timer_running());
        assert_eq!(session.with_key(|k| k.as_bytes()[0]).unwrap(), 5);
    }

    #[test]
    fn unlock_outside_runtime_fails_and_stays_locked() {
        let (session, _) = manager();
        assert!(session.unlock(key()).is_err());
        assert!(!session.is_unlocked());
    }

    #[tokio::test]
    async fn explicit_lock_notifies_once_with_manual_reason() {
        let (session, _) = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        session.on_lock(move |r| sink.lock().unwrap().push(r));

        session.unlock(key()).unwrap();
        assert!(session.lock());
        assert!(!session.lock());
        assert!(!session.timer_running());
        assert_eq!(*seen.lock().unwrap(), vec![LockReason::Manual]);
    }

    #[tokio::test]
    async fn tick_locks_after_timeout_only() {
        let (session, clock) = manager();
        session.unlock(key()).unwrap();

        clock.0.fetch_add(14 * 60_000, Ordering::SeqCst);
        assert!(!session.tick());

        session.activity();
        clock.0.fetch_add(14 * 60_000, Ordering::SeqCst);
        assert!(!session.tick());

        clock.0.fetch_add(60_000, Ordering::SeqCst);
        assert!(session.tick());
        assert!(!session.is_unlocked());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_task_locks_once_after_timeout() {
        let (session, clock) = manager();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        session.on_lock(move |r| sink.lock().unwrap().push(r));
        session.unlock(key()).unwrap();

        // Ticks come and go while the session is still fresh.
        tokio::time::sleep(DEFAULT_CHECK_INTERVAL * 3).await;
        assert!(session.is_unlocked());
        assert!(session.timer_running());

        clock.0.fetch_add(15 * 60_000, Ordering::SeqCst);
        tokio::time::sleep(DEFAULT_CHECK_INTERVAL + Duration::from_secs(1)).await;
        assert!(!session.is_unlocked());
        assert!(!session.timer_running());
        assert_eq!(*fired.lock().unwrap(), vec![LockReason::Inactivity]);

        clock.0.fetch_add(60 * 60_000, Ordering::SeqCst);
        tokio::time::sleep(DEFAULT_CHECK_INTERVAL * 3).await;
        assert_eq!(fired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removed_listener_is_not_called() {
        let (session, _) = manager();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = session.on_lock(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(session.remove_listener(id));
        assert!(!session.remove_listener(id));

        session.unlock(key()).unwrap();
        session.lock();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn set_lock_timeout_clamps() {
        let (session, _) = manager();
        assert_eq!(session.set_lock_timeout(0).await.unwrap(), 1);
        assert_eq!(session.set_lock_timeout(500).await.unwrap(), 60);
        assert_eq!(session.set_lock_timeout(30).await.unwrap(), 30);
        assert_eq!(session.lock_timeout_minutes(), 30);
    }

    #[tokio::test]
    async fn status_reports_remaining_time() {
        let (session, clock) = manager();
        assert_eq!(session.status().remaining_ms, None);

        session.set_lock_timeout(1).await.unwrap();
        session.unlock(key()).unwrap();
        clock.0.fetch_add(20_000, Ordering::SeqCst);
        let status = session.status();
        assert!(status.unlocked);
        assert_eq!(status.remaining_ms, Some(40_000));
    }

    #[tokio::test]
    async fn reunlock_replaces_timer() {
        let (session, _) = manager();
        session.unlock(key()).unwrap();
        session.unlock(DerivedKey::from_bytes([6u8; 32])).unwrap();
        assert!(session.timer_running());
        assert_eq!(session.with_key(|k| k.as_bytes()[0]).unwrap(), 6);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp_lock_timeout(0), 1);
        assert_eq!(clamp_lock_timeout(61), 60);
        assert_eq!(clamp_lock_timeout(15), 15);
    }

    #[test]
    fn defaults_follow_session_config() {
        let config = model::SessionConfig::default();
        let (session, _) = manager();
        assert_eq!(session.lock_timeout_minutes(), config.lock_timeout_minutes);
        assert_eq!(DEFAULT_CHECK_INTERVAL.as_secs(), config.check_interval_secs);
        for minutes in [0, 1, 60, 61] {
            assert_eq!(
                model::LOCK_TIMEOUT_RANGE.contains(&minutes),
                clamp_lock_timeout(minutes) == minutes
            );
        }
    }
}
