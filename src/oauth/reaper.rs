//! Periodic removal of expired sessions, authorization codes, and access tokens.

use crate::errors::StorageError;
use crate::storage::traits::OAuthStorage;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Rows removed by one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub authorization_codes: usize,
    pub access_tokens: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.sessions + self.authorization_codes + self.access_tokens
    }
}

/// Floor for the sweep interval and the per-sweep timeout
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Background sweeper for expired rows across the stores.
#[derive(Clone)]
pub struct ExpiryReaper {
    storage: Arc<dyn OAuthStorage>,
    interval: Duration,
    sweep_timeout: Duration,
}

impl ExpiryReaper {
    /// Periods below one second are raised to one second.
    pub fn new(storage: Arc<dyn OAuthStorage>, interval: Duration, sweep_timeout: Duration) -> Self {
        if interval < MIN_PERIOD || sweep_timeout < MIN_PERIOD {
            tracing::warn!(
                ?interval,
                ?sweep_timeout,
                "expiry reaper periods raised to {:?}",
                MIN_PERIOD
            );
        }
        Self {
            storage,
            interval: interval.max(MIN_PERIOD),
            sweep_timeout: sweep_timeout.max(MIN_PERIOD),
        }
    }

    /// Delete everything that expired before this sweep started.
    pub async fn sweep(&self) -> Result<SweepReport, StorageError> {
        let now = Utc::now();
        let work = async {
            Ok::<_, StorageError>(SweepReport {
                sessions: self.storage.cleanup_expired_sessions(now).await?,
                authorization_codes: self.storage.cleanup_expired_codes(now).await?,
                access_tokens: self.storage.cleanup_expired_tokens(now).await?,
            })
        };

        tokio::time::timeout(self.sweep_timeout, work)
            .await
            .map_err(|_| {
                StorageError::QueryFailed(format!(
                    "expiry sweep exceeded {:?}",
                    self.sweep_timeout
                ))
            })?
    }

    /// Run sweeps every interval until `token` is cancelled.
    pub fn spawn(self, tracker: &TaskTracker, token: CancellationToken) {
        tracker.spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        tracing::debug!("expiry reaper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.sweep().await {
                            Ok(report) if report.total() > 0 => {
                                tracing::info!(
                                    sessions = report.sessions,
                                    authorization_codes = report.authorization_codes,
                                    access_tokens = report.access_tokens,
                                    "removed expired rows"
                                );
                            }
                            Ok(_) => tracing::debug!("expiry sweep found nothing"),
                            Err(e) => tracing::error!(error = ?e, "expiry sweep failed"),
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::types::{AccessToken, AuthorizationCode, Session};
    use crate::storage::inmemory::MemoryOAuthStorage;
    use crate::storage::traits::{AccessTokenStore, AuthorizationCodeStore, SessionStore};
    use chrono::{DateTime, Duration as ChronoDuration};

    fn session(id: &str, expires_at: DateTime<Utc>) -> Session {
        Session {
            session_id: id.to_string(),
            user_id: "user-1".to_string(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_session() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        let now = Utc::now();
        storage
            .store_session(&session("expired", now - ChronoDuration::minutes(1)))
            .await
            .unwrap();
        storage
            .store_session(&session("live", now + ChronoDuration::hours(1)))
            .await
            .unwrap();

        let reaper = ExpiryReaper::new(
            storage.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(5),
        );
        let report = reaper.sweep().await.unwrap();
        assert_eq!(report.sessions, 1);

        assert!(storage.get_session("expired").await.unwrap().is_none());
        assert!(storage.get_session("live").await.unwrap().is_some());

        // Nothing left to remove
        assert_eq!(reaper.sweep().await.unwrap(), SweepReport::default());
    }

    #[tokio::test]
    async fn test_sweep_removes_codes_and_tokens() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        let past = Utc::now() - ChronoDuration::minutes(5);
        storage
            .store_code(&AuthorizationCode {
                code: "old-code".to_string(),
                client_id: "client".to_string(),
                user_id: "user-1".to_string(),
                redirect_uri: "https://app.example/cb".to_string(),
                scopes: vec![],
                code_challenge: None,
                code_challenge_method: None,
                nonce: None,
                state: None,
                created_at: past - ChronoDuration::minutes(10),
                expires_at: past,
            })
            .await
            .unwrap();
        storage
            .store_token(&AccessToken {
                token: "old-token".to_string(),
                client_id: "client".to_string(),
                user_id: Some("user-1".to_string()),
                scopes: vec![],
                created_at: past - ChronoDuration::hours(1),
                expires_at: past,
            })
            .await
            .unwrap();

        let reaper = ExpiryReaper::new(storage, Duration::from_secs(3600), Duration::from_secs(5));
        let report = reaper.sweep().await.unwrap();
        assert_eq!(report.authorization_codes, 1);
        assert_eq!(report.access_tokens, 1);
        assert_eq!(report.total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reaper_stops_on_cancel() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        storage
            .store_session(&session("expired", Utc::now() - ChronoDuration::minutes(1)))
            .await
            .unwrap();

        let tracker = TaskTracker::new();
        let token = CancellationToken::new();
        ExpiryReaper::new(
            storage.clone(),
            Duration::from_secs(60),
            Duration::from_secs(5),
        )
        .spawn(&tracker, token.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        let sessions_left = storage.cleanup_expired_sessions(Utc::now()).await.unwrap();
        assert_eq!(sessions_left, 0);

        token.cancel();
        tracker.close();
        tracker.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let storage = Arc::new(MemoryOAuthStorage::new());
        let reaper = ExpiryReaper::new(storage.clone(), Duration::ZERO, Duration::ZERO);
        assert_eq!(reaper.interval, MIN_PERIOD);
        assert_eq!(reaper.sweep_timeout, MIN_PERIOD);

        let tracker = TaskTracker::new();
        let token = CancellationToken::new();
        reaper.spawn(&tracker, token.clone());

        storage
            .store_session(&session("expired", Utc::now() - ChronoDuration::minutes(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        let sessions_left = storage.cleanup_expired_sessions(Utc::now()).await.unwrap();
        assert_eq!(sessions_left, 0);

        token.cancel();
        tracker.close();
        tracker.wait().await;
    }
}
