use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::store::{Store, StoreCommand};

/// What a [`LikeSync::toggle_like`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server confirmed; flag and counter now hold authoritative values.
    Applied,
    /// A toggle for this post was already in flight; the call did nothing.
    Ignored,
}

/// Makes like/unlike feel instantaneous while keeping eventual counts
/// authoritative. Toggles are serialized per post: a toggle arriving while
/// one is still outstanding is ignored, never queued.
#[derive(Clone)]
pub struct LikeSync {
    api: ApiClient,
    store: Store,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl LikeSync {
    pub fn new(api: ApiClient, store: Store) -> Self {
        Self {
            api,
            store,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn toggle_like(&self, post_id: &str) -> Result<ToggleOutcome> {
        self.toggle_like_with_cancel(post_id, &CancellationToken::new())
            .await
    }

    /// Flips the flag and counter immediately, then reconciles with the
    /// server: success overwrites both with the authoritative values (guards
    /// against counter drift from concurrent likes by other users), failure
    /// restores the exact pre-toggle pair.
    pub async fn toggle_like_with_cancel(
        &self,
        post_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ToggleOutcome> {
        self.api.ensure_authenticated()?;
        let before = self
            .store
            .post(post_id)
            .ok_or_else(|| Error::UnknownPost(post_id.to_string()))?;

        let _guard = match InFlightGuard::acquire(&self.in_flight, post_id) {
            Some(guard) => guard,
            None => {
                debug!(%post_id, "toggle already in flight, ignoring");
                return Ok(ToggleOutcome::Ignored);
            }
        };

        self.store.apply(StoreCommand::FlipLike {
            post_id: post_id.to_string(),
        });

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                self.restore(post_id, before.is_liked, before.likes_count);
                return Err(Error::Cancelled);
            }
            result = self.api.toggle_like(post_id) => result,
        };

        match outcome {
            Ok(response) => {
                self.store.apply(StoreCommand::SetLikeAuthoritative {
                    post_id: post_id.to_string(),
                    is_liked: response.is_liked,
                    likes_count: response.likes_count,
                });
                Ok(ToggleOutcome::Applied)
            }
            Err(err) => {
                self.restore(post_id, before.is_liked, before.likes_count);
                self.store.notice("like could not be saved");
                Err(err)
            }
        }
    }

    fn restore(&self, post_id: &str, is_liked: bool, likes_count: i64) {
        self.store.apply(StoreCommand::RestoreLike {
            post_id: post_id.to_string(),
            is_liked,
            likes_count,
        });
    }
}

/// Membership in the per-post in-flight set, released on drop so every exit
/// path (including errors and cancellation) clears it.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    post_id: String,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, post_id: &str) -> Option<Self> {
        let mut in_flight = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(post_id.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            post_id: post_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.post_id);
    }
}
