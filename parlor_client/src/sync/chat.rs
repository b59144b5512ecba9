use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::models::{DeliveryState, Message};
use crate::store::{Store, StoreCommand};

/// Keeps a conversation transcript visually responsive while a send request
/// is in flight, without letting failed sends silently appear as delivered.
#[derive(Clone)]
pub struct ChatSync {
    api: ApiClient,
    store: Store,
    sender_id: String,
}

impl ChatSync {
    pub fn new(api: ApiClient, store: Store, sender_id: impl Into<String>) -> Self {
        Self {
            api,
            store,
            sender_id: sender_id.into(),
        }
    }

    pub async fn send_message(&self, conversation_id: &str, body: &str) -> Result<Message> {
        self.send_message_with_cancel(conversation_id, body, &CancellationToken::new())
            .await
    }

    /// Appends a pending entry to the transcript, dispatches the send, then
    /// reconciles: a successful send refetches the authoritative transcript,
    /// a failed one removes exactly the pending entry again.
    ///
    /// The pending entry is inserted before the request goes out, so the
    /// user sees feedback independent of network latency. Every exit path
    /// resolves the pending entry; none leaves it behind.
    pub async fn send_message_with_cancel(
        &self,
        conversation_id: &str,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<Message> {
        self.api.ensure_authenticated()?;
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::EmptyMessage);
        }
        if self.store.conversation(conversation_id).is_none() {
            return Err(Error::NoConversation(conversation_id.to_string()));
        }

        let temp_id = format!("pending-{}", Uuid::new_v4());
        self.store.apply(StoreCommand::AppendPending(Message {
            id: temp_id.clone(),
            conversation_id: conversation_id.to_string(),
            sender_id: self.sender_id.clone(),
            body: body.to_string(),
            sent_at: Utc::now(),
            delivery: DeliveryState::Pending,
        }));

        let sent = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%conversation_id, %temp_id, "send cancelled, rolling back pending entry");
                self.remove_pending(conversation_id, &temp_id);
                return Err(Error::Cancelled);
            }
            result = self.api.send_message(conversation_id, body) => result,
        };

        match sent {
            Ok(confirmed) => {
                // The authoritative list supersedes the optimistic entry; no
                // in-place identifier patching.
                match self.api.fetch_messages(conversation_id).await {
                    Ok(messages) => {
                        self.store.apply(StoreCommand::ReplaceTranscript {
                            conversation_id: conversation_id.to_string(),
                            messages,
                        });
                    }
                    Err(err) => {
                        warn!(%conversation_id, error = %err, "transcript refresh after send failed");
                        self.remove_pending(conversation_id, &temp_id);
                        self.store
                            .notice("message sent, but refreshing the conversation failed");
                    }
                }
                Ok(confirmed)
            }
            Err(err) => {
                // Network failure and non-2xx alike: mark the entry failed
                // for observers, roll it back, notify. No retry.
                self.store.apply(StoreCommand::MarkPendingFailed {
                    conversation_id: conversation_id.to_string(),
                    temp_id: temp_id.clone(),
                });
                self.remove_pending(conversation_id, &temp_id);
                self.store.notice("message could not be sent");
                Err(err)
            }
        }
    }

    /// Replaces the cached transcript with the server's ordering.
    pub async fn refresh(&self, conversation_id: &str) -> Result<()> {
        let messages = self.api.fetch_messages(conversation_id).await?;
        self.store.apply(StoreCommand::ReplaceTranscript {
            conversation_id: conversation_id.to_string(),
            messages,
        });
        Ok(())
    }

    fn remove_pending(&self, conversation_id: &str, temp_id: &str) {
        self.store.apply(StoreCommand::RemovePending {
            conversation_id: conversation_id.to_string(),
            temp_id: temp_id.to_string(),
        });
    }
}
