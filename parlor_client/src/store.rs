use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{Conversation, DeliveryState, Message, Post};

/// Every mutation of the cache, expressed as a command. [`Store::apply`] is
/// the single mutation entry point; nothing else writes to the state.
#[derive(Debug, Clone)]
pub enum StoreCommand {
    ReplaceConversations(Vec<Conversation>),
    ReplaceTranscript {
        conversation_id: String,
        messages: Vec<Message>,
    },
    ReplaceFeed(Vec<Post>),
    UpsertPost(Post),
    AppendPending(Message),
    MarkPendingFailed {
        conversation_id: String,
        temp_id: String,
    },
    RemovePending {
        conversation_id: String,
        temp_id: String,
    },
    FlipLike {
        post_id: String,
    },
    RestoreLike {
        post_id: String,
        is_liked: bool,
        likes_count: i64,
    },
    SetLikeAuthoritative {
        post_id: String,
        is_liked: bool,
        likes_count: i64,
    },
}

/// Change notifications emitted after a command is applied. UI layers and
/// tests subscribe to these instead of polling.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    ConversationsChanged,
    TranscriptChanged(String),
    FeedChanged,
    PostChanged(String),
    Notice(String),
}

#[derive(Default)]
struct StoreState {
    conversations: HashMap<String, Conversation>,
    posts: HashMap<String, Post>,
    feed_order: Vec<String>,
}

/// Normalized in-memory cache of conversations and posts.
///
/// Cloning the handle shares the underlying state. Reads hand out cloned
/// snapshots so callers never hold the lock across an await point.
#[derive(Clone)]
pub struct Store {
    state: Arc<Mutex<StoreState>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Emits a user-visible notice without touching the cache.
    pub fn notice(&self, text: impl Into<String>) {
        self.emit(StoreEvent::Notice(text.into()));
    }

    pub fn apply(&self, command: StoreCommand) {
        let event = {
            let mut state = self.locked();
            match command {
                StoreCommand::ReplaceConversations(conversations) => {
                    let mut map = HashMap::new();
                    for mut conversation in conversations {
                        // Keep an already-loaded transcript when the listing
                        // payload carries no messages.
                        if conversation.messages.is_empty() {
                            if let Some(existing) = state.conversations.get(&conversation.id) {
                                conversation.messages = existing.messages.clone();
                            }
                        }
                        map.insert(conversation.id.clone(), conversation);
                    }
                    state.conversations = map;
                    Some(StoreEvent::ConversationsChanged)
                }
                StoreCommand::ReplaceTranscript {
                    conversation_id,
                    messages,
                } => match state.conversations.get_mut(&conversation_id) {
                    Some(conversation) => {
                        conversation.messages = messages;
                        Some(StoreEvent::TranscriptChanged(conversation_id))
                    }
                    None => {
                        debug!(%conversation_id, "dropping transcript for unknown conversation");
                        None
                    }
                },
                StoreCommand::ReplaceFeed(posts) => {
                    state.feed_order = posts.iter().map(|p| p.id.clone()).collect();
                    state.posts = posts.into_iter().map(|p| (p.id.clone(), p)).collect();
                    Some(StoreEvent::FeedChanged)
                }
                StoreCommand::UpsertPost(post) => {
                    let post_id = post.id.clone();
                    if !state.posts.contains_key(&post_id) {
                        state.feed_order.push(post_id.clone());
                    }
                    state.posts.insert(post_id.clone(), post);
                    Some(StoreEvent::PostChanged(post_id))
                }
                StoreCommand::AppendPending(message) => {
                    let conversation_id = message.conversation_id.clone();
                    match state.conversations.get_mut(&conversation_id) {
                        Some(conversation) => {
                            conversation.messages.push(message);
                            Some(StoreEvent::TranscriptChanged(conversation_id))
                        }
                        None => {
                            debug!(%conversation_id, "dropping pending message for unknown conversation");
                            None
                        }
                    }
                }
                StoreCommand::MarkPendingFailed {
                    conversation_id,
                    temp_id,
                } => match state.conversations.get_mut(&conversation_id) {
                    Some(conversation) => {
                        match conversation
                            .messages
                            .iter_mut()
                            .find(|m| m.id == temp_id && m.is_pending())
                        {
                            Some(message) => {
                                message.delivery = DeliveryState::Failed;
                                Some(StoreEvent::TranscriptChanged(conversation_id))
                            }
                            None => {
                                debug!(%conversation_id, %temp_id, "no pending message to mark failed");
                                None
                            }
                        }
                    }
                    None => None,
                },
                StoreCommand::RemovePending {
                    conversation_id,
                    temp_id,
                } => match state.conversations.get_mut(&conversation_id) {
                    Some(conversation) => {
                        let before = conversation.messages.len();
                        // Matches the pending entry or its failed remnant;
                        // never a confirmed message.
                        conversation
                            .messages
                            .retain(|m| !(m.id == temp_id && m.delivery != DeliveryState::Confirmed));
                        if conversation.messages.len() == before {
                            debug!(%conversation_id, %temp_id, "pending message already gone");
                        }
                        Some(StoreEvent::TranscriptChanged(conversation_id))
                    }
                    None => None,
                },
                StoreCommand::FlipLike { post_id } => match state.posts.get_mut(&post_id) {
                    Some(post) => {
                        // Flag and counter always move together.
                        post.is_liked = !post.is_liked;
                        post.likes_count += if post.is_liked { 1 } else { -1 };
                        Some(StoreEvent::PostChanged(post_id))
                    }
                    None => {
                        debug!(%post_id, "flip for unknown post");
                        None
                    }
                },
                StoreCommand::RestoreLike {
                    post_id,
                    is_liked,
                    likes_count,
                }
                | StoreCommand::SetLikeAuthoritative {
                    post_id,
                    is_liked,
                    likes_count,
                } => match state.posts.get_mut(&post_id) {
                    Some(post) => {
                        post.is_liked = is_liked;
                        post.likes_count = likes_count;
                        Some(StoreEvent::PostChanged(post_id))
                    }
                    None => None,
                },
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        self.locked().conversations.get(conversation_id).cloned()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        let mut conversations: Vec<_> = self.locked().conversations.values().cloned().collect();
        conversations.sort_by(|a, b| a.id.cmp(&b.id));
        conversations
    }

    pub fn transcript(&self, conversation_id: &str) -> Vec<Message> {
        self.locked()
            .conversations
            .get(conversation_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    pub fn pending_count(&self, conversation_id: &str) -> usize {
        self.locked()
            .conversations
            .get(conversation_id)
            .map(|c| c.messages.iter().filter(|m| m.is_pending()).count())
            .unwrap_or(0)
    }

    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.locked().posts.get(post_id).cloned()
    }

    /// Feed snapshot in server order.
    pub fn feed(&self) -> Vec<Post> {
        let state = self.locked();
        state
            .feed_order
            .iter()
            .filter_map(|id| state.posts.get(id).cloned())
            .collect()
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine; events are best-effort notifications.
        let _ = self.events.send(event);
    }

    fn locked(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryState;
    use chrono::Utc;

    fn post(id: &str, is_liked: bool, likes_count: i64) -> Post {
        Post {
            id: id.into(),
            author_id: "author".into(),
            body: String::new(),
            is_liked,
            likes_count,
            comments: Vec::new(),
        }
    }

    fn pending_message(conversation_id: &str, temp_id: &str) -> Message {
        Message {
            id: temp_id.into(),
            conversation_id: conversation_id.into(),
            sender_id: "local".into(),
            body: "hi".into(),
            sent_at: Utc::now(),
            delivery: DeliveryState::Pending,
        }
    }

    #[test]
    fn flip_moves_flag_and_counter_together() {
        let store = Store::new();
        store.apply(StoreCommand::UpsertPost(post("p1", false, 10)));

        store.apply(StoreCommand::FlipLike { post_id: "p1".into() });
        let flipped = store.post("p1").unwrap();
        assert!(flipped.is_liked);
        assert_eq!(flipped.likes_count, 11);

        store.apply(StoreCommand::FlipLike { post_id: "p1".into() });
        let back = store.post("p1").unwrap();
        assert!(!back.is_liked);
        assert_eq!(back.likes_count, 10);
    }

    #[test]
    fn remove_pending_only_touches_the_matching_entry() {
        let store = Store::new();
        store.apply(StoreCommand::ReplaceConversations(vec![Conversation {
            id: "c1".into(),
            participants: ["alice".into(), "bob".into()],
            messages: Vec::new(),
        }]));
        store.apply(StoreCommand::AppendPending(pending_message("c1", "pending-a")));
        store.apply(StoreCommand::AppendPending(pending_message("c1", "pending-b")));

        store.apply(StoreCommand::RemovePending {
            conversation_id: "c1".into(),
            temp_id: "pending-a".into(),
        });

        let transcript = store.transcript("c1");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].id, "pending-b");
    }

    #[test]
    fn failed_entries_are_flagged_and_still_removable() {
        let store = Store::new();
        store.apply(StoreCommand::ReplaceConversations(vec![Conversation {
            id: "c1".into(),
            participants: ["alice".into(), "bob".into()],
            messages: Vec::new(),
        }]));
        store.apply(StoreCommand::AppendPending(pending_message("c1", "pending-a")));

        store.apply(StoreCommand::MarkPendingFailed {
            conversation_id: "c1".into(),
            temp_id: "pending-a".into(),
        });
        let transcript = store.transcript("c1");
        assert_eq!(transcript[0].delivery, DeliveryState::Failed);

        store.apply(StoreCommand::RemovePending {
            conversation_id: "c1".into(),
            temp_id: "pending-a".into(),
        });
        assert!(store.transcript("c1").is_empty());
    }

    #[test]
    fn replace_conversations_keeps_loaded_transcripts() {
        let store = Store::new();
        let conversation = Conversation {
            id: "c1".into(),
            participants: ["alice".into(), "bob".into()],
            messages: Vec::new(),
        };
        store.apply(StoreCommand::ReplaceConversations(vec![conversation.clone()]));
        store.apply(StoreCommand::AppendPending(pending_message("c1", "pending-a")));

        // A conversation listing without message bodies must not wipe the
        // transcript we already hold.
        store.apply(StoreCommand::ReplaceConversations(vec![conversation]));
        assert_eq!(store.transcript("c1").len(), 1);
    }
}
