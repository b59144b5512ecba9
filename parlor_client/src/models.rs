use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery status of a message as seen by the local cache.
///
/// Server payloads never carry this field; anything deserialized from the
/// wire defaults to `Confirmed`. `Pending` and `Failed` only ever originate
/// locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    #[default]
    Confirmed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub delivery: DeliveryState,
}

impl Message {
    pub fn is_pending(&self) -> bool {
        self.delivery == DeliveryState::Pending
    }
}

/// A direct-message conversation between exactly two participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participants: [String; 2],
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "isLiked")]
    pub is_liked: bool,
    pub likes_count: i64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub body: String,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// One level of nesting only: replies do not themselves have replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    pub author_id: String,
    pub body: String,
}

/// Authoritative like state as reported by `POST /posts/{id}/like`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes_count: i64,
    #[serde(rename = "isLiked")]
    pub is_liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub comment: String,
}
