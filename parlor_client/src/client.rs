use crate::api::ApiClient;
use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::Post;
use crate::store::{Store, StoreCommand};
use crate::sync::{ChatSync, LikeSync};

/// Bundles the store, the API client and both synchronizers behind one
/// handle. UI layers get this injected instead of reaching for globals.
#[derive(Clone)]
pub struct ParlorClient {
    store: Store,
    api: ApiClient,
    chat: ChatSync,
    likes: LikeSync,
}

impl ParlorClient {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self> {
        let api = ApiClient::from_config(config, tokens)?;
        let store = Store::new();
        let chat = ChatSync::new(api.clone(), store.clone(), config.local_user_id.clone());
        let likes = LikeSync::new(api.clone(), store.clone());
        Ok(Self {
            store,
            api,
            chat,
            likes,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn chat(&self) -> &ChatSync {
        &self.chat
    }

    pub fn likes(&self) -> &LikeSync {
        &self.likes
    }

    /// Fetch-and-replace of the post feed.
    pub async fn refresh_feed(&self) -> Result<()> {
        let posts = self.api.fetch_feed().await?;
        self.store.apply(StoreCommand::ReplaceFeed(posts));
        Ok(())
    }

    /// Fetch-and-replace of the conversation list.
    pub async fn refresh_conversations(&self) -> Result<()> {
        let conversations = self.api.fetch_conversations().await?;
        self.store
            .apply(StoreCommand::ReplaceConversations(conversations));
        Ok(())
    }

    pub async fn refresh_transcript(&self, conversation_id: &str) -> Result<()> {
        self.chat.refresh(conversation_id).await
    }

    /// Comments are not optimistic: plain request, then upsert of the
    /// post the server returns.
    pub async fn add_comment(&self, post_id: &str, body: &str) -> Result<Post> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let post = self.api.add_comment(post_id, body).await?;
        self.store.apply(StoreCommand::UpsertPost(post.clone()));
        Ok(post)
    }
}
