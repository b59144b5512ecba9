use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parlor_client::{telemetry, ClientConfig, ParlorClient, ToggleOutcome, TokenStore};

#[derive(Parser)]
#[command(name = "parlor", about = "Command-line shell for the Parlor client core")]
struct Cli {
    /// Override the API base URL from the config file.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a bearer token for subsequent commands.
    Login { token: String },
    /// Forget the stored bearer token.
    Logout,
    /// List conversations.
    Conversations,
    /// Show a conversation transcript.
    Transcript { conversation_id: String },
    /// Send a message; the transcript is refetched on success.
    Send {
        conversation_id: String,
        body: String,
    },
    /// Show the post feed.
    Feed,
    /// Toggle the like on a post.
    Like { post_id: String },
    /// Comment on a post.
    Comment { post_id: String, body: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::load()?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url;
    }
    tracing::debug!(base_url = %config.api_base_url, "using backend");

    let tokens = match &config.token_file {
        Some(path) => TokenStore::load_from(path)?,
        None => TokenStore::new(),
    };

    match &cli.command {
        Command::Login { token } => {
            let path = config
                .token_file
                .as_ref()
                .context("no token file location configured")?;
            tokens.set(token.clone());
            tokens.persist_to(path)?;
            println!("token stored at {}", path.display());
            return Ok(());
        }
        Command::Logout => {
            tokens.clear();
            if let Some(path) = &config.token_file {
                tokens.persist_to(path)?;
            }
            println!("token cleared");
            return Ok(());
        }
        _ => {}
    }

    let client = ParlorClient::new(&config, tokens)?;

    match cli.command {
        Command::Login { .. } | Command::Logout => unreachable!("handled above"),
        Command::Conversations => {
            client.refresh_conversations().await?;
            for conversation in client.store().conversations() {
                println!(
                    "{}  ({} <-> {})",
                    conversation.id, conversation.participants[0], conversation.participants[1]
                );
            }
        }
        Command::Transcript { conversation_id } => {
            client.refresh_conversations().await?;
            client.refresh_transcript(&conversation_id).await?;
            for message in client.store().transcript(&conversation_id) {
                println!("[{}] {}: {}", message.sent_at, message.sender_id, message.body);
            }
        }
        Command::Send {
            conversation_id,
            body,
        } => {
            client.refresh_conversations().await?;
            let confirmed = client.chat().send_message(&conversation_id, &body).await?;
            println!("delivered as {}", confirmed.id);
        }
        Command::Feed => {
            client.refresh_feed().await?;
            println!("{}", serde_json::to_string_pretty(&client.store().feed())?);
        }
        Command::Like { post_id } => {
            client.refresh_feed().await?;
            match client.likes().toggle_like(&post_id).await? {
                ToggleOutcome::Applied => {
                    let post = client
                        .store()
                        .post(&post_id)
                        .context("post disappeared from the cache")?;
                    println!(
                        "{}: liked={} likes={}",
                        post.id, post.is_liked, post.likes_count
                    );
                }
                ToggleOutcome::Ignored => println!("a toggle for {post_id} is already in flight"),
            }
        }
        Command::Comment { post_id, body } => {
            client.refresh_feed().await?;
            let post = client.add_comment(&post_id, &body).await?;
            println!("{} now has {} comments", post.id, post.comments.len());
        }
    }

    Ok(())
}
