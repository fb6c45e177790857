use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use murmur::api::{ApiClient, Backend, ObjectStorage};
use murmur::config::Settings;
use murmur::feed::{FeedPaginator, FeedScope, LoadOutcome};
use murmur::interaction::PostInteractions;
use murmur::logging::{self, LogConfig};
use murmur::media::{self, MediaReference, MediaResolver, PendingMedia};
use murmur::session::SessionStore;
use murmur::share::{compose_share, strip_html};
use murmur_types::{MediaKind, Post, PostId, UserId};

/// Murmur - command-line driver for the Murmur feed sync layer
#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Browse and interact with a Murmur feed from the terminal")]
#[command(version)]
struct Cli {
    /// Backend API URL
    #[arg(long, short, env = "MURMUR_SERVER_URL")]
    server: Option<String>,

    /// Public root for stored media
    #[arg(long, env = "MURMUR_STORAGE_ROOT")]
    storage_root: Option<String>,

    /// Bearer token for authenticated requests
    #[arg(long, env = "MURMUR_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Page through the global feed or one author's posts
    Feed {
        #[arg(long)]
        author: Option<UserId>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Show a single post
    Post { id: PostId },
    /// Toggle a like on a post
    Like {
        post: PostId,
        #[arg(long)]
        user: UserId,
    },
    /// Comment on a post
    Comment {
        post: PostId,
        #[arg(long)]
        user: UserId,
        text: String,
    },
    /// Prepare a post for sharing and print the payload
    Share { post: PostId },
    /// Upload an image or video for a new post and print its storage path
    Upload {
        file: String,
        /// MIME type reported by the picker, e.g. image/jpeg
        #[arg(long)]
        mime: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env may carry MURMUR_* overrides
    let _ = dotenv::dotenv();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::minimal()
    };
    logging::init_logging(&log_config)?;

    let mut settings = Settings::new().context("Failed to load settings")?;
    if let Some(server) = cli.server {
        settings.server_url = server;
    }
    if let Some(root) = cli.storage_root {
        settings.storage_root = root;
    }
    log::info!("Using server {}", settings.server_url);

    let mut client = ApiClient::new(&settings.server_url);
    client.set_access_token(cli.token);
    let client = Arc::new(client);
    let backend: Arc<dyn Backend> = client.clone();
    let storage: Arc<dyn ObjectStorage> = client;

    let session = Arc::new(SessionStore::new());
    let resolver = MediaResolver::new(storage, &settings.storage_root, &settings.cache_dir);
    let interactions = PostInteractions::new(Arc::clone(&backend));

    match cli.command {
        Command::Feed { author, pages } => {
            let paginator =
                FeedPaginator::new(Arc::clone(&backend), session, settings.page_increment);
            let scope = author.map_or(FeedScope::Global, FeedScope::Author);
            for _ in 0..pages.max(1) {
                match paginator.load_more(scope).await {
                    Ok(LoadOutcome::ReachedEnd { .. } | LoadOutcome::Exhausted) => break,
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("{}", e.user_message());
                        break;
                    }
                }
            }
            for post in paginator.items(scope) {
                print_post(&post, &resolver);
            }
            if paginator.is_exhausted(scope) {
                println!("-- end of feed --");
            }
        }
        Command::Post { id } => {
            let post = interactions.load_post(id).await?;
            print_post(&post, &resolver);
        }
        Command::Like { post, user } => {
            interactions.load_post(post).await?;
            interactions.toggle_like(post, user).await?;
            let verb = if interactions.is_liked(post, user) {
                "Liked"
            } else {
                "Unliked"
            };
            println!("{} ({} likes)", verb, interactions.like_count(post));
        }
        Command::Comment { post, user, text } => {
            interactions.load_post(post).await?;
            interactions.submit_comment(post, user, &text).await?;
            println!("Comment posted ({} comments)", interactions.comment_count(post));
        }
        Command::Share { post } => {
            let post = interactions.load_post(post).await?;
            let payload = compose_share(&resolver, &post).await;
            println!("{}", payload.text);
            if let Some(file) = payload.file {
                println!("attachment: {}", file.display());
            }
        }
        Command::Upload { file, mime } => {
            let picked = PendingMedia::from_picker(file, &mime)
                .with_context(|| format!("Unsupported media type {}", mime))?;
            let path = resolver.upload_post_media(&picked).await?;
            println!("{}", path);
        }
    }

    Ok(())
}

fn print_post(post: &Post, resolver: &MediaResolver) {
    println!(
        "{}  {}  [{} likes, {} comments]",
        post.id,
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.likes.len(),
        post.comment_count
    );
    let avatar = resolver.resolve_avatar(post.user.image.as_ref());
    println!(
        "  {} ({}): {}",
        post.user.name,
        avatar.url().unwrap_or("default avatar"),
        strip_html(&post.body)
    );
    if let Some(path) = &post.file {
        let label = match media::media_kind(path) {
            Some(MediaKind::Video) => "video",
            Some(MediaKind::Image) => "image",
            None => "media",
        };
        let locator = resolver.resolve(&MediaReference::from(path.clone()));
        if let Some(url) = locator.url() {
            println!("  {}: {}", label, url);
        }
    }
}
