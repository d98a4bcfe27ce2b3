//! `pulse` command: read and act on the feed of a hosted backend.

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use pulse::domain::{Credentials, FeedPost, InteractionKind, PostId, UserId};
use pulse::inbound::terminal::TerminalView;
use pulse::outbound::rest::RestBackend;
use pulse::{ClientOptions, PulseClient, PulsePorts, PulseSettings};

/// `pulse` command arguments.
#[derive(Debug, Parser)]
#[command(name = "pulse", about = "Read and interact with a Pulse feed", version)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the feed, newest first.
    Feed,
    /// Publish a post.
    Post { content: String },
    /// Like a post, or remove the like.
    Like { post_id: PostId },
    /// Retweet a post, or remove the retweet.
    Retweet { post_id: PostId },
    /// Comment on a post.
    Comment { post_id: PostId, content: String },
    /// Print a post's comments.
    Thread {
        post_id: PostId,
        /// Continue from a cursor printed by a previous page.
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Print profiles to follow.
    Suggestions {
        /// Continue from a cursor printed by a previous page.
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Follow a profile, or unfollow it.
    Follow { user_id: String },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: CliArgs) -> Result<()> {
    let settings = PulseSettings::load_from_iter([OsString::from("pulse")])
        .map_err(|error| eyre!("load settings: {error}"))?;
    let backend = RestBackend::new(
        settings.backend_url()?,
        settings.anon_key()?,
        settings.request_timeout(),
    )
    .wrap_err("create HTTP client")?;
    let client = PulseClient::new(
        PulsePorts::from_backend(backend),
        ClientOptions::from(&settings),
    );

    let mount = client.start().await?;
    if let (Some(email), Some(password)) = (settings.email.as_deref(), settings.password.as_deref())
    {
        let credentials = Credentials::try_from_parts(email, password)?;
        client.session().sign_in(&credentials).await?;
    }

    let outcome = run(&client, args.command).await;
    mount.unmount().await;
    let rendered = outcome?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

async fn run(client: &PulseClient, command: Command) -> Result<String> {
    let view = TerminalView::new(Arc::new(DefaultClock));
    let timeline = client.timeline();

    match command {
        Command::Feed => {
            if let Err(error) = timeline.reload().await {
                warn!(error = %error, "feed load failed");
            }
            Ok(view.feed(&timeline.state()))
        }
        Command::Post { content } => {
            let post = timeline.compose(&content).await?;
            card_for(client, &view, post.id).await
        }
        Command::Like { post_id } => {
            toggle(client, &view, InteractionKind::Like, post_id).await
        }
        Command::Retweet { post_id } => {
            toggle(client, &view, InteractionKind::Retweet, post_id).await
        }
        Command::Comment { post_id, content } => {
            let mut thread = client.comment_thread(post_id);
            thread.toggle_expanded().await?;
            thread.submit(timeline, &content).await?;
            Ok(view.thread(&thread))
        }
        Command::Thread { post_id, cursor } => {
            let mut thread = client.comment_thread(post_id);
            match cursor {
                Some(cursor) => thread.resume(&cursor).await?,
                None => thread.toggle_expanded().await?,
            }
            Ok(view.thread(&thread))
        }
        Command::Suggestions { cursor } => {
            let mut graph = client.follow_graph();
            graph.refresh().await?;
            if let Some(cursor) = cursor {
                graph.resume(&cursor).await?;
            }
            Ok(TerminalView::suggestions(&graph))
        }
        Command::Follow { user_id } => {
            let target = UserId::new(&user_id)?;
            let mut graph = client.follow_graph();
            graph.refresh().await?;
            let following = graph.toggle(&target).await?;
            Ok(if following {
                format!("following {target}")
            } else {
                format!("unfollowed {target}")
            })
        }
    }
}

async fn feed_post(client: &PulseClient, post_id: PostId) -> Result<FeedPost> {
    let timeline = client.timeline();
    if timeline.state().post(post_id).is_none() {
        timeline.reload().await?;
    }
    timeline
        .state()
        .post(post_id)
        .cloned()
        .ok_or_else(|| eyre!("post {post_id} is not in the feed"))
}

async fn toggle(
    client: &PulseClient,
    view: &TerminalView,
    kind: InteractionKind,
    post_id: PostId,
) -> Result<String> {
    let post = feed_post(client, post_id).await?;
    client.timeline().toggle(kind, &post).await?;
    card_for(client, view, post_id).await
}

async fn card_for(client: &PulseClient, view: &TerminalView, post_id: PostId) -> Result<String> {
    let post = feed_post(client, post_id).await?;
    Ok(view.card(&post))
}
