use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use url::Url;

use vocalia::{
    ApiClient, Category, DataManager, Deliveries, FileStore, HttpClient, Listen, LocalCache,
    OfflineClient, Podcast, PodcastEpisode, PodcastFeed, ReqwestClient, Source, format_time,
    release_date_text, remaining_text, strip_tags,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DISK: Emoji<'_, '_> = Emoji("💾 ", "[c] ");
static CLOUD: Emoji<'_, '_> = Emoji("☁️  ", "[r] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

const DEFAULT_API_URL: &str = "https://api.vocalia.co.uk/podcast";

/// Browse podcasts and sync listening progress, offline first
#[derive(Parser, Debug)]
#[command(name = "vocalia")]
#[command(about = "Browse podcasts and sync listening progress, offline first")]
#[command(version)]
struct Args {
    /// Base URL of the podcast backend
    #[arg(long, env = "VOCALIA_API_URL", default_value = DEFAULT_API_URL)]
    api_url: Url,

    /// Directory for the local cache
    #[arg(long, default_value = ".vocalia-cache")]
    cache_dir: PathBuf,

    /// Bearer token for account-bound data
    #[arg(long, env = "VOCALIA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Never contact the backend, answer from the cache only
    #[arg(long)]
    offline: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List podcast categories
    Categories,
    /// List the top podcasts
    Top,
    /// List the top podcasts of one category
    Category { id: i64 },
    /// Search the podcast directory
    Search { term: String },
    /// Show a podcast feed with listening progress
    Feed { rss_url: String },
    /// List subscribed podcasts
    Subscriptions,
    /// Subscribe to a podcast feed
    Subscribe { rss_url: String },
    /// Unsubscribe from a podcast feed
    Unsubscribe { rss_url: String },
    /// Show the listening progress of one episode
    Listen { episode_url: String },
    /// Mark an episode as played
    MarkPlayed { rss_url: String, episode_url: String },
    /// Reset an episode to unplayed
    MarkUnplayed { rss_url: String, episode_url: String },
    /// Show the episode currently loaded in the player
    Current,
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_new(format!("{}=debug", env!("CARGO_CRATE_NAME")))?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn spinner(message: String) -> Result<ProgressBar> {
    let style = ProgressStyle::default_spinner().template("{spinner:.green} {wide_msg}")?;

    let bar = ProgressBar::new_spinner();
    bar.set_style(style);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

/// Print every delivery as it arrives, spinning while the backend is pending
async fn show<T>(label: &str, mut deliveries: Deliveries<T>, render: impl Fn(&T)) -> Result<()> {
    let bar = spinner(format!("{SEARCH}Loading {}", label.cyan()))?;
    let mut shown = false;

    while let Some(delivery) = deliveries.next().await {
        let Some(value) = delivery.value else {
            continue;
        };

        bar.suspend(|| {
            let origin = match delivery.source {
                Source::Cache => format!("{DISK}{}", "cached".dimmed()),
                Source::Remote => format!("{CLOUD}{}", "refreshed".green()),
            };
            println!("\n{} {origin}", label.bold());
            render(&value);
        });
        shown = true;
    }

    bar.finish_and_clear();
    if !shown {
        println!(
            "{FAILURE}{}",
            format!("No {label} available (not cached and backend unreachable)").yellow()
        );
    }
    Ok(())
}

fn print_categories(categories: &Vec<Category>) {
    for category in categories {
        println!("  {:>4}  {}", category.id.to_string().cyan(), category.title);
    }
}

fn print_podcasts(podcasts: &Vec<Podcast>) {
    for podcast in podcasts {
        let marker = if podcast.is_subscribed {
            "*".green().bold()
        } else {
            " ".normal()
        };
        println!("  {marker} {}", podcast.title.bold());
        println!("    {}", podcast.rss_url.dimmed());
    }
}

fn print_episode(episode: &PodcastEpisode) {
    let date = episode
        .publishing_date
        .map(|published| release_date_text(published, Utc::now()))
        .unwrap_or_default();
    let progress = remaining_text(episode);

    println!(
        "  {} {} {}",
        episode.title.bold(),
        date.dimmed(),
        progress.yellow()
    );
    println!("    {}", episode.content.dimmed());
}

fn print_feed(feed: &PodcastFeed) {
    let subscribed = if feed.is_subscribed {
        " (subscribed)".green().to_string()
    } else {
        String::new()
    };
    println!("{HEADPHONES}{}{subscribed}", feed.title.bold().green());

    let description = strip_tags(&feed.description);
    if !description.trim().is_empty() {
        println!("{}", truncate(description.trim(), 200).dimmed());
    }
    for episode in &feed.items {
        print_episode(episode);
    }
}

fn print_listen(listen: &Listen) {
    let state = if listen.is_completed {
        "played".green()
    } else {
        "in progress".yellow()
    };
    println!(
        "  {} {} / {} {state}",
        listen.episode_name.bold(),
        format_time(listen.time).cyan(),
        format_time(listen.duration)
    );
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars.saturating_sub(3)) {
        Some((cut, _)) if text.chars().count() > max_chars => format!("{}...", &text[..cut]),
        _ => text.to_string(),
    }
}

/// Load a feed and find one of its episodes
async fn find_episode<C: HttpClient + 'static>(
    manager: &DataManager<C>,
    rss_url: &str,
    episode_url: &str,
) -> Result<PodcastEpisode> {
    let feed = manager
        .feed(rss_url)
        .settle()
        .await
        .with_context(|| format!("Feed {rss_url} is not available"))?;

    feed.episode(episode_url)
        .cloned()
        .with_context(|| format!("Episode {episode_url} is not part of {rss_url}"))
}

async fn run<C: HttpClient + 'static>(http: C, args: Args) -> Result<()> {
    let store = FileStore::open(args.cache_dir.clone())
        .await
        .with_context(|| format!("Failed to open cache at {}", args.cache_dir.display()))?;

    let api = ApiClient::new(http, args.api_url.clone());
    if !args.offline {
        println!("{CLOUD}Backend: {}", api.base_url().as_str().cyan());
    }
    println!("{FOLDER}Cache: {}", store.dir().display().to_string().cyan());

    let (_tokens, token_watch) = watch::channel(args.token.clone());
    let manager = DataManager::new(api, LocalCache::new(Arc::new(store)), token_watch);

    match args.command {
        Command::Categories => show("categories", manager.categories(), print_categories).await?,
        Command::Top => show("top podcasts", manager.top_podcasts(), print_podcasts).await?,
        Command::Category { id } => {
            show(
                "category podcasts",
                manager.podcasts_by_category(id),
                print_podcasts,
            )
            .await?
        }
        Command::Search { term } => {
            let bar = spinner(format!("{SEARCH}Searching for {}", term.cyan()))?;
            let results = manager.search_podcasts(&term).await;
            bar.finish_and_clear();

            match results {
                Some(podcasts) if !podcasts.is_empty() => print_podcasts(&podcasts),
                Some(_) => println!("{}", "No podcasts found".yellow()),
                None => println!("{FAILURE}{}", "Search is unavailable offline".red()),
            }
        }
        Command::Feed { rss_url } => show("feed", manager.feed(&rss_url), print_feed).await?,
        Command::Subscriptions => {
            show("subscriptions", manager.subscriptions(), print_podcasts).await?
        }
        Command::Subscribe { rss_url } => {
            let feed = manager
                .feed(&rss_url)
                .settle()
                .await
                .with_context(|| format!("Feed {rss_url} is not available"))?;
            let podcast = Podcast::from_feed(&feed);

            manager.add_subscription(&podcast).await.settled().await;
            println!("{SUCCESS}Subscribed to {}", podcast.title.bold().green());
        }
        Command::Unsubscribe { rss_url } => {
            manager.delete_subscription(&rss_url).await.settled().await;
            println!("{SUCCESS}Unsubscribed from {}", rss_url.cyan());
        }
        Command::Listen { episode_url } => {
            show("listen", manager.listen_info(&episode_url), print_listen).await?;
            if let Some(position) = manager.resume_position(&episode_url).await {
                println!("\nResumes at {}", format_time(position).cyan().bold());
            }
        }
        Command::MarkPlayed {
            rss_url,
            episode_url,
        } => {
            let episode = find_episode(&manager, &rss_url, &episode_url).await?;
            manager.mark_played(&episode, true).await.settled().await;
            println!("{SUCCESS}Marked {} as played", episode.title.bold());
        }
        Command::MarkUnplayed {
            rss_url,
            episode_url,
        } => {
            let episode = find_episode(&manager, &rss_url, &episode_url).await?;
            manager.mark_played(&episode, false).await.settled().await;
            println!("{SUCCESS}Marked {} as unplayed", episode.title.bold());
        }
        Command::Current => {
            show("current episode", manager.current_episode(), print_episode).await?
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    println!(
        "\n{}{} {}\n",
        MICROPHONE,
        "vocalia".bold().magenta(),
        "- Podcast Client".dimmed()
    );

    if args.offline {
        run(OfflineClient, args).await
    } else {
        run(ReqwestClient::new(), args).await
    }
}
