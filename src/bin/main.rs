use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use mastokit::{
    Client, ClientConfig, MediaAttachment, NotificationsQuery, PublishStatus, Response, Status,
    TimelineQuery, UploadMedia, Visibility,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mastokit")]
#[command(about = "Talk to a Mastodon-protocol server from the command line")]
#[command(version)]
struct Cli {
    /// Instance domain or URL
    #[arg(short, long, env = "MASTODON_INSTANCE")]
    instance: String,

    /// OAuth access token
    #[arg(short, long, env = "MASTODON_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy)]
enum VisibilityArg {
    Public,
    Unlisted,
    Private,
    Direct,
}

impl From<VisibilityArg> for Visibility {
    fn from(v: VisibilityArg) -> Self {
        match v {
            VisibilityArg::Public => Visibility::Public,
            VisibilityArg::Unlisted => Visibility::Unlisted,
            VisibilityArg::Private => Visibility::Private,
            VisibilityArg::Direct => Visibility::Direct,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the authenticated account
    Whoami,
    /// Read a timeline
    Timeline {
        /// Read the public timeline instead of home
        #[arg(long)]
        public: bool,
        /// Statuses per page
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Number of pages to follow
        #[arg(short, long, default_value = "1")]
        pages: usize,
        /// Start below this status id
        #[arg(long)]
        max_id: Option<String>,
    },
    /// List notifications
    Notifications {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Publish a status
    Post {
        /// Status text
        status: String,
        #[arg(long, default_value = "public")]
        visibility: VisibilityArg,
        /// Content warning
        #[arg(long)]
        spoiler: Option<String>,
        /// Files to attach
        #[arg(short, long)]
        media: Vec<PathBuf>,
    },
    /// Upload a media file
    Upload {
        path: PathBuf,
        /// Alt text
        #[arg(short, long)]
        description: Option<String>,
    },
}

fn print_statuses(format: OutputFormat, page: &Response<Vec<Status>>) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page.value())?),
        OutputFormat::Text => {
            for status in page.value() {
                println!(
                    "{} {} {}",
                    status.id.dimmed(),
                    format!("@{}", status.account.acct).cyan().bold(),
                    status.created_at.dimmed()
                );
                if !status.spoiler_text.is_empty() {
                    println!("  {} {}", "CW:".yellow(), status.spoiler_text);
                }
                println!("  {}", status.content);
                for attachment in &status.media_attachments {
                    println!("  {} {}", "[media]".magenta(), attachment.url.as_deref().unwrap_or(""));
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(&cli.instance)?.timeout(Duration::from_secs(cli.timeout));
    if let Some(token) = &cli.token {
        config = config.access_token(token.clone());
    }
    let client = Client::new(config)?;

    match cli.command {
        Commands::Whoami => {
            let account = client.verify_credentials().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(account.value())?),
                OutputFormat::Text => {
                    let account = account.value();
                    println!("{} ({})", account.display_name.bold(), account.acct.cyan());
                    println!(
                        "{} statuses, {} following, {} followers",
                        account.statuses_count, account.following_count, account.followers_count
                    );
                }
            }
        }
        Commands::Timeline {
            public,
            limit,
            pages,
            max_id,
        } => {
            let mut query = TimelineQuery::new().limit(limit);
            if let Some(max_id) = max_id {
                query = query.max_id(max_id);
            }
            let mut page = if public {
                client.public_timeline(&query).await?
            } else {
                client.home_timeline(&query).await?
            };
            print_statuses(cli.format, &page)?;
            for _ in 1..pages {
                match client.next_page(&page).await? {
                    Some(next) => {
                        page = next;
                        print_statuses(cli.format, &page)?;
                    }
                    None => break,
                }
            }
            if let Some(rate_limit) = page.rate_limit() {
                tracing::info!(
                    remaining = ?rate_limit.remaining,
                    limit = ?rate_limit.limit,
                    "rate limit"
                );
            }
        }
        Commands::Notifications { limit } => {
            let notifications = client
                .notifications(&NotificationsQuery::new().limit(limit))
                .await?;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(notifications.value())?)
                }
                OutputFormat::Text => {
                    for notification in notifications.value() {
                        println!(
                            "{} {} {}",
                            notification.id.dimmed(),
                            notification.kind.as_str().yellow(),
                            format!("@{}", notification.account.acct).cyan()
                        );
                    }
                }
            }
        }
        Commands::Post {
            status,
            visibility,
            spoiler,
            media,
        } => {
            let mut publish = PublishStatus::new(status).visibility(visibility.into());
            if let Some(spoiler) = spoiler {
                publish = publish.spoiler(spoiler);
            }
            for path in media {
                let attachment = client
                    .upload_media(&UploadMedia::new(MediaAttachment::File(path.clone())))
                    .await
                    .with_context(|| format!("uploading {}", path.display()))?;
                publish = publish.media_id(attachment.into_value().id);
            }
            let posted = client.publish_status(&publish).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(posted.value())?),
                OutputFormat::Text => println!(
                    "{} {}",
                    "Posted".green(),
                    posted.value().url.as_deref().unwrap_or(&posted.value().id)
                ),
            }
        }
        Commands::Upload { path, description } => {
            let mut upload = UploadMedia::new(MediaAttachment::File(path.clone()));
            if let Some(description) = description {
                upload = upload.description(description);
            }
            let attachment = client
                .upload_media(&upload)
                .await
                .with_context(|| format!("uploading {}", path.display()))?;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(attachment.value())?)
                }
                OutputFormat::Text => println!(
                    "{} {} ({})",
                    "Uploaded".green(),
                    attachment.value().id,
                    attachment.value().kind
                ),
            }
        }
    }

    Ok(())
}
