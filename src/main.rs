use clap::{Parser, Subcommand};
use newsdesk_console::charts::{self, ActivitySeries};
use newsdesk_console::models::{BroadcastDraft, PublishAction, Scope, TicketStatus};
use newsdesk_console::format::local_time;
use newsdesk_console::ui::{audience_text, render_alerts, render_badge};
use newsdesk_console::{Console, ConsoleConfig, HttpRemote, ToggleOutcome};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "newsdesk", about = "Drive the newsroom dashboard from the terminal")]
struct Cli {
    /// Dashboard server, overrides NEWSDESK_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Print alerts and badges as dashboard markup.
    #[arg(long, global = true)]
    html: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mark or unmark an article as breaking news.
    Breaking {
        article_id: String,
        #[arg(long)]
        off: bool,
        #[arg(long)]
        staff: bool,
    },
    /// Change a support ticket's status.
    TicketStatus {
        ticket_id: String,
        status: String,
        /// Status the ticket currently shows.
        #[arg(long, default_value = "open")]
        from: String,
    },
    /// How many users a broadcast to a country would reach.
    AudienceCount {
        #[arg(default_value = "all")]
        country: String,
    },
    Broadcast {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        #[arg(long, default_value = "all")]
        countries: String,
    },
    /// Reply to a support ticket.
    Respond { ticket_id: String, message: String },
    Translate { article_id: String },
    Publish {
        article_id: String,
        title: String,
        #[arg(long)]
        unpublish: bool,
        #[arg(long)]
        yes: bool,
    },
    /// Activate or deactivate a user account.
    UserStatus {
        user_id: String,
        username: String,
        /// The account is currently active and will be deactivated.
        #[arg(long)]
        active: bool,
        #[arg(long)]
        yes: bool,
    },
    FetchNews,
    /// Print the search page URL for a query.
    Search { query: String },
    /// Local time in each country's dashboard zone.
    LocalTime {
        #[arg(default_values = ["IN", "PK", "US", "SA", "LK"])]
        countries: Vec<String>,
    },
    /// Print the dashboard chart configurations as JSON.
    Charts,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConsoleConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    info!(base_url = %config.base_url, "using dashboard");
    let remote = Arc::new(HttpRemote::new(&config.base_url, &config.csrf_token));
    let console = Console::new(remote, config.controller);

    let base_url = config.base_url.trim_end_matches('/');
    let ok = run(&console, base_url, cli.command, cli.html).await;

    let alerts = console.alerts().snapshot();
    if cli.html {
        if !alerts.is_empty() {
            println!("{}", render_alerts(&alerts));
        }
    } else {
        for alert in alerts {
            println!("[{}] {}", alert.level.as_str(), alert.message);
        }
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run(console: &Console<HttpRemote>, base_url: &str, command: Command, html: bool) -> bool {
    match command {
        Command::Breaking {
            article_id,
            off,
            staff,
        } => {
            let scope = if staff { Scope::Staff } else { Scope::Admin };
            let outcome = console.toggle_breaking(scope, &article_id, !off).await;
            confirmed(outcome)
        }
        Command::TicketStatus {
            ticket_id,
            status,
            from,
        } => {
            let (Some(status), Some(from)) = (TicketStatus::parse(&status), TicketStatus::parse(&from))
            else {
                eprintln!("unknown status; expected open, in_progress, resolved or closed");
                return false;
            };
            let key = match console.show_ticket(&ticket_id, from) {
                Ok(key) => key,
                Err(err) => return report::<()>(Err(err)),
            };
            let ok = confirmed(console.update_ticket_status(&ticket_id, status).await);
            if let Some(badge) = console.controller().badge(&key) {
                if html {
                    println!("{}", render_badge(&badge));
                } else {
                    println!("{}", badge.label);
                }
            }
            ok
        }
        Command::AudienceCount { country } => match console.audience_count(&country).await {
            Ok(count) => {
                println!("{}", audience_text(count));
                true
            }
            Err(_) => false,
        },
        Command::Broadcast {
            title,
            message,
            countries,
        } => {
            let draft = BroadcastDraft {
                title,
                message,
                countries,
            };
            report(console.submit_broadcast(&draft).await)
        }
        Command::Respond { ticket_id, message } => {
            report(console.submit_ticket_response(&ticket_id, &message).await)
        }
        Command::Translate { article_id } => {
            matches!(console.translate_article(&article_id).await, Ok(true))
        }
        Command::Publish {
            article_id,
            title,
            unpublish,
            yes,
        } => {
            let action = if unpublish {
                PublishAction::Unpublish
            } else {
                PublishAction::Publish
            };
            let submitted = console
                .publish_article(&article_id, action, &title, |prompt| yes || ask(prompt))
                .await;
            report(submitted.map(|_| ()))
        }
        Command::UserStatus {
            user_id,
            username,
            active,
            yes,
        } => {
            let submitted = console
                .toggle_user_status(&user_id, &username, active, |prompt| yes || ask(prompt))
                .await;
            report(submitted.map(|_| ()))
        }
        Command::FetchNews => report(console.fetch_news().await),
        Command::Search { query } => match console.search_path(&query) {
            Ok(path) => {
                println!("{base_url}{path}");
                true
            }
            Err(err) => report::<()>(Err(err)),
        },
        Command::LocalTime { countries } => {
            let now = chrono::Utc::now();
            for country in countries {
                println!("{country} {}", local_time(&country, now));
            }
            true
        }
        Command::Charts => {
            let configs = [
                charts::users_by_country(None, None),
                charts::articles_by_category(None, None),
                charts::activity_timeline(ActivitySeries::default()),
            ];
            match serde_json::to_string_pretty(&configs) {
                Ok(json) => {
                    println!("{json}");
                    true
                }
                Err(err) => {
                    eprintln!("{err}");
                    false
                }
            }
        }
    }
}

fn confirmed(outcome: Result<ToggleOutcome, newsdesk_console::ConsoleError>) -> bool {
    match outcome {
        Ok(ToggleOutcome::Confirmed) => true,
        Ok(other) => {
            eprintln!("change not applied: {other:?}");
            false
        }
        Err(err) => report::<()>(Err(err)),
    }
}

fn report<T>(result: Result<T, newsdesk_console::ConsoleError>) -> bool {
    match result {
        Ok(_) => true,
        Err(err) => {
            eprintln!("{err}");
            false
        }
    }
}

fn ask(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
