//! elektiv - command-line client for the elective subjects platform.

use anyhow::Context;
use clap::{Parser, Subcommand};
use elektiv_core::{init_logging, Config, Paths};
use elektiv_gateway::ApiGateway;
use elektiv_session::{SessionEvent, SessionManager};
use elektiv_storage::{FileStorage, SessionVault};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "elektiv", version, about = "Client for the elective subjects platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and credentials (default: ~/.elektiv)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with your email; the password is read from stdin
    Login { email: String },
    /// Log out and clear stored credentials
    Logout,
    /// Show the current session status
    Status,
    /// Show the logged-in user
    Whoami,
    /// List the subject catalog
    Subjects {
        /// Only show subjects of a season ("W" or "S")
        #[arg(long)]
        season: Option<String>,
    },
    /// Show recommended subjects for the logged-in student
    Recommendations,
    /// Show reviews for a subject by its code
    Reviews { code: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir.clone() {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new().context("could not determine home directory")?,
    };
    let config = Config::load(&paths).context("failed to load configuration")?;
    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(log_level);
    debug!(api_url = %config.api_url, base_dir = %paths.base_dir().display(), "Starting");

    paths.ensure_dirs()?;
    let storage = FileStorage::open(paths.credentials_file())
        .context("failed to open credential storage")?;
    let vault = SessionVault::new(Box::new(storage));
    let session = Arc::new(SessionManager::new(vault, &config.api_url));
    session.set_event_callback(Box::new(|event| {
        if let SessionEvent::SessionExpired = event {
            eprintln!("Session expired, you have been logged out.");
        }
    }));
    let gateway = ApiGateway::new(Arc::clone(&session), &config.api_url);

    match cli.command {
        Commands::Login { email } => {
            let password = prompt_password()?;
            let profile = session.login(&email, &password).await?;
            println!("Logged in as {} ({})", profile.full_name, profile.user_type);
        }
        Commands::Logout => {
            session.logout().await?;
            println!("Logged out.");
        }
        Commands::Status => {
            let restored = session.initialize().await?;
            if restored {
                let user = session.current_user();
                let name = user.map(|u| u.full_name).unwrap_or_default();
                println!("Logged in as {name}.");
            } else {
                println!("Not logged in.");
            }
        }
        Commands::Whoami => {
            if !session.initialize().await? {
                anyhow::bail!("not logged in");
            }
            let user = session.current_user().context("no user profile cached")?;
            println!("{} ({})", user.full_name, user.user_type);
            if let Some(index) = user.index {
                println!("Index: {index}");
            }
        }
        Commands::Subjects { season } => {
            let mut subjects = gateway.subjects().await?;
            if let Some(season) = season {
                subjects.retain(|s| s.subject_info.season.eq_ignore_ascii_case(&season));
            }
            for subject in subjects {
                println!(
                    "{:<8} {} (L{}, {})",
                    subject.code, subject.name, subject.subject_info.level, subject.subject_info.season
                );
            }
        }
        Commands::Recommendations => {
            if !session.initialize().await? {
                anyhow::bail!("not logged in");
            }
            for subject in gateway.recommendations().await? {
                println!("{:<8} {}", subject.code, subject.name);
            }
        }
        Commands::Reviews { code } => {
            if !session.initialize().await? {
                anyhow::bail!("not logged in");
            }
            let reviews = gateway.reviews_for_subject(&code).await?;
            if reviews.is_empty() {
                println!("No reviews for {code}.");
            }
            for review in reviews {
                println!("[{:+}] {}", review.votes, review.text);
            }
        }
    }

    Ok(())
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}
