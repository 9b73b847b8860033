//! `carehub` -- terminal front end for the CareHub admin API.
//!
//! Signs in, pages through collections, edits nested forms and uploads
//! files. The session is persisted between runs in a JSON file.
//!
//! # Environment variables
//!
//! | Variable                       | Default                     | Description                         |
//! |--------------------------------|-----------------------------|-------------------------------------|
//! | `CAREHUB_API_URL`              | `http://localhost:5000/api` | Base URL of the REST API            |
//! | `CAREHUB_REQUEST_TIMEOUT_SECS` | `30`                        | Per-request timeout                 |
//! | `CAREHUB_IDLE_TIMEOUT_SECS`    | `1800`                      | Idle logout while browsing          |
//! | `CAREHUB_SESSION_FILE`         | `.carehub-session.json`     | Where the session is stored         |
//! | `CAREHUB_PASSWORD`             | --                          | Password for `login` when not given |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carehub_client::error::ClientError;
use carehub_client::fetcher::RestCollectionFetcher;
use carehub_client::form::{FileUpload, FormSession, ResourceStore};
use carehub_client::list::{ListController, ListStatus};
use carehub_client::session::{spawn_idle_watchdog, FileSessionStore, LogoutReason, SessionContext};
use carehub_client::{ApiClient, ClientConfig};
use carehub_console::edit::{self, FormEdits, FormKind};
use carehub_console::{browse, render};
use carehub_core::forms::FormController;
use carehub_core::query::{clamp_limit, clamp_page, MAX_PAGE_LIMIT};
use carehub_core::resources::Resource;
use carehub_core::routes::{guard, Route, RouteDecision};

#[derive(Parser)]
#[command(name = "carehub")]
#[command(about = "CareHub admin console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        email: String,
        /// Falls back to CAREHUB_PASSWORD, then a prompt
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and delete the stored session
    Logout,
    /// Show the signed-in user and their profile
    Whoami,
    /// Print one page of a collection
    List {
        resource: Resource,
        #[arg(long)]
        page: Option<u32>,
        /// Rows per page; defaults to the screen's own page size
        #[arg(long)]
        limit: Option<u32>,
        /// Filter as key=value (repeatable)
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,
    },
    /// Page through a collection interactively
    Browse { resource: Resource },
    /// Print a single record
    Show { resource: Resource, id: String },
    /// Upload a file and print its URL
    Upload { path: PathBuf },
    /// Create or edit a nested form record
    Form {
        kind: FormKind,
        /// Record to edit; omit to create a new one
        #[arg(long)]
        id: Option<String>,
        /// Add a row to a list (repeatable)
        #[arg(long)]
        add: Vec<String>,
        /// Set a field as path=value (repeatable)
        #[arg(long)]
        set: Vec<String>,
        /// Upload a file into list[index]=file (repeatable)
        #[arg(long)]
        attach: Vec<String>,
        /// Print the payload instead of saving it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Convert a client error into its user-facing message.
fn friendly(e: ClientError) -> anyhow::Error {
    anyhow!(e.user_message())
}

async fn require(route: Route, session: &SessionContext) -> anyhow::Result<()> {
    match guard(route, session.is_authenticated().await) {
        RouteDecision::Allow => Ok(()),
        RouteDecision::Redirect(Route::Login) => bail!("Not signed in. Run `carehub login` first."),
        RouteDecision::Redirect(_) => bail!("Already signed in. Run `carehub logout` first."),
    }
}

async fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines
        .next_line()
        .await?
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow!("No password given"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carehub_console=info,carehub_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    let store = FileSessionStore::new(&config.session_file);
    let session = Arc::new(
        SessionContext::restore(store)
            .with_context(|| format!("Failed to read {}", config.session_file.display()))?,
    );
    let api = Arc::new(ApiClient::new(&config, session.clone()).map_err(friendly)?);

    tracing::debug!(api_url = %config.api_url, "Console starting");

    match cli.command {
        Commands::Login { email, password } => {
            require(Route::Login, &session).await?;
            let password = match password.or_else(|| std::env::var("CAREHUB_PASSWORD").ok()) {
                Some(p) => p,
                None => prompt_password().await?,
            };
            api.login(&email, &password).await.map_err(friendly)?;
            let name = session
                .user()
                .await
                .and_then(|u| u.get("name").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(email);
            println!("Signed in as {name}.");
        }
        Commands::Logout => {
            if session.logout(LogoutReason::Manual).await? {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
        }
        Commands::Whoami => {
            require(Route::Profile, &session).await?;
            if let Some(user) = session.user().await {
                println!("{}", render::record(&user));
            }
            let profile = api.fetch_profile().await.map_err(friendly)?;
            println!("{}", render::record(&profile));
        }
        Commands::List {
            resource,
            page,
            limit,
            filters,
        } => {
            require(Route::List(resource), &session).await?;
            let page = clamp_page(page);
            let limit = clamp_limit(limit, resource.default_limit(), MAX_PAGE_LIMIT);
            let list = ListController::<Value>::new(
                Arc::new(RestCollectionFetcher::new(api.clone(), resource)),
                resource.filters(),
                limit,
            );

            if filters.is_empty() {
                list.mount().await;
            } else {
                for filter in &filters {
                    let (key, value) = filter
                        .split_once('=')
                        .ok_or_else(|| anyhow!("Expected key=value, got '{filter}'"))?;
                    list.set_draft_field(key, value).await?;
                }
                list.apply_filters().await;
            }
            if page > 1 && !list.go_to_page(page).await && list.snapshot().status != ListStatus::Error {
                bail!("Page {page} is not available");
            }

            let snap = list.snapshot();
            print!("{}", render::list(resource, &snap));
            if let Some(message) = snap.error {
                bail!(message);
            }
        }
        Commands::Browse { resource } => {
            require(Route::List(resource), &session).await?;
            let list = ListController::<Value>::for_resource(api.clone(), resource);
            let watchdog = spawn_idle_watchdog(session.clone(), config.idle_timeout());

            let input = BufReader::new(tokio::io::stdin());
            let result = browse::run(resource, &list, &session, input, &mut std::io::stdout()).await;
            watchdog.abort();
            result?;
        }
        Commands::Show { resource, id } => {
            require(Route::List(resource), &session).await?;
            let record: Value = api.get(resource.path(), &id).await.map_err(friendly)?;
            println!("{}", render::record(&record));
        }
        Commands::Upload { path } => {
            require(Route::Dashboard, &session).await?;
            let file = FileUpload::from_path(&path)
                .await
                .with_context(|| format!("Cannot read {}", path.display()))?;
            let url = api.upload(file).await.map_err(friendly)?;
            println!("{url}");
        }
        Commands::Form {
            kind,
            id,
            add,
            set,
            attach,
            dry_run,
        } => {
            require(Route::Dashboard, &session).await?;
            let today = chrono::Local::now().date_naive();
            let controller = match &id {
                Some(id) => {
                    let record: Value = api.get(kind.path(), id).await.map_err(friendly)?;
                    FormController::hydrate(kind.schema(), &record, today)?
                }
                None => FormController::new_record(kind.schema(), today),
            };
            let form = Arc::new(FormSession::new(
                controller,
                Arc::new(ResourceStore::new(api.clone(), kind.path())),
                api.clone(),
            ));

            let edits = FormEdits { add, set, attach };
            let failures = edit::apply(&form, &edits).await.map_err(friendly)?;
            for (slot, message) in &failures {
                eprintln!("Upload into {slot} failed: {message}");
            }

            if dry_run {
                let payload = form.read(|f| f.to_wire()).await;
                println!("{}", render::record(&payload));
                return Ok(());
            }
            let saved = form.submit().await.map_err(friendly)?;
            println!("{}", render::record(&saved));
        }
    }

    Ok(())
}
