//! beacon-cli: drive the support widget from a terminal.
//!
//! Each invocation is a page load: the bootstrap runs for `--org`, then the
//! subcommand acts on whichever screen it routed to. The contact session id
//! persists in the storage file between invocations.
//!
//! # Subcommands
//! - `show`                          bootstrap and print the current screen
//! - `auth --name <n> --email <e>`   submit the auth form
//! - `start`                         open a conversation from the selection screen
//! - `voice-replay <file>`           reduce a JSON-lines voice event log
//! - `status`                        show server health

use std::path::{Path, PathBuf};
use std::sync::Arc;

use beacon_widget::auth::{self, AuthForm};
use beacon_widget::screen::{render_current, View};
use beacon_widget::voice::{VoiceEvent, VoiceState};
use beacon_widget::{
    conversation, BootstrapController, BootstrapOutcome, FileStorage, HttpWidgetBackend, Screen,
    SessionStore, WidgetConfig, WidgetError,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const DEFAULT_STORAGE: &str = ".beacon/widget.json";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "beacon-cli", version, about = "Beacon support widget, in a terminal")]
struct Cli {
    /// Beacon HTTP server URL
    #[arg(long, env = "BEACON_SERVER_URL", default_value = DEFAULT_SERVER, global = true)]
    server: String,

    /// File holding persisted contact sessions
    #[arg(long, env = "BEACON_WIDGET_STORAGE", default_value = DEFAULT_STORAGE, global = true)]
    storage: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct OrgArgs {
    /// Organization the widget is embedded for
    #[arg(long, env = "BEACON_ORGANIZATION_ID")]
    org: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bootstrap and print the screen it lands on
    Show {
        #[command(flatten)]
        org: OrgArgs,
    },

    /// Submit the auth form
    Auth {
        #[command(flatten)]
        org: OrgArgs,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,
    },

    /// Start a conversation
    Start {
        #[command(flatten)]
        org: OrgArgs,
    },

    /// Replay recorded voice events and print the resulting call state
    VoiceReplay {
        /// JSON-lines file, one event per line
        file: PathBuf,
    },

    /// Show Beacon server status
    Status,
}

// ============================================================================
// Commands
// ============================================================================

fn open_widget(
    config: &WidgetConfig,
) -> anyhow::Result<(BootstrapController, Arc<HttpWidgetBackend>)> {
    let backend = Arc::new(HttpWidgetBackend::new(&config.server_url)?);
    let storage = FileStorage::new(config.storage_path.clone());
    let store = Arc::new(SessionStore::new(Arc::new(storage)));
    Ok((BootstrapController::new(backend.clone(), store), backend))
}

fn print_view(view: &View) {
    println!("[{}] {}", view.screen, view.title);
    for line in &view.lines {
        println!("  {}", line);
    }
}

async fn bootstrap(ctl: &BootstrapController, org: OrgArgs) -> Screen {
    match ctl.run(org.org).await {
        BootstrapOutcome::Routed(screen) => screen,
        BootstrapOutcome::Superseded => ctl.store().screen(),
    }
}

async fn do_show(config: &WidgetConfig, org: OrgArgs) -> anyhow::Result<()> {
    let (ctl, _) = open_widget(config)?;
    bootstrap(&ctl, org).await;
    print_view(&render_current(ctl.store()));
    Ok(())
}

async fn do_auth(
    config: &WidgetConfig,
    org: OrgArgs,
    name: String,
    email: String,
) -> anyhow::Result<()> {
    let (ctl, backend) = open_widget(config)?;
    if bootstrap(&ctl, org).await != Screen::Auth {
        print_view(&render_current(ctl.store()));
        return Ok(());
    }

    let form = AuthForm::new(name, email);
    match auth::submit(backend.as_ref(), ctl.store(), &form, auth::detect_metadata()).await {
        Ok(id) => {
            println!("Contact session: {}", id);
            print_view(&render_current(ctl.store()));
            Ok(())
        }
        Err(WidgetError::InvalidForm(errors)) => {
            for error in &errors.0 {
                eprintln!("beacon-cli: {:?}: {}", error.field, error.message);
            }
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

async fn do_start(config: &WidgetConfig, org: OrgArgs) -> anyhow::Result<()> {
    let (ctl, backend) = open_widget(config)?;
    if bootstrap(&ctl, org).await != Screen::Selection {
        print_view(&render_current(ctl.store()));
        return Ok(());
    }

    let result = conversation::start(backend.as_ref(), ctl.store()).await;
    if let Ok(id) = &result {
        println!("Conversation: {}", id);
        if let Ok(view) = conversation::current(backend.as_ref(), ctl.store()).await {
            println!("Status: {}  Thread: {}", view.status, view.thread_id);
        }
    }
    print_view(&render_current(ctl.store()));
    result.map(|_| ()).map_err(Into::into)
}

fn do_voice_replay(file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let mut state = VoiceState::default();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<VoiceEvent>(line) {
            Ok(event) => state.apply(event),
            Err(e) => tracing::warn!(line = n + 1, error = %e, "Skipping unreadable voice event"),
        }
    }
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    match client.get(&url).send().await {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().await.unwrap_or_default();
            println!("Beacon server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:         {}", body["store"].as_str().unwrap_or("?"));
            println!("Socket:        {}", body["socket"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("beacon-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("beacon-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = WidgetConfig {
        server_url: cli.server.trim_end_matches('/').to_string(),
        storage_path: cli.storage,
    };

    let result = match cli.command {
        Commands::Show { org } => do_show(&config, org).await,
        Commands::Auth { org, name, email } => do_auth(&config, org, name, email).await,
        Commands::Start { org } => do_start(&config, org).await,
        Commands::VoiceReplay { file } => do_voice_replay(&file),
        Commands::Status => do_status(&config.server_url).await,
    };

    if let Err(e) = result {
        eprintln!("beacon-cli: {}", e);
        std::process::exit(1);
    }
}
