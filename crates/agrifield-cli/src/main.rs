mod host;

use agrifield::modules::attendance::{PunchOutcome, SyncReport};
use agrifield::services::{AutoConfirm, FixedLocation, PunchPrompt};
use agrifield::{ClientState, Collaborators};
use agrifield_cache::{FileKeyStore, KeyStore, keys};
use agrifield_config::{ApiConfig, StorageConfig};
use agrifield_core::{Action, Module};
use agrifield_models::Coordinates;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::sync::Arc;

use host::{CoordinatesGuard, TerminalPrompt};

#[derive(Parser)]
#[command(name = "agrifield")]
#[command(about = "Agrifield CLI - permissions and attendance from the terminal", long_about = None)]
struct Cli {
    /// Bearer token to store before running the command
    #[arg(long, env = "AGRIFIELD_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Latitude used for punches
    #[arg(long, env = "AGRIFIELD_LATITUDE", global = true, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude used for punches
    #[arg(long, env = "AGRIFIELD_LONGITUDE", global = true, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load permissions and list enabled modules and allowed actions
    Permissions,
    /// Check a single module/action pair
    Check {
        /// Module name, e.g. FARMER
        module: String,
        /// Action name, e.g. create
        action: String,
    },
    /// Show today's attendance status
    Status,
    /// Punch in at the configured location
    PunchIn,
    /// Punch out of the active punch
    PunchOut,
    /// Clear the session and every stored key
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    agrifield_observability::init_tracing();

    let cli = Cli::parse();

    let storage = StorageConfig::from_env();
    let store: Arc<dyn KeyStore> = Arc::new(FileKeyStore::new(storage.dir, storage.namespace));
    if let Some(token) = cli.token.as_deref() {
        store
            .set(keys::AUTH_TOKEN, token)
            .await
            .context("Failed to store auth token")?;
    }

    let coordinates = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        (None, None) => None,
        _ => bail!("--lat and --lon must be given together"),
    };
    let prompt: Arc<dyn PunchPrompt> = if cli.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(TerminalPrompt)
    };
    let services = Collaborators {
        location: Arc::new(FixedLocation(coordinates)),
        guard: Arc::new(CoordinatesGuard {
            has_coordinates: coordinates.is_some(),
        }),
        prompt,
    };

    let state = ClientState::with_http(ApiConfig::from_env(), store, services)
        .context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Permissions => permissions(&state).await,
        Commands::Check { module, action } => check(&state, &module, &action).await,
        Commands::Status => {
            state.attendance.restore().await;
            print_report(&state.attendance.sync().await);
            Ok(())
        }
        Commands::PunchIn => {
            state.attendance.restore().await;
            state.attendance.sync().await;
            let outcome = state.attendance.request_punch_in().await?;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::PunchOut => {
            state.attendance.restore().await;
            state.attendance.sync().await;
            let outcome = state.attendance.request_punch_out().await?;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Logout => {
            state.logout().await;
            println!("✅ Signed out");
            Ok(())
        }
    }
}

async fn permissions(state: &ClientState) -> Result<()> {
    let auth = &state.authorization;
    let outcome = auth
        .load()
        .await
        .context("Session expired, sign in again")?;

    println!("Source: {} ({})", outcome.source.as_str(), auth.state());
    if let Some(profile) = auth.profile() {
        let name = profile
            .full_name
            .or(profile.username)
            .unwrap_or_else(|| "unknown".to_string());
        println!("User:   {}{}", name, if profile.is_admin { " (admin)" } else { "" });
    }

    for module in auth.enabled_modules() {
        let actions: Vec<String> = auth
            .allowed_actions(module)
            .into_iter()
            .map(|action| match auth.scope_for(module, action) {
                Some(scope) => format!("{}:{}", action, scope),
                None => action.to_string(),
            })
            .collect();
        println!("  {:<12} {}", module, actions.join(", "));
    }

    let features: Vec<String> = auth
        .visible_features()
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("Visible features: {}", features.join(", "));
    Ok(())
}

async fn check(state: &ClientState, module: &str, action: &str) -> Result<()> {
    let module: Module = module.parse()?;
    let action: Action = action.parse()?;

    state
        .authorization
        .load()
        .await
        .context("Session expired, sign in again")?;

    let auth = &state.authorization;
    if auth.has_permission(module, action) {
        let scope = auth
            .scope_for(module, action)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unscoped".to_string());
        let own = if auth.is_own_data_only(module, action) {
            ", own data only"
        } else {
            ""
        };
        println!("✅ {}.{} allowed ({}{})", module, action, scope, own);
    } else {
        println!("❌ {}.{} denied", module, action);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if !report.online {
        println!("⚠️  Server unreachable, showing last known state");
    }
    if let Some(name) = &report.display_name {
        println!("User:     {}", name);
    }
    println!("Punch:    {}", report.phase);

    let Some(status) = &report.status else {
        return;
    };
    if let Some(at) = status.punch_status.punch_in_at() {
        println!("In at:    {}", at.format("%H:%M UTC"));
    }
    if let Some(at) = status.punch_status.punch_out_at() {
        println!("Out at:   {}", at.format("%H:%M UTC"));
    }
    if let Some(hours) = &status.working_hours {
        println!("Worked:   {}", hours);
    }
    let visits = status.visit_summary;
    println!(
        "Visits:   {} farmer, {} dealer, {} total",
        visits.farmer_visits, visits.dealer_visits, visits.total_visits
    );
}

fn print_outcome(outcome: &PunchOutcome) {
    match outcome {
        PunchOutcome::Completed(report) => {
            println!("✅ Done");
            print_report(report);
        }
        PunchOutcome::Busy => println!("A punch request is already running"),
        PunchOutcome::NotAllowed(phase) => println!("Not allowed while {}", phase),
        PunchOutcome::DeviceRestricted(restriction) => println!("❌ {}", restriction),
        PunchOutcome::Declined => println!("Cancelled"),
        PunchOutcome::Deferred => println!("⚠️  Server unreachable, nothing was recorded"),
        PunchOutcome::Ignored => println!("⚠️  Server did not accept the session, nothing was recorded"),
        PunchOutcome::SessionEnded => println!("⚠️  Signed out while the request ran"),
    }
}
