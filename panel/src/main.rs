use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use panel::api::{AppState, app_router};
use panel::auth::{Auth, NewUser};
use panel::config::{Config, redact_db_url};
use panel::entity::user::{ROLE_ADMIN, ROLE_USER};
use panel::gateway::HttpGateway;
use sea_orm::Database;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "panel", about = "Panel - admin backend for WhatsApp AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default)
    Serve,
    /// Manage panel users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, action = clap::ArgAction::SetTrue)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env first so RUST_LOG from it is honored
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    tracing::info!(database = %redact_db_url(&config.database_url), "connecting to database");

    let db = Database::connect(&config.database_url).await?;
    Migrator::up(&db, None).await?;

    tracing::info!("database initialized");

    let auth = Arc::new(Auth::new(db.clone()));

    match cli.command {
        None | Some(Commands::Serve) => serve(config, auth, db).await?,
        Some(Commands::User { action }) => {
            handle_user_action(&auth, action, config.default_token_limit).await?
        }
    }

    Ok(())
}

async fn serve(
    config: Config,
    auth: Arc<Auth>,
    db: sea_orm::DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    // Auto-seed an admin if no users exist
    if auth.count_users().await? == 0 {
        let username = std::env::var("PANEL_ADMIN_USER").unwrap_or_else(|_| "admin".to_string());
        let email = std::env::var("PANEL_ADMIN_EMAIL")
            .unwrap_or_else(|_| format!("{username}@localhost"));
        let password = match std::env::var("PANEL_ADMIN_PASSWORD") {
            Ok(p) if !p.is_empty() => p,
            _ => {
                tracing::error!(
                    "PANEL_ADMIN_PASSWORD is not set. \
                     Set it to a strong password before the first start."
                );
                std::process::exit(1);
            }
        };

        tracing::warn!(username = %username, "No users found, seeding default admin.");
        auth.create_user(NewUser {
            username: &username,
            email: &email,
            password: &password,
            role: ROLE_ADMIN,
            ai_token_limit: config.default_token_limit,
        })
        .await?;
    }

    let gateway = HttpGateway::new(&config.gateway)?;
    tracing::info!(gateway = %config.gateway.base_url, "payment gateway configured");

    let state = AppState {
        auth,
        db,
        gateway: Arc::new(gateway),
        jwt_secret: config.jwt_secret,
        jwt_expiry_hours: config.jwt_expiry_hours,
        webhook_secret: config.webhook_secret,
        price_per_1k_tokens: config.price_per_1k_tokens,
        default_token_limit: config.default_token_limit,
        subscription_days: config.subscription_days,
    };

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Panel API online");

    axum::serve(listener, app_router(state, &config.cors_allowed_origins)).await?;
    Ok(())
}

async fn handle_user_action(
    auth: &Auth,
    action: UserAction,
    default_token_limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Create {
            username,
            email,
            password,
            admin,
        } => {
            let created = auth
                .create_user(NewUser {
                    username: &username,
                    email: &email,
                    password: &password,
                    role: if admin { ROLE_ADMIN } else { ROLE_USER },
                    ai_token_limit: default_token_limit,
                })
                .await?;
            tracing::info!(user_id = %created.id, username = %username, is_admin = admin, "Created user");
        }
    }
    Ok(())
}
