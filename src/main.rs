use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::validator::Validation;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roombook::auth::{issue_token, register_user};
use roombook::clock::SystemClock;
use roombook::config::ServerConfig;
use roombook::palette::DefaultPalette;
use roombook::server::{AppState, create_router};
use roombook::store::{SqliteStore, Store};
use roombook::types::Role;

const DEFAULT_ADMIN_NAME: &str = "Administrator";
const DEFAULT_ADMIN_EMAIL: &str = "admin@roombook.local";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "roombook")]
#[command(about = "A room booking server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Offset from UTC, in minutes, that decides what "today" is
        #[arg(long, allow_hyphen_values = true)]
        utc_offset_minutes: Option<i32>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, admin user and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Admin display name
        #[arg(long)]
        name: Option<String>,

        /// Admin email
        #[arg(long)]
        email: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print their token
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// Give the user the admin role
        #[arg(long)]
        admin: bool,
    },
}

fn print_token_banner(heading: &str, raw_token: &str) {
    println!();
    println!("========================================");
    println!("{heading}");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();
}

fn open_initialized_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    let db_path = data_dir.join("roombook.db");
    if !db_path.exists() {
        bail!("Server not initialized. Run 'roombook admin init' first to create the database.");
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    if !store.has_admin_user()? {
        bail!("Server not initialized. Run 'roombook admin init' first to create an admin user.");
    }
    Ok(store)
}

fn run_init(
    data_dir: PathBuf,
    name: Option<String>,
    email: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let config = ServerConfig {
        data_dir,
        ..Default::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.admin_token_path();

    if store.has_admin_user()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (name, email) = if non_interactive {
        (
            name.unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
            email.unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
        )
    } else {
        let name = match name {
            Some(name) => name,
            None => inquire::Text::new("Admin name:")
                .with_default(DEFAULT_ADMIN_NAME)
                .prompt()?,
        };
        let email = match email {
            Some(email) => email,
            None => inquire::Text::new("Admin email:")
                .with_default(DEFAULT_ADMIN_EMAIL)
                .prompt()?,
        };
        (name, email)
    };

    let admin = register_user(&store, &name, &email, Role::Admin)?;
    let (_, raw_token) = issue_token(&store, &admin.id, None)?;

    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    print_token_banner(
        "Admin token (save this, it won't be shown again):",
        &raw_token,
    );
    println!("Token also written to: {}", token_file.display());

    if !non_interactive {
        create_default_user_prompt(&store)?;
    }

    Ok(())
}

fn not_blank(input: &str) -> Result<Validation, inquire::CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid("Value cannot be empty".into()))
    } else {
        Ok(Validation::Valid)
    }
}

fn create_default_user_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a regular user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let name = inquire::Text::new("Name:")
        .with_validator(not_blank)
        .prompt()?;
    let email = inquire::Text::new("Email:")
        .with_validator(not_blank)
        .prompt()?;

    run_create_user(store, &name, &email, Role::User)
}

fn run_create_user(store: &SqliteStore, name: &str, email: &str, role: Role) -> anyhow::Result<()> {
    let user = register_user(store, name, email, role)
        .with_context(|| format!("Failed to create user '{email}'"))?;
    let (_, raw_token) = issue_token(store, &user.id, None)?;

    print_token_banner(
        &format!("Created {} '{}' with token:", user.role, user.email),
        &raw_token,
    );
    Ok(())
}

fn load_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    utc_offset_minutes: Option<i32>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match config {
        Some(path) => ServerConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(offset) = utc_offset_minutes {
        config.utc_offset_minutes = offset;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("roombook=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                name,
                email,
                non_interactive,
            } => {
                run_init(data_dir, name, email, non_interactive)?;
            }
            AdminCommands::User { command } => match command {
                UserCommands::Create {
                    data_dir,
                    name,
                    email,
                    admin,
                } => {
                    let store = open_initialized_store(&data_dir)?;
                    let role = if admin { Role::Admin } else { Role::User };
                    run_create_user(&store, &name, &email, role)?;
                }
            },
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            utc_offset_minutes,
        } => {
            let config = load_config(config, host, port, data_dir, utc_offset_minutes)?;
            let offset = config.utc_offset()?;

            let store = open_initialized_store(&config.data_dir)?;

            let token_file = config.admin_token_path();
            if token_file.exists() {
                info!("Admin token available at {}", token_file.display());
            }

            let state = Arc::new(AppState::new(
                Arc::new(store),
                Arc::new(SystemClock::new(offset)),
                Arc::new(DefaultPalette),
            ));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {} (UTC offset {})", addr, offset);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
