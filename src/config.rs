use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use std::io::Write;
use std::path::PathBuf;

/// Admin panel API client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Keycloak OpenID Connect base URL, e.g. https://host/keycloak/realms/admin-panel/protocol/openid-connect
    #[arg(long, env = "PANEL_AUTH_BASE_URL")]
    pub auth_base_url: Option<String>,

    /// Admin panel API base URL, e.g. https://host/admin-panel/api/v1
    #[arg(long, env = "PANEL_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// OAuth client id for the password grant
    #[arg(long, env = "PANEL_CLIENT_ID", default_value = "admin-panel")]
    pub client_id: String,

    /// OAuth client secret for the password grant
    #[arg(long, env = "PANEL_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// OAuth client id for the refresh grant (defaults to the login client id)
    #[arg(long, env = "PANEL_REFRESH_CLIENT_ID")]
    pub refresh_client_id: Option<String>,

    /// OAuth client secret for the refresh grant (defaults to the login client secret)
    #[arg(long, env = "PANEL_REFRESH_CLIENT_SECRET")]
    pub refresh_client_secret: Option<String>,

    /// OAuth scope requested at login
    #[arg(long, env = "PANEL_SCOPE", default_value = "openid")]
    pub scope: String,

    /// Path to the session SQLite database
    #[arg(short = 'd', long, env = "PANEL_DB_FILE")]
    pub db_file: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with operator credentials and store the session
    Login {
        /// Username (prompted when omitted)
        #[arg(long)]
        username: Option<String>,
    },
    /// Drop the stored session
    Logout,
    /// Show the stored session state
    Session,
    /// Customer lookup and registration
    Customer {
        #[command(subcommand)]
        command: CustomerCommand,
    },
    /// List transactions
    Transactions {
        /// Page number (zero-based)
        #[arg(long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(long, default_value = "10")]
        size: u32,

        /// Sort field
        #[arg(long, default_value = "id")]
        sort_by: String,

        /// Sort direction (asc, desc)
        #[arg(long, default_value = "desc")]
        direction: String,

        #[command(flatten)]
        filters: TransactionFilterArgs,
    },
    /// Manage transaction limits
    Limits {
        #[command(subcommand)]
        command: LimitsCommand,
    },
    /// Download a transactions report
    Report {
        /// File format (excel, pdf)
        #[arg(long, default_value = "excel")]
        format: String,

        /// Directory the report file is written to
        #[arg(short = 'o', long, default_value = ".")]
        out_dir: String,

        /// Start of the period (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        start_date: Option<String>,

        /// End of the period (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        end_date: Option<String>,

        #[command(flatten)]
        filters: TransactionFilterArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// Look up a customer by id
    Get { id: String },
    /// Register a customer with contact details
    Register {
        customer_id: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum LimitsCommand {
    /// List all transaction limits
    List,
    /// Show one limit
    Get { id: i64 },
    /// Create a limit
    Create {
        #[arg(long)]
        transaction_type_id: i64,

        #[arg(long)]
        name: String,

        #[arg(long)]
        amount_per_day: f64,

        #[arg(long)]
        amount_per_month: f64,

        /// Identification tier (full, online)
        #[arg(long, default_value = "full")]
        identification: String,
    },
    /// Update a limit
    Update {
        id: i64,

        #[arg(long)]
        transaction_type_id: i64,

        #[arg(long)]
        name: String,

        #[arg(long)]
        amount_per_day: f64,

        #[arg(long)]
        amount_per_month: f64,

        /// Identification tier (full, online)
        #[arg(long, default_value = "full")]
        identification: String,
    },
    /// Delete a limit
    Delete { id: i64 },
    /// List transaction types available for limits
    Types,
}

/// Transaction filters shared by the list and report commands
#[derive(Args, Debug, Default, Clone)]
pub struct TransactionFilterArgs {
    /// Filter by status
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by service name
    #[arg(long)]
    pub service_name: Option<String>,

    /// Filter by credit account
    #[arg(long)]
    pub credit_account: Option<String>,

    /// Filter by debit account
    #[arg(long)]
    pub debit_account: Option<String>,

    /// Filter by transaction type
    #[arg(long)]
    pub transaction_type: Option<String>,

    /// Filter by customer id
    #[arg(long)]
    pub customer_id: Option<String>,

    /// Filter by device id
    #[arg(long)]
    pub device_id: Option<String>,

    /// Filter by ABS id
    #[arg(long)]
    pub abs_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Backend endpoints
    pub auth_base_url: String,
    pub api_base_url: String,

    // OAuth clients
    pub client_id: String,
    pub client_secret: Option<String>,
    pub refresh_client_id: String,
    pub refresh_client_secret: Option<String>,
    pub scope: String,

    // Session storage
    pub db_file: PathBuf,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        // Parse CLI arguments
        let args = CliArgs::parse();

        // First run without configured endpoints drops into interactive setup
        if needs_interactive_setup(&args) {
            let interactive = run_interactive_setup()?;

            // Expose the collected values so from_args can pick them up
            std::env::set_var("PANEL_AUTH_BASE_URL", &interactive.auth_base_url);
            std::env::set_var("PANEL_API_BASE_URL", &interactive.api_base_url);
            if let Some(secret) = &interactive.client_secret {
                std::env::set_var("PANEL_CLIENT_SECRET", secret);
            }
        }

        let config = Self::from_args(&args)?;
        Ok((config, args.command))
    }

    /// Build config with priority handling
    fn from_args(args: &CliArgs) -> Result<Self> {
        let client_id = args.client_id.clone();
        let client_secret = args
            .client_secret
            .clone()
            .or_else(|| std::env::var("PANEL_CLIENT_SECRET").ok());

        Ok(Config {
            // Backend endpoints (CLI > ENV, required)
            auth_base_url: args
                .auth_base_url
                .clone()
                .or_else(|| std::env::var("PANEL_AUTH_BASE_URL").ok())
                .map(|url| url.trim_end_matches('/').to_string())
                .context(
                    "PANEL_AUTH_BASE_URL is required (use --auth-base-url or set PANEL_AUTH_BASE_URL env var)",
                )?,

            api_base_url: args
                .api_base_url
                .clone()
                .or_else(|| std::env::var("PANEL_API_BASE_URL").ok())
                .map(|url| url.trim_end_matches('/').to_string())
                .context(
                    "PANEL_API_BASE_URL is required (use --api-base-url or set PANEL_API_BASE_URL env var)",
                )?,

            // The refresh grant falls back to the login client
            refresh_client_id: args
                .refresh_client_id
                .clone()
                .or_else(|| std::env::var("PANEL_REFRESH_CLIENT_ID").ok())
                .unwrap_or_else(|| client_id.clone()),

            refresh_client_secret: args
                .refresh_client_secret
                .clone()
                .or_else(|| std::env::var("PANEL_REFRESH_CLIENT_SECRET").ok())
                .or_else(|| client_secret.clone()),

            client_id,
            client_secret,
            scope: args.scope.clone(),

            // Session storage
            db_file: args
                .db_file
                .as_deref()
                .map(expand_tilde)
                .or_else(|| {
                    std::env::var("PANEL_DB_FILE")
                        .ok()
                        .map(|s| expand_tilde(&s))
                })
                .unwrap_or_else(default_db_file),

            // HTTP client
            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: args.http_timeout,

            log_level: args.log_level.clone(),
        })
    }

    /// Token endpoint under the OpenID Connect base
    pub fn token_url(&self) -> String {
        format!("{}/token", self.auth_base_url)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("PANEL_AUTH_BASE_URL", &self.auth_base_url),
            ("PANEL_API_BASE_URL", &self.api_base_url),
        ] {
            let url = reqwest::Url::parse(value)
                .with_context(|| format!("{name} is not a valid URL: {value}"))?;

            if url.scheme() != "http" && url.scheme() != "https" {
                anyhow::bail!("{name} must be an http(s) URL: {value}");
            }
        }

        Ok(())
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Default location for the session database
fn default_db_file() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("panel-client").join("session.sqlite3"))
        .unwrap_or_else(|| PathBuf::from("panel-client.sqlite3"))
}

// === Interactive Setup ===

/// Check if interactive setup is needed (no .env file and missing endpoints)
fn needs_interactive_setup(args: &CliArgs) -> bool {
    let env_file_exists = std::path::Path::new(".env").exists();

    let has_auth_url =
        args.auth_base_url.is_some() || std::env::var("PANEL_AUTH_BASE_URL").is_ok();
    let has_api_url = args.api_base_url.is_some() || std::env::var("PANEL_API_BASE_URL").is_ok();

    !env_file_exists && (!has_auth_url || !has_api_url)
}

/// Run interactive setup to collect the backend endpoints
fn run_interactive_setup() -> Result<InteractiveConfig> {
    println!();
    println!("No configuration found. Let's point the client at your panel backend.");
    println!();

    let auth_base_url: String = Input::new()
        .with_prompt("Keycloak OpenID Connect base URL (PANEL_AUTH_BASE_URL)")
        .interact_text()
        .context("Failed to read PANEL_AUTH_BASE_URL")?;

    let api_base_url: String = Input::new()
        .with_prompt("Admin panel API base URL (PANEL_API_BASE_URL)")
        .interact_text()
        .context("Failed to read PANEL_API_BASE_URL")?;

    let client_secret: String = Password::new()
        .with_prompt("OAuth client secret (PANEL_CLIENT_SECRET, leave empty for a public client)")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read PANEL_CLIENT_SECRET")?;

    let config = InteractiveConfig {
        auth_base_url,
        api_base_url,
        client_secret: if client_secret.is_empty() {
            None
        } else {
            Some(client_secret)
        },
    };

    println!();
    let save_to_env = Confirm::new()
        .with_prompt("Save configuration to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(&config)?;
        println!();
        println!("✅ Configuration saved to .env file");
    }

    println!();
    Ok(config)
}

/// Configuration collected from interactive setup
#[derive(Debug, Clone)]
struct InteractiveConfig {
    auth_base_url: String,
    api_base_url: String,
    client_secret: Option<String>,
}

/// Save configuration to .env file
fn save_env_file(config: &InteractiveConfig) -> Result<()> {
    let secret_line = match &config.client_secret {
        Some(secret) => format!("PANEL_CLIENT_SECRET={secret}\n"),
        None => String::new(),
    };

    let env_content = format!(
        r#"# Admin panel client configuration
# Generated by interactive setup

# Keycloak OpenID Connect base URL (required)
PANEL_AUTH_BASE_URL={}

# Admin panel API base URL (required)
PANEL_API_BASE_URL={}

{}# OAuth client id for the password grant
PANEL_CLIENT_ID=admin-panel

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=info
"#,
        config.auth_base_url, config.api_base_url, secret_line,
    );

    let mut file = std::fs::File::create(".env").context("Failed to create .env file")?;
    file.write_all(env_content.as_bytes())
        .context("Failed to write .env file")?;

    Ok(())
}
