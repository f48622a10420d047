use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use std::path::Path;

mod api;
mod auth;
mod config;
mod error;
mod http_client;

use api::{
    CreateLimitPayload, PanelApi, RegisterCustomerPayload, ReportFormat, ReportQuery,
    TransactionFilter, TransactionQuery,
};
use config::{Command, CustomerCommand, LimitsCommand, TransactionFilterArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = config::Config::load()?;
    config.validate()?;

    // Initialize logging with the configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("Session database: {}", config.db_file.display());

    let api = PanelApi::new(config)?;

    match command {
        Command::Login { username } => run_login(&api, username).await?,
        Command::Logout => {
            api.logout().await;
            println!("✅ Session cleared");
        }
        Command::Session => run_session(&api).await,
        Command::Customer { command } => run_customer(&api, command).await?,
        Command::Transactions {
            page,
            size,
            sort_by,
            direction,
            filters,
        } => run_transactions(&api, page, size, sort_by, &direction, filters).await?,
        Command::Limits { command } => run_limits(&api, command).await?,
        Command::Report {
            format,
            out_dir,
            start_date,
            end_date,
            filters,
        } => run_report(&api, &format, &out_dir, start_date, end_date, filters).await?,
    }

    Ok(())
}

async fn run_login(api: &PanelApi, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };

    let password: String = Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;

    let tokens = api.login(&username, &password).await?;
    println!("✅ Logged in as {username}");
    println!(
        "   Access token: {}...",
        &tokens.access_token[..20.min(tokens.access_token.len())]
    );

    Ok(())
}

async fn run_session(api: &PanelApi) {
    match api.session().await {
        Some(tokens) => {
            println!("Session: active");
            println!("  Token type:    {}", tokens.token_type);
            println!(
                "  Access token:  {}...",
                &tokens.access_token[..20.min(tokens.access_token.len())]
            );
            println!(
                "  Refresh token: {}",
                if tokens.refresh_token.is_some() {
                    "stored"
                } else {
                    "none"
                }
            );
        }
        None => println!("Session: none (run `panel-client login`)"),
    }
}

async fn run_customer(api: &PanelApi, command: CustomerCommand) -> Result<()> {
    match command {
        CustomerCommand::Get { id } => {
            let customer = api.customer(&id).await?;
            println!("{}", serde_json::to_string_pretty(&customer)?);
        }
        CustomerCommand::Register {
            customer_id,
            email,
            phone,
        } => {
            let payload = RegisterCustomerPayload {
                customer_id,
                email: email.trim().to_string(),
                phone_number: phone.trim().to_string(),
            };
            api.register_customer(&payload).await?;
            println!("✅ Customer {} registered", payload.customer_id);
        }
    }

    Ok(())
}

async fn run_transactions(
    api: &PanelApi,
    page: u32,
    size: u32,
    sort_by: String,
    direction: &str,
    filters: TransactionFilterArgs,
) -> Result<()> {
    let query = TransactionQuery {
        page,
        size,
        sort_by,
        direction: direction.parse()?,
        filter: to_filter(filters),
    };

    let result = api.transactions(&query).await?;
    println!(
        "Page {}/{} ({} transactions total)",
        result.number + 1,
        result.total_pages.max(1),
        result.total_elements
    );
    println!("{}", serde_json::to_string_pretty(&result.content)?);

    Ok(())
}

async fn run_limits(api: &PanelApi, command: LimitsCommand) -> Result<()> {
    match command {
        LimitsCommand::List => {
            let limits = api.limits().await?;
            println!("{}", serde_json::to_string_pretty(&limits)?);
        }
        LimitsCommand::Get { id } => {
            let limit = api.limit(id).await?;
            println!("{}", serde_json::to_string_pretty(&limit)?);
        }
        LimitsCommand::Create {
            transaction_type_id,
            name,
            amount_per_day,
            amount_per_month,
            identification,
        } => {
            let payload = CreateLimitPayload {
                transaction_type_id,
                name,
                amount_per_day,
                amount_per_month,
                limit_type: identification.parse()?,
            };
            api.create_limit(&payload).await?;
            println!("✅ Limit \"{}\" created", payload.name);
        }
        LimitsCommand::Update {
            id,
            transaction_type_id,
            name,
            amount_per_day,
            amount_per_month,
            identification,
        } => {
            let payload = CreateLimitPayload {
                transaction_type_id,
                name,
                amount_per_day,
                amount_per_month,
                limit_type: identification.parse()?,
            };
            api.update_limit(id, &payload).await?;
            println!("✅ Limit {id} updated");
        }
        LimitsCommand::Delete { id } => {
            api.delete_limit(id).await?;
            println!("✅ Limit {id} deleted");
        }
        LimitsCommand::Types => {
            let types = api.transaction_types().await?;
            println!("{}", serde_json::to_string_pretty(&types)?);
        }
    }

    Ok(())
}

async fn run_report(
    api: &PanelApi,
    format: &str,
    out_dir: &str,
    start_date: Option<String>,
    end_date: Option<String>,
    filters: TransactionFilterArgs,
) -> Result<()> {
    let format: ReportFormat = format.parse()?;
    let query = ReportQuery {
        filter: to_filter(filters),
        start_date,
        end_date,
    };

    let bytes = api.transactions_report(format, &query).await?;
    let path = Path::new(out_dir).join(api::report_file_name(format));
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!(
        "✅ Report saved to {} ({} bytes)",
        path.display(),
        bytes.len()
    );

    Ok(())
}

fn to_filter(args: TransactionFilterArgs) -> TransactionFilter {
    TransactionFilter {
        status: args.status,
        service_name: args.service_name,
        credit_account: args.credit_account,
        debit_account: args.debit_account,
        transaction_type: args.transaction_type,
        customer_id: args.customer_id,
        device_id: args.device_id,
        abs_id: args.abs_id,
    }
}
