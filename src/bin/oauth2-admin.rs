//! OAuth2 server administration CLI.
//!
//! Registers, lists, and deletes OAuth clients and creates users directly against the
//! configured store. Storage is selected with the same environment variables the server
//! reads (`STORAGE_BACKEND`, `DATABASE_URL`, `DB_*`).
//!
//! ```bash
//! oauth2-admin client register --name "My App" \
//!   --redirect-uri "http://localhost:3000/callback" --scope "read write" --hash-secret
//! oauth2-admin client list --limit 20
//! oauth2-admin client delete --client-id "<client id>"
//! oauth2-admin user create --username alice --email alice@example.com --password "<password>"
//! ```
//!
//! Exit codes:
//! - 0: Success
//! - 1: Storage or general error
//! - 2: Invalid input or conflicting record

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use oauth2_server::{
    config::Config,
    errors::{AccountError, StorageError},
    oauth::{
        AccountService, SignupForm,
        credentials::{Argon2CredentialVerifier, hash_secret},
        types::{OAuthClient, generate_client_id, generate_token, parse_scope},
    },
    storage::{OAuthStorage, create_storage_backend, parse_storage_backend},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::process;
use std::sync::Arc;

/// Main CLI application structure
#[derive(Parser)]
#[command(
    name = "oauth2-admin",
    about = "OAuth2 server administration CLI",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, help = "Enable verbose output for debugging")]
    verbose: bool,

    /// Output format
    #[arg(
        long,
        value_enum,
        default_value = "json-pretty",
        help = "Output format for responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// JSON formatted output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
    /// Human-readable table format
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage OAuth clients
    #[command(subcommand)]
    Client(ClientCommands),
    /// Manage users
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Register a new OAuth client
    Register(RegisterArgs),
    /// List registered clients
    List(ListArgs),
    /// Delete a client
    Delete(DeleteArgs),
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user account
    Create(CreateUserArgs),
}

/// Arguments for client registration
#[derive(Args)]
struct RegisterArgs {
    #[arg(long, help = "Human-readable name for the OAuth client")]
    name: Option<String>,

    #[arg(
        long = "redirect-uri",
        required = true,
        help = "OAuth redirect URI (can be specified multiple times for multiple URIs)"
    )]
    redirect_uris: Vec<String>,

    #[arg(long, help = "Allowed scopes as a space-separated string; omit for unrestricted")]
    scope: Option<String>,

    #[arg(long, help = "Client ID to use instead of a generated UUID")]
    client_id: Option<String>,

    #[arg(long, help = "Client secret to use instead of a generated one")]
    client_secret: Option<String>,

    #[arg(long, help = "Store the client secret as an Argon2 hash")]
    hash_secret: bool,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, help = "Maximum number of clients to list")]
    limit: Option<usize>,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(long, help = "OAuth client ID")]
    client_id: String,
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    username: String,

    #[arg(long)]
    email: String,

    #[arg(long, env = "OAUTH2_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

/// Application errors
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Error: {0}")]
    General(String),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Storage(err) => AppError::Storage(err),
            AccountError::HashingFailed(message) => AppError::General(message),
            other => AppError::Input(other.to_string()),
        }
    }
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Input(_) => 2,
            AppError::Storage(StorageError::AlreadyExists(_)) => 2,
            AppError::Storage(_) | AppError::Json(_) | AppError::General(_) => 1,
        }
    }
}

/// Main application entry point
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli).await {
        eprintln!("{}", err);
        process::exit(err.exit_code());
    }
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    let storage = connect(cli).await?;

    match &cli.command {
        Commands::Client(ClientCommands::Register(args)) => {
            register_client(cli, storage, args).await
        }
        Commands::Client(ClientCommands::List(args)) => list_clients(cli, storage, args).await,
        Commands::Client(ClientCommands::Delete(args)) => delete_client(cli, storage, args).await,
        Commands::User(UserCommands::Create(args)) => create_user(cli, storage, args).await,
    }
}

async fn connect(cli: &Cli) -> Result<Arc<dyn OAuthStorage>, AppError> {
    let config = Config::new().map_err(|e| AppError::General(e.to_string()))?;
    if cli.verbose {
        eprintln!("Using {} storage backend", config.storage_backend);
    }

    let backend = parse_storage_backend(&config.storage_backend, config.database_url.as_deref())?;
    Ok(create_storage_backend(backend, 1).await?)
}

/// Register a new OAuth client
async fn register_client(
    cli: &Cli,
    storage: Arc<dyn OAuthStorage>,
    args: &RegisterArgs,
) -> Result<(), AppError> {
    let client_id = args.client_id.clone().unwrap_or_else(generate_client_id);
    if storage.get_client(&client_id).await?.is_some() {
        return Err(AppError::Input(format!("client {} already exists", client_id)));
    }

    let client_secret = args.client_secret.clone().unwrap_or_else(generate_token);
    let stored_secret = if args.hash_secret {
        hash_secret(&client_secret).map_err(|e| AppError::General(e.to_string()))?
    } else {
        client_secret.clone()
    };

    let now = Utc::now();
    let client = OAuthClient {
        client_id,
        client_secret: stored_secret,
        client_name: args.name.clone(),
        redirect_uris: args.redirect_uris.clone(),
        scopes: args.scope.as_deref().map(parse_scope).unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };
    storage.store_client(&client).await?;

    if cli.verbose {
        eprintln!("Registered client {}", client.client_id);
    }

    let mut output = serde_json::to_value(&client)?;
    if let Value::Object(map) = &mut output {
        // Only chance to see the plaintext secret
        map.insert("client_secret".to_string(), Value::String(client_secret));
    }
    output_response(&cli.format, &output)
}

/// List registered clients
async fn list_clients(
    cli: &Cli,
    storage: Arc<dyn OAuthStorage>,
    args: &ListArgs,
) -> Result<(), AppError> {
    let clients = storage.list_clients(args.limit).await?;
    if cli.verbose {
        eprintln!("Found {} clients", clients.len());
    }
    output_response(&cli.format, &json!({ "clients": clients }))
}

/// Delete a client
async fn delete_client(
    cli: &Cli,
    storage: Arc<dyn OAuthStorage>,
    args: &DeleteArgs,
) -> Result<(), AppError> {
    if !storage.delete_client(&args.client_id).await? {
        return Err(AppError::Input(format!(
            "client {} does not exist",
            args.client_id
        )));
    }
    output_response(
        &cli.format,
        &json!({ "client_id": args.client_id, "deleted": true }),
    )
}

/// Create a user account
async fn create_user(
    cli: &Cli,
    storage: Arc<dyn OAuthStorage>,
    args: &CreateUserArgs,
) -> Result<(), AppError> {
    let accounts = AccountService::new(storage, Arc::new(Argon2CredentialVerifier));
    let user = accounts
        .register(SignupForm {
            username: args.username.clone(),
            email: args.email.clone(),
            password: args.password.clone(),
            confirm_password: args.password.clone(),
        })
        .await?;
    output_response(&cli.format, &user)
}

/// Output response data in the requested format
fn output_response<T: Serialize>(format: &OutputFormat, data: &T) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(data)?);
        }
        OutputFormat::JsonPretty => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Table => {
            let json_value: Value = serde_json::to_value(data)?;
            print_table(&json_value, 0);
        }
    }
    Ok(())
}

/// Print data in table format (recursive for nested objects)
fn print_table(value: &Value, indent: usize) {
    let prefix = "  ".repeat(indent);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) => {
                        println!("{}{}:", prefix, key);
                        print_table(val, indent + 1);
                    }
                    Value::Array(arr) => {
                        println!("{}{}:", prefix, key);
                        for (i, item) in arr.iter().enumerate() {
                            println!("{}  [{}]:", prefix, i);
                            print_table(item, indent + 2);
                        }
                    }
                    _ => {
                        println!("{}{}: {}", prefix, key, format_value(val));
                    }
                }
            }
        }
        _ => {
            println!("{}{}", prefix, format_value(value));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_else(|_| "invalid".to_string()),
    }
}
