use crate::server;
use clap::{Args, Parser, Subcommand};
use counsel::auth::jwt::JwtKeys;
use counsel::auth::service::{AuthService, NewCounselor};
use counsel::config::AppConfig;
use counsel::error::AppError;
use counsel::store::SqliteStore;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "Guidance Counseling Service",
    about = "Run the guidance and counseling HTTP service and its management commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Create a counselor account directly in the configured database
    CreateCounselor(CreateCounselorArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct CreateCounselorArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    employee_id: String,
    #[arg(long)]
    specialization: String,
    #[arg(long)]
    password: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::CreateCounselor(args) => create_counselor(args),
    }
}

/// Bootstrap path for the first account: the HTTP endpoint for creating
/// counselors itself requires a logged-in counselor.
fn create_counselor(args: CreateCounselorArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = Arc::new(SqliteStore::open(config.database.path.as_path())?);
    let keys = JwtKeys::new(&config.auth.jwt_secret, config.auth.token_expiry_minutes);
    let auth = AuthService::new(store, keys);

    let profile = auth
        .create_counselor(NewCounselor {
            full_name: args.full_name,
            email: args.email,
            employee_id: args.employee_id,
            specialization: args.specialization,
            password: args.password,
        })
        .map_err(|err| match err {
            counsel::auth::AuthError::Store(store) => AppError::Store(store),
            other => AppError::Io(std::io::Error::other(other.to_string())),
        })?;

    println!("created counselor {} <{}>", profile.counselor_id, profile.email);
    Ok(())
}
