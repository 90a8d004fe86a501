mod agenda;
mod config;
mod db;
mod error;
mod ical;
mod mcp;
mod model;

use std::net::SocketAddr;

use chrono::{Days, NaiveDate};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smarttask-planner", about = "Task and calendar planner with an MCP interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (default)
    Serve,

    /// Create a new user
    CreateUser {
        /// Username
        #[arg(short, long)]
        username: String,
        /// Password
        #[arg(short, long)]
        password: String,
        /// Email address (optional)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create an MCP API token for a user
    CreateToken {
        /// Username of the token owner
        #[arg(short, long)]
        username: String,
        /// A descriptive name for this token
        #[arg(short, long)]
        name: String,
        /// Expire the token after this many days (default: never)
        #[arg(long)]
        expires_days: Option<u32>,
    },

    /// List all users
    ListUsers,

    /// List MCP tokens for a user
    ListTokens {
        /// Username
        #[arg(short, long)]
        username: String,
    },

    /// Delete an MCP token by ID
    DeleteToken {
        /// Token ID to delete
        #[arg(short, long)]
        id: String,
    },

    /// Reset a user's password
    ResetPassword {
        /// Username
        #[arg(short, long)]
        username: String,
        /// New password
        #[arg(short, long)]
        password: String,
    },

    /// Check a username or email and password
    CheckLogin {
        /// Username or email address
        #[arg(short, long)]
        login: String,
        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Print a user's agenda
    Agenda {
        /// Username
        #[arg(short, long)]
        username: String,
        /// First day (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Number of additional days to show
        #[arg(long, default_value_t = 0)]
        days: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve);

    match command {
        Commands::Serve => run_server().await,
        Commands::CreateUser {
            username,
            password,
            email,
        } => cmd_create_user(&username, &password, email.as_deref()).await,
        Commands::CreateToken {
            username,
            name,
            expires_days,
        } => cmd_create_token(&username, &name, expires_days).await,
        Commands::ListUsers => cmd_list_users().await,
        Commands::ListTokens { username } => cmd_list_tokens(&username).await,
        Commands::DeleteToken { id } => cmd_delete_token(&id).await,
        Commands::ResetPassword { username, password } => {
            cmd_reset_password(&username, &password).await
        }
        Commands::CheckLogin { login, password } => cmd_check_login(&login, &password).await,
        Commands::Agenda {
            username,
            date,
            days,
        } => cmd_agenda(&username, date.unwrap_or_else(model::today), days).await,
    }
}

/// Start the MCP server.
async fn run_server() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(port = config.port, "Starting SmartTask Planner");

    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database initialized");

    let app = mcp::router(pool);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "MCP server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Helper: init a DB pool from env for CLI commands.
async fn cli_pool() -> anyhow::Result<sqlx::SqlitePool> {
    let config = config::Config::from_env()?;
    Ok(db::init_pool(&config.database_url).await?)
}

async fn find_user(pool: &sqlx::SqlitePool, username: &str) -> anyhow::Result<db::models::User> {
    db::users::get_user_by_username(pool, username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User '{username}' not found"))
}

/// Create a new user.
async fn cmd_create_user(
    username: &str,
    password: &str,
    email: Option<&str>,
) -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    let user = db::users::create_user(&pool, username, email, password).await?;
    println!("User created:");
    println!("  ID:       {}", user.id);
    println!("  Username: {}", user.username);
    if let Some(ref e) = user.email {
        println!("  Email:    {e}");
    }
    Ok(())
}

/// Create an MCP token for a user.
async fn cmd_create_token(
    username: &str,
    name: &str,
    expires_days: Option<u32>,
) -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    let user = find_user(&pool, username).await?;

    let (raw_token, record) = db::tokens::create_token(&pool, &user.id, name, expires_days).await?;
    println!("MCP token created:");
    println!("  ID:      {}", record.id);
    println!("  Name:    {}", record.name);
    if let Some(expires) = record.expires_at {
        println!("  Expires: {expires}");
    }
    println!("  Token:   {raw_token}");
    println!();
    println!("Save this token, it cannot be retrieved again.");
    Ok(())
}

/// List all users.
async fn cmd_list_users() -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    let users = db::users::list_users(&pool).await?;

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!("{:<38} {:<20} Email", "ID", "Username");
    println!("{}", "-".repeat(70));
    for u in &users {
        println!(
            "{:<38} {:<20} {}",
            u.id,
            u.username,
            u.email.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// List MCP tokens for a user.
async fn cmd_list_tokens(username: &str) -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    let user = find_user(&pool, username).await?;

    let tokens = db::tokens::list_tokens_for_user(&pool, &user.id).await?;
    if tokens.is_empty() {
        println!("No tokens found for user '{username}'.");
        return Ok(());
    }

    let now = chrono::Utc::now().naive_utc();
    println!("{:<38} {:<20} {:<20} Expires", "ID", "Name", "Created");
    println!("{}", "-".repeat(100));
    for t in &tokens {
        let expires = match t.expires_at {
            Some(_) if t.is_expired(now) => "expired".to_string(),
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
            None => "never".to_string(),
        };
        println!(
            "{:<38} {:<20} {:<20} {}",
            t.id,
            t.name,
            t.created_at.format("%Y-%m-%d %H:%M"),
            expires
        );
    }
    Ok(())
}

/// Delete an MCP token by ID.
async fn cmd_delete_token(token_id: &str) -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    db::tokens::delete_token(&pool, token_id).await?;
    println!("Token {token_id} deleted.");
    Ok(())
}

/// Reset a user's password.
async fn cmd_reset_password(username: &str, password: &str) -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    db::users::reset_password(&pool, username, password).await?;
    println!("Password updated for user '{username}'.");
    Ok(())
}

async fn cmd_check_login(login: &str, password: &str) -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    match db::users::authenticate(&pool, login, password).await? {
        Some(user) => {
            println!("Login OK for '{}' ({}).", user.username, user.id);
            Ok(())
        }
        None => anyhow::bail!("Invalid login or password"),
    }
}

/// Print the agenda for `days + 1` days starting at `start`.
async fn cmd_agenda(username: &str, start: NaiveDate, days: u64) -> anyhow::Result<()> {
    let pool = cli_pool().await?;
    let user = find_user(&pool, username).await?;
    let viewer = agenda::Viewer::new(user.id, user.username);

    let events = db::events::list_events_for_user(&pool, &viewer.user_id).await?;
    let tasks = db::tasks::list_tasks_for_user(&pool, &viewer.user_id).await?;
    let planner = agenda::Agenda::new(&viewer, &events, &tasks);

    let end = start.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    for day in start.iter_days().take_while(|d| *d <= end) {
        println!("{}", day.format("%A %Y-%m-%d"));
        if !planner.has_items_on(day) {
            println!("  (nothing planned)");
            continue;
        }
        for occurrence in planner.items_for_date(day) {
            let item = &occurrence.item;
            println!(
                "  {}-{}  {:<5}  {}{}",
                item.start_time().format("%H:%M"),
                item.end_time().format("%H:%M"),
                item.item_type().as_str(),
                item.title(),
                if item.is_completed() { " (done)" } else { "" }
            );
        }
    }
    Ok(())
}
