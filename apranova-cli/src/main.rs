//! Apranova CLI - command-line front-end for the session manager
//!
//! Signs in against the Apranova backend, keeps the session in the local
//! session file and reports where the web client would navigate next.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use apranova_auth::{
    AuthError, AuthPage, FormFeedback, LoginCredentials, PageState, ResetLink, Role,
    SessionManager,
};
use apranova_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, ClientConfig,
};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "apranova")]
#[command(about = "Sign in to the Apranova learning platform from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Role selected on the login page (student, trainer, admin, superadmin)
        #[arg(short, long, default_value = "student")]
        role: Role,

        /// Path to return to after signing in
        #[arg(long)]
        redirect: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Check for an existing session, as a public auth page does on load
    Check,

    /// Show the signed-in user's profile
    Whoami,

    /// Request a password reset email
    ResetPassword {
        #[arg(short, long)]
        email: String,
    },

    /// Set a new password using the link from a reset email
    ResetConfirm {
        /// Full reset link, or its `uid=..&token=..` query
        #[arg(short, long)]
        link: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        confirm: String,
    },

    /// Manage configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Validate the effective configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Config {
        show,
        init,
        validate,
    } = cli.command
    {
        return handle_config(cli.config.as_deref(), show, init, validate);
    }

    let config = load_config(cli.config.as_deref())?;

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config).context("Failed to initialize logging")?;

    info!("Starting Apranova CLI v{}", env!("CARGO_PKG_VERSION"));
    debug!("Backend: {}", config.api.base_url);

    let manager =
        Arc::new(SessionManager::from_config(&config).context("Failed to create session manager")?);

    match cli.command {
        Commands::Login {
            email,
            password,
            role,
            redirect,
        } => handle_login(&manager, &email, &password, role, redirect.as_deref()).await,
        Commands::Logout => {
            let target = manager.logout().await;
            println!("Signed out. Next: {}", target);
            Ok(())
        }
        Commands::Check => handle_check(manager).await,
        Commands::Whoami => handle_whoami(&manager).await,
        Commands::ResetPassword { email } => {
            manager
                .request_password_reset(&email)
                .await
                .map_err(report_failure)?;
            println!("If an account exists for {}, a reset link is on its way.", email.trim());
            Ok(())
        }
        Commands::ResetConfirm {
            link,
            password,
            confirm,
        } => {
            manager
                .confirm_password_reset(&ResetLink::parse(&link), &password, &confirm)
                .await
                .map_err(report_failure)?;
            println!("Password updated. You can now sign in with your new password.");
            Ok(())
        }
        Commands::Config {
            show,
            init,
            validate,
        } => handle_config(cli.config.as_deref(), show, init, validate),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ClientConfig> {
    ClientConfig::load(path).context("Failed to load configuration")
}

/// Print banner and field feedback the way the login page shows it
fn report_failure(error: AuthError) -> anyhow::Error {
    let feedback = FormFeedback::from_error(&error);

    eprintln!("{}", feedback.title);
    if let Some(banner) = &feedback.banner {
        eprintln!("  {}", banner);
    }
    for (field, message) in &feedback.field_errors {
        eprintln!("  {}: {}", field, message);
    }

    anyhow::Error::new(error)
}

async fn handle_login(
    manager: &SessionManager,
    email: &str,
    password: &str,
    role: Role,
    redirect: Option<&str>,
) -> anyhow::Result<()> {
    log_operation_start!("cli_login", role = %role);

    let credentials = LoginCredentials::new(email, password, role);
    let user = manager
        .login(&credentials, redirect)
        .await
        .inspect_err(|e| log_operation_error!("cli_login", e))
        .map_err(report_failure)?;

    log_operation_success!("cli_login", role = %user.role());

    let name = if user.user.name.is_empty() {
        &user.user.email
    } else {
        &user.user.name
    };
    println!("Signed in as {} ({})", name, user.role());
    println!("Next: {}", user.redirect_to);
    Ok(())
}

async fn handle_check(manager: Arc<SessionManager>) -> anyhow::Result<()> {
    let mut page = AuthPage::mount(manager);

    match page.settled().await {
        PageState::Redirecting(target) => println!("Session active. Next: {}", target),
        PageState::Ready | PageState::Idle | PageState::Checking => println!("No active session."),
    }
    Ok(())
}

async fn handle_whoami(manager: &SessionManager) -> anyhow::Result<()> {
    match manager.current_user().await {
        Ok(profile) => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Err(AuthError::Authentication) => {
            println!("Not signed in.");
            Ok(())
        }
        Err(e) => Err(report_failure(e)),
    }
}

fn handle_config(path: Option<&Path>, show: bool, init: bool, validate: bool) -> anyhow::Result<()> {
    if init {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => dirs::config_dir()
                .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
                .context("Could not determine a configuration directory")?
                .join("apranova")
                .join("config.toml"),
        };

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        ClientConfig::default().save_to_file(&config_path)?;
        println!("Configuration initialized at: {}", config_path.display());
    }

    if show {
        let config = load_config(path)?;
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if validate {
        // load() validates; a failure here is reported as the error
        let config = load_config(path)?;
        println!("Configuration is valid (backend: {})", config.api.base_url);
    }

    if !(init || show || validate) {
        println!("Nothing to do. Use --show, --init or --validate.");
    }

    Ok(())
}
