//! CLI entry point for gconnect.

mod cli;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use gconnect::api::Client;
use gconnect::auth::{remove_session_file, save_session_file, BoxError, MfaHandler};
use gconnect::config::load_config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Env var holding the log filter (`warn` when unset).
const LOG_ENV: &str = "GCONNECT_LOG";

#[tokio::main]
async fn main() {
    init_tracing();
    let args = cli::Args::parse();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    if let Err(msg) = run(args, &cancel).await {
        eprintln!("error: {msg}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: cli::Args, cancel: &CancellationToken) -> Result<(), String> {
    let config = load_config(args.config.as_deref()).map_err(|err| format!("config: {err}"))?;
    let session_path = config.session_path().ok_or_else(|| {
        "could not determine a session file location; set GCONNECT_SESSION_PATH".to_string()
    })?;
    let client = Client::new(config.client_config().map_err(|err| format!("config: {err}"))?);

    match args.command {
        cli::Command::Login { email } => run_login(&client, &session_path, email, cancel).await,
        cli::Command::Status => run_status(&client, &session_path),
        cli::Command::Logout => {
            let removed = remove_session_file(&session_path)
                .map_err(|err| format!("session: {err}"))?;
            if removed {
                println!("logged out");
            } else {
                println!("no saved session");
            }
            Ok(())
        }
        cli::Command::Refresh => {
            require_saved_session(&client, &session_path)?;
            client
                .refresh_oauth2(cancel)
                .await
                .map_err(|err| err.to_string())?;
            save_session_file(&session_path, &client.session())
                .map_err(|err| format!("session: {err}"))?;
            println!("token refreshed");
            Ok(())
        }
        cli::Command::Get { path } => {
            require_saved_session(&client, &session_path)?;
            let value: serde_json::Value = client
                .get_json(&path, cancel)
                .await
                .map_err(|err| format!("api: {err}"))?;
            let text = serde_json::to_string_pretty(&value).map_err(|err| err.to_string())?;
            println!("{text}");
            Ok(())
        }
    }
}

async fn run_login(
    client: &Client,
    session_path: &Path,
    email: Option<String>,
    cancel: &CancellationToken,
) -> Result<(), String> {
    let email = match email {
        Some(email) => email,
        None => prompt_line("Email: ").map_err(|err| format!("failed to read email: {err}"))?,
    };
    if email.is_empty() {
        return Err("email is required".to_string());
    }
    let password = rpassword::prompt_password("Password: ")
        .map_err(|err| format!("failed to read password: {err}"))?;

    let mfa: Arc<dyn MfaHandler> =
        Arc::new(|| -> Result<String, BoxError> { Ok(prompt_line("MFA code: ")?) });
    client
        .login(&email, &password, Some(mfa), cancel)
        .await
        .map_err(|err| format!("login: {err}"))?;

    save_session_file(session_path, &client.session())
        .map_err(|err| format!("failed to save session: {err}"))?;
    println!("logged in; session saved to {}", session_path.display());
    Ok(())
}

fn run_status(client: &Client, session_path: &Path) -> Result<(), String> {
    if !load_saved_session(client, session_path)? {
        println!("not logged in (no session at {})", session_path.display());
        return Ok(());
    }
    let session = client.session();

    println!("session:   {}", session_path.display());
    println!("domain:    {}", session.domain);
    println!("logged in: {}", if session.is_authenticated() { "yes" } else { "no" });
    if session.is_authenticated() {
        println!("expires:   {}", session.oauth2_expiry.to_rfc3339());
        println!("expired:   {}", if session.is_expired() { "yes" } else { "no" });
        if let Some(scope) = &session.oauth2_scope {
            println!("scope:     {scope}");
        }
    }
    Ok(())
}

fn require_saved_session(client: &Client, session_path: &Path) -> Result<(), String> {
    if load_saved_session(client, session_path)? {
        Ok(())
    } else {
        Err("not logged in; run `gconnect login` first".to_string())
    }
}

/// Load the session file into `client`; `false` when there is none.
fn load_saved_session(client: &Client, session_path: &Path) -> Result<bool, String> {
    let file = match File::open(session_path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(format!("session: {err}")),
    };
    client
        .load_session(BufReader::new(file))
        .map_err(|err| format!("session: {err}"))?;
    Ok(true)
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
