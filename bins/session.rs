//! Command-line client for the session store.
//!
//! ```text
//! session status
//! session login <email> <password>
//! session logout
//! session signup <email> <first> <last> <password> [phone] [city]
//! ```
//!
//! The session survives between invocations in `session.storage_path`.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use configs::AppConfig;
use service::auth::domain::{LoginInput, SignupInput};
use service::auth::{self, AuthBackend, HttpAuthBackend};
use service::runtime;
use service::session::{RouteDecision, RouteGuard, SessionPhase, SessionStore};
use service::storage::{DurableStorage, FileStorage};
use tracing::debug;

const USAGE: &str = "usage: session <status | login <email> <password> | logout | signup <email> <first> <last> <password> [phone] [city]>";

enum Command {
    Status,
    Login { email: String, password: String },
    Logout,
    Signup(SignupInput),
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    match args {
        [cmd] if cmd == "status" => Ok(Command::Status),
        [cmd, email, password] if cmd == "login" => Ok(Command::Login {
            email: email.clone(),
            password: password.clone(),
        }),
        [cmd] if cmd == "logout" => Ok(Command::Logout),
        [cmd, email, first, last, password, rest @ ..] if cmd == "signup" && rest.len() <= 2 => {
            Ok(Command::Signup(SignupInput {
                email: email.clone(),
                first_name: first.clone(),
                last_name: last.clone(),
                password: password.clone(),
                phone: rest.first().cloned(),
                city: rest.get(1).cloned(),
            }))
        }
        _ => bail!(USAGE),
    }
}

fn print_status(store: &SessionStore) {
    let state = store.snapshot();
    match (state.phase(), state.identity()) {
        (SessionPhase::Authenticated, Some(user)) => {
            let landing = match RouteGuard::public_only().decide(&state) {
                RouteDecision::RedirectToDashboard(path) => path,
                _ => "-",
            };
            println!("authenticated as {} <{}>", user.full_name(), user.email);
            println!("role: {}  dashboard: {}", user.role.as_str(), landing);
        }
        (phase, _) => println!("{phase:?}"),
    }
}

async fn run(command: Command) -> anyhow::Result<bool> {
    let cfg = AppConfig::load_or_default()?;
    runtime::ensure_parent_dir(&cfg.session.storage_path).await?;
    let storage: Arc<dyn DurableStorage> = Arc::new(
        FileStorage::open(&cfg.session.storage_path)
            .with_context(|| format!("open session storage {}", cfg.session.storage_path))?,
    );
    let backend: Arc<dyn AuthBackend> = Arc::new(HttpAuthBackend::new(cfg.session.api_base_url.clone()));
    let store = SessionStore::with_storage_key(backend.clone(), storage, cfg.session.storage_key.clone());
    let phase = store.hydrate();
    debug!(?phase, path = %cfg.session.storage_path, "session hydrated");

    match command {
        Command::Status => {
            print_status(&store);
            Ok(true)
        }
        Command::Login { email, password } => {
            let outcome = store.login(LoginInput::new(email, password)).await;
            println!("{}", outcome.message);
            if outcome.success {
                print_status(&store);
            }
            Ok(outcome.success)
        }
        Command::Logout => {
            if !store.snapshot().is_authenticated() {
                println!("not logged in");
                return Ok(true);
            }
            store.logout().await;
            println!("logged out");
            Ok(true)
        }
        Command::Signup(input) => {
            let outcome = auth::signup(backend.as_ref(), input).await;
            println!("{}", outcome.message);
            Ok(outcome.success)
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    common::utils::logging::init_logging_cli();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to build runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(command)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
