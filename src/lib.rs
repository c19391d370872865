pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::loans::LoanChanges;
use crate::core::config::AppConfig;
use crate::core::loan::{LoanDraft, LoanStatus};
use crate::core::service::{Backend, Session};
use crate::core::stats::{LoanFilter, StatusFilter};
use crate::providers::{HostedBackend, MemoryBackend};
use crate::store::{DiskSessionStore, MemorySessionStore, SessionStore};
use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    SignUp {
        email: String,
        password: String,
        name: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    WhoAmI,
    Dashboard,
    Loans(LoanCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoanCommand {
    List {
        search: Option<String>,
        status: StatusFilter,
    },
    Show {
        id: String,
    },
    New(LoanDraft),
    Edit {
        id: String,
        changes: LoanChanges,
    },
    SetStatus {
        id: String,
        status: LoanStatus,
    },
    Delete {
        ids: Vec<String>,
    },
}

/// Everything a command needs: the backend, where the session lives, and
/// display settings.
pub struct AppContext {
    pub backend: Box<dyn Backend>,
    pub sessions: Box<dyn SessionStore>,
    pub currency: String,
}

impl AppContext {
    /// Hosted backend with the session persisted under the data directory.
    pub fn hosted(config: &AppConfig) -> Result<Self> {
        let backend = HostedBackend::new(config.backend()?)?;
        let sessions = DiskSessionStore::open(&config.default_data_path()?)?;
        Ok(AppContext {
            backend: Box::new(backend),
            sessions: Box::new(sessions),
            currency: config.currency.clone(),
        })
    }

    /// In-process demo data, signed in as the demo user. Nothing is persisted.
    pub async fn offline(config: &AppConfig) -> Self {
        let (backend, session) = MemoryBackend::demo().await;
        AppContext {
            backend: Box::new(backend),
            sessions: Box::new(MemorySessionStore::with_session(session)),
            currency: config.currency.clone(),
        }
    }

    pub fn require_session(&self) -> Result<Session> {
        cli::auth::require_session(self.sessions.as_ref())
    }

    pub async fn execute(&self, cmd: AppCommand) -> Result<()> {
        let backend = self.backend.as_ref();
        let sessions = self.sessions.as_ref();
        match cmd {
            AppCommand::SignUp {
                email,
                password,
                name,
            } => cli::auth::signup(backend, sessions, &email, &password, &name).await,
            AppCommand::Login { email, password } => {
                cli::auth::login(backend, sessions, &email, &password).await
            }
            AppCommand::Logout => cli::auth::logout(backend, sessions).await,
            AppCommand::WhoAmI => cli::auth::whoami(sessions),
            AppCommand::Dashboard => {
                let session = self.require_session()?;
                cli::dashboard::run(backend, &session, &self.currency).await
            }
            AppCommand::Loans(loan_cmd) => {
                let session = self.require_session()?;
                self.execute_loans(loan_cmd, &session).await
            }
        }
    }

    async fn execute_loans(&self, cmd: LoanCommand, session: &Session) -> Result<()> {
        let backend = self.backend.as_ref();
        let currency = self.currency.as_str();
        match cmd {
            LoanCommand::List { search, status } => {
                let filter = LoanFilter { search, status };
                cli::loans::list(backend, session, &filter, currency).await
            }
            LoanCommand::Show { id } => cli::loans::show(backend, session, &id, currency).await,
            LoanCommand::New(draft) => cli::loans::create(backend, session, draft, currency).await,
            LoanCommand::Edit { id, changes } => {
                cli::loans::edit(backend, session, &id, changes, currency).await
            }
            LoanCommand::SetStatus { id, status } => {
                cli::loans::set_status(backend, session, &id, status).await
            }
            LoanCommand::Delete { ids } => cli::loans::delete(backend, session, &ids).await,
        }
    }
}

fn load_config(config_path: Option<&str>, offline: bool) -> Result<AppConfig> {
    let loaded = match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };
    match loaded {
        Ok(config) => Ok(config),
        Err(e) if offline => {
            debug!("Using default config in offline mode: {e:#}");
            Ok(AppConfig::default())
        }
        Err(e) => Err(e),
    }
}

pub async fn run_command(cmd: AppCommand, config_path: Option<&str>, offline: bool) -> Result<()> {
    info!("loanboard starting...");
    let config = load_config(config_path, offline)?;
    debug!("Loaded config: {config:#?}");

    let context = if offline {
        AppContext::offline(&config).await
    } else {
        AppContext::hosted(&config)?
    };
    context.execute(cmd).await
}
