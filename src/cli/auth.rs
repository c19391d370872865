use super::ui;
use crate::core::service::{AuthService, Session};
use crate::store::SessionStore;
use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Loads the current session, dropping it when it has expired.
pub fn require_session(store: &dyn SessionStore) -> Result<Session> {
    match store.load()? {
        Some(session) if !session.is_expired(Utc::now()) => Ok(session),
        Some(_) => {
            debug!("Stored session expired, clearing it");
            store.clear()?;
            bail!("You must be logged in. Your session has expired, run `loanboard login`")
        }
        None => bail!("You must be logged in. Run `loanboard login` first"),
    }
}

/// The live session, if any. Expired sessions count as logged out.
fn current_session(store: &dyn SessionStore) -> Result<Option<Session>> {
    Ok(store
        .load()?
        .filter(|session| !session.is_expired(Utc::now())))
}

fn already_logged_in(session: &Session) {
    println!(
        "Already logged in as {} ({}). Run `loanboard logout` to switch accounts.",
        ui::style_text(session.display_name(), ui::StyleType::TotalLabel),
        session.email
    );
}

pub async fn signup(
    auth: &dyn AuthService,
    store: &dyn SessionStore,
    email: &str,
    password: &str,
    name: &str,
) -> Result<()> {
    if let Some(session) = current_session(store)? {
        already_logged_in(&session);
        return Ok(());
    }
    if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
        bail!("Please fill in all required fields");
    }

    let session =
        ui::with_spinner("Creating account...", auth.sign_up(email.trim(), password, name.trim()))
            .await?;
    store.save(&session)?;
    info!("Signed up as {}", session.email);
    println!(
        "Account created. Welcome, {}!",
        ui::style_text(session.display_name(), ui::StyleType::TotalValue)
    );
    Ok(())
}

pub async fn login(
    auth: &dyn AuthService,
    store: &dyn SessionStore,
    email: &str,
    password: &str,
) -> Result<()> {
    if let Some(session) = current_session(store)? {
        already_logged_in(&session);
        return Ok(());
    }

    let session = ui::with_spinner("Signing in...", auth.sign_in(email.trim(), password)).await?;
    store.save(&session)?;
    info!("Logged in as {}", session.email);
    println!(
        "Welcome back, {}!",
        ui::style_text(session.display_name(), ui::StyleType::TotalValue)
    );
    Ok(())
}

/// Signs out remotely and always forgets the local session, even when the
/// backend call fails.
pub async fn logout(auth: &dyn AuthService, store: &dyn SessionStore) -> Result<()> {
    let Some(session) = store.load()? else {
        println!("Not logged in.");
        return Ok(());
    };
    if let Err(e) = auth.sign_out(&session).await {
        warn!("Remote sign out failed: {}", e);
    }
    store.clear()?;
    println!("Logged out {}.", session.email);
    Ok(())
}

pub fn whoami(store: &dyn SessionStore) -> Result<()> {
    let session = require_session(store)?;
    println!(
        "{} ({})",
        ui::style_text(session.display_name(), ui::StyleType::TotalLabel),
        session.email
    );
    Ok(())
}
