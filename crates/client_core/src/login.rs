use shared::domain::UserStatus;
use tracing::{error, info, warn};

use crate::{selection::Selection, view::Page, ClientContext};

pub const MISSING_CREDENTIALS_ALERT: &str = "Please enter both email and password.";
pub const INVALID_CREDENTIALS_ALERT: &str = "Invalid email or password.";
pub const LOGIN_FAILURE_ALERT: &str = "Something went wrong while logging in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    MissingCredentials,
    Rejected,
    Failed,
    SignedIn,
}

pub struct LoginController {
    ctx: ClientContext,
}

impl LoginController {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// Skips the form when a session is already held. Returns whether it
    /// redirected.
    pub async fn check_existing_session(&self) -> bool {
        match self.ctx.backend.session().await {
            Ok(Some(_)) => {
                info!("login: session already active, opening channel list");
                self.ctx.view.navigate(Page::Channels);
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!("login: session lookup failed: {err}");
                false
            }
        }
    }

    pub async fn submit(&self, email: &str, password: &str) -> LoginOutcome {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            self.ctx.view.alert(MISSING_CREDENTIALS_ALERT);
            return LoginOutcome::MissingCredentials;
        }

        match self.ctx.backend.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "login: signed in");
                self.ctx.view.navigate(Page::Channels);
                LoginOutcome::SignedIn
            }
            Err(err) if err.is_rejection() => {
                // The backend's reason stays in the log only.
                warn!("login: sign-in rejected: {err}");
                self.ctx.view.alert(INVALID_CREDENTIALS_ALERT);
                LoginOutcome::Rejected
            }
            Err(err) => {
                error!("login: sign-in failed: {err}");
                self.ctx.view.alert(LOGIN_FAILURE_ALERT);
                LoginOutcome::Failed
            }
        }
    }

    /// Best-effort offline mark, sign-out, selection wipe, back to login.
    /// Only the redirect and the wipe are guaranteed.
    pub async fn logout(&self) {
        match self.ctx.backend.current_user().await {
            Ok(Some(user)) => {
                if let Err(err) = self
                    .ctx
                    .backend
                    .set_user_status(user.id, UserStatus::Offline)
                    .await
                {
                    warn!(user_id = %user.id, "logout: failed to mark user offline: {err}");
                }
            }
            Ok(None) => {}
            Err(err) => warn!("logout: user lookup failed: {err}"),
        }

        if let Err(err) = self.ctx.backend.sign_out().await {
            warn!("logout: sign-out failed: {err}");
        }
        if let Err(err) = Selection::clear(self.ctx.selection.as_ref()) {
            error!("logout: failed to clear channel selection: {err}");
        }
        self.ctx.view.navigate(Page::Login);
    }
}

#[cfg(test)]
#[path = "tests/login_tests.rs"]
mod tests;
