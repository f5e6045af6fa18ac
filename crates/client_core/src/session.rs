use shared::domain::{AuthUser, UserStatus};
use tracing::{info, warn};

use crate::{
    view::{ElementId, Page},
    ClientContext,
};

/// Page-load check shared by every page behind the login.
pub struct SessionGuard {
    ctx: ClientContext,
}

impl SessionGuard {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// Returns the signed-in user, or redirects to the login page and
    /// returns `None`. Lookup failures count as "not signed in".
    pub async fn require_user(&self) -> Option<AuthUser> {
        let user = match self.ctx.backend.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                info!("session: no active session, redirecting to login");
                self.ctx.view.navigate(Page::Login);
                return None;
            }
            Err(err) => {
                warn!("session: user lookup failed, redirecting to login: {err}");
                self.ctx.view.navigate(Page::Login);
                return None;
            }
        };

        if let Err(err) = self
            .ctx
            .backend
            .set_user_status(user.id, UserStatus::Online)
            .await
        {
            warn!(user_id = %user.id, "session: failed to mark user online: {err}");
        }

        if self.ctx.view.has_element(ElementId::UsernameDisplay) {
            let profile = match self.ctx.backend.user_profile(user.id).await {
                Ok(profile) => profile,
                Err(err) => {
                    warn!(user_id = %user.id, "session: profile lookup failed: {err}");
                    None
                }
            };
            let display = profile
                .and_then(|profile| profile.username)
                .filter(|name| !name.is_empty())
                .or_else(|| user.email.clone())
                .unwrap_or_default();
            self.ctx.view.set_text(ElementId::UsernameDisplay, &display);
        }

        Some(user)
    }
}
