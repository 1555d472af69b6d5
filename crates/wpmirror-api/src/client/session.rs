//! Cookie session established through the WordPress login form.
//!
//! The session lives in the cookie jar of a dedicated agent, which sends each
//! cookie according to its domain, path and expiry. The session is renewed
//! when its logged-in cookie has expired or the site rejects it.

use std::sync::PoisonError;

use tracing::{debug, info, warn};

use super::{LOGIN_PATH, USER_AGENT, WpClient, check_status};
use crate::Query;
use crate::error::ApiError;

/// Redirects followed after posting the login form.
pub(super) const MAX_LOGIN_REDIRECTS: u32 = 5;

/// Cookie set by WordPress once an authenticated admin page was served.
const SETTINGS_COOKIE_PREFIX: &str = "wp-settings-";

/// Authentication cookie sent on front-end requests.
const LOGGED_IN_COOKIE_PREFIX: &str = "wordpress_logged_in_";

impl WpClient {
    /// Fetch content through the login session, logging in again once if the
    /// site rejects the current session.
    pub(super) fn get_session_content(
        &self,
        path: &str,
        query: &Query<'_>,
    ) -> Result<Vec<u8>, ApiError> {
        self.ensure_session(false)?;

        info!("Fetching {} with login session", path);
        match self.fetch_content(&self.session_agent, path, query) {
            Err(e) if is_session_rejected(&e) => {
                warn!(path, error = %e, "Login session rejected, logging in again");
                self.ensure_session(true)?;
                self.fetch_content(&self.session_agent, path, query)
            }
            result => result,
        }
    }

    /// Log in unless a live session exists. `renew` forces a new login.
    fn ensure_session(&self, renew: bool) -> Result<(), ApiError> {
        let mut active = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if *active && !renew {
            if self.has_cookie(LOGGED_IN_COOKIE_PREFIX) {
                return Ok(());
            }
            debug!("Login session expired");
        }

        *active = false;
        self.login()?;
        *active = true;
        Ok(())
    }

    /// Post the login form with an empty jar and follow its redirects.
    fn login(&self) -> Result<(), ApiError> {
        info!("Logging in as {}", self.user);

        self.session_agent.cookie_jar_lock().clear();
        let response = self
            .session_agent
            .post(&self.url(LOGIN_PATH))
            .header("User-Agent", USER_AGENT)
            .send_form([
                ("log", self.user.as_str()),
                ("pwd", self.password.as_str()),
                ("wp-submit", "Log In"),
            ])?;
        check_status(response)?;

        if !self.has_cookie(SETTINGS_COOKIE_PREFIX) {
            return Err(ApiError::LoginFailed {
                user: self.user.clone(),
            });
        }
        debug!("Login session established");
        Ok(())
    }

    /// Whether the session jar holds an unexpired cookie named `prefix*`.
    fn has_cookie(&self, prefix: &str) -> bool {
        let jar = self.session_agent.cookie_jar_lock();
        jar.iter().any(|cookie| cookie.name().starts_with(prefix))
    }
}

/// Answers meaning the session cookie is no longer accepted.
fn is_session_rejected(error: &ApiError) -> bool {
    matches!(
        error,
        ApiError::LoginRedirect | ApiError::HttpResponse { status: 401 | 403, .. }
    )
}
