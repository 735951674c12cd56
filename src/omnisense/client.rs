use crate::config;
use crate::error::OmnisenseError;
use crate::omnisense::helper::contains_login_form;
use reqwest::{Client as HttpClient, StatusCode};
use std::fmt;

pub const LOGIN_PATH: &str = "/user_login.asp";
pub const SITE_LIST_PATH: &str = "/site_select.asp";
pub const SENSOR_LIST_PATH: &str = "/sensor_select.asp";

/// Entry point to the portal. Holds credentials; every [`Client::login`]
/// yields a fresh [`Session`] with its own cookie jar.
pub struct Client {
    config: config::OmnisenseConfig,
}

impl Client {
    pub fn new(config: config::OmnisenseConfig) -> Self {
        Self { config }
    }

    pub fn base_url(&self) -> &str {
        &self.config.url
    }

    /// Submits the log-in form.
    ///
    /// The portal answers bad credentials with `200 OK` and the log-in page
    /// itself, so success requires both a 200 and a body without the form.
    pub async fn login(&self) -> Result<Session, OmnisenseError> {
        let timeout_secs = self.config.request_timeout_sec;
        let http_client = HttpClient::builder()
            .cookie_store(true)
            .timeout(self.config.request_timeout())
            .build()?;

        let url = format!("{}{}", self.config.url, LOGIN_PATH);
        let form = [
            ("userId", self.config.username.as_str()),
            ("userPass", self.config.password.as_str()),
            ("btnAct", "Log-In"),
            ("target", ""),
        ];
        let response = http_client
            .post(&url)
            .header("user-agent", "reqwest")
            .form(&form)
            .send()
            .await
            .map_err(|e| OmnisenseError::from_request(e, timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OmnisenseError::from_request(e, timeout_secs))?;

        if status != StatusCode::OK {
            tracing::warn!(status = %status, "Login rejected by portal");
            return Err(OmnisenseError::authentication(format!(
                "login answered with status {}",
                status
            )));
        }
        if contains_login_form(&body) {
            tracing::warn!("Login rejected by portal, check credentials");
            return Err(OmnisenseError::authentication(
                "portal returned the log-in form",
            ));
        }

        tracing::debug!(user = %self.config.username, "Login successful");
        Ok(Session {
            http_client: Some(http_client),
            base_url: self.config.url.clone(),
            timeout_secs,
        })
    }
}

/// Authenticated transport handle for one poll cycle.
///
/// Closing is idempotent and also happens on drop, so a cycle that is
/// abandoned mid-flight still releases its connections.
pub struct Session {
    http_client: Option<HttpClient>,
    base_url: String,
    timeout_secs: u64,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.http_client.is_some()
    }

    /// Fetches a portal page with the session's cookies.
    pub async fn get(&self, path: &str) -> Result<String, OmnisenseError> {
        let http_client = self
            .http_client
            .as_ref()
            .ok_or_else(|| OmnisenseError::authentication("session is closed"))?;

        let url = format!("{}{}", self.base_url, path);
        let response = http_client
            .get(&url)
            .header("user-agent", "reqwest")
            .send()
            .await
            .map_err(|e| OmnisenseError::from_request(e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OmnisenseError::from_request(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(OmnisenseError::server_error(status, body));
        }
        if contains_login_form(&body) {
            return Err(OmnisenseError::authentication(
                "session rejected, portal served the log-in form",
            ));
        }
        Ok(body)
    }

    pub fn close(&mut self) {
        if self.http_client.take().is_some() {
            tracing::trace!("Session closed");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
