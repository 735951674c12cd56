//! Mock portals for testing.
//!
//! [`MockPortalServerBuilder`] serves portal pages over HTTP for client tests.
//! [`MockPortal`] skips HTTP entirely and hands out scripted sessions, while
//! counting logins and open sessions so coordinator tests can check overlap
//! and release.

use async_trait::async_trait;
use mockito::{Mock, Server, ServerGuard};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::OmnisenseError;
use crate::model::{Site, SitePage};
use crate::omnisense::client::{LOGIN_PATH, SENSOR_LIST_PATH, SITE_LIST_PATH};
use crate::omnisense::{PortalSession, SensorPortal};
use crate::test_utils::html::{login_page_html, sensor_page_html, site_list_html};

/// Builder for mockito servers answering like the portal.
pub struct MockPortalServerBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl MockPortalServerBuilder {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Accepts any credentials and sets a session cookie.
    pub async fn mock_login_ok(mut self) -> Self {
        let mock = self
            .server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_header("set-cookie", "ASPSESSIONID=test; path=/")
            .with_body("<html><head><title>Welcome</title></head><body>Welcome</body></html>")
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Answers the log-in POST with the log-in page again.
    pub async fn mock_login_rejected(mut self) -> Self {
        let mock = self
            .server
            .mock("POST", LOGIN_PATH)
            .with_status(200)
            .with_body(login_page_html())
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    pub async fn mock_site_list(mut self, sites: &[(&str, &str)]) -> Self {
        let mock = self
            .server
            .mock("GET", SITE_LIST_PATH)
            .with_status(200)
            .with_body(site_list_html(sites))
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Serves the log-in page where the site list should be.
    pub async fn mock_site_list_expired(mut self) -> Self {
        let mock = self
            .server
            .mock("GET", SITE_LIST_PATH)
            .with_status(200)
            .with_body(login_page_html())
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    pub async fn mock_sensor_page(mut self, site_id: &str, site_name: &str, tables: &[String]) -> Self {
        let mock = self
            .server
            .mock(
                "GET",
                format!("{}?siteNbr={}", SENSOR_LIST_PATH, site_id).as_str(),
            )
            .with_status(200)
            .with_body(sensor_page_html(site_name, tables))
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Serves an arbitrary body at `path`.
    pub async fn mock_page(mut self, path: &str, body: &str) -> Self {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }
}

type ErrorFactory = Arc<dyn Fn() -> OmnisenseError + Send + Sync>;

#[derive(Clone)]
enum PageScript {
    Page(SitePage),
    Error(ErrorFactory),
}

/// Script for what each session returns.
#[derive(Clone, Default)]
pub struct MockSession {
    sites: Vec<Site>,
    site_list_error: Option<ErrorFactory>,
    pages: HashMap<String, PageScript>,
    page_delay: Duration,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sites(mut self, sites: Vec<Site>) -> Self {
        self.sites = sites;
        self
    }

    pub fn with_site_list_error<F>(mut self, make_error: F) -> Self
    where
        F: Fn() -> OmnisenseError + Send + Sync + 'static,
    {
        self.site_list_error = Some(Arc::new(make_error));
        self
    }

    pub fn with_page(mut self, site_id: &str, page: SitePage) -> Self {
        self.pages.insert(site_id.to_string(), PageScript::Page(page));
        self
    }

    pub fn with_page_error<F>(mut self, site_id: &str, make_error: F) -> Self
    where
        F: Fn() -> OmnisenseError + Send + Sync + 'static,
    {
        self.pages
            .insert(site_id.to_string(), PageScript::Error(Arc::new(make_error)));
        self
    }

    /// Every sensor page fetch sleeps this long first.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

#[derive(Default)]
struct SessionStats {
    logins: AtomicUsize,
    site_list_calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    closes: AtomicUsize,
}

/// A [`SensorPortal`] whose sessions follow a [`MockSession`] script.
///
/// The script and the login outcome can be swapped while a coordinator runs.
pub struct MockPortal {
    script: Mutex<MockSession>,
    login_error: Mutex<Option<ErrorFactory>>,
    stats: Arc<SessionStats>,
}

impl MockPortal {
    pub fn new(script: MockSession) -> Self {
        Self {
            script: Mutex::new(script),
            login_error: Mutex::new(None),
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Sessions opened after this call follow the new script.
    pub fn set_script(&self, script: MockSession) {
        *self.script.lock().unwrap() = script;
    }

    pub fn fail_logins<F>(&self, make_error: F)
    where
        F: Fn() -> OmnisenseError + Send + Sync + 'static,
    {
        *self.login_error.lock().unwrap() = Some(Arc::new(make_error));
    }

    pub fn allow_logins(&self) {
        *self.login_error.lock().unwrap() = None;
    }

    pub fn logins(&self) -> usize {
        self.stats.logins.load(Ordering::SeqCst)
    }

    pub fn site_list_calls(&self) -> usize {
        self.stats.site_list_calls.load(Ordering::SeqCst)
    }

    /// Sessions handed out and not yet closed or dropped.
    pub fn active_sessions(&self) -> usize {
        self.stats.active.load(Ordering::SeqCst)
    }

    pub fn max_active_sessions(&self) -> usize {
        self.stats.max_active.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorPortal for MockPortal {
    async fn login(&self) -> Result<Box<dyn PortalSession>, OmnisenseError> {
        self.stats.logins.fetch_add(1, Ordering::SeqCst);

        let login_error = self.login_error.lock().unwrap().clone();
        if let Some(make_error) = login_error {
            return Err(make_error());
        }

        let script = self.script.lock().unwrap().clone();
        Ok(Box::new(ScriptedSession::open(script, self.stats.clone())))
    }
}

struct ScriptedSession {
    script: MockSession,
    stats: Arc<SessionStats>,
    open: bool,
}

impl ScriptedSession {
    fn open(script: MockSession, stats: Arc<SessionStats>) -> Self {
        let active = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_active.fetch_max(active, Ordering::SeqCst);
        Self {
            script,
            stats,
            open: true,
        }
    }

    fn ensure_open(&self) -> Result<(), OmnisenseError> {
        if self.open {
            Ok(())
        } else {
            Err(OmnisenseError::authentication("session is closed"))
        }
    }
}

#[async_trait]
impl PortalSession for ScriptedSession {
    async fn list_sites(&self) -> Result<Vec<Site>, OmnisenseError> {
        self.ensure_open()?;
        self.stats.site_list_calls.fetch_add(1, Ordering::SeqCst);
        match &self.script.site_list_error {
            Some(make_error) => Err(make_error()),
            None => Ok(self.script.sites.clone()),
        }
    }

    async fn fetch_sensor_page(
        &self,
        site_id: &str,
        sensor_filter: &HashSet<String>,
    ) -> Result<SitePage, OmnisenseError> {
        if !self.script.page_delay.is_zero() {
            tokio::time::sleep(self.script.page_delay).await;
        }
        self.ensure_open()?;

        match self.script.pages.get(site_id) {
            Some(PageScript::Page(page)) => {
                let mut page = page.clone();
                if !sensor_filter.is_empty() {
                    page.rows.retain(|row| sensor_filter.contains(&row.sensor_id));
                }
                Ok(page)
            }
            Some(PageScript::Error(make_error)) => Err(make_error()),
            None => Err(OmnisenseError::ServerError {
                status: 404,
                message: format!("no page scripted for site {}", site_id),
            }),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.stats.active.fetch_sub(1, Ordering::SeqCst);
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::site_page;

    #[tokio::test]
    async fn test_mock_portal_server_builder() {
        let server = MockPortalServerBuilder::new()
            .await
            .mock_login_ok()
            .await
            .mock_site_list(&[("1234", "Home")])
            .await;

        assert!(server.url().starts_with("http://"));
    }

    #[tokio::test]
    async fn test_mock_portal_tracks_sessions() {
        let portal = MockPortal::new(MockSession::new().with_page("1", site_page("Home", &["A"])));

        let mut first = portal.login().await.unwrap();
        let second = portal.login().await.unwrap();
        assert_eq!(portal.active_sessions(), 2);

        first.close();
        first.close();
        drop(second);

        assert_eq!(portal.logins(), 2);
        assert_eq!(portal.active_sessions(), 0);
        assert_eq!(portal.max_active_sessions(), 2);
        assert_eq!(portal.closes(), 2);
    }

    #[tokio::test]
    async fn test_mock_portal_login_failure() {
        let portal = MockPortal::new(MockSession::new());
        portal.fail_logins(|| OmnisenseError::authentication("bad password"));
        assert!(portal.login().await.is_err());

        portal.allow_logins();
        assert!(portal.login().await.is_ok());
    }

    #[tokio::test]
    async fn test_scripted_session_applies_filter() {
        let portal = MockPortal::new(
            MockSession::new().with_page("1", site_page("Home", &["A", "B"])),
        );
        let session = portal.login().await.unwrap();
        let filter: HashSet<String> = ["B".to_string()].into_iter().collect();

        let page = session.fetch_sensor_page("1", &filter).await.unwrap();
        assert_eq!(page.rows.len(), 1);

        let err = session.fetch_sensor_page("2", &filter).await.unwrap_err();
        assert!(err.is_transport());
    }
}
