use async_trait::async_trait;
use scraper::Html;
use std::collections::HashSet;

use crate::error::OmnisenseError;
use crate::model::{Site, SitePage};
use crate::omnisense::client::{Client, Session, SENSOR_LIST_PATH, SITE_LIST_PATH};
use crate::omnisense::parsers::{parse_sensor_page, parse_site_list};

/// Something that can open authenticated sessions against the portal.
///
/// The coordinator only talks to the portal through this trait, so tests can
/// script sessions without a web server.
#[async_trait]
pub trait SensorPortal: Send + Sync {
    /// Performs the login handshake.
    async fn login(&self) -> Result<Box<dyn PortalSession>, OmnisenseError>;
}

/// An authenticated session, valid for one poll cycle.
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// Lists every site visible to the account.
    async fn list_sites(&self) -> Result<Vec<Site>, OmnisenseError>;

    /// Fetches and parses one site's sensor page.
    async fn fetch_sensor_page(
        &self,
        site_id: &str,
        sensor_filter: &HashSet<String>,
    ) -> Result<SitePage, OmnisenseError>;

    /// Releases the transport. Calling it twice is harmless.
    fn close(&mut self);
}

#[async_trait]
impl SensorPortal for Client {
    async fn login(&self) -> Result<Box<dyn PortalSession>, OmnisenseError> {
        let session = Client::login(self).await?;
        Ok(Box::new(session))
    }
}

#[async_trait]
impl PortalSession for Session {
    async fn list_sites(&self) -> Result<Vec<Site>, OmnisenseError> {
        let body = self.get(SITE_LIST_PATH).await?;
        let sites = parse_site_list(&Html::parse_document(&body))?;
        Ok(sites)
    }

    async fn fetch_sensor_page(
        &self,
        site_id: &str,
        sensor_filter: &HashSet<String>,
    ) -> Result<SitePage, OmnisenseError> {
        let body = self
            .get(&format!("{}?siteNbr={}", SENSOR_LIST_PATH, site_id))
            .await?;
        let page = parse_sensor_page(&Html::parse_document(&body), sensor_filter)?;
        Ok(page)
    }

    fn close(&mut self) {
        Session::close(self);
    }
}
