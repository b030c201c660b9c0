//! HTTP transport for SOAP calls.
//!
//! [`SoapTransport`] is the seam between operation logic and the wire; the
//! production implementation posts envelopes with `reqwest`, tests swap in
//! a scripted double from [`crate::testing`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::config::NiraConfig;
use crate::errors::{NiraError, Result};
use crate::soap::{self, RequestBody, XmlNode};
use crate::ws_security::SecurityHeader;

/// Content type of SOAP 1.1 requests.
const TEXT_XML: &str = "text/xml; charset=utf-8";

/// Default round-trip timeout for registry calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Carries a rendered operation call to the registry and returns the parsed
/// response document.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn call(
        &self,
        operation: &str,
        body: &RequestBody,
        token: &SecurityHeader,
    ) -> Result<XmlNode>;
}

/// [`SoapTransport`] over plain HTTP, the way the registry facade is
/// deployed.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    namespace: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport for the endpoint described by `config`.
    pub fn new(config: &NiraConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_TIMEOUT)
    }

    /// Builds a transport with an explicit request timeout.
    pub fn with_timeout(config: &NiraConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: config.endpoint_url(),
            namespace: config.namespace.clone(),
            http,
        })
    }

    /// Target URL calls are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SoapTransport for HttpTransport {
    async fn call(
        &self,
        operation: &str,
        body: &RequestBody,
        token: &SecurityHeader,
    ) -> Result<XmlNode> {
        let envelope = soap::build_envelope(&self.namespace, operation, body, token);
        debug!(operation = %operation, endpoint = %self.endpoint, "posting SOAP request");

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, TEXT_XML)
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        // Faults usually arrive with a 500; parse first so the fault text
        // wins over the bare status line.
        let document = match soap::parse_document(&raw) {
            Ok(document) => document,
            Err(_) if !status.is_success() => {
                return Err(NiraError::envelope(format!(
                    "registry endpoint answered HTTP {status}"
                )));
            }
            Err(err) => return Err(err),
        };

        if let Some(fault) = soap::fault_message(&document) {
            debug!(operation = %operation, %status, "registry answered with a SOAP fault");
            return Err(NiraError::envelope(fault));
        }
        if !status.is_success() {
            return Err(NiraError::envelope(format!(
                "registry endpoint answered HTTP {status}"
            )));
        }
        Ok(document)
    }
}
