use super::{AuthResponse, Remote};
use crate::model::{Entry, EvaluationRequest, EvaluationResult, Snapshot};
use crate::settings::ClientContext;
use crate::{Error, Result};
use async_trait::async_trait;
use core::time::Duration;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = "    remote";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_KEY_HEADER: &str = "switcher-api-key";

#[derive(Serialize)]
struct AuthRequest<'a> {
    domain: &'a str,
    component: &'a str,
    environment: &'a str,
}

#[derive(Deserialize)]
struct VersionStatus {
    status: bool,
}

#[derive(Serialize)]
struct CriteriaRequest<'a> {
    entry: &'a [Entry],
}

#[derive(Serialize)]
struct GraphQlRequest {
    query: String,
}

#[derive(Serialize)]
struct SwitchersRequest<'a> {
    switchers: &'a [String],
}

#[derive(Deserialize)]
struct SwitchersResponse {
    #[serde(default)]
    not_found: Vec<String>,
}

/// [`Remote`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
    api_key: HeaderValue,
    domain: String,
    component: String,
    environment: String,
}

impl HttpRemote {
    /// Create a remote for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the context lacks remote fields or
    /// the url is malformed.
    pub fn new(context: &ClientContext) -> Result<Self> {
        context.require_remote()?;

        let raw_url = context.url.as_deref().unwrap_or_default();
        let base_url = Url::parse(raw_url.trim_end_matches('/')).map_err(|e| Error::config(format!("invalid API url '{raw_url}': {e}")))?;

        let mut api_key =
            HeaderValue::from_str(context.api_key.as_deref().unwrap_or_default()).map_err(|e| Error::config(format!("invalid API Key: {e}")))?;
        api_key.set_sensitive(true);

        let client = reqwest::Client::builder()
            .user_agent(concat!("switcher-client/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("unable to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            domain: context.domain.clone(),
            component: context.component.clone().unwrap_or_default(),
            environment: context.environment.clone(),
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn domain_query(&self) -> String {
        // serde_json quoting doubles as GraphQL string escaping
        let quote = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
        format!(
            "query domain {{ domain(name: {}, environment: {}, _component: {}) {{ \
             name version activated \
             group {{ name activated \
             config {{ key activated \
             strategies {{ strategy activated operation values }} \
             relay {{ type activated }} \
             components }} }} }} }}",
            quote(&self.domain),
            quote(&self.environment),
            quote(&self.component)
        )
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn authenticate(&self) -> Result<AuthResponse> {
        log::debug!(target: LOG_TARGET, "Authenticating component '{}' on domain '{}'", self.component, self.domain);

        let response = self
            .client
            .post(self.endpoint("/criteria/auth"))
            .header(API_KEY_HEADER, self.api_key.clone())
            .json(&AuthRequest {
                domain: &self.domain,
                component: &self.component,
                environment: &self.environment,
            })
            .send()
            .await?;

        read_json(response).await
    }

    async fn check_snapshot_version(&self, token: &str, version: u64) -> Result<bool> {
        let response = self
            .client
            .get(self.endpoint(&format!("/criteria/snapshot_check/{version}")))
            .bearer_auth(token)
            .send()
            .await?;

        let status: VersionStatus = read_json(response).await?;
        log::debug!(target: LOG_TARGET, "Snapshot version {version} is current: {}", status.status);
        Ok(status.status)
    }

    async fn fetch_snapshot(&self, token: &str) -> Result<Snapshot> {
        let response = self
            .client
            .post(self.endpoint("/graphql"))
            .bearer_auth(token)
            .json(&GraphQlRequest { query: self.domain_query() })
            .send()
            .await?;

        read_json(response).await
    }

    async fn evaluate(&self, token: &str, request: &EvaluationRequest, show_detail: bool) -> Result<EvaluationResult> {
        let mut url = Url::parse(&self.endpoint("/criteria")).map_err(|e| Error::config(format!("invalid API url: {e}")))?;
        let _ = url
            .query_pairs_mut()
            .append_pair("key", request.key())
            .append_pair("showReason", if show_detail { "true" } else { "false" });

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&CriteriaRequest { entry: request.entries() })
            .send()
            .await?;

        read_json(response).await
    }

    async fn check_switchers(&self, token: &str, keys: &[String]) -> Result<Vec<String>> {
        let response = self
            .client
            .post(self.endpoint("/criteria/switchers_check"))
            .bearer_auth(token)
            .json(&SwitchersRequest { switchers: keys })
            .send()
            .await?;

        let body: SwitchersResponse = read_json(response).await?;
        Ok(body.not_found)
    }

    async fn health(&self) -> bool {
        match self.client.get(self.endpoint("/check")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Health check failed: {e}");
                false
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Remote {
            status: Some(status.as_u16()),
            message: format!("{status}: {body}"),
        });
    }

    response.json::<T>().await.map_err(|e| Error::Remote {
        status: Some(status.as_u16()),
        message: format!("malformed response: {e}"),
    })
}
