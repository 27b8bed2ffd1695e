//! `stats.cgi` client
//!
//! One GET per poll. The miner's lighttpd answers the first request with a
//! Digest challenge; the request is replayed once with the computed
//! `Authorization` header. No retries beyond that.

use digest_auth::AuthContext;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MinerConfig;
use crate::document::StatusDocument;
use crate::error::{MinerError, MinerResult};

pub const STATS_PATH: &str = "/cgi-bin/stats.cgi";

#[derive(Debug, Clone)]
pub struct MinerClient {
    http: reqwest::Client,
    config: MinerConfig,
}

impl MinerClient {
    pub fn new(config: MinerConfig) -> MinerResult<Self> {
        let timeout = config.timeout();
        Self::with_timeout(config, timeout)
    }

    /// Same as [`MinerClient::new`] with a sub-second timeout allowed
    pub fn with_timeout(config: MinerConfig, timeout: Duration) -> MinerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("antminer-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Fetches and decodes the status document
    pub async fn fetch_status(&self) -> MinerResult<StatusDocument> {
        let url = self.config.stats_url();
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| MinerError::Auth("401 without a WWW-Authenticate challenge".to_string()))?;
            let authorization = self.answer_challenge(challenge)?;
            debug!("Replaying request with Digest credentials for {}", self.config.username);
            self.http
                .get(&url)
                .header(AUTHORIZATION, authorization)
                .send()
                .await?
        } else {
            response
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(MinerError::Auth(format!(
                "credentials rejected for user '{}'",
                self.config.username
            )));
        }
        if !status.is_success() {
            return Err(MinerError::Http(status));
        }

        let body = response.text().await?;
        let doc = StatusDocument::from_json(&body)?;
        info!("Fetched status from {} ({} bytes)", self.config.host, body.len());
        Ok(doc)
    }

    fn answer_challenge(&self, challenge: &str) -> MinerResult<String> {
        let mut prompt =
            digest_auth::parse(challenge).map_err(|e| MinerError::Auth(e.to_string()))?;
        let context = AuthContext::new(
            self.config.username.as_str(),
            self.config.password.as_str(),
            STATS_PATH,
        );
        let answer = prompt
            .respond(&context)
            .map_err(|e| MinerError::Auth(e.to_string()))?;
        Ok(answer.to_header_string())
    }
}
