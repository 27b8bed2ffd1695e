/*!
Test harness for agent integration tests

Wraps a [`StubMiner`] with:
- Logging initialisation for tests
- Ready-made connection parameters
- Assertions on the requests the client sent
*/

use crate::miner_stub::{RecordedRequest, StubMiner, StubResponse};
use anyhow::Result;
use serde_json::Value;

pub const USERNAME: &str = "root";
pub const PASSWORD: &str = "root";

/// A stub miner plus the credentials a client should use against it
pub struct TestHarness {
    pub miner: StubMiner,
}

impl TestHarness {
    /// Stub serving `doc` behind Digest auth for `root`/`root`
    pub async fn serving(doc: &Value) -> Result<Self> {
        Self::with_response(StubResponse::Body(doc.to_string())).await
    }

    pub async fn with_response(response: StubResponse) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging for tests
        let miner = StubMiner::start(USERNAME, PASSWORD, response).await?;
        Ok(Self { miner })
    }

    pub fn host(&self) -> String {
        self.miner.host()
    }

    pub fn port(&self) -> u16 {
        self.miner.port()
    }

    /// Asserts the client answered the challenge exactly once
    pub fn assert_authenticated_once(&self) -> Result<()> {
        let authenticated = self.miner.authenticated_requests();
        if authenticated.len() != 1 {
            anyhow::bail!(
                "expected 1 authenticated request, got {} (of {} total)",
                authenticated.len(),
                self.miner.requests().len()
            );
        }
        log::info!("✅ Client authenticated once");
        Ok(())
    }

    /// Asserts every request targeted `path`
    pub fn assert_all_requests_to(&self, path: &str) -> Result<()> {
        let requests: Vec<RecordedRequest> = self.miner.requests();
        if let Some(other) = requests.iter().find(|r| r.path != path || r.method != "GET") {
            anyhow::bail!("unexpected request {} {}", other.method, other.path);
        }
        Ok(())
    }
}

/// Address nothing listens on, for connection-refused tests
pub async fn closed_port() -> Result<u16> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}
