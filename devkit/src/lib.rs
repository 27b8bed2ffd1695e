/*!
# Antminer DevKit - test support for the agent

Provides:
- A stub miner HTTP server with Digest auth
- Builders for `stats.cgi` status documents
- A harness wiring both together for integration tests
*/

pub mod fixtures;
pub mod miner_stub;
pub mod test_utils;

pub use fixtures::{sample_s19k_pro, ChainBuilder, StatusBuilder};
pub use miner_stub::{DigestAuthorization, RecordedRequest, StubMiner, StubResponse};
pub use test_utils::TestHarness;
