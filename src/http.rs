use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

const USER_AGENT: &str = "Mozilla/5.0";
const TIMEOUT_SECS: u64 = 30;

/// Shared HTTP client: browser-ish User-Agent, fixed 30s timeout, no retries.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")
}
