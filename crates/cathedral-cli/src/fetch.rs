//! Remote dataset prefetch.
//!
//! Every catalog source is requested concurrently before the controller
//! touches a toggle; the bodies (or failure reasons) are handed to the
//! controller as a [`StaticSource`] so loading itself stays synchronous.

use std::time::Duration;

use anyhow::{Context, Result};
use cathedral_core::{SourceSpec, StaticSource};
use futures_util::future::join_all;
use serde_json::Value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn source_url(base_url: &str, location: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        location.trim_start_matches('/')
    )
}

pub async fn prefetch(base_url: &str, sources: &[SourceSpec]) -> Result<StaticSource> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let requests = sources.iter().map(|spec| {
        let client = &client;
        let url = source_url(base_url, &spec.location);
        async move { (spec.name.as_str(), fetch_one(client, &url).await) }
    });
    let results = join_all(requests).await;

    let mut source = StaticSource::new();
    for (name, body) in results {
        if let Err(reason) = &body {
            tracing::debug!("prefetch of '{name}' failed: {reason}");
        }
        source.insert(name, body);
    }
    Ok(source)
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> std::result::Result<Value, String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| format!("{url}: {e}"))?;
    response
        .json::<Value>()
        .await
        .map_err(|e| format!("{url}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_url_joins_cleanly() {
        assert_eq!(
            source_url("https://data.example/cathedral/", "/angels.json"),
            "https://data.example/cathedral/angels.json"
        );
        assert_eq!(
            source_url("http://localhost:8080", "codex.json"),
            "http://localhost:8080/codex.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_recorded_not_fatal() {
        use cathedral_core::DatasetSource;

        let specs = vec![SourceSpec {
            name: "codex_nodes".to_string(),
            location: "codex.json".to_string(),
        }];
        // port 9 (discard) on localhost is closed on test machines
        let source = prefetch("http://127.0.0.1:9", &specs).await.unwrap();
        assert!(source.fetch("codex_nodes", "codex.json").is_err());
    }
}
