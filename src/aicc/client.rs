use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = "CardVault/0.1";

/// Card details returned by the distribution site; only `file` is required
/// to complete a download.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

fn parse_card_id(card_id: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = card_id.split('/').collect();
    if parts.len() != 3 || parts[0] != "AICC" {
        return Err(anyhow!(
            "invalid card id `{card_id}`; expected AICC/author/title"
        ));
    }
    Ok((
        urlencoding::encode(parts[1]).into_owned(),
        urlencoding::encode(parts[2]).into_owned(),
    ))
}

/// Download a distributed card image to `target`, returning the card
/// details the site reported.
pub fn fetch_card(
    base_url: &str,
    timeout_secs: u64,
    card_id: &str,
    target: &Path,
) -> Result<CardDetails> {
    let (author, title) = parse_card_id(card_id)?;
    let url = format!("{}/{author}/{title}", base_url.trim_end_matches('/'));

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build http client")?;

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .with_context(|| format!("card details request failed: {url}"))?;
    if !response.status().is_success() {
        return Err(anyhow!("card details request returned {}", response.status()));
    }
    let details: CardDetails = response
        .json()
        .context("card details response was not valid JSON")?;

    let file_url = details
        .file
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("card details carried no file url"))?;

    let download = client
        .get(file_url)
        .send()
        .with_context(|| format!("card download failed: {file_url}"))?;
    if !download.status().is_success() {
        return Err(anyhow!("card download returned {}", download.status()));
    }
    let bytes = download.bytes().context("failed to read card download")?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(target, &bytes).with_context(|| format!("failed to write {}", target.display()))?;

    Ok(details)
}
