//! OpenAI-compatible API client for pairwise comparisons.

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use fundrank_core::Outcome;

use crate::parse::parse_verdict;
use crate::prompt::build_prompt;

/// Configuration for the LLM endpoint.
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
}

/// Bounded exponential backoff for retryable oracle failures.
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_backoff: Duration,
}

const MAX_BACKOFF: Duration = Duration::from_secs(30);

impl RetryPolicy {
    /// Delay before retry `attempt` (0-based): initial * 2^attempt with
    /// uniform jitter so concurrent retries don't stampede, then hard-capped
    /// at 30s. The cap comes last so jitter can never push past it.
    pub fn delay(&self, attempt: usize) -> Duration {
        let base = self.initial_backoff.as_millis() as f64 * 2f64.powi(attempt as i32);
        let jitter = rand::rng().random_range(0.5..1.5);
        let capped = (base * jitter).min(MAX_BACKOFF.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// Send one HTTP request to the LLM and return the raw response text.
/// Returns Err only on HTTP/network failures.
async fn send_comparison_request(
    client: &Client,
    config: &LlmConfig,
    prompt: &str,
) -> Result<String, String> {
    let request = ChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![ChatMessage { role: "user", content: prompt.to_string() }],
        temperature: config.temperature,
        max_tokens: 2000,
    };

    let url = format!("{}/v1/chat/completions", config.endpoint.trim_end_matches('/'));

    let mut req_builder = client.post(&url).json(&request);
    if let Some(ref key) = config.api_key {
        req_builder = req_builder.bearer_auth(key);
    }

    let resp = req_builder.send().await.map_err(|e| format!("HTTP request failed: {e}"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(format!("LLM API returned {status}: {snippet}"));
    }

    let data: ChatCompletionResponse =
        resp.json().await.map_err(|e| format!("Failed to parse LLM response JSON: {e}"))?;

    let content = data
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or("No content in LLM response")?;

    Ok(content)
}

/// Ask the oracle to judge one pair, with retries on HTTP errors.
///
/// `Ok(Some(outcome))` is a verdict, `Ok(None)` a successful call whose text
/// had no parseable verdict; `Err` means every attempt failed. Callers record
/// both non-verdict cases as undecided, so an oracle failure is never fatal
/// to the run.
#[allow(clippy::too_many_arguments)]
pub async fn judge_pair(
    client: &Client,
    config: &LlmConfig,
    template: &str,
    criterion: &str,
    first_label: &str,
    second_label: &str,
    retry: &RetryPolicy,
    verbose: bool,
) -> Result<Option<Outcome>, String> {
    let prompt = build_prompt(template, criterion, first_label, second_label);

    let mut last_err = String::new();
    for attempt in 0..=retry.max_retries {
        match send_comparison_request(client, config, &prompt).await {
            Ok(content) => return Ok(parse_verdict(&content)),
            Err(e) => {
                last_err = e;
                if attempt < retry.max_retries {
                    let delay = retry.delay(attempt);
                    if verbose {
                        eprintln!(
                            "  Retry {}/{} for {} vs {} in {}ms: {}",
                            attempt + 1,
                            retry.max_retries,
                            first_label,
                            second_label,
                            delay.as_millis(),
                            last_err
                        );
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy { max_retries: 10, initial_backoff: Duration::from_millis(500) };
        // Jitter spans 0.5x..1.5x of the base; the 30s cap is absolute.
        for attempt in 0..10 {
            let base = 500.0 * 2f64.powi(attempt as i32);
            let delay = policy.delay(attempt).as_millis() as f64;
            let floor = (base * 0.5).min(30_000.0);
            assert!(delay >= floor - 1.0, "attempt {attempt}: {delay} below jitter floor");
            assert!(delay <= base * 1.5 + 1.0, "attempt {attempt}: {delay} above jitter ceiling");
            assert!(delay <= 30_000.0, "attempt {attempt}: {delay} exceeds the cap");
        }
    }

    #[test]
    fn test_backoff_cap_holds_under_repeated_jitter() {
        let policy = RetryPolicy { max_retries: 20, initial_backoff: Duration::from_secs(20) };
        // Base for attempt 4 is 320s; no jitter draw may escape the cap.
        for _ in 0..100 {
            assert!(policy.delay(4) <= MAX_BACKOFF);
        }
    }
}
