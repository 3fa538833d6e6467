//! LLM API interaction with exponential backoff retry logic.
//!
//! This module provides the interface used to talk to an OpenAI-compatible
//! chat completions endpoint. It includes automatic retry logic with
//! exponential backoff and jitter to handle transient failures gracefully.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`ChatClient`]: Sends one user message to `/chat/completions`
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! [`backoff_delay`] is shared with the page fetcher so both kinds of
//! request back off the same way.

use crate::config::LlmConfig;
use crate::error::CrawlError;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

const MAX_DELAY: StdDuration = StdDuration::from_secs(30);

/// Trait for async LLM interaction.
///
/// Implementors send text to an LLM and receive a response. This
/// abstraction allows for different LLM backends or decorators (like retry
/// logic), and for scripted replies in tests.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Delay before retry number `attempt` (1-based).
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), 30s) + random_jitter(0..250ms)
/// ```
pub fn backoff_delay(attempt: usize, base_delay: StdDuration) -> StdDuration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    let delay = base_delay.saturating_mul(1 << shift).min(MAX_DELAY);
    let jitter_ms: u64 = rng().random_range(0..=250);
    delay + StdDuration::from_millis(jitter_ms)
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ChatClient::new(http, &config.llm, &config.llm.model, 400)?;
    /// let retry_client = RetryAsk::new(client, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = backoff_delay(attempt, self.base_delay);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// A single-turn client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// One client is bound to one model and one token budget; build a separate
/// client per task (classification, selection, narrative).
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ChatClient {
    pub fn new(
        http: reqwest::Client,
        config: &LlmConfig,
        model: &str,
        max_tokens: u32,
    ) -> Result<Self, CrawlError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CrawlError::Config("an LLM API key is required".into()))?;
        Ok(ChatClient {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            max_tokens,
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: text,
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(elapsed_ms = t0.elapsed().as_millis(), %status, "API call failed");
            return Err(Box::new(CrawlError::Classification(format!(
                "endpoint answered {status}"
            ))));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| CrawlError::Classification("reply had no message content".into()).into())
    }
}

/// Build a retrying chat client for one model and token budget.
pub fn chat_with_backoff(
    http: reqwest::Client,
    config: &LlmConfig,
    model: &str,
    max_tokens: u32,
) -> Result<RetryAsk<ChatClient>, CrawlError> {
    let client = ChatClient::new(http, config, model, max_tokens)?;
    Ok(RetryAsk::new(
        client,
        config.max_retries,
        StdDuration::from_secs(1),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Flaky {
        failures_left: Cell<usize>,
        calls: Cell<usize>,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err("temporarily unavailable".into());
            }
            Ok(format!("echo: {text}"))
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let api = RetryAsk::new(
            Flaky {
                failures_left: Cell::new(2),
                calls: Cell::new(0),
            },
            3,
            StdDuration::ZERO,
        );
        let reply = api.ask("hi").await.unwrap();
        assert_eq!(reply, "echo: hi");
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let api = RetryAsk::new(
            Flaky {
                failures_left: Cell::new(10),
                calls: Cell::new(0),
            },
            1,
            StdDuration::ZERO,
        );
        assert!(api.ask("hi").await.is_err());
        assert_eq!(api.inner.calls.get(), 2);
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let d = backoff_delay(1, StdDuration::from_secs(1));
        assert!(d >= StdDuration::from_secs(1) && d <= StdDuration::from_millis(1250));
        let d = backoff_delay(40, StdDuration::from_secs(1));
        assert!(d <= MAX_DELAY + StdDuration::from_millis(250));
    }

    #[test]
    fn test_chat_client_requires_key() {
        let config = LlmConfig::default();
        let err = ChatClient::new(reqwest::Client::new(), &config, "m", 10).unwrap_err();
        assert!(matches!(err, CrawlError::Config(_)));

        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            api_base: "http://localhost:8080/v1/".into(),
            ..LlmConfig::default()
        };
        let client = ChatClient::new(reqwest::Client::new(), &config, "m", 10).unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/v1/chat/completions");
        assert!(!format!("{client:?}").contains("sk-test"));
    }

    #[test]
    fn test_reply_parsing() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":" Summary: x\nCategories: [ESG] "}}]}"#,
        )
        .unwrap();
        assert_eq!(
            body.choices[0].message.content.as_deref(),
            Some(" Summary: x\nCategories: [ESG] ")
        );
    }
}
