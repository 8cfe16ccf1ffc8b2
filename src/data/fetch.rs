//! HTML fetcher for the listing pages.
//!
//! Redirects are followed by hand so the hop count can be capped. Failed
//! attempts are retried with exponential backoff when the failure looks
//! transient (connection errors, timeouts, 429, 5xx). Every request is clamped to
//! what is left of the run's wall-clock budget.

use std::time::{Duration, Instant};

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::{debug, warn};

use crate::domain::FetchConfig;
use crate::error::{AppError, ScrapeError};

/// Wall-clock budget shared by everything a run does.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    /// Time left, or `Timeout` once the budget is spent.
    pub fn check(&self) -> Result<Duration, ScrapeError> {
        self.budget
            .checked_sub(self.started.elapsed())
            .filter(|left| !left.is_zero())
            .ok_or(ScrapeError::Timeout { budget: self.budget })
    }
}

/// Anything that can hand back the HTML behind a URL.
///
/// The pipeline only talks to this trait, so tests can serve fixture pages.
pub trait HtmlSource: Send + Sync {
    fn fetch(&self, url: &str, deadline: &Deadline) -> Result<String, ScrapeError>;
}

/// `reqwest`-backed source used for real runs.
pub struct HttpFetcher {
    client: Client,
    request_timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            max_redirects: config.max_redirects,
        })
    }

    /// One logical GET: follows redirects, no retries.
    fn fetch_once(&self, url: &str, deadline: &Deadline) -> Result<String, ScrapeError> {
        let mut current =
            Url::parse(url).map_err(|e| ScrapeError::network(url, format!("invalid URL: {e}")))?;

        for hop in 0..=self.max_redirects {
            let remaining = deadline.check()?;
            let resp = self
                .client
                .get(current.clone())
                .timeout(remaining.min(self.request_timeout))
                .send()
                .map_err(|e| {
                    if e.is_timeout() && deadline.is_expired() {
                        ScrapeError::Timeout {
                            budget: deadline.budget(),
                        }
                    } else {
                        ScrapeError::network(current.as_str(), e.to_string())
                    }
                })?;

            let status = resp.status();
            if matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
                let location = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| ScrapeError::Network {
                        url: current.to_string(),
                        status: Some(status.as_u16()),
                        reason: "redirect without a Location header".to_string(),
                    })?;
                let next = current.join(location).map_err(|e| {
                    ScrapeError::network(current.as_str(), format!("invalid redirect target '{location}': {e}"))
                })?;
                debug!(hop, from = %current, to = %next, status = status.as_u16(), "following redirect");
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(ScrapeError::Network {
                    url: current.to_string(),
                    status: Some(status.as_u16()),
                    reason: format!("HTTP {status}"),
                });
            }

            return resp
                .text()
                .map_err(|e| ScrapeError::network(current.as_str(), format!("failed to read body: {e}")));
        }

        Err(ScrapeError::RedirectLoop {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }
}

impl HtmlSource for HttpFetcher {
    fn fetch(&self, url: &str, deadline: &Deadline) -> Result<String, ScrapeError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay.saturating_mul(2u32.saturating_pow(attempt - 1));
                let remaining = deadline.check()?;
                std::thread::sleep(delay.min(remaining));
            }

            match self.fetch_once(url, deadline) {
                Ok(body) => {
                    debug!(url, bytes = body.len(), attempt, "fetched page");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() => {
                    warn!(url, attempt, error = %e, "fetch attempt failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ScrapeError::network(url, "retries exhausted")))
    }
}
