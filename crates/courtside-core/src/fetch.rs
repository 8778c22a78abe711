//! Resilient fetch of one work unit from the league game log endpoint.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cancel::{CancellationToken, Sleeper, TokioSleeper};
use crate::config::{PipelineConfig, UpstreamConfig};
use crate::domain::{RawRecordMap, WorkUnitKey};
use crate::error::{body_excerpt, FetchError};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;
use crate::throttling::RequestPacer;

/// HTTP client for the league game log with bounded retries.
pub struct FetchClient {
    http: Arc<dyn HttpClient>,
    upstream: UpstreamConfig,
    retry: RetryPolicy,
    request_timeout_ms: u64,
    sleeper: Arc<dyn Sleeper>,
    pacer: Option<RequestPacer>,
}

impl FetchClient {
    pub fn new(http: Arc<dyn HttpClient>, upstream: UpstreamConfig, retry: RetryPolicy) -> Self {
        Self {
            http,
            upstream,
            retry,
            request_timeout_ms: 45_000,
            sleeper: Arc::new(TokioSleeper),
            pacer: None,
        }
    }

    /// Client configured from the pipeline settings, pacing included.
    pub fn from_config(config: &PipelineConfig, http: Arc<dyn HttpClient>) -> Self {
        Self::new(http, config.upstream.clone(), config.retry.policy())
            .with_request_timeout_ms(config.request_timeout_ms)
            .with_pacer(RequestPacer::from_millis(config.min_request_interval_ms))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_pacer(mut self, pacer: Option<RequestPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The GET request for `unit`.
    pub fn build_request(&self, unit: &WorkUnitKey) -> HttpRequest {
        let upstream = &self.upstream;
        HttpRequest::get(upstream.endpoint_url())
            .with_query("Counter", "0")
            .with_query("Direction", upstream.direction.as_str())
            .with_query("LeagueID", upstream.league_id.as_str())
            .with_query("PlayerOrTeam", upstream.player_or_team.as_str())
            .with_query("Season", unit.as_str())
            .with_query("SeasonType", upstream.season_type.as_str())
            .with_query("Sorter", upstream.sorter.as_str())
            .with_headers(&upstream.headers)
            .with_timeout_ms(self.request_timeout_ms)
    }

    /// Fetch every raw record of `unit`.
    ///
    /// Transient failures are retried up to the policy's attempt budget, sleeping
    /// `backoff_factor^n` seconds after failed attempt `n`. There is no sleep after
    /// the last attempt. Cancellation is checked before each attempt and raced
    /// against every wait.
    pub async fn fetch_work_unit(
        &self,
        unit: &WorkUnitKey,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawRecordMap>, FetchError> {
        let request = self.build_request(unit);
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            attempt += 1;

            if let Some(pacer) = &self.pacer {
                tokio::select! {
                    () = pacer.ready() => {}
                    () = cancel.cancelled() => return Err(FetchError::Cancelled),
                }
            }

            debug!(unit = %unit, attempt, url = %request.full_url(), "requesting work unit");
            let outcome = tokio::select! {
                outcome = self.attempt(request.clone()) => outcome,
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
            };

            let error = match outcome {
                Ok(records) => {
                    info!(unit = %unit, attempt, records = records.len(), "fetched work unit");
                    return Ok(records);
                }
                Err(error) if error.is_transient() => error,
                Err(error) => {
                    warn!(unit = %unit, attempt, kind = error.kind().as_str(), %error, "terminal fetch failure");
                    return Err(error);
                }
            };

            if !self.retry.has_attempts_after(attempt) {
                warn!(unit = %unit, attempts = attempt, %error, "retry budget exhausted");
                return Err(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.retry.delay_after_attempt(attempt);
            warn!(
                unit = %unit,
                attempt,
                status = ?error.status(),
                cause = %error,
                delay_ms = delay.as_millis() as u64,
                "transient fetch failure, backing off"
            );
            tokio::select! {
                () = self.sleeper.sleep(delay) => {}
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
            }
        }
    }

    async fn attempt(&self, request: HttpRequest) -> Result<Vec<RawRecordMap>, FetchError> {
        let response = self.http.execute(request).await.map_err(|error| {
            if error.retryable() {
                FetchError::TransientNetwork {
                    kind: error.kind(),
                    message: error.message().to_string(),
                }
            } else {
                FetchError::UpstreamProtocol(format!("request could not be sent: {error}"))
            }
        })?;

        classify_response(&response, &self.retry)?;
        parse_result_set(&response.body)
    }
}

/// Map a non-success response onto a [`FetchError`].
fn classify_response(response: &HttpResponse, retry: &RetryPolicy) -> Result<(), FetchError> {
    if response.is_success() {
        return Ok(());
    }

    let status = response.status;
    let body = body_excerpt(&response.body);
    if retry.should_retry_status(status) {
        return Err(if status == 429 {
            FetchError::RateLimited { status, body }
        } else {
            FetchError::UpstreamServer { status, body }
        });
    }
    if (400..500).contains(&status) {
        return Err(FetchError::UpstreamClient { status, body });
    }
    Err(FetchError::UpstreamProtocol(format!(
        "unexpected HTTP {status}: {body}"
    )))
}

/// Zip the first result set's `rowSet` with its `headers`.
///
/// Values are kept exactly as received. Accepts `resultSets[0]` or a singular
/// `resultSet` object.
pub fn parse_result_set(body: &str) -> Result<Vec<RawRecordMap>, FetchError> {
    let document: Value = serde_json::from_str(body).map_err(|error| {
        FetchError::UpstreamProtocol(format!(
            "response is not JSON ({error}): {}",
            body_excerpt(body)
        ))
    })?;

    let result_set = document
        .get("resultSets")
        .and_then(Value::as_array)
        .and_then(|sets| sets.first())
        .or_else(|| document.get("resultSet").filter(|set| set.is_object()))
        .ok_or_else(|| FetchError::UpstreamProtocol(String::from("response has no result set")))?;

    let headers = result_set
        .get("headers")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::UpstreamProtocol(String::from("result set has no headers")))?
        .iter()
        .map(|header| {
            header.as_str().map(ToString::to_string).ok_or_else(|| {
                FetchError::UpstreamProtocol(format!("header is not a string: {header}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rows = result_set
        .get("rowSet")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::UpstreamProtocol(String::from("result set has no rowSet")))?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let values = row.as_array().ok_or_else(|| {
                FetchError::UpstreamProtocol(format!("row {index} is not an array"))
            })?;
            if values.len() != headers.len() {
                return Err(FetchError::UpstreamProtocol(format!(
                    "row {index} has {} values for {} headers",
                    values.len(),
                    headers.len()
                )));
            }
            Ok(headers.iter().cloned().zip(values.iter().cloned()).collect())
        })
        .collect()
}
