//! Behavior tests for the work-unit fetch client.
//!
//! These tests drive the retry loop against a scripted upstream and record
//! every backoff instead of sleeping.

use std::sync::Arc;
use std::time::Duration;

use courtside_core::{
    CancellationToken, FetchError, FetchErrorKind, HttpError, HttpErrorKind, RetryPolicy,
    WorkUnitKey,
};

use courtside_tests::{
    fetch_client, ok_season, status, upstream_row, CancellingSleeper, RecordingSleeper,
    ScriptedHttpClient,
};

const SEASON: &str = "2021-22";

fn unit() -> WorkUnitKey {
    WorkUnitKey::parse(SEASON).expect("unit")
}

fn one_game() -> Vec<serde_json::Value> {
    vec![
        upstream_row("0022100001", "2021-10-19", "MIL", 1, 32, "W"),
        upstream_row("0022100001", "2021-10-19", "MIL", 2, 20, "W"),
    ]
}

// =============================================================================
// Retry bound
// =============================================================================

#[tokio::test]
async fn when_upstream_recovers_before_budget_fetch_succeeds_after_k_backoffs() {
    for k in 0..5_usize {
        // Given: an upstream that answers 503 exactly k times, then 200
        let mut script = vec![status(503); k];
        script.push(ok_season(one_game()));
        let http = Arc::new(ScriptedHttpClient::new().script(SEASON, script));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = fetch_client(Arc::clone(&http), RetryPolicy::with_attempts(6), sleeper.clone());

        // When: the season is fetched
        let records = client
            .fetch_work_unit(&unit(), &CancellationToken::new())
            .await
            .expect("fetch should succeed");

        // Then: it slept exactly k times with delays 2^1 .. 2^k seconds
        assert_eq!(records.len(), 2);
        assert_eq!(http.calls_for(SEASON), k + 1);
        let expected = (1..=k as u32)
            .map(|attempt| Duration::from_secs(2_u64.pow(attempt)))
            .collect::<Vec<_>>();
        assert_eq!(sleeper.delays(), expected, "k = {k}");
    }
}

#[tokio::test]
async fn when_upstream_never_recovers_fetch_gives_up_after_max_attempts() {
    // Given: an upstream that always answers 503 and a budget of 4 attempts
    let http = Arc::new(ScriptedHttpClient::new().script(SEASON, vec![status(503)]));
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = fetch_client(Arc::clone(&http), RetryPolicy::with_attempts(4), sleeper.clone());

    // When: the season is fetched
    let error = client
        .fetch_work_unit(&unit(), &CancellationToken::new())
        .await
        .expect_err("fetch should fail");

    // Then: exactly 4 attempts were made and no sleep follows the last one
    match &error {
        FetchError::RetriesExhausted { attempts, last } => {
            assert_eq!(*attempts, 4);
            assert_eq!(last.kind(), FetchErrorKind::UpstreamServer);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(http.calls_for(SEASON), 4);
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8)
        ]
    );
}

// =============================================================================
// Transient vs terminal failures
// =============================================================================

#[tokio::test]
async fn when_upstream_rate_limits_or_times_out_fetch_retries() {
    // Given: a 429, then a timeout, then success
    let http = Arc::new(ScriptedHttpClient::new().script(
        SEASON,
        vec![
            status(429),
            Err(HttpError::timeout("request timeout")),
            Err(HttpError::network("connection reset")),
            ok_season(one_game()),
        ],
    ));
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = fetch_client(Arc::clone(&http), RetryPolicy::default(), sleeper.clone());

    // When
    let records = client
        .fetch_work_unit(&unit(), &CancellationToken::new())
        .await
        .expect("fetch should succeed");

    // Then
    assert_eq!(records.len(), 2);
    assert_eq!(http.calls_for(SEASON), 4);
    assert_eq!(sleeper.delays().len(), 3);
}

#[tokio::test]
async fn when_upstream_answers_not_found_fetch_fails_without_retrying() {
    // Given
    let http = Arc::new(ScriptedHttpClient::new().script(SEASON, vec![status(404)]));
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = fetch_client(Arc::clone(&http), RetryPolicy::default(), sleeper.clone());

    // When
    let error = client
        .fetch_work_unit(&unit(), &CancellationToken::new())
        .await
        .expect_err("404 is terminal");

    // Then
    assert!(matches!(error, FetchError::UpstreamClient { status: 404, .. }));
    assert_eq!(http.calls_for(SEASON), 1);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn when_body_is_not_a_result_set_fetch_fails_without_retrying() {
    // Given: a 200 carrying an HTML block page
    let http = Arc::new(ScriptedHttpClient::new().script(
        SEASON,
        vec![Ok(courtside_core::HttpResponse::ok_json(
            "<html><body>Access Denied</body></html>",
        ))],
    ));
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = fetch_client(Arc::clone(&http), RetryPolicy::default(), sleeper.clone());

    // When
    let error = client
        .fetch_work_unit(&unit(), &CancellationToken::new())
        .await
        .expect_err("protocol errors are terminal");

    // Then
    assert_eq!(error.kind(), FetchErrorKind::UpstreamProtocol);
    assert_eq!(http.calls_for(SEASON), 1);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn when_every_attempt_times_out_exhaustion_wraps_the_timeout() {
    // Given
    let http = Arc::new(
        ScriptedHttpClient::new().script(SEASON, vec![Err(HttpError::timeout("request timeout"))]),
    );
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = fetch_client(Arc::clone(&http), RetryPolicy::with_attempts(2), sleeper.clone());

    // When
    let error = client
        .fetch_work_unit(&unit(), &CancellationToken::new())
        .await
        .expect_err("fetch should fail");

    // Then
    match error {
        FetchError::RetriesExhausted { attempts: 2, last } => assert!(matches!(
            *last,
            FetchError::TransientNetwork {
                kind: HttpErrorKind::Timeout,
                ..
            }
        )),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn when_cancelled_during_backoff_fetch_stops_before_next_attempt() {
    // Given: an upstream that keeps failing and a sleeper that cancels the run
    let http = Arc::new(ScriptedHttpClient::new().script(SEASON, vec![status(503)]));
    let token = CancellationToken::new();
    let sleeper = Arc::new(CancellingSleeper {
        token: token.clone(),
    });
    let client = fetch_client(Arc::clone(&http), RetryPolicy::default(), sleeper);

    // When
    let error = client
        .fetch_work_unit(&unit(), &token)
        .await
        .expect_err("fetch should be cancelled");

    // Then: only the first attempt reached the upstream
    assert_eq!(error, FetchError::Cancelled);
    assert_eq!(http.calls_for(SEASON), 1);
}

#[tokio::test]
async fn when_cancelled_up_front_no_request_is_sent() {
    // Given
    let http = Arc::new(ScriptedHttpClient::new().script(SEASON, vec![ok_season(one_game())]));
    let client = fetch_client(
        Arc::clone(&http),
        RetryPolicy::default(),
        Arc::new(RecordingSleeper::default()),
    );
    let token = CancellationToken::new();
    token.cancel();

    // When
    let error = client
        .fetch_work_unit(&unit(), &token)
        .await
        .expect_err("fetch should be cancelled");

    // Then
    assert_eq!(error, FetchError::Cancelled);
    assert_eq!(http.total_calls(), 0);
}

// =============================================================================
// Request shape
// =============================================================================

#[tokio::test]
async fn fetch_sends_the_season_and_browser_headers() {
    // Given
    let http = Arc::new(ScriptedHttpClient::new().script(SEASON, vec![ok_season(one_game())]));
    let client = fetch_client(
        Arc::clone(&http),
        RetryPolicy::default(),
        Arc::new(RecordingSleeper::default()),
    );

    // When
    let records = client
        .fetch_work_unit(&unit(), &CancellationToken::new())
        .await
        .expect("fetch should succeed");

    // Then: records keep upstream types and the request carries required headers
    assert_eq!(records[0]["PTS"], serde_json::json!(32));
    assert_eq!(records[0]["GAME_ID"], serde_json::json!("0022100001"));
    let request = &http.requests()[0];
    assert_eq!(request.query_value("Season"), Some(SEASON));
    assert!(request.full_url().contains("SeasonType=Regular%20Season"));
    for header in ["user-agent", "referer", "origin"] {
        assert!(request.headers.contains_key(header), "missing {header}");
    }
}
