//! # Courtside Core
//!
//! Ingestion and feature pipeline for NBA player game logs.
//!
//! ## Overview
//!
//! - **Fetch**: resilient GET of one season from the league game log endpoint
//!   with bounded exponential backoff, request pacing and cancellation
//! - **Raw schema**: explicit, versioned mapping from upstream headers to typed rows
//! - **Ingest**: sequential or bounded-parallel fetch of many seasons, loaded
//!   into the warehouse as a single all-or-nothing batch
//! - **Pipeline**: ingest followed by feature materialization
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cancel`] | Cancellation token and the `Sleeper` seam |
//! | [`config`] | Layered pipeline configuration |
//! | [`domain`] | Work unit keys, win/loss, raw record maps |
//! | [`error`] | Core error types |
//! | [`fetch`] | Work-unit fetch client |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`ingest`] | Ingestion orchestrator |
//! | [`pipeline`] | Ingest-then-transform composition |
//! | [`retry`] | Retry policy |
//! | [`schema`] | Raw schema mapping and coercion |
//! | [`throttling`] | Request pacing |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use courtside_core::{
//!     run_pipeline, CancellationToken, FetchClient, IngestionOrchestrator, PipelineConfig,
//!     ReqwestHttpClient, Warehouse,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::load(None)?;
//!     config.validate()?;
//!
//!     let http = Arc::new(ReqwestHttpClient::new()?);
//!     let fetcher = FetchClient::from_config(&config, http);
//!     let warehouse = Warehouse::open(config.warehouse_config())?;
//!     let orchestrator = IngestionOrchestrator::from_config(&config, fetcher, warehouse);
//!
//!     let report = run_pipeline(&orchestrator, &config.work_units()?, &CancellationToken::new()).await?;
//!     println!("{} team games", report.transform.feature_rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  CLI / caller        │
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ IngestionOrchestrator│────▶│ FetchClient      │──▶ HttpClient (reqwest)
//! └──────────┬───────────┘     └──────────────────┘
//!            ▼ raw schema
//! ┌──────────────────────┐
//! │ Warehouse (DuckDB)   │  player_game_logs ─▶ team_game_features
//! └──────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use courtside_core::{FetchError, FetchErrorKind};
//!
//! fn describe(error: &FetchError) -> &'static str {
//!     match error.kind() {
//!         FetchErrorKind::RetriesExhausted => "upstream kept failing",
//!         FetchErrorKind::UpstreamClient => "request rejected",
//!         FetchErrorKind::Cancelled => "stopped",
//!         _ => "other",
//!     }
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod ingest;
pub mod pipeline;
pub mod retry;
pub mod schema;
pub mod throttling;

// Cancellation
pub use cancel::{CancellationToken, Sleeper, TokioSleeper};

// Configuration
pub use config::{ConfigError, PipelineConfig, RetrySettings, UpstreamConfig};

// Domain types
pub use domain::{RawRecordMap, WinLoss, WorkUnitKey};

// Error types
pub use error::{FetchError, FetchErrorKind, IngestError, PipelineError, SchemaError, ValidationError};

// Fetch, ingest and pipeline
pub use fetch::{parse_result_set, FetchClient};
pub use ingest::{IngestReport, IngestionOrchestrator, UnitReport};
pub use pipeline::{run_pipeline, PipelineReport};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Retry and pacing
pub use retry::RetryPolicy;
pub use throttling::RequestPacer;

// Raw schema
pub use schema::RAW_SCHEMA_VERSION;

// Warehouse (re-exported from courtside-warehouse)
pub use courtside_warehouse::{
    resolve_courtside_home, FeatureFilter, LoadMode, MaterializeReport, PlayerGameLogRecord,
    QueryGuardrails, QueryResult, SqlColumn, TableCounts, TeamGameFeatureRow, Warehouse,
    WarehouseConfig, WarehouseError,
};
