//! Batch ingestion of work units into the raw table.
//!
//! A run fetches every unit, normalizes it through the raw schema, and only then
//! writes the whole batch with a single bulk load. Any unit failure aborts the
//! run before the warehouse is touched.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::config::PipelineConfig;
use crate::domain::WorkUnitKey;
use crate::error::{FetchError, IngestError};
use crate::fetch::FetchClient;
use crate::schema::normalize_unit;
use crate::{LoadMode, PlayerGameLogRecord, Warehouse};

/// Records fetched for one work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub unit: String,
    pub records: usize,
}

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub run_id: String,
    pub load_mode: LoadMode,
    /// Per-unit counts in work-unit order.
    pub units: Vec<UnitReport>,
    pub loaded_records: usize,
    pub elapsed_ms: u64,
}

/// Fetches work units and hands the combined batch to the warehouse.
pub struct IngestionOrchestrator {
    fetcher: Arc<FetchClient>,
    warehouse: Warehouse,
    concurrency: usize,
    load_mode: LoadMode,
}

impl IngestionOrchestrator {
    pub fn new(fetcher: FetchClient, warehouse: Warehouse) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            warehouse,
            concurrency: 1,
            load_mode: LoadMode::Append,
        }
    }

    pub fn from_config(config: &PipelineConfig, fetcher: FetchClient, warehouse: Warehouse) -> Self {
        Self::new(fetcher, warehouse)
            .with_concurrency(config.concurrency)
            .with_load_mode(config.load_mode)
    }

    /// Number of units fetched at once. Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_load_mode(mut self, load_mode: LoadMode) -> Self {
        self.load_mode = load_mode;
        self
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    /// Fetch, normalize and load `units` as one batch.
    pub async fn run(
        &self,
        units: &[WorkUnitKey],
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        info!(
            %run_id,
            units = units.len(),
            concurrency = self.concurrency,
            mode = self.load_mode.as_str(),
            "starting ingestion run"
        );

        let batches = if self.concurrency <= 1 || units.len() <= 1 {
            self.fetch_sequential(units, cancel).await?
        } else {
            self.fetch_concurrent(units, cancel).await?
        };

        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let unit_reports = units
            .iter()
            .zip(&batches)
            .map(|(unit, rows)| UnitReport {
                unit: unit.to_string(),
                records: rows.len(),
            })
            .collect::<Vec<_>>();
        let records = batches.into_iter().flatten().collect::<Vec<PlayerGameLogRecord>>();

        let loaded_records = self
            .warehouse
            .bulk_load_raw(&run_id, &records, self.load_mode)?;

        let report = IngestReport {
            run_id,
            load_mode: self.load_mode,
            units: unit_reports,
            loaded_records,
            elapsed_ms: started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64,
        };
        info!(
            run_id = %report.run_id,
            loaded = report.loaded_records,
            elapsed_ms = report.elapsed_ms,
            "ingestion run complete"
        );
        Ok(report)
    }

    async fn fetch_sequential(
        &self,
        units: &[WorkUnitKey],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<PlayerGameLogRecord>>, IngestError> {
        let mut batches = Vec::with_capacity(units.len());
        for unit in units {
            batches.push(fetch_and_normalize(&self.fetcher, unit, cancel).await?);
        }
        Ok(batches)
    }

    /// Bounded worker pool; results come back in work-unit order.
    async fn fetch_concurrent(
        &self,
        units: &[WorkUnitKey],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<PlayerGameLogRecord>>, IngestError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();

        for (index, unit) in units.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            workers.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|error| IngestError::Worker(error.to_string()))?;
                let rows = fetch_and_normalize(&fetcher, &unit, &cancel).await?;
                Ok::<_, IngestError>((index, rows))
            });
        }

        let mut slots: Vec<Option<Vec<PlayerGameLogRecord>>> = (0..units.len()).map(|_| None).collect();
        while let Some(joined) = workers.join_next().await {
            let failure = match joined {
                Ok(Ok((index, rows))) => {
                    slots[index] = Some(rows);
                    continue;
                }
                Ok(Err(error)) => error,
                Err(join_error) => IngestError::Worker(join_error.to_string()),
            };
            workers.abort_all();
            warn!(error = %failure, outstanding = workers.len(), "aborting ingestion run");
            return Err(failure);
        }

        slots
            .into_iter()
            .zip(units)
            .map(|(slot, unit)| {
                slot.ok_or_else(|| IngestError::Worker(format!("no result for work unit '{unit}'")))
            })
            .collect()
    }
}

async fn fetch_and_normalize(
    fetcher: &FetchClient,
    unit: &WorkUnitKey,
    cancel: &CancellationToken,
) -> Result<Vec<PlayerGameLogRecord>, IngestError> {
    let records = fetcher
        .fetch_work_unit(unit, cancel)
        .await
        .map_err(|source| match source {
            FetchError::Cancelled => IngestError::Cancelled,
            source => IngestError::Fetch {
                unit: unit.to_string(),
                source,
            },
        })?;

    normalize_unit(unit, &records).map_err(|source| IngestError::Schema {
        unit: unit.to_string(),
        source,
    })
}
