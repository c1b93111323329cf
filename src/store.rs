//! Holds the fetched snapshot and its load status.
//!
//! The snapshot is an `Arc<[Record]>` that is swapped whole on each
//! successful load, so readers always see either the previous or the new
//! data. Loads are sequenced with tickets: a response for a ticket older
//! than the most recently issued one is dropped.

use log::{info, warn};
use std::future::Future;
use std::sync::Arc;

use crate::error::FetchError;
use crate::record::Record;

/// Something that can produce a fresh batch of records.
pub trait RecordSource {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Record>, FetchError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(FetchError),
}

/// Issued by [`RecordStore::begin_load`]; hand it back with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Stale,
}

#[derive(Debug)]
pub struct RecordStore {
    label: &'static str,
    snapshot: Arc<[Record]>,
    status: LoadStatus,
    issued: u64,
}

impl RecordStore {
    pub fn new(label: &'static str) -> Self {
        RecordStore {
            label,
            snapshot: Arc::from(Vec::<Record>::new()),
            status: LoadStatus::Idle,
            issued: 0,
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// The current snapshot. Callers branch on [`status`](Self::status)
    /// before deriving from it.
    pub fn snapshot(&self) -> Arc<[Record]> {
        Arc::clone(&self.snapshot)
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        self.status = LoadStatus::Loading;
        LoadTicket(self.issued)
    }

    /// Apply a fetch result, unless a newer load has been started since.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Record>, FetchError>,
    ) -> LoadOutcome {
        if ticket.0 != self.issued {
            warn!(
                "{}: dropping stale load #{} (latest is #{})",
                self.label, ticket.0, self.issued
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(records) => {
                info!("{}: loaded {} records", self.label, records.len());
                self.snapshot = Arc::from(records);
                self.status = LoadStatus::Ready;
            }
            Err(e) => {
                warn!("{}: load failed, keeping previous snapshot: {}", self.label, e);
                self.status = LoadStatus::Failed(e);
            }
        }
        LoadOutcome::Applied
    }

    /// Fetch from `source` and apply the result.
    pub async fn load<S: RecordSource>(&mut self, source: &S) -> Result<Arc<[Record]>, FetchError> {
        let ticket = self.begin_load();
        let result = source.fetch().await;
        let error = result.as_ref().err().cloned();
        self.finish_load(ticket, result);
        match error {
            Some(e) => Err(e),
            None => Ok(self.snapshot()),
        }
    }
}
