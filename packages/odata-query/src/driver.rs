//! Continuation driver: walks `@odata.nextLink` until the result set is
//! exhausted or the requested number of records has been collected.

use crate::error::QueryError;
use crate::eval::RecordEvaluator;
use crate::page::Page;
use crate::predicate::Expr;
use crate::query::Query;
use crate::transport::{HttpRequest, Transport};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Read side of a cancellation signal, checked before every page request.
#[derive(Clone, Debug)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Write side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

impl Cancellation {
    /// A signal that never fires.
    pub fn never() -> Self {
        cancellation().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Start,
    Fetching,
    Decoding,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Server order, duplicates preserved.
    pub records: Vec<Value>,
    /// `@odata.count` from the first page that carried one.
    pub total_count: Option<u64>,
    pub pages_fetched: usize,
}

pub struct ContinuationDriver<'a> {
    transport: &'a dyn Transport,
    evaluator: RecordEvaluator,
}

impl<'a> ContinuationDriver<'a> {
    pub fn new(transport: &'a dyn Transport, evaluator: RecordEvaluator) -> Self {
        Self {
            transport,
            evaluator,
        }
    }

    /// Runs `query` to completion. With a client-side predicate pending, each
    /// page is filtered locally; otherwise every decoded record is kept.
    #[instrument(
        skip_all,
        fields(
            entity = %query.entity(),
            client_side = query.local_filter().is_some(),
            limit = ?query.result_limit(),
        )
    )]
    pub async fn run(
        &self,
        query: &Query,
        cancel: &Cancellation,
    ) -> Result<QueryResult, QueryError> {
        let result = self.drive(query, cancel).await;
        match &result {
            Ok(r) => info!(
                state = ?DriverState::Done,
                records = r.records.len(),
                pages = r.pages_fetched,
                "Query completed"
            ),
            Err(e) => warn!(state = ?DriverState::Failed, error = %e, "Query failed"),
        }
        result
    }

    async fn drive(&self, query: &Query, cancel: &Cancellation) -> Result<QueryResult, QueryError> {
        let cap = query.result_limit();
        let headers = query.headers();
        let mut request = query.collection_request()?;
        let mut result = QueryResult::default();
        debug!(state = ?DriverState::Start, path = %request.target(), "Starting query");

        loop {
            if cap.is_some_and(|c| result.records.len() >= c) {
                break;
            }
            if cancel.is_cancelled() {
                return Err(QueryError::Cancelled);
            }

            debug!(
                state = ?DriverState::Fetching,
                page = result.pages_fetched + 1,
                path = %request.target(),
                "Requesting page"
            );
            let response = self.transport.send(request).await?;
            if !response.is_success() {
                return Err(response.into_failure());
            }

            let page = Page::decode(&response.body)?;
            result.pages_fetched += 1;
            if result.total_count.is_none() {
                result.total_count = page.total_count;
            }
            debug!(
                state = ?DriverState::Decoding,
                records = page.records.len(),
                has_next = !page.is_last(),
                "Decoded page"
            );

            let next = page.continuation().map(str::to_string);
            let filled = match query.local_filter() {
                Some(predicate) => self.absorb_matches(predicate, page.records, cap, &mut result)?,
                None => absorb_all(page.records, cap, &mut result),
            };
            if filled {
                debug!(collected = result.records.len(), "Result limit reached");
                break;
            }

            match next {
                // Continuation links are absolute and already carry every option.
                Some(link) => {
                    let mut follow = HttpRequest::get(link);
                    follow.headers = headers.clone();
                    request = follow;
                }
                None => break,
            }
        }

        Ok(result)
    }

    /// Keeps records matching `predicate` in page order; stops scanning the
    /// page once `cap` matches are held. Returns whether the cap was reached.
    fn absorb_matches(
        &self,
        predicate: &Expr,
        records: Vec<Value>,
        cap: Option<usize>,
        result: &mut QueryResult,
    ) -> Result<bool, QueryError> {
        for record in records {
            if self.evaluator.evaluate(predicate, &record)? {
                result.records.push(record);
                if cap.is_some_and(|c| result.records.len() >= c) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Appends the whole page, truncating past `cap`. Returns whether the cap
/// was reached.
fn absorb_all(records: Vec<Value>, cap: Option<usize>, result: &mut QueryResult) -> bool {
    result.records.extend(records);
    match cap {
        Some(c) if result.records.len() >= c => {
            result.records.truncate(c);
            true
        }
        _ => false,
    }
}
