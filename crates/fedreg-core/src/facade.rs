//! High-level lookups over a [`DocumentStore`].
//!
//! [`QueryFacade`] translates search intents (recent executive orders,
//! documents in a date range, an agency/topic pair) into [`SearchFilter`]s
//! and delegates them to the store.
//!
//! Every operation comes in two forms:
//!
//! | Form | On store failure |
//! |------|------------------|
//! | `try_*` (e.g. [`QueryFacade::try_search`]) | returns `Err(StoreFailure)` |
//! | plain (e.g. [`QueryFacade::search`]) | logs the failure, returns `[]` or `None` |
//!
//! The plain forms never fail, so their callers cannot tell "no matching
//! documents" from "the store is down". Callers that need to know use the
//! `try_*` forms.
//!
//! Log events are emitted inside the [`Span`] handed to
//! [`QueryFacade::with_span`], so the embedding application decides how the
//! facade's output is labelled and filtered.

use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta};
use tracing::{Instrument, Span};

use crate::error::StoreFailure;
use crate::filter::SearchFilter;
use crate::models::Document;
use crate::store::DocumentStore;

/// Document type used by [`QueryFacade::recent_executive_orders`].
pub const EXECUTIVE_ORDER: &str = "Executive Order";

/// Look-back window used when the caller does not pick one.
pub const DEFAULT_EXECUTIVE_ORDER_DAYS: i64 = 30;

/// Stateless query layer over a shared store.
pub struct QueryFacade {
    store: Arc<dyn DocumentStore>,
    span: Span,
}

impl QueryFacade {
    /// Wrap `store`, logging under a default `query_facade` span.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_span(store, tracing::info_span!("query_facade"))
    }

    /// Wrap `store`, logging every event inside `span`.
    pub fn with_span(store: Arc<dyn DocumentStore>, span: Span) -> Self {
        Self { store, span }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Open the store connection. Unlike the lookups, this propagates failure.
    pub async fn connect(&self) -> Result<(), StoreFailure> {
        self.call("connecting to the store", self.store.connect())
            .await
    }

    pub async fn close(&self) -> Result<(), StoreFailure> {
        self.call("closing the store", self.store.close()).await
    }

    // ============ Fallible operations ============

    pub async fn try_search(&self, filter: &SearchFilter) -> Result<Vec<Document>, StoreFailure> {
        self.call("searching documents", self.store.search(filter))
            .await
    }

    pub async fn try_recent(&self, limit: i64) -> Result<Vec<Document>, StoreFailure> {
        self.call(
            "getting recent documents",
            self.store.recent_documents(limit),
        )
        .await
    }

    /// `Ok(None)` means the store answered and has no such document.
    pub async fn try_by_id(&self, id: i64) -> Result<Option<Document>, StoreFailure> {
        self.call("getting document by ID", self.store.document_by_id(id))
            .await
    }

    pub async fn try_list_document_types(&self) -> Result<Vec<String>, StoreFailure> {
        self.call("getting document types", self.store.document_types())
            .await
    }

    pub async fn try_list_agencies(&self) -> Result<Vec<String>, StoreFailure> {
        self.call("getting agencies", self.store.agencies()).await
    }

    pub async fn try_list_topics(&self) -> Result<Vec<String>, StoreFailure> {
        self.call("getting topics", self.store.topics()).await
    }

    pub async fn try_list_presidential_doc_types(&self) -> Result<Vec<String>, StoreFailure> {
        self.call(
            "getting presidential document types",
            self.store.presidential_document_types(),
        )
        .await
    }

    pub async fn try_recent_executive_orders_as_of(
        &self,
        today: NaiveDate,
        days: i64,
        limit: i64,
    ) -> Result<Vec<Document>, StoreFailure> {
        self.try_search(&executive_orders_since(today, days, limit))
            .await
    }

    pub async fn try_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Document>, StoreFailure> {
        self.try_search(&date_range(start, end, limit)).await
    }

    pub async fn try_by_agency_and_topic(
        &self,
        agency: &str,
        topic: &str,
        limit: i64,
    ) -> Result<Vec<Document>, StoreFailure> {
        self.try_search(&agency_and_topic(agency, topic, limit))
            .await
    }

    // ============ Lenient operations ============

    /// Filtered search; `[]` if the store fails.
    pub async fn search(&self, filter: &SearchFilter) -> Vec<Document> {
        self.recover(self.try_search(filter).await)
    }

    pub async fn recent(&self, limit: i64) -> Vec<Document> {
        self.recover(self.try_recent(limit).await)
    }

    /// `None` both when the document does not exist and when the store fails.
    pub async fn by_id(&self, id: i64) -> Option<Document> {
        self.recover(self.try_by_id(id).await)
    }

    pub async fn list_document_types(&self) -> Vec<String> {
        self.recover(self.try_list_document_types().await)
    }

    pub async fn list_agencies(&self) -> Vec<String> {
        self.recover(self.try_list_agencies().await)
    }

    pub async fn list_topics(&self) -> Vec<String> {
        self.recover(self.try_list_topics().await)
    }

    pub async fn list_presidential_doc_types(&self) -> Vec<String> {
        self.recover(self.try_list_presidential_doc_types().await)
    }

    /// Executive orders published within the last `days` days of the local date.
    pub async fn recent_executive_orders(&self, days: i64, limit: i64) -> Vec<Document> {
        let today = chrono::Local::now().date_naive();
        self.recent_executive_orders_as_of(today, days, limit)
            .await
    }

    pub async fn recent_executive_orders_as_of(
        &self,
        today: NaiveDate,
        days: i64,
        limit: i64,
    ) -> Vec<Document> {
        self.search(&executive_orders_since(today, days, limit))
            .await
    }

    pub async fn by_date_range(&self, start: NaiveDate, end: NaiveDate, limit: i64) -> Vec<Document> {
        self.search(&date_range(start, end, limit)).await
    }

    pub async fn by_agency_and_topic(&self, agency: &str, topic: &str, limit: i64) -> Vec<Document> {
        self.search(&agency_and_topic(agency, topic, limit)).await
    }

    // ============ Plumbing ============

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, StoreFailure> {
        fut.instrument(self.span.clone())
            .await
            .map_err(|e| StoreFailure::new(operation, e))
    }

    fn recover<T: Default>(&self, outcome: Result<T, StoreFailure>) -> T {
        outcome.unwrap_or_else(|failure| {
            tracing::error!(parent: &self.span, operation = failure.operation(), "{failure}");
            T::default()
        })
    }
}

fn executive_orders_since(today: NaiveDate, days: i64, limit: i64) -> SearchFilter {
    let date_from = TimeDelta::try_days(days)
        .and_then(|delta| today.checked_sub_signed(delta))
        .unwrap_or(NaiveDate::MIN);
    SearchFilter::new()
        .document_type(EXECUTIVE_ORDER)
        .date_from(date_from)
        .limit(limit)
}

fn date_range(start: NaiveDate, end: NaiveDate, limit: i64) -> SearchFilter {
    SearchFilter::new().date_from(start).date_to(end).limit(limit)
}

fn agency_and_topic(agency: &str, topic: &str, limit: i64) -> SearchFilter {
    SearchFilter::new().agency(agency).topic(topic).limit(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DEFAULT_LIMIT;
    use crate::models::DocumentInput;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    /// Records every filter it receives; optionally fails every call.
    #[derive(Default)]
    struct RecordingStore {
        filters: Mutex<Vec<SearchFilter>>,
        fail: bool,
    }

    impl RecordingStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn check(&self) -> Result<()> {
            if self.fail {
                bail!("connection lost");
            }
            Ok(())
        }

        fn sent(&self) -> Vec<Value> {
            self.filters
                .lock()
                .unwrap()
                .iter()
                .map(|f| serde_json::to_value(f).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn connect(&self) -> Result<()> {
            self.check()
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
        async fn search(&self, filter: &SearchFilter) -> Result<Vec<Document>> {
            self.filters.lock().unwrap().push(filter.clone());
            self.check()?;
            Ok(Vec::new())
        }
        async fn recent_documents(&self, _limit: i64) -> Result<Vec<Document>> {
            self.check()?;
            Ok(Vec::new())
        }
        async fn document_by_id(&self, _id: i64) -> Result<Option<Document>> {
            self.check()?;
            Ok(None)
        }
        async fn document_types(&self) -> Result<Vec<String>> {
            self.check()?;
            Ok(vec!["Rule".to_string()])
        }
        async fn agencies(&self) -> Result<Vec<String>> {
            self.check()?;
            Ok(vec!["EPA".to_string()])
        }
        async fn topics(&self) -> Result<Vec<String>> {
            self.check()?;
            Ok(Vec::new())
        }
        async fn presidential_document_types(&self) -> Result<Vec<String>> {
            self.check()?;
            Ok(Vec::new())
        }
        async fn store_documents(&self, _documents: &[DocumentInput]) -> Result<usize> {
            self.check()?;
            Ok(0)
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (buffer, guard)
    }

    fn facade(store: &Arc<RecordingStore>) -> QueryFacade {
        QueryFacade::new(store.clone())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_search_without_parameters_sends_only_paging() {
        let store = Arc::new(RecordingStore::default());
        facade(&store).search(&SearchFilter::new()).await;
        assert_eq!(store.sent(), vec![json!({ "limit": 10, "offset": 0 })]);
    }

    #[tokio::test]
    async fn test_search_omits_unset_parameters() {
        let store = Arc::new(RecordingStore::default());
        let filter = SearchFilter::new().keywords("ozone").executive_order("14096");
        facade(&store).search(&filter).await;
        assert_eq!(
            store.sent(),
            vec![json!({ "keywords": "ozone", "executive_order": "14096", "limit": 10, "offset": 0 })]
        );
    }

    #[tokio::test]
    async fn test_recent_executive_orders_builds_window_from_today() {
        let store = Arc::new(RecordingStore::default());
        facade(&store)
            .recent_executive_orders_as_of(day(2024, 3, 15), 7, 5)
            .await;
        assert_eq!(
            store.sent(),
            vec![json!({
                "date_from": "2024-03-08",
                "document_type": "Executive Order",
                "limit": 5,
                "offset": 0
            })]
        );
    }

    #[tokio::test]
    async fn test_recent_executive_orders_defaults_to_local_today() {
        let store = Arc::new(RecordingStore::default());
        let before = chrono::Local::now().date_naive();
        facade(&store)
            .recent_executive_orders(DEFAULT_EXECUTIVE_ORDER_DAYS, DEFAULT_LIMIT)
            .await;
        let after = chrono::Local::now().date_naive();

        let sent = store.filters.lock().unwrap()[0].clone();
        let from = sent.date_from.unwrap();
        assert!(from == before - TimeDelta::days(30) || from == after - TimeDelta::days(30));
        assert_eq!(sent.document_type.as_deref(), Some(EXECUTIVE_ORDER));
    }

    #[tokio::test]
    async fn test_by_date_range_sends_exact_filter() {
        let store = Arc::new(RecordingStore::default());
        facade(&store)
            .by_date_range(day(2024, 1, 1), day(2024, 1, 31), 20)
            .await;
        assert_eq!(
            store.sent(),
            vec![json!({
                "date_from": "2024-01-01",
                "date_to": "2024-01-31",
                "limit": 20,
                "offset": 0
            })]
        );
    }

    #[tokio::test]
    async fn test_by_agency_and_topic_sends_exact_filter() {
        let store = Arc::new(RecordingStore::default());
        facade(&store)
            .by_agency_and_topic("EPA", "Air Quality", DEFAULT_LIMIT)
            .await;
        assert_eq!(
            store.sent(),
            vec![json!({ "agency": "EPA", "topic": "Air Quality", "limit": 10, "offset": 0 })]
        );
    }

    #[tokio::test]
    async fn test_listing_failure_returns_empty_and_logs() {
        let (logs, _guard) = capture_logs();
        let store = Arc::new(RecordingStore::failing());
        let facade = facade(&store);

        assert!(facade.list_agencies().await.is_empty());
        assert!(facade.list_document_types().await.is_empty());
        assert!(facade.list_topics().await.is_empty());
        assert!(facade.list_presidential_doc_types().await.is_empty());

        let output = logs.contents();
        assert!(output.contains("error getting agencies: connection lost"), "{output}");
        assert!(output.contains("error getting presidential document types"), "{output}");
        assert!(output.contains("ERROR"));
    }

    #[tokio::test]
    async fn test_search_failure_returns_empty() {
        let (logs, _guard) = capture_logs();
        let store = Arc::new(RecordingStore::failing());
        let facade = facade(&store);

        assert!(facade.search(&SearchFilter::new()).await.is_empty());
        assert!(facade.recent(5).await.is_empty());
        assert!(facade
            .by_agency_and_topic("EPA", "Air Quality", 10)
            .await
            .is_empty());
        assert!(logs.contents().contains("error searching documents"));
    }

    #[tokio::test]
    async fn test_by_id_is_none_on_failure_and_on_missing() {
        let healthy = Arc::new(RecordingStore::default());
        assert!(facade(&healthy).by_id(42).await.is_none());

        let (logs, _guard) = capture_logs();
        let failing = Arc::new(RecordingStore::failing());
        assert!(facade(&failing).by_id(42).await.is_none());
        assert!(logs.contents().contains("error getting document by ID"));
    }

    #[tokio::test]
    async fn test_try_forms_distinguish_failure_from_empty() {
        let healthy = Arc::new(RecordingStore::default());
        let found = facade(&healthy)
            .try_search(&SearchFilter::new())
            .await
            .unwrap();
        assert!(found.is_empty());

        let failing = Arc::new(RecordingStore::failing());
        let err = facade(&failing)
            .try_list_topics()
            .await
            .unwrap_err();
        assert_eq!(err.operation(), "getting topics");
        assert_eq!(err.to_string(), "error getting topics: connection lost");
    }

    #[tokio::test]
    async fn test_connect_propagates_failure() {
        let failing = Arc::new(RecordingStore::failing());
        let err = facade(&failing).connect().await.unwrap_err();
        assert_eq!(err.operation(), "connecting to the store");
    }

    #[tokio::test]
    async fn test_successful_listing_passes_through() {
        let store = Arc::new(RecordingStore::default());
        assert_eq!(facade(&store).list_agencies().await, vec!["EPA".to_string()]);
    }
}
