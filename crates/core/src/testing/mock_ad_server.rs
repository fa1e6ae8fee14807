//! Mock ad server for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::adapter::{
    AdServerAdapter, AdapterCall, AdapterError, CreateKind, CreateRequest, LicaConfig, LicaEntry,
    OrderId, OrderState,
};
use crate::bidders::Bidder;

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub call: AdapterCall,
    pub order_id: Option<OrderId>,
    /// Creative batch number (creatives only).
    pub batch: Option<usize>,
    pub success: bool,
}

/// Mock implementation of the AdServerAdapter trait.
///
/// Keeps orders in memory and behaves like the real server:
/// - creating an order twice with the same id returns the existing order
/// - line items are created once per order
/// - each creative batch raises `lica_batch_count`
///
/// Failures can be queued per call kind with [`fail_next`](Self::fail_next).
#[derive(Debug, Clone)]
pub struct MockAdServer {
    orders: Arc<RwLock<HashMap<OrderId, OrderState>>>,
    next_order_id: Arc<AtomicU64>,
    lica_len: Arc<RwLock<usize>>,
    line_items_per_order: Arc<RwLock<usize>>,
    bidders: Arc<RwLock<Vec<Bidder>>>,
    failures: Arc<RwLock<HashMap<AdapterCall, VecDeque<AdapterError>>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    archived: Arc<RwLock<Vec<OrderId>>>,
    call_delay: Arc<RwLock<Duration>>,
}

impl Default for MockAdServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdServer {
    /// Create a new mock server with 100 associations and 4 line items per order.
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
            next_order_id: Arc::new(AtomicU64::new(5001)),
            lica_len: Arc::new(RwLock::new(100)),
            line_items_per_order: Arc::new(RwLock::new(4)),
            bidders: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            archived: Arc::new(RwLock::new(Vec::new())),
            call_delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Set how many associations every order needs.
    pub async fn set_lica_len(&self, len: usize) {
        *self.lica_len.write().await = len;
    }

    pub async fn set_line_items_per_order(&self, count: usize) {
        *self.line_items_per_order.write().await = count;
    }

    pub async fn set_bidders(&self, bidders: Vec<Bidder>) {
        *self.bidders.write().await = bidders;
    }

    /// Delay every call, e.g. to observe a run while it is in flight.
    pub async fn set_call_delay(&self, delay: Duration) {
        *self.call_delay.write().await = delay;
    }

    /// Store an order as if it had been created earlier.
    pub async fn insert_order(&self, order: OrderState) {
        self.orders.write().await.insert(order.order_id, order);
    }

    /// Current server-side state of an order.
    pub async fn order_state(&self, order_id: OrderId) -> Option<OrderState> {
        self.orders.read().await.get(&order_id).cloned()
    }

    /// Number of orders that exist on the server.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Make the next call of this kind fail. Queued failures are consumed in order.
    pub async fn fail_next(&self, call: AdapterCall, error: AdapterError) {
        self.failures
            .write()
            .await
            .entry(call)
            .or_default()
            .push_back(error);
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_recorded_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Recorded create calls of the given kind, successful or not.
    pub async fn create_calls(&self, call: AdapterCall) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.call == call)
            .count()
    }

    /// Batch numbers of the creative calls, in call order.
    pub async fn creative_batches(&self) -> Vec<usize> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.call == AdapterCall::CreateCreatives)
            .filter_map(|c| c.batch)
            .collect()
    }

    pub async fn archived_orders(&self) -> Vec<OrderId> {
        self.archived.read().await.clone()
    }

    async fn begin(
        &self,
        call: AdapterCall,
        order_id: Option<OrderId>,
        batch: Option<usize>,
    ) -> Result<(), AdapterError> {
        let delay = *self.call_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .write()
            .await
            .get_mut(&call)
            .and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            self.record(call, order_id, batch, false).await;
            return Err(error);
        }
        Ok(())
    }

    async fn record(
        &self,
        call: AdapterCall,
        order_id: Option<OrderId>,
        batch: Option<usize>,
        success: bool,
    ) {
        self.calls.write().await.push(RecordedCall {
            call,
            order_id,
            batch,
            success,
        });
    }

    async fn existing(&self, order_id: Option<OrderId>) -> Result<OrderState, AdapterError> {
        let order_id =
            order_id.ok_or_else(|| AdapterError::api(400, "Missing order ID"))?;
        self.order_state(order_id)
            .await
            .ok_or_else(|| AdapterError::NotFound(order_id.to_string()))
    }
}

#[async_trait]
impl AdServerAdapter for MockAdServer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create(&self, request: CreateRequest) -> Result<OrderState, AdapterError> {
        let call = AdapterCall::from(request.kind);
        self.begin(call, request.id, request.batch).await?;

        let result = match request.kind {
            CreateKind::Order => match request.id {
                Some(id) => self.existing(Some(id)).await,
                None => {
                    let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
                    let order = OrderState::new(id, request.config.order_name.clone());
                    self.insert_order(order.clone()).await;
                    Ok(order)
                }
            },
            CreateKind::LineItems => match self.existing(request.id).await {
                Ok(mut order) => {
                    if order.line_item_ids.is_empty() {
                        let count = *self.line_items_per_order.read().await as u64;
                        order.line_item_ids =
                            (1..=count).map(|i| order.order_id * 1000 + i).collect();
                        self.insert_order(order.clone()).await;
                    }
                    Ok(order)
                }
                Err(e) => Err(e),
            },
            CreateKind::Creatives => match self.existing(request.id).await {
                Ok(mut order) => {
                    let batch = request.batch.unwrap_or(1);
                    order.lica_batch_count = order.lica_batch_count.max(batch);
                    self.insert_order(order.clone()).await;
                    Ok(order)
                }
                Err(e) => Err(e),
            },
        };

        self.record(call, request.id, request.batch, result.is_ok())
            .await;
        result
    }

    async fn lica_config(&self, order_id: OrderId) -> Result<LicaConfig, AdapterError> {
        self.begin(AdapterCall::LicaConfig, Some(order_id), None)
            .await?;
        let result = match self.existing(Some(order_id)).await {
            Ok(order) => {
                let len = *self.lica_len.read().await;
                let line_items = order.line_item_ids.len().max(1) as u64;
                Ok(LicaConfig(
                    (0..len as u64)
                        .map(|i| LicaEntry {
                            line_item_id: order_id * 1000 + 1 + i % line_items,
                            creative_id: 900_000 + i,
                        })
                        .collect(),
                ))
            }
            Err(e) => Err(e),
        };
        self.record(AdapterCall::LicaConfig, Some(order_id), None, result.is_ok())
            .await;
        result
    }

    async fn order(&self, order_id: OrderId) -> Result<OrderState, AdapterError> {
        self.begin(AdapterCall::Order, Some(order_id), None).await?;
        let result = self.existing(Some(order_id)).await;
        self.record(AdapterCall::Order, Some(order_id), None, result.is_ok())
            .await;
        result
    }

    async fn bidders(&self) -> Result<Vec<Bidder>, AdapterError> {
        self.begin(AdapterCall::Bidders, None, None).await?;
        self.record(AdapterCall::Bidders, None, None, true).await;
        Ok(self.bidders.read().await.clone())
    }

    async fn archive_order(&self, order_id: OrderId) -> Result<(), AdapterError> {
        self.begin(AdapterCall::Archive, Some(order_id), None).await?;
        self.archived.write().await.push(order_id);
        self.record(AdapterCall::Archive, Some(order_id), None, true)
            .await;
        Ok(())
    }
}
