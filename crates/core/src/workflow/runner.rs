//! Order provisioning workflow implementation.
//!
//! A run walks the order through:
//! - create order (skipped once an order id is known)
//! - create line items (skipped once line items exist)
//! - fetch the association config and create the missing creative batches
//!
//! Every step is awaited before the next one starts because each depends on
//! the server-confirmed result of the previous one.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::adapter::{
    AdServerAdapter, AdapterCall, AdapterError, CreateRequest, OrderConfig, OrderId, OrderState,
};
use crate::bidders::BidderRegistry;
use crate::metrics;

use super::config::WorkflowConfig;
use super::types::{
    AttemptState, FailureReport, WorkflowError, WorkflowProgress, WorkflowSnapshot, WorkflowStep,
    FIXED_STEPS,
};

/// Called with the final order state after a successful run.
pub type CompletionCallback = Arc<dyn Fn(&OrderState) + Send + Sync>;

/// Called with the broken order after an unrecoverable failure, typically to archive it.
pub type UnrecoverableCallback = Arc<dyn Fn(OrderState) -> BoxFuture<'static, ()> + Send + Sync>;

/// Mutable state owned by the workflow.
#[derive(Debug, Clone)]
struct WorkflowState {
    config: OrderConfig,
    order: Option<OrderState>,
    step: WorkflowStep,
    attempt: AttemptState,
    total_batches: Option<usize>,
    resuming_existing: bool,
    last_failure: Option<FailureReport>,
}

impl WorkflowState {
    fn fresh(mut config: OrderConfig) -> Self {
        config.order_id = None;
        Self {
            config,
            order: None,
            step: WorkflowStep::Idle,
            attempt: AttemptState::FreshAttempt,
            total_batches: None,
            resuming_existing: false,
            last_failure: None,
        }
    }

    fn total_steps(&self) -> usize {
        FIXED_STEPS + self.total_batches.unwrap_or(0)
    }

    fn adopt(&mut self, order: &OrderState) {
        self.config.order_id = Some(order.order_id);
        self.order = Some(order.clone());
    }
}

/// Drives one order through provisioning.
///
/// Runs are single-flight: a second [`run`](Self::run) while one is in
/// progress fails with [`WorkflowError::InFlight`].
pub struct OrderWorkflow {
    adapter: Arc<dyn AdServerAdapter>,
    config: WorkflowConfig,
    registry: Option<Arc<BidderRegistry>>,
    state: RwLock<WorkflowState>,
    in_flight: AtomicBool,
    progress_tx: Option<mpsc::Sender<WorkflowProgress>>,
    on_complete: Option<CompletionCallback>,
    on_unrecoverable: Option<UnrecoverableCallback>,
}

impl OrderWorkflow {
    /// Create a workflow for a new order.
    ///
    /// Any order id in `order_config` is ignored; use
    /// [`for_existing`](Self::for_existing) to continue an existing order.
    pub fn new(
        adapter: Arc<dyn AdServerAdapter>,
        config: WorkflowConfig,
        order_config: OrderConfig,
    ) -> Self {
        Self::with_state(adapter, config, WorkflowState::fresh(order_config))
    }

    /// Create a workflow continuing an order that already exists on the server.
    ///
    /// Any failure while continuing an existing order is unrecoverable.
    pub fn for_existing(
        adapter: Arc<dyn AdServerAdapter>,
        config: WorkflowConfig,
        order_config: OrderConfig,
        order: OrderState,
    ) -> Self {
        let mut state = WorkflowState::fresh(order_config);
        state.adopt(&order);
        state.resuming_existing = true;
        Self::with_state(adapter, config, state)
    }

    fn with_state(
        adapter: Arc<dyn AdServerAdapter>,
        config: WorkflowConfig,
        state: WorkflowState,
    ) -> Self {
        Self {
            adapter,
            config,
            registry: None,
            state: RwLock::new(state),
            in_flight: AtomicBool::new(false),
            progress_tx: None,
            on_complete: None,
            on_unrecoverable: None,
        }
    }

    /// Fetch an existing order from the server and create a workflow continuing it.
    pub async fn resume(
        adapter: Arc<dyn AdServerAdapter>,
        config: WorkflowConfig,
        order_config: OrderConfig,
        order_id: OrderId,
    ) -> Result<Self, WorkflowError> {
        let order = timed_call(AdapterCall::Order, adapter.order(order_id))
            .await
            .map_err(|failure| failure.into_remote(WorkflowStep::Idle))?;
        info!(
            "Resuming order {} ({} line items, {} creative batches done)",
            order.order_id,
            order.line_item_ids.len(),
            order.lica_batch_count
        );
        Ok(Self::for_existing(adapter, config, order_config, order))
    }

    /// Validate bidder keys against a registry before each run.
    pub fn with_registry(mut self, registry: Arc<BidderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Publish progress updates to a channel.
    ///
    /// Updates are dropped when the channel is full or closed; the run continues.
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<WorkflowProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    pub fn with_completion_callback(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn with_unrecoverable_callback(mut self, callback: UnrecoverableCallback) -> Self {
        self.on_unrecoverable = Some(callback);
        self
    }

    /// Whether a run is currently in progress.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn step(&self) -> WorkflowStep {
        self.state.read().await.step
    }

    pub async fn attempt(&self) -> AttemptState {
        self.state.read().await.attempt
    }

    pub async fn order_config(&self) -> OrderConfig {
        self.state.read().await.config.clone()
    }

    pub async fn order(&self) -> Option<OrderState> {
        self.state.read().await.order.clone()
    }

    /// Current state for display.
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.read().await;
        WorkflowSnapshot {
            step: state.step,
            step_number: state.step.number(),
            total_steps: state.total_steps(),
            total_batches: state.total_batches,
            attempt: state.attempt,
            in_flight: self.is_in_flight(),
            resuming_existing: state.resuming_existing,
            config: state.config.clone(),
            order: state.order.clone(),
            last_failure: state.last_failure.clone(),
        }
    }

    /// Replace the user-entered configuration. The current order id is kept.
    pub async fn set_config(&self, config: OrderConfig) -> Result<(), WorkflowError> {
        if self.is_in_flight() {
            return Err(WorkflowError::InFlight);
        }
        config.validate(self.registry.as_deref())?;

        let mut state = self.state.write().await;
        let order_id = state.config.order_id;
        state.config = OrderConfig { order_id, ..config };
        Ok(())
    }

    /// Drop the current order and start over with the same settings.
    pub async fn reset(&self) -> Result<(), WorkflowError> {
        if self.is_in_flight() {
            return Err(WorkflowError::InFlight);
        }
        let mut state = self.state.write().await;
        let config = state.config.clone();
        *state = WorkflowState::fresh(config);
        debug!("Workflow reset to a fresh order");
        Ok(())
    }

    /// Run the workflow to completion or to the first failure.
    pub async fn run(&self) -> Result<OrderState, WorkflowError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Provisioning run requested while another run is in flight");
            metrics::WORKFLOW_RUNS.with_label_values(&["rejected"]).inc();
            return Err(WorkflowError::InFlight);
        }

        let started = Instant::now();
        let result = match self.prepare().await {
            Ok(()) => match self.execute().await {
                Ok(order) => Ok(self.handle_success(order).await),
                Err(e) => Err(self.handle_failure(e).await),
            },
            Err(e) => Err(e),
        };

        // Cleanup runs whatever the outcome.
        self.state.write().await.step = WorkflowStep::Idle;
        self.in_flight.store(false, Ordering::SeqCst);

        let label = match &result {
            Ok(_) => "completed",
            Err(WorkflowError::InvalidConfig(_)) => "invalid",
            Err(e) if e.is_recoverable() => "recoverable",
            Err(_) => "unrecoverable",
        };
        metrics::WORKFLOW_RUNS.with_label_values(&[label]).inc();
        metrics::WORKFLOW_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    /// Whether the order on the server is behind what it needs.
    ///
    /// Fetches the association config to learn the batch count. Always false
    /// while a run is in flight or before an order exists.
    pub async fn check_issues(&self) -> Result<bool, WorkflowError> {
        if self.is_in_flight() {
            return Ok(false);
        }

        let (order_id, order) = {
            let state = self.state.read().await;
            (state.config.order_id, state.order.clone())
        };
        let Some(order_id) = order_id else {
            return Ok(false);
        };

        let remote = |failure: CallFailure| failure.into_remote(WorkflowStep::Idle);

        let order = match order {
            Some(order) => order,
            None => {
                let order = timed_call(AdapterCall::Order, self.adapter.order(order_id))
                    .await
                    .map_err(remote)?;
                self.state.write().await.adopt(&order);
                order
            }
        };

        let lica = timed_call(AdapterCall::LicaConfig, self.adapter.lica_config(order_id))
            .await
            .map_err(remote)?;
        let total_batches = lica.total_batches(self.config.batch_size);
        self.state.write().await.total_batches = Some(total_batches);

        let has_issues = order.has_issues(total_batches);
        if has_issues {
            warn!(
                "Order {} has issues: {} line items, {} of {} creative batches",
                order_id,
                order.line_item_ids.len(),
                order.lica_batch_count,
                total_batches
            );
        }
        Ok(has_issues)
    }

    async fn prepare(&self) -> Result<(), WorkflowError> {
        let mut state = self.state.write().await;
        state.config.validate(self.registry.as_deref())?;

        if state.attempt.is_exhausted() {
            state.attempt = AttemptState::FreshAttempt;
        }
        state.last_failure = None;

        info!(
            "Starting provisioning run for {:?} (order: {:?}, attempt: {:?})",
            state.config.name, state.config.order_id, state.attempt
        );
        Ok(())
    }

    async fn execute(&self) -> Result<OrderState, CallFailure> {
        let (config, known_order) = {
            let state = self.state.read().await;
            (state.config.clone(), state.order.clone())
        };

        let mut order = match (config.order_id, known_order) {
            (Some(_), Some(order)) => order,
            (Some(order_id), None) => {
                let order = timed_call(AdapterCall::Order, self.adapter.order(order_id)).await?;
                self.state.write().await.adopt(&order);
                order
            }
            (None, _) => {
                self.advance(WorkflowStep::CreatingOrder).await;
                let order = timed_call(
                    AdapterCall::CreateOrder,
                    self.adapter.create(CreateRequest::order(&config)),
                )
                .await?;
                // Adopt the id right away so a retry never creates a second order.
                self.state.write().await.adopt(&order);
                info!("Created order {} ({})", order.order_id, order.order_name);
                order
            }
        };
        let order_id = order.order_id;

        if order.line_item_ids.is_empty() {
            self.advance(WorkflowStep::CreatingLineItems).await;
            order = timed_call(
                AdapterCall::CreateLineItems,
                self.adapter
                    .create(CreateRequest::line_items(order_id, &config)),
            )
            .await?;
            self.state.write().await.adopt(&order);
            info!(
                "Created {} line items for order {}",
                order.line_item_ids.len(),
                order_id
            );
        }

        let lica = timed_call(AdapterCall::LicaConfig, self.adapter.lica_config(order_id)).await?;
        let total_batches = lica.total_batches(self.config.batch_size);
        self.state.write().await.total_batches = Some(total_batches);
        debug!(
            "Order {} needs {} associations in {} batches, {} already done",
            order_id,
            lica.len(),
            total_batches,
            order.lica_batch_count
        );

        for batch_index in order.lica_batch_count..total_batches {
            self.advance(WorkflowStep::AssociatingCreatives { batch_index })
                .await;
            order = timed_call(
                AdapterCall::CreateCreatives,
                self.adapter
                    .create(CreateRequest::creatives(order_id, &config, batch_index + 1)),
            )
            .await?;
            self.state.write().await.adopt(&order);
            metrics::LICA_BATCHES_CREATED.inc();
            debug!(
                "Order {}: creative batch {} of {} done",
                order_id,
                batch_index + 1,
                total_batches
            );
        }

        Ok(order)
    }

    async fn advance(&self, step: WorkflowStep) {
        let progress = {
            let mut state = self.state.write().await;
            state.step = step;
            WorkflowProgress {
                step,
                step_number: step.number(),
                total_steps: state.total_steps(),
                total_batches: state.total_batches,
                order_id: state.config.order_id,
            }
        };

        if let Some(ref tx) = self.progress_tx {
            if let Err(e) = tx.try_send(progress) {
                debug!("Dropped progress update: {}", e);
            }
        }
    }

    async fn handle_success(&self, order: OrderState) -> OrderState {
        {
            let mut state = self.state.write().await;
            state.attempt = state.attempt.on_success();
            state.adopt(&order);
        }

        info!(
            "Order {} provisioned: {} line items, {} creative batches",
            order.order_id,
            order.line_item_ids.len(),
            order.lica_batch_count
        );

        if let Some(ref callback) = self.on_complete {
            callback(&order);
        }
        order
    }

    async fn handle_failure(&self, failure: CallFailure) -> WorkflowError {
        let CallFailure { call, source } = failure;
        let mut state = self.state.write().await;
        let step = state.step;
        let order_id = state.config.order_id;
        let attempt = state
            .attempt
            .on_failure(state.resuming_existing, order_id.is_some());
        state.attempt = attempt;

        if !attempt.is_exhausted() {
            state.last_failure = Some(FailureReport {
                message: source.to_string(),
                recoverable: true,
                step,
                call,
                order_id,
            });
            let transient = source.is_transient();
            if attempt.is_last_attempt() {
                warn!(
                    transient,
                    "Call {} failed for order {:?}, one attempt left: {}",
                    call.as_str(),
                    order_id,
                    source
                );
            } else {
                warn!(
                    transient,
                    "Call {} failed, run can be retried: {}",
                    call.as_str(),
                    source
                );
            }
            return WorkflowError::Remote { step, call, source };
        }

        let name = state.config.name.clone();
        let broken = state
            .order
            .take()
            .or_else(|| order_id.map(|id| OrderState::new(id, name)));
        state.config.order_id = None;
        state.total_batches = None;
        state.resuming_existing = false;
        state.last_failure = Some(FailureReport {
            message: source.to_string(),
            recoverable: false,
            step,
            call,
            order_id,
        });
        drop(state);

        error!(
            "Call {} failed for order {:?}, giving up on the order: {}",
            call.as_str(),
            order_id,
            source
        );

        if let (Some(callback), Some(order)) = (&self.on_unrecoverable, broken) {
            callback(order).await;
        }

        WorkflowError::Unrecoverable { order_id, source }
    }
}

/// A failed remote call and the error it returned.
#[derive(Debug)]
struct CallFailure {
    call: AdapterCall,
    source: AdapterError,
}

impl CallFailure {
    fn into_remote(self, step: WorkflowStep) -> WorkflowError {
        WorkflowError::Remote {
            step,
            call: self.call,
            source: self.source,
        }
    }
}

/// Await a remote call, recording its outcome and duration.
async fn timed_call<T, F>(call: AdapterCall, future: F) -> Result<T, CallFailure>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    let started = Instant::now();
    let result = future.await;
    let outcome = if result.is_ok() { "ok" } else { "error" };
    metrics::REMOTE_CALLS
        .with_label_values(&[call.as_str(), outcome])
        .inc();
    metrics::REMOTE_CALL_DURATION
        .with_label_values(&[call.as_str()])
        .observe(started.elapsed().as_secs_f64());
    result.map_err(|source| CallFailure { call, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockAdServer};
    use std::sync::Mutex;

    fn workflow(server: &MockAdServer, config: OrderConfig) -> OrderWorkflow {
        OrderWorkflow::new(
            Arc::new(server.clone()),
            WorkflowConfig {
                batch_size: 100,
                ..Default::default()
            },
            config,
        )
    }

    #[tokio::test]
    async fn test_fresh_run_creates_everything() {
        let server = MockAdServer::new();
        server.set_lica_len(250).await;

        let wf = workflow(&server, fixtures::order_config("Header Bidding A"));
        let order = wf.run().await.unwrap();

        assert_eq!(order.lica_batch_count, 3);
        assert!(!order.line_item_ids.is_empty());

        let snapshot = wf.snapshot().await;
        assert_eq!(snapshot.step, WorkflowStep::Idle);
        assert_eq!(snapshot.total_steps, 6);
        assert_eq!(snapshot.attempt, AttemptState::FreshAttempt);
        assert_eq!(snapshot.config.order_id, Some(order.order_id));
        assert!(!snapshot.in_flight);
    }

    #[tokio::test]
    async fn test_empty_lica_config_collapses_to_fixed_steps() {
        let server = MockAdServer::new();
        server.set_lica_len(0).await;

        let wf = workflow(&server, fixtures::order_config("Empty"));
        let order = wf.run().await.unwrap();

        assert_eq!(order.lica_batch_count, 0);
        assert_eq!(server.create_calls(AdapterCall::CreateCreatives).await, 0);
        assert_eq!(wf.snapshot().await.total_steps, 3);
    }

    #[tokio::test]
    async fn test_invalid_config_sends_nothing() {
        let server = MockAdServer::new();
        let config = OrderConfig {
            name: String::new(),
            ..fixtures::order_config("x")
        };

        let wf = workflow(&server, config);
        let err = wf.run().await.unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidConfig(_)));
        assert!(server.recorded_calls().await.is_empty());
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_unknown_bidder_rejected_with_registry() {
        let server = MockAdServer::new();
        let registry = Arc::new(BidderRegistry::from_bidders(vec![fixtures::bidder(
            "openx", "OpenX",
        )]));

        let wf = workflow(&server, fixtures::order_config("A")).with_registry(registry);
        let err = wf.run().await.unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_completion_callback_receives_final_state() {
        let server = MockAdServer::new();
        server.set_lica_len(120).await;
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        let wf = workflow(&server, fixtures::order_config("A")).with_completion_callback(
            Arc::new(move |order: &OrderState| {
                *seen_clone.lock().unwrap() = Some(order.clone());
            }),
        );
        let order = wf.run().await.unwrap();

        assert_eq!(seen.lock().unwrap().as_ref(), Some(&order));
    }

    #[tokio::test]
    async fn test_progress_updates_follow_steps() {
        let server = MockAdServer::new();
        server.set_lica_len(150).await;
        let (tx, mut rx) = mpsc::channel(16);

        let wf = workflow(&server, fixtures::order_config("A")).with_progress(tx);
        wf.run().await.unwrap();
        drop(wf);

        let mut steps = Vec::new();
        while let Some(progress) = rx.recv().await {
            steps.push((progress.step_number, progress.total_steps));
        }
        assert_eq!(steps, vec![(1, 3), (2, 3), (4, 5), (5, 5)]);
    }

    #[tokio::test]
    async fn test_failed_lica_fetch_is_reported_against_the_fetch() {
        let server = MockAdServer::new();
        server
            .fail_next(AdapterCall::LicaConfig, AdapterError::Timeout)
            .await;

        let wf = workflow(&server, fixtures::order_config("A"));
        let err = wf.run().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Remote {
                call: AdapterCall::LicaConfig,
                ..
            }
        ));

        let snapshot = wf.snapshot().await;
        let failure = snapshot.last_failure.clone().unwrap();
        assert_eq!(failure.call, AdapterCall::LicaConfig);
        let notices = crate::reporter::notices(&snapshot, true);
        assert!(notices[0]
            .message
            .starts_with("Fetching creative associations failed: Request timed out."));
    }

    #[tokio::test]
    async fn test_failed_lica_fetch_on_resumed_order() {
        let server = MockAdServer::new();
        server.insert_order(fixtures::order_state(9, 4, 0)).await;
        server
            .fail_next(AdapterCall::LicaConfig, AdapterError::Timeout)
            .await;

        let wf = OrderWorkflow::resume(
            Arc::new(server.clone()),
            WorkflowConfig::default(),
            fixtures::order_config("A"),
            9,
        )
        .await
        .unwrap();
        let err = wf.run().await.unwrap_err();
        assert!(!err.is_recoverable());

        let snapshot = wf.snapshot().await;
        let failure = snapshot.last_failure.clone().unwrap();
        assert_eq!(failure.call, AdapterCall::LicaConfig);
        assert_eq!(failure.order_id, Some(9));
        assert_eq!(
            crate::reporter::failure_label(&failure, snapshot.total_batches),
            "Fetching creative associations"
        );
    }

    #[tokio::test]
    async fn test_reset_clears_order() {
        let server = MockAdServer::new();
        let wf = workflow(&server, fixtures::order_config("A"));
        wf.run().await.unwrap();

        wf.reset().await.unwrap();
        let snapshot = wf.snapshot().await;
        assert!(snapshot.order.is_none());
        assert_eq!(snapshot.config.order_id, None);
        assert_eq!(snapshot.config.name, "A");
    }

    #[tokio::test]
    async fn test_set_config_keeps_order_id() {
        let server = MockAdServer::new();
        server
            .fail_next(AdapterCall::CreateLineItems, AdapterError::Timeout)
            .await;
        let wf = workflow(&server, fixtures::order_config("A"));
        wf.run().await.unwrap_err();
        let order_id = wf.order_config().await.order_id;
        assert!(order_id.is_some());

        let mut updated = fixtures::order_config("Renamed");
        updated.order_id = None;
        wf.set_config(updated).await.unwrap();

        let config = wf.order_config().await;
        assert_eq!(config.name, "Renamed");
        assert_eq!(config.order_id, order_id);
    }
}
