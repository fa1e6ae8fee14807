//! The provisioning wizard session shared by the API handlers.
//!
//! Holds the current [`OrderWorkflow`] and rebuilds it when an existing order
//! is resumed. Broken orders are archived on the remote server when a run
//! fails for good.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};

use adprovision_core::reporter::progress_label;
use adprovision_core::{
    AdServerAdapter, BidderRegistry, CompletionCallback, OrderConfig, OrderId, OrderState,
    OrderWorkflow, UnrecoverableCallback, WorkflowConfig, WorkflowError, WorkflowProgress,
};

/// Wizard state shared across requests.
pub struct WizardSession {
    adapter: Arc<dyn AdServerAdapter>,
    config: WorkflowConfig,
    registry: Arc<BidderRegistry>,
    workflow: RwLock<Arc<OrderWorkflow>>,
    last_progress: Arc<RwLock<Option<WorkflowProgress>>>,
}

impl WizardSession {
    pub fn new(
        adapter: Arc<dyn AdServerAdapter>,
        config: WorkflowConfig,
        registry: Arc<BidderRegistry>,
    ) -> Self {
        let last_progress = Arc::new(RwLock::new(None));
        let workflow = Self::build(
            &adapter,
            &config,
            &registry,
            &last_progress,
            OrderWorkflow::new(Arc::clone(&adapter), config.clone(), OrderConfig::default()),
        );
        Self {
            adapter,
            config,
            registry,
            workflow: RwLock::new(Arc::new(workflow)),
            last_progress,
        }
    }

    /// Attach the registry, callbacks and a progress listener to a workflow.
    fn build(
        adapter: &Arc<dyn AdServerAdapter>,
        config: &WorkflowConfig,
        registry: &Arc<BidderRegistry>,
        last_progress: &Arc<RwLock<Option<WorkflowProgress>>>,
        workflow: OrderWorkflow,
    ) -> OrderWorkflow {
        let (progress_tx, progress_rx) = mpsc::channel(config.progress_buffer.max(1));
        tokio::spawn(track_progress(progress_rx, Arc::clone(last_progress)));

        workflow
            .with_registry(Arc::clone(registry))
            .with_progress(progress_tx)
            .with_completion_callback(completion_callback())
            .with_unrecoverable_callback(archive_callback(Arc::clone(adapter)))
    }

    /// The workflow currently driven by the wizard.
    pub async fn current(&self) -> Arc<OrderWorkflow> {
        Arc::clone(&*self.workflow.read().await)
    }

    /// Most recent progress update of the current or last run.
    pub async fn last_progress(&self) -> Option<WorkflowProgress> {
        self.last_progress.read().await.clone()
    }

    pub async fn set_config(&self, config: OrderConfig) -> Result<(), WorkflowError> {
        self.current().await.set_config(config).await
    }

    /// Run the current workflow until it completes or fails.
    pub async fn run(&self) -> Result<OrderState, WorkflowError> {
        *self.last_progress.write().await = None;
        self.current().await.run().await
    }

    /// Replace the current workflow with one continuing an existing order.
    pub async fn resume(&self, order_id: OrderId) -> Result<OrderState, WorkflowError> {
        let mut slot = self.workflow.write().await;
        if slot.is_in_flight() {
            return Err(WorkflowError::InFlight);
        }

        let order_config = slot.order_config().await;
        let resumed = OrderWorkflow::resume(
            Arc::clone(&self.adapter),
            self.config.clone(),
            order_config,
            order_id,
        )
        .await?;
        let resumed = Self::build(
            &self.adapter,
            &self.config,
            &self.registry,
            &self.last_progress,
            resumed,
        );

        let order = resumed.order().await.unwrap_or_else(|| OrderState::new(order_id, ""));
        *slot = Arc::new(resumed);
        *self.last_progress.write().await = None;
        Ok(order)
    }

    pub async fn reset(&self) -> Result<(), WorkflowError> {
        self.current().await.reset().await?;
        *self.last_progress.write().await = None;
        Ok(())
    }

    /// Whether the current order is behind what it needs.
    pub async fn check_issues(&self) -> Result<bool, WorkflowError> {
        self.current().await.check_issues().await
    }
}

async fn track_progress(
    mut rx: mpsc::Receiver<WorkflowProgress>,
    last_progress: Arc<RwLock<Option<WorkflowProgress>>>,
) {
    while let Some(progress) = rx.recv().await {
        info!(order_id = ?progress.order_id, "{}", progress_label(&progress));
        *last_progress.write().await = Some(progress);
    }
}

fn completion_callback() -> CompletionCallback {
    Arc::new(|order: &OrderState| {
        info!(
            order_id = order.order_id,
            line_items = order.line_item_ids.len(),
            batches = order.lica_batch_count,
            "Order provisioning completed"
        );
    })
}

/// Archive the broken order on the remote server.
fn archive_callback(adapter: Arc<dyn AdServerAdapter>) -> UnrecoverableCallback {
    Arc::new(move |order: OrderState| {
        let adapter = Arc::clone(&adapter);
        Box::pin(async move {
            match adapter.archive_order(order.order_id).await {
                Ok(()) => info!(order_id = order.order_id, "Archived broken order"),
                Err(e) => error!(order_id = order.order_id, "Failed to archive order: {}", e),
            }
        })
    })
}
