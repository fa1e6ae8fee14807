use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{bidders, handlers, middleware::metrics_middleware, products, settings, wizard};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Bidders (read-only registry)
        .route("/bidders", get(bidders::list_bidders))
        .route("/bidders/{key}", get(bidders::get_bidder))
        // Ad products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        // Ad settings
        .route("/settings", get(settings::list_sections))
        .route("/settings/{section}", get(settings::get_section))
        .route("/settings/{section}/{key}", put(settings::update_setting))
        // Order provisioning wizard
        .route("/wizard", get(wizard::get_wizard))
        .route("/wizard/config", put(wizard::update_config))
        .route("/wizard/run", post(wizard::run_wizard))
        .route("/wizard/resume/{order_id}", post(wizard::resume_order))
        .route("/wizard/reset", post(wizard::reset_wizard))
        .route("/wizard/issues", get(wizard::check_issues))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
