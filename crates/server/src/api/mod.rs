pub mod bidders;
pub mod handlers;
pub mod middleware;
pub mod products;
pub mod routes;
pub mod settings;
pub mod wizard;

pub use routes::create_router;
