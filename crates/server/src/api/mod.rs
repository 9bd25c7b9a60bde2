pub mod handlers;
pub mod middleware;
pub mod options;
pub mod resolve;
pub mod routes;
pub mod stream;

pub use routes::create_router;
