pub mod routes;
pub mod server;
pub mod state;

pub use routes::{StatusBody, router};
pub use server::{bind, run_until, serve_connection};
pub use state::AppState;
