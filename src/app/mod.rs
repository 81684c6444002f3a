pub mod probe;
pub mod rate_limit;
pub mod scheduler;
pub mod server;

pub use scheduler::{Dispatched, JobDispatcher, Scheduler};
pub use server::{build_router, serve, serve_router, shutdown_signal, AppState};
