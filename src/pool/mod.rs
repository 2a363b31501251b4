mod bucket;
pub mod callback;
pub mod config;
pub mod pool;
mod queue;
pub mod types;


pub use callback::Callback;
pub use config::{Config, ConfigBuilder};
pub use pool::Pool;
pub use types::{PoolError, State, SubmitError};
