mod loader;
mod schema;
mod tracing_setup;

pub use loader::load;
pub use schema::{CoordinatorConfig, LoggingConfig};
pub use tracing_setup::init_tracing;
