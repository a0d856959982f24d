pub mod daemon;
pub mod engine;
pub mod fixtures;
pub mod helpers;
pub mod http_client;
pub mod metrics;

pub use daemon::*;
pub use engine::*;
pub use fixtures::*;
pub use helpers::*;
pub use http_client::*;
pub use metrics::*;
