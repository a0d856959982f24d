pub mod concurrency;
pub mod cooldown;
pub mod executor;
pub mod sweeper;

pub use concurrency::*;
pub use cooldown::*;
pub use executor::*;
pub use sweeper::*;
