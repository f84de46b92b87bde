pub mod error;
pub mod model;
pub mod runtime;

pub use error::PollError;
pub use model::{PollOutcome, PollerConfig, ScanReport};
pub use runtime::{Poller, PollerHandle};
