mod events;
mod http;

pub use events::{BroadcastEventsPort, NoopEventsPort, PipelineEvent};
pub use http::{HttpFeed, HttpFeedConfig};
