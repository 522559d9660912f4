//! Mock implementations of the core capability traits.

mod clock;
mod repository;
mod sink;

pub use clock::{FixedClock, test_clock};
pub use repository::InMemoryUserRepository;
pub use sink::{FailingEventSink, RecordingEventSink};
