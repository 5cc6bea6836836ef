//! Fan-out dispatch from the native callback thread to consumer sinks

mod dispatcher;
mod queue;

pub use dispatcher::{Classify, FanoutDispatcher, Selector};
pub use queue::{AsyncReceiver, Receiver};
