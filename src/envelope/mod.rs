//! Message and event envelopes carried through the dispatcher

mod event;
mod message;
mod properties;

pub use event::{Event, SessionEvent};
pub use message::Message;
pub use properties::PropertyMap;
