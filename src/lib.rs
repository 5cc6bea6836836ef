//! fanbus - a client-side message bus adapter
//!
//! Bridges a broker binding's single native callback thread to any number of
//! application consumers. Inbound messages and session events are fanned out
//! through per-consumer FIFO queues drained by blocking or async receivers,
//! or by direct callbacks.
//!
//! ## Architecture
//!
//! - **Client facade** ([`Client`]): owns the session seam and the two
//!   dispatch planes (messages and events)
//! - **Fan-out dispatch** ([`FanoutDispatcher`], [`Receiver`],
//!   [`AsyncReceiver`]): broadcast from one producer thread to N independent
//!   sinks, classified by [`Selector`]
//! - **Envelopes** ([`Message`], [`Event`], [`PropertyMap`]): self-contained
//!   value objects carried through the bus
//! - **Structured data codec** ([`sdt`]): the broker's typed binary
//!   container format, [`dumps`]/[`loads`] over [`Value`]
//! - **Session seam** ([`Session`], [`SessionProps`]): the surface a
//!   concrete broker binding implements
//!
//! ## Quick start
//!
//! ```
//! use fanbus::{Client, Message};
//!
//! let client = Client::new();
//! let rx = client.get_msg_receiver();
//!
//! // Normally the broker binding's callback thread feeds this.
//! let msg = Message::new("sensors/temp", &b"21.5"[..]).unwrap();
//! client.on_native_msg(msg);
//!
//! assert_eq!(rx.len(), 1);
//! assert_eq!(rx.recv().unwrap().topic(), "sensors/temp");
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod observability;
pub mod runtime;
pub mod sdt;
pub mod session;

pub use client::Client;
pub use config::{ClientConfig, ConfigError};
pub use dispatch::{AsyncReceiver, Classify, FanoutDispatcher, Receiver, Selector};
pub use envelope::{Event, Message, PropertyMap, SessionEvent};
pub use error::{BusError, BusResult, RecvError, TryRecvError};
pub use observability::{init_default_logging, init_logging, LogFormat};
pub use sdt::{dumps, loads, Value};
pub use session::{NullSession, Session, SessionProps, SubscribeFlag};
