//! Session layer seam
//!
//! Broker session establishment, TLS/auth and wire-level subscription
//! propagation live behind the [`Session`] trait. This crate only defines
//! the seam, the connection properties handed across it, and the
//! subscription flags; an actual broker binding implements the trait and
//! drives [`crate::client::Client::on_native_msg`] /
//! [`crate::client::Client::on_native_event`] from its callback thread.

use std::ops::BitOr;
use std::sync::Mutex;
use tracing::debug;

use crate::envelope::Message;
use crate::error::BusResult;

/// Subscription flags, bit-flag composable via `|`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscribeFlag(u32);

impl SubscribeFlag {
    pub const NONE: SubscribeFlag = SubscribeFlag(0);
    /// Block the subscribe call until the broker confirms
    pub const WAIT_FOR_CONFIRM: SubscribeFlag = SubscribeFlag(0x02);
    /// Ask the broker to confirm asynchronously (SubscriptionOk event)
    pub const REQUEST_CONFIRM: SubscribeFlag = SubscribeFlag(0x10);
    /// Dispatch only locally, do not propagate to the broker
    pub const LOCAL_DISPATCH_ONLY: SubscribeFlag = SubscribeFlag(0x08);

    pub fn contains(self, other: SubscribeFlag) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for SubscribeFlag {
    type Output = SubscribeFlag;

    fn bitor(self, rhs: SubscribeFlag) -> SubscribeFlag {
        SubscribeFlag(self.0 | rhs.0)
    }
}

/// Connection properties for a broker session.
///
/// Builder-style:
/// ```
/// use fanbus::session::SessionProps;
///
/// let props = SessionProps::default()
///     .host("tcp://localhost:55555")
///     .vpn("default")
///     .username("user")
///     .password("pass");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProps {
    pub host: String,
    pub vpn: String,
    pub username: String,
    pub password: String,
    pub client_name: String,
    pub connect_timeout_ms: u32,
    pub connect_retries: u32,
    pub reconnect_retries: u32,
    pub reconnect_retry_wait_ms: u32,
    pub keep_alive_ms: u32,
    pub keep_alive_limit: u32,
    pub compression_level: u32,
    pub tcp_nodelay: bool,
    pub reapply_subscriptions: bool,
    pub generate_sender_id: bool,
    pub generate_sequence_number: bool,
    pub generate_send_timestamps: bool,
    pub generate_rcv_timestamps: bool,
}

impl Default for SessionProps {
    fn default() -> Self {
        SessionProps {
            host: String::new(),
            vpn: String::new(),
            username: String::new(),
            password: String::new(),
            client_name: String::new(),
            connect_timeout_ms: 3000,
            connect_retries: 3,
            reconnect_retries: 10,
            reconnect_retry_wait_ms: 3000,
            keep_alive_ms: 3000,
            keep_alive_limit: 3,
            compression_level: 1,
            tcp_nodelay: true,
            reapply_subscriptions: true,
            generate_sender_id: false,
            generate_sequence_number: false,
            generate_send_timestamps: false,
            generate_rcv_timestamps: false,
        }
    }
}

macro_rules! setter {
    ($name:ident, String) => {
        pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.$name = value.into();
            self
        }
    };
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.$name = value;
            self
        }
    };
}

impl SessionProps {
    setter!(host, String);
    setter!(vpn, String);
    setter!(username, String);
    setter!(password, String);
    setter!(client_name, String);
    setter!(connect_timeout_ms, u32);
    setter!(connect_retries, u32);
    setter!(reconnect_retries, u32);
    setter!(reconnect_retry_wait_ms, u32);
    setter!(keep_alive_ms, u32);
    setter!(keep_alive_limit, u32);
    setter!(compression_level, u32);
    setter!(tcp_nodelay, bool);
    setter!(reapply_subscriptions, bool);
    setter!(generate_sender_id, bool);
    setter!(generate_sequence_number, bool);
    setter!(generate_send_timestamps, bool);
    setter!(generate_rcv_timestamps, bool);
}

/// The broker session surface the client facade talks to
pub trait Session: Send + Sync {
    fn connect(&self, props: &SessionProps) -> BusResult<()>;
    fn disconnect(&self);
    fn subscribe(&self, topic: &str, flags: SubscribeFlag) -> BusResult<()>;
    fn unsubscribe(&self, topic: &str, flags: SubscribeFlag) -> BusResult<()>;
    fn send(&self, msg: &Message) -> BusResult<()>;
}

/// Session implementation with no broker behind it.
///
/// Used when a client is constructed offline and in tests; it accepts every
/// operation and records subscriptions so the facade behaves consistently.
#[derive(Default)]
pub struct NullSession {
    subscriptions: Mutex<Vec<String>>,
}

impl NullSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .clone()
    }
}

impl Session for NullSession {
    fn connect(&self, props: &SessionProps) -> BusResult<()> {
        debug!(host = %props.host, vpn = %props.vpn, "null session connect");
        Ok(())
    }

    fn disconnect(&self) {
        debug!("null session disconnect");
    }

    fn subscribe(&self, topic: &str, flags: SubscribeFlag) -> BusResult<()> {
        debug!(topic, flags = flags.bits(), "null session subscribe");
        let mut subs = self.subscriptions.lock().expect("subscription lock poisoned");
        if !subs.iter().any(|t| t == topic) {
            subs.push(topic.to_string());
        }
        Ok(())
    }

    fn unsubscribe(&self, topic: &str, _flags: SubscribeFlag) -> BusResult<()> {
        let mut subs = self.subscriptions.lock().expect("subscription lock poisoned");
        subs.retain(|t| t != topic);
        Ok(())
    }

    fn send(&self, msg: &Message) -> BusResult<()> {
        debug!(topic = msg.topic(), "null session send");
        Ok(())
    }
}
