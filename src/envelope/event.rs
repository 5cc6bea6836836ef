//! Session events delivered through the event receiver path
//!
//! Connection and session state changes are data, not exceptions: the
//! session layer turns them into [`Event`] items and the dispatcher fans
//! them out like any other traffic.

/// Closed set of session-level event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// Session established and ready for traffic
    UpNotice,
    /// Session lost with an error
    DownError,
    /// Connection attempt failed
    ConnectFailedError,
    /// Broker rejected a published message
    RejectedMsgError,
    /// Subscription confirmed by the broker
    SubscriptionOk,
    /// Subscription rejected by the broker
    SubscriptionError,
    /// Flow control lifted, sending possible again
    CanSend,
    /// Automatic reconnect in progress
    ReconnectingNotice,
    /// Automatic reconnect succeeded
    ReconnectedNotice,
    /// Endpoint provisioning succeeded
    ProvisionOk,
    /// Endpoint provisioning failed
    ProvisionError,
    /// A consumer callback faulted inside the dispatcher
    InternalError,
}

/// A session event envelope: kind plus broker response code and detail text
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub session_event: SessionEvent,
    pub response_code: u32,
    pub info: String,
}

impl Event {
    pub fn new(session_event: SessionEvent, response_code: u32, info: impl Into<String>) -> Self {
        Event {
            session_event,
            response_code,
            info: info.into(),
        }
    }

    /// Event reported when a registered sink's callback panics during
    /// dispatch. Delivered through the event channel so the native thread
    /// keeps running.
    pub fn internal_error(info: impl Into<String>) -> Self {
        Event::new(SessionEvent::InternalError, 0, info)
    }

    pub fn session_event_string(&self) -> String {
        format!("{:?}", self.session_event)
    }
}
