//! The client facade
//!
//! One [`Client`] owns two fan-out dispatchers, one for [`Message`] traffic
//! and one for [`Event`] traffic, plus the broker session behind the
//! [`Session`] seam. The session binding's native callback thread feeds
//! [`Client::on_native_msg`] and [`Client::on_native_event`]; everything the
//! application sees, receivers and callbacks alike, hangs off the
//! dispatchers.
//!
//! Receiver getters can be called any number of times; every call registers
//! a fresh independent sink. A receiver starts empty and only observes
//! traffic arriving after its registration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dispatch::{AsyncReceiver, FanoutDispatcher, Receiver, Selector};
use crate::envelope::{Event, Message};
use crate::error::{BusError, BusResult};
use crate::session::{NullSession, Session, SessionProps, SubscribeFlag};

/// Facade over the session seam and the two dispatch planes
pub struct Client {
    session: Arc<dyn Session>,
    msg_dispatcher: Arc<FanoutDispatcher<Message>>,
    event_dispatcher: Arc<FanoutDispatcher<Event>>,
    connected: AtomicBool,
}

impl Client {
    /// Create a client with no broker binding behind it.
    ///
    /// Useful offline and in tests: every session operation succeeds and
    /// traffic is injected via [`Client::on_native_msg`].
    pub fn new() -> Self {
        Self::with_session(Arc::new(NullSession::new()))
    }

    /// Create a client over a concrete session binding
    pub fn with_session(session: Arc<dyn Session>) -> Self {
        let msg_dispatcher = Arc::new(FanoutDispatcher::new());
        let event_dispatcher: Arc<FanoutDispatcher<Event>> = Arc::new(FanoutDispatcher::new());

        // A faulting message callback surfaces as an InternalError event so
        // the native thread keeps running and the application still hears
        // about it.
        let events = event_dispatcher.clone();
        msg_dispatcher.set_fault_hook(move |info| {
            events.deliver(Event::internal_error(info));
        });

        Client {
            session,
            msg_dispatcher,
            event_dispatcher,
            connected: AtomicBool::new(false),
        }
    }

    /// Establish the broker session
    pub fn connect(&self, props: &SessionProps) -> BusResult<()> {
        info!(host = %props.host, vpn = %props.vpn, "connecting");
        self.session.connect(props)?;
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    /// Tear down the broker session. Receivers stay usable; they simply stop
    /// observing new traffic until the next connect.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            debug!("disconnecting");
            self.session.disconnect();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Subscribe with broker confirmation requested
    pub fn subscribe(&self, topic: &str) -> BusResult<()> {
        self.subscribe_ext(topic, SubscribeFlag::REQUEST_CONFIRM)
    }

    /// Subscribe with explicit flags
    pub fn subscribe_ext(&self, topic: &str, flags: SubscribeFlag) -> BusResult<()> {
        if topic.is_empty() {
            return Err(BusError::validation("subscription topic must not be empty"));
        }
        debug!(topic, flags = flags.bits(), "subscribe");
        self.session.subscribe(topic, flags)
    }

    /// Unsubscribe with broker confirmation requested
    pub fn unsubscribe(&self, topic: &str) -> BusResult<()> {
        self.unsubscribe_ext(topic, SubscribeFlag::REQUEST_CONFIRM)
    }

    /// Unsubscribe with explicit flags
    pub fn unsubscribe_ext(&self, topic: &str, flags: SubscribeFlag) -> BusResult<()> {
        if topic.is_empty() {
            return Err(BusError::validation("subscription topic must not be empty"));
        }
        debug!(topic, flags = flags.bits(), "unsubscribe");
        self.session.unsubscribe(topic, flags)
    }

    /// Publish a message through the session
    pub fn send_msg(&self, msg: &Message) -> BusResult<()> {
        self.session.send(msg)
    }

    /// Register a blocking receiver observing every inbound message
    pub fn get_msg_receiver(&self) -> Receiver<Message> {
        self.msg_dispatcher.add_receiver(Selector::All)
    }

    /// Register a blocking receiver observing only request messages
    /// (reply topic set, not itself a reply)
    pub fn get_request_receiver(&self) -> Receiver<Message> {
        self.msg_dispatcher.add_receiver(Selector::Request)
    }

    /// Register a blocking receiver observing only point-to-point messages
    pub fn get_p2p_receiver(&self) -> Receiver<Message> {
        self.msg_dispatcher.add_receiver(Selector::P2p)
    }

    /// Register a blocking receiver for session events
    pub fn get_event_receiver(&self) -> Receiver<Event> {
        self.event_dispatcher.add_receiver(Selector::All)
    }

    /// Async counterpart of [`Client::get_msg_receiver`]
    pub fn get_async_msg_receiver(&self) -> AsyncReceiver<Message> {
        self.msg_dispatcher.add_async_receiver(Selector::All)
    }

    /// Async counterpart of [`Client::get_request_receiver`]
    pub fn get_async_request_receiver(&self) -> AsyncReceiver<Message> {
        self.msg_dispatcher.add_async_receiver(Selector::Request)
    }

    /// Async counterpart of [`Client::get_p2p_receiver`]
    pub fn get_async_p2p_receiver(&self) -> AsyncReceiver<Message> {
        self.msg_dispatcher.add_async_receiver(Selector::P2p)
    }

    /// Async counterpart of [`Client::get_event_receiver`]
    pub fn get_async_event_receiver(&self) -> AsyncReceiver<Event> {
        self.event_dispatcher.add_async_receiver(Selector::All)
    }

    /// Register a message callback invoked synchronously on the native
    /// callback thread. Must not block; a panic inside it is contained and
    /// reported as an InternalError event.
    pub fn set_msg_callback(&self, callback: impl Fn(Message) + Send + Sync + 'static) {
        self.msg_dispatcher.add_callback(Selector::All, callback);
    }

    /// Register an event callback invoked synchronously on the native
    /// callback thread
    pub fn set_event_callback(&self, callback: impl Fn(Event) + Send + Sync + 'static) {
        self.event_dispatcher.add_callback(Selector::All, callback);
    }

    /// Entry point for the session binding's message callback thread
    pub fn on_native_msg(&self, msg: Message) {
        self.msg_dispatcher.deliver(msg);
    }

    /// Entry point for the session binding's event callback thread
    pub fn on_native_event(&self, event: Event) {
        self.event_dispatcher.deliver(event);
    }

    /// Shut down both dispatch planes. Every pending and future receive
    /// observes `Closed`; subsequent inbound traffic is dropped.
    pub fn close(&self) {
        warn!("closing client dispatch");
        self.msg_dispatcher.close();
        self.event_dispatcher.close();
        self.disconnect();
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.msg_dispatcher.close();
        self.event_dispatcher.close();
        if self.connected.load(Ordering::Acquire) {
            self.session.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::SessionEvent;

    fn msg(topic: &str) -> Message {
        Message::new(topic, &b"x"[..]).unwrap()
    }

    #[test]
    fn test_connect_and_disconnect_track_state() {
        let client = Client::new();
        assert!(!client.is_connected());
        let props = SessionProps::default().host("tcp://h:1").vpn("v");
        client.connect(&props).unwrap();
        assert!(client.is_connected());
        client.disconnect();
        assert!(!client.is_connected());
    }

    #[test]
    fn test_empty_subscription_topic_rejected() {
        let client = Client::new();
        assert!(client.subscribe("").is_err());
        assert!(client.unsubscribe("").is_err());
    }

    #[test]
    fn test_subscriptions_reach_session() {
        let session = Arc::new(NullSession::new());
        let client = Client::with_session(session.clone());
        client.subscribe("a/>").unwrap();
        client
            .subscribe_ext("b/c", SubscribeFlag::LOCAL_DISPATCH_ONLY)
            .unwrap();
        assert_eq!(session.subscriptions(), vec!["a/>", "b/c"]);
        client.unsubscribe("a/>").unwrap();
        assert_eq!(session.subscriptions(), vec!["b/c"]);
    }

    #[test]
    fn test_receiver_sees_native_traffic() {
        let client = Client::new();
        let rx = client.get_msg_receiver();
        client.on_native_msg(msg("t/1"));
        client.on_native_msg(msg("t/2"));
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.recv().unwrap().topic(), "t/1");
    }

    #[test]
    fn test_request_receiver_filters() {
        let client = Client::new();
        let requests = client.get_request_receiver();
        client.on_native_msg(msg("plain"));
        client.on_native_msg(msg("req").with_reply_topic("reply/here"));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests.recv().unwrap().topic(), "req");
    }

    #[test]
    fn test_p2p_receiver_filters() {
        let client = Client::new();
        let p2p = client.get_p2p_receiver();
        client.on_native_msg(msg("normal/topic"));
        client.on_native_msg(msg("#P2P/v:1/client/inbox"));
        assert_eq!(p2p.len(), 1);
    }

    #[test]
    fn test_event_receiver_sees_session_events() {
        let client = Client::new();
        let events = client.get_event_receiver();
        client.on_native_event(Event::new(SessionEvent::UpNotice, 200, "up"));
        let event = events.recv().unwrap();
        assert_eq!(event.session_event, SessionEvent::UpNotice);
    }

    #[test]
    fn test_msg_callback_fault_becomes_internal_error_event() {
        let client = Client::new();
        let events = client.get_event_receiver();
        client.set_msg_callback(|_msg| panic!("boom in consumer"));
        client.on_native_msg(msg("t"));
        let event = events.recv().unwrap();
        assert_eq!(event.session_event, SessionEvent::InternalError);
        assert!(event.info.contains("boom in consumer"));
    }

    #[test]
    fn test_close_unblocks_and_drops_later_traffic() {
        let client = Client::new();
        let rx = client.get_msg_receiver();
        client.close();
        assert!(rx.recv().is_err());
        client.on_native_msg(msg("late"));
        assert_eq!(rx.len(), 0);
    }

    #[test]
    fn test_each_getter_call_is_independent() {
        let client = Client::new();
        let rx1 = client.get_msg_receiver();
        client.on_native_msg(msg("first"));
        let rx2 = client.get_msg_receiver();
        client.on_native_msg(msg("second"));
        assert_eq!(rx1.len(), 2);
        // rx2 registered after "first", so it only observes "second".
        assert_eq!(rx2.len(), 1);
        assert_eq!(rx2.recv().unwrap().topic(), "second");
    }

    #[tokio::test]
    async fn test_async_receivers() {
        let client = Arc::new(Client::new());
        let rx = client.get_async_msg_receiver();
        let events = client.get_async_event_receiver();
        let c = client.clone();
        let native = std::thread::spawn(move || {
            c.on_native_msg(msg("async/t"));
            c.on_native_event(Event::new(SessionEvent::CanSend, 0, ""));
        });
        assert_eq!(rx.recv().await.unwrap().topic(), "async/t");
        assert_eq!(
            events.recv().await.unwrap().session_event,
            SessionEvent::CanSend
        );
        native.join().unwrap();
    }
}
