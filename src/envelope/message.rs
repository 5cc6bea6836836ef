//! The message envelope

use bytes::Bytes;

use crate::envelope::PropertyMap;
use crate::error::{BusError, BusResult};
use crate::runtime;
use crate::sdt::{self, Value};

/// Topic prefix the broker uses for point-to-point delivery
pub(crate) const P2P_TOPIC_PREFIX: &str = "#P2P/";

/// A message carried through the bus.
///
/// Messages are self-contained value objects: constructing one never needs a
/// live client or session. The required process-wide runtime state is
/// initialized transparently on first use.
#[derive(Debug, Clone)]
pub struct Message {
    topic: String,
    payload: Bytes,
    corr_id: Option<String>,
    reply_topic: Option<String>,
    is_reply: bool,
    eligible: bool,
    cos: u8,
    delivery_to_one: bool,
    props: Option<PropertyMap>,
    sequence: u64,
}

impl Message {
    /// Create a message with the required topic and payload.
    ///
    /// All optional fields default to empty/false/zero. Fails with a
    /// validation error when the topic is empty.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> BusResult<Self> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(BusError::validation("message topic must not be empty"));
        }
        Ok(Message {
            topic,
            payload: payload.into(),
            corr_id: None,
            reply_topic: None,
            is_reply: false,
            eligible: false,
            cos: 0,
            delivery_to_one: false,
            props: None,
            sequence: runtime::handle().next_sequence(),
        })
    }

    pub fn with_corr_id(mut self, corr_id: impl Into<String>) -> Self {
        self.corr_id = Some(corr_id.into());
        self
    }

    pub fn with_reply_topic(mut self, reply_topic: impl Into<String>) -> Self {
        self.reply_topic = Some(reply_topic.into());
        self
    }

    pub fn with_is_reply(mut self, is_reply: bool) -> Self {
        self.is_reply = is_reply;
        self
    }

    pub fn with_eligible(mut self, eligible: bool) -> Self {
        self.eligible = eligible;
        self
    }

    pub fn with_cos(mut self, cos: u8) -> Self {
        self.cos = cos;
        self
    }

    pub fn with_delivery_to_one(mut self, delivery_to_one: bool) -> Self {
        self.delivery_to_one = delivery_to_one;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: impl Into<Bytes>) {
        self.payload = payload.into();
    }

    pub fn corr_id(&self) -> Option<&str> {
        self.corr_id.as_deref()
    }

    pub fn reply_topic(&self) -> Option<&str> {
        self.reply_topic.as_deref()
    }

    pub fn is_reply(&self) -> bool {
        self.is_reply
    }

    pub fn eligible(&self) -> bool {
        self.eligible
    }

    pub fn cos(&self) -> u8 {
        self.cos
    }

    pub fn delivery_to_one(&self) -> bool {
        self.delivery_to_one
    }

    /// Process-wide sequence number stamped at construction
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True when the topic carries the broker's point-to-point prefix
    pub fn is_p2p(&self) -> bool {
        self.topic.starts_with(P2P_TOPIC_PREFIX)
    }

    /// True for an unanswered request: a reply destination is set and the
    /// message is not itself a reply
    pub fn is_request(&self) -> bool {
        !self.is_reply && self.reply_topic.is_some()
    }

    /// Set a user property, creating the property map with the default
    /// capacity on first use. Insert-only: see [`PropertyMap::set`].
    pub fn set_user_prop(&mut self, key: &str, value: &str) -> BusResult<()> {
        self.props.get_or_insert_with(PropertyMap::new).set(key, value)
    }

    /// Set a user property with a capacity hint.
    ///
    /// The hint sizes the property map when it is created on first use; it
    /// has no effect once the map exists.
    pub fn set_user_prop_with_capacity(
        &mut self,
        key: &str,
        value: &str,
        map_size: usize,
    ) -> BusResult<()> {
        self.props
            .get_or_insert_with(|| PropertyMap::with_capacity(map_size))
            .set(key, value)
    }

    /// Look up a user property; NotFound when never set or cleared
    pub fn get_user_prop(&self, key: &str) -> BusResult<&str> {
        match &self.props {
            Some(props) => props.get(key),
            None => Err(BusError::not_found(key)),
        }
    }

    pub fn user_props(&self) -> Option<&PropertyMap> {
        self.props.as_ref()
    }

    /// Decode the payload as an SDT value
    pub fn sdt_payload(&self) -> BusResult<Value> {
        sdt::decode(&self.payload)
    }

    /// Encode an SDT value into the payload
    pub fn set_sdt_payload(&mut self, value: &Value) -> BusResult<()> {
        self.payload = sdt::encode(value)?;
        Ok(())
    }

    /// Return the envelope to a blank state: property map, correlation id,
    /// reply topic and flags are cleared. Topic and payload are kept.
    pub fn reset(&mut self) {
        self.props = None;
        self.corr_id = None;
        self.reply_topic = None;
        self.is_reply = false;
        self.eligible = false;
        self.cos = 0;
        self.delivery_to_one = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_defaults() {
        let msg = Message::new("test/topic", &b"test data"[..]).unwrap();
        assert_eq!(msg.topic(), "test/topic");
        assert_eq!(msg.payload().as_ref(), b"test data");
        assert_eq!(msg.corr_id(), None);
        assert_eq!(msg.reply_topic(), None);
        assert!(!msg.is_reply());
        assert!(!msg.eligible());
        assert_eq!(msg.cos(), 0);
        assert!(!msg.delivery_to_one());
    }

    #[test]
    fn test_empty_topic_rejected() {
        let err = Message::new("", &b"data"[..]).unwrap_err();
        assert!(matches!(err, BusError::Validation { .. }));
    }

    #[test]
    fn test_empty_payload_allowed() {
        let msg = Message::new("t", Bytes::new()).unwrap();
        assert!(msg.payload().is_empty());
    }

    #[test]
    fn test_builder_setters() {
        let msg = Message::new("t", &b""[..])
            .unwrap()
            .with_corr_id("c1")
            .with_reply_topic("reply/here")
            .with_eligible(true)
            .with_cos(2)
            .with_delivery_to_one(true);
        assert_eq!(msg.corr_id(), Some("c1"));
        assert_eq!(msg.reply_topic(), Some("reply/here"));
        assert!(msg.eligible());
        assert_eq!(msg.cos(), 2);
        assert!(msg.delivery_to_one());
    }

    #[test]
    fn test_classification_helpers() {
        let plain = Message::new("a/b", &b""[..]).unwrap();
        assert!(!plain.is_p2p());
        assert!(!plain.is_request());

        let request = Message::new("a/b", &b""[..])
            .unwrap()
            .with_reply_topic("reply/q");
        assert!(request.is_request());

        let reply = Message::new("a/b", &b""[..])
            .unwrap()
            .with_reply_topic("reply/q")
            .with_is_reply(true);
        assert!(!reply.is_request());

        let p2p = Message::new("#P2P/v:1/abc/q", &b""[..]).unwrap();
        assert!(p2p.is_p2p());
    }

    #[test]
    fn test_user_props_roundtrip() {
        let mut msg = Message::new("t", &b""[..]).unwrap();
        msg.set_user_prop("key1", "value1").unwrap();
        assert_eq!(msg.get_user_prop("key1").unwrap(), "value1");
    }

    #[test]
    fn test_user_prop_insert_only() {
        let mut msg = Message::new("t", &b""[..]).unwrap();
        msg.set_user_prop("key1", "value1").unwrap();
        msg.set_user_prop("key1", "new_value").unwrap();
        assert_eq!(msg.get_user_prop("key1").unwrap(), "value1");
    }

    #[test]
    fn test_user_prop_missing() {
        let msg = Message::new("t", &b""[..]).unwrap();
        assert!(matches!(
            msg.get_user_prop("nonexistent"),
            Err(BusError::NotFound { .. })
        ));
    }

    #[test]
    fn test_user_prop_capacity_hint_first_use_only() {
        let mut msg = Message::new("t", &b""[..]).unwrap();
        msg.set_user_prop_with_capacity("a", "1", 1).unwrap();
        // Map already exists with capacity 1; a bigger hint does not resize.
        let err = msg.set_user_prop_with_capacity("b", "2", 100).unwrap_err();
        assert!(matches!(err, BusError::Validation { .. }));
    }

    #[test]
    fn test_prop_maps_independent_between_messages() {
        let mut m1 = Message::new("t", &b""[..]).unwrap();
        let mut m2 = Message::new("t", &b""[..]).unwrap();
        m1.set_user_prop("k", "v1").unwrap();
        m2.set_user_prop("k", "v2").unwrap();
        assert_eq!(m1.get_user_prop("k").unwrap(), "v1");
        assert_eq!(m2.get_user_prop("k").unwrap(), "v2");
    }

    #[test]
    fn test_reset_clears_envelope_state() {
        let mut msg = Message::new("t", &b"payload"[..])
            .unwrap()
            .with_corr_id("c")
            .with_reply_topic("r")
            .with_is_reply(true)
            .with_cos(3);
        msg.set_user_prop("k", "v").unwrap();
        msg.reset();
        assert_eq!(msg.corr_id(), None);
        assert_eq!(msg.reply_topic(), None);
        assert!(!msg.is_reply());
        assert_eq!(msg.cos(), 0);
        assert!(matches!(
            msg.get_user_prop("k"),
            Err(BusError::NotFound { .. })
        ));
        // Reset is reusable: properties can be set again afterwards.
        msg.set_user_prop("k", "v2").unwrap();
        assert_eq!(msg.get_user_prop("k").unwrap(), "v2");
    }

    #[test]
    fn test_sdt_payload_roundtrip() {
        let mut msg = Message::new("t", &b""[..]).unwrap();
        let value = Value::map(vec![("test", Value::Int(1))]);
        msg.set_sdt_payload(&value).unwrap();
        assert_eq!(msg.sdt_payload().unwrap(), value);
    }

    #[test]
    fn test_construction_without_client_stamps_sequence() {
        let a = Message::new("t", &b""[..]).unwrap();
        let b = Message::new("t", &b""[..]).unwrap();
        assert!(b.sequence() > a.sequence());
    }
}
