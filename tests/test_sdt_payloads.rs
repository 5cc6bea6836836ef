//! End-to-end structured payload scenarios: build a typed value, carry it
//! through a message envelope, and read it back on the consumer side.

use fanbus::{dumps, loads, Client, Message, Value};

#[test]
fn test_map_payload_survives_dispatch() {
    let client = Client::new();
    let rx = client.get_msg_receiver();

    let value = Value::map(vec![
        ("test", Value::Int(1)),
        ("name", Value::Str("sensor-a".into())),
        ("online", Value::Bool(true)),
    ]);
    let mut msg = Message::new("telemetry/update", &b""[..]).unwrap();
    msg.set_sdt_payload(&value).unwrap();
    client.on_native_msg(msg);

    let received = rx.recv().unwrap();
    let decoded = received.sdt_payload().unwrap();
    assert_eq!(decoded.get("test"), Some(&Value::Int(1)));
    assert_eq!(decoded.get("name"), Some(&Value::Str("sensor-a".into())));
    assert_eq!(decoded.get("online"), Some(&Value::Bool(true)));
}

#[test]
fn test_loads_dumps_round_trip() {
    let value = Value::map(vec![("test", Value::Int(1))]);
    let wire = dumps(&value).unwrap();
    assert_eq!(loads(&wire).unwrap(), value);
}

#[test]
fn test_mixed_list_round_trip() {
    let value = Value::List(vec![
        Value::Null,
        Value::Bool(false),
        Value::Int(-42),
        Value::Float(2.5),
        Value::Str("hello".into()),
        Value::Bytes(vec![0x00, 0xff]),
    ]);
    let wire = dumps(&value).unwrap();
    assert_eq!(loads(&wire).unwrap(), value);
}

#[test]
fn test_bool_and_int_are_distinct_on_the_wire() {
    let b = dumps(&Value::Bool(true)).unwrap();
    let i = dumps(&Value::Int(1)).unwrap();
    assert_ne!(b, i);
    assert_eq!(loads(&b).unwrap(), Value::Bool(true));
    assert_eq!(loads(&i).unwrap(), Value::Int(1));
}

#[test]
fn test_truncated_wire_is_an_error_not_a_panic() {
    let wire = dumps(&Value::map(vec![("key", Value::Str("value".into()))])).unwrap();
    for cut in 0..wire.len() {
        if cut == 0 {
            continue;
        }
        // Every proper prefix must fail cleanly.
        assert!(loads(&wire[..cut]).is_err(), "prefix of {cut} bytes decoded");
    }
}

#[test]
fn test_float_round_trip_with_tolerance() {
    let value = Value::map(vec![("ratio", Value::Float(0.1 + 0.2))]);
    let decoded = loads(&dumps(&value).unwrap()).unwrap();
    assert!(decoded.approx_eq(&value, 1e-9));
}
