use beatlink::protocol::codec::{decode, encode};
use beatlink::protocol::messages::{
    InitialSync, Liveness, Message, MetronomeSnapshot, SyncRequest, SyncResponse,
};
use serde_json::{json, Value};

fn to_value(message: &Message) -> Value {
    serde_json::from_str(&encode(message).unwrap()).unwrap()
}

#[test]
fn test_control_message_wire_names() {
    assert_eq!(to_value(&Message::Tempo { value: 96.0 }), json!({"type": "tempo", "value": 96.0}));
    assert_eq!(
        to_value(&Message::TimeSignature { value: 3 }),
        json!({"type": "timeSignature", "value": 3})
    );
    assert_eq!(
        to_value(&Message::Subdivision { value: 4 }),
        json!({"type": "subdivision", "value": 4})
    );
    assert_eq!(to_value(&Message::Accent { value: false }), json!({"type": "accent", "value": false}));
    assert_eq!(to_value(&Message::PlayState { value: true }), json!({"type": "playState", "value": true}));
    assert_eq!(
        to_value(&Message::Sound {
            value: "woodblock".to_string()
        }),
        json!({"type": "sound", "value": "woodblock"})
    );
    assert_eq!(to_value(&Message::Reset), json!({"type": "reset"}));
}

#[test]
fn test_sync_response_serialization() {
    let message = Message::SyncResponse(SyncResponse {
        host_time: 105.0,
        client_time: 100.0,
        snapshot: MetronomeSnapshot {
            next_event_time: 105.5,
            current_beat: 2,
            tempo: 120.0,
            running: true,
            sound_set_id: "click".to_string(),
        },
    });

    assert_eq!(
        to_value(&message),
        json!({
            "type": "syncResponse",
            "hostTime": 105.0,
            "clientTime": 100.0,
            "snapshot": {
                "nextEventTime": 105.5,
                "currentBeat": 2,
                "tempo": 120.0,
                "running": true,
                "soundSetId": "click"
            }
        })
    );
}

#[test]
fn test_sync_request_deserialization() {
    let json = r#"{"type": "syncRequest", "clientTime": 12.75}"#;
    let message = decode(json).unwrap();
    assert_eq!(message, Some(Message::SyncRequest(SyncRequest { client_time: 12.75 })));
}

#[test]
fn test_initial_sync_and_liveness() {
    assert_eq!(
        decode(r#"{"type":"initialSync","hostTime":3.5,"nextEventTime":4.0}"#).unwrap(),
        Some(Message::InitialSync(InitialSync {
            host_time: 3.5,
            next_event_time: 4.0
        }))
    );
    assert_eq!(
        decode(r#"{"type":"ping","timestamp":1.25}"#).unwrap(),
        Some(Message::Ping(Liveness { timestamp: 1.25 }))
    );
    assert_eq!(
        to_value(&Message::Pong(Liveness { timestamp: 1.25 })),
        json!({"type": "pong", "timestamp": 1.25})
    );
}

#[test]
fn test_integer_tempo_is_accepted() {
    assert_eq!(
        decode(r#"{"type":"tempo","value":120}"#).unwrap(),
        Some(Message::Tempo { value: 120.0 })
    );
}

#[test]
fn test_unknown_type_is_ignored() {
    assert_eq!(decode(r#"{"type":"chat","text":"hi"}"#).unwrap(), None);
}

#[test]
fn test_malformed_messages_are_errors() {
    assert!(decode("not json").is_err());
    assert!(decode(r#"{"value": 120}"#).is_err());
    assert!(decode(r#"{"type":"tempo","value":"fast"}"#).is_err());
    assert!(decode(r#"{"type":"syncRequest"}"#).is_err());
}

#[test]
fn test_client_time_echo_is_exact() {
    let client_time = 1234.567_891_011_f64;
    let text = encode(&Message::SyncRequest(SyncRequest { client_time })).unwrap();
    match decode(&text).unwrap() {
        Some(Message::SyncRequest(request)) => assert_eq!(request.client_time, client_time),
        other => panic!("Expected SyncRequest, got {:?}", other),
    }
}
