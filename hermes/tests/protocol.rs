use hermes::{Envelope, EventKind, HermesError};
use serde_json::{Value, json};

fn as_json(envelope: &Envelope) -> Value {
    serde_json::from_str(&envelope.encode()).expect("encode should produce valid JSON")
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn decodes_sensor_reading() {
        let envelope = Envelope::decode(
            r#"{"event":"new_sensor_data","data":{"sensor_id":"S1","sensor_readings":"42"}}"#,
        )
        .unwrap();
        assert_eq!(envelope, Envelope::reading("S1", "42"));
        assert_eq!(envelope.kind(), Some(EventKind::NewSensorData));
        assert_eq!(envelope.sensor_id(), Some("S1"));
    }

    #[test]
    fn absent_or_null_data_means_empty() {
        assert_eq!(Envelope::decode(r#"{"event":"ping"}"#).unwrap(), Envelope::Ping);
        assert_eq!(
            Envelope::decode(r#"{"event":"pong","data":null}"#).unwrap(),
            Envelope::Pong
        );

        let envelope = Envelope::decode(r#"{"event":"mystery"}"#).unwrap();
        assert_eq!(envelope.event(), "mystery");
        assert!(envelope.data().is_empty());
    }

    #[test]
    fn unknown_tag_keeps_event_and_data() {
        let envelope =
            Envelope::decode(r#"{"event":"firmware_update","data":{"version":3}}"#).unwrap();
        assert_eq!(envelope.kind(), None);
        assert_eq!(
            as_json(&envelope),
            json!({"event": "firmware_update", "data": {"version": 3}})
        );
    }

    #[test]
    fn extra_data_fields_are_ignored() {
        let envelope = Envelope::decode(
            r#"{"event":"subscribe_sensor","data":{"sensor_id":"S2","priority":"high"}}"#,
        )
        .unwrap();
        assert_eq!(envelope, Envelope::subscribe("S2"));
    }

    #[test]
    fn malformed_payloads_are_parse_failures() {
        let malformed = [
            "not json at all",
            "[1, 2, 3]",
            r#"{"data":{"sensor_id":"S1"}}"#,
            r#"{"event":42}"#,
            r#"{"event":"ping","data":[1]}"#,
            // Known tag, data missing its required field
            r#"{"event":"subscribe_sensor","data":{}}"#,
            r#"{"event":"agent_connect","data":{"sensors":"S1"}}"#,
        ];
        for raw in malformed {
            match Envelope::decode(raw) {
                Err(HermesError::ParseFailure(_)) => {}
                other => panic!("expected ParseFailure for {}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn encodes_wire_shapes() {
        assert_eq!(
            as_json(&Envelope::agent_connect(["S1", "S2"])),
            json!({"event": "agent_connect", "data": {"sensors": ["S1", "S2"]}})
        );
        assert_eq!(
            as_json(&Envelope::status_query("S1")),
            json!({"event": "sensor_connection_status", "data": {"sensor_id": "S1"}})
        );
        assert_eq!(
            as_json(&Envelope::status_reply("S1", true)),
            json!({"event": "sensor_connection_status", "data": {"sensor_id": "S1", "connected": true}})
        );
        assert_eq!(
            as_json(&Envelope::client_connect("bench-7")),
            json!({"event": "Client connect", "data": {"client_name": "bench-7"}})
        );
        assert_eq!(
            as_json(&Envelope::client_disconnect()),
            json!({"event": "Client disconnect", "data": {}})
        );
        assert_eq!(as_json(&Envelope::Ping), json!({"event": "ping", "data": {}}));
    }

    #[test]
    fn status_answer_decodes_with_flag() {
        let envelope = Envelope::decode(
            r#"{"event":"sensor_connection_status","data":{"sensor_id":"S1","connected":false}}"#,
        )
        .unwrap();
        assert_eq!(envelope, Envelope::status_reply("S1", false));
    }

    #[test]
    fn client_announcements_accept_any_name_value() {
        let envelope =
            Envelope::decode(r#"{"event":"Client connect","data":{"client_name":42}}"#).unwrap();
        assert_eq!(envelope, Envelope::client_connect("42"));

        let envelope = Envelope::decode(
            r#"{"event":"Client disconnect","data":{"client_name":null}}"#,
        )
        .unwrap();
        assert_eq!(envelope, Envelope::client_disconnect());

        let envelope =
            Envelope::decode(r#"{"event":"Client connect","data":{"client_name":["a","b"]}}"#)
                .unwrap();
        assert_eq!(envelope.kind(), Some(EventKind::ClientConnect));
    }

    #[test]
    fn every_tag_maps_back_to_its_kind() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EventKind::from_tag("client connect"), None);
    }
}
