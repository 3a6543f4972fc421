use serde::{Deserialize, Serialize};
use ts_rs::TS;

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "shape_changed")]
    ShapeChanged(ShapeWire),
    #[serde(rename = "person_changed")]
    PersonChanged(PersonDeltaWire),
    #[serde(rename = "time_update")]
    TimeUpdate(TimeUpdateMsg),
    #[serde(rename = "session_ended")]
    SessionEnded(SessionEndedMsg),
}

/// A draggable shape as seen by clients. Also the payload of `update_shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct ShapeWire {
    pub id: String,
    pub left: f64,
    pub top: f64,
    /// Opaque "claimed" marker owned by the client.
    #[serde(default)]
    pub full: bool,
}

/// A seeded person, as served by the snapshot routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct PersonWire {
    pub id: String,
    pub left: f64,
    pub top: f64,
    pub visible: bool,
}

/// Visibility change for one person. Position is fixed at seeding, so any
/// `left`/`top` a client sends along is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct PersonDeltaWire {
    pub id: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct TimeUpdateMsg {
    pub seconds_remaining: u32,
}

/// Final tally. Visible people were never reached, so they count as victims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedMsg {
    pub survivor_count: u32,
    pub victim_count: u32,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "update_shape")]
    UpdateShape(ShapeWire),
    #[serde(rename = "update_person")]
    UpdatePerson(PersonDeltaWire),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_changed_uses_legacy_field_names() {
        let msg = ServerMsg::ShapeChanged(ShapeWire {
            id: "s-1".to_string(),
            left: 12.5,
            top: 40.0,
            full: true,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"shape_changed\""));
        assert!(json.contains("\"left\":12.5"));
        assert!(json.contains("\"top\":40.0"));
        assert!(json.contains("\"full\":true"));
        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn time_update_is_camel_case() {
        let msg = ServerMsg::TimeUpdate(TimeUpdateMsg {
            seconds_remaining: 42,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"time_update","secondsRemaining":42}"#);
    }

    #[test]
    fn session_ended_carries_both_counts() {
        let msg = ServerMsg::SessionEnded(SessionEndedMsg {
            survivor_count: 1,
            victim_count: 2,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"session_ended\""));
        assert!(json.contains("\"survivorCount\":1"));
        assert!(json.contains("\"victimCount\":2"));
    }

    #[test]
    fn update_shape_parses_and_defaults_full() {
        let parsed: ClientMsg =
            serde_json::from_str(r#"{"type":"update_shape","id":"a","left":1.0,"top":2.0}"#)
                .unwrap();
        match parsed {
            ClientMsg::UpdateShape(shape) => {
                assert_eq!(shape.id, "a");
                assert!((shape.left - 1.0).abs() < 1e-9);
                assert!((shape.top - 2.0).abs() < 1e-9);
                assert!(!shape.full);
            }
            _ => panic!("Expected UpdateShape"),
        }
    }

    #[test]
    fn update_person_ignores_position_fields() {
        let parsed: ClientMsg = serde_json::from_str(
            r#"{"type":"update_person","id":"p","visible":false,"left":3.0,"top":4.0}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ClientMsg::UpdatePerson(PersonDeltaWire {
                id: "p".to_string(),
                visible: false,
            })
        );
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let parsed = serde_json::from_str::<ClientMsg>(r#"{"type":"update_vehicle","id":"v1"}"#);
        assert!(parsed.is_err());
    }
}
