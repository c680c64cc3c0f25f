//! Integration tests for the sync wire protocol.
//!
//! These exercise the JSON shapes a client puts on the wire against the
//! engine types the server decodes them into.

use serde_json::json;
use syncline_engine::{
    ChangeList, DataType, ItemValue, SetOperation, SyncRequest, SyncResponse,
};

/// Test helper to build a request body from raw change lists.
fn request_body(change_lists: serde_json::Value) -> String {
    json!({
        "timestamp": 1706745600000i64,
        "clientTime": 1706745601000i64,
        "changeLists": change_lists,
    })
    .to_string()
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn test_mixed_request_deserialization() {
        let body = request_body(json!({
            "title": { "type": "value", "changes": [{ "lastModifiedTime": 1706745600500i64, "value": {"text": "hi"} }] },
            "likes": { "type": "increment", "changes": [
                { "uid": "u1", "increment": 2, "synced": true },
                { "uid": "u2", "increment": -1 }
            ] },
            "tags": { "type": "set", "changes": [{ "element": 7, "time": 1706745600900i64, "operation": "remove" }] }
        }));

        let request = SyncRequest::decode(&body).unwrap();

        assert_eq!(request.timestamp, 1706745600000);
        assert_eq!(request.client_time, 1706745601000);
        assert_eq!(request.change_lists.len(), 3);
        assert_eq!(request.change_lists["title"].data_type(), DataType::Value);

        match &request.change_lists["likes"] {
            ChangeList::Increment(changes) => {
                assert!(changes[0].synced);
                assert!(!changes[1].synced);
                assert_eq!(changes[1].increment, -1.0);
            }
            other => panic!("Expected increment list, got {:?}", other),
        }

        match &request.change_lists["tags"] {
            ChangeList::Set(changes) => assert_eq!(changes[0].operation, SetOperation::Remove),
            other => panic!("Expected set list, got {:?}", other),
        }
    }

    #[test]
    fn test_unsynced_flag_is_omitted() {
        let body = request_body(json!({
            "likes": { "type": "increment", "changes": [{ "uid": "u1", "increment": 1.5 }] }
        }));

        let request = SyncRequest::decode(&body).unwrap();
        let encoded = request.encode().unwrap();

        assert!(!encoded.contains("synced"));
        assert!(encoded.contains("\"clientTime\":1706745601000"));
    }

    #[test]
    fn test_mixed_list_is_rejected() {
        // A value change cannot appear in an increment list.
        let body = request_body(json!({
            "likes": { "type": "increment", "changes": [{ "lastModifiedTime": 1, "value": 1 }] }
        }));

        assert!(SyncRequest::decode(&body).is_err());
    }

    #[test]
    fn test_response_serialization() {
        let json = r#"{
            "timestamp": 1706745602000,
            "changes": {
                "title": { "type": "value", "value": null },
                "likes": { "type": "increment", "value": 4 },
                "tags": { "type": "set", "value": [1, 2] }
            }
        }"#;

        let response = SyncResponse::decode(json).unwrap();

        assert_eq!(response.changes["title"], ItemValue::Value(serde_json::Value::Null));
        assert_eq!(response.changes["likes"], ItemValue::Increment(4.0));
        assert_eq!(response.changes["tags"], ItemValue::Set(vec![1, 2]));

        let encoded: serde_json::Value =
            serde_json::from_str(&response.encode().unwrap()).unwrap();
        assert_eq!(encoded["changes"]["tags"], json!({ "type": "set", "value": [1, 2] }));
    }

    #[test]
    fn test_set_value_must_be_integer_list() {
        let json = r#"{ "timestamp": 1, "changes": { "tags": { "type": "set", "value": "1,2" } } }"#;

        assert!(SyncResponse::decode(json).is_err());
    }
}
