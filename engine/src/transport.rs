//! The channel between a client and the server.
//!
//! The engine does no IO itself. A [`Transport`] delivers one request and
//! returns the matching response; [`crate::Server`] implements it directly
//! for in-process use, and [`JsonTransport`] adapts any string-in,
//! string-out channel (HTTP, sockets, FFI) to the wire format.

use crate::{error::Result, SyncRequest, SyncResponse};

/// Delivers a sync request exactly once per call.
pub trait Transport {
    fn synchronize(&self, request: SyncRequest) -> Result<SyncResponse>;
}

/// Transport that exchanges the JSON wire format through a callback.
///
/// The callback receives the encoded request and returns the encoded
/// response, or [`crate::Error::Transport`] if delivery failed.
pub struct JsonTransport<F> {
    send: F,
}

impl<F> JsonTransport<F>
where
    F: Fn(String) -> Result<String>,
{
    pub fn new(send: F) -> Self {
        Self { send }
    }
}

impl<F> Transport for JsonTransport<F>
where
    F: Fn(String) -> Result<String>,
{
    fn synchronize(&self, request: SyncRequest) -> Result<SyncResponse> {
        let body = request.encode()?;
        let reply = (self.send)(body)?;
        SyncResponse::decode(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ItemValue};
    use std::cell::RefCell;

    #[test]
    fn json_transport_encodes_and_decodes() {
        let seen = RefCell::new(String::new());
        let transport = JsonTransport::new(|body| {
            *seen.borrow_mut() = body;
            Ok(r#"{"timestamp":99,"changes":{"n":{"type":"increment","value":2}}}"#.to_string())
        });

        let request = SyncRequest {
            timestamp: 7,
            client_time: 8,
            ..Default::default()
        };
        let response = transport.synchronize(request).unwrap();

        assert_eq!(
            *seen.borrow(),
            r#"{"timestamp":7,"clientTime":8,"changeLists":{}}"#
        );
        assert_eq!(response.timestamp, 99);
        assert_eq!(response.changes["n"], ItemValue::Increment(2.0));
    }

    #[test]
    fn json_transport_surfaces_malformed_reply() {
        let transport = JsonTransport::new(|_| Ok(r#"{"changes":{}}"#.to_string()));
        let result = transport.synchronize(SyncRequest::default());
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn json_transport_surfaces_delivery_failure() {
        let transport = JsonTransport::new(|_| Err(Error::Transport("connection reset".into())));
        let result = transport.synchronize(SyncRequest::default());
        assert_eq!(result, Err(Error::Transport("connection reset".into())));
    }
}
