//! Payload encoding conventions
//!
//! Every payload carries an `encoding` metadata entry naming how `data`
//! is laid out, matching what the orchestration service's data converters
//! expect.

use crate::{Payload, ProtocolError};
use prost::Message;
use serde::{de::DeserializeOwned, Serialize};

pub const METADATA_ENCODING: &str = "encoding";
pub const ENCODING_NULL: &str = "binary/null";
pub const ENCODING_JSON: &str = "json/plain";
pub const ENCODING_PROTO: &str = "binary/protobuf";

impl Payload {
    fn with_encoding(encoding: &str, data: Vec<u8>) -> Self {
        let mut payload = Payload {
            data,
            ..Default::default()
        };
        payload
            .metadata
            .insert(METADATA_ENCODING.to_string(), encoding.as_bytes().to_vec());
        payload
    }

    /// The payload the service uses for "no value".
    pub fn null() -> Self {
        Self::with_encoding(ENCODING_NULL, Vec::new())
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ProtocolError> {
        let data = serde_json::to_vec(value)
            .map_err(|e| ProtocolError::InvalidPayload(format!("JSON encode failed: {}", e)))?;
        Ok(Self::with_encoding(ENCODING_JSON, data))
    }

    pub fn proto<M: Message>(message: &M) -> Self {
        Self::with_encoding(ENCODING_PROTO, message.encode_to_vec())
    }

    pub fn encoding(&self) -> Option<&str> {
        self.metadata
            .get(METADATA_ENCODING)
            .and_then(|raw| std::str::from_utf8(raw).ok())
    }

    pub fn is_null(&self) -> bool {
        self.encoding() == Some(ENCODING_NULL)
    }

    pub fn to_json<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        match self.encoding() {
            Some(ENCODING_JSON) => serde_json::from_slice(&self.data)
                .map_err(|e| ProtocolError::InvalidPayload(format!("JSON decode failed: {}", e))),
            other => Err(ProtocolError::InvalidPayload(format!(
                "expected {} payload, got {:?}",
                ENCODING_JSON, other
            ))),
        }
    }

    pub fn to_proto<M: Message + Default>(&self) -> Result<M, ProtocolError> {
        match self.encoding() {
            Some(ENCODING_PROTO) => {
                M::decode(self.data.as_slice()).map_err(|e| ProtocolError::Decode(e.to_string()))
            }
            other => Err(ProtocolError::InvalidPayload(format!(
                "expected {} payload, got {:?}",
                ENCODING_PROTO, other
            ))),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::with_encoding(
            ENCODING_JSON,
            serde_json::Value::String(s.to_string()).to_string().into_bytes(),
        )
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::from(s.as_str())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::with_encoding(ENCODING_JSON, value.to_string().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionSet, WorkflowInput};

    #[test]
    fn string_payloads_are_json() {
        let p = Payload::from("hi");
        assert_eq!(p.encoding(), Some(ENCODING_JSON));
        assert_eq!(p.data, b"\"hi\"".to_vec());
        assert_eq!(p.to_json::<String>().unwrap(), "hi");
        assert_eq!(Payload::json("hi").unwrap(), p);
    }

    #[test]
    fn proto_payload_rejects_json_reader() {
        let input = WorkflowInput::new(vec![ActionSet::default()]);
        let p = Payload::proto(&input);
        assert_eq!(p.to_proto::<WorkflowInput>().unwrap(), input);
        assert!(matches!(
            p.to_json::<String>(),
            Err(ProtocolError::InvalidPayload(_))
        ));
    }

    #[test]
    fn null_payload() {
        assert!(Payload::null().is_null());
        assert!(!Payload::from("x").is_null());
    }
}
