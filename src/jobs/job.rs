use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A queued unit of sync work.
///
/// Jobs travel through Redis as base64 wrapping JSON. Serialization is
/// deterministic (field order is declaration order), so two structurally
/// equal jobs produce the same set member and collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Job {
    /// Sync every store discovered under this external key.
    ExternalKey(String),
    /// Sync a single store, looked up by id among the key's stores.
    #[serde(rename_all = "camelCase")]
    StoreId { external_key: String, id: i32 },
    /// Sync a single brand.
    BrandId(i32),
}

impl Job {
    pub fn encode(&self) -> Result<String, CodecError> {
        encode_payload(self)
    }

    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        decode_payload(raw)
    }
}

/// Encodes a queue payload as base64 over JSON.
pub(crate) fn encode_payload<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value)?;
    Ok(BASE64.encode(json))
}

/// Decodes a base64 over JSON queue payload.
pub(crate) fn decode_payload<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
    let json = BASE64.decode(raw)?;
    Ok(serde_json::from_slice(&json)?)
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a valid job value: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_jobs_encode_identically() {
        // The queue dedups by set membership, so this must hold.
        let a = Job::StoreId {
            external_key: "hb-sg".to_string(),
            id: 42,
        };
        let b = Job::StoreId {
            external_key: "hb-sg".to_string(),
            id: 42,
        };
        assert_eq!(a.encode().unwrap(), b.encode().unwrap());

        let c = Job::ExternalKey("hb-sg".to_string());
        assert_ne!(a.encode().unwrap(), c.encode().unwrap());
    }

    #[test]
    fn round_trips_every_variant() {
        let jobs = [
            Job::ExternalKey("hb-sg".to_string()),
            Job::StoreId {
                external_key: "hb-sg".to_string(),
                id: 7,
            },
            Job::BrandId(31),
        ];
        for job in jobs {
            let raw = job.encode().unwrap();
            assert_eq!(Job::decode(&raw).unwrap(), job);
        }
    }

    #[test]
    fn wire_shape_is_tagged_json() {
        let raw = Job::StoreId {
            external_key: "hb-sg".to_string(),
            id: 7,
        }
        .encode()
        .unwrap();
        let json = base64::engine::general_purpose::STANDARD.decode(raw).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["type"], "storeId");
        assert_eq!(value["value"]["externalKey"], "hb-sg");
        assert_eq!(value["value"]["id"], 7);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Job::decode("not base64 at all!"),
            Err(CodecError::Base64(_))
        ));

        let not_json = BASE64.encode(b"plain text");
        assert!(matches!(Job::decode(&not_json), Err(CodecError::Json(_))));

        let unknown_tag = BASE64.encode(br#"{"type":"catalogId","value":3}"#);
        assert!(matches!(Job::decode(&unknown_tag), Err(CodecError::Json(_))));
    }
}
