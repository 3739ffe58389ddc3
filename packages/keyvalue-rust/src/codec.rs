//! Value codecs.
//!
//! Storage never inspects application values. A [`Codec`] turns them into
//! the bytes kept in the `value` attribute and back.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Converts values to and from stored bytes.
pub trait Codec<V>: Send + Sync {
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] when `value` cannot be represented.
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] when `bytes` are not a valid encoding.
    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError>;
}

/// JSON text via `serde_json`. Readable by clients that store strings.
pub struct JsonCodec<V>(PhantomData<fn() -> V>);

impl<V> JsonCodec<V> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Codec<V> for JsonCodec<V>
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Compact MsgPack via `rmp-serde`, with struct fields encoded by name.
pub struct MsgPackCodec<V>(PhantomData<fn() -> V>);

impl<V> MsgPackCodec<V> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for MsgPackCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Codec<V> for MsgPackCodec<V>
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec_named(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError> {
        rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        uid: u64,
        roles: Vec<String>,
        data: BTreeMap<String, String>,
    }

    fn session() -> Session {
        Session {
            uid: 7,
            roles: vec!["editor".into()],
            data: BTreeMap::from([("theme".into(), "dark".into())]),
        }
    }

    #[test]
    fn json_codec_writes_plain_json() {
        let codec = JsonCodec::<Session>::new();
        let bytes = codec.encode(&session()).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().starts_with(r#"{"uid":7"#));
        assert_eq!(codec.decode(&bytes).unwrap(), session());
    }

    #[test]
    fn msgpack_codec_restores_structs() {
        let codec = MsgPackCodec::<Session>::new();
        let bytes = codec.encode(&session()).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), session());
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = JsonCodec::<Session>::new().decode(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
