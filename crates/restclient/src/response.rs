//! Response buffering and decoding.

use bytes::BytesMut;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{RestError, Result};
use crate::request::ResponseType;

/// A fully buffered response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Raw text, decoded as UTF-8 (invalid sequences replaced).
    Text(String),
    /// Parsed JSON.
    Json(Value),
}

impl Body {
    /// Decode a buffered body according to the response type.
    ///
    /// An empty buffer decodes to an empty JSON object.
    pub fn decode(response_type: ResponseType, status: u16, bytes: &[u8]) -> Result<Self> {
        match response_type {
            ResponseType::Text => Ok(Body::Text(String::from_utf8_lossy(bytes).into_owned())),
            ResponseType::Json if bytes.is_empty() => {
                Ok(Body::Json(Value::Object(Default::default())))
            }
            ResponseType::Json => serde_json::from_slice(bytes)
                .map(Body::Json)
                .map_err(|source| RestError::Json {
                    status,
                    body: String::from_utf8_lossy(bytes).into_owned(),
                    source,
                }),
        }
    }

    /// The text, if this is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            Body::Json(_) => None,
        }
    }

    /// The JSON value, if this is a JSON body.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Text(_) => None,
        }
    }

    /// Deserialize into a concrete type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        match self {
            Body::Text(text) => serde_json::from_str(text),
            Body::Json(value) => serde_json::from_value(value.clone()),
        }
    }
}

/// The outcome of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Decoded body.
    pub body: Body,
    /// Status code.
    pub status: u16,
}

/// Read the whole response body, chunk by chunk.
pub(crate) async fn collect_body(response: reqwest::Response) -> Result<BytesMut> {
    let mut buffer = BytesMut::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(RestError::Read)?;
        tracing::trace!(len = chunk.len(), "received body chunk");
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}
