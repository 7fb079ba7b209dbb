//! Response decoders passed to [`Executor::execute`](super::Executor::execute).
//!
//! A decoder is any `FnOnce(Response, &DecodeOptions) -> Result<T>`. The
//! functions here cover the shapes the server uses: the whole body, one
//! field of the body, or nothing at all.

use serde::de::DeserializeOwned;

use arango_core::protocol::Response;
use arango_core::{from_document_with, ArangoError, DecodeOptions, Document, Result};

/// Decodes the whole body as `T`.
pub fn body<T: DeserializeOwned>() -> impl FnOnce(Response, &DecodeOptions) -> Result<T> + Send {
    |response, options| from_document_with(response.into_body(), options)
}

/// Decodes one top-level field of the body as `T`.
pub fn field<T: DeserializeOwned>(
    name: &'static str,
) -> impl FnOnce(Response, &DecodeOptions) -> Result<T> + Send {
    move |response, options| {
        let mut body = response.into_body();
        if !matches!(body, Document::Object(_)) {
            return Err(ArangoError::Codec(format!(
                "expected object with field '{}', got {}",
                name,
                body.type_name()
            )));
        }
        let value = body.remove(name).unwrap_or_default();
        from_document_with(value, options)
    }
}

/// Returns the raw body.
pub fn document() -> impl FnOnce(Response, &DecodeOptions) -> Result<Document> + Send {
    |response, _| Ok(response.into_body())
}

/// Discards the body.
pub fn unit() -> impl FnOnce(Response, &DecodeOptions) -> Result<()> + Send {
    |_, _| Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_decoder() {
        let response = Response::new(200).with_body(
            Document::object()
                .with("error", false)
                .with("result", vec![Document::from("a"), Document::from("b")]),
        );
        let names: Vec<String> = field("result")(response, &DecodeOptions::default()).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_field_decoder_missing_field_is_zero() {
        let response = Response::new(200).with_body(Document::object());
        let count: u64 = field("count")(response, &DecodeOptions::default()).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_field_decoder_rejects_non_object() {
        let response = Response::new(200).with_body(Document::from(5));
        let result: Result<u64> = field("count")(response, &DecodeOptions::default());
        assert!(matches!(result, Err(ArangoError::Codec(_))));
    }

    #[test]
    fn test_body_decoder() {
        let response = Response::new(200).with_body(Document::from(42));
        let value: i32 = body()(response, &DecodeOptions::default()).unwrap();
        assert_eq!(value, 42);
    }
}
