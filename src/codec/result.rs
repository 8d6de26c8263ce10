//! Result shapes selected by the response status code.
//!
//! The caller names one shape for success bodies and one for failure
//! bodies. [`Json<T>`] parses the body into `T`; [`Discard`] leaves the
//! result empty without touching the body.

use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

/// How a result body is turned into a value.
pub trait ResultShape {
    /// Decoded value type.
    type Output;

    /// Parses `body`; `Ok(None)` means the shape was omitted.
    fn parse(body: &[u8]) -> Result<Option<Self::Output>, serde_json::Error>;
}

/// Parses the body as JSON into `T`.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Json")
    }
}

impl<T: DeserializeOwned> ResultShape for Json<T> {
    type Output = T;

    fn parse(body: &[u8]) -> Result<Option<T>, serde_json::Error> {
        serde_json::from_slice(body).map(Some)
    }
}

/// Omitted shape: the result stays empty.
#[derive(Debug, Clone, Copy)]
pub struct Discard;

impl ResultShape for Discard {
    type Output = Infallible;

    fn parse(_body: &[u8]) -> Result<Option<Infallible>, serde_json::Error> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureBody;

    #[test]
    fn json_shape_parses_body() {
        let parsed = <Json<FailureBody>>::parse(br#"{"error":"boom"}"#).unwrap();
        assert_eq!(
            parsed,
            Some(FailureBody {
                error: "boom".to_string()
            })
        );
    }

    #[test]
    fn json_shape_rejects_wrong_body() {
        assert!(<Json<FailureBody>>::parse(b"[1,2]").is_err());
        assert!(<Json<FailureBody>>::parse(b"").is_err());
    }

    #[test]
    fn discard_never_reads() {
        assert!(Discard::parse(b"not json at all").unwrap().is_none());
    }
}
