use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ErrorBody, WorkNestError};

/// Serialize `value` as a JSON response with the given status.
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

/// Decode a JSON request body. An empty body decodes as `{}`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, BodyError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(BodyError)
}

/// A request body that could not be decoded into the operation's input type.
#[derive(Debug)]
pub struct BodyError(pub serde_json::Error);

impl BodyError {
    pub fn into_response(self) -> Result<Response<Body>, Error> {
        tracing::warn!("Rejected request body: {}", self.0);
        json(
            StatusCode::BAD_REQUEST,
            &ErrorBody {
                message: "Invalid request body".to_string(),
                error: Some(self.0.to_string()),
            },
        )
    }
}

/// Turn an operation result into a response, rendering errors as envelopes.
pub fn respond<T: Serialize>(
    status: StatusCode,
    result: Result<T, WorkNestError>,
) -> Result<Response<Body>, Error> {
    match result {
        Ok(value) => json(status, &value),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_decodes_as_empty_object() {
        let value: serde_json::Value = parse_body(b"").unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        let err = parse_body::<serde_json::Value>(b"{not json").unwrap_err();
        let resp = err.into_response().unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["message"], "Invalid request body");
    }
}
