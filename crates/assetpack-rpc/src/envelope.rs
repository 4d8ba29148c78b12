//! Request envelope and result extraction.
//!
//! Requests wrap the operation as `{"data": {"name": ..., "args": ...}}`.
//! Responses wrap the payload in an object carrying a `result` member; the
//! wrapping is not always strict JSON, so extraction falls back to a
//! bracket-matching rule when the body does not parse as an object.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use assetpack_core::error::DecodeError;

/// Marker preceding the result object in a response body.
const RESULT_MARKER: &str = "result";

/// Outgoing request body.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a, A> {
    data: EnvelopeData<'a, A>,
}

#[derive(Debug, Serialize)]
struct EnvelopeData<'a, A> {
    name: &'a str,
    args: &'a A,
}

impl<'a, A: Serialize> Envelope<'a, A> {
    pub(crate) fn new(name: &'a str, args: &'a A) -> Self {
        Self {
            data: EnvelopeData { name, args },
        }
    }
}

/// Extract and decode the `result` object of a response body.
///
/// A body that parses as a JSON object with a top-level `result` member is
/// decoded directly. Anything else goes through the permissive rule: take
/// the text from the first `{` after the literal `result` through the last
/// `}` of the body and decode the first JSON value found there, ignoring
/// whatever trails it.
///
/// # Errors
///
/// [`DecodeError::MissingResult`] if no result object can be located,
/// [`DecodeError::Json`] if it does not match `R`.
pub fn extract_result<R: DeserializeOwned>(body: &str) -> Result<R, DecodeError> {
    if let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(body)
        && let Some(result) = map.remove(RESULT_MARKER)
    {
        return serde_json::from_value(result).map_err(DecodeError::from);
    }

    extract_permissive(body)
}

fn extract_permissive<R: DeserializeOwned>(body: &str) -> Result<R, DecodeError> {
    let missing = || DecodeError::missing_result(body);

    let marker = body.find(RESULT_MARKER).ok_or_else(missing)?;
    let start = body[marker..]
        .find('{')
        .map(|offset| marker + offset)
        .ok_or_else(missing)?;
    let end = body.rfind('}').filter(|&end| end > start).ok_or_else(missing)?;

    let mut values = serde_json::Deserializer::from_str(&body[start..=end]).into_iter::<R>();
    match values.next() {
        Some(value) => value.map_err(DecodeError::from),
        None => Err(missing()),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Created {
        id: String,
    }

    #[test]
    fn envelope_wraps_name_and_args() {
        let args = json!({"id": "abc"});
        let body = serde_json::to_value(Envelope::new("callback/poll", &args)).unwrap();
        assert_eq!(
            body,
            json!({"data": {"name": "callback/poll", "args": {"id": "abc"}}})
        );
    }

    #[test]
    fn decodes_result_next_to_other_keys() {
        let created: Created = extract_result(r#"{"ok":true,"result":{"id":"abc"}}"#).unwrap();
        assert_eq!(created.id, "abc");
    }

    #[test]
    fn decodes_result_followed_by_other_keys() {
        let created: Created =
            extract_result(r#"{"result":{"id":"abc"},"meta":{"took":3}}"#).unwrap();
        assert_eq!(created.id, "abc");
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let created: Created = extract_result("\n  {\"result\": {\"id\": \"abc\"}}  \n").unwrap();
        assert_eq!(created.id, "abc");
    }

    #[test]
    fn finds_nested_result_permissively() {
        let created: Created = extract_result(r#"{"data":{"result":{"id":"abc"}}}"#).unwrap();
        assert_eq!(created.id, "abc");
    }

    #[test]
    fn decodes_non_json_wrapping() {
        let created: Created = extract_result(")]}'\n{\"result\":{\"id\":\"abc\"}}").unwrap();
        assert_eq!(created.id, "abc");
    }

    #[test]
    fn missing_result_is_a_decode_failure() {
        let err = extract_result::<Created>(r#"{"error":"x"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingResult { .. }));
    }

    #[test]
    fn result_marker_without_object_is_missing() {
        let err = extract_result::<Created>(r#"{"error":"no result here"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingResult { .. }));
    }

    #[test]
    fn wrong_shape_is_a_json_failure() {
        let err = extract_result::<Created>(r#"{"result":{"name":"abc"}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { .. }));
    }

    #[test]
    fn empty_body_is_missing() {
        let err = extract_result::<Created>("").unwrap_err();
        assert!(matches!(err, DecodeError::MissingResult { .. }));
    }
}
