//! Oracle response parsing.
//!
//! Everything a model wraps around its JSON (reasoning blocks, code fences,
//! chatter) is removed here, and the payload is checked against the
//! stage's schema. Nothing malformed leaves this module as anything other
//! than an `OracleError`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::schema::{StageSchema, RELEVANCY_SCHEMA};
use super::OracleError;
use crate::models::PaperFields;

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Strip reasoning blocks some local models emit before their answer.
pub fn strip_model_artifacts(raw: &str) -> String {
    THINK_BLOCK_RE.replace_all(raw, "").trim().to_string()
}

/// Return the inside of the first fenced block, or the input unchanged.
fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of that line
    let body_start = after_open.find('\n').map_or(0, |i| i + 1);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// Extract the first JSON object carried by a response.
///
/// Each `{` is tried in turn as the start of an object; text after the
/// object is ignored, so braces in surrounding prose do not matter.
pub fn extract_json_object(response: &str) -> Result<Map<String, Value>, OracleError> {
    let cleaned = strip_model_artifacts(response);
    let body = strip_code_fence(&cleaned);

    let mut first_error = None;
    for (start, _) in body.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&body[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(object))) => return Ok(object),
            Some(Err(e)) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
            _ => {}
        }
    }

    Err(match first_error {
        Some(message) => OracleError::JsonParsing(message),
        None => OracleError::MalformedResponse("No JSON object found".into()),
    })
}

/// Parse and validate a field-producing stage response.
///
/// The result only carries the schema's own columns, whatever else the
/// model chose to return.
pub fn parse_stage_response(
    schema: &StageSchema<'_>,
    response: &str,
) -> Result<PaperFields, OracleError> {
    let object = extract_json_object(response)?;

    let missing = schema.missing_keys(&object);
    if !missing.is_empty() {
        return Err(OracleError::SchemaMismatch {
            schema: schema.name,
            missing,
        });
    }

    let mut fields = PaperFields::from_oracle_object(&object);
    fields.retain_columns(schema.keys);
    Ok(fields)
}

/// Parse a `{"relevancy": bool}` classification.
pub fn parse_relevancy_response(response: &str) -> Result<bool, OracleError> {
    let object = extract_json_object(response)?;

    let missing = RELEVANCY_SCHEMA.missing_keys(&object);
    if !missing.is_empty() {
        return Err(OracleError::SchemaMismatch {
            schema: RELEVANCY_SCHEMA.name,
            missing,
        });
    }

    match object.get("relevancy") {
        Some(Value::Bool(relevant)) => Ok(*relevant),
        _ => Err(OracleError::InvalidValue {
            schema: RELEVANCY_SCHEMA.name,
            key: "relevancy",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::oracle::schema::{ANALYSIS_SCHEMA, METHODOLOGY_SCHEMA};

    #[test]
    fn plain_json_parses() {
        let object = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(object["a"], 1);
    }

    #[test]
    fn fenced_json_parses() {
        let response = "```json\n{\"relevancy\": true}\n```";
        assert!(parse_relevancy_response(response).unwrap());
    }

    #[test]
    fn uppercase_fence_and_prose_parse() {
        let response = "Sure, here it is:\n```JSON\n{\"relevancy\": false}\n```\nLet me know!";
        assert!(!parse_relevancy_response(response).unwrap());
    }

    #[test]
    fn unfenced_json_inside_prose_parses() {
        let response = "The answer is {\"relevancy\": true} as requested.";
        assert!(parse_relevancy_response(response).unwrap());
    }

    #[test]
    fn think_blocks_are_removed() {
        let response = "<think>the { brace here is noise</think>\n{\"relevancy\": true}";
        assert!(parse_relevancy_response(response).unwrap());
    }

    #[test]
    fn braces_in_trailing_prose_are_ignored() {
        let response = "{\"relevancy\": false}\nNote: uses the {relevancy} key";
        assert!(!parse_relevancy_response(response).unwrap());
    }

    #[test]
    fn braces_in_leading_prose_are_skipped() {
        let response = "Format {k: v}. Answer: {\"relevancy\": true}";
        assert!(parse_relevancy_response(response).unwrap());
    }

    #[test]
    fn first_of_two_objects_wins() {
        let object = extract_json_object(r#"{"a": 1} then {"a": 2}"#).unwrap();
        assert_eq!(object["a"], 1);
    }

    #[test]
    fn no_object_is_malformed() {
        let err = extract_json_object("I cannot help with that").unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }

    #[test]
    fn broken_json_is_a_parse_error() {
        let err = extract_json_object("{\"a\": }").unwrap_err();
        assert!(matches!(err, OracleError::JsonParsing(_)));
    }

    #[test]
    fn relevancy_must_be_boolean() {
        let err = parse_relevancy_response(r#"{"relevancy": "yes"}"#).unwrap_err();
        assert!(matches!(err, OracleError::InvalidValue { key: "relevancy", .. }));
    }

    #[test]
    fn relevancy_key_is_required() {
        let err = parse_relevancy_response(r#"{"relevant": true}"#).unwrap_err();
        assert!(matches!(err, OracleError::SchemaMismatch { schema: "relevancy", .. }));
    }

    #[test]
    fn stage_response_missing_key_fails() {
        let response = r#"{"proposed_model_name": "X", "methodology": "Y", "usp": "Z"}"#;
        let err = parse_stage_response(&METHODOLOGY_SCHEMA, response).unwrap_err();
        match err {
            OracleError::SchemaMismatch { schema, missing } => {
                assert_eq!(schema, "methodology");
                assert_eq!(missing, vec!["experimental_methods".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stage_response_keeps_only_schema_columns() {
        let response = r#"{
            "problem_statement": "Leak detection",
            "main_findings": "Works",
            "limitations": null,
            "future_work": "",
            "title": "Should not leak into the record"
        }"#;
        let fields = parse_stage_response(&ANALYSIS_SCHEMA, response).unwrap();
        assert_eq!(fields.problem_statement.as_deref(), Some("Leak detection"));
        assert_eq!(fields.main_findings.as_deref(), Some("Works"));
        assert_eq!(fields.limitations, None);
        assert_eq!(fields.future_work.as_deref(), Some(""));
        assert_eq!(fields.title, None);
    }

    #[test]
    fn strip_model_artifacts_keeps_plain_text() {
        assert_eq!(strip_model_artifacts("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
