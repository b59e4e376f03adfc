//! Response parsing: recover a JSON array of detection records from
//! free-form model output.
//!
//! The model is asked for a bare JSON array but regularly wraps it in
//! a markdown code fence or surrounds it with commentary. Parsing tries
//! a fixed chain of strategies and takes the first that yields an array:
//!
//! 1. the whole text,
//! 2. the body of the first fenced code block (optionally tagged `json`),
//! 3. the span from the first `[` to the last `]`.
//!
//! Nothing here fails: text that defeats every strategy is reported as
//! [`ParsedResponse::Empty`], which callers treat as "found nothing".

use serde_json::Value;

/// Code fence delimiter used by markdown.
const FENCE: &str = "```";

/// Outcome of parsing a model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// A non-empty array of raw, not yet validated records.
    Records(Vec<Value>),
    /// No usable array could be recovered, or the array was empty.
    Empty,
}

impl ParsedResponse {
    /// Number of raw records recovered.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Records(records) => records.len(),
            Self::Empty => 0,
        }
    }

    /// Returns `true` if no records were recovered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the response and return the raw records.
    #[must_use]
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Records(records) => records,
            Self::Empty => Vec::new(),
        }
    }
}

/// Parse a model response into raw detection records.
#[must_use]
pub fn parse_response(text: &str) -> ParsedResponse {
    let strategies: [(&str, fn(&str) -> Option<&str>); 3] = [
        ("whole", whole_text),
        ("fenced", fenced_block),
        ("bracketed", bracketed_span),
    ];

    for (name, extract) in strategies {
        let Some(candidate) = extract(text) else {
            continue;
        };
        if let Some(records) = parse_array(candidate) {
            tracing::debug!(strategy = name, records = records.len(), "parsed response");
            return if records.is_empty() {
                ParsedResponse::Empty
            } else {
                ParsedResponse::Records(records)
            };
        }
    }

    tracing::debug!(len = text.len(), "response contained no JSON array");
    ParsedResponse::Empty
}

fn whole_text(text: &str) -> Option<&str> {
    Some(text)
}

/// Parse `candidate` as JSON, accepting only arrays.
fn parse_array(candidate: &str) -> Option<Vec<Value>> {
    match serde_json::from_str(candidate.trim()) {
        Ok(Value::Array(records)) => Some(records),
        _ => None,
    }
}

/// Body of the first fenced code block, with a leading `json` tag
/// removed. `None` if there is no closed fence.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];
    let end = rest.find(FENCE)?;
    let body = rest[..end].trim_start();

    let tagged = body
        .get(..4)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("json"));
    Some(if tagged { &body[4..] } else { body })
}

/// Span from the first `[` through the last `]`, inclusive.
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const ARRAY: &str = r#"[{"label": "email", "box_2d": [1, 2, 3, 4]}]"#;

    fn assert_single_email(parsed: &ParsedResponse) {
        let ParsedResponse::Records(records) = parsed else {
            panic!("expected records, got {parsed:?}");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["label"], "email");
    }

    #[test]
    fn bare_array() {
        assert_single_email(&parse_response(ARRAY));
    }

    #[test]
    fn bare_array_with_whitespace() {
        assert_single_email(&parse_response(&format!("\n\n  {ARRAY}  \n")));
    }

    #[test]
    fn json_tagged_fence() {
        let text = format!("Here is what I found:\n```json\n{ARRAY}\n```\nLet me know!");
        assert_single_email(&parse_response(&text));
    }

    #[test]
    fn untagged_fence() {
        let text = format!("```\n{ARRAY}\n```");
        assert_single_email(&parse_response(&text));
    }

    #[test]
    fn uppercase_tag_fence() {
        let text = format!("```JSON\n{ARRAY}\n```");
        assert_single_email(&parse_response(&text));
    }

    #[test]
    fn array_inside_prose() {
        let text = format!("I detected the following regions: {ARRAY} -- hope that helps.");
        assert_single_email(&parse_response(&text));
    }

    #[test]
    fn broken_fence_falls_back_to_brackets() {
        // Fence never closes, so the bracket strategy picks it up.
        let text = format!("```json\n{ARRAY}");
        assert_single_email(&parse_response(&text));
    }

    #[test]
    fn array_nested_in_object_is_recovered() {
        let text = format!(r#"{{"detections": {ARRAY}}}"#);
        assert_single_email(&parse_response(&text));
    }

    #[test]
    fn empty_array_is_empty() {
        assert_eq!(parse_response("[]"), ParsedResponse::Empty);
        assert_eq!(parse_response("```json\n[]\n```"), ParsedResponse::Empty);
    }

    #[test]
    fn non_json_is_empty() {
        assert_eq!(parse_response(""), ParsedResponse::Empty);
        assert_eq!(
            parse_response("I could not find any sensitive data."),
            ParsedResponse::Empty
        );
        assert_eq!(parse_response("[not json at all]"), ParsedResponse::Empty);
        assert_eq!(parse_response("] backwards ["), ParsedResponse::Empty);
    }

    #[test]
    fn object_is_not_an_array() {
        assert_eq!(
            parse_response(r#"{"label": "email"}"#),
            ParsedResponse::Empty
        );
    }

    #[test]
    fn into_records_and_len() {
        let parsed = parse_response(ARRAY);
        assert_eq!(parsed.len(), 1);
        assert!(!parsed.is_empty());
        assert_eq!(parsed.into_records().len(), 1);
        assert!(ParsedResponse::Empty.into_records().is_empty());
    }
}
