//! Fallback tool-call extraction from raw model text.
//!
//! Some chat templates emit tool calls as text envelopes instead of the
//! structured `tool_calls` field. Two forms are recovered here:
//!
//! ```text
//! <tool_call><function=name><parameter=key>value</parameter></function></tool_call>
//! <function=name><parameter=key>value</parameter></function>
//! ```
//!
//! Parameter values are trimmed of trailing CR/LF. Values that parse as JSON
//! scalars or containers keep their type; everything else becomes a string.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::backend::CompletionToolCall;

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<function=([A-Za-z0-9_.\-]+)>(.*?)</function>")
            .expect("function envelope regex")
    })
}

fn parameter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<parameter=([A-Za-z0-9_.\-]+)>(.*?)</parameter>")
            .expect("parameter envelope regex")
    })
}

fn wrapper_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?tool_call>").expect("tool_call wrapper regex"))
}

/// Interpret one parameter value: typed when it parses as JSON, string
/// otherwise.
fn parameter_value(raw: &str) -> Value {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::Object(_) | Value::Array(_))) => v,
        _ => Value::String(trimmed.to_owned()),
    }
}

/// Extract tool calls from text envelopes.
///
/// Returns the content with envelopes removed plus the extracted calls in
/// order of appearance. Ids are left empty; the loop fabricates them.
#[must_use]
pub fn parse_tool_call_envelopes(content: &str) -> (String, Vec<CompletionToolCall>) {
    let mut calls = Vec::new();

    for caps in function_re().captures_iter(content) {
        let name = caps[1].to_owned();
        let body = &caps[2];

        let mut args = Map::new();
        for param in parameter_re().captures_iter(body) {
            let _ = args.insert(param[1].to_owned(), parameter_value(&param[2]));
        }

        calls.push(CompletionToolCall {
            id: String::new(),
            name,
            arguments: Value::Object(args).to_string(),
        });
    }

    if calls.is_empty() {
        return (content.to_owned(), calls);
    }

    let without_functions = function_re().replace_all(content, "");
    let cleaned = wrapper_re()
        .replace_all(&without_functions, "")
        .trim()
        .to_owned();

    (cleaned, calls)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args_of(call: &CompletionToolCall) -> Value {
        serde_json::from_str(&call.arguments).unwrap()
    }

    #[test]
    fn wrapped_envelope_parses() {
        let text = "<tool_call><function=read><parameter=file_path>src/main.rs</parameter></function></tool_call>";
        let (content, calls) = parse_tool_call_envelopes(text);
        assert!(content.is_empty());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read");
        assert_eq!(args_of(&calls[0]), json!({"file_path": "src/main.rs"}));
    }

    #[test]
    fn bare_envelope_parses() {
        let text = "<function=bash><parameter=command>ls -la</parameter></function>";
        let (_, calls) = parse_tool_call_envelopes(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "bash");
        assert_eq!(args_of(&calls[0]), json!({"command": "ls -la"}));
    }

    #[test]
    fn multiple_parameters_collected() {
        let text = "<function=edit><parameter=file_path>a.txt</parameter><parameter=old_string>foo</parameter><parameter=new_string>bar</parameter></function>";
        let (_, calls) = parse_tool_call_envelopes(text);
        assert_eq!(
            args_of(&calls[0]),
            json!({"file_path": "a.txt", "old_string": "foo", "new_string": "bar"})
        );
    }

    #[test]
    fn trailing_newlines_trimmed_from_values() {
        let text = "<function=bash><parameter=command>echo hi\n</parameter></function>";
        let (_, calls) = parse_tool_call_envelopes(text);
        assert_eq!(args_of(&calls[0]), json!({"command": "echo hi"}));
    }

    #[test]
    fn numeric_and_boolean_values_keep_types() {
        let text = "<function=read><parameter=file_path>a</parameter><parameter=offset>10</parameter><parameter=limit>5</parameter></function>\
                    <function=edit><parameter=replace_all>true</parameter></function>";
        let (_, calls) = parse_tool_call_envelopes(text);
        assert_eq!(args_of(&calls[0])["offset"], json!(10));
        assert_eq!(args_of(&calls[1])["replace_all"], json!(true));
    }

    #[test]
    fn surrounding_text_preserved() {
        let text = "Let me check.\n<tool_call><function=glob><parameter=pattern>*.rs</parameter></function></tool_call>";
        let (content, calls) = parse_tool_call_envelopes(text);
        assert_eq!(content, "Let me check.");
        assert_eq!(calls[0].name, "glob");
    }

    #[test]
    fn plain_text_passes_through() {
        let (content, calls) = parse_tool_call_envelopes("just an answer");
        assert_eq!(content, "just an answer");
        assert!(calls.is_empty());
    }

    #[test]
    fn multiple_calls_keep_order() {
        let text = "<function=glob><parameter=pattern>*.md</parameter></function>\
                    <function=read><parameter=file_path>README.md</parameter></function>";
        let (_, calls) = parse_tool_call_envelopes(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "glob");
        assert_eq!(calls[1].name, "read");
    }

    #[test]
    fn ids_are_left_empty() {
        let text = "<function=bash><parameter=command>pwd</parameter></function>";
        let (_, calls) = parse_tool_call_envelopes(text);
        assert!(calls[0].id.is_empty());
    }

    #[test]
    fn multiline_string_value_preserved() {
        let text = "<function=write><parameter=file_path>a.txt</parameter><parameter=content>line one\nline two</parameter></function>";
        let (_, calls) = parse_tool_call_envelopes(text);
        assert_eq!(args_of(&calls[0])["content"], json!("line one\nline two"));
    }
}
