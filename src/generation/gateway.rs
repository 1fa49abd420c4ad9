//! Prompt-completion gateway boundary
//!
//! The gateway turns one rendered prompt into one parsed JSON document. It
//! performs no retries; retry policy belongs to the callers.

use crate::generation::prompts::{PromptLibrary, PromptTemplate};
use crate::generation::{GatewayError, GatewayResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A rendered prompt plus the shape its answer must follow
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub template: PromptTemplate,
    pub prompt: String,
    pub output_shape: Value,
}

/// The external generative model, seen as a single call-and-parse operation.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Send `request` and return the parsed JSON answer.
    async fn complete(&self, request: PromptRequest) -> GatewayResult<Value>;
}

/// Render `template` with `input`, call the gateway and decode the answer as `T`.
pub async fn invoke<I, T>(
    gateway: &dyn CompletionGateway,
    library: &PromptLibrary,
    template: PromptTemplate,
    input: &I,
) -> GatewayResult<T>
where
    I: Serialize,
    T: DeserializeOwned,
{
    let request = PromptRequest {
        template,
        prompt: library.render(template, input)?,
        output_shape: template.output_shape(),
    };
    let value = gateway.complete(request).await?;
    serde_json::from_value(value).map_err(|e| {
        GatewayError::shape(format!("'{}' output could not be decoded: {}", template.id(), e))
    })
}

/// Extract the JSON document embedded in a model answer.
///
/// Looks for a fenced ```json block first, then for the outermost object or
/// array span, and finally falls back to the trimmed text.
pub fn extract_json_from_response(response_text: &str) -> &str {
    if let Some(start) = response_text.find("```json") {
        let search_start = start + "```json".len();
        if let Some(end_offset) = response_text[search_start..].find("```") {
            return response_text[search_start..search_start + end_offset].trim();
        }
    }

    let object = span(response_text, '{', '}');
    let array = span(response_text, '[', ']');
    match (object, array) {
        (Some(o), Some(a)) => {
            // Whichever opens first encloses the other.
            if a.0 < o.0 {
                &response_text[a.0..=a.1]
            } else {
                &response_text[o.0..=o.1]
            }
        }
        (Some(o), None) => &response_text[o.0..=o.1],
        (None, Some(a)) => &response_text[a.0..=a.1],
        (None, None) => response_text.trim(),
    }
}

fn span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then_some((start, end))
}

/// Parse a model answer into JSON, tolerating surrounding prose.
pub fn parse_model_output(response_text: &str) -> GatewayResult<Value> {
    let json_str = extract_json_from_response(response_text);
    serde_json::from_str(json_str).map_err(|e| {
        GatewayError::shape(format!(
            "failed to parse model output as JSON: {}. Output: {}",
            e,
            truncate_for_log(json_str, 200)
        ))
    })
}

pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...[truncated]", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_fenced_block() {
        let response = r#"Here's the data:
```json
{"answer": "42"}
```
Hope that helps."#;
        assert_eq!(extract_json_from_response(response), r#"{"answer": "42"}"#);
    }

    #[test]
    fn test_extract_json_prefers_outer_array() {
        let response = r#"Sure: [{"a": 1}, {"a": 2}] done"#;
        assert_eq!(extract_json_from_response(response), r#"[{"a": 1}, {"a": 2}]"#);
    }

    #[test]
    fn test_extract_json_direct_object() {
        let response = r#"{"texts": ["one"]}"#;
        assert_eq!(extract_json_from_response(response), response);
    }

    #[test]
    fn test_parse_model_output_rejects_prose() {
        assert!(matches!(
            parse_model_output("no json here"),
            Err(GatewayError::Shape(_))
        ));
    }

    #[derive(Debug, Deserialize)]
    struct Answer {
        answer: String,
    }

    #[tokio::test]
    async fn test_invoke_decodes_typed_output() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({"answer": "three rows"}));
        let library = PromptLibrary::new().unwrap();

        let answer: Answer = invoke(
            &gateway,
            &library,
            PromptTemplate::QueryDataset,
            &json!({"dataset": "[]", "query": "how many rows?"}),
        )
        .await
        .unwrap();

        assert_eq!(answer.answer, "three rows");
        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].template, PromptTemplate::QueryDataset);
        assert!(calls[0].prompt.contains("how many rows?"));
    }

    #[tokio::test]
    async fn test_invoke_reports_shape_mismatch() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({"unexpected": true}));
        let library = PromptLibrary::new().unwrap();

        let result: GatewayResult<Answer> = invoke(
            &gateway,
            &library,
            PromptTemplate::QueryDataset,
            &json!({"dataset": "[]", "query": "q"}),
        )
        .await;

        assert!(matches!(result, Err(GatewayError::Shape(_))));
    }
}
