//! Schema inference from a natural-language prompt

use crate::generation::gateway::{invoke, CompletionGateway};
use crate::generation::prompts::{PromptLibrary, PromptTemplate};
use crate::generation::types::InferredSchema;
use crate::generation::GatewayResult;
use log::info;
use serde::Serialize;

#[derive(Serialize)]
struct InferSchemaInput<'a> {
    prompt: &'a str,
    default_row_count: usize,
}

/// Asks the model for the columns, row count and topic of a prompt.
///
/// The default row count is part of the prompt text; no default is
/// substituted here when the model omits one.
pub struct SchemaInferrer<'a> {
    gateway: &'a dyn CompletionGateway,
    library: &'a PromptLibrary,
    default_row_count: usize,
}

impl<'a> SchemaInferrer<'a> {
    pub fn new(
        gateway: &'a dyn CompletionGateway,
        library: &'a PromptLibrary,
        default_row_count: usize,
    ) -> Self {
        Self {
            gateway,
            library,
            default_row_count,
        }
    }

    /// One gateway call; errors are propagated unchanged.
    pub async fn infer(&self, prompt: &str) -> GatewayResult<InferredSchema> {
        let input = InferSchemaInput {
            prompt,
            default_row_count: self.default_row_count,
        };
        let schema: InferredSchema =
            invoke(self.gateway, self.library, PromptTemplate::InferSchema, &input).await?;
        info!(
            target: "synthetix::generation",
            "Inferred schema for topic '{}': {} column(s), {} row(s)",
            schema.topic,
            schema.columns.len(),
            schema.row_count
        );
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GatewayError;
    use crate::testing::{schema_answer, ScriptedGateway};

    #[tokio::test]
    async fn test_infer_returns_schema() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(schema_answer(&["name", "email"], 120, "users"));
        let library = PromptLibrary::new().unwrap();

        let schema = SchemaInferrer::new(&gateway, &library, 15)
            .infer("A list of 120 users with name and email")
            .await
            .unwrap();

        assert_eq!(schema.row_count, 120);
        assert_eq!(schema.topic, "users");
        assert_eq!(schema.columns[1].name, "email");

        let calls = gateway.calls();
        assert!(calls[0].prompt.contains("A list of 120 users"));
        assert!(calls[0].prompt.contains("default to 15"));
    }

    #[tokio::test]
    async fn test_infer_propagates_gateway_error() {
        let gateway = ScriptedGateway::new();
        gateway.push_err(GatewayError::Timeout(30));
        let library = PromptLibrary::new().unwrap();

        let result = SchemaInferrer::new(&gateway, &library, 15).infer("anything at all").await;
        assert!(matches!(result, Err(GatewayError::Timeout(30))));
    }
}
