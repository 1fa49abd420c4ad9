//! Prompt templates sent to the completion service
//!
//! Templates are configuration: each [`PromptTemplate`] id maps to one
//! handlebars template and one expected output shape. Rendering disables
//! HTML escaping since the output is plain prompt text.

use crate::generation::{GatewayError, GatewayResult};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Identifier of a prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    InferSchema,
    StructuredData,
    SyntheticText,
    EnhanceDataset,
    AnalyzeDataset,
    ColumnSuggestion,
    ChartSuggestion,
    DataInsights,
    QueryDataset,
    EnhancePrompt,
}

impl PromptTemplate {
    pub const ALL: [PromptTemplate; 10] = [
        PromptTemplate::InferSchema,
        PromptTemplate::StructuredData,
        PromptTemplate::SyntheticText,
        PromptTemplate::EnhanceDataset,
        PromptTemplate::AnalyzeDataset,
        PromptTemplate::ColumnSuggestion,
        PromptTemplate::ChartSuggestion,
        PromptTemplate::DataInsights,
        PromptTemplate::QueryDataset,
        PromptTemplate::EnhancePrompt,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            PromptTemplate::InferSchema => "infer_schema",
            PromptTemplate::StructuredData => "structured_data",
            PromptTemplate::SyntheticText => "synthetic_text",
            PromptTemplate::EnhanceDataset => "enhance_dataset",
            PromptTemplate::AnalyzeDataset => "analyze_dataset",
            PromptTemplate::ColumnSuggestion => "column_suggestion",
            PromptTemplate::ChartSuggestion => "chart_suggestion",
            PromptTemplate::DataInsights => "data_insights",
            PromptTemplate::QueryDataset => "query_dataset",
            PromptTemplate::EnhancePrompt => "enhance_prompt",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            PromptTemplate::InferSchema => INFER_SCHEMA,
            PromptTemplate::StructuredData => STRUCTURED_DATA,
            PromptTemplate::SyntheticText => SYNTHETIC_TEXT,
            PromptTemplate::EnhanceDataset => ENHANCE_DATASET,
            PromptTemplate::AnalyzeDataset => ANALYZE_DATASET,
            PromptTemplate::ColumnSuggestion => COLUMN_SUGGESTION,
            PromptTemplate::ChartSuggestion => CHART_SUGGESTION,
            PromptTemplate::DataInsights => DATA_INSIGHTS,
            PromptTemplate::QueryDataset => QUERY_DATASET,
            PromptTemplate::EnhancePrompt => ENHANCE_PROMPT,
        }
    }

    /// Description of the JSON document the model must answer with.
    pub fn output_shape(&self) -> Value {
        match self {
            PromptTemplate::InferSchema => json!({
                "columns": [{"name": "string", "type": "string", "description": "string (optional)"}],
                "count": "integer >= 1",
                "topic": "string"
            }),
            PromptTemplate::StructuredData => json!([{"<column name>": "<value>"}]),
            PromptTemplate::SyntheticText => json!({"texts": ["string"]}),
            PromptTemplate::EnhanceDataset => json!({"enhancedDataset": "string"}),
            PromptTemplate::AnalyzeDataset => json!({
                "format": "string",
                "columns": ["string"],
                "rowCount": "integer",
                "enhancementSuggestions": ["string"]
            }),
            PromptTemplate::ColumnSuggestion => json!({
                "columnType": "string",
                "dataExamples": ["string"],
                "explanation": "string (optional)"
            }),
            PromptTemplate::ChartSuggestion => json!({
                "chartType": "bar | line | pie",
                "title": "string",
                "description": "string",
                "chartData": "string (JSON array of objects)",
                "dataKey": "string",
                "categoryKey": "string"
            }),
            PromptTemplate::DataInsights => json!({
                "summary": [{
                    "columnName": "string",
                    "stats": {
                        "mean": "number (numeric columns only)",
                        "median": "number (numeric columns only)",
                        "stdDev": "number (numeric columns only)",
                        "missingValues": "integer",
                        "distinctValues": "integer",
                        "dataType": "string"
                    }
                }],
                "distributions": [{
                    "columnName": "string",
                    "distribution": [{"value": "string | number | boolean | null", "count": "integer"}]
                }],
                "visualizations": [{
                    "chartType": "bar | line | pie | histogram",
                    "title": "string",
                    "description": "string",
                    "chartData": "string (JSON array of objects)",
                    "dataKey": "string",
                    "categoryKey": "string"
                }]
            }),
            PromptTemplate::QueryDataset => json!({"answer": "string"}),
            PromptTemplate::EnhancePrompt => json!({"enhancedPrompt": "string"}),
        }
    }
}

/// Registry of compiled prompt templates
pub struct PromptLibrary {
    registry: Handlebars<'static>,
}

impl PromptLibrary {
    /// Compile every built-in template.
    pub fn new() -> GatewayResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        for template in PromptTemplate::ALL {
            registry
                .register_template_string(template.id(), template.source())
                .map_err(|e| {
                    GatewayError::template(format!("failed to compile '{}': {}", template.id(), e))
                })?;
        }
        Ok(Self { registry })
    }

    /// Render `template` with `input` as the handlebars context.
    pub fn render<T: Serialize>(&self, template: PromptTemplate, input: &T) -> GatewayResult<String> {
        self.registry
            .render(template.id(), input)
            .map_err(|e| GatewayError::template(format!("failed to render '{}': {}", template.id(), e)))
    }
}

const INFER_SCHEMA: &str = r#"You are an expert at understanding data requirements from natural language. A user will provide a prompt, and you must infer a structured schema, the total number of rows requested, and the general topic.

Your task:
1.  Analyze the prompt: "{{prompt}}"
2.  Identify columns: Determine the columns the user wants. For each column, provide a concise name (using snake_case), a descriptive type (like 'firstName', 'email', 'age', 'schoolName'), and a brief description.
3.  Identify row count: Determine how many rows of data the user asked for. If they don't specify a number, default to {{default_row_count}}.
4.  Identify topic: Extract the main subject of the dataset (e.g., students, products).

Provide the output in the specified JSON format."#;

const STRUCTURED_DATA: &str = r#"You are an expert data generator. The user will provide a schema of columns (with names, types, and descriptions) and a desired number of rows.
You will generate a synthetic dataset in JSON array format that matches this schema.

Generate exactly {{count}} rows.

The schema is as follows:
{{#each columns}}
- Column Name: "{{name}}", Type: "{{type}}"{{#if description}}, Description: "{{description}}"{{/if}}
{{/each}}

Ensure the output is a valid JSON array of objects. Do not wrap it in a markdown block."#;

const SYNTHETIC_TEXT: &str = r#"You are an expert in generating synthetic text data for application testing.

You will generate realistic text samples based on the provided parameters.

Type of text: {{text_type}}
{{#if topic}}
The text should be related to the topic: {{topic}}.
{{/if}}
{{#if length}}
The text should be of the following length: {{length}}.
{{/if}}
{{#if style}}
The text should be written in the following style: {{style}}.
{{/if}}

Generate 1 text sample.

Output the generated texts as a JSON array of strings under the "texts" key."#;

const ENHANCE_DATASET: &str = r#"You are an expert data scientist and data transformation tool. You will be given a dataset and a list of instructions for how to enhance it.

Your task is to intelligently apply the requested enhancements to the dataset. This means you should not just add placeholder data, but generate realistic and varied information.

Your task is to:
1.  Carefully analyze the structure and content of the original dataset to understand its context.
2.  Apply ALL of the enhancement instructions to the dataset. When adding new data, ensure the generated values are realistic, diverse, and consistent with the existing data.
3.  Preserve the original data and structure as much as possible, only changing what is requested in the enhancements.
4.  Output the complete, modified dataset under the "enhancedDataset" key.
5.  IMPORTANT: The output format (e.g., JSON array of objects, CSV) must be the same as the original input dataset. Retain all original column names and their order, unless an enhancement specifically asks to modify them. If the output is in CSV format, you MUST include a header row with the column names as the very first line. Do not add any explanatory text, just the raw data.

Original Dataset:
```
{{dataset}}
```

Enhancement Instructions to apply:
{{#each enhancements}}
- {{this}}
{{/each}}"#;

const ANALYZE_DATASET: &str = r#"You are an expert data analyst. You will be given a dataset as a raw string. Note that the provided data may be a truncated sample of a larger dataset.

Your task is to:
1.  Detect the format of the data (e.g., JSON array of objects, CSV, or state 'unknown').
2.  Identify the column headers or object keys. If it's a CSV with no header, use "column_1", "column_2", etc.
3.  Count the number of data rows present in the provided sample (excluding any header row).
4.  Provide exactly three creative and useful suggestions for how this dataset could be enhanced or augmented. The suggestions should be actionable instructions that can be performed by another AI without additional information.

Dataset:
{{dataset}}"#;

const COLUMN_SUGGESTION: &str = r#"You are an AI assistant helping users design dataset schemas. Given a column name and optional description, you will suggest a relevant column type and data examples.

Column Name: {{column_name}}
{{#if column_description}}
Column Description: {{column_description}}
{{/if}}

Suggest a column type and three example data values for this column. Include a short explanation of why you suggested this column type. Format the data examples as a JSON array of strings."#;

const CHART_SUGGESTION: &str = r#"You are a data visualization expert. Given a dataset, your task is to propose a single, insightful chart that summarizes or highlights a key aspect of the data.

You must:
1.  Analyze the provided dataset.
2.  Decide on the most appropriate chart type from the available options: 'bar', 'line', or 'pie'.
3.  Generate a clear title and a brief, one-sentence description for the chart.
4.  Identify the key for the main data values (dataKey) and the key for the categories/labels (categoryKey).
5.  Transform and aggregate the raw data into a format suitable for direct use with a charting library. The output 'chartData' must be a string containing a valid JSON array of objects. Make sure the data is aggregated (e.g., counts, sums, averages).

Do not generate more than 10 data points for the chart to keep it readable.

Dataset:
```
{{dataset}}
```"#;

const DATA_INSIGHTS: &str = r#"You are an expert data analyst. You will be given a dataset as a raw string.
Your task is to perform a comprehensive analysis and provide summary statistics and visualization suggestions.

1.  Summary Statistics: For each column in the dataset:
    *   Infer the data type ('numeric', 'categorical', 'text', 'date').
    *   For numeric columns: calculate mean, median, standard deviation, count of missing/null values, and count of distinct values.
    *   For all other columns: calculate count of missing/null values and count of distinct values. For non-numeric columns, you MUST NOT include the `mean`, `median`, or `stdDev` fields at all.
    *   Present this in the `summary` field as an array of objects, each with a `columnName` and a `stats` object.

2.  Value Distributions: For the top 3-5 most important categorical columns, provide a count for each value, limited to the top 10 most frequent values. Present this in the `distributions` field. If there are no suitable categorical columns, omit the `distributions` field.

3.  Visualization Suggestions: Suggest up to 3 diverse visualizations from: 'bar', 'pie', 'histogram', 'line'. Each needs a `title`, `description`, `chartType`, `dataKey`, `categoryKey`, and aggregated `chartData` given as a string containing a valid JSON array of objects. `dataKey` and `categoryKey` MUST exist as keys in the chartData objects.

Dataset (this may be a truncated sample of a larger file):
```
{{dataset}}
```"#;

const QUERY_DATASET: &str = r#"You are a world-class data analyst AI. You will be given a dataset and a question about it.
Your task is to analyze the dataset and provide a clear, concise, and accurate answer to the question.

If the question is subjective or requires complex operations you cannot perform, provide a helpful response explaining what you can do and what additional information you might need. Do not invent data that is not present in the dataset.

Dataset (this may be a truncated sample of a larger file):
```
{{dataset}}
```

User's Question:
"{{query}}""#;

const ENHANCE_PROMPT: &str = r#"You are an AI assistant that helps users create better prompts for generating synthetic datasets.
You will be given a user's simple prompt. Your task is to enhance it by making it more specific, detailed, and structured.

A good enhanced prompt should:
- Strictly adhere to the columns/fields mentioned by the user. Do not add new ones.
- Suggest specific and realistic data types for the requested columns (e.g., 'firstName', 'email', 'uuid', 'productCategory', 'unixTimestamp').
- Specify a reasonable number of rows if not mentioned (default to {{default_row_count}}).
- Add context or constraints to make the data more realistic without adding new columns.

Example:
User Prompt: "users with name and email"
Enhanced Prompt: "A list of {{default_row_count}} users, with columns for full_name (a realistic full name string) and email_address (a valid email format)."

User's prompt to enhance:
{{prompt}}

Generate only the enhanced prompt text under the "enhancedPrompt" key, without any additional explanation or markdown."#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ColumnSpec;

    #[test]
    fn test_all_templates_compile() {
        assert!(PromptLibrary::new().is_ok());
    }

    #[test]
    fn test_structured_data_lists_columns() {
        let library = PromptLibrary::new().unwrap();
        let columns = vec![
            ColumnSpec::new("name", "fullName"),
            ColumnSpec::new("email", "email").with_description("work address"),
        ];
        let prompt = library
            .render(
                PromptTemplate::StructuredData,
                &json!({"columns": columns, "count": 20}),
            )
            .unwrap();
        assert!(prompt.contains("Generate exactly 20 rows."));
        assert!(prompt.contains(r#"Column Name: "email", Type: "email", Description: "work address""#));
        assert!(!prompt.contains(r#"Type: "fullName", Description"#));
    }

    #[test]
    fn test_rendering_does_not_escape_quotes() {
        let library = PromptLibrary::new().unwrap();
        let prompt = library
            .render(
                PromptTemplate::QueryDataset,
                &json!({"dataset": "[{\"a\": 1}]", "query": "what's <max>?"}),
            )
            .unwrap();
        assert!(prompt.contains("[{\"a\": 1}]"));
        assert!(prompt.contains("what's <max>?"));
    }

    #[test]
    fn test_template_ids_are_unique() {
        let ids: std::collections::HashSet<_> = PromptTemplate::ALL.iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), PromptTemplate::ALL.len());
    }
}
