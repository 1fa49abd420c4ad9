//! Single-shot analysis advisors
//!
//! Every advisor validates its input, makes exactly one gateway call and
//! returns the decoded answer. There is no retry and no fan-out here.

use crate::generation::dataset_format::{parse_records, truncate_chars, DatasetFormat};
use crate::generation::gateway::{invoke, CompletionGateway};
use crate::generation::prompts::{PromptLibrary, PromptTemplate};
use crate::generation::{GatewayError, GenerationError, GenerationResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LOG_TARGET: &str = "synthetix::generation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSuggestion {
    pub column_type: String,
    pub data_examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Histogram,
}

/// A chart proposal with pre-aggregated data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSuggestion {
    pub chart_type: ChartType,
    pub title: String,
    pub description: String,
    /// JSON array of objects, as a string
    pub chart_data: String,
    pub data_key: String,
    pub category_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(default)]
    pub missing_values: u64,
    #[serde(default)]
    pub distinct_values: u64,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub column_name: String,
    pub stats: ColumnStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Value,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueDistribution {
    pub column_name: String,
    pub distribution: Vec<ValueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInsights {
    pub summary: Vec<ColumnSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributions: Option<Vec<ValueDistribution>>,
    #[serde(default)]
    pub visualizations: Vec<ChartSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
}

/// Shape, size and enhancement ideas for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAnalysis {
    pub format: String,
    pub columns: Vec<String>,
    pub row_count: u64,
    #[serde(default)]
    pub enhancement_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedPrompt {
    pub enhanced_prompt: String,
}

#[derive(Serialize)]
struct DatasetInput<'a> {
    dataset: &'a str,
}

#[derive(Serialize)]
struct QueryInput<'a> {
    dataset: &'a str,
    query: &'a str,
}

#[derive(Serialize)]
struct ColumnInput<'a> {
    column_name: &'a str,
    column_description: Option<&'a str>,
}

#[derive(Serialize)]
struct PromptInput<'a> {
    prompt: &'a str,
    default_row_count: usize,
}

pub struct DatasetAdvisor<'a> {
    gateway: &'a dyn CompletionGateway,
    library: &'a PromptLibrary,
    max_dataset_chars: usize,
    default_row_count: usize,
}

impl<'a> DatasetAdvisor<'a> {
    pub fn new(
        gateway: &'a dyn CompletionGateway,
        library: &'a PromptLibrary,
        max_dataset_chars: usize,
        default_row_count: usize,
    ) -> Self {
        Self {
            gateway,
            library,
            max_dataset_chars,
            default_row_count,
        }
    }

    pub async fn suggest_column_type(
        &self,
        column_name: &str,
        column_description: Option<&str>,
    ) -> GenerationResult<ColumnSuggestion> {
        let column_name = require(column_name, "Column name")?;
        let input = ColumnInput {
            column_name,
            column_description: column_description.map(str::trim).filter(|d| !d.is_empty()),
        };
        let suggestion: ColumnSuggestion =
            invoke(self.gateway, self.library, PromptTemplate::ColumnSuggestion, &input).await?;
        debug!(
            target: LOG_TARGET,
            "Column '{}' suggested as '{}'",
            column_name, suggestion.column_type
        );
        Ok(suggestion)
    }

    /// The proposal must be a bar, line or pie chart.
    pub async fn suggest_chart(&self, dataset: &str) -> GenerationResult<ChartSuggestion> {
        let dataset = require(dataset, "Dataset")?;
        let input = DatasetInput {
            dataset: self.truncate(dataset),
        };
        let chart: ChartSuggestion =
            invoke(self.gateway, self.library, PromptTemplate::ChartSuggestion, &input).await?;
        if chart.chart_type == ChartType::Histogram {
            return Err(GatewayError::shape("chart suggestion must be a bar, line or pie chart").into());
        }
        Ok(chart)
    }

    /// Rejects text that is neither a JSON array nor CSV.
    pub async fn insights(&self, dataset: &str) -> GenerationResult<DataInsights> {
        let dataset = self.tabular(dataset)?;
        let input = DatasetInput {
            dataset: self.truncate(dataset),
        };
        let insights: DataInsights =
            invoke(self.gateway, self.library, PromptTemplate::DataInsights, &input).await?;
        info!(
            target: LOG_TARGET,
            "Insights cover {} column(s) and {} visualization(s)",
            insights.summary.len(),
            insights.visualizations.len()
        );
        Ok(insights)
    }

    pub async fn query(&self, dataset: &str, query: &str) -> GenerationResult<QueryAnswer> {
        let dataset = self.tabular(dataset)?;
        let query = require(query, "Question")?;
        let input = QueryInput {
            dataset: self.truncate(dataset),
            query,
        };
        Ok(invoke(self.gateway, self.library, PromptTemplate::QueryDataset, &input).await?)
    }

    pub async fn analyze(&self, dataset: &str) -> GenerationResult<DatasetAnalysis> {
        let dataset = require(dataset, "Dataset")?;
        let input = DatasetInput {
            dataset: self.truncate(dataset),
        };
        Ok(invoke(self.gateway, self.library, PromptTemplate::AnalyzeDataset, &input).await?)
    }

    pub async fn enhance_prompt(&self, prompt: &str) -> GenerationResult<EnhancedPrompt> {
        let prompt = require(prompt, "Prompt")?;
        let input = PromptInput {
            prompt,
            default_row_count: self.default_row_count,
        };
        Ok(invoke(self.gateway, self.library, PromptTemplate::EnhancePrompt, &input).await?)
    }

    fn truncate<'t>(&self, dataset: &'t str) -> &'t str {
        let cut = truncate_chars(dataset, self.max_dataset_chars);
        if cut.len() < dataset.len() {
            debug!(
                target: LOG_TARGET,
                "Dataset truncated to {} characters before analysis",
                self.max_dataset_chars
            );
        }
        cut
    }

    /// Format is checked on the full text, before truncation.
    fn tabular<'t>(&self, dataset: &'t str) -> GenerationResult<&'t str> {
        let dataset = require(dataset, "Dataset")?;
        if !DatasetFormat::detect(dataset).is_known() {
            return Err(GenerationError::invalid_data(
                "Dataset could not be interpreted. Provide a JSON array or CSV text with a header row.",
            ));
        }
        let records = parse_records(dataset)?;
        if records.is_empty() {
            return Err(GenerationError::invalid_data("Dataset has no rows"));
        }
        debug!(target: LOG_TARGET, "Dataset holds {} record(s)", records.len());
        Ok(dataset)
    }
}

fn require<'t>(value: &'t str, what: &str) -> GenerationResult<&'t str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(GenerationError::invalid_input(format!("{} cannot be empty", what)))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use serde_json::json;

    fn advisor<'a>(gateway: &'a ScriptedGateway, library: &'a PromptLibrary) -> DatasetAdvisor<'a> {
        DatasetAdvisor::new(gateway, library, 20, 15)
    }

    #[tokio::test]
    async fn test_column_suggestion() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({
            "columnType": "email",
            "dataExamples": ["a@example.com", "b@example.com", "c@example.com"]
        }));
        let library = PromptLibrary::new().unwrap();

        let suggestion = advisor(&gateway, &library)
            .suggest_column_type("email_address", Some("  "))
            .await
            .unwrap();

        assert_eq!(suggestion.column_type, "email");
        assert_eq!(suggestion.data_examples.len(), 3);
        assert!(suggestion.explanation.is_none());
        assert!(!gateway.calls()[0].prompt.contains("Column Description"));
    }

    #[tokio::test]
    async fn test_insights_reject_unparseable_dataset() {
        let gateway = ScriptedGateway::new();
        let library = PromptLibrary::new().unwrap();

        let result = advisor(&gateway, &library)
            .insights("this is not a table at all")
            .await;
        assert!(matches!(result, Err(GenerationError::InvalidData(_))));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_query_rejects_dataset_without_rows() {
        let gateway = ScriptedGateway::new();
        let library = PromptLibrary::new().unwrap();

        for dataset in ["[]", "[1, 2, 3]"] {
            let result = advisor(&gateway, &library)
                .query(dataset, "How many rows?")
                .await;
            assert!(matches!(result, Err(GenerationError::InvalidData(_))));
        }
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_insights_optional_numeric_stats() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({
            "summary": [
                {"columnName": "age", "stats": {"mean": 38.5, "median": 38.5, "stdDev": 2.5,
                    "missingValues": 0, "distinctValues": 2, "dataType": "numeric"}},
                {"columnName": "name", "stats": {"missingValues": 0, "distinctValues": 2,
                    "dataType": "text"}}
            ],
            "visualizations": []
        }));
        let library = PromptLibrary::new().unwrap();

        let insights = advisor(&gateway, &library)
            .insights("name,age\nAda,36\nAlan,41")
            .await
            .unwrap();

        assert_eq!(insights.summary[0].stats.mean, Some(38.5));
        assert!(insights.summary[1].stats.mean.is_none());
        assert!(insights.distributions.is_none());
    }

    #[tokio::test]
    async fn test_long_dataset_is_truncated_before_the_call() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({"answer": "two rows"}));
        let library = PromptLibrary::new().unwrap();
        let dataset = "name,age\nAda,36\nAlan,41\nGrace,85\nEdsger,72";

        let answer = advisor(&gateway, &library)
            .query(dataset, "How many rows?")
            .await
            .unwrap();

        assert_eq!(answer.answer, "two rows");
        let prompt = &gateway.calls()[0].prompt;
        assert!(prompt.contains(&dataset[..20]));
        assert!(!prompt.contains("Edsger"));
    }

    #[tokio::test]
    async fn test_chart_rejects_histogram() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({
            "chartType": "histogram",
            "title": "Ages",
            "description": "Age spread",
            "chartData": "[]",
            "dataKey": "count",
            "categoryKey": "age"
        }));
        let library = PromptLibrary::new().unwrap();

        let result = advisor(&gateway, &library).suggest_chart("a,b\n1,2").await;
        assert!(matches!(result, Err(GenerationError::Gateway(GatewayError::Shape(_)))));
    }

    #[tokio::test]
    async fn test_enhance_prompt_and_analysis() {
        let gateway = ScriptedGateway::new();
        gateway.push_ok(json!({"enhancedPrompt": "A list of 15 users with full_name and email"}));
        gateway.push_ok(json!({
            "format": "CSV",
            "columns": ["name", "age"],
            "rowCount": 2,
            "enhancementSuggestions": ["Add a city column"]
        }));
        let library = PromptLibrary::new().unwrap();
        let advisor = advisor(&gateway, &library);

        let enhanced = advisor.enhance_prompt("users").await.unwrap();
        assert!(enhanced.enhanced_prompt.starts_with("A list of 15"));

        let analysis = advisor.analyze("name,age\nAda,36\nAlan,41").await.unwrap();
        assert_eq!(analysis.row_count, 2);
        assert_eq!(analysis.columns, vec!["name", "age"]);

        assert!(matches!(
            advisor.enhance_prompt("   ").await,
            Err(GenerationError::InvalidInput(_))
        ));
    }
}
