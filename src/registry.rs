//! Operation registry for model-driven tool dispatch.
//!
//! Each operation is registered once with a hand-written schema descriptor
//! and a typed request builder. A model response naming operations is parsed
//! into [`ToolCall`]s, each call's arguments are checked against the
//! descriptor, and only then is the typed request executed.
//!
//! The registry does not talk to a model itself; [`GenerateRequest`] and
//! [`render_prompt`](OperationRegistry::render_prompt) describe what a caller
//! sends to a local generate endpoint.

use crate::config::{AppConfig, DispatchConfig};
use crate::error::{PopdataError, Result};
use crate::models::{DistributionSlice, ExtractionStats, StatisticsStats, TrendPoint};
use crate::processor::discovery::{cleaned_output_path, stats_output_path};
use crate::processor::extractor::TableExtractor;
use crate::processor::{series, stats};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Parameter type as advertised to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// Schema descriptor attached to an operation at registration
#[derive(Debug, Clone, Serialize)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
    pub returns: &'static str,
}

impl OperationSpec {
    /// JSON schema in the shape the prompt advertises
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.to_string(), json!({ "type": p.param_type })))
            .collect();

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": { "type": "object", "properties": properties },
            "returns": self.returns,
        })
    }

    /// Check `input` carries exactly the declared string parameters
    pub fn validate(&self, input: &Value) -> Result<HashMap<String, String>> {
        let empty = Map::new();
        let object = match input {
            Value::Object(object) => object,
            Value::Null => &empty,
            other => {
                return Err(PopdataError::invalid_arguments(
                    self.name,
                    format!("tool_input must be an object, got {}", other),
                ));
            }
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.parameters.iter().any(|p| p.name == key.as_str()))
        {
            return Err(PopdataError::invalid_arguments(
                self.name,
                format!("unexpected parameter '{}'", unknown),
            ));
        }

        let mut arguments = HashMap::new();
        for param in &self.parameters {
            match object.get(param.name) {
                Some(Value::String(value)) => {
                    arguments.insert(param.name.to_string(), value.clone());
                }
                Some(other) => {
                    return Err(PopdataError::invalid_arguments(
                        self.name,
                        format!("parameter '{}' must be a string, got {}", param.name, other),
                    ));
                }
                None => {
                    return Err(PopdataError::invalid_arguments(
                        self.name,
                        format!("missing parameter '{}'", param.name),
                    ));
                }
            }
        }

        Ok(arguments)
    }
}

/// Typed request for each registered operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    WriteCsvFromText { file_name: String },
    CalculatePopulationStatistics { file_path: String },
    VisualizePopulationDistribution { file_path: String },
    VisualizePopulationTrend { file_path: String, province_name: String },
}

/// Typed result of an executed operation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationOutcome {
    Extracted(ExtractionStats),
    Statistics(StatisticsStats),
    Distribution { slices: Vec<DistributionSlice> },
    Trend { label: String, points: Vec<TrendPoint> },
}

type RequestBuilder = fn(HashMap<String, String>) -> OperationRequest;

struct RegisteredOperation {
    spec: OperationSpec,
    build: RequestBuilder,
}

/// One operation selected by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub tool_input: Value,
}

/// Body of a non-streaming generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

impl GenerateRequest {
    pub fn new(config: &DispatchConfig, prompt: impl Into<String>) -> Self {
        Self {
            model: config.model.clone(),
            prompt: prompt.into(),
            stream: false,
        }
    }
}

/// Envelope returned by a generate endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    /// Nanoseconds
    pub total_duration: Option<u64>,
}

impl GenerateResponse {
    pub fn total_duration_secs(&self) -> Option<f64> {
        self.total_duration.map(|ns| ns as f64 / 1e9)
    }
}

/// Results of running every call in a model response
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub results: Vec<(String, Result<OperationOutcome>)>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Name-to-handler map built once at startup
pub struct OperationRegistry {
    config: AppConfig,
    operations: BTreeMap<&'static str, RegisteredOperation>,
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn take(arguments: &mut HashMap<String, String>, name: &str) -> String {
    arguments.remove(name).unwrap_or_default()
}

fn string_param(name: &'static str) -> ParameterSpec {
    ParameterSpec {
        name,
        param_type: ParamType::Str,
    }
}

impl OperationRegistry {
    /// Empty registry bound to `config`
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            operations: BTreeMap::new(),
        }
    }

    /// Registry with every built-in operation
    pub fn with_defaults(config: AppConfig) -> Self {
        let mut registry = Self::new(config);

        registry.register(
            OperationSpec {
                name: "write_csv_from_text",
                description: "Read the specified text file given the file name. \
                              Remove the table header and footer, and save it as a new CSV file.",
                parameters: vec![string_param("file_name")],
                returns: "None",
            },
            |mut args| OperationRequest::WriteCsvFromText {
                file_name: take(&mut args, "file_name"),
            },
        );

        registry.register(
            OperationSpec {
                name: "calculate_population_statistics",
                description: "Calculate the mean, maximum, and minimum population values \
                              for each region in the given CSV file.",
                parameters: vec![string_param("file_path")],
                returns: "None",
            },
            |mut args| OperationRequest::CalculatePopulationStatistics {
                file_path: take(&mut args, "file_path"),
            },
        );

        registry.register(
            OperationSpec {
                name: "visualize_population_distribution",
                description: "Visualize the population distribution for the last 10 years \
                              as a pie chart for each region.",
                parameters: vec![string_param("file_path")],
                returns: "None",
            },
            |mut args| OperationRequest::VisualizePopulationDistribution {
                file_path: take(&mut args, "file_path"),
            },
        );

        registry.register(
            OperationSpec {
                name: "visualize_population_trend",
                description: "Visualize the population trend for the last 10 years \
                              of a specific province as a line chart.",
                parameters: vec![string_param("file_path"), string_param("province_name")],
                returns: "None",
            },
            |mut args| OperationRequest::VisualizePopulationTrend {
                file_path: take(&mut args, "file_path"),
                province_name: take(&mut args, "province_name"),
            },
        );

        registry
    }

    pub fn register(&mut self, spec: OperationSpec, build: RequestBuilder) {
        debug!("Registering operation {}", spec.name);
        self.operations
            .insert(spec.name, RegisteredOperation { spec, build });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn specs(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.values().map(|op| &op.spec)
    }

    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name).map(|op| &op.spec)
    }

    /// Pretty-printed schema of every operation, one after another
    pub fn catalog(&self) -> String {
        self.specs()
            .map(|spec| serde_json::to_string_pretty(&spec.to_json()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full prompt: tool catalog, response instructions, then the query
    pub fn render_prompt(&self, query: &str) -> String {
        format!(
            r#"
You have access to the following tools:
{catalog}
You must follow these instructions:
Always select one or more of the above tools based on the user query
If a tool is found, you must respond in the JSON format matching the following schema:
{{
   "tools": {{
        "tool": "<name of the selected tool>",
        "tool_input": <parameters for the selected tool, matching the tool's JSON schema
   }}
}}
If there are multiple tools required, make sure a list of tools are returned in a JSON array.
If there is no tool that match the user request, you must respond empty JSON {{}}.

User Query:
    {query}"#,
            catalog = self.catalog(),
            query = query
        )
    }

    /// Resolve a call into a typed request after schema validation
    pub fn resolve(&self, call: &ToolCall) -> Result<OperationRequest> {
        let operation =
            self.operations
                .get(call.tool.as_str())
                .ok_or_else(|| PopdataError::UnknownOperation {
                    name: call.tool.clone(),
                })?;

        let arguments = operation.spec.validate(&call.tool_input)?;
        Ok((operation.build)(arguments))
    }

    /// Validate and execute one call
    pub fn dispatch(&self, call: &ToolCall) -> Result<OperationOutcome> {
        let request = self.resolve(call)?;
        info!("Dispatching {}", call.tool);
        self.execute(request)
    }

    /// Execute every call, continuing past failures
    pub fn dispatch_all(&self, calls: &[ToolCall]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for call in calls {
            let result = self.dispatch(call);
            if let Err(e) = &result {
                warn!("{} failed: {}", call.tool, e);
            }
            report.results.push((call.tool.clone(), result));
        }
        report
    }

    /// Run a typed request against the bound configuration
    pub fn execute(&self, request: OperationRequest) -> Result<OperationOutcome> {
        let dispatch = &self.config.dispatch;

        match request {
            OperationRequest::WriteCsvFromText { file_name } => {
                let source = dispatch.resolve(&file_name);
                let destination = cleaned_output_path(&source);
                let extractor = TableExtractor::new(self.config.extractor.clone())?;
                Ok(OperationOutcome::Extracted(
                    extractor.extract(&source, &destination)?,
                ))
            }
            OperationRequest::CalculatePopulationStatistics { file_path } => {
                let input = dispatch.resolve(&file_path);
                let output = stats_output_path(&input);
                Ok(OperationOutcome::Statistics(stats::calculate_statistics(
                    &input,
                    &output,
                    &self.config.statistics,
                )?))
            }
            OperationRequest::VisualizePopulationDistribution { file_path } => {
                let input = dispatch.resolve(&file_path);
                Ok(OperationOutcome::Distribution {
                    slices: series::distribution(&input, &self.config.statistics)?,
                })
            }
            OperationRequest::VisualizePopulationTrend {
                file_path,
                province_name,
            } => {
                let input = dispatch.resolve(&file_path);
                let points = series::trend(&input, &province_name, &self.config.statistics)?;
                Ok(OperationOutcome::Trend {
                    label: province_name,
                    points,
                })
            }
        }
    }
}

/// Slice from the first `{` to the last `}`, dropping code fences or chatter
fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start <= end).then(|| &text[start..=end])
}

/// Extract tool calls from a model response; anything unparsable yields none
pub fn parse_tool_calls(text: &str) -> Vec<ToolCall> {
    let Some(value) = json_object_span(text).and_then(|s| serde_json::from_str::<Value>(s).ok())
    else {
        debug!("Response is not a JSON object");
        return Vec::new();
    };

    // Generate endpoints wrap the model text in a "response" field
    let value = match value.get("response") {
        Some(Value::String(inner)) => {
            match json_object_span(inner).and_then(|s| serde_json::from_str::<Value>(s).ok()) {
                Some(inner) => inner,
                None => return Vec::new(),
            }
        }
        _ => value,
    };

    match value.get("tools") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Some(object @ Value::Object(_)) => serde_json::from_value(object.clone())
            .ok()
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}
