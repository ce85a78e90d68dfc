//! services/api/src/adapters/estimate_llm.rs
//!
//! This module contains the adapter for the cost-estimating LLM.
//! It implements the `CostEstimationService` port from the `core` crate,
//! covering both structured cost tiers and FieldBot's free-text answers.

use std::sync::OnceLock;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use buildestimate_core::{
    domain::CostTier,
    estimate::tier_from_raw,
    ports::{CostEstimationService, PortError, PortResult},
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CostEstimationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiEstimateAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEstimateAdapter {
    /// Creates a new `OpenAiEstimateAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

const SYSTEM_PROMPT: &str = "You are a senior quantity surveyor for residential construction in India. \
     Answer only with JSON matching the requested schema. Costs are whole Indian Rupees.";

fn tiers_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "tiers": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "materialCost": { "type": "number" },
                        "laborCost": { "type": "number" },
                        "explanation": { "type": "string" }
                    },
                    "required": ["label", "materialCost", "laborCost", "explanation"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["tiers"],
        "additionalProperties": false
    })
}

//=========================================================================================
// Response Parsing
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTier {
    #[serde(default)]
    label: String,
    #[serde(default, alias = "material")]
    material_cost: f64,
    #[serde(default, alias = "labor")]
    labor_cost: f64,
    #[serde(default)]
    explanation: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTiers {
    Wrapped { tiers: Vec<RawTier> },
    Bare(Vec<RawTier>),
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").ok())
        .as_ref()
}

/// Parses the model's reply into tiers. Markdown code fences are tolerated,
/// as is a bare array in place of the `{"tiers": [...]}` object.
pub fn parse_tiers(content: &str) -> PortResult<Vec<CostTier>> {
    let body = match fence_regex().and_then(|re| re.captures(content)) {
        Some(caps) => caps.get(1).map_or(content, |m| m.as_str()),
        None => content.trim(),
    };
    let raw: RawTiers = serde_json::from_str(body).map_err(|e| {
        PortError::Unexpected(format!("Estimate LLM returned malformed JSON: {}", e))
    })?;
    let tiers = match raw {
        RawTiers::Wrapped { tiers } | RawTiers::Bare(tiers) => tiers,
    };
    Ok(tiers
        .into_iter()
        .map(|t| tier_from_raw(&t.label, t.material_cost, t.labor_cost, &t.explanation))
        .collect())
}

//=========================================================================================
// `CostEstimationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CostEstimationService for OpenAiEstimateAdapter {
    /// Asks the model for cost tiers using a structured JSON response.
    async fn generate_cost_tiers(&self, prompt: &str) -> PortResult<Vec<CostTier>> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("Construction cost tiers".to_string()),
                    name: "cost_tiers".to_string(),
                    schema: Some(tiers_schema()),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Estimate LLM response contained no text content.".to_string())
            })?;

        parse_tiers(&content)
    }

    /// A plain-text chat completion for FieldBot questions.
    async fn answer_site_question(&self, system_instruction: &str, question: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_instruction)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(question)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
