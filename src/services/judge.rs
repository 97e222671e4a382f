use base64::Engine;
use garde::Validate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::models::score::ScoreReport;

/// Fixed judging role. Rarely changes.
const SYSTEM_PROMPT: &str = "\
You are a strict but fair competitive drill judge. You assess ONLY what is \
clearly observable in the provided frames, sampled in order from one routine \
video. Be consistent between routines. If something cannot be seen clearly, \
treat it as unclear and do not apply hard deductions. Always follow the \
scoring matrix and deduction rules, and return a structured result that \
conforms exactly to the provided schema.";

/// The assignment itself. Always the same.
const USER_PROMPT: &str = "\
Assess the drill routine shown in these frames.

Score the following categories:
- teknik (0-10)
- utforande (execution/cleanliness, 0-10)
- koreografi_svarighet (choreography & difficulty, 0-10)
- musikalitet_tajming (musicality & timing, 0-5)
- scennarvaro_helhet (stage presence & overall impression, 0-5)

Deductions:
- tapp: -2 points per clear drop
- stort_missat_moment: -1 to -3 points depending on impact
- osynk_tajming: -1 to -2 points for clear desync or timing faults
- stegfel: footwork faults
- annan: anything else

Instructions:
- total = sum of category scores minus deductions
- give an approximate timestamp (mm:ss) for every deduction
- write short, concrete key_observations
- give 3-6 clear training_focus points for the coming two weeks
- confidence must be between 0.0 and 1.0 depending on how clearly the \
routine can be assessed from the frames";

/// Client for the multimodal judge model (OpenAI-compatible chat
/// completions with structured output).
pub struct JudgeClient {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl JudgeClient {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Submit the ordered frame sequence with the rubric and parse the
    /// model's structured response into a validated [`ScoreReport`].
    pub async fn score(&self, frames: &[Vec<u8>]) -> Result<ScoreReport, JudgeError> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut content = vec![json!({ "type": "text", "text": USER_PROMPT })];
        for frame in frames {
            let encoded = base64::engine::general_purpose::STANDARD.encode(frame);
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{encoded}") }
            }));
        }

        let request_body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": content }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "score_report",
                    "strict": true,
                    "schema": score_report_schema()
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(JudgeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JudgeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await.map_err(JudgeError::Http)?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(JudgeError::EmptyResponse)?;

        let report: ScoreReport = serde_json::from_str(&content).map_err(JudgeError::Parse)?;
        report
            .validate()
            .map_err(|e| JudgeError::Schema(e.to_string()))?;
        Ok(report)
    }
}

/// JSON schema the model's structured output must conform to. Mirrors the
/// bounds enforced by [`ScoreReport`]'s validation.
fn score_report_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "total", "categories", "deductions",
            "key_observations", "training_focus", "confidence"
        ],
        "properties": {
            "total": { "type": "integer" },
            "categories": {
                "type": "object",
                "additionalProperties": false,
                "required": [
                    "teknik", "utforande", "koreografi_svarighet",
                    "musikalitet_tajming", "scennarvaro_helhet"
                ],
                "properties": {
                    "teknik": { "type": "integer", "minimum": 0, "maximum": 10 },
                    "utforande": { "type": "integer", "minimum": 0, "maximum": 10 },
                    "koreografi_svarighet": { "type": "integer", "minimum": 0, "maximum": 10 },
                    "musikalitet_tajming": { "type": "integer", "minimum": 0, "maximum": 5 },
                    "scennarvaro_helhet": { "type": "integer", "minimum": 0, "maximum": 5 }
                }
            },
            "deductions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["reason", "points", "time"],
                    "properties": {
                        "reason": {
                            "type": "string",
                            "enum": [
                                "tapp", "stort_missat_moment", "osynk_tajming",
                                "stegfel", "annan"
                            ]
                        },
                        "points": { "type": "integer", "maximum": -1 },
                        "time": { "type": "string", "description": "mm:ss timestamp" }
                    }
                }
            },
            "key_observations": {
                "type": "array",
                "items": { "type": "string" }
            },
            "training_focus": {
                "type": "array",
                "minItems": 3,
                "maxItems": 6,
                "items": { "type": "string" }
            },
            "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("judge API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("judge response contained no content")]
    EmptyResponse,

    #[error("failed to parse judge response as a score report: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("score report failed schema validation: {0}")]
    Schema(String),
}
