//! Content provider boundary: a thin client for the Gemini `generateContent`
//! REST API. All provider failures are absorbed here or converted into the
//! fixed fallback shapes the rest of the app expects.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::models::{ChatMessage, Difficulty, QuizQuestion, OPTION_COUNT};

/// Questions per fetched batch.
pub const QUIZ_BATCH_SIZE: usize = 3;

/// Shown when an explanation fetch fails.
pub const EXPLAIN_FALLBACK: &str = "哎呀，老师的网络稍微有点卡，请再问一次吧！🤖";
/// Shown when a chat turn fails.
pub const CHAT_FALLBACK: &str = "老师正在思考中，请稍等一下... 🧠";
/// Shown when the provider replies with empty text.
pub const EMPTY_REPLY_FALLBACK: &str = "我好像走神了，能再说一遍吗？";

const SYSTEM_INSTRUCTION: &str = "\
你是一位来自中国深圳的小学三年级数学金牌教师。
1. **教材背景**：你非常熟悉北师大版和人教版小学三年级上册数学教材。
2. **核心内容**：混合运算、观察物体、加与减、乘与除、周长、年月日、小数的初步认识。
3. **教学风格**：生动活泼，喜欢用生活中的例子（如深圳的地标、超市购物、游乐园）来讲解。多用emoji 🌟🚀。
4. **能力提升**：在适当时候引入简单的奥数概念（如植树问题、和差倍问题、周期问题），但要浅显易懂。
5. **语言**：必须使用简体中文。
";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("provider returned no text")]
    EmptyResponse,
}

/// Client for the tutoring model.
pub struct TutorClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl TutorClient {
    /// Build a client from config plus the `GEMINI_API_KEY` environment
    /// variable. A missing key is reported, not defaulted: the caller decides
    /// how to degrade.
    pub fn from_env(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Fetch a free-text explanation of a topic. An empty `user_query` asks
    /// for the standard opening introduction.
    pub async fn explain(&self, topic_title: &str, user_query: &str) -> Result<String, ProviderError> {
        let query = if user_query.trim().is_empty() {
            "请先简单有趣地介绍这个概念，然后举一个生活中的例子。"
        } else {
            user_query
        };
        let prompt = format!(
            "请为三年级小学生讲解知识点：{topic_title}。\n\n\
             用户具体问题：{query}\n\n\
             要求：\n\
             1. 语言通俗易懂，像讲故事一样。\n\
             2. 如果是几何问题（如周长），请描述形状。\n\
             3. 如果是计算问题，请展示步骤。\n\
             4. 最后给出一个简单的互动思考题。"
        );

        self.generate(vec![Content::user(prompt)], None).await
    }

    /// Fetch one quiz batch. Any failure, including a malformed or truncated
    /// payload, yields an empty vec; the caller treats that as a retryable
    /// error state.
    pub async fn generate_quiz(&self, topic_title: &str, difficulty: Difficulty) -> Vec<QuizQuestion> {
        let prompt = format!(
            "请出{QUIZ_BATCH_SIZE}道关于\"{topic_title}\"的数学选择题，难度为\"{}\"。\n\n\
             难度标准：\n\
             - 基础巩固：{}\n\
             - 能力提升：{}\n\
             - 奥数挑战：{}\n\n\
             注意：返回纯JSON格式。",
            difficulty.label(),
            Difficulty::Easy.criteria(),
            Difficulty::Medium.criteria(),
            Difficulty::Hard.criteria(),
        );

        let generation_config = GenerationConfig {
            response_mime_type: "application/json",
            response_schema: quiz_schema(),
        };

        match self.generate(vec![Content::user(prompt)], Some(generation_config)).await {
            Ok(text) => parse_quiz_batch(&text),
            Err(err) => {
                tracing::warn!(topic = topic_title, %err, "quiz fetch failed");
                Vec::new()
            }
        }
    }

    /// Send one chat turn: the prior conversation plus the new learner
    /// message, role-tagged in order.
    pub async fn chat_turn(&self, history: &[ChatMessage], message: &str) -> Result<String, ProviderError> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|m| Content {
                role: m.role.as_str(),
                parts: vec![Part { text: m.text.clone() }],
            })
            .collect();
        contents.push(Content::user(message.to_string()));

        self.generate(contents, None).await
    }

    async fn generate(
        &self,
        contents: Vec<Content>,
        generation_config: Option<GenerationConfig>,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents,
            generation_config,
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "provider rejected request");
            return Err(ProviderError::Status(status));
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Parse and validate a quiz payload. All-or-nothing: a wrong batch size or a
/// single malformed entry rejects the whole batch.
pub fn parse_quiz_batch(text: &str) -> Vec<QuizQuestion> {
    let questions: Vec<QuizQuestion> = match serde_json::from_str(text) {
        Ok(questions) => questions,
        Err(err) => {
            tracing::warn!(%err, "quiz payload is not valid JSON");
            return Vec::new();
        }
    };

    if questions.len() != QUIZ_BATCH_SIZE {
        tracing::warn!(count = questions.len(), "quiz payload has wrong batch size");
        return Vec::new();
    }
    if let Some(bad) = questions.iter().find(|q| !q.is_well_formed()) {
        tracing::warn!(id = bad.id, "quiz payload contains a malformed question");
        return Vec::new();
    }
    questions
}

/// Structured-output schema constraining the quiz payload.
fn quiz_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER" },
                "question": { "type": "STRING" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "minItems": OPTION_COUNT,
                    "maxItems": OPTION_COUNT
                },
                "correctAnswer": {
                    "type": "INTEGER",
                    "description": "The index of the correct answer (0-3)"
                },
                "explanation": {
                    "type": "STRING",
                    "description": "A fun explanation of why the answer is correct"
                }
            },
            "required": ["id", "question", "options", "correctAnswer", "explanation"]
        }
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: "user",
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}
