//! Remote responder over the Gemini `generateContent` API
//!
//! The collaborator contract is deliberately soft: whatever goes wrong on
//! the wire, `generate` hands back a speakable apology instead of an error,
//! so a network hiccup costs one turn, not the conversation.

use serde_json::json;

use crate::config::ResponderConfig;
use crate::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Spoken when no credential is configured
const APOLOGY_NO_KEY: &str =
    "Xin lỗi, tôi không thể kết nối với dịch vụ AI. Vui lòng kiểm tra cài đặt API key.";

/// Spoken when the service call fails
const APOLOGY_SERVICE: &str =
    "Xin lỗi, có lỗi xảy ra khi kết nối với dịch vụ AI. Vui lòng thử lại sau.";

/// Spoken when the service returns an empty reply
const APOLOGY_EMPTY: &str = "Tôi không thể tạo ra phản hồi lúc này. Vui lòng thử lại sau.";

/// Generates short spoken replies to user utterances
pub struct Responder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl Responder {
    /// Create a responder
    ///
    /// `api_key` may be absent — every `generate` call then returns the
    /// credential apology. The HTTP client carries an explicit request
    /// timeout so a stalled service cannot hang a turn indefinitely.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(api_key: Option<String>, config: &ResponderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Responder(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
        })
    }

    /// Generate a reply for a user utterance
    ///
    /// Always returns speakable text; transport and service failures are
    /// logged and replaced by an apology string.
    pub async fn generate(&self, utterance: &str) -> String {
        let Some(api_key) = &self.api_key else {
            tracing::error!("no responder credential configured");
            return APOLOGY_NO_KEY.to_string();
        };

        match self.request(api_key, utterance).await {
            Ok(reply) if reply.trim().is_empty() => {
                tracing::warn!("responder returned an empty reply");
                APOLOGY_EMPTY.to_string()
            }
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "responder call failed");
                APOLOGY_SERVICE.to_string()
            }
        }
    }

    /// One `generateContent` call
    async fn request(&self, api_key: &str, utterance: &str) -> Result<String> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(utterance) }],
            }],
            "generationConfig": {
                "responseMimeType": "text/plain",
            },
        });

        let url = format!(
            "{API_BASE}/models/{}:generateContent?key={api_key}",
            urlencoding::encode(&self.model)
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Responder(format!("HTTP {status}: {text}")));
        }

        let parsed: serde_json::Value = response.json().await?;

        let reply = parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(reply)
    }
}

/// Prompt asking for a short, friendly Vietnamese reply
fn build_prompt(utterance: &str) -> String {
    format!(
        "Người dùng nói bằng tiếng Việt: \"{utterance}\". \n\
         Hãy trả lời ngắn gọn, thân thiện và tự nhiên bằng tiếng Việt. \n\
         Giữ câu trả lời dưới 50 từ."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn prompt_embeds_the_utterance() {
        let prompt = build_prompt("hôm nay trời thế nào?");
        assert!(prompt.contains("\"hôm nay trời thế nào?\""));
        assert!(prompt.contains("dưới 50 từ"));
    }

    #[tokio::test]
    async fn missing_credential_yields_apology() {
        let config = ResponderConfig {
            model: "gemini-2.5-pro-exp-03-25".to_string(),
            timeout: Duration::from_secs(30),
        };
        let responder = Responder::new(None, &config).unwrap();

        let reply = responder.generate("xin chào").await;
        assert_eq!(reply, APOLOGY_NO_KEY);
    }
}
