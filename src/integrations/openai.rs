use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::{
    constants::{
        DEFAULT_OPENAI_MAX_TOKENS, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_TEMPERATURE,
        OPENAI_CHAT_URL, SUMMARIZE_CONTENT_LIMIT,
    },
    content::SiteConfig,
    error::ServiceError,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub summary: String,
    pub model: String,
    pub usage: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Value,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completions client configured from the site's `chatgpt` section.
pub struct Summarizer<'a> {
    client: &'a reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl<'a> Summarizer<'a> {
    /// `None` when no API key is configured in either the site config or the
    /// environment.
    pub fn from_config(
        client: &'a reqwest::Client,
        config: &SiteConfig,
        env_api_key: Option<&str>,
    ) -> Option<Self> {
        let chatgpt = config.chatgpt.clone().unwrap_or_default();
        let api_key = chatgpt
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env_api_key.map(str::to_string))?;

        Some(Self {
            client,
            api_key,
            model: chatgpt
                .model
                .filter(|model| !model.is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            max_tokens: chatgpt
                .max_tokens
                .filter(|tokens| *tokens > 0)
                .unwrap_or(DEFAULT_OPENAI_MAX_TOKENS),
            temperature: chatgpt
                .temperature
                .filter(|temperature| *temperature != 0.0)
                .unwrap_or(DEFAULT_OPENAI_TEMPERATURE),
        })
    }

    pub async fn summarize(
        &self,
        kind: &str,
        title: &str,
        content: &str,
    ) -> Result<Summary, ServiceError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(kind, title, content) }],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!("OpenAI API error ({status}): {detail}");
            return Err(ServiceError::Internal(
                "Failed to generate summary".to_string(),
            ));
        }

        let data: ChatResponse = response.json().await?;
        let summary = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ServiceError::Internal("No summary generated".to_string()))?;

        Ok(Summary {
            summary,
            model: data.model,
            usage: data.usage,
        })
    }
}

pub fn build_prompt(kind: &str, title: &str, content: &str) -> String {
    let content: String = content.chars().take(SUMMARIZE_CONTENT_LIMIT).collect();
    format!(
        "Please provide a concise summary of the following {kind} post. The summary should be 2-3 sentences and capture the main points and key takeaways. Focus on the most important information that would help someone quickly understand what the post is about.\n\nTitle: {title}\n\nContent: {content}"
    )
}

#[cfg(test)]
mod tests {
    use super::{Summarizer, build_prompt};
    use crate::content::SiteConfig;

    fn site_config(yaml: &str) -> SiteConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn prompt_names_type_and_truncates_content() {
        let content = "é".repeat(5_000);
        let prompt = build_prompt("article", "Ownership", &content);

        assert!(prompt.starts_with("Please provide a concise summary of the following article post."));
        assert!(prompt.contains("\n\nTitle: Ownership\n\n"));
        let body = prompt.split("Content: ").nth(1).unwrap();
        assert_eq!(body.chars().count(), 4_000);
    }

    #[test]
    fn settings_fall_back_to_defaults() {
        let client = reqwest::Client::new();
        let config = site_config("personal:\n  name: Jane\n");

        assert!(Summarizer::from_config(&client, &config, None).is_none());

        let summarizer = Summarizer::from_config(&client, &config, Some("sk-env")).unwrap();
        assert_eq!(summarizer.api_key, "sk-env");
        assert_eq!(summarizer.model, "gpt-3.5-turbo");
        assert_eq!(summarizer.max_tokens, 150);
        assert_eq!(summarizer.temperature, 0.7);
    }

    #[test]
    fn site_settings_take_precedence() {
        let client = reqwest::Client::new();
        let config = site_config(
            "personal:\n  name: Jane\nchatgpt:\n  apiKey: sk-site\n  model: gpt-4o-mini\n  maxTokens: 200\n",
        );

        let summarizer = Summarizer::from_config(&client, &config, Some("sk-env")).unwrap();
        assert_eq!(summarizer.api_key, "sk-site");
        assert_eq!(summarizer.model, "gpt-4o-mini");
        assert_eq!(summarizer.max_tokens, 200);
    }
}
