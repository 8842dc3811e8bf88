use crate::config::NluConfig;
use crate::dialog::RecognizedText;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

/// Single-turn natural language understanding.
#[async_trait]
pub trait TextInterpreter: Send + Sync {
    async fn recognize_text(&self, text: &str) -> Result<RecognizedText, AppError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeTextRequest<'a> {
    bot_id: &'a str,
    bot_alias_id: &'a str,
    locale_id: &'a str,
    session_id: &'a str,
    text: &'a str,
}

pub struct HttpTextInterpreter {
    client: reqwest::Client,
    url: Url,
    config: NluConfig,
}

impl HttpTextInterpreter {
    pub fn new(config: &NluConfig) -> Result<Self, AppError> {
        log::debug!("Creating NLU client for URL: {}", config.url);
        Ok(Self {
            client: reqwest::Client::new(),
            url: Url::parse(&config.url)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl TextInterpreter for HttpTextInterpreter {
    async fn recognize_text(&self, text: &str) -> Result<RecognizedText, AppError> {
        let request = RecognizeTextRequest {
            bot_id: &self.config.bot_id,
            bot_alias_id: &self.config.bot_alias_id,
            locale_id: &self.config.locale_id,
            session_id: &self.config.session_id,
            text,
        };

        let response = self.client.post(self.url.clone()).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream { service: "NLU", status: status.as_u16() });
        }

        let recognized: RecognizedText = response.json().await?;
        for message in &recognized.messages {
            log::info!("{}", message.content);
        }
        Ok(recognized)
    }
}
