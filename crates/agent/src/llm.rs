//! Model and embedding collaborators.
//!
//! The assistants never use provider-native function calling: the model is
//! asked for a JSON blob and the reply text is parsed locally. That keeps
//! every provider down to "send messages, get text back".

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use aerodesk_core::config::{LlmConfig, LlmProvider};
use aerodesk_core::domain::conversation::{Message, Role};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const COHERE_BASE_URL: &str = "https://api.cohere.com/v2";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }
}

/// Builds the request transcript: the rendered system prompt followed by the
/// conversation. Tool results go back to the model as user turns.
pub fn to_chat_messages(system_prompt: &str, messages: &[Message]) -> Vec<ChatMessage> {
    let mut transcript = Vec::with_capacity(messages.len() + 1);
    transcript.push(ChatMessage::system(system_prompt));
    for message in messages {
        let chat = match message.role {
            Role::User => ChatMessage { role: "user", content: message.content.clone() },
            Role::Assistant => ChatMessage { role: "assistant", content: message.content.clone() },
            Role::Tool => {
                ChatMessage { role: "user", content: format!("TOOL RESULT:\n{}", message.content) }
            }
        };
        transcript.push(chat);
    }
    transcript
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    fn model_name(&self) -> &str;
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .context("failed to build http client")
}

/// Chat completions and embeddings over the OpenAI wire format. Ollama serves
/// the same API under `/v1`.
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    embedding_model: String,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = match (config.provider, config.base_url.as_deref()) {
            (LlmProvider::Ollama, Some(url)) => format!("{}/v1", url.trim_end_matches('/')),
            (LlmProvider::Ollama, None) => bail!("ollama requires llm.base_url"),
            (_, Some(url)) => url.trim_end_matches('/').to_string(),
            (_, None) => OPENAI_BASE_URL.to_string(),
        };

        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(format!("{}/{path}", self.base_url));
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: Content,
        }

        #[derive(Deserialize)]
        struct Content {
            #[serde(default)]
            content: Option<String>,
        }

        let response = self
            .post("chat/completions")
            .json(&Request { model: &self.model, messages, temperature: 0.0 })
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat completion returned {status}: {body}");
        }

        let parsed: Response = response.json().await.context("invalid chat completion body")?;
        debug!(event_name = "llm.completed", model = %self.model, "chat completion received");
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiCompatibleClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct Response {
            data: Vec<Data>,
        }

        #[derive(Deserialize)]
        struct Data {
            embedding: Vec<f32>,
        }

        let response = self
            .post("embeddings")
            .json(&Request { model: &self.embedding_model, input: texts })
            .send()
            .await
            .context("embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("embedding endpoint returned {status}: {body}");
        }

        let parsed: Response = response.json().await.context("invalid embedding body")?;
        let vectors = parsed.data.into_iter().map(|data| data.embedding).collect::<Vec<_>>();
        if vectors.len() != texts.len() {
            bail!("expected {} embeddings, got {}", texts.len(), vectors.len());
        }
        Ok(vectors)
    }
}

/// Cohere v2 `chat` and `embed`.
pub struct CohereClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    embedding_model: String,
}

impl CohereClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key =
            config.api_key.clone().ok_or_else(|| anyhow!("cohere requires llm.api_key"))?;
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| COHERE_BASE_URL.to_string());

        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url,
            api_key,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for CohereClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            #[serde(default)]
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(default)]
            text: Option<String>,
        }

        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&Request { model: &self.model, messages, temperature: 0.0 })
            .send()
            .await
            .context("cohere chat request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("cohere chat returned {status}: {body}");
        }

        let parsed: Response = response.json().await.context("invalid cohere chat body")?;
        Ok(parsed.message.content.into_iter().filter_map(|block| block.text).collect::<String>())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingClient for CohereClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            texts: &'a [String],
            input_type: &'static str,
            embedding_types: [&'static str; 1],
        }

        #[derive(Deserialize)]
        struct Response {
            embeddings: Embeddings,
        }

        #[derive(Deserialize)]
        struct Embeddings {
            float: Vec<Vec<f32>>,
        }

        let response = self
            .http
            .post(format!("{}/embed", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&Request {
                model: &self.embedding_model,
                texts,
                input_type: "search_document",
                embedding_types: ["float"],
            })
            .send()
            .await
            .context("cohere embed request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("cohere embed returned {status}: {body}");
        }

        let parsed: Response = response.json().await.context("invalid cohere embed body")?;
        Ok(parsed.embeddings.float)
    }
}

pub struct ModelClients {
    pub chat: Arc<dyn LlmClient>,
    pub embeddings: Arc<dyn EmbeddingClient>,
}

pub fn build_clients(config: &LlmConfig) -> Result<ModelClients> {
    match config.provider {
        LlmProvider::OpenAi | LlmProvider::Ollama => {
            let client = Arc::new(OpenAiCompatibleClient::from_config(config)?);
            Ok(ModelClients { chat: client.clone(), embeddings: client })
        }
        LlmProvider::Cohere => {
            let client = Arc::new(CohereClient::from_config(config)?);
            Ok(ModelClients { chat: client.clone(), embeddings: client })
        }
    }
}

#[cfg(test)]
mod tests {
    use aerodesk_core::config::{LlmConfig, LlmProvider};
    use aerodesk_core::domain::conversation::Message;

    use super::{to_chat_messages, OpenAiCompatibleClient};

    fn config(provider: LlmProvider, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: None,
            base_url: base_url.map(str::to_string),
            model: "llama3.1".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn transcript_starts_with_system_prompt_and_wraps_tool_results() {
        let transcript = to_chat_messages(
            "be helpful",
            &[Message::user("hi"), Message::tool_result("call-1", "Hotel 1 successfully booked.")],
        );

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].role, "system");
        assert_eq!(transcript[1].role, "user");
        assert_eq!(transcript[2].content, "TOOL RESULT:\nHotel 1 successfully booked.");
    }

    #[test]
    fn ollama_base_url_gets_openai_prefix() {
        let client =
            OpenAiCompatibleClient::from_config(&config(LlmProvider::Ollama, Some("http://h:11434/")))
                .expect("client");
        assert_eq!(client.base_url, "http://h:11434/v1");

        let openai = OpenAiCompatibleClient::from_config(&config(LlmProvider::OpenAi, None))
            .expect("client");
        assert_eq!(openai.base_url, "https://api.openai.com/v1");
    }
}
