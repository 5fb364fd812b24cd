#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use aerodesk_agent::llm::{ChatMessage, EmbeddingClient, LlmClient};
use aerodesk_agent::policy::PolicyIndex;
use aerodesk_agent::prompts::PromptRenderer;
use aerodesk_agent::search::{SearchHit, WebSearch};
use aerodesk_agent::{AgentRuntime, Assistant, GuardrailPolicy, ToolExecutor};
use aerodesk_core::flows::{DialogGraph, GraphLayout};
use aerodesk_db::repositories::{
    InMemoryCheckpointStore, SqlCarRentalRepository, SqlExcursionRepository, SqlFlightRepository,
    SqlHotelRepository, SqlPolicyRepository,
};
use aerodesk_db::{connect_with_settings, migrations, DbPool, TravelSeedDataset};

pub const PASSENGER: &str = "3442 587242";
pub const OTHER_PASSENGER: &str = "8149 604011";

pub async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    TravelSeedDataset::load(&pool).await.expect("seed");
    pool
}

/// Replays canned model outputs and records every transcript it was sent.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
            transcripts: Mutex::default(),
        })
    }

    pub fn push(&self, reply: &str) {
        self.replies.lock().expect("lock").push_back(reply.to_string());
    }

    pub fn invocations(&self) -> usize {
        self.transcripts.lock().expect("lock").len()
    }

    pub fn last_transcript(&self) -> Vec<ChatMessage> {
        self.transcripts.lock().expect("lock").last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.transcripts.lock().expect("lock").push(messages.to_vec());
        Ok(self.replies.lock().expect("lock").pop_front().unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Bag-of-words over a fixed vocabulary; enough to rank the seeded policies.
pub struct VocabularyEmbeddings;

const VOCABULARY: [&str; 6] = ["rebook", "cancel", "invoice", "baggage", "bag", "rental"];

#[async_trait]
impl EmbeddingClient for VocabularyEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                VOCABULARY.iter().map(|word| text.matches(word).count() as f32).collect()
            })
            .collect())
    }
}

pub struct CannedSearch;

#[async_trait]
impl WebSearch for CannedSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        Ok(vec![SearchHit {
            url: "https://example.org/basel".to_string(),
            content: format!("results for {query}"),
        }])
    }
}

pub fn executor(pool: &DbPool) -> ToolExecutor {
    ToolExecutor::new(
        Arc::new(SqlFlightRepository::new(pool.clone())),
        Arc::new(SqlCarRentalRepository::new(pool.clone())),
        Arc::new(SqlHotelRepository::new(pool.clone())),
        Arc::new(SqlExcursionRepository::new(pool.clone())),
        PolicyIndex::new(
            Arc::new(SqlPolicyRepository::new(pool.clone())),
            Arc::new(VocabularyEmbeddings),
        ),
        Arc::new(CannedSearch),
    )
}

pub fn runtime(
    pool: &DbPool,
    model: Arc<ScriptedModel>,
    layout: GraphLayout,
    max_steps: u32,
) -> AgentRuntime {
    let assistant = Assistant::new(
        model,
        PromptRenderer::new().expect("templates"),
        DialogGraph::new(layout),
        3,
    );
    AgentRuntime::new(
        assistant,
        executor(pool),
        Arc::new(InMemoryCheckpointStore::default()),
        GuardrailPolicy::default(),
        max_steps,
    )
}
