use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use aerodesk_core::domain::policy::{cosine_similarity, PolicySection};
use aerodesk_db::repositories::PolicyRepository;

use crate::llm::EmbeddingClient;

/// Semantic lookup over the policy handbook. Sections stored without an
/// embedding are embedded on first use and written back.
pub struct PolicyIndex {
    repository: Arc<dyn PolicyRepository>,
    embeddings: Arc<dyn EmbeddingClient>,
    top_k: usize,
}

impl PolicyIndex {
    pub const DEFAULT_TOP_K: usize = 2;

    pub fn new(repository: Arc<dyn PolicyRepository>, embeddings: Arc<dyn EmbeddingClient>) -> Self {
        Self { repository, embeddings, top_k: Self::DEFAULT_TOP_K }
    }

    pub async fn lookup(&self, query: &str) -> Result<Vec<PolicySection>> {
        let mut sections = self.repository.list_sections().await?;
        self.embed_missing(&mut sections).await?;

        let query_vector = self
            .embeddings
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .context("embedding client returned no vector for the query")?;

        let mut scored = sections
            .into_iter()
            .filter_map(|section| {
                let score = cosine_similarity(section.embedding.as_deref()?, &query_vector);
                Some((score, section))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored.into_iter().take(self.top_k).map(|(_, section)| section).collect())
    }

    async fn embed_missing(&self, sections: &mut [PolicySection]) -> Result<()> {
        let missing = sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.embedding.is_none())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return Ok(());
        }

        let texts = missing
            .iter()
            .map(|&index| format!("{}\n{}", sections[index].title, sections[index].content))
            .collect::<Vec<_>>();
        let vectors = self.embeddings.embed(&texts).await?;
        if vectors.len() != texts.len() {
            bail!(
                "embedding client returned {} vectors for {} policy sections",
                vectors.len(),
                texts.len()
            );
        }

        for (index, vector) in missing.into_iter().zip(vectors) {
            self.repository.store_embedding(sections[index].id, &vector).await?;
            sections[index].embedding = Some(vector);
        }
        info!(event_name = "policy.embedded", sections = texts.len(), "policy sections embedded");
        Ok(())
    }
}

pub fn render_sections(sections: &[PolicySection]) -> String {
    sections
        .iter()
        .map(|section| format!("## {}\n\n{}", section.title, section.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
