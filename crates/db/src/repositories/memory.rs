use std::collections::HashMap;

use tokio::sync::RwLock;

use aerodesk_core::domain::policy::PolicySection;
use aerodesk_core::domain::session::{SessionId, SessionSnapshot};

use super::{CheckpointStore, PolicyRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    snapshots: RwLock<HashMap<String, SessionSnapshot>>,
}

#[async_trait::async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>, RepositoryError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(session_id.as_str()).cloned())
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), RepositoryError> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.session_id.0.clone(), snapshot.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, RepositoryError> {
        let mut snapshots = self.snapshots.write().await;
        Ok(snapshots.remove(session_id.as_str()).is_some())
    }
}

pub struct InMemoryPolicyRepository {
    sections: RwLock<Vec<PolicySection>>,
}

impl InMemoryPolicyRepository {
    pub fn new(sections: Vec<PolicySection>) -> Self {
        Self { sections: RwLock::new(sections) }
    }
}

#[async_trait::async_trait]
impl PolicyRepository for InMemoryPolicyRepository {
    async fn list_sections(&self) -> Result<Vec<PolicySection>, RepositoryError> {
        Ok(self.sections.read().await.clone())
    }

    async fn store_embedding(&self, id: i64, embedding: &[f32]) -> Result<(), RepositoryError> {
        let mut sections = self.sections.write().await;
        if let Some(section) = sections.iter_mut().find(|section| section.id == id) {
            section.embedding = Some(embedding.to_vec());
        }
        Ok(())
    }
}
