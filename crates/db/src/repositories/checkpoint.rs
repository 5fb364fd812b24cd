use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use aerodesk_core::domain::conversation::ConversationState;
use aerodesk_core::domain::session::{SessionId, SessionSnapshot};
use aerodesk_core::domain::time::parse_timestamp;
use aerodesk_core::flows::Node;

use super::{decode_error, CheckpointStore, RepositoryError};
use crate::DbPool;

/// Keeps one row per session: the latest conversation state plus the node
/// waiting on approval, if any.
pub struct SqlCheckpointStore {
    pool: DbPool,
}

impl SqlCheckpointStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CheckpointStore for SqlCheckpointStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>, RepositoryError> {
        let row = sqlx::query(
            "SELECT state_json, pending_json, updated_at
             FROM session_checkpoints WHERE session_id = ?",
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: String = row.try_get("state_json").map_err(decode_error)?;
        let pending_json: Option<String> = row.try_get("pending_json").map_err(decode_error)?;
        let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

        let state: ConversationState = serde_json::from_str(&state_json).map_err(decode_error)?;
        let pending = pending_json
            .map(|raw| serde_json::from_str::<Node>(&raw).map_err(decode_error))
            .transpose()?;

        Ok(Some(SessionSnapshot {
            session_id: session_id.clone(),
            state,
            pending,
            updated_at: parse_timestamp(&updated_at).map_err(decode_error)?,
        }))
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), RepositoryError> {
        let state_json = serde_json::to_string(&snapshot.state).map_err(decode_error)?;
        let pending_json = snapshot
            .pending
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO session_checkpoints (session_id, state_json, pending_json, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                 state_json = excluded.state_json,
                 pending_json = excluded.pending_json,
                 updated_at = excluded.updated_at",
        )
        .bind(snapshot.session_id.as_str())
        .bind(state_json)
        .bind(pending_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            event_name = "checkpoint.saved",
            session_id = %snapshot.session_id,
            messages = snapshot.state.messages.len(),
            interrupted = snapshot.is_interrupted(),
            "session checkpoint saved"
        );
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM session_checkpoints WHERE session_id = ?")
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use aerodesk_core::domain::conversation::{Message, ToolCall};
    use aerodesk_core::domain::session::{SessionId, SessionSnapshot};
    use aerodesk_core::domain::tool::ToolId;
    use aerodesk_core::flows::{AssistantId, Node, Skill, StackTransition};

    use super::SqlCheckpointStore;
    use crate::repositories::CheckpointStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlCheckpointStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlCheckpointStore::new(pool)
    }

    fn interrupted_snapshot(id: &str) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::empty(SessionId(id.to_string()));
        snapshot.state.push(Message::user("book the Hilton please"));
        snapshot.state.dialog_stack.apply(StackTransition::Push(Skill::BookHotel));
        snapshot.state.push(Message::assistant_with_call(
            "booking",
            ToolCall::new(ToolId::BookHotel, json!({"hotel_id": 1})),
        ));
        snapshot.pending = Some(Node::SensitiveTools(AssistantId::Skill(Skill::BookHotel)));
        snapshot
    }

    #[tokio::test]
    async fn missing_session_loads_as_none() {
        let store = store().await;
        assert!(store.load(&SessionId("nope".to_string())).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn save_then_load_preserves_stack_and_pending_node() {
        let store = store().await;
        let snapshot = interrupted_snapshot("s-42");
        store.save(&snapshot).await.expect("save");

        let loaded = store.load(&snapshot.session_id).await.expect("load").expect("snapshot");
        assert_eq!(loaded.state, snapshot.state);
        assert_eq!(loaded.pending, snapshot.pending);
        assert_eq!(loaded.state.dialog_stack.current(), Some(Skill::BookHotel));
        assert_eq!(loaded.pending_calls().len(), 1);
    }

    #[tokio::test]
    async fn save_overwrites_and_delete_reports_existence() {
        let store = store().await;
        let mut snapshot = interrupted_snapshot("s-7");
        store.save(&snapshot).await.expect("first save");

        snapshot.pending = None;
        snapshot.state.push(Message::assistant("Your hotel is booked."));
        store.save(&snapshot).await.expect("second save");

        let loaded = store.load(&snapshot.session_id).await.expect("load").expect("snapshot");
        assert!(!loaded.is_interrupted());
        assert_eq!(loaded.state.messages.len(), 3);

        assert!(store.delete(&snapshot.session_id).await.expect("delete"));
        assert!(!store.delete(&snapshot.session_id).await.expect("second delete"));
    }
}
