//! consult_teacher：读取教师推理日志并格式化为引导文本

use async_trait::async_trait;

use crate::core::TransferError;
use crate::tools::{Action, ActionCall, ActionResult};
use crate::transfer::{ContextFormatter, ThoughtLogStore};

pub const CONSULT_TEACHER: &str = "consult_teacher";

/// 日志缺失时的固定结果
pub const GUIDANCE_UNAVAILABLE: &str = "The teacher's guidance is not available.";

pub struct ConsultTeacherAction {
    store: ThoughtLogStore,
    formatter: ContextFormatter,
    limit: Option<usize>,
}

impl ConsultTeacherAction {
    pub fn new(store: ThoughtLogStore) -> Self {
        Self {
            store,
            formatter: ContextFormatter::new(),
            limit: None,
        }
    }

    /// 只取前 limit 条；默认全部
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl Action for ConsultTeacherAction {
    fn name(&self) -> &str {
        CONSULT_TEACHER
    }

    fn description(&self) -> &str {
        "Read how a smarter teacher agent reasoned through a similar task. Use it when you are unsure how to proceed. Args: {}"
    }

    async fn execute(&self, _call: ActionCall) -> ActionResult {
        match self.store.load().await {
            Ok(records) => {
                tracing::info!(records = records.len(), "teacher guidance consulted");
                ActionResult::remembered(self.formatter.format(&records, self.limit))
            }
            Err(TransferError::LogUnavailable(path)) => {
                tracing::warn!(path = %path.display(), "teacher log unavailable");
                ActionResult::remembered(GUIDANCE_UNAVAILABLE)
            }
            Err(e) => {
                tracing::warn!(error = %e, "teacher log unreadable");
                ActionResult::failure(format!("The teacher's guidance could not be read: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::ThoughtRecord;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_log_is_fixed_result() {
        let dir = TempDir::new().unwrap();
        let action = ConsultTeacherAction::new(ThoughtLogStore::new(dir.path().join("none.jsonl")));
        let result = action.execute(ActionCall::default()).await;
        assert_eq!(result.text, GUIDANCE_UNAVAILABLE);
        assert!(result.remember);
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_formats_all_records() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("thoughts_log.jsonl"));
        let records = vec![
            ThoughtRecord::new("open wikipedia", "", "", "search flower"),
            ThoughtRecord::new("read intro", "ok", "on article", "done"),
        ];
        store.append(&records).await.unwrap();

        let result = ConsultTeacherAction::new(store)
            .execute(ActionCall::default())
            .await;
        assert!(result.remember);
        assert_eq!(result.text, ContextFormatter::new().format(&records, None));
        assert!(result.text.contains("Step 1:\nThinking: read intro"));
    }

    #[tokio::test]
    async fn test_limit_applies() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("thoughts_log.jsonl"));
        store
            .append(&[ThoughtRecord::new("a", "", "", ""), ThoughtRecord::new("b", "", "", "")])
            .await
            .unwrap();
        let result = ConsultTeacherAction::new(store)
            .with_limit(Some(1))
            .execute(ActionCall::default())
            .await;
        assert!(result.text.contains("Thinking: a"));
        assert!(!result.text.contains("Thinking: b"));
    }

    #[tokio::test]
    async fn test_corrupt_log_is_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thoughts_log.jsonl");
        tokio::fs::write(&path, "not json\n").await.unwrap();
        let result = ConsultTeacherAction::new(ThoughtLogStore::new(path))
            .execute(ActionCall::default())
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("thoughts_log.jsonl:1:"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_log_is_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thoughts_log.jsonl");
        tokio::fs::write(&path, b"{\"thinking\":\"\xff\xfe\"}\n").await.unwrap();
        let result = ConsultTeacherAction::new(ThoughtLogStore::new(path))
            .execute(ActionCall::default())
            .await;
        assert!(result.is_error);
        assert_ne!(result.text, GUIDANCE_UNAVAILABLE);
        assert!(result.text.contains("thoughts_log.jsonl:1:"));
        assert!(result.text.contains("UTF-8"));
    }
}
