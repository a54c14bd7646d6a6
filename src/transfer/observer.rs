//! 步骤观察者
//!
//! 每步结束后由 Agent 运行时调用：读取完整的 model_thoughts，只把游标之后的新记录追加进日志。
//! 写入失败不推进游标，下一步会重试同一段（至少一次写入，可能重复，由下游按位置与内容去重）。

use async_trait::async_trait;

use crate::agent::{AgentHistory, StepHook};
use crate::core::TransferError;
use crate::transfer::{ThoughtLogStore, ThoughtRecord};

/// 已写入日志的记录数；只增不减
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCursor(usize);

impl StepCursor {
    pub fn position(&self) -> usize {
        self.0
    }

    fn advance(&mut self, by: usize) {
        self.0 += by;
    }
}

/// 绑定一个日志文件的观察者；每次运行新建一个，游标不跨运行共享
#[derive(Debug)]
pub struct StepObserver {
    store: ThoughtLogStore,
    cursor: StepCursor,
}

impl StepObserver {
    pub fn new(store: ThoughtLogStore) -> Self {
        Self {
            store,
            cursor: StepCursor::default(),
        }
    }

    pub fn cursor(&self) -> StepCursor {
        self.cursor
    }

    pub fn store(&self) -> &ThoughtLogStore {
        &self.store
    }

    /// 追加游标之后的记录，返回本次写入条数（无新记录时为 0）
    pub async fn observe(&mut self, thoughts: &[ThoughtRecord]) -> Result<usize, TransferError> {
        let Some(pending) = thoughts.get(self.cursor.position()..) else {
            tracing::warn!(
                cursor = self.cursor.position(),
                history = thoughts.len(),
                "history shorter than cursor, skipping"
            );
            return Ok(0);
        };
        if pending.is_empty() {
            return Ok(0);
        }
        self.store.append(pending).await?;
        self.cursor.advance(pending.len());
        tracing::debug!(
            path = %self.store.path().display(),
            written = pending.len(),
            cursor = self.cursor.position(),
            "thoughts persisted"
        );
        Ok(pending.len())
    }
}

#[async_trait]
impl StepHook for StepObserver {
    async fn on_step_end(&mut self, history: &AgentHistory) -> Result<(), TransferError> {
        self.observe(history.model_thoughts()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn thought(i: usize) -> ThoughtRecord {
        ThoughtRecord::new(format!("t{i}"), "", "", format!("g{i}"))
    }

    #[tokio::test]
    async fn test_incremental_and_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("log.jsonl"));
        let mut observer = StepObserver::new(store.clone());

        let mut history: Vec<ThoughtRecord> = Vec::new();
        for i in 0..3 {
            history.push(thought(i));
            assert_eq!(observer.observe(&history).await.unwrap(), 1);
            // 同一长度重复调用不产生新行
            assert_eq!(observer.observe(&history).await.unwrap(), 0);
        }
        assert_eq!(observer.cursor().position(), 3);
        assert_eq!(store.load().await.unwrap(), history);
    }

    #[tokio::test]
    async fn test_batch_of_several_steps() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("log.jsonl"));
        let mut observer = StepObserver::new(store.clone());
        let history: Vec<ThoughtRecord> = (0..4).map(thought).collect();
        assert_eq!(observer.observe(&history[..1]).await.unwrap(), 1);
        assert_eq!(observer.observe(&history).await.unwrap(), 3);
        assert_eq!(store.load().await.unwrap(), history);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_cursor() {
        let dir = TempDir::new().unwrap();
        // 路径是一个目录，追加必然失败
        let blocked = dir.path().join("blocked");
        std::fs::create_dir_all(&blocked).unwrap();
        let mut observer = StepObserver::new(ThoughtLogStore::new(&blocked));

        let history = vec![thought(0)];
        let err = observer.observe(&history).await.unwrap_err();
        assert!(matches!(err, TransferError::WriteFailure { .. }));
        assert_eq!(observer.cursor().position(), 0);

        // 恢复为可写路径后重试同一段
        observer.store = ThoughtLogStore::new(dir.path().join("log.jsonl"));
        assert_eq!(observer.observe(&history).await.unwrap(), 1);
        assert_eq!(observer.cursor().position(), 1);
    }
}
