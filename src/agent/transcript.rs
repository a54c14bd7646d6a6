//! 对话记录（*.jsonl）
//!
//! 每次运行一个文件，文件名含会话 ID，并发运行不会互相覆盖。
//! 每行：{"step", "role", "content", "at"}。写入失败只告警，不影响运行。

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::SessionId;
use crate::llm::{Message, Role};

#[derive(Serialize)]
struct TranscriptLine<'a> {
    step: usize,
    role: Role,
    content: &'a str,
    at: String,
}

/// `{dir}/{label}_{session_id}.jsonl`
pub fn transcript_path(dir: &Path, label: &str, session_id: &SessionId) -> PathBuf {
    dir.join(format!("{}_{}.jsonl", label, session_id))
}

#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    path: PathBuf,
}

impl TranscriptWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, step: usize, messages: &[Message]) {
        if let Err(e) = self.append(step, messages).await {
            tracing::warn!(path = %self.path.display(), error = %e, "transcript write failed");
        }
    }

    async fn append(&self, step: usize, messages: &[Message]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let at = chrono::Local::now().to_rfc3339();
        let mut buf = String::new();
        for m in messages {
            let line = TranscriptLine {
                step,
                role: m.role,
                content: &m.content,
                at: at.clone(),
            };
            buf.push_str(&serde_json::to_string(&line)?);
            buf.push('\n');
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_contains_session() {
        let id = SessionId::from("session_abc");
        let p = transcript_path(Path::new("transcripts"), "student_prepend", &id);
        assert_eq!(p, PathBuf::from("transcripts/student_prepend_session_abc.jsonl"));
    }

    #[tokio::test]
    async fn test_record_appends_lines() {
        let dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(dir.path().join("t/run.jsonl"));
        writer
            .record(0, &[Message::system("sys"), Message::user("task")])
            .await;
        writer.record(0, &[Message::assistant("{}")]).await;
        let content = fs::read_to_string(writer.path()).await.unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["role"], "system");
        assert_eq!(lines[2]["role"], "assistant");
        assert_eq!(lines[2]["step"], 0);
    }
}
