//! 思考日志持久化（*.jsonl）
//!
//! 只追加：每条 ThoughtRecord 一行 JSON，无头无尾。
//! 逐条写入，进程中途崩溃最多留下最后一行残缺；`load` 严格解析，`load_prefix` 容忍残缺尾行。
//! 不加锁：同一路径只允许一个写者（教师、学生各写各的文件）。

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::TransferError;
use crate::transfer::ThoughtRecord;

/// 绑定单个日志文件的存储
#[derive(Debug, Clone)]
pub struct ThoughtLogStore {
    path: PathBuf,
}

impl ThoughtLogStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 以追加模式写入若干记录（按顺序，每条一行）；父目录不存在时自动创建
    pub async fn append(&self, records: &[ThoughtRecord]) -> Result<(), TransferError> {
        if records.is_empty() {
            return Ok(());
        }
        self.append_inner(records).await.map_err(|e| TransferError::WriteFailure {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "thought log appended");
        Ok(())
    }

    async fn append_inner(&self, records: &[ThoughtRecord]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        for record in records {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');
            file.write_all(line.as_bytes()).await?;
        }
        file.flush().await
    }

    /// 读取全部记录：文件不存在为 LogUnavailable；空文件返回空 Vec；任何一行解码或解析失败即 LogCorrupt
    pub async fn load(&self) -> Result<Vec<ThoughtRecord>, TransferError> {
        let data = self.read().await?;
        let mut records = Vec::new();
        for (idx, line) in split_lines(&data).into_iter().enumerate() {
            records.push(self.parse_line(idx, line)?);
        }
        Ok(records)
    }

    /// 读取可用前缀：仅当最后一行缺少换行符（写入中途中断）且无法解析时忽略它，其余同 `load`
    pub async fn load_prefix(&self) -> Result<Vec<ThoughtRecord>, TransferError> {
        let data = self.read().await?;
        let terminated = data.ends_with(b"\n");
        let lines = split_lines(&data);
        let mut records = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            match self.parse_line(idx, line) {
                Ok(r) => records.push(r),
                Err(_) if !terminated && idx + 1 == lines.len() => {
                    tracing::warn!(path = %self.path.display(), line = idx + 1, "ignoring partial trailing record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// 按字节读取，UTF-8 解码留到逐行解析，坏字节按 LogCorrupt 报告并带行号
    async fn read(&self) -> Result<Vec<u8>, TransferError> {
        fs::read(&self.path).await.map_err(|e| {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "thought log unreadable");
            }
            TransferError::LogUnavailable(self.path.clone())
        })
    }

    fn parse_line(&self, idx: usize, line: &[u8]) -> Result<ThoughtRecord, TransferError> {
        let corrupt = |reason: String| TransferError::LogCorrupt {
            path: self.path.clone(),
            line: idx + 1,
            reason,
        };
        let text = std::str::from_utf8(line).map_err(|e| corrupt(format!("invalid UTF-8: {e}")))?;
        serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))
    }
}

/// 按 `\n` 切分，去掉行尾 `\r`；末尾换行不产生空行
fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    let body = data.strip_suffix(b"\n").unwrap_or(data);
    if body.is_empty() {
        return Vec::new();
    }
    body.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::ContextFormatter;
    use tempfile::TempDir;

    fn sample() -> Vec<ThoughtRecord> {
        vec![
            ThoughtRecord::new("A", "", "", "go"),
            ThoughtRecord::new("B", "ok", "m", "stop"),
        ]
    }

    #[tokio::test]
    async fn test_load_missing_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("missing.jsonl"));
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, TransferError::LogUnavailable(_)));
    }

    #[tokio::test]
    async fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.jsonl");
        fs::write(&path, "").await.unwrap();
        let store = ThoughtLogStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_order_across_calls() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("nested/log.jsonl"));
        let records = sample();
        store.append(&records[..1]).await.unwrap();
        store.append(&records[1..]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_unicode_and_escapes_survive() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("log.jsonl"));
        let records = vec![ThoughtRecord::new(
            "花的第一行 🌸",
            "line1\nline2\t\"quoted\"",
            "back\\slash",
            "ünïcödé \u{2028} end",
        )];
        store.append(&records).await.unwrap();
        let content = fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(content.lines().count(), 1);
        assert_eq!(store.load().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_malformed_line_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");
        fs::write(
            &path,
            "{\"thinking\":\"A\",\"evaluation_previous_goal\":\"\",\"memory\":\"\",\"next_goal\":\"go\"}\nnot json\n",
        )
        .await
        .unwrap();
        let err = ThoughtLogStore::new(&path).load().await.unwrap_err();
        match err {
            TransferError::LogCorrupt { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected LogCorrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_prefix_skips_partial_tail_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");
        let store = ThoughtLogStore::new(&path);
        store.append(&sample()).await.unwrap();

        let mut file = fs::OpenOptions::new().append(true).open(&path).await.unwrap();
        file.write_all(b"{\"thinking\":\"C\",\"evalu").await.unwrap();
        file.flush().await.unwrap();

        assert!(matches!(
            store.load().await,
            Err(TransferError::LogCorrupt { line: 3, .. })
        ));
        assert_eq!(store.load_prefix().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_corrupt_not_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");
        let mut bytes = b"{\"thinking\":\"A\",\"evaluation_previous_goal\":\"\",\"memory\":\"\",\"next_goal\":\"go\"}\n".to_vec();
        bytes.extend_from_slice(b"{\"thinking\":\"\xff\xfe\"}\n");
        fs::write(&path, &bytes).await.unwrap();

        let store = ThoughtLogStore::new(&path);
        match store.load().await.unwrap_err() {
            TransferError::LogCorrupt { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("Expected LogCorrupt, got {other:?}"),
        }
        // 坏字节所在行已换行结束，不属于残缺尾行
        assert!(matches!(
            store.load_prefix().await,
            Err(TransferError::LogCorrupt { line: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_crlf_lines_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");
        fs::write(
            &path,
            "{\"thinking\":\"A\",\"evaluation_previous_goal\":\"\",\"memory\":\"\",\"next_goal\":\"go\"}\r\n",
        )
        .await
        .unwrap();
        let records = ThoughtLogStore::new(&path).load().await.unwrap();
        assert_eq!(records, vec![ThoughtRecord::new("A", "", "", "go")]);
    }

    #[tokio::test]
    async fn test_guidance_keeps_unicode_fields_verbatim() {
        let dir = TempDir::new().unwrap();
        let store = ThoughtLogStore::new(dir.path().join("log.jsonl"));
        let records = vec![
            ThoughtRecord::new("花的第一行 🌸", "line1\nline2\t\"quoted\"", "back\\slash", "ünïcödé \u{2028} end"),
            ThoughtRecord::new("Ελληνικά", "✓ done", "{\"json\": [1, 2]}", "日本語で答える"),
        ];
        store.append(&records).await.unwrap();

        let text = ContextFormatter::new().format(&store.load().await.unwrap(), None);
        for (i, r) in records.iter().enumerate() {
            assert!(text.contains(&format!("Step {i}:\nThinking: {}\n", r.thinking())));
            assert!(text.contains(&format!("Evaluation: {}\n", r.evaluation_previous_goal())));
            assert!(text.contains(&format!("Memory: {}\n", r.memory())));
            assert!(text.contains(&format!("Next Goal: {}\n", r.next_goal())));
        }
    }
}
