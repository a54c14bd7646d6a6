//! 运行身份：TaskContext 与升级动作的上下文引用
//!
//! TaskContext 记录原始任务与会话 ID，用于把 "spawn better agent" 请求关联回发起它的运行。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 会话 ID（每次运行唯一）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(format!("session_{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 单次运行的任务身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    /// 工作副本，可追加额外指令
    task: String,
    /// 最初下发的任务，不可变
    original_task: String,
    session_id: SessionId,
}

impl TaskContext {
    /// 新建上下文，自动生成会话 ID
    pub fn create(task: impl Into<String>) -> Self {
        Self::with_session_id(task, SessionId::generate())
    }

    pub fn with_session_id(task: impl Into<String>, session_id: SessionId) -> Self {
        let task = task.into();
        Self {
            original_task: task.clone(),
            task,
            session_id,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn original_task(&self) -> &str {
        &self.original_task
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// 在工作副本后追加指令；original_task 不变
    pub fn decorate(&mut self, instructions: &str) {
        let instructions = instructions.trim();
        if instructions.is_empty() {
            return;
        }
        self.task = format!("{} {}", self.task.trim_end(), instructions);
    }
}

/// 升级动作收到的上下文引用：运行自身的 TaskContext，或从 JSON 映射解析出的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextRef {
    Task(TaskContext),
    Fields {
        task: Option<String>,
        original_task: Option<String>,
        session_id: Option<SessionId>,
    },
}

impl ContextRef {
    /// 从 JSON 映射解析（键：task / original_task / session_id）；非对象或三键皆缺时返回 None
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| {
            obj.get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };
        let task = text("task");
        let original_task = text("original_task");
        let session_id = text("session_id").map(SessionId::from);
        if task.is_none() && original_task.is_none() && session_id.is_none() {
            return None;
        }
        Some(Self::Fields {
            task,
            original_task,
            session_id,
        })
    }

    /// 直接携带的任务：original_task 优先，其次 task；空白视为缺失
    pub fn direct_task(&self) -> Option<&str> {
        let (original, task) = match self {
            Self::Task(ctx) => (Some(ctx.original_task()), Some(ctx.task())),
            Self::Fields {
                task,
                original_task,
                ..
            } => (original_task.as_deref(), task.as_deref()),
        };
        original
            .filter(|s| !s.trim().is_empty())
            .or_else(|| task.filter(|s| !s.trim().is_empty()))
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Task(ctx) => Some(ctx.session_id()),
            Self::Fields { session_id, .. } => session_id.as_ref(),
        }
    }
}

impl From<TaskContext> for ContextRef {
    fn from(ctx: TaskContext) -> Self {
        Self::Task(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decorate_keeps_original() {
        let mut ctx = TaskContext::create("find the flower");
        ctx.decorate("Try harder.");
        assert_eq!(ctx.task(), "find the flower Try harder.");
        assert_eq!(ctx.original_task(), "find the flower");
    }

    #[test]
    fn test_generated_ids_unique() {
        let a = TaskContext::create("x");
        let b = TaskContext::create("x");
        assert_ne!(a.session_id(), b.session_id());
        assert!(a.session_id().as_str().starts_with("session_"));
    }

    #[test]
    fn test_from_value() {
        let r = ContextRef::from_value(&json!({"task": "t", "session_id": "s1"})).unwrap();
        assert_eq!(r.direct_task(), Some("t"));
        assert_eq!(r.session_id().map(|s| s.as_str()), Some("s1"));

        assert!(ContextRef::from_value(&json!({})).is_none());
        assert!(ContextRef::from_value(&json!("task")).is_none());
    }

    #[test]
    fn test_direct_task_prefers_original() {
        let r = ContextRef::Fields {
            task: Some("decorated".into()),
            original_task: Some("plain".into()),
            session_id: None,
        };
        assert_eq!(r.direct_task(), Some("plain"));

        let blank = ContextRef::Fields {
            task: Some("  ".into()),
            original_task: None,
            session_id: Some("s".into()),
        };
        assert_eq!(blank.direct_task(), None);
    }
}
