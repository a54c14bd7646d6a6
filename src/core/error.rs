//! 错误类型
//!
//! - TransferError：思考日志读写（LogUnavailable / LogCorrupt / WriteFailure）
//! - EscalationError：升级动作内部失败，只在动作边界转为 ActionResult，不会中断外层运行
//! - AgentError：运行循环本身的失败，由 RunOrchestrator 原样返回给调用方

use std::path::PathBuf;

use thiserror::Error;

use crate::browser::BrowserError;

/// 思考日志（*.jsonl）读写错误
#[derive(Error, Debug)]
pub enum TransferError {
    /// 读取时日志文件不存在
    #[error("Thought log not available: {}", .0.display())]
    LogUnavailable(PathBuf),

    /// 某一行无法解析为 ThoughtRecord；line 从 1 开始
    #[error("Thought log corrupt at {}:{line}: {reason}", path.display())]
    LogCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// 追加写入失败（如磁盘已满）
    #[error("Thought log write failed ({}): {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },
}

/// 升级动作的失败（均为可报告、非致命）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscalationError {
    #[error("Escalation failed: no task available to hand to a better agent.")]
    EscalationUnresolved,

    #[error("Escalation failed: the better agent crashed: {0}")]
    NestedRunFailure(String),
}

/// Agent 运行过程中可能出现的错误（LLM、解析、动作、浏览器等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action timeout: {0}")]
    ActionTimeout(String),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
