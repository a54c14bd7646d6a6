//! 动作执行器
//!
//! 持有 ActionRegistry 与全局超时，execute(name, call) 在超时内调用动作（声明豁免的动作除外）；
//! 未知动作或超时转为 AgentError；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{ActionCall, ActionRegistry, ActionResult};

pub struct ActionExecutor {
    registry: Arc<ActionRegistry>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(registry: Arc<ActionRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// 执行指定动作；超时返回 ActionTimeout，不存在返回 UnknownAction；输出 JSON 审计日志
    ///
    /// `timeout_exempt` 的动作不加超时，直接等待其完成（仍写审计日志）。
    pub async fn execute(&self, name: &str, call: ActionCall) -> Result<ActionResult, AgentError> {
        let action = self
            .registry
            .get(name)
            .ok_or_else(|| AgentError::UnknownAction(name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&call.args);
        let result = if action.timeout_exempt() {
            Ok(action.execute(call).await)
        } else {
            timeout(self.timeout, action.execute(call)).await
        };

        let outcome = match &result {
            Ok(r) if r.is_error => "error",
            Ok(_) => "ok",
            Err(_) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "action_audit",
            "action": name,
            "ok": outcome == "ok",
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "action");

        result.map_err(|_| AgentError::ActionTimeout(name.to_string()))
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
