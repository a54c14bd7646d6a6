//! spawn_better_agent：在当前步骤内同步跑完一个新的子运行
//!
//! 候选上下文依次为 args 中的 context 映射、运行时传入的上下文；每个候选先取 original_task / task，
//! 其次按 session_id 查 SessionRegistry，第一个能解析出任务的候选胜出。
//! 子运行使用独立的新浏览器句柄，只拿到浏览器动作，不能再次升级；不受执行器的动作超时约束。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::{BrowserFactory, BrowserHandle};
use crate::core::{ContextRef, EscalationError, RunOrchestrator, RunRequest, TaskContext};
use crate::llm::LlmClient;
use crate::tools::{Action, ActionCall, ActionResult};

pub const SPAWN_BETTER_AGENT: &str = "spawn_better_agent";

const TRY_HARDER: &str = "A previous agent got stuck on this task. Try harder: \
use alternative strategies, different sources or search queries, and do not repeat approaches that already failed.";

pub struct SpawnBetterAgentAction {
    orchestrator: RunOrchestrator,
    llm: Arc<dyn LlmClient>,
    browsers: Arc<dyn BrowserFactory>,
}

impl SpawnBetterAgentAction {
    pub fn new(
        orchestrator: RunOrchestrator,
        llm: Arc<dyn LlmClient>,
        browsers: Arc<dyn BrowserFactory>,
    ) -> Self {
        Self {
            orchestrator,
            llm,
            browsers,
        }
    }

    /// 解析出要交给子运行的原始任务
    fn resolve_task(&self, call: &ActionCall) -> Result<String, EscalationError> {
        call.contexts()
            .iter()
            .find_map(|context| self.task_from(context))
            .ok_or(EscalationError::EscalationUnresolved)
    }

    fn task_from(&self, context: &ContextRef) -> Option<String> {
        if let Some(task) = context.direct_task() {
            return Some(task.to_string());
        }
        let found = context
            .session_id()
            .and_then(|id| self.orchestrator.registry().lookup(id))?;
        let task = [found.original_task(), found.task()]
            .into_iter()
            .find(|t| !t.trim().is_empty())
            .map(str::to_string);
        task
    }

    async fn escalate(&self, task: String) -> Result<String, EscalationError> {
        let mut nested = TaskContext::create(task);
        nested.decorate(TRY_HARDER);

        let browser = self
            .browsers
            .open_isolated()
            .await
            .map_err(|e| EscalationError::NestedRunFailure(e.to_string()))?;

        let lease = BrowserLease::new(Arc::clone(&browser));

        tracing::info!(session_id = %nested.session_id(), "spawning better agent");
        let request = RunRequest::new(Arc::clone(&self.llm), browser, nested.task())
            .with_session_id(nested.session_id().clone())
            .with_label("escalation");
        let outcome = self.orchestrator.run(request).await;
        lease.close().await;

        let result = outcome.map_err(|e| EscalationError::NestedRunFailure(e.to_string()))?;
        tracing::info!(
            session_id = %nested.session_id(),
            success = result.success,
            steps = result.steps,
            "better agent finished"
        );
        Ok(result.summary())
    }
}

/// 子运行的浏览器句柄：正常结束时显式 close；future 中途被丢弃时由析构交给运行时关闭
struct BrowserLease {
    browser: Option<Arc<dyn BrowserHandle>>,
}

impl BrowserLease {
    fn new(browser: Arc<dyn BrowserHandle>) -> Self {
        Self {
            browser: Some(browser),
        }
    }

    async fn close(mut self) {
        if let Some(browser) = self.browser.take() {
            browser.close().await;
        }
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!("escalation abandoned mid-run, closing its browser");
                runtime.spawn(async move { browser.close().await });
            }
            Err(_) => tracing::warn!("no runtime left to close an abandoned escalation browser"),
        }
    }
}

#[async_trait]
impl Action for SpawnBetterAgentAction {
    fn name(&self) -> &str {
        SPAWN_BETTER_AGENT
    }

    fn timeout_exempt(&self) -> bool {
        true
    }

    fn description(&self) -> &str {
        "Hand the task to a fresh, more capable agent in a clean browser and wait for its answer. \
Use it only when you are stuck. Args: {} (optionally {\"context\": {\"task\": \"...\", \"session_id\": \"...\"}})"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "context": {
                    "type": "object",
                    "properties": {
                        "task": { "type": "string" },
                        "original_task": { "type": "string" },
                        "session_id": { "type": "string" }
                    }
                }
            },
            "required": []
        })
    }

    async fn execute(&self, call: ActionCall) -> ActionResult {
        let task = match self.resolve_task(&call) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(error = %e, "escalation unresolved");
                return ActionResult::failure(e.to_string());
            }
        };
        match self.escalate(task).await {
            Ok(text) => ActionResult::remembered(text),
            Err(e) => {
                tracing::warn!(error = %e, "escalation failed");
                ActionResult::failure(e.to_string())
            }
        }
    }
}
