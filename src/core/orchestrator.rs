//! 运行编排器
//!
//! 组装一次运行：生成 TaskContext 并登记到 SessionRegistry，选定动作集合与引导注入方式，
//! 绑定 StepObserver，交给 AgentRuntime 跑完并原样返回结果。会话条目由 SessionGuard 在运行结束时释放。

use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::{transcript_path, AgentRuntime, AgentSpec, Guidance, RunResult, StepHook};
use crate::browser::BrowserHandle;
use crate::core::{AgentError, SessionId, SessionRegistry, TaskContext};
use crate::llm::LlmClient;
use crate::tools::{browser_actions, ActionRegistry};
use crate::transfer::StepObserver;

/// 单次运行的请求
pub struct RunRequest<'a> {
    pub llm: Arc<dyn LlmClient>,
    pub browser: Arc<dyn BrowserHandle>,
    pub task: String,
    /// 不指定时自动生成
    pub session_id: Option<SessionId>,
    /// 至多一种注入方式
    pub guidance: Option<Guidance>,
    /// 不指定时只给浏览器动作
    pub actions: Option<ActionRegistry>,
    pub observer: Option<&'a mut StepObserver>,
    /// 对话记录文件名前缀，如 teacher / student_prepend / escalation
    pub label: String,
}

impl<'a> RunRequest<'a> {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        browser: Arc<dyn BrowserHandle>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            browser,
            task: task.into(),
            session_id: None,
            guidance: None,
            actions: None,
            observer: None,
            label: "run".to_string(),
        }
    }

    pub fn with_session_id(mut self, id: SessionId) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn with_guidance(mut self, guidance: Guidance) -> Self {
        self.guidance = Some(guidance);
        self
    }

    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_observer(mut self, observer: &'a mut StepObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Clone)]
pub struct RunOrchestrator {
    runtime: Arc<dyn AgentRuntime>,
    registry: Arc<SessionRegistry>,
    transcripts_dir: Option<PathBuf>,
}

impl RunOrchestrator {
    pub fn new(runtime: Arc<dyn AgentRuntime>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            runtime,
            registry,
            transcripts_dir: None,
        }
    }

    pub fn with_transcripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcripts_dir = Some(dir.into());
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub async fn run(&self, request: RunRequest<'_>) -> Result<RunResult, AgentError> {
        let RunRequest {
            llm,
            browser,
            task,
            session_id,
            guidance,
            actions,
            observer,
            label,
        } = request;

        let context = match session_id {
            Some(id) => TaskContext::with_session_id(task, id),
            None => TaskContext::create(task),
        };
        let actions = actions.unwrap_or_else(|| browser_actions(Arc::clone(&browser)));
        let transcript = self
            .transcripts_dir
            .as_deref()
            .map(|dir| transcript_path(dir, &label, context.session_id()));

        let guard = self.registry.register(context.clone());
        tracing::info!(
            session_id = %guard.session_id(),
            label = %label,
            actions = ?actions.names(),
            "run registered"
        );

        let spec = AgentSpec {
            context,
            llm,
            browser,
            actions: Arc::new(actions),
            guidance,
            transcript_path: transcript,
        };
        let hook = observer.map(|o| o as &mut dyn StepHook);
        let result = self.runtime.run(spec, hook).await;

        if let Err(e) = &result {
            tracing::error!(session_id = %guard.session_id(), error = %e, "run failed");
        }
        drop(guard);
        result
    }
}
