//! Agent 运行时
//!
//! AgentRuntime 接收任务、LLM、浏览器句柄、动作集合与可选引导，跑完整个运行并返回 RunResult；
//! 每步结束后调用 StepHook（如 StepObserver），运行历史可通过 AgentHistory::model_thoughts 读取。
//! StepAgentRuntime 是基于 LLM 的逐步（ReAct 风格）实现。

pub mod history;
pub mod memory;
pub mod output;
pub mod prompt;
pub mod step_agent;
pub mod transcript;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::browser::BrowserHandle;
use crate::core::{AgentError, TaskContext, TransferError};
use crate::llm::LlmClient;
use crate::tools::ActionRegistry;

pub use history::{AgentHistory, StepRecord};
pub use memory::WorkingMemory;
pub use output::{parse_agent_output, ActionInvocation, AgentOutput, DONE_ACTION};
pub use prompt::{build_preamble, Guidance, InjectionMode, DEFAULT_SYSTEM_PROMPT};
pub use step_agent::{StepAgentConfig, StepAgentRuntime};
pub use transcript::{transcript_path, TranscriptWriter};

/// 每步结束后的回调；返回错误只会被记录，运行继续
#[async_trait]
pub trait StepHook: Send {
    async fn on_step_end(&mut self, history: &AgentHistory) -> Result<(), TransferError>;
}

/// 单次运行的全部输入
pub struct AgentSpec {
    pub context: TaskContext,
    pub llm: Arc<dyn LlmClient>,
    pub browser: Arc<dyn BrowserHandle>,
    pub actions: Arc<ActionRegistry>,
    pub guidance: Option<Guidance>,
    pub transcript_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    /// done 动作给出的最终文本；步数耗尽时为 None
    pub final_text: Option<String>,
    pub success: bool,
    pub steps: usize,
    pub history: AgentHistory,
}

impl RunResult {
    /// 给调用方（包括升级动作）看的结果文本
    pub fn summary(&self) -> String {
        match &self.final_text {
            Some(text) => text.clone(),
            None => format!("Agent stopped after {} steps without finishing.", self.steps),
        }
    }
}

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(
        &self,
        spec: AgentSpec,
        hook: Option<&mut dyn StepHook>,
    ) -> Result<RunResult, AgentError>;
}
