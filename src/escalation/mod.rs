//! 升级动作：consult_teacher 与 spawn_better_agent
//!
//! 两者都是普通动作，由运行中的 Agent 自行决定何时调用；结果写入调用方的工作记忆。
//! 失败（日志缺失、任务无法解析、子运行崩溃）只会成为动作结果，不会中断外层运行。

pub mod consult;
pub mod spawn;

use std::sync::Arc;

use crate::browser::{BrowserFactory, BrowserHandle};
use crate::core::RunOrchestrator;
use crate::llm::LlmClient;
use crate::tools::{browser_actions, ActionRegistry};
use crate::transfer::ThoughtLogStore;

pub use consult::{ConsultTeacherAction, CONSULT_TEACHER, GUIDANCE_UNAVAILABLE};
pub use spawn::{SpawnBetterAgentAction, SPAWN_BETTER_AGENT};

/// 升级能力集合
pub struct EscalationController {
    consult: Arc<ConsultTeacherAction>,
    spawn: Arc<SpawnBetterAgentAction>,
}

impl EscalationController {
    pub fn new(consult: ConsultTeacherAction, spawn: SpawnBetterAgentAction) -> Self {
        Self {
            consult: Arc::new(consult),
            spawn: Arc::new(spawn),
        }
    }

    /// teacher_log：教师推理日志；llm：子运行使用的模型；browsers：为子运行分配独立浏览器
    pub fn from_parts(
        teacher_log: ThoughtLogStore,
        guidance_limit: Option<usize>,
        orchestrator: RunOrchestrator,
        llm: Arc<dyn LlmClient>,
        browsers: Arc<dyn BrowserFactory>,
    ) -> Self {
        Self::new(
            ConsultTeacherAction::new(teacher_log).with_limit(guidance_limit),
            SpawnBetterAgentAction::new(orchestrator, llm, browsers),
        )
    }

    /// 把两个升级动作加入已有注册表
    pub fn register_into(&self, registry: &mut ActionRegistry) {
        registry.register_arc(self.consult.clone());
        registry.register_arc(self.spawn.clone());
    }

    /// 浏览器动作 + 升级动作，供学生运行使用
    pub fn actions_for(&self, browser: Arc<dyn BrowserHandle>) -> ActionRegistry {
        let mut registry = browser_actions(browser);
        self.register_into(&mut registry);
        registry
    }
}
