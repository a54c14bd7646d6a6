//! 运行历史：每步的推理、动作与观察
//!
//! model_thoughts() 按步顺序返回已产生的 ThoughtRecord，单次运行内只增不减。

use crate::transfer::ThoughtRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRecord {
    pub step: usize,
    /// 解析失败的步骤没有推理
    pub thought: Option<ThoughtRecord>,
    pub action: Option<String>,
    pub observation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AgentHistory {
    steps: Vec<StepRecord>,
    thoughts: Vec<ThoughtRecord>,
}

impl AgentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: StepRecord) {
        if let Some(thought) = &record.thought {
            self.thoughts.push(thought.clone());
        }
        self.steps.push(record);
    }

    pub fn model_thoughts(&self) -> &[ThoughtRecord] {
        &self.thoughts
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
