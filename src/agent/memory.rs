//! 工作记忆：当前运行中动作返回的、需要保留到后续推理的内容
//!
//! ActionResult.remember 为 true 的结果写入这里，每步拼入请求（Memory from actions / Failures）。

#[derive(Clone, Debug, Default)]
pub struct WorkingMemory {
    pub notes: Vec<String>,
    pub failures: Vec<String>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, action: &str, content: &str) {
        self.notes.push(format!("{action} -> {}", content.trim()));
    }

    pub fn add_failure(&mut self, action: &str, reason: &str) {
        self.failures.push(format!("{action}: {}", reason.trim()));
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.failures.is_empty()
    }

    /// 构建拼入请求的段落；为空时返回空串
    pub fn to_prompt_section(&self) -> String {
        let mut s = String::new();
        if !self.notes.is_empty() {
            s.push_str("## Memory from actions\n");
            for n in &self.notes {
                s.push_str(&format!("- {}\n", n));
            }
            s.push('\n');
        }
        if !self.failures.is_empty() {
            s.push_str("## Failures\n");
            for f in &self.failures {
                s.push_str(&format!("- {}\n", f));
            }
            s.push('\n');
        }
        s
    }
}
