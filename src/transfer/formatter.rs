//! 教师推理 -> 学生引导文本
//!
//! 取前 limit 条（None 为全部），每条渲染为 "Step i:" 编号块，外加固定的师生说明。
//! 输出只依赖输入，相同输入与 limit 得到逐字节相同的文本。

use crate::transfer::ThoughtRecord;

const PREAMBLE: &str = "You are a student agent learning from a smarter teacher agent. \
Here is how the teacher approached a similar task in their first few steps:\n\n";
const CLOSING: &str = "\nUse these examples to guide your own reasoning.";

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFormatter;

impl ContextFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, records: &[ThoughtRecord], limit: Option<usize>) -> String {
        let take = limit.unwrap_or(records.len()).min(records.len());
        let blocks: Vec<String> = records[..take]
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "Step {}:\nThinking: {}\nEvaluation: {}\nMemory: {}\nNext Goal: {}\n",
                    i,
                    r.thinking(),
                    r.evaluation_previous_goal(),
                    r.memory(),
                    r.next_goal()
                )
            })
            .collect();
        format!("{}{}{}", PREAMBLE, blocks.join("\n"), CLOSING)
    }
}
