//! 浏览器动作：go_to_url / read_page
//!
//! 绑定当前运行独占的 BrowserHandle；页面文本只作为下一步的观察，不写入工作记忆。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::BrowserHandle;
use crate::tools::{Action, ActionCall, ActionRegistry, ActionResult};

pub struct GoToUrlAction {
    browser: Arc<dyn BrowserHandle>,
}

impl GoToUrlAction {
    pub fn new(browser: Arc<dyn BrowserHandle>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Action for GoToUrlAction {
    fn name(&self) -> &str {
        "go_to_url"
    }

    fn description(&self) -> &str {
        "Open a URL in the current browser tab and return the readable page text. Args: {\"url\": \"https://...\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Absolute http(s) URL" }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, call: ActionCall) -> ActionResult {
        let Some(url) = call.str_arg("url").map(str::trim).filter(|u| !u.is_empty()) else {
            return ActionResult::failure("Missing url");
        };
        match self.browser.navigate(url).await {
            Ok(page) => ActionResult::transient(page.render()),
            Err(e) => ActionResult::failure(e.to_string()),
        }
    }
}

pub struct ReadPageAction {
    browser: Arc<dyn BrowserHandle>,
}

impl ReadPageAction {
    pub fn new(browser: Arc<dyn BrowserHandle>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Action for ReadPageAction {
    fn name(&self) -> &str {
        "read_page"
    }

    fn description(&self) -> &str {
        "Re-read the page currently open in the browser. Args: {}"
    }

    async fn execute(&self, _call: ActionCall) -> ActionResult {
        match self.browser.read_page().await {
            Ok(page) => ActionResult::transient(page.render()),
            Err(e) => ActionResult::failure(e.to_string()),
        }
    }
}

/// 为指定浏览器句柄构建只含浏览器动作的注册表（升级子运行也只拿到这些）
pub fn browser_actions(browser: Arc<dyn BrowserHandle>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(GoToUrlAction::new(Arc::clone(&browser)));
    registry.register(ReadPageAction::new(browser));
    registry
}
