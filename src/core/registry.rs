//! 进程级会话表：session_id -> TaskContext
//!
//! 运行开始时 register 得到 SessionGuard，guard 析构时 release（成功、失败、panic 均会执行）。
//! 各运行只写自己的条目；升级动作只读 lookup。
//! 同一 ID 重复登记时后者覆盖前者，guard 只释放自己登记的那一份。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::core::{SessionId, TaskContext};

static GLOBAL: OnceLock<Arc<SessionRegistry>> = OnceLock::new();

#[derive(Debug)]
struct Entry {
    token: u64,
    context: TaskContext,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    next_token: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程内共享的实例
    pub fn global() -> Arc<SessionRegistry> {
        GLOBAL.get_or_init(|| Arc::new(SessionRegistry::new())).clone()
    }

    /// 登记运行上下文，返回的 guard 离开作用域时自动释放该条目
    pub fn register(&self, context: TaskContext) -> SessionGuard<'_> {
        let id = context.session_id().clone();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Entry { token, context });
        if previous.is_some() {
            tracing::warn!(session_id = %id, "session id registered twice, replacing entry");
        }
        tracing::debug!(session_id = %id, "session registered");
        SessionGuard {
            registry: self,
            id,
            token,
        }
    }

    pub fn lookup(&self, session_id: &SessionId) -> Option<TaskContext> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map(|entry| entry.context.clone())
    }

    /// 释放条目；未知或已释放的 ID 为 no-op
    pub fn release(&self, session_id: &SessionId) {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        if removed.is_some() {
            tracing::debug!(session_id = %session_id, "session released");
        }
    }

    /// 仅当条目仍是 token 对应的那次登记时才移除
    fn release_owned(&self, session_id: &SessionId, token: u64) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.get(session_id).is_some_and(|entry| entry.token == token) {
            sessions.remove(session_id);
            tracing::debug!(session_id = %session_id, "session released");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 会话条目的所有权；析构即 release
#[derive(Debug)]
pub struct SessionGuard<'a> {
    registry: &'a SessionRegistry,
    id: SessionId,
    token: u64,
}

impl SessionGuard<'_> {
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.registry.release_owned(&self.id, self.token);
    }
}
