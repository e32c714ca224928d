//! The position source trait and a scripted implementation

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::Position;

/// Produces a single fix on demand
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// `None` means the platform had no fix to give
    async fn request_one_fix(&self) -> Option<Position>;
}

/// Hands out a pre-arranged sequence of answers, then `None` forever
#[derive(Debug, Default)]
pub struct ScriptedSource {
    fixes: Mutex<VecDeque<Option<Position>>>,
}

impl ScriptedSource {
    pub fn new(fixes: impl IntoIterator<Item = Option<Position>>) -> Self {
        Self {
            fixes: Mutex::new(fixes.into_iter().collect()),
        }
    }

    pub fn push(&self, fix: Option<Position>) {
        self.fixes.lock().unwrap_or_else(|e| e.into_inner()).push_back(fix);
    }

    pub fn remaining(&self) -> usize {
        self.fixes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl PositionSource for ScriptedSource {
    async fn request_one_fix(&self) -> Option<Position> {
        self.fixes.lock().unwrap_or_else(|e| e.into_inner()).pop_front().flatten()
    }
}
