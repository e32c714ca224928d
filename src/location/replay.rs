//! Replays fixes recorded as JSON lines
//!
//! Each non-empty line is a [`Position`]. Lines starting with `#` are
//! comments. The literal line `null` stands for a wake where the platform
//! returned no fix. When the file is exhausted the last fix is repeated, so
//! a replay ends with the device standing still.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::Position;
use crate::error::{Result, SnitchError};
use crate::location::PositionSource;

#[derive(Debug)]
struct Cursor {
    fixes: Vec<Option<Position>>,
    next: usize,
    last: Option<Position>,
}

/// File-backed position source for running the loop without a device
#[derive(Debug)]
pub struct ReplaySource {
    cursor: Mutex<Cursor>,
}

impl ReplaySource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let source = Self::parse(&content)?;
        log::info!(
            "Loaded {} replay fixes from {}",
            source.len(),
            path.as_ref().display()
        );
        Ok(source)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut fixes = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fix: Option<Position> = serde_json::from_str(line)
                .map_err(|e| SnitchError::Location(format!("line {}: {}", index + 1, e)))?;
            fixes.push(fix);
        }
        Ok(Self {
            cursor: Mutex::new(Cursor {
                fixes,
                next: 0,
                last: None,
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.cursor.lock().unwrap_or_else(|e| e.into_inner()).fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    async fn request_one_fix(&self) -> Option<Position> {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        if cursor.next >= cursor.fixes.len() {
            return cursor.last;
        }
        let fix = cursor.fixes[cursor.next];
        cursor.next += 1;
        if fix.is_some() {
            cursor.last = fix;
        }
        fix
    }
}
