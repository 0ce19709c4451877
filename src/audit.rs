//! Audit log
//!
//! Appends one JSON line per action start and completion for compliance
//! and debugging. Writing never blocks or fails an action.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const PREVIEW_LIMIT: usize = 500;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    invocation_id: &'a str,
    entry_type: &'static str,
    action: &'a str,
    args: Value,
    result: Option<Value>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// JSONL audit trail shared by all actions
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter {
                path: log_path.into(),
            })),
        }
    }

    /// Record an action start; returns the invocation id for the completion entry
    pub async fn record_start(&self, action: &str, message: Option<&str>) -> String {
        let invocation_id = Uuid::new_v4().to_string();
        let entry = AuditEntry {
            timestamp: Utc::now(),
            invocation_id: &invocation_id,
            entry_type: "action_start",
            action,
            args: serde_json::json!({ "message_preview": message.map(preview) }),
            result: None,
            error: None,
            duration_ms: 0,
            status: "pending",
        };
        self.write(&entry).await;
        invocation_id
    }

    pub async fn record_complete(
        &self,
        invocation_id: &str,
        action: &str,
        success: bool,
        response: Option<Value>,
        duration_ms: u64,
    ) {
        let error = response
            .as_ref()
            .and_then(|r| r.get("content"))
            .and_then(|c| c.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let entry = AuditEntry {
            timestamp: Utc::now(),
            invocation_id,
            entry_type: "action_complete",
            action,
            args: Value::Null,
            result: response,
            error,
            duration_ms,
            status: if success { "success" } else { "error" },
        };
        self.write(&entry).await;
    }

    async fn write(&self, entry: &AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

/// Truncate messages for logging (don't log full conversations)
fn preview(message: &str) -> String {
    if message.chars().count() > PREVIEW_LIMIT {
        let head: String = message.chars().take(PREVIEW_LIMIT).collect();
        format!("{}... [truncated]", head)
    } else {
        message.to_string()
    }
}
