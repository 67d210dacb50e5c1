//! Structured output writer supporting JSON Lines and human-readable modes
//! for the `submit`/`kill` CLI subcommands.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Structured result of a `submit` or `kill` invocation.
#[derive(Debug, Serialize)]
pub struct OperationResult {
    pub operation: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_hint: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self { mode: if json { OutputMode::Json } else { OutputMode::Human } }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    pub fn operation_result(&self, result: &OperationResult) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(result) {
                    println!("{json}");
                }
            }
            OutputMode::Human => {
                if result.success {
                    match &result.job_id {
                        Some(id) => println!("{}: {} ok (job {})", result.operation, "succeeded", id),
                        None => println!("{}: succeeded", result.operation),
                    }
                } else if let Some(err) = &result.error {
                    eprintln!("{}: failed: {err}", result.operation);
                }
            }
        }
    }

    pub fn info(&self, msg: &str) {
        if !self.is_json() {
            println!("{msg}");
        }
    }
}
