use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the verify-correct loop. Attempts are 1-indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        question_type: String,
        max_attempts: usize,
        question_preview: String,
    },
    JudgeStarted {
        attempt: usize,
    },
    JudgeCompleted {
        attempt: usize,
        verdict: String,
        duration_secs: f64,
    },
    CorrectorStarted {
        attempt: usize,
        violations: usize,
    },
    CorrectorCompleted {
        attempt: usize,
        duration_secs: f64,
    },
    LoopAccepted {
        attempts: usize,
        duration_secs: f64,
    },
    AttemptsExhausted {
        attempts: usize,
        duration_secs: f64,
    },
    LoopFailed {
        attempt: usize,
        reason: String,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for loop events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        let _ = writeln!(std::io::stderr(), "{}", event.with_timestamp());
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::LoopStarted {
                question_type,
                max_attempts,
                question_preview,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}",
                    "│".bright_blue(),
                    "examloops".bold().bright_white()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Question:".dimmed(),
                    question_preview.dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}  {} {}",
                    "│".bright_blue(),
                    "Type:".dimmed(),
                    question_type,
                    "Max attempts:".dimmed(),
                    max_attempts
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::JudgeStarted { attempt } => {
                let header = format!("─ Attempt {} ", attempt);
                let padding = "─".repeat(67usize.saturating_sub(header.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    header.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "JUDGE".bright_magenta().bold()
                );
            }
            LogEvent::JudgeCompleted {
                verdict,
                duration_secs,
                ..
            } => {
                let styled = if verdict.starts_with("COMPLIANT") {
                    format!("✓ Verdict: {}", verdict).bright_green().to_string()
                } else {
                    format!("→ Verdict: {}", verdict).bright_yellow().to_string()
                };
                let _ = writeln!(stderr, "    {} ({:.1}s)", styled, duration_secs);
                let _ = writeln!(stderr);
            }
            LogEvent::CorrectorStarted { violations, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    "CORRECTOR".bright_cyan().bold(),
                    format!("({} to address)", violations).dimmed()
                );
            }
            LogEvent::CorrectorCompleted { duration_secs, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Revised ({:.1}s)",
                    "✓".bright_green(),
                    duration_secs
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::LoopAccepted { .. } => {
                // Printed with the final outcome by the binary
            }
            LogEvent::AttemptsExhausted { attempts, .. } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Attempt ceiling reached ({}) without full compliance",
                    "⚠".bright_yellow(),
                    attempts
                );
            }
            LogEvent::LoopFailed {
                attempt,
                reason,
                error,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} in attempt {}: {}",
                    "✗".bright_red(),
                    reason,
                    attempt,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "{}", Self::compact_line(event));
    }

    fn compact_line(event: &LogEvent) -> String {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        match event {
            LogEvent::LoopStarted {
                question_type,
                max_attempts,
                ..
            } => format!(
                "[{}] loop:start type={} max={}",
                timestamp, question_type, max_attempts
            ),
            LogEvent::JudgeStarted { attempt } => {
                format!("[{}] judge:start:{}", timestamp, attempt)
            }
            LogEvent::JudgeCompleted {
                attempt,
                verdict,
                duration_secs,
            } => format!(
                "[{}] judge:done:{} {} {:.1}s",
                timestamp, attempt, verdict, duration_secs
            ),
            LogEvent::CorrectorStarted {
                attempt,
                violations,
            } => format!(
                "[{}] corrector:start:{} violations={}",
                timestamp, attempt, violations
            ),
            LogEvent::CorrectorCompleted {
                attempt,
                duration_secs,
            } => format!(
                "[{}] corrector:done:{} {:.1}s",
                timestamp, attempt, duration_secs
            ),
            LogEvent::LoopAccepted {
                attempts,
                duration_secs,
            } => format!(
                "[{}] loop:accepted:{} {:.1}s",
                timestamp, attempts, duration_secs
            ),
            LogEvent::AttemptsExhausted {
                attempts,
                duration_secs,
            } => format!(
                "[{}] loop:exhausted:{} {:.1}s",
                timestamp, attempts, duration_secs
            ),
            LogEvent::LoopFailed {
                attempt,
                reason,
                error,
            } => format!("[{}] loop:failed:{} {}: {}", timestamp, attempt, reason, error),
        }
    }
}
