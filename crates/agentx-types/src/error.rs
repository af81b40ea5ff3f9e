// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Error category, orthogonal to [`ErrorCode`] (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Llm,
    Network,
    Driver,
    Validation,
    System,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Network => "network",
            Self::Driver => "driver",
            Self::Validation => "validation",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an [`AgentError`] (spec §7): `fatal` terminates the agent
/// lifecycle, `error` resets to idle, `warning` is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Error,
    Warning,
}

/// A classified, user/transport-visible agent error (spec §7).
#[derive(Debug, Clone, Error, PartialEq)]
#[error("[{category}/{code}] {message}")]
pub struct AgentError {
    pub category: ErrorCategory,
    pub code: &'static str,
    pub message: String,
    pub severity: Severity,
    pub recoverable: bool,
}

impl AgentError {
    fn new(
        category: ErrorCategory,
        code: &'static str,
        message: impl Into<String>,
        severity: Severity,
        recoverable: bool,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            severity,
            recoverable,
        }
    }

    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    // ── llm ──────────────────────────────────────────────────────────────
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Llm, "rate-limited", message, Severity::Error, true)
    }

    pub fn invalid_api_key(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Llm, "invalid-api-key", message, Severity::Fatal, false)
    }

    pub fn context_too_long(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Llm, "context-too-long", message, Severity::Error, true)
    }

    pub fn overloaded(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Llm, "overloaded", message, Severity::Error, true)
    }

    // ── network ──────────────────────────────────────────────────────────
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, "timeout", message, Severity::Error, true)
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, "connection-failed", message, Severity::Error, true)
    }

    // ── driver ───────────────────────────────────────────────────────────
    pub fn receive_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Driver, "receive-failed", message, Severity::Error, true)
    }

    pub fn tool_execution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Driver, "tool-execution-failed", message, Severity::Error, true)
    }

    // ── validation ───────────────────────────────────────────────────────
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, "invalid-message", message, Severity::Error, true)
    }

    pub fn schema_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, "schema-violation", message, Severity::Error, true)
    }

    // ── system ───────────────────────────────────────────────────────────
    pub fn agent_destroyed() -> Self {
        Self::new(
            ErrorCategory::System,
            "agent-destroyed",
            "agent has been destroyed",
            Severity::Fatal,
            false,
        )
    }

    pub fn agent_busy() -> Self {
        Self::new(
            ErrorCategory::System,
            "agent-busy",
            "agent is already processing a turn",
            Severity::Error,
            false,
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::System, "unknown", message, Severity::Error, true)
    }

    /// Classify a driver/upstream-provider error message using the
    /// string-pattern heuristic from spec §7. Best-effort: unmatched
    /// messages fall back to `driver/receive-failed`.
    pub fn classify_driver_error(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("429") {
            return Self::rate_limited(message);
        }
        if lower.contains("api key") || lower.contains("unauthorized") || lower.contains("401") {
            return Self::invalid_api_key(message);
        }
        if lower.contains("context") && (lower.contains("too long") || lower.contains("exceed")) {
            return Self::context_too_long(message);
        }
        if lower.contains("overloaded") || lower.contains("503") {
            return Self::overloaded(message);
        }
        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::timeout(message);
        }
        if lower.contains("connection") || lower.contains("dns") || lower.contains("refused") {
            return Self::connection_failed(message);
        }
        Self::receive_failed(message)
    }
}
