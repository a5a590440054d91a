//! Structured error types shared across the NMR engine crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`NmrError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (site, coupling, dimension indices, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller fix the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the simulation engine.
///
/// Every variant aborts the run at the point of detection; none of them are
/// retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum NmrError {
    /// Malformed tensor, isotope or averaging parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(ErrorInfo),
    /// Inconsistent method, channel or dimension configuration.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// A non-finite frequency or amplitude was produced.
    #[error("numerical error: {0}")]
    Numerical(ErrorInfo),
    /// The run was aborted through its cancellation token.
    #[error("cancelled: {0}")]
    Cancelled(ErrorInfo),
    /// Serialization, plan loading and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl NmrError {
    /// Builds an [`NmrError::InvalidParameter`] error.
    pub fn invalid(code: &str, message: impl Into<String>) -> Self {
        NmrError::InvalidParameter(ErrorInfo::new(code, message))
    }

    /// Builds an [`NmrError::Configuration`] error.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        NmrError::Configuration(ErrorInfo::new(code, message))
    }

    /// Builds an [`NmrError::Numerical`] error.
    pub fn numerical(code: &str, message: impl Into<String>) -> Self {
        NmrError::Numerical(ErrorInfo::new(code, message))
    }

    /// Builds an [`NmrError::Cancelled`] error.
    pub fn cancelled(code: &str, message: impl Into<String>) -> Self {
        NmrError::Cancelled(ErrorInfo::new(code, message))
    }

    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            NmrError::InvalidParameter(info)
            | NmrError::Configuration(info)
            | NmrError::Numerical(info)
            | NmrError::Cancelled(info)
            | NmrError::Serde(info) => info,
        }
    }

    fn info_mut(&mut self) -> &mut ErrorInfo {
        match self {
            NmrError::InvalidParameter(info)
            | NmrError::Configuration(info)
            | NmrError::Numerical(info)
            | NmrError::Cancelled(info)
            | NmrError::Serde(info) => info,
        }
    }

    /// Attaches a context entry while preserving the error family.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.info_mut()
            .context
            .insert(key.into(), value.to_string());
        self
    }

    /// Attaches a remediation hint while preserving the error family.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.info_mut().hint = Some(hint.into());
        self
    }
}
