//! Type definitions for Ollama model listings
//!
//! Only `name` and `size` are required; the server adds more fields over
//! time and older servers omit some of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per GiB
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Information about an installed model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    /// Model name (e.g., "llama3.1:8b")
    pub name: String,

    /// Model size in bytes
    #[serde(default)]
    pub size: u64,

    /// Last modification time
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,

    /// Model digest/hash
    #[serde(default)]
    pub digest: Option<String>,

    /// Model details
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

/// Detailed model information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelDetails {
    /// Model family (e.g., "llama", "qwen2")
    #[serde(default)]
    pub family: Option<String>,

    /// Parameter size (e.g., "7B", "13B")
    #[serde(default)]
    pub parameter_size: Option<String>,

    /// Quantization level (e.g., "Q4_0", "Q4_K_M")
    #[serde(default)]
    pub quantization_level: Option<String>,
}

/// Response from Ollama /api/tags endpoint
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

impl ModelInfo {
    /// Size in GiB
    pub fn size_gib(&self) -> f64 {
        self.size as f64 / GIB
    }

    /// Size rounded to two decimals, e.g. "0.59 GB"
    pub fn formatted_size(&self) -> String {
        format_gib(self.size)
    }

    /// Parameter size and quantization when the server reports them
    pub fn description(&self) -> Option<String> {
        let details = self.details.as_ref()?;
        let parts: Vec<&str> = [&details.parameter_size, &details.quantization_level]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.formatted_size())
    }
}

/// Format bytes as GiB with two decimals
pub fn format_gib(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

/// Pick the model to use given what the server has installed
///
/// Keeps `current` when it is installed, otherwise falls back to the first
/// listed model. Returns `None` when nothing is installed.
pub fn select_model<'a>(current: &str, available: &'a [ModelInfo]) -> Option<&'a str> {
    available
        .iter()
        .find(|m| m.name == current)
        .or_else(|| available.first())
        .map(|m| m.name.as_str())
}
