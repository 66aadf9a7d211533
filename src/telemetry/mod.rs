//! Session telemetry for the chat front-end
//!
//! Tracks response latency over a rolling window and samples the memory
//! footprint of the local Ollama process.

use std::collections::VecDeque;
use std::time::Duration;
use sysinfo::System;

/// Number of recent responses the latency average covers
pub const LATENCY_WINDOW: usize = 20;

/// Rolling window of response times, oldest first
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl LatencyWindow {
    /// Create a window holding the last [`LATENCY_WINDOW`] samples
    pub fn new() -> Self {
        Self::with_capacity(LATENCY_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Record one response time, evicting the oldest past capacity
    pub fn record(&mut self, sample: Duration) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Mean of the stored samples, `None` before the first response
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Stored samples, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &Duration> {
        self.samples.iter()
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Resident memory of the first process whose name contains "ollama", in bytes
pub fn ollama_memory_bytes() -> Option<u64> {
    let mut system = System::new();
    system.refresh_processes();

    system
        .processes()
        .values()
        .find(|process| process.name().to_lowercase().contains("ollama"))
        .map(|process| process.memory())
}

/// Human-readable Ollama memory usage, "N/A" when the process is not found
pub fn ollama_memory_display() -> String {
    match ollama_memory_bytes() {
        Some(bytes) => format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0)),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window() {
        let window = LatencyWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.average(), None);
    }

    #[test]
    fn test_average() {
        let mut window = LatencyWindow::new();
        window.record(Duration::from_secs(1));
        window.record(Duration::from_secs(3));
        assert_eq!(window.average(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_twenty_first_sample_evicts_oldest() {
        let mut window = LatencyWindow::new();
        for i in 1..=21u64 {
            window.record(Duration::from_secs(i));
        }

        assert_eq!(window.len(), LATENCY_WINDOW);
        assert!(!window.samples().any(|s| *s == Duration::from_secs(1)));
        assert_eq!(window.samples().next(), Some(&Duration::from_secs(2)));
        assert_eq!(window.average(), Some(Duration::from_millis(11_500)));
    }

    #[test]
    fn test_memory_display_never_panics() {
        let text = ollama_memory_display();
        assert!(text == "N/A" || text.ends_with(" GB"));
    }
}
