//! Device-memory allocator tuning.
//!
//! The settings arrive through the `HABLA_CUDA_ALLOC_CONF` environment
//! variable in `key:value,key:value` form, the same shape the CUDA caching
//! allocator understands. They are parsed into a typed struct exactly once
//! at process start and validated before any model is loaded; library code
//! never reads the environment ad hoc.

use std::str::FromStr;

use tracing::debug;

use habla_core::{TtsError, TtsResult};

/// Environment variable holding the allocator configuration string.
pub const ALLOC_ENV: &str = "HABLA_CUDA_ALLOC_CONF";

/// Typed allocator settings for the device runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocTuning {
    /// Grow existing memory segments instead of allocating new ones,
    /// reducing fragmentation under repeated variable-length inference.
    pub expandable_segments: bool,
    /// Maximum size in MiB of a block the allocator may split.
    pub max_split_size_mb: Option<usize>,
    /// Fraction of reserved memory above which cached blocks are released.
    pub gc_threshold: Option<f32>,
}

impl Default for AllocTuning {
    fn default() -> Self {
        Self {
            expandable_segments: true,
            max_split_size_mb: None,
            gc_threshold: None,
        }
    }
}

impl FromStr for AllocTuning {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tuning = Self {
            expandable_segments: false,
            ..Self::default()
        };

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once(':')
                .ok_or_else(|| TtsError::config(format!("malformed allocator entry: {entry}")))?;
            match key.trim() {
                "expandable_segments" => {
                    tuning.expandable_segments = parse_bool(value.trim())?;
                }
                "max_split_size_mb" => {
                    let mb = value.trim().parse::<usize>().map_err(|_| {
                        TtsError::config(format!("max_split_size_mb is not a number: {value}"))
                    })?;
                    tuning.max_split_size_mb = Some(mb);
                }
                "gc_threshold" => {
                    let t = value.trim().parse::<f32>().map_err(|_| {
                        TtsError::config(format!("gc_threshold is not a number: {value}"))
                    })?;
                    tuning.gc_threshold = Some(t);
                }
                other => {
                    return Err(TtsError::config(format!(
                        "unknown allocator setting: {other}"
                    )));
                }
            }
        }

        tuning.validate()?;
        Ok(tuning)
    }
}

impl AllocTuning {
    /// Read the tuning from the environment, falling back to defaults when
    /// the variable is unset.
    pub fn from_env() -> TtsResult<Self> {
        match std::env::var(ALLOC_ENV) {
            Ok(raw) => raw.parse(),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(TtsError::config(format!("{ALLOC_ENV}: {e}"))),
        }
    }

    /// Check the settings against the ranges the allocator accepts.
    pub fn validate(&self) -> TtsResult<()> {
        if let Some(mb) = self.max_split_size_mb {
            if mb < 32 {
                return Err(TtsError::config(format!(
                    "max_split_size_mb must be at least 32, got {mb}"
                )));
            }
        }
        if let Some(t) = self.gc_threshold {
            if !(t > 0.0 && t <= 1.0) {
                return Err(TtsError::config(format!(
                    "gc_threshold must be in (0, 1], got {t}"
                )));
            }
        }
        Ok(())
    }

    /// Render back to the `key:value,...` wire form.
    pub fn render(&self) -> String {
        let mut parts = vec![format!(
            "expandable_segments:{}",
            if self.expandable_segments { "true" } else { "false" }
        )];
        if let Some(mb) = self.max_split_size_mb {
            parts.push(format!("max_split_size_mb:{mb}"));
        }
        if let Some(t) = self.gc_threshold {
            parts.push(format!("gc_threshold:{t}"));
        }
        parts.join(",")
    }

    /// Export the normalized settings for the device runtime. Must run
    /// before the first device context is created; later changes have no
    /// effect.
    pub fn apply(&self) {
        std::env::set_var(ALLOC_ENV, self.render());
        debug!(
            expandable_segments = self.expandable_segments,
            max_split_size_mb = ?self.max_split_size_mb,
            gc_threshold = ?self.gc_threshold,
            "allocator tuning applied"
        );
    }
}

fn parse_bool(s: &str) -> TtsResult<bool> {
    match s {
        "true" | "True" | "1" => Ok(true),
        "false" | "False" | "0" => Ok(false),
        other => Err(TtsError::config(format!("expected bool, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let tuning: AllocTuning = "expandable_segments:true,max_split_size_mb:512,gc_threshold:0.8"
            .parse()
            .unwrap();
        assert!(tuning.expandable_segments);
        assert_eq!(tuning.max_split_size_mb, Some(512));
        assert_eq!(tuning.gc_threshold, Some(0.8));
    }

    #[test]
    fn test_parse_accepts_python_style_bool() {
        let tuning: AllocTuning = "expandable_segments:True".parse().unwrap();
        assert!(tuning.expandable_segments);
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let err = "roundup_power2:1".parse::<AllocTuning>().unwrap_err();
        assert!(matches!(err, TtsError::Config(_)));
    }

    #[test]
    fn test_validate_ranges() {
        assert!("max_split_size_mb:16".parse::<AllocTuning>().is_err());
        assert!("gc_threshold:1.5".parse::<AllocTuning>().is_err());
        assert!("gc_threshold:0".parse::<AllocTuning>().is_err());
    }

    #[test]
    fn test_render_roundtrip() {
        let tuning: AllocTuning = "expandable_segments:false,max_split_size_mb:128"
            .parse()
            .unwrap();
        let again: AllocTuning = tuning.render().parse().unwrap();
        assert_eq!(tuning, again);
    }
}
