//! Per-frame measurement type.
//!
//! A [`Measurement`] is one unit of data emitted by the analysis engine. It is
//! immutable once produced: the producer hands it to the channel, and the
//! record writer consumes it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Picture type of a decoded frame.
///
/// Serialized with the single-letter labels used by ffprobe's `pict_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameCategory {
    /// Key frame (intra coded).
    #[serde(rename = "I")]
    Key,
    /// Predicted frame.
    #[serde(rename = "P")]
    Predicted,
    /// Bidirectionally predicted frame.
    #[serde(rename = "B")]
    Bidirectional,
    /// Anything else the engine reports (S, SI, SP, BI, ?).
    #[serde(rename = "?")]
    Other,
}

impl FrameCategory {
    /// Label written to the report.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameCategory::Key => "I",
            FrameCategory::Predicted => "P",
            FrameCategory::Bidirectional => "B",
            FrameCategory::Other => "?",
        }
    }

    /// Parse an engine label. Unknown labels map to [`FrameCategory::Other`].
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "I" | "i" => FrameCategory::Key,
            "P" | "p" => FrameCategory::Predicted,
            "B" | "b" => FrameCategory::Bidirectional,
            _ => FrameCategory::Other,
        }
    }
}

impl fmt::Display for FrameCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

/// One per-frame measurement.
///
/// Field order matches the report columns: `sequence_number,category,size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Position of the frame in the stream, starting at zero.
    pub sequence_number: u64,
    /// Picture type.
    pub category: FrameCategory,
    /// Encoded size in bytes.
    pub size: u64,
}

impl Measurement {
    /// Create a new measurement.
    pub fn new(sequence_number: u64, category: FrameCategory, size: u64) -> Self {
        Self {
            sequence_number,
            category,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels() {
        assert_eq!(FrameCategory::Key.as_str(), "I");
        assert_eq!(FrameCategory::Predicted.as_str(), "P");
        assert_eq!(FrameCategory::Bidirectional.as_str(), "B");
        assert_eq!(FrameCategory::Other.to_string(), "?");
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(FrameCategory::from_label("I"), FrameCategory::Key);
        assert_eq!(FrameCategory::from_label(" b "), FrameCategory::Bidirectional);
        assert_eq!(FrameCategory::from_label("SI"), FrameCategory::Other);
        assert_eq!(FrameCategory::from_label(""), FrameCategory::Other);
    }

    #[test]
    fn test_category_from_str_never_fails() {
        let parsed: FrameCategory = "P".parse().unwrap();
        assert_eq!(parsed, FrameCategory::Predicted);
    }
}
