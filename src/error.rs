//! Simulation-specific error types.
//!
//! Per-tick gameplay guards never error: firing on cooldown, selecting with no
//! planes available or re-entering the goal are silent no-ops.  Errors are
//! reserved for the loading boundaries (config, layouts, level lookup) where a
//! caller can still fall back to defaults.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jet_janitor::error::SimResult;
//!
//! fn load(text: &str) -> SimResult<GameConfig> {
//!     let config = GameConfig::from_toml_str(text)?;
//!     config.validate()?;
//!     Ok(config)
//! }
//! ```

use std::fmt;

/// Top-level error enum for the flight core.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A TOML document (props or layout) could not be parsed.
    ConfigParse {
        /// Where the text came from, for logging.
        source: String,
        /// Parser message.
        message: String,
    },

    /// A tunable is outside its safe operating range.
    UnsafeConstant {
        /// Dotted prop key of the constant.
        name: &'static str,
        /// The value that was rejected.
        value: f64,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },

    /// A level layout cannot be simulated.
    InvalidLayout {
        /// Layout name.
        level: String,
        /// What is missing or malformed.
        reason: &'static str,
    },

    /// A prop key does not name any tunable.
    UnknownProp {
        /// The key that was looked up.
        key: String,
    },

    /// A level index outside the campaign's level list.
    UnknownLevel {
        /// Requested index.
        index: usize,
        /// Number of levels in the campaign.
        count: usize,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::ConfigParse { source, message } => {
                write!(f, "failed to parse {}: {}", source, message)
            }
            SimError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "prop '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
            SimError::InvalidLayout { level, reason } => {
                write!(f, "level '{}' is not playable: {}", level, reason)
            }
            SimError::UnknownProp { key } => write!(f, "unknown prop '{}'", key),
            SimError::UnknownLevel { index, count } => write!(
                f,
                "level index {} is out of range (campaign has {} levels)",
                index, count
            ),
        }
    }
}

impl std::error::Error for SimError {}

/// Convenience alias: a `Result` using `SimError` as the error type.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_prop() {
        let err = SimError::UnsafeConstant {
            name: "physics.drag",
            value: 1.5,
            safe_range: "(0.0, 1.0]",
        };
        let text = err.to_string();
        assert!(text.contains("physics.drag"));
        assert!(text.contains("1.5"));
    }

    #[test]
    fn unknown_level_reports_bounds() {
        let err = SimError::UnknownLevel { index: 12, count: 10 };
        assert_eq!(
            err.to_string(),
            "level index 12 is out of range (campaign has 10 levels)"
        );
    }
}
