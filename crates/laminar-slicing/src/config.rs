//! # Window Configuration
//!
//! Declarative description of a windowed aggregation's slicing, as it
//! arrives from a query plan or a config file, and its validation into a
//! [`SliceAssigners`].
//!
//! ```rust
//! use laminar_slicing::config::WindowConfig;
//! use laminar_slicing::slicing::SliceAssigner;
//!
//! let config: WindowConfig = serde_json::from_str(
//!     r#"{ "type": "hopping", "size_ms": 600000, "slide_ms": 300000, "time_zone": "Asia/Shanghai" }"#,
//! ).unwrap();
//! let assigner = config.build().unwrap();
//! assert_eq!(assigner.slice_end_interval(), Some(300_000));
//! ```

use serde::{Deserialize, Serialize};

use crate::slicing::{
    CumulativeSliceAssigner, HoppingSliceAssigner, SessionSliceAssigner, SliceAssigners,
    TumblingSliceAssigner,
};
use crate::time::{ShiftTimeZone, TimeAttribute};

/// Errors raised while constructing a slice assigner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Window size is zero or negative.
    #[error("{window} window parameters must satisfy size > 0, but got size {size_ms}ms")]
    InvalidSize {
        /// Window kind
        window: &'static str,
        /// Offending size
        size_ms: i64,
    },

    /// Hopping size or slide is zero or negative.
    #[error("Hopping window must satisfy slide > 0 and size > 0, but got slide {slide_ms}ms and size {size_ms}ms")]
    InvalidSlide {
        /// Window size
        size_ms: i64,
        /// Slide interval
        slide_ms: i64,
    },

    /// Hopping size is not a whole number of slides.
    #[error("Slicing hopping window requires size to be an integral multiple of slide, but got size {size_ms}ms and slide {slide_ms}ms")]
    SizeNotMultipleOfSlide {
        /// Window size
        size_ms: i64,
        /// Slide interval
        slide_ms: i64,
    },

    /// Cumulative max size or step is zero or negative.
    #[error("Cumulative window must satisfy step > 0 and max size > 0, but got step {step_ms}ms and max size {max_size_ms}ms")]
    InvalidStep {
        /// Maximum window size
        max_size_ms: i64,
        /// Step interval
        step_ms: i64,
    },

    /// Cumulative max size is not a whole number of steps.
    #[error("Cumulative window requires max size to be an integral multiple of step, but got max size {max_size_ms}ms and step {step_ms}ms")]
    MaxSizeNotMultipleOfStep {
        /// Maximum window size
        max_size_ms: i64,
        /// Step interval
        step_ms: i64,
    },

    /// Session gap is zero or negative.
    #[error("Session window must satisfy gap > 0, but got gap {gap_ms}ms")]
    InvalidGap {
        /// Offending gap
        gap_ms: i64,
    },

    /// Offset magnitude is not below the window bound.
    #[error("{window} window offset must satisfy abs(offset) < {bound_ms}ms, but got offset {offset_ms}ms")]
    InvalidOffset {
        /// Window kind
        window: &'static str,
        /// Offending offset
        offset_ms: i64,
        /// Exclusive bound on the offset magnitude
        bound_ms: i64,
    },

    /// Sessions have no grid to shift.
    #[error("Session windows do not support an offset, but got offset {offset_ms}ms")]
    OffsetNotSupported {
        /// Offending offset
        offset_ms: i64,
    },

    /// A duration does not fit in `i64` milliseconds.
    #[error("{what} does not fit in i64 milliseconds")]
    DurationOutOfRange {
        /// Which parameter overflowed
        what: &'static str,
    },

    /// Time zone id is neither UTC, a fixed offset, nor a known IANA name.
    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),
}

/// Window shape and its size parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowKind {
    /// Fixed-size, non-overlapping windows.
    Tumbling {
        /// Window size in milliseconds
        size_ms: i64,
    },
    /// Fixed-size windows advancing by `slide_ms`.
    Hopping {
        /// Window size in milliseconds
        size_ms: i64,
        /// Slide in milliseconds
        slide_ms: i64,
    },
    /// Windows growing by `step_ms` up to `max_size_ms`.
    Cumulative {
        /// Maximum window size in milliseconds
        max_size_ms: i64,
        /// Step in milliseconds
        step_ms: i64,
    },
    /// Sessions closed by `gap_ms` of inactivity.
    Session {
        /// Inactivity gap in milliseconds
        gap_ms: i64,
    },
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

/// Full slicing configuration of one windowed aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window shape
    #[serde(flatten)]
    pub kind: WindowKind,

    /// Grid shift in milliseconds. Must be zero for sessions.
    #[serde(default)]
    pub offset_ms: i64,

    /// Zone the grid aligns to: `UTC`, `+08:00` style offsets, or an IANA name.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Event or processing time.
    #[serde(default)]
    pub time_attribute: TimeAttribute,
}

impl WindowConfig {
    /// Creates a UTC event-time configuration for `kind`.
    #[must_use]
    pub fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            offset_ms: 0,
            time_zone: default_time_zone(),
            time_attribute: TimeAttribute::EventTime,
        }
    }

    /// Tumbling windows of `size_ms`.
    #[must_use]
    pub fn tumbling(size_ms: i64) -> Self {
        Self::new(WindowKind::Tumbling { size_ms })
    }

    /// Hopping windows of `size_ms` every `slide_ms`.
    #[must_use]
    pub fn hopping(size_ms: i64, slide_ms: i64) -> Self {
        Self::new(WindowKind::Hopping { size_ms, slide_ms })
    }

    /// Cumulative windows up to `max_size_ms` every `step_ms`.
    #[must_use]
    pub fn cumulative(max_size_ms: i64, step_ms: i64) -> Self {
        Self::new(WindowKind::Cumulative {
            max_size_ms,
            step_ms,
        })
    }

    /// Sessions with `gap_ms` of inactivity.
    #[must_use]
    pub fn session(gap_ms: i64) -> Self {
        Self::new(WindowKind::Session { gap_ms })
    }

    /// Sets the grid offset.
    #[must_use]
    pub fn with_offset_ms(mut self, offset_ms: i64) -> Self {
        self.offset_ms = offset_ms;
        self
    }

    /// Sets the time zone id.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Sets the time attribute.
    #[must_use]
    pub fn with_time_attribute(mut self, time_attribute: TimeAttribute) -> Self {
        self.time_attribute = time_attribute;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }

    /// Builds the assigner described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a size parameter, the offset, or the time
    /// zone is invalid.
    pub fn build(&self) -> Result<SliceAssigners, ConfigError> {
        let zone: ShiftTimeZone = self.time_zone.parse()?;
        let attr = self.time_attribute;

        let assigner: SliceAssigners = match self.kind {
            WindowKind::Tumbling { size_ms } => TumblingSliceAssigner::from_millis(size_ms)?
                .with_offset(self.offset_ms)?
                .with_time_zone(zone)
                .with_time_attribute(attr)
                .into(),
            WindowKind::Hopping { size_ms, slide_ms } => {
                HoppingSliceAssigner::from_millis(size_ms, slide_ms)?
                    .with_offset(self.offset_ms)?
                    .with_time_zone(zone)
                    .with_time_attribute(attr)
                    .into()
            }
            WindowKind::Cumulative {
                max_size_ms,
                step_ms,
            } => CumulativeSliceAssigner::from_millis(max_size_ms, step_ms)?
                .with_offset(self.offset_ms)?
                .with_time_zone(zone)
                .with_time_attribute(attr)
                .into(),
            WindowKind::Session { gap_ms } => {
                if self.offset_ms != 0 {
                    return Err(ConfigError::OffsetNotSupported {
                        offset_ms: self.offset_ms,
                    });
                }
                SessionSliceAssigner::from_millis(gap_ms)?
                    .with_time_zone(zone)
                    .with_time_attribute(attr)
                    .into()
            }
        };

        tracing::debug!(
            kind = assigner.kind(),
            time_zone = %zone,
            time_attribute = ?attr,
            "built slice assigner"
        );
        Ok(assigner)
    }
}
