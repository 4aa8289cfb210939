//! Log line format selection.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the client renders log lines on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened.
    #[default]
    Json,
    /// Single human-readable line per event.
    Compact,
}

/// Raised when `LIQI_LOG_FORMAT` names neither format.
pub type LogFormatParseError = strum::ParseError;
