use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the worker claims the PID marker at startup.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MarkerPolicy {
    /// Replace whatever the marker holds. Two racing starts both succeed and
    /// the last writer wins.
    #[default]
    Overwrite,
    /// Create the marker only if it is absent. A live owner rejects the
    /// start; a stale marker is cleared and the claim retried once.
    Exclusive,
}
