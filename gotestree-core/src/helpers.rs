// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for gotestree-core.

use std::time::Duration;

/// Utilities for pluralizing words based on count.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "run" if `count` is 1, otherwise "runs".
    pub(crate) fn runs_str(count: usize) -> &'static str {
        if count == 1 { "run" } else { "runs" }
    }
}

/// Formats a test duration the way `go test` prints it: fractional seconds
/// with two decimal places.
pub(crate) fn display_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Converts an optional duration to fractional seconds for serializable
/// summaries.
pub(crate) fn duration_secs(duration: Option<Duration>) -> Option<f64> {
    duration.map(|d| d.as_secs_f64())
}

/// Serde support for `Option<Duration>` as fractional seconds.
pub(crate) mod serde_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    // The signature is fixed by serde's `with` contract.
    #[allow(clippy::ref_option)]
    pub(crate) fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs_f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_display() {
        assert_eq!(display_duration(Duration::from_millis(10)), "0.01s");
        assert_eq!(display_duration(Duration::from_millis(1240)), "1.24s");
        assert_eq!(display_duration(Duration::ZERO), "0.00s");
    }
}
