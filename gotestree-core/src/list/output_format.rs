// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::OutputFormatParseError;
use std::str::FromStr;

/// Output formats for presenting discovery and run data.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum OutputFormat {
    /// A human-readable output format.
    #[default]
    Human,

    /// Machine-readable JSON.
    Json,
}

impl OutputFormat {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["human", "json"]
    }
}

impl FromStr for OutputFormat {
    type Err = OutputFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "human" => OutputFormat::Human,
            "json" => OutputFormat::Json,
            other => return Err(OutputFormatParseError::new(other)),
        };
        Ok(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_variants() {
        for &variant in OutputFormat::variants() {
            variant.parse::<OutputFormat>().unwrap();
        }
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
