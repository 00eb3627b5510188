use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Output format requested with `-f/--format`.
///
/// Each format selects one handler of the render registry. `Text` and
/// `ColorText` switch to the vertical details handler on their own when a
/// command asks for details mode.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    ColorText,
    Json,
    Yaml,
    Mixed,
    Dynamic,
}

impl OutputFormat {
    /// Every accepted spelling, in the order shown by `--help`.
    pub const NAMES: [&'static str; 6] = ["text", "colortext", "json", "yaml", "mixed", "dynamic"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::ColorText => "colortext",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Mixed => "mixed",
            Self::Dynamic => "dynamic",
        }
    }

    /// Textual formats print paging headers and may be colorized.
    pub fn is_textual(&self) -> bool {
        !matches!(self, Self::Json | Self::Yaml)
    }

    /// Formats whose handlers apply ANSI styling by default.
    pub fn is_colored(&self) -> bool {
        matches!(self, Self::ColorText | Self::Mixed)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseOutputFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "colortext" => Ok(Self::ColorText),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "mixed" => Ok(Self::Mixed),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(ParseOutputFormatError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutputFormatError(pub String);

impl fmt::Display for ParseOutputFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid output format '{}'; expected one of {}", self.0, OutputFormat::NAMES.join(", "))
    }
}

impl Error for ParseOutputFormatError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_advertised_name() {
        for name in OutputFormat::NAMES {
            let format: OutputFormat = name.parse().expect("advertised name parses");
            assert_eq!(format.as_str(), name);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn json_and_yaml_are_not_textual() {
        assert!(!OutputFormat::Json.is_textual());
        assert!(!OutputFormat::Yaml.is_textual());
        assert!(OutputFormat::ColorText.is_textual());
    }
}
