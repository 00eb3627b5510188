//! ANSI styling for terminal output.
//!
//! [`StyleEngine`] wraps text in SGR sequences for a closed set of named
//! styles. A disabled engine returns every input unchanged, which is how
//! colorization is suppressed for JSON/YAML output and non-terminal stdout.

use std::{fmt, str::FromStr};

use owo_colors::OwoColorize;

/// Named text styles.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Style {
    Red,
    Green,
    Yellow,
    Gray,
    Cyan,
    Blue,
    LightYellow,
    LightRed,
    LightGreen,
    Bold,
    Underline,
    Reverse,
}

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "gray" | "grey" => Ok(Self::Gray),
            "cyan" => Ok(Self::Cyan),
            "blue" => Ok(Self::Blue),
            "light-yellow" => Ok(Self::LightYellow),
            "light-red" => Ok(Self::LightRed),
            "light-green" => Ok(Self::LightGreen),
            "bold" => Ok(Self::Bold),
            "underline" => Ok(Self::Underline),
            "reverse" => Ok(Self::Reverse),
            other => Err(UnknownStyle(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStyle(pub String);

impl fmt::Display for UnknownStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown style '{}'", self.0)
    }
}

impl std::error::Error for UnknownStyle {}

/// Style for a semantic platform state, matched case-insensitively.
///
/// Returns `None` for values outside the known palette.
pub fn state_style(state: &str) -> Option<Style> {
    match state.trim().to_ascii_lowercase().as_str() {
        "error" | "failure" | "ko" => Some(Style::Red),
        "active" | "success" | "running" | "available" | "ok" => Some(Style::Green),
        "stopped" | "deleted" => Some(Style::Gray),
        "building" => Some(Style::Cyan),
        "pending" => Some(Style::Blue),
        "closed" => Some(Style::LightYellow),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleEngine {
    enabled: bool,
}

impl StyleEngine {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, text: &str, style: Style) -> String {
        if !self.enabled {
            return text.to_string();
        }
        match style {
            Style::Red => text.red().to_string(),
            Style::Green => text.green().to_string(),
            Style::Yellow => text.yellow().to_string(),
            Style::Gray => text.bright_black().to_string(),
            Style::Cyan => text.cyan().to_string(),
            Style::Blue => text.blue().to_string(),
            Style::LightYellow => text.bright_yellow().to_string(),
            Style::LightRed => text.bright_red().to_string(),
            Style::LightGreen => text.bright_green().to_string(),
            Style::Bold => text.bold().to_string(),
            Style::Underline => text.underline().to_string(),
            Style::Reverse => text.reversed().to_string(),
        }
    }

    /// Color a semantic state (`active`, `error`, ...); other text is returned as-is.
    pub fn color_error(&self, state: &str) -> String {
        match state_style(state) {
            Some(style) => self.paint(state, style),
            None => state.to_string(),
        }
    }

    /// Accent used for table headers.
    pub fn header(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        text.blue().bold().to_string()
    }

    /// Underlined section title used by the mixed renderer.
    pub fn title(&self, text: &str) -> String {
        self.paint(text, Style::Underline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_error_maps_the_known_palette() {
        let engine = StyleEngine::new(true);
        assert_eq!(engine.color_error("ERROR"), "\u{1b}[31mERROR\u{1b}[39m");
        assert_eq!(engine.color_error("active"), "\u{1b}[32mactive\u{1b}[39m");
        assert_eq!(engine.color_error("Deleted"), "\u{1b}[90mDeleted\u{1b}[39m");
        assert_eq!(engine.color_error("building"), "\u{1b}[36mbuilding\u{1b}[39m");
        assert_eq!(engine.color_error("pending"), "\u{1b}[34mpending\u{1b}[39m");
        assert_eq!(engine.color_error("closed"), "\u{1b}[93mclosed\u{1b}[39m");
    }

    #[test]
    fn color_error_is_identity_on_unknown_states() {
        let engine = StyleEngine::new(true);
        assert_eq!(engine.color_error("rebooting"), "rebooting");
        assert_eq!(engine.color_error(""), "");
    }

    #[test]
    fn color_error_is_deterministic() {
        let engine = StyleEngine::new(true);
        for state in ["ok", "KO", "running", "stopped"] {
            assert_eq!(engine.color_error(state), engine.color_error(state));
        }
    }

    #[test]
    fn disabled_engine_never_emits_escapes() {
        let engine = StyleEngine::disabled();
        assert_eq!(engine.paint("x", Style::Red), "x");
        assert_eq!(engine.color_error("error"), "error");
        assert_eq!(engine.header("id"), "id");
    }

    #[test]
    fn parses_style_names() {
        assert_eq!("light_yellow".parse::<Style>(), Ok(Style::LightYellow));
        assert_eq!("grey".parse::<Style>(), Ok(Style::Gray));
        assert!("magenta".parse::<Style>().is_err());
    }
}
