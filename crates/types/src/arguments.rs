use serde::{Deserialize, Serialize};

/// How the parser stores an argument's value.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgumentKind {
    /// Store the single value given.
    #[default]
    Store,
    /// Boolean switch, `true` when present.
    StoreTrue,
    /// Counts repetitions (`-v -v`).
    Count,
    /// Accepts several words and joins them with a single space.
    StringJoin,
}

/// Type the parser validates a stored value against.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Int,
    Float,
    Bool,
}

/// Declarative description of one command argument.
///
/// An argument without `long` and `short` is positional. `dest` is the name
/// the command body uses to read the parsed value back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub dest: String,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub short: Option<char>,
    #[serde(default)]
    pub kind: ArgumentKind,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
    /// Allowed values; empty means unrestricted.
    #[serde(default)]
    pub choices: Vec<String>,
}

impl ArgumentSpec {
    /// A required positional argument.
    pub fn positional(dest: impl Into<String>) -> Self {
        Self {
            dest: dest.into(),
            required: true,
            ..Default::default()
        }
    }

    /// An option reachable as `--<dest>` (and `-<dest>` in legacy form).
    pub fn option(dest: impl Into<String>) -> Self {
        let dest = dest.into();
        Self {
            long: Some(dest.clone()),
            dest,
            ..Default::default()
        }
    }

    /// A boolean switch reachable as `--<dest>`.
    pub fn switch(dest: impl Into<String>) -> Self {
        Self::option(dest).kind(ArgumentKind::StoreTrue)
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    pub fn kind(mut self, kind: ArgumentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_positional(&self) -> bool {
        self.long.is_none() && self.short.is_none()
    }

    /// Every spelling a user may type for this argument, for help checks.
    pub fn flag_spellings(&self) -> Vec<String> {
        let mut spellings = Vec::new();
        if let Some(short) = self.short {
            spellings.push(format!("-{short}"));
        }
        if let Some(long) = &self.long {
            spellings.push(format!("--{long}"));
        }
        spellings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_describe_option_and_positional() {
        let id = ArgumentSpec::option("id").short('i').help("entity id");
        assert!(!id.is_positional());
        assert_eq!(id.flag_spellings(), vec!["-i".to_string(), "--id".to_string()]);

        let name = ArgumentSpec::positional("name");
        assert!(name.is_positional());
        assert!(name.required);
        assert!(name.flag_spellings().is_empty());
    }

    #[test]
    fn deserializes_with_defaults() {
        let spec: ArgumentSpec = serde_yaml::from_str("dest: desc\nlong: desc\nkind: string-join\n").expect("yaml");
        assert_eq!(spec.kind, ArgumentKind::StringJoin);
        assert_eq!(spec.value_type, ValueType::String);
        assert!(!spec.required);
    }
}
