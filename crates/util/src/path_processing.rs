use std::path::PathBuf;

use dirs_next::home_dir;

/// Directory holding the CLI's configuration tree (`~/.beehive3`).
pub const BEEHIVE_HOME_DIR: &str = ".beehive3";

pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// `$HOME/.beehive3`, falling back to a relative path when no home exists.
pub fn beehive_home() -> PathBuf {
    home_dir().unwrap_or_else(|| PathBuf::from(".")).join(BEEHIVE_HOME_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_leading_tilde_only() {
        temp_env::with_var("HOME", Some("/home/ops"), || {
            assert_eq!(expand_tilde("~/cfg/beehive.yml"), PathBuf::from("/home/ops/cfg/beehive.yml"));
            assert_eq!(expand_tilde("~"), PathBuf::from("/home/ops"));
            assert_eq!(expand_tilde("/etc/~x"), PathBuf::from("/etc/~x"));
            assert_eq!(beehive_home(), PathBuf::from("/home/ops/.beehive3"));
        });
    }
}
