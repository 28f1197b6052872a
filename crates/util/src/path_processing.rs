use std::path::PathBuf;

use dirs_next::home_dir;

/// Expand a leading `~` to the user's home directory.
///
/// Both `~/` and `~\` prefixes are recognised. `~user` forms are left alone,
/// as is everything when no home directory can be found.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let remainder = match trimmed.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with(['/', '\\']) => &rest[1..],
        _ => return PathBuf::from(trimmed),
    };
    match home_dir() {
        Some(home) if remainder.is_empty() => home,
        Some(home) => home.join(remainder),
        None => PathBuf::from(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_tilde(" /etc/runway "), PathBuf::from("/etc/runway"));
        assert_eq!(expand_tilde("~someone/models"), PathBuf::from("~someone/models"));
    }

    #[test]
    fn both_separators_join_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/runway"), home.join("runway"));
            assert_eq!(expand_tilde("~\\runway"), home.join("runway"));
        }
    }
}
