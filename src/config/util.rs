//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`.
/// An absolute `config_name` is returned as-is if it exists.
///
/// # Example
/// ```text
/// /home/user/models/parts/  ← start
/// /home/user/livewatch.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_start_dir() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("livewatch.toml");
        fs::write(&config, "").unwrap();

        let found = find_config_file(Path::new("livewatch.toml"), temp.path());
        assert_eq!(found, Some(config));
    }

    #[test]
    fn test_find_config_in_ancestor() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let config = temp.path().join("livewatch.toml");
        fs::write(&config, "").unwrap();

        let found = find_config_file(Path::new("livewatch.toml"), &nested);
        assert_eq!(found, Some(config));
    }

    #[test]
    fn test_find_config_absolute() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("custom.toml");

        assert_eq!(find_config_file(&config, temp.path()), None);
        fs::write(&config, "").unwrap();
        assert_eq!(find_config_file(&config, Path::new("/")), Some(config));
    }

    #[test]
    fn test_find_config_directory_not_matched() {
        let temp = TempDir::new().unwrap();
        let name = "livewatch-config-dir-x9.toml";
        fs::create_dir(temp.path().join(name)).unwrap();
        assert_eq!(find_config_file(Path::new(name), temp.path()), None);
    }
}
