// src/hooks/project.rs
// Project root detection by walking `cwd` upward for a `.claude` marker
// directory (spec §3, grounded on original_source's
// EnvironmentConfig.find_project_root / _walk_up_for_project behavior).

use std::path::{Path, PathBuf};

const MARKER: &str = ".claude";

/// Walk `start` upward looking for a directory containing a `.claude`
/// subdirectory. Returns `None` if the filesystem root is reached first.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(MARKER).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// `CLAUDE_PROJECT_DIR` takes precedence over walking when set.
pub fn resolve_project_root(cwd: &Path) -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CLAUDE_PROJECT_DIR") {
        return Some(PathBuf::from(dir));
    }
    find_project_root(cwd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_marker_by_walking_up() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("project");
        let deep = project_dir.join("src/lib/utils");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::create_dir_all(project_dir.join(".claude")).unwrap();

        assert_eq!(find_project_root(&deep), Some(project_dir));
    }

    #[test]
    fn returns_none_when_no_marker_present() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_project_root(tmp.path()), None);
    }
}
