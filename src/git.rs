//! Git HEAD lookup for the report header.

use std::path::Path;

/// Characters of the commit id shown in the report.
const SHORT_ID_LEN: usize = 7;

/// Short id of the commit HEAD points at.
///
/// `None` when `root` is not inside a repository, HEAD is unborn, or the
/// repository cannot be opened. Never an error: the head is decoration.
pub fn head_short(root: &Path) -> Option<String> {
    let repo = match git2::Repository::discover(root) {
        Ok(repo) => repo,
        Err(err) => {
            tracing::debug!(error = %err, "no git repository");
            return None;
        }
    };
    let head = repo.head().ok()?;
    let oid = head.target()?;
    let id = oid.to_string();
    Some(id[..SHORT_ID_LEN.min(id.len())].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_directory_has_no_head() {
        let temp = TempDir::new().unwrap();
        assert_eq!(head_short(temp.path()), None);
    }

    #[test]
    fn test_head_of_fresh_commit() {
        let temp = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("a.txt")).unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("t", "t@example.com").unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
            .unwrap();

        let head = head_short(temp.path()).unwrap();
        assert_eq!(head.len(), 7);
        assert!(oid.to_string().starts_with(&head));
    }
}
