//! Test fixtures for creating reproducible project directories.
//!
//! Provides temporary projects, optionally backed by a real git repository
//! driven through the `git` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A test fixture representing a temporary project directory.
///
/// Automatically cleans up when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::with_git_repo();
/// fixture.checkout_new_branch("feature/ABC-1");
/// fixture.commit_file("A.java", "add A");
/// // Directory is cleaned up when fixture goes out of scope
/// ```
pub struct TestFixture {
    temp_dir: TempDir,
    is_git_repo: bool,
}

impl TestFixture {
    /// Create an empty project directory.
    ///
    /// # Panics
    ///
    /// Panics if temporary directory creation fails.
    #[must_use]
    pub fn empty_project() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            is_git_repo: false,
        }
    }

    /// Create a project with a git repository on `master` holding one
    /// initial commit.
    ///
    /// # Panics
    ///
    /// Panics if git initialization fails.
    #[must_use]
    pub fn with_git_repo() -> Self {
        let mut fixture = Self::empty_project();
        fixture.is_git_repo = true;

        fixture.git(&["init", "-q"]);
        // Independent of the host's init.defaultBranch
        fixture.git(&["symbolic-ref", "HEAD", "refs/heads/master"]);
        fixture.git(&["config", "user.email", "test@example.com"]);
        fixture.git(&["config", "user.name", "Test User"]);
        fixture.git(&["config", "commit.gpgsign", "false"]);
        fixture.git(&["config", "tag.gpgsign", "false"]);

        fixture
            .write_file("README.md", "# Fixture\n")
            .expect("Failed to write README.md");
        fixture.make_commit("Initial commit");

        fixture
    }

    /// Get the path to the fixture directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path as a PathBuf (owned).
    #[must_use]
    pub fn path_buf(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Check if this is a git repository.
    #[must_use]
    pub fn is_git_repo(&self) -> bool {
        self.is_git_repo && self.temp_dir.path().join(".git").exists()
    }

    /// Write a file to the fixture directory, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_file(&self, relative_path: &str, content: &str) -> std::io::Result<()> {
        let path = self.temp_dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    /// Read a file from the fixture directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, relative_path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.temp_dir.path().join(relative_path))
    }

    /// Delete a file from the working tree.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be removed.
    pub fn remove_file(&self, relative_path: &str) {
        std::fs::remove_file(self.temp_dir.path().join(relative_path))
            .expect("Failed to remove file");
    }

    /// Run a git command in the fixture and return its stdout.
    ///
    /// # Panics
    ///
    /// Panics if not a git repo or the command fails.
    pub fn git(&self, args: &[&str]) -> String {
        assert!(self.is_git_repo, "Not a git repository");

        let output = Command::new("git")
            .args(args)
            .current_dir(self.temp_dir.path())
            .output()
            .expect("Failed to run git");

        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );

        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Stage everything and commit.
    ///
    /// # Panics
    ///
    /// Panics if not a git repo or commit fails.
    pub fn make_commit(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "--allow-empty", "-m", message]);
    }

    /// Write `relative_path` with `message` as content and commit it.
    ///
    /// # Panics
    ///
    /// Panics if the write or the commit fails.
    pub fn commit_file(&self, relative_path: &str, message: &str) {
        self.write_file(relative_path, message)
            .expect("Failed to write file");
        self.make_commit(message);
    }

    /// Create and switch to a new branch at HEAD.
    ///
    /// # Panics
    ///
    /// Panics if the branch cannot be created.
    pub fn checkout_new_branch(&self, name: &str) {
        self.git(&["checkout", "-q", "-b", name]);
    }

    /// Get the current git commit hash.
    ///
    /// # Panics
    ///
    /// Panics if not a git repo or command fails.
    #[must_use]
    pub fn get_commit_hash(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_project_is_not_git() {
        let fixture = TestFixture::empty_project();
        assert!(fixture.path().exists());
        assert!(!fixture.is_git_repo());
    }

    #[test]
    fn test_with_git_repo_initializes_git_on_master() {
        let fixture = TestFixture::with_git_repo();
        assert!(fixture.is_git_repo());
        assert_eq!(fixture.git(&["rev-parse", "--abbrev-ref", "HEAD"]), "master");
    }

    #[test]
    fn test_write_file_creates_directories() {
        let fixture = TestFixture::empty_project();
        fixture
            .write_file("build/reports/detekt/detekt.xml", "<checkstyle/>")
            .unwrap();
        assert_eq!(
            fixture.read_file("build/reports/detekt/detekt.xml").unwrap(),
            "<checkstyle/>"
        );
    }

    #[test]
    fn test_commit_file_moves_head() {
        let fixture = TestFixture::with_git_repo();
        let initial_hash = fixture.get_commit_hash();

        fixture.commit_file("new_file.txt", "Add new file");

        assert_ne!(initial_hash, fixture.get_commit_hash());
    }

    #[test]
    fn test_path_methods() {
        let fixture = TestFixture::empty_project();
        assert_eq!(fixture.path(), fixture.path_buf().as_path());
    }
}
