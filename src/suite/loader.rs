//! Test file discovery and loading
//!
//! Test files are YAML sequences. Each item is either a standalone case
//! or a session holding several cases:
//!
//! ```yaml
//! - test: |
//!     Go to https://example.com and verify the heading is visible.
//!   use_vision: true
//!
//! - session: Form submission test
//!   allowed_domains: ["https://*.example.com"]
//!   tests:
//!     - task: Fill in and submit the form.
//!       initial_actions:
//!         - action: go_to_url
//!           arguments: { url: "https://example.com/form" }
//!     - task: Verify the confirmation page.
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

use super::builder::{CaseOptions, SessionOptions, SuiteBuilder};
use super::model::TestAction;

/// File extensions recognized as test files
pub const TEST_FILE_EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Entry {
    Session(SessionEntry),
    Case(CaseEntry),
}

#[derive(Deserialize, Debug)]
struct SessionEntry {
    session: String,
    allowed_domains: Option<Vec<String>>,
    #[serde(default)]
    tests: Vec<CaseSpec>,
}

#[derive(Deserialize, Debug)]
struct CaseEntry {
    test: String,
    #[serde(default)]
    initial_actions: Vec<TestAction>,
    use_vision: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct CaseSpec {
    task: String,
    #[serde(default)]
    initial_actions: Vec<TestAction>,
    use_vision: Option<bool>,
}

/// Find test files: the path itself if it is a file, else every test file below it
pub fn discover_test_files(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let files = if metadata.is_file() {
        vec![path.to_path_buf()]
    } else {
        let mut files = Vec::new();
        walk(path, &mut files)?;
        files.sort();
        files
    };

    if files.is_empty() {
        return Err(Error::NoTestFiles {
            path: path.display().to_string(),
        });
    }
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if is_test_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_test_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEST_FILE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Register every entry of one test file, returning the number of sessions added
pub fn load_file(path: &Path, builder: &mut SuiteBuilder) -> Result<usize> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    load_str(path, &content, builder)
}

/// Register entries from YAML text; `path` is only used for error messages
pub fn load_str(path: &Path, content: &str, builder: &mut SuiteBuilder) -> Result<usize> {
    if content.trim().is_empty() {
        return Ok(0);
    }

    let entries: Option<Vec<Entry>> =
        serde_yaml::from_str(content).map_err(|e| Error::test_file(path, e))?;
    let entries = entries.unwrap_or_default();
    let count = entries.len();

    for entry in entries {
        match entry {
            Entry::Case(case) => {
                builder.test_case(
                    case.test,
                    CaseOptions {
                        initial_actions: case.initial_actions,
                        use_vision: case.use_vision,
                    },
                );
            }
            Entry::Session(session) => {
                if session.tests.is_empty() {
                    tracing::warn!(
                        file = %path.display(),
                        session = %session.session,
                        "Test session has no test cases"
                    );
                }
                let mut pending = builder.test_session(
                    session.session,
                    SessionOptions {
                        allowed_domains: session.allowed_domains,
                    },
                );
                for case in session.tests {
                    pending = pending.test_case(
                        case.task,
                        CaseOptions {
                            initial_actions: case.initial_actions,
                            use_vision: case.use_vision,
                        },
                    );
                }
                pending.commit();
            }
        }
    }

    Ok(count)
}

/// Discover and load all test files under `path`
///
/// `on_file` sees each file just before it is loaded.
pub fn load_path<F>(path: &Path, builder: &mut SuiteBuilder, mut on_file: F) -> Result<Vec<PathBuf>>
where
    F: FnMut(&Path),
{
    let files = discover_test_files(path)?;
    for file in &files {
        on_file(file);
        let sessions = load_file(file, builder)?;
        tracing::debug!(file = %file.display(), sessions, "Loaded test file");
    }
    Ok(files)
}
