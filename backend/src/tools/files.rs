//! Built-in file tools.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use tracing::info;
use xmind_mcp_types::ToolDescriptor;

use super::{ToolError, ToolProvider};

const LIST_XMIND_FILES: &str = "list_xmind_files";
const XMIND_EXTENSION: &str = "xmind";

#[derive(Debug, Deserialize)]
struct ListFilesArgs {
    #[serde(default = "default_directory")]
    directory: String,
    #[serde(default = "default_recursive")]
    recursive: bool,
}

fn default_directory() -> String {
    ".".to_string()
}

fn default_recursive() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct XmindFileEntry {
    name: String,
    /// Path relative to the tools root.
    path: String,
    size: u64,
}

/// Lists `.xmind` files below a fixed root directory.
#[derive(Debug, Clone)]
pub struct FileTools {
    root: PathBuf,
}

impl FileTools {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a client-supplied directory, refusing anything outside the root.
    ///
    /// Returns the canonical root and the canonical start directory. A
    /// symlink below the root that points elsewhere is rejected.
    async fn resolve(&self, directory: &str) -> Result<(PathBuf, PathBuf), ToolError> {
        let relative = Path::new(directory);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(outside_root(directory)),
            }
        }

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .with_context(|| format!("cannot resolve tools root {}", self.root.display()))?;
        let start = tokio::fs::canonicalize(root.join(relative))
            .await
            .with_context(|| format!("cannot read directory {}", directory))?;
        if !start.starts_with(&root) {
            return Err(outside_root(directory));
        }
        Ok((root, start))
    }

    async fn list_xmind_files(&self, args: ListFilesArgs) -> Result<Value, ToolError> {
        let (root, start) = self.resolve(&args.directory).await?;
        info!(
            "MCP: Listing xmind files in {} (recursive: {})",
            start.display(),
            args.recursive
        );

        let mut files = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("cannot read directory {}", dir.display()))?;
            while let Some(entry) = entries.next_entry().await.context("directory walk failed")? {
                let path = entry.path();
                // Does not follow links; symlinked entries are skipped.
                let file_type = entry.file_type().await.context("cannot stat entry")?;
                if file_type.is_symlink() {
                    continue;
                }
                if file_type.is_dir() {
                    if args.recursive {
                        pending.push(path);
                    }
                    continue;
                }
                let is_xmind = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(XMIND_EXTENSION));
                if file_type.is_file() && is_xmind {
                    let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                    let relative = path.strip_prefix(&root).unwrap_or(&path);
                    files.push(XmindFileEntry {
                        name: entry.file_name().to_string_lossy().into_owned(),
                        path: relative.to_string_lossy().into_owned(),
                        size,
                    });
                }
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(json!({
            "status": "success",
            "directory": args.directory,
            "count": files.len(),
            "files": files,
        }))
    }
}

fn outside_root(directory: &str) -> ToolError {
    ToolError::InvalidParams(format!(
        "directory must stay inside the tools root: {}",
        directory
    ))
}

#[async_trait]
impl ToolProvider for FileTools {
    fn name(&self) -> &str {
        "files"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(vec![ToolDescriptor::new(
            LIST_XMIND_FILES,
            "List XMind files in a directory below the server's tools root",
            json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory relative to the tools root",
                        "default": "."
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": "Descend into subdirectories",
                        "default": true
                    }
                },
                "required": []
            }),
        )])
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Option<Value>, ToolError> {
        match tool {
            LIST_XMIND_FILES => {
                let arguments = if arguments.is_null() { json!({}) } else { arguments };
                let args: ListFilesArgs = serde_json::from_value(arguments)
                    .map_err(|e| ToolError::InvalidParams(e.to_string()))?;
                self.list_xmind_files(args).await.map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plan.xmind"), b"zip").unwrap();
        fs::write(dir.path().join("notes.md"), b"# notes").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.XMIND"), b"zip").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_lists_recursively_by_default() {
        let dir = fixture();
        let tools = FileTools::new(dir.path());

        let result = tools
            .call_tool(LIST_XMIND_FILES, json!({}))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result["count"], 2);
        let names: Vec<&str> = result["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"plan.xmind"));
        assert!(names.contains(&"deep.XMIND"));
    }

    #[tokio::test]
    async fn test_non_recursive() {
        let dir = fixture();
        let tools = FileTools::new(dir.path());

        let result = tools
            .call_tool(LIST_XMIND_FILES, json!({"recursive": false}))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result["count"], 1);
        assert_eq!(result["files"][0]["name"], "plan.xmind");
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = fixture();
        let tools = FileTools::new(dir.path());

        for directory in ["..", "/etc", "nested/../../x"] {
            let err = tools
                .call_tool(LIST_XMIND_FILES, json!({ "directory": directory }))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidParams(_)), "{}", directory);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_do_not_escape_root() {
        let dir = fixture();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.xmind"), b"zip").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.xmind"),
            dir.path().join("alias.xmind"),
        )
        .unwrap();
        let tools = FileTools::new(dir.path());

        let err = tools
            .call_tool(LIST_XMIND_FILES, json!({"directory": "link"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));

        // The walk from the root skips both links.
        let result = tools
            .call_tool(LIST_XMIND_FILES, json!({}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result["count"], 2);
        let paths: Vec<&str> = result["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap())
            .collect();
        assert!(paths.iter().all(|p| !p.contains("secret") && !p.contains("alias")));
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = fixture();
        let tools = FileTools::new(dir.path());
        let err = tools
            .call_tool(LIST_XMIND_FILES, json!({"directory": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));
    }

    #[tokio::test]
    async fn test_other_tools_are_not_handled() {
        let tools = FileTools::new(".");
        assert!(tools.call_tool("read_xmind_file", json!({})).await.unwrap().is_none());
    }
}
