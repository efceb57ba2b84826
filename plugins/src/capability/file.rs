use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use taskweave_core::api::{Capability, CapabilityArgs, CapabilityError};
use tokio_util::sync::CancellationToken;

/// Read, write and list files under a fixed set of roots.
#[derive(Debug, Clone)]
pub struct FileCapability {
    allowed: Vec<PathBuf>,
}

impl FileCapability {
    pub fn new<I, P>(allowed_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            allowed: allowed_paths
                .into_iter()
                .filter_map(|p| resolve(p.as_ref()))
                .collect(),
        }
    }

    fn check(&self, raw: &str) -> Result<PathBuf, CapabilityError> {
        let denied = || CapabilityError::Execution(format!("access to path {raw} is not allowed"));
        let path = resolve(Path::new(raw)).ok_or_else(denied)?;
        if self.allowed.iter().any(|root| path.starts_with(root)) {
            Ok(path)
        } else {
            Err(denied())
        }
    }
}

// Anchors relative paths at the working directory so a root of `.` never
// collapses to an empty prefix.
fn resolve(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        lexical(path)
    } else {
        lexical(&std::env::current_dir().ok()?.join(path))
    }
}

// Drops `.` components; rejects `..` so a path cannot climb out of a root.
fn lexical(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => return None,
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

fn required<'a>(args: &'a CapabilityArgs, key: &str) -> Result<&'a str, CapabilityError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CapabilityError::InvalidArgs(format!("missing required parameter: {key}")))
}

#[async_trait]
impl Capability for FileCapability {
    fn name(&self) -> &str {
        "file"
    }

    fn description(&self) -> &str {
        "Read, write and list files (text and JSON)"
    }

    fn validate(&self, args: &CapabilityArgs) -> Result<(), CapabilityError> {
        match required(args, "operation")? {
            "read" | "write" | "parse_json" => required(args, "path").map(|_| ()),
            "list" => required(args, "directory").map(|_| ()),
            other => Err(CapabilityError::InvalidArgs(format!(
                "unsupported operation: {other}"
            ))),
        }
    }

    async fn invoke(
        &self,
        _cancel: CancellationToken,
        args: CapabilityArgs,
    ) -> Result<Value, CapabilityError> {
        let operation = required(&args, "operation")?;
        tracing::debug!(target: "taskweave.capability", capability = "file", operation = %operation);

        match operation {
            "read" => {
                let path = self.check(required(&args, "path")?)?;
                let content = tokio::fs::read_to_string(&path).await?;
                Ok(json!({
                    "path": path.to_string_lossy(),
                    "size": content.len(),
                    "content": content,
                }))
            }
            "write" => {
                let path = self.check(required(&args, "path")?)?;
                let content = required(&args, "content")?;
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
                tokio::fs::write(&path, content).await?;
                Ok(json!({
                    "path": path.to_string_lossy(),
                    "size": content.len(),
                    "message": "File written successfully",
                }))
            }
            "list" => {
                let dir = self.check(required(&args, "directory")?)?;
                let mut entries = tokio::fs::read_dir(&dir).await?;
                let mut files = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    let Ok(meta) = entry.metadata().await else {
                        continue;
                    };
                    let modified = meta.modified().ok().map(DateTime::<Utc>::from);
                    files.push(json!({
                        "path": entry.path().to_string_lossy(),
                        "name": entry.file_name().to_string_lossy(),
                        "size": meta.len(),
                        "is_dir": meta.is_dir(),
                        "modified": modified,
                    }));
                }
                files.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
                Ok(json!({
                    "directory": dir.to_string_lossy(),
                    "count": files.len(),
                    "files": files,
                }))
            }
            "parse_json" => {
                let path = self.check(required(&args, "path")?)?;
                let content = tokio::fs::read_to_string(&path).await?;
                let data: Value = serde_json::from_str(&content).map_err(|e| {
                    CapabilityError::Execution(format!("failed to parse JSON: {e}"))
                })?;
                Ok(json!({ "path": path.to_string_lossy(), "data": data }))
            }
            other => Err(CapabilityError::Execution(format!(
                "unsupported operation: {other}"
            ))),
        }
    }
}
