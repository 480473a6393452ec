use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use tracing::trace;

use crate::{AgentError, AgentResult};

/// Resolves a script file path below `root`.
///
/// Only plain relative paths are accepted: absolute paths and `..`
/// components are rejected.
pub fn resolve_below(root: &Path, relative: &str) -> AgentResult<PathBuf> {
    let rel = Path::new(relative);
    let plain = !relative.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(AgentError::Staging(format!(
            "refusing to write outside the submit directory: {relative}"
        )));
    }
    Ok(root.join(rel))
}

/// Writes every file below `root`, creating parent directories.
pub async fn stage_files(root: &Path, files: &BTreeMap<String, String>) -> AgentResult<()> {
    let targets = files
        .iter()
        .map(|(rel, content)| Ok((resolve_below(root, rel)?, content)))
        .collect::<AgentResult<Vec<_>>>()?;

    for (path, content) in targets {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::Staging(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| AgentError::Staging(format!("{}: {e}", path.display())))?;
        trace!(path = %path.display(), "staged file");
    }
    Ok(())
}
