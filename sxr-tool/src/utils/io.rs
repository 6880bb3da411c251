//! Loading and writing skeleton descriptions

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sxr_anim::{Skeleton, SkeletonDescription};

/// Read a JSON skeleton description
pub fn load_description(path: &Path) -> Result<SkeletonDescription> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read skeleton from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid skeleton description in {}", path.display()))
}

/// Read and validate a JSON skeleton description
pub fn load_skeleton(path: &Path) -> Result<Arc<Skeleton>> {
    let desc = load_description(path)?;
    let skeleton = Skeleton::from_description(&desc)
        .with_context(|| format!("Invalid skeleton in {}", path.display()))?;
    log::debug!(
        "Loaded skeleton {} with {} bones from {}",
        skeleton.id(),
        skeleton.num_bones(),
        path.display()
    );
    Ok(Arc::new(skeleton))
}

/// Write text to a file, or to stdout when no path is given
pub fn write_output(output: Option<&PathBuf>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
