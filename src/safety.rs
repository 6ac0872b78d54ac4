//! Guard against clobbering the collection database with JSON output.
//!
//! The unifier reads and writes next to the collectors' SQLite file; a
//! mistyped `--output` must never replace it.

use anyhow::{bail, Result};
use std::path::Path;

/// Extensions that identify a database rather than an export
const DATABASE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

/// Check that `output` is safe to create or overwrite.
///
/// The file name must contain `required_pattern` (e.g. "unified"), must not
/// carry a database extension, and must differ from every source path.
pub fn validate_output_path(
    output: &Path,
    required_pattern: &str,
    source_paths: &[&Path],
) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if let Some(ext) = extension {
        if DATABASE_EXTENSIONS.contains(&ext.as_str()) {
            bail!(
                "Safety check failed: output '{}' looks like a database (.{})",
                output.display(),
                ext
            );
        }
    }

    Ok(())
}
