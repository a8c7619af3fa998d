//! Backend handoff
//!
//! Writes a compiled model where a backend emitter picks it up: one JSON
//! document per file plus a manifest.
//!
//! ```text
//! out/
//! ├── pkg/a.proto.json
//! ├── pkg/b.proto.json
//! └── manifest.json
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::checksum::Checksum;
use crate::config::OutputFormat;
use crate::error::{Result, SchemaError};
use crate::pipeline::CompileOutput;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Index of a written model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Declared proto paths, in model order
    pub files: Vec<String>,
    /// Checksum of the model in canonical form
    pub checksum: Checksum,
    /// Roots the model was filtered to; absent when nothing was filtered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<String>>,
}

fn to_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let json = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(json)
}

/// Document path for a proto file path, rejecting paths that escape `out_dir`
fn document_path(out_dir: &Path, proto_path: &str) -> Result<PathBuf> {
    let relative = Path::new(proto_path);
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        return Err(SchemaError::InvalidFormat(format!(
            "file path escapes the output directory: {}",
            proto_path
        )));
    }
    Ok(out_dir.join(format!("{}.json", proto_path)))
}

/// Write every file of `output` and a manifest under `out_dir`
pub fn write_model(
    out_dir: &Path,
    output: &CompileOutput,
    roots: Option<&[String]>,
    format: OutputFormat,
) -> Result<Manifest> {
    // Reject the whole model before anything touches the disk
    let targets = output
        .files
        .iter()
        .map(|file| Ok((document_path(out_dir, &file.path)?, file)))
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(out_dir)?;

    for (target, file) in targets {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, to_json(file, format)?)?;
        debug!(path = %target.display(), "wrote model file");
    }

    let manifest = Manifest {
        files: output.files.iter().map(|f| f.path.clone()).collect(),
        checksum: output.checksum.clone(),
        roots: roots.map(<[String]>::to_vec),
    };
    fs::write(out_dir.join(MANIFEST_FILE), to_json(&manifest, format)?)?;
    Ok(manifest)
}

/// Read a manifest written by [`write_model`]
pub fn read_manifest(out_dir: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(out_dir.join(MANIFEST_FILE))?;
    Ok(serde_json::from_str(&content)?)
}
