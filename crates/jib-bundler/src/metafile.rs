//! esbuild metafile model.
//!
//! The driver passes `--metafile=<path>` on every compile; this module reads
//! the resulting JSON back. Only the fields manifest generation and the size
//! report consume are modeled; unknown fields are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// One parsed metafile: the bundler's description of a single compile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metafile {
    #[serde(default)]
    pub inputs: BTreeMap<String, MetaInput>,
    #[serde(default)]
    pub outputs: BTreeMap<String, MetaOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaInput {
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaOutput {
    pub bytes: u64,
    /// Source entry this output was produced from; absent on chunks.
    #[serde(default)]
    pub entry_point: Option<String>,
    /// Companion CSS bundle emitted for this output, if any.
    #[serde(default)]
    pub css_bundle: Option<String>,
}

impl Metafile {
    /// Read and parse a metafile the bundler wrote to disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io_context(format!("failed to read metafile {}", path.display()), e))?;
        serde_json::from_str(&text).map_err(|source| Error::Metafile {
            path: path.display().to_string(),
            source,
        })
    }

    /// Outputs that correspond to an entry point, in metafile order.
    pub fn entry_outputs(&self) -> impl Iterator<Item = (&String, &MetaOutput)> {
        self.outputs
            .iter()
            .filter(|(_, output)| output.entry_point.is_some())
    }

    /// Total bytes across all outputs.
    pub fn total_bytes(&self) -> u64 {
        self.outputs.values().map(|o| o.bytes).sum()
    }
}
