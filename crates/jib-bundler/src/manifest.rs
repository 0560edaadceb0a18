//! Asset manifest generation.
//!
//! Two manifests are derived from the client metafile after every successful
//! client compile:
//!
//! - `assets.json`: entry-point lookup used by server-side rendering to emit
//!   script/link tags (`{ "client": { "js": "/assets/client.<hash>.js" } }`)
//! - `loadable-stats.json`: the full chunk table for code-split rendering
//!
//! Both are written into the build root, next to `server.js`, because the
//! server bundle resolves them relative to itself.

use std::path::Path;

use serde_json::{Map, Value, json};

use crate::metafile::Metafile;
use crate::{Error, Result};

/// Build the `assets.json` value from a client metafile.
pub fn assets_manifest(meta: &Metafile, public_path: &str) -> Value {
    let mut entries = Map::new();

    for (output_path, output) in meta.entry_outputs() {
        let Some(entry_point) = output.entry_point.as_deref() else {
            continue;
        };
        let mut record = Map::new();
        record.insert("js".to_string(), json!(public_url(public_path, output_path)));
        if let Some(css) = output.css_bundle.as_deref() {
            record.insert("css".to_string(), json!(public_url(public_path, css)));
        }
        entries.insert(entry_name(entry_point), Value::Object(record));
    }

    Value::Object(entries)
}

/// Build the `loadable-stats.json` value from a client metafile.
pub fn loadable_stats(meta: &Metafile, public_path: &str) -> Value {
    let mut by_chunk_name = Map::new();
    let mut assets = Vec::new();

    for (output_path, output) in &meta.outputs {
        let file = file_name(output_path);
        if file.ends_with(".map") {
            continue;
        }

        let chunk_names: Vec<String> = match output.entry_point.as_deref() {
            Some(entry) => vec![entry_name(entry)],
            None => Vec::new(),
        };

        if let Some(name) = chunk_names.first() {
            let files = by_chunk_name
                .entry(name.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(files) = files {
                files.push(json!(file));
                if let Some(css) = output.css_bundle.as_deref() {
                    files.push(json!(file_name(css)));
                }
            }
        }

        assets.push(json!({
            "name": file,
            "size": output.bytes,
            "chunkNames": chunk_names,
            "url": public_url(public_path, output_path),
        }));
    }

    json!({
        "publicPath": public_path,
        "assetsByChunkName": Value::Object(by_chunk_name),
        "assets": assets,
    })
}

/// Write both manifests into the build root.
pub fn write_manifests(build_dir: &Path, public_path: &str, client_meta: &Metafile) -> Result<()> {
    let write = |name: &str, value: &Value| -> Result<()> {
        let path = build_dir.join(name);
        let mut text = serde_json::to_string_pretty(value)?;
        text.push('\n');
        std::fs::write(&path, text)
            .map_err(|e| Error::io_context(format!("failed to write {}", path.display()), e))
    };

    write("assets.json", &assets_manifest(client_meta, public_path))?;
    write("loadable-stats.json", &loadable_stats(client_meta, public_path))?;
    Ok(())
}

/// `src/client.tsx` -> `client`
fn entry_name(entry_point: &str) -> String {
    Path::new(entry_point)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry_point.to_string())
}

fn file_name(output_path: &str) -> String {
    Path::new(output_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| output_path.to_string())
}

fn public_url(public_path: &str, output_path: &str) -> String {
    let file = file_name(output_path);
    if public_path.ends_with('/') {
        format!("{}{}", public_path, file)
    } else {
        format!("{}/{}", public_path, file)
    }
}
