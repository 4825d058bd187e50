//! Packages compiled units into the compiled-resources archive.
//!
//! Layout of the zip:
//!   compiled-resources.json   header, always the first member
//!   units/00000.flat          one blob per compiled unit, canonical order

use std::io::{Cursor, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::atomic_write;
use crate::error::{Error, Result};
use crate::model::{CompiledUnit, ResourceSet};

pub const HEADER_NAME: &str = "compiled-resources.json";
pub const FORMAT: &str = "compiled-resources";
pub const VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveHeader {
    pub format: String,
    pub version: u32,
    pub library: String,
    /// Resource roots the units were compiled from, in declared order.
    pub roots: Vec<String>,
    pub units: Vec<ArchiveUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveUnit {
    pub member: String,
    pub root: usize,
    pub source: String,
    pub size: u64,
    pub sha256: String,
    pub entries: Vec<ArchiveEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveEntry {
    #[serde(rename = "type")]
    pub ty: String,
    pub qualifiers: String,
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Zip options shared by every archive this crate writes: fixed timestamps
/// keep identical inputs byte-identical.
pub fn member_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

/// Persist `units` as one archive at `output`, replacing any previous file.
pub fn write_archive(set: &ResourceSet, mut units: Vec<CompiledUnit>, output: &Path) -> Result<()> {
    units.sort_by(|a, b| a.source.canonical_key().cmp(&b.source.canonical_key()));

    let header = ArchiveHeader {
        format: FORMAT.to_string(),
        version: VERSION,
        library: set.label.clone(),
        roots: set
            .source_roots
            .iter()
            .map(|r| r.display().to_string())
            .collect(),
        units: units
            .iter()
            .enumerate()
            .map(|(idx, unit)| ArchiveUnit {
                member: format!("units/{idx:05}.flat"),
                root: unit.source.root,
                source: unit.source.relative.to_string_lossy().replace('\\', "/"),
                size: unit.blob.len() as u64,
                sha256: sha256_hex(&unit.blob),
                entries: unit
                    .entries
                    .iter()
                    .map(|e| ArchiveEntry {
                        ty: e.ty.tag().to_string(),
                        qualifiers: e.qualifiers.clone(),
                        name: e.name.clone(),
                        offset: e.offset as u64,
                        length: e.len as u64,
                    })
                    .collect(),
            })
            .collect(),
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = member_options();
    zip.start_file(HEADER_NAME, options)?;
    zip.write_all(&serde_json::to_vec_pretty(&header)?)
        .map_err(|e| Error::Io {
            path: output.to_path_buf(),
            source: e,
        })?;
    for (unit, record) in units.iter().zip(&header.units) {
        zip.start_file(record.member.as_str(), options)?;
        zip.write_all(&unit.blob).map_err(|e| Error::Io {
            path: unit.flat_path.clone(),
            source: e,
        })?;
    }
    let bytes = zip.finish()?.into_inner();

    atomic_write(output, &bytes)?;
    info!(
        archive = %output.display(),
        units = header.units.len(),
        entries = header.units.iter().map(|u| u.entries.len()).sum::<usize>(),
        bytes = bytes.len(),
        "compiled resources archived"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompiledResourceEntry, FolderType, ResourceFile, ResourceType};
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;

    fn unit(root: usize, rel: &str, ty: ResourceType, name: &str, blob: &[u8]) -> CompiledUnit {
        let relative = PathBuf::from(rel);
        let dir = relative.parent().unwrap().to_str().unwrap().to_string();
        let (folder, qualifiers) = FolderType::parse_folder(&dir).unwrap();
        CompiledUnit {
            source: ResourceFile {
                root,
                path: PathBuf::from("/res").join(&relative),
                relative,
                folder,
                qualifiers: qualifiers.clone(),
            },
            flat_path: PathBuf::from("/scratch/x.flat"),
            blob: blob.to_vec(),
            entries: vec![CompiledResourceEntry {
                ty,
                qualifiers,
                name: name.into(),
                offset: 0,
                len: blob.len(),
            }],
        }
    }

    fn set() -> ResourceSet {
        ResourceSet {
            label: "//lib".into(),
            roots: vec![PathBuf::from("/scratch/0")],
            source_roots: vec![PathBuf::from("/res")],
            manifest: None,
            files: vec![],
        }
    }

    fn header_of(path: &Path) -> ArchiveHeader {
        let mut zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        assert_eq!(zip.by_index(0).unwrap().name(), HEADER_NAME);
        let mut text = String::new();
        zip.by_name(HEADER_NAME).unwrap().read_to_string(&mut text).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn units_written_in_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("lib.zip");
        let units = vec![
            unit(0, "layout/main.xml", ResourceType::Layout, "main", b"<L/>"),
            unit(0, "values/strings.xml", ResourceType::String, "app_name", b"<s/>"),
        ];

        write_archive(&set(), units, &out).unwrap();
        let header = header_of(&out);
        let sources: Vec<_> = header.units.iter().map(|u| u.source.as_str()).collect();
        assert_eq!(sources, vec!["values/strings.xml", "layout/main.xml"]);
        assert_eq!(header.units[0].entries[0].ty, "string");
        assert_eq!(header.units[0].sha256, sha256_hex(b"<s/>"));
        assert_eq!(header.library, "//lib");
        assert_eq!(header.roots, vec!["/res".to_string()]);
    }

    #[test]
    fn identical_input_gives_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.zip");
        let b = dir.path().join("b.zip");
        let mk = || vec![unit(0, "raw/data.bin", ResourceType::Raw, "data", b"\x00\x01")];

        write_archive(&set(), mk(), &a).unwrap();
        write_archive(&set(), mk(), &b).unwrap();
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }
}
