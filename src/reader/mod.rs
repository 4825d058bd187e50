//! Reads a compiled-resources archive back into parsed resource data.

pub mod parsed;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, IoContext, Result};
use crate::model::{ConfiguredValue, DependencyType, ResourceType};
use crate::writer::archive::{self, ArchiveHeader};
use parsed::ParsedAndroidDataBuilder;

/// Deserializer for archives produced by [`archive::write_archive`].
#[derive(Debug, Clone, Copy)]
pub struct CompiledDataDeserializer {
    include_file_contents_for_validation: bool,
}

impl CompiledDataDeserializer {
    /// With `include_file_contents_for_validation`, every unit blob is read
    /// and checked against its recorded digest, and payloads are kept.
    /// Without it the header is trusted and only spans are recorded.
    pub fn create(include_file_contents_for_validation: bool) -> Self {
        Self {
            include_file_contents_for_validation,
        }
    }

    pub fn read_header(path: &Path) -> Result<ArchiveHeader> {
        let file = File::open(path).at(path)?;
        let mut zip = ZipArchive::new(file)?;
        header(path, &mut zip)
    }

    /// Feed every entry of `archive` into `builder`, tagged with `provenance`.
    pub fn deserialize(
        &self,
        archive: &Path,
        provenance: DependencyType,
        builder: &mut ParsedAndroidDataBuilder,
    ) -> Result<()> {
        let file = File::open(archive).at(archive)?;
        let mut zip = ZipArchive::new(file)?;
        let header = header(archive, &mut zip)?;
        let fail = |message: String| Error::deserialize(archive, message);

        let mut count = 0usize;
        for unit in &header.units {
            let blob = if self.include_file_contents_for_validation {
                let mut member = zip.by_name(&unit.member)?;
                let mut bytes = Vec::new();
                member.read_to_end(&mut bytes).at(archive)?;
                if bytes.len() as u64 != unit.size {
                    return Err(fail(format!(
                        "{} holds {} bytes, header says {}",
                        unit.member,
                        bytes.len(),
                        unit.size
                    )));
                }
                if archive::sha256_hex(&bytes) != unit.sha256 {
                    return Err(fail(format!("{} does not match its digest", unit.member)));
                }
                Some(bytes)
            } else {
                None
            };

            for entry in &unit.entries {
                let ty = ResourceType::from_tag(&entry.ty).ok_or_else(|| {
                    fail(format!("unknown resource type `{}` in {}", entry.ty, unit.source))
                })?;
                let end = entry
                    .offset
                    .checked_add(entry.length)
                    .filter(|end| *end <= unit.size)
                    .ok_or_else(|| {
                        fail(format!("{ty}/{} points outside {}", entry.name, unit.member))
                    })?;
                let payload = blob
                    .as_ref()
                    .map(|b| b[entry.offset as usize..end as usize].to_vec());

                let value = ConfiguredValue {
                    qualifiers: entry.qualifiers.clone(),
                    source: unit.source.clone(),
                    len: entry.length as usize,
                    payload,
                };
                builder
                    .add(ty, &entry.name, provenance, value)
                    .map_err(fail)?;
                count += 1;
            }
        }
        debug!(
            archive = %archive.display(),
            units = header.units.len(),
            entries = count,
            validated = self.include_file_contents_for_validation,
            "archive deserialized"
        );
        Ok(())
    }
}

fn header(path: &Path, zip: &mut ZipArchive<File>) -> Result<ArchiveHeader> {
    let member = zip.by_name(archive::HEADER_NAME)?;
    let header: ArchiveHeader = serde_json::from_reader(member)?;
    if header.format != archive::FORMAT || header.version != archive::VERSION {
        return Err(Error::deserialize(
            path,
            format!(
                "unsupported archive format {} v{}",
                header.format, header.version
            ),
        ));
    }
    Ok(header)
}
