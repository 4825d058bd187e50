//! Resource compilation: the backend seam and the parallel driver.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use super::declarations::{self, Declaration};
use crate::error::{Error, IoContext, Result};
use crate::model::{CompiledResourceEntry, CompiledUnit, ResourceFile, ResourceSet};
use crate::scope::BuildScope;

/// Compiles one resource file into a typed unit.
///
/// Implementations must write their intermediate output below `out_dir`
/// and never touch the source file.
pub trait ResourceCompiler: Send + Sync {
    fn compile(&self, file: &ResourceFile, out_dir: &Path) -> Result<CompiledUnit>;
}

/// Compile every file of `set` on the scope's worker pool.
///
/// Fails fast: after the first unit error no new units are started,
/// in-flight ones are awaited, and nothing compiled so far is returned.
pub fn compile_resources(
    scope: &BuildScope,
    set: &ResourceSet,
    compiler: &dyn ResourceCompiler,
    out_dir: &Path,
) -> Result<Vec<CompiledUnit>> {
    let started = Instant::now();
    let units = scope.pool().install(|| {
        set.files
            .par_iter()
            .map(|file| {
                debug!(file = %file.relative.display(), "compiling");
                compiler.compile(file, out_dir)
            })
            .collect::<Result<Vec<_>>>()
    })?;
    info!(
        units = units.len(),
        entries = units.iter().map(|u| u.entries.len()).sum::<usize>(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "resources compiled"
    );
    Ok(units)
}

/// In-process compiler: value files are split into one payload per
/// declared element, every other file is carried verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinCompiler;

impl ResourceCompiler for BuiltinCompiler {
    fn compile(&self, file: &ResourceFile, out_dir: &Path) -> Result<CompiledUnit> {
        let bytes = fs::read(&file.path).at(&file.path)?;
        let decls =
            declarations::declarations(file, &bytes).map_err(|m| Error::compile(&file.path, m))?;

        let (blob, entries) = if file.is_values() {
            let mut blob = Vec::new();
            let mut entries = Vec::with_capacity(decls.len());
            for decl in decls {
                let payload = &bytes[decl.span.clone()];
                entries.push(entry(file, &decl, blob.len(), payload.len()));
                blob.extend_from_slice(payload);
            }
            (blob, entries)
        } else {
            let entries = decls
                .iter()
                .map(|d| entry(file, d, d.span.start, d.span.len()))
                .collect();
            (bytes, entries)
        };

        let mut flat_path = out_dir.join(file.unit_path());
        flat_path.as_mut_os_string().push(".flat");
        if let Some(parent) = flat_path.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::write(&flat_path, &blob).at(&flat_path)?;

        Ok(CompiledUnit {
            source: file.clone(),
            flat_path,
            blob,
            entries,
        })
    }
}

/// Shells out to `aapt2 compile`; entry keys come from the declaration
/// scanner and every entry spans the whole `.flat` output.
#[derive(Debug, Clone)]
pub struct Aapt2Compiler {
    pub binary: PathBuf,
    pub pseudo_localize: bool,
}

impl Aapt2Compiler {
    pub fn new(binary: PathBuf, pseudo_localize: bool) -> Self {
        Self {
            binary,
            pseudo_localize,
        }
    }
}

impl ResourceCompiler for Aapt2Compiler {
    fn compile(&self, file: &ResourceFile, out_dir: &Path) -> Result<CompiledUnit> {
        let bytes = fs::read(&file.path).at(&file.path)?;
        let decls =
            declarations::declarations(file, &bytes).map_err(|m| Error::compile(&file.path, m))?;

        let unit_dir = out_dir.join(file.unit_path());
        fs::create_dir_all(&unit_dir).at(&unit_dir)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("compile").arg("--legacy");
        if self.pseudo_localize {
            cmd.arg("--pseudo-localize");
        }
        cmd.arg("-o").arg(&unit_dir).arg(&file.path);

        let output = cmd.output().at(&self.binary)?;
        if !output.status.success() {
            return Err(Error::compile(
                &file.path,
                format!(
                    "aapt2 exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let mut produced = fs::read_dir(&unit_dir)
            .at(&unit_dir)?
            .map(|e| e.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .at(&unit_dir)?;
        produced.sort();
        let mut blob = Vec::new();
        for path in &produced {
            blob.extend(fs::read(path).at(path)?);
        }
        if blob.is_empty() {
            return Err(Error::compile(&file.path, "aapt2 produced no output"));
        }

        let entries = decls.iter().map(|d| entry(file, d, 0, blob.len())).collect();
        Ok(CompiledUnit {
            source: file.clone(),
            flat_path: unit_dir,
            blob,
            entries,
        })
    }
}

fn entry(
    file: &ResourceFile,
    decl: &Declaration,
    offset: usize,
    len: usize,
) -> CompiledResourceEntry {
    CompiledResourceEntry {
        ty: decl.ty,
        qualifiers: file.qualifiers.clone(),
        name: decl.name.clone(),
        offset,
        len,
    }
}
