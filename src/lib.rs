pub mod cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod reader;
pub mod scope;
pub mod writer;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::cli::Cli;
use crate::model::DependencyType;
use crate::processor::{Aapt2Compiler, BuiltinCompiler, DataBindingRequest, ResourceCompiler};
use crate::reader::CompiledDataDeserializer;
use crate::reader::parsed::ParsedAndroidDataBuilder;
use crate::scope::BuildScope;
use crate::writer::class::JarManifest;
use crate::writer::symbols::SymbolTable;

pub fn run() -> anyhow::Result<()> {
    let args = Cli::parse();
    execute(&args)
}

/// Run the action with the compiler backend selected by `args`.
pub fn execute(args: &Cli) -> anyhow::Result<()> {
    match &args.aapt2 {
        Some(binary) => execute_with(
            args,
            &Aapt2Compiler::new(binary.clone(), args.generate_pseudo_locale),
        ),
        None => execute_with(args, &BuiltinCompiler),
    }
}

pub fn execute_with(args: &Cli, compiler: &dyn ResourceCompiler) -> anyhow::Result<()> {
    // 0. ── Clear stale outputs ──────────────────────────────────────────
    let outputs = [
        Some(&args.output),
        args.r_txt_out.as_ref(),
        args.class_jar_output.as_ref(),
        args.data_binding_info_out.as_ref(),
    ];
    for path in outputs.into_iter().flatten() {
        writer::remove_stale(path).with_context(|| "Removing stale output")?;
    }

    // 1. ── Configure ────────────────────────────────────────────────────
    let symbols = match args.symbol_outputs() {
        Some((r_txt, class_jar)) => {
            let package = parser::manifest::resolve_symbol_package(
                args.package_for_r.as_deref(),
                args.manifest.as_deref(),
            )
            .with_context(|| "Resolving package for R")?;
            Some((package, r_txt, class_jar))
        }
        None => None,
    };

    // 2. ── Validate ─────────────────────────────────────────────────────
    let set = parser::load_resource_set(
        &args.library_label(),
        &args.resources,
        args.manifest.as_deref(),
    )
    .with_context(|| "Validating resources")?;

    let scope = BuildScope::new(args.jobs.into()).with_context(|| "Creating build scope")?;
    let data_binding_root = scope.subdir("android_data_binding_resources")?;
    let compiled_root = scope.subdir("compiled")?;

    // 3. ── Process ──────────────────────────────────────────────────────
    let request = DataBindingRequest {
        info_out: args.data_binding_info_out.as_deref(),
        package_path: args.package_path.as_deref(),
        use_androidx: args.use_data_binding_androidx,
    };
    let set = processor::process_data_bindings(set, &request, &data_binding_root)
        .with_context(|| "Processing data bindings")?;
    let units = processor::compile_resources(&scope, &set, compiler, &compiled_root)
        .with_context(|| "Compiling resources")?;

    // 4. ── Write outputs ────────────────────────────────────────────────
    writer::archive::write_archive(&set, units, &args.output)
        .with_context(|| format!("Writing {}", args.output.display()))?;

    if let Some((package, r_txt, class_jar)) = symbols {
        let manifest = JarManifest {
            target_label: args.target_label.clone(),
            injecting_rule_kind: args.injecting_rule_kind.clone(),
        };
        generate_r_files(&args.output, &package, r_txt, class_jar, &manifest)
            .with_context(|| "Generating R files")?;
    }
    Ok(())
}

/// Re-read the archive just written and emit `R.txt` plus the class jar.
fn generate_r_files(
    archive: &Path,
    package: &str,
    r_txt: &Path,
    class_jar: &Path,
    manifest: &JarManifest,
) -> error::Result<()> {
    let mut builder = ParsedAndroidDataBuilder::new();
    CompiledDataDeserializer::create(false).deserialize(
        archive,
        DependencyType::Primary,
        &mut builder,
    )?;
    let primary = builder.build();

    let table =
        SymbolTable::from_parsed(&primary).map_err(|m| error::Error::deserialize(archive, m))?;
    info!(package, symbols = table.len(), "symbol table assigned");
    writer::class::write_class_jar(&table, package, class_jar, manifest)?;
    writer::r_txt::write(&table, r_txt)?;
    Ok(())
}
