use clap::Parser;
use std::path::PathBuf;

/// Compiles a library's resources and archives them, optionally emitting
/// the library's symbol table.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Resource roots to compile, separated by `#`
    #[arg(long, value_delimiter = '#', required = true)]
    pub resources: Vec<PathBuf>,

    /// Path to write the archive of compiled resources
    #[arg(long)]
    pub output: PathBuf,

    /// Manifest of the library being processed
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Custom package for the generated symbol files
    #[arg(long = "packageForR")]
    pub package_for_r: Option<String>,

    /// Package path of the library; required for data binding
    #[arg(long = "packagePath")]
    pub package_path: Option<String>,

    /// Where to write the derived data binding metadata
    #[arg(long = "dataBindingInfoOut")]
    pub data_binding_info_out: Option<PathBuf>,

    /// Record the AndroidX data binding runtime in the metadata
    #[arg(long = "useDataBindingAndroidX")]
    pub use_data_binding_androidx: bool,

    /// Label of the target; written into the class jar manifest
    #[arg(long = "targetLabel")]
    pub target_label: Option<String>,

    /// Written into the class jar manifest as `Injecting-Rule-Kind`
    #[arg(long = "injectingRuleKind")]
    pub injecting_rule_kind: Option<String>,

    /// Path to write the jar containing the R classes
    #[arg(long = "classJarOutput")]
    pub class_jar_output: Option<PathBuf>,

    /// Path to write the R.txt file
    #[arg(long = "rTxtOut")]
    pub r_txt_out: Option<PathBuf>,

    /// External aapt2 binary; the built-in compiler is used when absent
    #[arg(long)]
    pub aapt2: Option<PathBuf>,

    /// Ask aapt2 to generate pseudo-locales
    #[arg(long = "generatePseudoLocale")]
    pub generate_pseudo_locale: bool,

    /// Number of compiler workers
    #[arg(
        long,
        default_value_t = crate::scope::DEFAULT_WORKERS as u16,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub jobs: u16,
}

impl Cli {
    /// Library identity: the target label, or the archive's file stem.
    pub fn library_label(&self) -> String {
        self.target_label.clone().unwrap_or_else(|| {
            self.output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// Symbol outputs are only produced when both destinations are given.
    pub fn symbol_outputs(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.r_txt_out, &self.class_jar_output) {
            (Some(r_txt), Some(class_jar)) => Some((r_txt, class_jar)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_split_on_hash() {
        let cli = Cli::try_parse_from([
            "rescompile",
            "--resources",
            "a/res#b/res",
            "--output",
            "out/lib.zip",
        ])
        .expect("valid args");

        assert_eq!(cli.resources, vec![PathBuf::from("a/res"), PathBuf::from("b/res")]);
        assert_eq!(cli.jobs, 15);
        assert_eq!(cli.library_label(), "lib");
        assert!(cli.symbol_outputs().is_none());
    }

    #[test]
    fn symbol_outputs_need_both_paths() {
        let cli = Cli::try_parse_from([
            "rescompile",
            "--resources",
            "res",
            "--output",
            "lib.zip",
            "--rTxtOut",
            "R.txt",
        ])
        .expect("valid args");
        assert!(cli.symbol_outputs().is_none());

        let cli = Cli::try_parse_from([
            "rescompile",
            "--resources",
            "res",
            "--output",
            "lib.zip",
            "--rTxtOut",
            "R.txt",
            "--classJarOutput",
            "r.jar",
            "--targetLabel",
            "//app:lib",
        ])
        .expect("valid args");
        assert!(cli.symbol_outputs().is_some());
        assert_eq!(cli.library_label(), "//app:lib");
    }

    #[test]
    fn zero_jobs_rejected() {
        let res = Cli::try_parse_from([
            "rescompile",
            "--resources",
            "res",
            "--output",
            "lib.zip",
            "--jobs",
            "0",
        ]);
        assert!(res.is_err());
    }
}
