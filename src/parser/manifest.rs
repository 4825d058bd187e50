//! Best-effort package lookup in a library manifest.
//!
//! Only the `package` attribute of the top-level `<manifest>` element is
//! needed, so this is a targeted scan rather than a document model.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, IoContext, Result};

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref MANIFEST_TAG: Regex = Regex::new(r"(?s)<manifest\b([^>]*)>").unwrap();
    static ref PACKAGE_ATTR: Regex =
        Regex::new(r#"(?:^|\s)package\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

/// Extract the package declared by a manifest document.
///
/// Anything that does not look like a manifest yields an empty string;
/// only failing to read the file is an error.
pub fn parse_package(manifest: &str) -> String {
    let stripped = COMMENT.replace_all(manifest, "");
    let Some(tag) = MANIFEST_TAG.captures(&stripped) else {
        return String::new();
    };
    let attrs = tag.get(1).map_or("", |m| m.as_str());
    PACKAGE_ATTR
        .captures(attrs)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Only failing to read `path` is an error; undecodable content yields an
/// empty package like any other unparsable manifest.
pub fn read_package(path: &Path) -> Result<String> {
    let bytes = fs::read(path).at(path)?;
    let package = parse_package(&decode(&bytes));
    if package.is_empty() {
        warn!(manifest = %path.display(), "no package declared in manifest");
    }
    Ok(package)
}

/// Text of an XML document, honouring a UTF-8 or UTF-16 byte order mark.
fn decode(bytes: &[u8]) -> String {
    fn utf16(rest: &[u8], unit: fn([u8; 2]) -> u16) -> String {
        let units = rest.chunks_exact(2).map(|c| unit([c[0], c[1]]));
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decide the package used for generated symbols.
///
/// An explicit override always wins and the manifest is not read. Without
/// one, a manifest is required and must declare a non-empty package.
pub fn resolve_symbol_package(
    package_override: Option<&str>,
    manifest: Option<&Path>,
) -> Result<String> {
    if let Some(package) = package_override {
        debug!(package, "using explicit symbol package");
        return Ok(package.to_string());
    }
    let manifest = manifest.ok_or_else(|| {
        Error::Config(
            "to generate R files, either a package or manifest must be specified".into(),
        )
    })?;
    let package = read_package(manifest)?;
    if package.is_empty() {
        return Err(Error::Config(format!(
            "manifest {} declares no package and no package override was given",
            manifest.display()
        )));
    }
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_package_attribute() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- <manifest package="com.commented.out"> -->
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.lib">
  <application />
</manifest>"#;
        assert_eq!(parse_package(xml), "com.example.lib");
    }

    #[test]
    fn single_quotes_accepted() {
        assert_eq!(parse_package("<manifest package='a.b'/>"), "a.b");
    }

    #[test]
    fn garbage_degrades_to_empty() {
        assert_eq!(parse_package("not xml at all"), "");
        assert_eq!(parse_package("<manifest android:versionCode=\"1\">"), "");
        assert_eq!(parse_package("<manifestation package=\"x\">"), "");
    }

    #[test]
    fn utf16_manifest_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        let xml = r#"<?xml version="1.0" encoding="utf-16"?><manifest package="com.wide"/>"#;
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(xml.encode_utf16().flat_map(u16::to_le_bytes));
        fs::write(&manifest, bytes).unwrap();

        assert_eq!(read_package(&manifest).unwrap(), "com.wide");
    }

    #[test]
    fn undecodable_manifest_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        fs::write(&manifest, [0xC3, 0x28, 0xFF, 0x00]).unwrap();

        assert_eq!(read_package(&manifest).unwrap(), "");
    }

    #[test]
    fn override_skips_manifest() {
        let pkg = resolve_symbol_package(Some("com.override"), Some(Path::new("/nope/missing.xml")))
            .expect("override wins");
        assert_eq!(pkg, "com.override");
    }

    #[test]
    fn neither_override_nor_manifest_is_config_error() {
        let err = resolve_symbol_package(None, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err}");
    }

    #[test]
    fn empty_package_without_override_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        fs::write(&manifest, "<manifest><application/></manifest>").unwrap();

        let err = resolve_symbol_package(None, Some(&manifest)).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err}");
    }
}
