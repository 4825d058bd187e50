//! Data binding pre-processing.
//!
//! Layouts wrapped in `<layout>` carry `@{…}` expressions that the resource
//! compiler cannot read. They are rewritten into plain layouts inside a
//! fresh copy of the resource tree, and every removed binding is recorded in
//! one metadata file keyed by layout and view tag. The input tree is never
//! modified.

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, IoContext, Result};
use crate::model::{FolderType, ResourceFile, ResourceSet};
use crate::parser::manifest;
use crate::writer;

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref LAYOUT_ROOT: Regex =
        Regex::new(r#"(?s)^\s*(?:<\?xml[^>]*\?>)?\s*<layout\b((?:[^>"']|"[^"]*"|'[^']*')*?)>"#)
            .unwrap();
    static ref LAYOUT_END: Regex = Regex::new(r"</layout>\s*$").unwrap();
    static ref DATA_BLOCK: Regex =
        Regex::new(r#"(?s)<data\b(?:(?:[^>"']|"[^"]*"|'[^']*')*?/>|.*?</data>)"#).unwrap();
    static ref VARIABLE: Regex = Regex::new(r"<variable\b([^>]*)>").unwrap();
    static ref IMPORT: Regex = Regex::new(r"<import\b([^>]*)>").unwrap();
    static ref OPEN_TAG: Regex =
        Regex::new(r#"<([A-Za-z_][\w:.\-]*)((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#).unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"(\s+)([\w:.\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

/// Metadata descriptor written to the data binding info destination.
#[derive(Debug, Serialize, PartialEq)]
pub struct DataBindingInfo {
    pub module_package: String,
    pub package_path: String,
    pub runtime: &'static str,
    pub layouts: Vec<LayoutInfo>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LayoutInfo {
    pub name: String,
    pub folder: String,
    pub root: usize,
    pub variables: Vec<Variable>,
    pub imports: Vec<Import>,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Import {
    #[serde(rename = "type")]
    pub ty: String,
    pub alias: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Binding {
    pub tag: String,
    pub attribute: String,
    pub expression: String,
    pub two_way: bool,
}

/// Inputs that switch data binding on. All three must be present.
pub struct DataBindingRequest<'a> {
    pub info_out: Option<&'a Path>,
    pub package_path: Option<&'a str>,
    pub use_androidx: bool,
}

/// Rewrite the data binding layouts of `set` below `work_root`.
///
/// Without a manifest, package path and info destination this is the
/// identity and `set` is returned unchanged.
pub fn process_data_bindings(
    set: ResourceSet,
    request: &DataBindingRequest<'_>,
    work_root: &Path,
) -> Result<ResourceSet> {
    let (Some(manifest), Some(package_path), Some(info_out)) =
        (set.manifest.as_deref(), request.package_path, request.info_out)
    else {
        debug!("data binding inputs incomplete, resources used as-is");
        return Ok(set);
    };

    let module_package = manifest::read_package(manifest)?;
    let roots: Vec<PathBuf> = (0..set.roots.len())
        .map(|idx| work_root.join(idx.to_string()))
        .collect();

    let mut layouts = Vec::new();
    let mut files = Vec::with_capacity(set.files.len());
    for file in &set.files {
        let dest = roots[file.root].join(&file.relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }

        let rewritten = if is_layout_xml(file) {
            let text = fs::read_to_string(&file.path).at(&file.path)?;
            rewrite_layout(file, &text)?
        } else {
            None
        };
        match rewritten {
            Some((xml, layout)) => {
                fs::write(&dest, xml).at(&dest)?;
                layouts.push(layout);
            }
            None => {
                fs::copy(&file.path, &dest).at(&file.path)?;
            }
        }

        files.push(ResourceFile {
            path: dest,
            ..file.clone()
        });
    }

    let info = DataBindingInfo {
        module_package,
        package_path: package_path.to_string(),
        runtime: if request.use_androidx {
            "androidx.databinding"
        } else {
            "android.databinding"
        },
        layouts,
    };
    writer::atomic_write(info_out, &serde_json::to_vec_pretty(&info)?)?;
    info!(
        layouts = info.layouts.len(),
        info = %info_out.display(),
        "data binding layouts processed"
    );

    Ok(ResourceSet {
        label: set.label,
        roots,
        source_roots: set.source_roots,
        manifest: set.manifest,
        files,
    })
}

fn is_layout_xml(file: &ResourceFile) -> bool {
    file.folder == FolderType::Layout && file.path.extension().is_some_and(|e| e == "xml")
}

/// Rewrite one layout, or `None` if it does not use data binding.
pub fn rewrite_layout(file: &ResourceFile, text: &str) -> Result<Option<(String, LayoutInfo)>> {
    let text = COMMENT.replace_all(text, "");
    let Some(root) = LAYOUT_ROOT.captures(&text) else {
        return Ok(None);
    };
    let fail = |message: String| Error::data_binding(&file.path, message);

    let layout_attrs = root.get(1).map_or("", |m| m.as_str()).to_string();
    let body_start = root.get(0).map_or(0, |m| m.end());
    let Some(end) = LAYOUT_END.find(&text[body_start..]) else {
        return Err(fail("<layout> is never closed".into()));
    };
    let mut body = text[body_start..body_start + end.start()].to_string();

    let mut variables = Vec::new();
    let mut imports = Vec::new();
    if let Some(range) = DATA_BLOCK.find(&body).map(|m| m.range()) {
        let block = &body[range.clone()];
        for cap in VARIABLE.captures_iter(block) {
            let attrs = attributes(&cap[1]);
            variables.push(Variable {
                name: lookup(&attrs, "name").ok_or_else(|| fail("<variable> without name".into()))?,
                ty: lookup(&attrs, "type").ok_or_else(|| fail("<variable> without type".into()))?,
            });
        }
        for cap in IMPORT.captures_iter(block) {
            let attrs = attributes(&cap[1]);
            imports.push(Import {
                ty: lookup(&attrs, "type").ok_or_else(|| fail("<import> without type".into()))?,
                alias: lookup(&attrs, "alias"),
            });
        }
        body.replace_range(range, "");
    }

    let name = file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let namespaces: Vec<(String, String)> = attributes(&layout_attrs)
        .into_iter()
        .filter(|(k, _)| k.starts_with("xmlns"))
        .collect();

    let mut out = String::with_capacity(body.len());
    let mut bindings = Vec::new();
    let mut last = 0;
    let mut first_element = true;
    for cap in OPEN_TAG.captures_iter(&body) {
        let whole = cap.get(0).map_or(0..0, |m| m.range());
        let element = &cap[1];
        let mut attrs = attributes(&cap[2]);
        let self_closing = &cap[3] == "/";

        let mut bound = Vec::new();
        attrs.retain(|(key, value)| {
            if value.starts_with("@{") || value.starts_with("@={") {
                bound.push((key.clone(), value.clone()));
                false
            } else {
                true
            }
        });

        if first_element {
            for (k, v) in &namespaces {
                if !attrs.iter().any(|(existing, _)| existing == k) {
                    attrs.insert(0, (k.clone(), v.clone()));
                }
            }
        }
        if bound.is_empty() && !first_element {
            continue;
        }
        first_element = false;

        if !bound.is_empty() {
            let tag = match lookup(&attrs, "android:tag") {
                Some(existing) => existing,
                None => {
                    let tag = format!("{name}_{}", tag_count(&bindings));
                    attrs.push(("android:tag".into(), tag.clone()));
                    tag
                }
            };
            for (attribute, value) in bound {
                let two_way = value.starts_with("@={");
                let expression =
                    parse_expression(&value).map_err(|m| fail(format!("{attribute}: {m}")))?;
                bindings.push(Binding {
                    tag: tag.clone(),
                    attribute,
                    expression,
                    two_way,
                });
            }
        }

        out.push_str(&body[last..whole.start]);
        out.push('<');
        out.push_str(element);
        for (k, v) in &attrs {
            out.push_str(&format!("\n    {k}=\"{}\"", v.replace('"', "&quot;")));
        }
        out.push_str(if self_closing { "/>" } else { ">" });
        last = whole.end;
    }
    out.push_str(&body[last..]);

    let folder = file
        .relative
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{}\n",
        out.trim()
    );
    Ok(Some((
        xml,
        LayoutInfo {
            name,
            folder,
            root: file.root,
            variables,
            imports,
            bindings,
        },
    )))
}

fn tag_count(bindings: &[Binding]) -> usize {
    let mut tags: Vec<&str> = bindings.iter().map(|b| b.tag.as_str()).collect();
    tags.dedup();
    tags.len()
}

fn attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(raw)
        .map(|c| {
            let value = c.get(3).or_else(|| c.get(4)).map_or("", |m| m.as_str());
            (c[2].to_string(), value.to_string())
        })
        .collect()
}

fn lookup(attrs: &[(String, String)], key: &str) -> Option<String> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

/// Strip the `@{…}` / `@={…}` wrapper and check the expression is well formed.
pub fn parse_expression(value: &str) -> Result<String, String> {
    let inner = value
        .strip_prefix("@={")
        .or_else(|| value.strip_prefix("@{"))
        .ok_or_else(|| format!("`{value}` is not a binding expression"))?;
    let inner = inner
        .strip_suffix('}')
        .ok_or_else(|| format!("unterminated expression `{value}`"))?;
    let expr = inner.trim();
    if expr.is_empty() {
        return Err("empty expression".into());
    }

    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    for c in expr.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(open) {
                    return Err(format!("unbalanced `{c}` in `{expr}`"));
                }
            }
            _ => {}
        }
    }
    if let Some(q) = quote {
        return Err(format!("unterminated {q} literal in `{expr}`"));
    }
    if let Some(open) = stack.last() {
        return Err(format!("unclosed `{open}` in `{expr}`"));
    }
    Ok(expr.to_string())
}
