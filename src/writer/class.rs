//! Compiled `R` classes, packaged as a jar.
//!
//! Each resource type becomes a nested class `R$<type>` holding one
//! `public static final int` per symbol. Only constant fields are emitted:
//! no methods, no source file.

use std::io::{Cursor, Write};
use std::path::Path;

use indexmap::IndexMap;
use tracing::info;
use zip::ZipWriter;

use super::archive::member_options;
use super::atomic_write;
use super::symbols::SymbolTable;
use crate::error::{Error, Result};

const MAGIC: u32 = 0xCAFE_BABE;
/// Java 8 class files.
const MAJOR_VERSION: u16 = 52;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_STATIC: u16 = 0x0008;
const ACC_FINAL: u16 = 0x0010;
const ACC_SUPER: u16 = 0x0020;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_CLASS: u8 = 7;

/// Values stamped into `META-INF/MANIFEST.MF`.
#[derive(Debug, Default, Clone)]
pub struct JarManifest {
    pub target_label: Option<String>,
    pub injecting_rule_kind: Option<String>,
}

impl JarManifest {
    fn render(&self) -> String {
        let mut out = String::from("Manifest-Version: 1.0\r\nCreated-By: rescompile\r\n");
        if let Some(label) = &self.target_label {
            out.push_str(&format!("Target-Label: {label}\r\n"));
        }
        if let Some(kind) = &self.injecting_rule_kind {
            out.push_str(&format!("Injecting-Rule-Kind: {kind}\r\n"));
        }
        out.push_str("\r\n");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Constant {
    Utf8(String),
    Integer(i32),
    Class(u16),
}

#[derive(Default)]
struct ConstantPool {
    entries: IndexMap<Constant, u16>,
}

impl ConstantPool {
    fn add(&mut self, constant: Constant) -> u16 {
        let next = self.entries.len() as u16 + 1;
        *self.entries.entry(constant).or_insert(next)
    }

    fn utf8(&mut self, s: &str) -> u16 {
        self.add(Constant::Utf8(s.to_string()))
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.add(Constant::Class(name))
    }

    fn integer(&mut self, value: i32) -> u16 {
        self.add(Constant::Integer(value))
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_u16(out, self.entries.len() as u16 + 1);
        for constant in self.entries.keys() {
            match constant {
                Constant::Utf8(s) => {
                    out.push(TAG_UTF8);
                    put_u16(out, s.len() as u16);
                    out.extend_from_slice(s.as_bytes());
                }
                Constant::Integer(v) => {
                    out.push(TAG_INTEGER);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Class(name) => {
                    out.push(TAG_CLASS);
                    put_u16(out, *name);
                }
            }
        }
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// `com.example` -> `com/example/R`.
pub fn r_class_name(package: &str) -> String {
    if package.is_empty() {
        "R".to_string()
    } else {
        format!("{}/R", package.replace('.', "/"))
    }
}

/// A member of the `InnerClasses` attribute.
struct Nested<'a> {
    inner: &'a str,
    simple: &'a str,
}

fn class_file(
    this: &str,
    outer: &str,
    nested: &[Nested<'_>],
    fields: &[(&str, u32)],
) -> Result<Vec<u8>> {
    let mut pool = ConstantPool::default();
    let this_idx = pool.class(this);
    let super_idx = pool.class("java/lang/Object");
    let int_desc = pool.utf8("I");
    let constant_value = pool.utf8("ConstantValue");

    let mut field_bytes = Vec::new();
    for (name, id) in fields {
        let value = i32::try_from(*id)
            .map_err(|_| Error::Config(format!("symbol id {id} does not fit a Java int")))?;
        put_u16(&mut field_bytes, ACC_PUBLIC | ACC_STATIC | ACC_FINAL);
        put_u16(&mut field_bytes, pool.utf8(name));
        put_u16(&mut field_bytes, int_desc);
        put_u16(&mut field_bytes, 1);
        put_u16(&mut field_bytes, constant_value);
        put_u32(&mut field_bytes, 2);
        put_u16(&mut field_bytes, pool.integer(value));
    }

    let mut attr_bytes = Vec::new();
    let mut attr_count = 0u16;
    if !nested.is_empty() {
        let attr_name = pool.utf8("InnerClasses");
        let outer_idx = pool.class(outer);
        put_u16(&mut attr_bytes, attr_name);
        put_u32(&mut attr_bytes, 2 + 8 * nested.len() as u32);
        put_u16(&mut attr_bytes, nested.len() as u16);
        for n in nested {
            put_u16(&mut attr_bytes, pool.class(n.inner));
            put_u16(&mut attr_bytes, outer_idx);
            put_u16(&mut attr_bytes, pool.utf8(n.simple));
            put_u16(&mut attr_bytes, ACC_PUBLIC | ACC_STATIC | ACC_FINAL);
        }
        attr_count += 1;
    }

    if pool.entries.len() >= u16::MAX as usize {
        return Err(Error::Config(format!("class {this} has too many constants")));
    }

    let mut out = Vec::new();
    put_u32(&mut out, MAGIC);
    put_u16(&mut out, 0);
    put_u16(&mut out, MAJOR_VERSION);
    pool.encode(&mut out);
    put_u16(&mut out, ACC_PUBLIC | ACC_FINAL | ACC_SUPER);
    put_u16(&mut out, this_idx);
    put_u16(&mut out, super_idx);
    put_u16(&mut out, 0); // interfaces
    put_u16(&mut out, fields.len() as u16);
    out.extend(field_bytes);
    put_u16(&mut out, 0); // methods
    put_u16(&mut out, attr_count);
    out.extend(attr_bytes);
    Ok(out)
}

/// Every class file of the `R` hierarchy, outer class first.
pub fn render_classes(table: &SymbolTable, package: &str) -> Result<Vec<(String, Vec<u8>)>> {
    let outer = r_class_name(package);
    let inner_names: Vec<(String, &'static str)> = table
        .types()
        .map(|(ty, _)| (format!("{outer}${}", ty.tag()), ty.tag()))
        .collect();
    let nested: Vec<Nested<'_>> = inner_names
        .iter()
        .map(|(inner, simple)| Nested { inner, simple })
        .collect();

    let mut classes = vec![(
        format!("{outer}.class"),
        class_file(&outer, &outer, &nested, &[])?,
    )];
    for ((ty, names), n) in table.types().zip(&nested) {
        debug_assert_eq!(ty.tag(), n.simple);
        let fields: Vec<(&str, u32)> = names.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let bytes = class_file(n.inner, &outer, std::slice::from_ref(n), &fields)?;
        classes.push((format!("{}.class", n.inner), bytes));
    }
    Ok(classes)
}

/// Build the class jar fully in memory, then persist it atomically.
pub fn write_class_jar(
    table: &SymbolTable,
    package: &str,
    path: &Path,
    manifest: &JarManifest,
) -> Result<()> {
    let classes = render_classes(table, package)?;
    let io_err = |source: std::io::Error| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut jar = ZipWriter::new(Cursor::new(Vec::new()));
    let options = member_options();
    jar.start_file("META-INF/MANIFEST.MF", options)?;
    jar.write_all(manifest.render().as_bytes()).map_err(io_err)?;
    for (name, bytes) in &classes {
        jar.start_file(name.as_str(), options)?;
        jar.write_all(bytes).map_err(io_err)?;
    }
    let bytes = jar.finish()?.into_inner();

    atomic_write(path, &bytes)?;
    info!(path = %path.display(), package, classes = classes.len(), "class jar written");
    Ok(())
}
