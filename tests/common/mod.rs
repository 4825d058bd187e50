#![allow(dead_code)]

use std::fs;
use std::io::Read;
use std::path::Path;

use clap::Parser;
use rescompile::cli::Cli;

pub fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

pub fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["rescompile"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("valid args")
}

pub fn zip_names(path: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

pub fn zip_member(path: &Path, name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut bytes = Vec::new();
    zip.by_name(name).unwrap().read_to_end(&mut bytes).unwrap();
    bytes
}

/// `(name, value)` of every constant int field in a class file.
pub fn int_fields(class: &[u8]) -> Vec<(String, i32)> {
    let mut r = ClassReader { bytes: class, pos: 0 };
    assert_eq!(r.u32(), 0xCAFE_BABE);
    r.u16();
    r.u16();

    let count = r.u16() as usize;
    let mut pool: Vec<Option<PoolEntry>> = vec![None; count];
    for slot in pool.iter_mut().skip(1) {
        *slot = Some(match r.u8() {
            1 => {
                let len = r.u16() as usize;
                PoolEntry::Utf8(String::from_utf8(r.take(len).to_vec()).unwrap())
            }
            3 => PoolEntry::Integer(r.u32() as i32),
            7 => PoolEntry::Class(r.u16()),
            tag => panic!("unexpected constant tag {tag}"),
        });
    }
    let utf8 = |idx: u16| match &pool[idx as usize] {
        Some(PoolEntry::Utf8(s)) => s.clone(),
        other => panic!("expected utf8 at {idx}, got {other:?}"),
    };

    r.u16(); // access
    r.u16(); // this
    r.u16(); // super
    let interfaces = r.u16() as usize;
    r.take(interfaces * 2);

    let mut fields = Vec::new();
    for _ in 0..r.u16() {
        r.u16();
        let name = utf8(r.u16());
        assert_eq!(utf8(r.u16()), "I");
        let mut value = None;
        for _ in 0..r.u16() {
            let attr = utf8(r.u16());
            let len = r.u32() as usize;
            let body = r.take(len);
            if attr == "ConstantValue" {
                let idx = u16::from_be_bytes([body[0], body[1]]);
                match pool[idx as usize] {
                    Some(PoolEntry::Integer(v)) => value = Some(v),
                    ref other => panic!("expected integer at {idx}, got {other:?}"),
                }
            }
        }
        fields.push((name, value.expect("ConstantValue attribute")));
    }
    fields
}

#[derive(Debug, Clone)]
enum PoolEntry {
    Utf8(String),
    Integer(i32),
    Class(u16),
}

struct ClassReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn take(&mut self, n: usize) -> &'a [u8] {
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn u16(&mut self) -> u16 {
        let b = self.take(2);
        u16::from_be_bytes([b[0], b[1]])
    }

    fn u32(&mut self) -> u32 {
        let b = self.take(4);
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }
}
