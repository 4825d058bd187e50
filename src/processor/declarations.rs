//! Finds the resources a single file declares.
//!
//! XML is read with a tag scanner, not a full parser: comments and CDATA
//! are masked out, tags are matched pairwise, and only the handful of
//! attributes that name a resource are looked at.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{ResourceFile, ResourceType};

lazy_static! {
    static ref MASKED: Regex = Regex::new(r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>").unwrap();
    static ref TAG: Regex =
        Regex::new(r#"<(/?)([A-Za-z_][\w:.\-]*)((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#).unwrap();
    static ref NAME_ATTR: Regex =
        Regex::new(r#"(?:^|\s)name\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref TYPE_ATTR: Regex =
        Regex::new(r#"(?:^|\s)type\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref NEW_ID: Regex = Regex::new(r"@\+id/([A-Za-z_][\w.]*)").unwrap();
}

/// A resource declared by a file; `span` indexes the file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub ty: ResourceType,
    pub name: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    Empty,
}

#[derive(Debug)]
struct Tag<'a> {
    kind: TagKind,
    name: &'a str,
    attrs: &'a str,
    span: Range<usize>,
}

/// Every declaration in `file`, whose contents are `bytes`.
pub fn declarations(file: &ResourceFile, bytes: &[u8]) -> Result<Vec<Declaration>, String> {
    if file.is_values() {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {e}"))?;
        return scan_values(text);
    }

    let ty = file
        .folder
        .file_resource_type()
        .ok_or_else(|| format!("{} folders hold no file resources", file.folder.name()))?;
    let file_name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = file_name.split('.').next().unwrap_or_default().to_string();
    if !is_valid_name(&name) {
        return Err(format!("invalid resource file name `{file_name}`"));
    }

    let mut out = vec![Declaration {
        ty,
        name,
        span: 0..bytes.len(),
    }];
    if file_name.ends_with(".xml") {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {e}"))?;
        check_balanced(text)?;
        out.extend(scan_new_ids(text));
    }
    Ok(out)
}

/// Top-level children of `<resources>`, plus the attrs a styleable declares.
pub fn scan_values(text: &str) -> Result<Vec<Declaration>, String> {
    let masked = mask(text);
    let mut stack: Vec<(&str, usize, Option<(ResourceType, String)>)> = Vec::new();
    let mut seen_root = false;
    let mut out = Vec::new();

    for tag in tags(&masked) {
        match tag.kind {
            TagKind::Close => {
                let Some((open, start, decl)) = stack.pop() else {
                    return Err(format!("unexpected </{}>", tag.name));
                };
                if open != tag.name {
                    return Err(format!("</{}> closes <{open}>", tag.name));
                }
                if let Some((ty, name)) = decl {
                    out.push(Declaration {
                        ty,
                        name,
                        span: start..tag.span.end,
                    });
                }
            }
            TagKind::Open | TagKind::Empty => {
                let decl = match stack.len() {
                    0 => {
                        if tag.name != "resources" || seen_root {
                            return Err(format!(
                                "expected a single <resources> root, found <{}>",
                                tag.name
                            ));
                        }
                        seen_root = true;
                        None
                    }
                    1 => classify(&tag)?,
                    2 if tag.name == "attr" && stack[1].0 == "declare-styleable" => {
                        let name = required_name(&tag)?;
                        (!name.starts_with("android:")).then_some((ResourceType::Attr, name))
                    }
                    _ => None,
                };
                if tag.kind == TagKind::Empty {
                    if let Some((ty, name)) = decl {
                        out.push(Declaration {
                            ty,
                            name,
                            span: tag.span.clone(),
                        });
                    }
                } else {
                    stack.push((tag.name, tag.span.start, decl));
                }
            }
        }
    }

    if let Some((open, _, _)) = stack.last() {
        return Err(format!("<{open}> is never closed"));
    }
    if !seen_root {
        return Err("no <resources> element".into());
    }
    Ok(out)
}

fn classify(tag: &Tag<'_>) -> Result<Option<(ResourceType, String)>, String> {
    let ty = match tag.name {
        "string" => ResourceType::String,
        "color" => ResourceType::Color,
        "dimen" => ResourceType::Dimen,
        "bool" => ResourceType::Bool,
        "integer" => ResourceType::Integer,
        "fraction" => ResourceType::Fraction,
        "drawable" => ResourceType::Drawable,
        "style" => ResourceType::Style,
        "array" | "string-array" | "integer-array" => ResourceType::Array,
        "plurals" => ResourceType::Plurals,
        "attr" => ResourceType::Attr,
        "declare-styleable" => ResourceType::Styleable,
        "item" => {
            let tag_name = attr(&TYPE_ATTR, tag.attrs)
                .ok_or_else(|| "<item> without a type attribute".to_string())?;
            ResourceType::from_tag(&tag_name)
                .ok_or_else(|| format!("unknown resource type `{tag_name}`"))?
        }
        // Visibility and tooling markers declare nothing.
        "public" | "public-group" | "staging-public-group" | "java-symbol" | "eat-comment"
        | "skip" | "overlayable" => return Ok(None),
        other => return Err(format!("unknown resource element <{other}>")),
    };
    Ok(Some((ty, required_name(tag)?)))
}

fn required_name(tag: &Tag<'_>) -> Result<String, String> {
    let name = attr(&NAME_ATTR, tag.attrs)
        .ok_or_else(|| format!("<{}> without a name attribute", tag.name))?;
    let bare = name.strip_prefix("android:").unwrap_or(&name);
    if bare.is_empty() || !bare.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err(format!("invalid resource name `{name}`"));
    }
    Ok(name)
}

fn attr(re: &Regex, attrs: &str) -> Option<String> {
    re.captures(attrs)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim().to_string())
}

/// `@+id/<name>` declarations, first occurrence only.
pub fn scan_new_ids(text: &str) -> Vec<Declaration> {
    let masked = mask(text);
    let mut out: Vec<Declaration> = Vec::new();
    for cap in NEW_ID.captures_iter(&masked) {
        let name = cap[1].to_string();
        if out.iter().any(|d| d.name == name) {
            continue;
        }
        out.push(Declaration {
            ty: ResourceType::Id,
            name,
            span: 0..0,
        });
    }
    out
}

/// Every opening tag has a matching closing tag.
pub fn check_balanced(text: &str) -> Result<(), String> {
    let masked = mask(text);
    let mut stack = Vec::new();
    for tag in tags(&masked) {
        match tag.kind {
            TagKind::Open => stack.push(tag.name),
            TagKind::Close => match stack.pop() {
                Some(open) if open == tag.name => {}
                Some(open) => return Err(format!("</{}> closes <{open}>", tag.name)),
                None => return Err(format!("unexpected </{}>", tag.name)),
            },
            TagKind::Empty => {}
        }
    }
    match stack.last() {
        Some(open) => Err(format!("<{open}> is never closed")),
        None => Ok(()),
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Blank out comments and CDATA while keeping byte offsets intact.
fn mask(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in MASKED.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        out.extend(std::iter::repeat_n(' ', m.len()));
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

fn tags(masked: &str) -> impl Iterator<Item = Tag<'_>> {
    TAG.captures_iter(masked).map(|cap| {
        let whole = cap.get(0).map_or(0..0, |m| m.range());
        let kind = if &cap[1] == "/" {
            TagKind::Close
        } else if &cap[4] == "/" {
            TagKind::Empty
        } else {
            TagKind::Open
        };
        Tag {
            kind,
            name: cap.get(2).map_or("", |m| m.as_str()),
            attrs: cap.get(3).map_or("", |m| m.as_str()),
            span: whole,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FolderType;
    use std::path::PathBuf;

    fn names(decls: &[Declaration]) -> Vec<(ResourceType, &str)> {
        decls.iter().map(|d| (d.ty, d.name.as_str())).collect()
    }

    fn file(rel: &str) -> ResourceFile {
        let relative = PathBuf::from(rel);
        let dir = relative.parent().unwrap().to_str().unwrap().to_string();
        let (folder, qualifiers) = FolderType::parse_folder(&dir).unwrap();
        ResourceFile {
            root: 0,
            path: PathBuf::from("/res").join(&relative),
            relative,
            folder,
            qualifiers,
        }
    }

    #[test]
    fn values_top_level_elements() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <!-- <string name="commented">no</string> -->
    <string name="app_name">Demo</string>
    <color name="accent">#ff0000</color>
    <item type="id" name="anchor"/>
    <style name="Theme.Demo" parent="Theme.Base">
        <item name="android:colorAccent">@color/accent</item>
    </style>
    <string-array name="planets"><item>Earth</item></string-array>
    <public type="string" name="app_name"/>
</resources>"#;
        let decls = scan_values(xml).unwrap();
        assert_eq!(
            names(&decls),
            vec![
                (ResourceType::String, "app_name"),
                (ResourceType::Color, "accent"),
                (ResourceType::Id, "anchor"),
                (ResourceType::Style, "Theme.Demo"),
                (ResourceType::Array, "planets"),
            ]
        );
        assert_eq!(&xml[decls[0].span.clone()], r#"<string name="app_name">Demo</string>"#);
    }

    #[test]
    fn styleable_declares_nested_attrs() {
        let xml = r#"<resources>
  <declare-styleable name="Chip">
    <attr name="chipColor" format="color"/>
    <attr name="android:text"/>
  </declare-styleable>
</resources>"#;
        let decls = scan_values(xml).unwrap();
        assert_eq!(
            names(&decls),
            vec![(ResourceType::Attr, "chipColor"), (ResourceType::Styleable, "Chip")]
        );
    }

    #[test]
    fn malformed_values_rejected() {
        assert!(scan_values("<resources><string name=\"a\">x</resources>").is_err());
        assert!(scan_values("<resources><string>x</string></resources>").is_err());
        assert!(scan_values("<resources><widget name=\"w\"/></resources>").is_err());
        assert!(scan_values("<resources><item type=\"bogus\" name=\"w\"/></resources>").is_err());
        assert!(scan_values("<resources>").is_err());
        assert!(scan_values("").is_err());
    }

    #[test]
    fn layout_declares_itself_and_new_ids() {
        let xml = br#"<LinearLayout>
  <TextView android:id="@+id/title"/>
  <TextView android:id="@+id/body" android:layout_below="@id/title"/>
  <Button android:id="@+id/title"/>
</LinearLayout>"#;
        let decls = declarations(&file("layout/main.xml"), xml).unwrap();
        assert_eq!(
            names(&decls),
            vec![
                (ResourceType::Layout, "main"),
                (ResourceType::Id, "title"),
                (ResourceType::Id, "body"),
            ]
        );
        assert_eq!(decls[0].span, 0..xml.len());
    }

    #[test]
    fn binary_file_named_by_stem() {
        let decls = declarations(&file("drawable-hdpi/btn.9.png"), &[0x89, 0x50, 0x4e]).unwrap();
        assert_eq!(names(&decls), vec![(ResourceType::Drawable, "btn")]);
    }

    #[test]
    fn bad_file_name_rejected() {
        assert!(declarations(&file("raw/my-song.mp3"), b"id3").is_err());
    }

    #[test]
    fn unbalanced_layout_rejected() {
        let body = b"<LinearLayout><TextView></LinearLayout>";
        let err = declarations(&file("layout/broken.xml"), body).unwrap_err();
        assert!(err.contains("closes"), "got {err}");
    }
}
