use std::fmt;
use std::path::{Path, PathBuf};

/// Resource folder kinds accepted directly below a resource root.
///
/// A folder is named `<kind>[-<qualifiers>]`, e.g. `values-fr` or
/// `drawable-hdpi-v21`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderType {
    Anim,
    Animator,
    Color,
    Drawable,
    Font,
    Interpolator,
    Layout,
    Menu,
    Mipmap,
    Navigation,
    Raw,
    Transition,
    Values,
    Xml,
}

impl FolderType {
    pub const ALL: &'static [FolderType] = &[
        FolderType::Anim,
        FolderType::Animator,
        FolderType::Color,
        FolderType::Drawable,
        FolderType::Font,
        FolderType::Interpolator,
        FolderType::Layout,
        FolderType::Menu,
        FolderType::Mipmap,
        FolderType::Navigation,
        FolderType::Raw,
        FolderType::Transition,
        FolderType::Values,
        FolderType::Xml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FolderType::Anim => "anim",
            FolderType::Animator => "animator",
            FolderType::Color => "color",
            FolderType::Drawable => "drawable",
            FolderType::Font => "font",
            FolderType::Interpolator => "interpolator",
            FolderType::Layout => "layout",
            FolderType::Menu => "menu",
            FolderType::Mipmap => "mipmap",
            FolderType::Navigation => "navigation",
            FolderType::Raw => "raw",
            FolderType::Transition => "transition",
            FolderType::Values => "values",
            FolderType::Xml => "xml",
        }
    }

    /// Split a folder name into its kind and qualifier string.
    pub fn parse_folder(dir_name: &str) -> Option<(FolderType, String)> {
        let (kind, qualifiers) = match dir_name.split_once('-') {
            Some((kind, rest)) => (kind, rest),
            None => (dir_name, ""),
        };
        let kind = Self::ALL.iter().copied().find(|f| f.name() == kind)?;
        Some((kind, qualifiers.to_string()))
    }

    /// The resource type a *file* in this folder declares.
    /// `values` folders declare typed elements instead, hence `None`.
    pub fn file_resource_type(self) -> Option<ResourceType> {
        Some(match self {
            FolderType::Anim => ResourceType::Anim,
            FolderType::Animator => ResourceType::Animator,
            FolderType::Color => ResourceType::Color,
            FolderType::Drawable => ResourceType::Drawable,
            FolderType::Font => ResourceType::Font,
            FolderType::Interpolator => ResourceType::Interpolator,
            FolderType::Layout => ResourceType::Layout,
            FolderType::Menu => ResourceType::Menu,
            FolderType::Mipmap => ResourceType::Mipmap,
            FolderType::Navigation => ResourceType::Navigation,
            FolderType::Raw => ResourceType::Raw,
            FolderType::Transition => ResourceType::Transition,
            FolderType::Xml => ResourceType::Xml,
            FolderType::Values => return None,
        })
    }
}

/// Type tag of a single declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Anim,
    Animator,
    Array,
    Attr,
    Bool,
    Color,
    Dimen,
    Drawable,
    Font,
    Fraction,
    Id,
    Integer,
    Interpolator,
    Layout,
    Menu,
    Mipmap,
    Navigation,
    Plurals,
    Raw,
    String,
    Style,
    Styleable,
    Transition,
    Xml,
}

impl ResourceType {
    pub const ALL: &'static [ResourceType] = &[
        ResourceType::Anim,
        ResourceType::Animator,
        ResourceType::Array,
        ResourceType::Attr,
        ResourceType::Bool,
        ResourceType::Color,
        ResourceType::Dimen,
        ResourceType::Drawable,
        ResourceType::Font,
        ResourceType::Fraction,
        ResourceType::Id,
        ResourceType::Integer,
        ResourceType::Interpolator,
        ResourceType::Layout,
        ResourceType::Menu,
        ResourceType::Mipmap,
        ResourceType::Navigation,
        ResourceType::Plurals,
        ResourceType::Raw,
        ResourceType::String,
        ResourceType::Style,
        ResourceType::Styleable,
        ResourceType::Transition,
        ResourceType::Xml,
    ];

    /// Tag written into archives and symbol tables.
    pub fn tag(self) -> &'static str {
        match self {
            ResourceType::Anim => "anim",
            ResourceType::Animator => "animator",
            ResourceType::Array => "array",
            ResourceType::Attr => "attr",
            ResourceType::Bool => "bool",
            ResourceType::Color => "color",
            ResourceType::Dimen => "dimen",
            ResourceType::Drawable => "drawable",
            ResourceType::Font => "font",
            ResourceType::Fraction => "fraction",
            ResourceType::Id => "id",
            ResourceType::Integer => "integer",
            ResourceType::Interpolator => "interpolator",
            ResourceType::Layout => "layout",
            ResourceType::Menu => "menu",
            ResourceType::Mipmap => "mipmap",
            ResourceType::Navigation => "navigation",
            ResourceType::Plurals => "plurals",
            ResourceType::Raw => "raw",
            ResourceType::String => "string",
            ResourceType::Style => "style",
            ResourceType::Styleable => "styleable",
            ResourceType::Transition => "transition",
            ResourceType::Xml => "xml",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One file found below a validated resource root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    /// Index of the root this file was found under.
    pub root: usize,
    pub path: PathBuf,
    /// Path relative to the root, e.g. `values-fr/strings.xml`.
    pub relative: PathBuf,
    pub folder: FolderType,
    pub qualifiers: String,
}

impl ResourceFile {
    pub fn is_values(&self) -> bool {
        self.folder == FolderType::Values
    }

    /// Ordering key used everywhere a stable unit order matters:
    /// root order, `values` folders first, then relative path.
    pub fn canonical_key(&self) -> (usize, bool, &Path) {
        (self.root, !self.is_values(), &self.relative)
    }

    /// Scratch location of this file's compiled output: `<root>/<folder>/<file>`.
    /// Distinct files never share one.
    pub fn unit_path(&self) -> PathBuf {
        PathBuf::from(self.root.to_string()).join(&self.relative)
    }
}

/// A validated, ordered resource tree bound to a library identity.
#[derive(Debug, Clone)]
pub struct ResourceSet {
    pub label: String,
    /// Directories the files are read from. May be a rewritten copy.
    pub roots: Vec<PathBuf>,
    /// Roots as declared by the caller; recorded as provenance.
    pub source_roots: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
    /// Every compilable file, in canonical order.
    pub files: Vec<ResourceFile>,
}

/// One declared resource produced by the compiler backend.
///
/// `offset`/`len` locate the entry's payload inside its unit blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledResourceEntry {
    pub ty: ResourceType,
    pub qualifiers: String,
    pub name: String,
    pub offset: usize,
    pub len: usize,
}

/// Result of compiling a single resource file.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub source: ResourceFile,
    /// Intermediate blob left in the compiler's scratch area.
    pub flat_path: PathBuf,
    pub blob: Vec<u8>,
    pub entries: Vec<CompiledResourceEntry>,
}

impl CompiledUnit {
    pub fn payload(&self, entry: &CompiledResourceEntry) -> &[u8] {
        &self.blob[entry.offset..entry.offset + entry.len]
    }
}

/// Where a parsed resource came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    Primary,
    Dependency,
}

/// One configuration-specific value of a parsed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredValue {
    pub qualifiers: String,
    /// Source file relative to its root, as recorded in the archive.
    pub source: String,
    pub len: usize,
    /// Present only when the archive was read with content validation.
    pub payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAndroidDataEntry {
    pub ty: ResourceType,
    pub name: String,
    pub provenance: DependencyType,
    pub values: Vec<ConfiguredValue>,
}
