//! Named, typed metadata fields attached to an [`Image`](super::Image).
//!
//! Fields keep insertion order, mirroring how decoders attach them. The
//! well-known names live in [`fields`].

use std::fmt;

/// Well-known metadata field names.
pub mod fields {
    /// EXIF orientation as an integer 1–8.
    pub const ORIENTATION: &str = "orientation";
    /// Legacy string form of the orientation, e.g. `"6 (Rotate 90 CW)"`.
    pub const EXIF_ORIENTATION: &str = "exif-ifd0-Orientation";
    /// Height of one frame in a vertically stacked animation.
    pub const PAGE_HEIGHT: &str = "page-height";
    /// Per-frame delay in milliseconds.
    pub const GIF_DELAY: &str = "gif-delay";
    /// Loop count, 0 = forever.
    pub const GIF_LOOP: &str = "gif-loop";
    /// Number of pages in the source document.
    pub const N_PAGES: &str = "n-pages";
    /// Embedded ICC colour profile.
    pub const ICC_PROFILE: &str = "icc-profile-data";
    /// Raw EXIF block.
    pub const EXIF: &str = "exif-data";
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Int(i32),
    Double(f64),
    Str(String),
    Blob(Vec<u8>),
    IntArray(Vec<i32>),
}

impl MetaValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            MetaValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            MetaValue::Blob(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            MetaValue::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            MetaValue::Int(_) => "int",
            MetaValue::Double(_) => "double",
            MetaValue::Str(_) => "string",
            MetaValue::Blob(_) => "blob",
            MetaValue::IntArray(_) => "int-array",
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(v) => write!(f, "{v}"),
            MetaValue::Double(v) => write!(f, "{v}"),
            MetaValue::Str(v) => f.write_str(v),
            MetaValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
            MetaValue::IntArray(v) => write!(f, "{v:?}"),
        }
    }
}

/// Ordered field-name → value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    fields: Vec<(String, MetaValue)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a field, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: MetaValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<MetaValue> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &MetaValue) -> bool) {
        self.fields.retain(|(n, v)| keep(n, v));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
