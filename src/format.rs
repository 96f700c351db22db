//! The closed set of container formats the dispatcher knows about.
//!
//! The integer identity of each variant is stable (`Unknown = 0`, then
//! alphabetical) so hosts that pass formats across an FFI or a wire protocol
//! can rely on it.
//!
//! | Format | Extension | Magic |
//! |---|---|---|
//! | JPEG | `jpg` | `FF D8 FF` |
//! | PNG | `png` | `89 50 4E 47` |
//! | GIF | `gif` | `GIF` |
//! | WEBP | `webp` | `WEBP` at offset 8 |
//! | PDF | `pdf` | `%PDF-` |
//! | BMP | `bmp` | `BM` |
//! | ICO | `ico` | `00 00 01 00` |
//! | TIFF | `tiff` | `II*\0` / `MM\0*` |
//! | HEIF | `heif` | `ftyp` box of size `0x18` |
//! | AVIF | `avif` | `ftyp` box of size `0x1C` |
//! | SVG | `svg` | (extension only) |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ImageFormat {
    #[default]
    Unknown = 0,
    Avif,
    Bmp,
    Gif,
    Heif,
    Ico,
    Jpeg,
    Pdf,
    Png,
    Svg,
    Tiff,
    Webp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 11] = [
        ImageFormat::Avif,
        ImageFormat::Bmp,
        ImageFormat::Gif,
        ImageFormat::Heif,
        ImageFormat::Ico,
        ImageFormat::Jpeg,
        ImageFormat::Pdf,
        ImageFormat::Png,
        ImageFormat::Svg,
        ImageFormat::Tiff,
        ImageFormat::Webp,
    ];

    /// Canonical file extension without the dot, `None` for `Unknown`.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ImageFormat::Unknown => None,
            ImageFormat::Avif => Some("avif"),
            ImageFormat::Bmp => Some("bmp"),
            ImageFormat::Gif => Some("gif"),
            ImageFormat::Heif => Some("heif"),
            ImageFormat::Ico => Some("ico"),
            ImageFormat::Jpeg => Some("jpg"),
            ImageFormat::Pdf => Some("pdf"),
            ImageFormat::Png => Some("png"),
            ImageFormat::Svg => Some("svg"),
            ImageFormat::Tiff => Some("tiff"),
            ImageFormat::Webp => Some("webp"),
        }
    }

    /// Parse a file extension or format name. Never fails: anything
    /// unrecognised maps to `Unknown`.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        match ext.to_ascii_lowercase().as_str() {
            "avif" => ImageFormat::Avif,
            "bmp" => ImageFormat::Bmp,
            "gif" => ImageFormat::Gif,
            "heic" | "heif" => ImageFormat::Heif,
            "ico" => ImageFormat::Ico,
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "pdf" => ImageFormat::Pdf,
            "png" => ImageFormat::Png,
            "svg" => ImageFormat::Svg,
            "tif" | "tiff" => ImageFormat::Tiff,
            "webp" => ImageFormat::Webp,
            _ => ImageFormat::Unknown,
        }
    }

    /// Guess the format from the leading bytes of an encoded image.
    pub fn sniff(buf: &[u8]) -> Self {
        let at = |offset: usize, magic: &[u8]| {
            buf.get(offset..offset + magic.len()) == Some(magic)
        };

        if at(0, &[0xFF, 0xD8, 0xFF]) {
            return ImageFormat::Jpeg;
        }
        if at(0, &[0x89, b'P', b'N', b'G']) {
            return ImageFormat::Png;
        }
        if at(0, b"GIF") {
            return ImageFormat::Gif;
        }
        if at(8, b"WEBP") {
            return ImageFormat::Webp;
        }
        if at(0, b"%PDF-") {
            return ImageFormat::Pdf;
        }
        if at(0, b"BM") {
            return ImageFormat::Bmp;
        }
        if at(0, &[0x00, 0x00, 0x01, 0x00]) {
            return ImageFormat::Ico;
        }
        if at(0, b"II*\0") || at(0, b"MM\0*") {
            return ImageFormat::Tiff;
        }
        // ISO-BMFF: the ftyp box length tells the two brands apart
        if at(3, &[0x18]) && at(4, b"ftyp") {
            return ImageFormat::Heif;
        }
        if at(3, &[0x1C]) && at(4, b"ftyp") {
            return ImageFormat::Avif;
        }
        ImageFormat::Unknown
    }

    /// Paged formats accept page/page-count decode options.
    pub fn is_paged(self) -> bool {
        matches!(self, ImageFormat::Pdf | ImageFormat::Gif)
    }

    /// Whether an encoder exists for this format at all.
    pub fn is_encodable(self) -> bool {
        !matches!(self, ImageFormat::Pdf | ImageFormat::Svg | ImageFormat::Unknown)
    }
}

impl TryFrom<i32> for ImageFormat {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value == 0 {
            return Ok(ImageFormat::Unknown);
        }
        usize::try_from(value - 1)
            .ok()
            .and_then(|i| ImageFormat::ALL.get(i).copied())
            .ok_or(value)
    }
}

impl From<ImageFormat> for i32 {
    fn from(format: ImageFormat) -> Self {
        format as i32
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().unwrap_or("unknown"))
    }
}

impl Serialize for ImageFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.extension().unwrap_or("unknown"))
    }
}

impl<'de> Deserialize<'de> for ImageFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        match ImageFormat::from_extension(&text) {
            ImageFormat::Unknown => Err(serde::de::Error::custom(format!(
                "unknown image format \"{text}\""
            ))),
            format => Ok(format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_identity_is_stable() {
        assert_eq!(i32::from(ImageFormat::Unknown), 0);
        assert_eq!(i32::from(ImageFormat::Avif), 1);
        assert_eq!(i32::from(ImageFormat::Ico), 5);
        assert_eq!(i32::from(ImageFormat::Jpeg), 6);
        assert_eq!(i32::from(ImageFormat::Webp), 11);
        for format in ImageFormat::ALL {
            assert_eq!(ImageFormat::try_from(i32::from(format)), Ok(format));
        }
        assert_eq!(ImageFormat::try_from(12), Err(12));
        assert_eq!(ImageFormat::try_from(-1), Err(-1));
    }

    #[test]
    fn extension_aliases() {
        assert_eq!(ImageFormat::from_extension("jpeg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension(".JPG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("heic"), ImageFormat::Heif);
        assert_eq!(ImageFormat::from_extension("tif"), ImageFormat::Tiff);
        assert_eq!(ImageFormat::from_extension("psd"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::from_extension(""), ImageFormat::Unknown);
    }

    #[test]
    fn canonical_extension_round_trips() {
        for format in ImageFormat::ALL {
            let ext = format.extension().unwrap();
            assert_eq!(ImageFormat::from_extension(ext), format);
        }
        assert_eq!(ImageFormat::Unknown.extension(), None);
        assert_eq!(ImageFormat::Jpeg.to_string(), "jpg");
    }

    #[test]
    fn sniff_known_signatures() {
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(
            ImageFormat::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(ImageFormat::sniff(b"RIFF\0\0\0\0WEBPVP8 "), ImageFormat::Webp);
        assert_eq!(ImageFormat::sniff(b"%PDF-1.7"), ImageFormat::Pdf);
        assert_eq!(ImageFormat::sniff(b"BM\0\0"), ImageFormat::Bmp);
        assert_eq!(ImageFormat::sniff(&[0, 0, 1, 0, 1, 0]), ImageFormat::Ico);
        assert_eq!(ImageFormat::sniff(b"II*\0"), ImageFormat::Tiff);
        assert_eq!(ImageFormat::sniff(b"MM\0*"), ImageFormat::Tiff);
        assert_eq!(
            ImageFormat::sniff(b"\0\0\0\x18ftypheic"),
            ImageFormat::Heif
        );
        assert_eq!(
            ImageFormat::sniff(b"\0\0\0\x1Cftypavif"),
            ImageFormat::Avif
        );
    }

    #[test]
    fn sniff_short_or_garbage_is_unknown() {
        assert_eq!(ImageFormat::sniff(&[]), ImageFormat::Unknown);
        assert_eq!(ImageFormat::sniff(&[0xFF]), ImageFormat::Unknown);
        assert_eq!(ImageFormat::sniff(b"hello world!"), ImageFormat::Unknown);
    }

    #[test]
    fn encodable_matches_encoder_table() {
        for format in ImageFormat::ALL {
            let expected = !matches!(format, ImageFormat::Pdf | ImageFormat::Svg);
            assert_eq!(format.is_encodable(), expected, "{format}");
        }
        assert!(!ImageFormat::Unknown.is_encodable());
    }

    #[test]
    fn serde_uses_extension_names() {
        #[derive(Deserialize, Serialize)]
        struct Holder {
            format: ImageFormat,
        }
        let holder: Holder = toml::from_str("format = \"jpeg\"").unwrap();
        assert_eq!(holder.format, ImageFormat::Jpeg);
        assert_eq!(toml::to_string(&holder).unwrap().trim(), "format = \"jpg\"");
        assert!(toml::from_str::<Holder>("format = \"psd\"").is_err());
    }
}
