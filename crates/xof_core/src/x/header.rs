//! `.X` file header validation.
//!
//! Every `.X` file starts with a fixed 16-byte header:
//!
//! ```text
//! xof 0303txt 0032
//! ^^^^ magic
//!     ^^^^ version (major, minor)
//!         ^^^^ format tag
//!             ^^^^ float size in bits
//! ```
//!
//! Only the plain-text `txt ` format is supported. The header is checked
//! before any tokenizing happens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic token every `.X` file starts with.
pub const MAGIC: &str = "xof ";

/// Length of the fixed header in bytes.
pub const HEADER_LEN: usize = 16;

/// Errors raised while validating the header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Missing 'xof ' magic at start of file")]
    MissingMagic,

    #[error("Header truncated: expected 16 bytes")]
    Truncated,

    #[error("Invalid header version: {0:?}")]
    InvalidVersion(String),

    #[error("Unknown format tag: {0:?}")]
    UnknownFormat(String),

    #[error("Unsupported format {0}: only text files can be loaded")]
    UnsupportedFormat(XFormat),

    #[error("Invalid float size: {0:?}")]
    InvalidFloatSize(String),
}

/// Body encoding declared by the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum XFormat {
    /// `txt ` - plain text
    Text,
    /// `bin ` - binary tokens
    Binary,
    /// `tzip` - MSZip-compressed text
    CompressedText,
    /// `bzip` - MSZip-compressed binary
    CompressedBinary,
}

impl XFormat {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "txt " => Some(XFormat::Text),
            "bin " => Some(XFormat::Binary),
            "tzip" => Some(XFormat::CompressedText),
            "bzip" => Some(XFormat::CompressedBinary),
            _ => None,
        }
    }

    /// The four-character tag as written in the header.
    pub fn tag(&self) -> &'static str {
        match self {
            XFormat::Text => "txt ",
            XFormat::Binary => "bin ",
            XFormat::CompressedText => "tzip",
            XFormat::CompressedBinary => "bzip",
        }
    }
}

impl std::fmt::Display for XFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}'", self.tag().trim_end())
    }
}

/// A validated `.X` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XHeader {
    pub major: u8,
    pub minor: u8,
    pub format: XFormat,
    /// Float width in bits (32 or 64)
    pub float_size: u32,
}

/// Parse the header fields without rejecting non-text formats.
fn read_header(content: &str) -> Result<XHeader, FormatError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if !content.starts_with(MAGIC) {
        return Err(FormatError::MissingMagic);
    }

    let field = |range: std::ops::Range<usize>| content.get(range).ok_or(FormatError::Truncated);

    let version = field(4..8)?;
    let format_tag = field(8..12)?;
    let float_tag = field(12..16)?;

    if !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::InvalidVersion(version.to_string()));
    }
    // Both halves are two ASCII digits, so these parses cannot fail.
    let major = version[..2].parse().map_err(|_| FormatError::InvalidVersion(version.to_string()))?;
    let minor = version[2..].parse().map_err(|_| FormatError::InvalidVersion(version.to_string()))?;

    let format = XFormat::from_tag(format_tag)
        .ok_or_else(|| FormatError::UnknownFormat(format_tag.to_string()))?;

    let float_size = match float_tag {
        "0032" => 32,
        "0064" => 64,
        other => return Err(FormatError::InvalidFloatSize(other.to_string())),
    };

    Ok(XHeader {
        major,
        minor,
        format,
        float_size,
    })
}

/// Validate the header and return it together with the object section
/// (everything after the 16 header bytes).
pub fn split_header(content: &str) -> Result<(XHeader, &str), FormatError> {
    let header = read_header(content)?;
    if header.format != XFormat::Text {
        return Err(FormatError::UnsupportedFormat(header.format));
    }

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    Ok((header, &content[HEADER_LEN..]))
}

/// True when `content` starts with a well-formed header of any format.
///
/// Binary and compressed files are claimed too, so that importing them
/// reports a typed [`FormatError::UnsupportedFormat`].
pub fn has_x_header(content: &str) -> bool {
    read_header(content).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_header_accepted() {
        let (header, body) = split_header("xof 0303txt 0032\nMesh {}").unwrap();
        assert_eq!(header.major, 3);
        assert_eq!(header.minor, 3);
        assert_eq!(header.format, XFormat::Text);
        assert_eq!(header.float_size, 32);
        assert_eq!(body, "\nMesh {}");
    }

    #[test]
    fn test_binary_header_rejected() {
        let err = split_header("xof 0303bin 0032").unwrap_err();
        assert_eq!(err, FormatError::UnsupportedFormat(XFormat::Binary));
    }

    #[test]
    fn test_compressed_header_rejected() {
        let err = split_header("xof 0302tzip0064....").unwrap_err();
        assert_eq!(err, FormatError::UnsupportedFormat(XFormat::CompressedText));
    }

    #[test]
    fn test_missing_magic() {
        assert_eq!(split_header("Mesh { }").unwrap_err(), FormatError::MissingMagic);
        assert_eq!(split_header("").unwrap_err(), FormatError::MissingMagic);
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(split_header("xof 0303tx").unwrap_err(), FormatError::Truncated);
    }

    #[test]
    fn test_invalid_fields() {
        assert!(matches!(
            split_header("xof 03a3txt 0032"),
            Err(FormatError::InvalidVersion(_))
        ));
        assert!(matches!(
            split_header("xof 0303abc 0032"),
            Err(FormatError::UnknownFormat(_))
        ));
        assert!(matches!(
            split_header("xof 0303txt 0016"),
            Err(FormatError::InvalidFloatSize(_))
        ));
    }

    #[test]
    fn test_byte_order_mark_skipped() {
        let (header, body) = split_header("\u{feff}xof 0302txt 0064 {}").unwrap();
        assert_eq!(header.float_size, 64);
        assert_eq!(body, " {}");
    }

    #[test]
    fn test_has_x_header() {
        assert!(has_x_header("xof 0303txt 0032"));
        assert!(has_x_header("xof 0303bin 0032"));
        assert!(!has_x_header("ply\nformat ascii 1.0"));
    }
}
