//! Content classification decides the type of an image from its bytes alone.
//!
//! Neither the filename nor the `Content-Type` supplied by the client is
//! consulted. The sniffed type is looked up in a [TypeTable], which pairs each
//! accepted MIME type with the single extension used in storage paths.
//!
//! By default sniffing matches the leading signature bytes of the content.
//! If built with the `magic` feature, the `tree_magic` database is used instead.
use std::str::FromStr;

use mime::Mime;

use log::debug;

use crate::error::{
    RelayError,
    Result,
};

const TYPES: [(&str, &str); 5] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/bmp", "bmp"),
];

/// Bidirectional MIME type to extension mapping of the accepted image types.
///
/// The same table governs both what may be uploaded and what may be served.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTable {
    entries: Vec<(Mime, &'static str)>,
}

impl TypeTable {

    /// All supported types: jpg, png, gif, webp and bmp.
    pub fn standard() -> TypeTable {
        let mut entries = vec!();
        for (m, ext) in TYPES.iter() {
            if let Ok(v) = Mime::from_str(m) {
                entries.push((v, *ext));
            }
        }
        TypeTable {
            entries,
        }
    }

    /// Restrict the table to the given extensions.
    ///
    /// Fails if an extension is not one of the supported types, or if the
    /// resulting table would be empty.
    pub fn with_extensions(extensions: &[&str]) -> Result<TypeTable> {
        let standard = TypeTable::standard();
        let mut entries = vec!();
        for ext in extensions {
            let ext = ext.trim().to_ascii_lowercase();
            if ext.is_empty() {
                continue;
            }
            match standard.entries.iter().find(|(_, v)| *v == ext) {
                Some(entry) => {
                    if !entries.contains(entry) {
                        entries.push(entry.clone());
                    }
                },
                None => {
                    return Err(RelayError::Config(format!("unsupported image extension {}", ext)));
                },
            }
        }
        if entries.is_empty() {
            return Err(RelayError::Config(String::from("no image types allowed")));
        }
        Ok(TypeTable {
            entries,
        })
    }

    pub fn extension_for(&self, mime: &Mime) -> Option<&'static str> {
        self.entries.iter()
            .find(|(m, _)| m.essence_str() == mime.essence_str())
            .map(|(_, ext)| *ext)
    }

    pub fn mime_for(&self, extension: &str) -> Option<&Mime> {
        self.entries.iter()
            .find(|(_, ext)| *ext == extension)
            .map(|(m, _)| m)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(_, ext)| *ext)
    }

    pub fn mimes(&self) -> impl Iterator<Item = &Mime> + '_ {
        self.entries.iter().map(|(m, _)| m)
    }
}

/// Determine the MIME type of content from its leading bytes.
///
/// Unrecognized content is `application/octet-stream`.
#[cfg(not(feature = "magic"))]
pub fn sniff(data: &[u8]) -> Mime {
    match image::guess_format(data) {
        Ok(v) => {
            Mime::from_str(v.to_mime_type()).unwrap_or(mime::APPLICATION_OCTET_STREAM)
        },
        Err(e) => {
            debug!("no image signature found: {}", e);
            mime::APPLICATION_OCTET_STREAM
        },
    }
}

/// Determine the MIME type of content with the shared mime database.
#[cfg(feature = "magic")]
pub fn sniff(data: &[u8]) -> Mime {
    let s = tree_magic::from_u8(data);
    debug!("magic detected {}", &s);
    match s.as_str() {
        "image/x-ms-bmp" | "image/x-bmp" => mime::IMAGE_BMP,
        _ => Mime::from_str(&s).unwrap_or(mime::APPLICATION_OCTET_STREAM),
    }
}

/// Classifies content against a [TypeTable].
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    table: TypeTable,
}

impl ContentClassifier {

    pub fn new(table: TypeTable) -> ContentClassifier {
        ContentClassifier {
            table,
        }
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    pub fn sniff(&self, data: &[u8]) -> Mime {
        sniff(data)
    }

    /// Storage extension for a sniffed type, rejecting types outside the table.
    pub fn extension_for(&self, mime: &Mime) -> Result<&'static str> {
        match self.table.extension_for(mime) {
            Some(v) => Ok(v),
            None => {
                debug!("rejecting content type {}", mime);
                Err(RelayError::UnsupportedType(mime.clone()))
            },
        }
    }

    /// Check that content fetched for a path still sniffs to the type its extension implies.
    pub fn validate_match(&self, expected: &Mime, actual: &Mime) -> Result<()> {
        if expected.essence_str() != actual.essence_str() {
            return Err(RelayError::TypeMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{
        sniff,
        ContentClassifier,
        TypeTable,
    };
    use crate::error::RelayError;
    use std::str::FromStr;
    use mime::Mime;

    pub fn png_bytes(size: usize) -> Vec<u8> {
        let mut v = vec!(0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a);
        v.resize(size, 0x2a);
        v
    }

    pub fn jpeg_bytes(size: usize) -> Vec<u8> {
        let mut v = vec!(0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0x4a, 0x46, 0x49, 0x46, 0x00);
        v.resize(size, 0x2a);
        v
    }

    pub fn gif_bytes(size: usize) -> Vec<u8> {
        let mut v = b"GIF89a".to_vec();
        v.resize(size, 0x00);
        v
    }

    pub fn webp_bytes(size: usize) -> Vec<u8> {
        let mut v = b"RIFF".to_vec();
        v.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        v.extend_from_slice(b"WEBPVP8 ");
        v.resize(size, 0x00);
        v
    }

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff(&png_bytes(64)), mime::IMAGE_PNG);
        assert_eq!(sniff(&jpeg_bytes(64)), mime::IMAGE_JPEG);
        assert_eq!(sniff(&gif_bytes(64)), mime::IMAGE_GIF);
        assert_eq!(sniff(&webp_bytes(64)).essence_str(), "image/webp");
        assert_eq!(sniff(b"foobar"), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(sniff(b""), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_table_bidirectional() {
        let t = TypeTable::standard();
        for ext in t.extensions() {
            let m = t.mime_for(ext).unwrap();
            assert_eq!(t.extension_for(m), Some(ext));
        }
        assert_eq!(t.extension_for(&mime::IMAGE_JPEG), Some("jpg"));
        assert_eq!(t.mime_for("bmp"), Some(&mime::IMAGE_BMP));
        assert_eq!(t.mime_for("jpeg"), None);
    }

    #[test]
    fn test_table_subset() {
        let t = TypeTable::with_extensions(&["png", " JPG ", "png"]).unwrap();
        assert_eq!(t.extensions().collect::<Vec<&str>>(), vec!("png", "jpg"));
        assert_eq!(t.extension_for(&mime::IMAGE_GIF), None);

        assert!(TypeTable::with_extensions(&["tiff"]).is_err());
        assert!(TypeTable::with_extensions(&[""]).is_err());
    }

    #[test]
    fn test_extension_for_rejects() {
        let c = ContentClassifier::new(TypeTable::standard());
        assert_eq!(c.extension_for(&mime::IMAGE_PNG).unwrap(), "png");
        let svg = Mime::from_str("image/svg+xml").unwrap();
        match c.extension_for(&svg) {
            Err(RelayError::UnsupportedType(m)) => {
                assert_eq!(m, svg);
            },
            v => {
                panic!("expected unsupported type, got {:?}", v);
            },
        }
    }

    #[test]
    fn test_validate_match() {
        let c = ContentClassifier::new(TypeTable::standard());
        assert!(c.validate_match(&mime::IMAGE_PNG, &mime::IMAGE_PNG).is_ok());
        match c.validate_match(&mime::IMAGE_PNG, &mime::IMAGE_JPEG) {
            Err(RelayError::TypeMismatch{expected, actual}) => {
                assert_eq!(expected, mime::IMAGE_PNG);
                assert_eq!(actual, mime::IMAGE_JPEG);
            },
            v => {
                panic!("expected mismatch, got {:?}", v);
            },
        }
    }
}
