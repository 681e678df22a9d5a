//! Storage paths are derived from the content alone:
//!
//! ``` ignore,
//! /uploads/{YYYY}/{MM}/{DD}/{sha256 hex}.{extension}
//! ```
//!
//! The date is the upload date. Paths issued once stay valid forever, so this
//! layout must not change.
use std::fmt;

use chrono::{
    Datelike,
    NaiveDate,
};
use regex::Regex;

use log::debug;

use crate::classify::TypeTable;
use crate::error::{
    RelayError,
    Result,
};

const PATH_PREFIX: &str = "/uploads";

/// A path in the remote store that conforms to the storage grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    v: String,
}

impl StoragePath {
    pub fn as_str(&self) -> &str {
        &self.v
    }

    /// The day partition directory holding the object.
    pub fn directory(&self) -> &str {
        match self.v.rfind('/') {
            Some(i) => &self.v[..i],
            None => "",
        }
    }

    pub fn file_name(&self) -> &str {
        match self.v.rfind('/') {
            Some(i) => &self.v[i+1..],
            None => &self.v,
        }
    }

    pub fn extension(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(i) => &name[i+1..],
            None => "",
        }
    }

    pub fn hash(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(i) => &name[..i],
            None => name,
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.v)
    }
}

/// Build the storage path for content.
///
/// # Arguments
///
/// * `hash` - Lowercase hex SHA256 of the content.
/// * `extension` - Extension of the sniffed content type.
/// * `date` - Upload date.
pub fn derive_path(hash: &str, extension: &str, date: NaiveDate) -> StoragePath {
    let v = format!(
        "{}/{:04}/{:02}/{:02}/{}.{}",
        PATH_PREFIX,
        date.year(),
        date.month(),
        date.day(),
        hash,
        extension,
    );
    StoragePath {
        v,
    }
}

/// Validates paths requested by clients against the storage grammar.
#[derive(Debug, Clone)]
pub struct PathNamer {
    grammar: Regex,
}

impl PathNamer {

    /// Compile the grammar for the extensions in the table.
    pub fn new(table: &TypeTable) -> Result<PathNamer> {
        let exts: Vec<String> = table.extensions().map(regex::escape).collect();
        let s = format!(
            r"^/uploads/[0-9]{{4}}/[0-9]{{2}}/[0-9]{{2}}/[a-f0-9]{{64}}\.({})$",
            exts.join("|"),
        );
        let grammar = Regex::new(&s).map_err(|e| {
            RelayError::Config(format!("path grammar: {}", e))
        })?;
        Ok(PathNamer {
            grammar,
        })
    }

    pub fn derive_path(&self, hash: &str, extension: &str, date: NaiveDate) -> StoragePath {
        derive_path(hash, extension, date)
    }

    /// Accept a client supplied path only if the whole string matches the grammar.
    pub fn validate_requested_path(&self, candidate: &str) -> Result<StoragePath> {
        if candidate.contains("..") || !self.grammar.is_match(candidate) {
            debug!("rejecting requested path {:?}", candidate);
            return Err(RelayError::bad_request("Invalid file path"));
        }
        Ok(StoragePath {
            v: candidate.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        derive_path,
        PathNamer,
    };
    use crate::classify::TypeTable;
    use crate::error::RelayError;
    use chrono::NaiveDate;

    const HASH: &str = "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";

    #[test]
    fn test_derive_path() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let p = derive_path(HASH, "png", d);
        assert_eq!(p.as_str(), format!("/uploads/2024/03/05/{}.png", HASH));
        assert_eq!(p.directory(), "/uploads/2024/03/05");
        assert_eq!(p.hash(), HASH);
        assert_eq!(p.extension(), "png");
        assert_eq!(p, derive_path(HASH, "png", d));
    }

    #[test]
    fn test_validate_ok() {
        let namer = PathNamer::new(&TypeTable::standard()).unwrap();
        let d = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        for ext in ["jpg", "png", "gif", "webp", "bmp"] {
            let p = derive_path(HASH, ext, d);
            let r = namer.validate_requested_path(p.as_str()).unwrap();
            assert_eq!(r, p);
        }
    }

    #[test]
    fn test_validate_rejects() {
        let namer = PathNamer::new(&TypeTable::with_extensions(&["jpg", "png"]).unwrap()).unwrap();
        let bogus = [
            format!("/uploads/2024/03/05/{}.gif", HASH),
            format!("/uploads/2024/03/05/{}.PNG", HASH),
            format!("/uploads/2024/03/05/{}.png\n", HASH),
            format!("x/uploads/2024/03/05/{}.png", HASH),
            format!("/uploads/2024/03/05/{}.png/..", HASH),
            format!("/uploads/2024/3/05/{}.png", HASH),
            format!("/uploads/2024/03/05/{}.png", &HASH[1..]),
            format!("/uploads/2024/03/05/{}.png", HASH.to_uppercase()),
            format!("/uploads/../03/05/{}.png", HASH),
            format!("/uploads/2024/03/05/../{}.png", HASH),
            format!("uploads/2024/03/05/{}.png", HASH),
            String::from("/etc/passwd"),
            String::new(),
        ];
        for v in bogus.iter() {
            match namer.validate_requested_path(v) {
                Err(RelayError::BadRequest(_)) => {},
                r => {
                    panic!("expected bad request for {:?}, got {:?}", v, r);
                },
            }
        }
    }
}
