use std::fs::File;
use std::path::Path;
use std::io::{
    Read,
    Seek,
    SeekFrom,
    Write,
};

use sha2::{Sha256, Digest};
use tempfile::NamedTempFile;

use log::{debug, error, info};

use crate::error::{
    RelayError,
    Result,
};

/// Number of leading bytes kept in memory for content sniffing.
pub const SNIFF_LENGTH: usize = 8192;

const MEGABYTE: u64 = 1024 * 1024;

/// Upload content spooled to a local temporary file.
///
/// The file is removed when the record is dropped.
pub struct Record {
    pub digest: Vec<u8>,
    pub size: u64,
    head: Vec<u8>,
    file: NamedTempFile,
}

impl Record {
    /// Lowercase hex SHA256 of the content.
    pub fn hash(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Leading bytes of the content, for sniffing.
    pub fn head(&self) -> &[u8] {
        &self.head
    }

    /// Reader over the full content from the start.
    pub fn reader(&self) -> Result<&File> {
        let mut f = self.file.as_file();
        f.seek(SeekFrom::Start(0))?;
        Ok(f)
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

fn too_large(max_size: u64) -> RelayError {
    let limit = if max_size % MEGABYTE == 0 {
        format!("{}MB", max_size / MEGABYTE)
    } else {
        format!("{} bytes", max_size)
    };
    RelayError::bad_request(format!("File too large (max {})", limit))
}

/// Copy content to a temporary file, hashing it on the way.
///
/// Reading stops as soon as the content exceeds `max_size`.
///
/// # Arguments
///
/// * `f` - Content body of the uploaded file.
/// * `max_size` - Largest accepted content length in bytes.
/// * `dir` - Directory to create the temporary file in. The system temporary directory if `None`.
pub fn spool(mut f: impl Read, max_size: u64, dir: Option<&Path>) -> Result<Record> {
    let mut of = match dir {
        Some(v) => NamedTempFile::new_in(v)?,
        None => NamedTempFile::new()?,
    };
    debug!("writing to tempfile {:?} max size {}", of.path(), max_size);

    let mut buf: [u8; 65535] = [0; 65535];
    let mut h = Sha256::new();
    let mut head: Vec<u8> = Vec::with_capacity(SNIFF_LENGTH);
    let mut total_size: u64 = 0;
    loop {
        let c = match f.read(&mut buf[..]) {
            Ok(0) => {
                break;
            },
            Ok(v) => v,
            Err(e) => {
                error!("cannot read upload body: {}", e);
                return Err(RelayError::bad_request(format!("Upload failed: {}", e)));
            },
        };
        total_size += c as u64;
        if total_size > max_size {
            debug!("upload exceeds {} bytes, aborting", max_size);
            return Err(too_large(max_size));
        }
        let data = &buf[..c];
        if head.len() < SNIFF_LENGTH {
            let n = (SNIFF_LENGTH - head.len()).min(c);
            head.extend_from_slice(&data[..n]);
        }
        h.update(data);
        of.write_all(data)?;
    }
    of.flush()?;

    let digest = h.finalize().to_vec();
    info!("have hash {} for {} bytes of content", hex::encode(&digest), total_size);
    Ok(Record {
        digest,
        size: total_size,
        head,
        file: of,
    })
}
