use std::io::Read;

use chrono::NaiveDate;
use mime::Mime;
use serde::Serialize;

use log::{debug, info, warn};

use crate::auth::auth_check;
use crate::classify::ContentClassifier;
use crate::config::Config;
use crate::error::{
    RelayError,
    Result,
};
use crate::path::PathNamer;
use crate::record::{
    spool,
    Record,
};
use crate::store::RemoteStore;

/// The file field of an upload request, as far as the transport could tell.
pub enum FilePart<R> {
    /// No file field was sent.
    Missing,
    /// The transport failed while locating the file.
    Failed(String),
    Received(R),
}

/// Upload content that passed every local check.
pub struct Prepared {
    record: Record,
    mime: Mime,
    ext: &'static str,
}

impl Prepared {
    pub fn size(&self) -> u64 {
        self.record.size
    }

    #[cfg(test)]
    pub fn spool_path(&self) -> &std::path::Path {
        self.record.path()
    }
}

/// Response body of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub url: String,
    pub hash: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Validates, names and stores one uploaded image.
pub struct UploadPipeline<'a, S: ?Sized> {
    config: &'a Config,
    classifier: &'a ContentClassifier,
    namer: &'a PathNamer,
    store: &'a S,
}

impl<'a, S: RemoteStore + ?Sized> UploadPipeline<'a, S> {

    pub fn new(config: &'a Config, classifier: &'a ContentClassifier, namer: &'a PathNamer, store: &'a S) -> UploadPipeline<'a, S> {
        UploadPipeline {
            config,
            classifier,
            namer,
            store,
        }
    }

    pub fn authorize(&self, token: Option<&str>) -> Result<()> {
        auth_check(&self.config.tokens, token)
    }

    /// Spool and classify the uploaded file without touching the remote store.
    ///
    /// The local copy is removed if the content is rejected.
    ///
    /// # Arguments
    ///
    /// * `part` - The file field of the request.
    pub fn prepare<R: Read>(&self, part: FilePart<R>) -> Result<Prepared> {
        let f = match part {
            FilePart::Received(v) => v,
            FilePart::Missing => {
                return Err(RelayError::bad_request("No file uploaded"));
            },
            FilePart::Failed(e) => {
                return Err(RelayError::bad_request(format!("Upload failed: {}", e)));
            },
        };

        let record = spool(f, self.config.max_size, self.config.spool_dir.as_deref())?;

        let mime = self.classifier.sniff(record.head());
        let ext = self.classifier.extension_for(&mime)?;
        Ok(Prepared {
            record,
            mime,
            ext,
        })
    }

    /// Store prepared content under its content address.
    ///
    /// The local copy of the content is gone when this returns.
    ///
    /// # Arguments
    ///
    /// * `prepared` - Content that passed [UploadPipeline::prepare].
    /// * `today` - Upload date, used for the date partition of the path.
    pub fn store(&self, prepared: Prepared, today: NaiveDate) -> Result<UploadResult> {
        let Prepared { record, mime, ext } = prepared;
        let path = self.namer.derive_path(&record.hash(), ext, today);
        debug!("content {} classified as {}, storing at {}", path.hash(), &mime, &path);

        if !self.store.ensure_directory(path.directory())? {
            warn!("could not ensure remote directory {}", path.directory());
        }

        let mut src = record.reader()?;
        if !self.store.put_object(&mut src, path.as_str(), record.size)? {
            return Err(RelayError::Storage(format!("remote refused write of {}", &path)));
        }
        info!("stored {} bytes at {}", record.size, &path);

        Ok(UploadResult {
            success: true,
            url: format!("{}?f={}", self.config.public_url, &path),
            hash: path.hash().to_string(),
            size: record.size,
            mime_type: mime.essence_str().to_string(),
        })
    }

    /// Store the uploaded file under its content address.
    ///
    /// Nothing is sent to the remote store unless the content passes every
    /// check.
    pub fn accept<R: Read>(&self, part: FilePart<R>, today: NaiveDate) -> Result<UploadResult> {
        let prepared = self.prepare(part)?;
        self.store(prepared, today)
    }

    /// Check the token, then accept the file.
    pub fn upload<R: Read>(&self, token: Option<&str>, part: FilePart<R>, today: NaiveDate) -> Result<UploadResult> {
        self.authorize(token)?;
        self.accept(part, today)
    }
}
