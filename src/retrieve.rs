use std::time::SystemTime;

use httpdate::fmt_http_date;
use mime::Mime;
use sha2::{Sha256, Digest};

use log::debug;

use crate::classify::ContentClassifier;
use crate::config::Config;
use crate::error::{
    RelayError,
    Result,
};
use crate::path::PathNamer;
use crate::store::RemoteStore;

/// Headers to serve a retrieved image with.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeHeaders {
    pub cache_control: String,
    pub expires: String,
    pub last_modified: String,
    pub etag: String,
    pub content_type: String,
    pub content_length: usize,
}

impl ServeHeaders {

    /// # Arguments
    ///
    /// * `data` - Content to be served.
    /// * `mime` - Verified type of the content.
    /// * `config` - Supplies the cache duration.
    /// * `now` - Time of the request.
    pub fn new(data: &[u8], mime: &Mime, config: &Config, now: SystemTime) -> ServeHeaders {
        let secs = config.cache_duration.as_secs();
        ServeHeaders {
            cache_control: format!("public, max-age={}", secs),
            expires: fmt_http_date(now + config.cache_duration),
            last_modified: fmt_http_date(now),
            etag: format!("\"{}\"", hex::encode(Sha256::digest(data))),
            content_type: mime.essence_str().to_string(),
            content_length: data.len(),
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec!(
            ("Cache-Control", self.cache_control.clone()),
            ("Expires", self.expires.clone()),
            ("Last-Modified", self.last_modified.clone()),
            ("ETag", self.etag.clone()),
            ("Content-Type", self.content_type.clone()),
            ("Content-Length", self.content_length.to_string()),
        )
    }
}

/// A verified image ready to be served.
#[derive(Debug)]
pub struct Retrieved {
    pub data: Vec<u8>,
    pub headers: ServeHeaders,
}

/// Fetches stored images and re-checks them before they are served.
pub struct RetrievalPipeline<'a, S: ?Sized> {
    config: &'a Config,
    classifier: &'a ContentClassifier,
    namer: &'a PathNamer,
    store: &'a S,
}

impl<'a, S: RemoteStore + ?Sized> RetrievalPipeline<'a, S> {

    pub fn new(config: &'a Config, classifier: &'a ContentClassifier, namer: &'a PathNamer, store: &'a S) -> RetrievalPipeline<'a, S> {
        RetrievalPipeline {
            config,
            classifier,
            namer,
            store,
        }
    }

    /// Fetch the image at a client supplied path.
    ///
    /// The path is checked against the storage grammar before the store is
    /// contacted. Content is only returned if it still sniffs to the type
    /// its extension names.
    pub fn fetch(&self, candidate: &str, now: SystemTime) -> Result<Retrieved> {
        let path = self.namer.validate_requested_path(candidate)?;
        let expected = match self.classifier.table().mime_for(path.extension()) {
            Some(v) => v.clone(),
            None => {
                return Err(RelayError::bad_request("Invalid file type"));
            },
        };

        let data = self.store.get_object(path.as_str())?;

        let actual = self.classifier.sniff(&data);
        self.classifier.validate_match(&expected, &actual)?;
        debug!("serving {} bytes of {} from {}", data.len(), &expected, &path);

        let headers = ServeHeaders::new(&data, &expected, self.config, now);
        Ok(Retrieved {
            data,
            headers,
        })
    }
}
