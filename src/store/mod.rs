//! The remote store holds all uploaded content.
//!
//! Only the three operations the relay needs are modelled. Every call makes
//! exactly one attempt.
use std::io::Read;

use crate::error::Result;

pub mod webdav;

#[cfg(any(test, feature = "dev"))]
pub mod mock;

pub use webdav::WebDavStore;

pub trait RemoteStore: Send + Sync {

    /// Make sure the directory exists.
    ///
    /// Returns true if it was created or was already there.
    fn ensure_directory(&self, path: &str) -> Result<bool>;

    /// Write content to the remote path.
    ///
    /// Returns false if the remote refused the write.
    ///
    /// # Arguments
    ///
    /// * `src` - Content to write.
    /// * `remote_path` - Absolute path below the store root.
    /// * `size_hint` - Length of content in bytes.
    fn put_object(&self, src: &mut dyn Read, remote_path: &str, size_hint: u64) -> Result<bool>;

    /// Read the full content at the remote path.
    fn get_object(&self, remote_path: &str) -> Result<Vec<u8>>;
}
