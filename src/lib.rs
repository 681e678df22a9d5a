#![crate_name = "imgrelay"]

//! imgrelay is a content-addressed image relay in front of a WebDAV server.
//!
//! Uploaded images are named by the SHA256 hash of their content, in hex, lowercase, without a 0x
//! prefix, and stored on the remote server below a directory for the day of the upload:
//!
//! ``` ignore,
//! /uploads/2024/03/05/2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae.png
//! ```
//!
//! Uploading the same image twice results in the same path on the same day.
//!
//! ## Content types
//!
//! The type of an image is determined from its content only. Neither the filename nor the
//! declared content type of an upload is trusted. Only JPEG, PNG, GIF, WebP and BMP images are
//! accepted by default, see [classify::TypeTable]. When an image is served, its content is
//! sniffed again and must still match the extension of the path.
//!
//! ## Uploading content
//!
//! Images are uploaded with a `POST` of a `multipart/form-data` body carrying the image in the
//! `image` field. If tokens are configured, one of them must be sent in the `X-Upload-Token`
//! header. The response is a JSON object:
//!
//! ``` ignore,
//! {"success":true,"url":"/?f=/uploads/...png","hash":"...","size":1024,"type":"image/png"}
//! ```
//!
//! ## Retrieving content
//!
//! A `GET` with the `url` from the upload response returns the image with caching headers. Any
//! path that does not match the storage layout exactly is rejected without contacting the
//! remote server.
//!
//! ## Running the daemon
//!
//! The daemon listens on all ip addresses on port 8000 by default. The WebDAV server must be
//! given with `--webdav-url`. See `cargo run -- --help` for all options.

/// Static upload token check.
pub mod auth;

/// Content type detection and the accepted type table.
pub mod classify;

/// Relay configuration.
pub mod config;

/// Error type shared by all pipeline stages.
pub mod error;

/// HTML upload form.
pub mod form;

/// Content-addressed storage paths.
pub mod path;

/// Local spooling and hashing of uploaded content.
pub mod record;

/// Shared state for request handling.
pub mod relay;

/// Encapsulates an incoming remote request.
pub mod request;

/// Encapsulates an outgoing response to remote.
pub mod response;

/// Fetching and verifying stored images.
pub mod retrieve;

/// The remote WebDAV store.
pub mod store;

/// Validating and storing uploaded images.
pub mod upload;

pub use config::Config;
pub use error::RelayError;
pub use relay::Relay;
