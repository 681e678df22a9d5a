use mime::Mime;
use thiserror::Error;

/// Failure of any stage of the upload or retrieval pipelines.
///
/// Stages return these as values. The HTTP status is only decided in
/// [response](crate::response), through [RelayError::status_code].
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid or missing upload token")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid file type")]
    UnsupportedType(Mime),

    #[error("MIME type mismatch")]
    TypeMismatch {
        expected: Mime,
        actual: Mime,
    },

    #[error("File not found")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    pub fn bad_request(s: impl Into<String>) -> RelayError {
        RelayError::BadRequest(s.into())
    }

    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::BadRequest(_) => 400,
            RelayError::UnsupportedType(_) => 400,
            RelayError::TypeMismatch{..} => 400,
            RelayError::Forbidden => 403,
            RelayError::NotFound(_) => 404,
            RelayError::Transport(_) => 500,
            RelayError::Storage(_) => 500,
            RelayError::Io(_) => 500,
            RelayError::Config(_) => 500,
        }
    }

    /// Message safe to hand back to the remote client.
    ///
    /// Server side failures never carry the remote location, transport
    /// detail or local filesystem errors.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::Transport(_) => String::from("Storage unavailable"),
            RelayError::Storage(_) => String::from("Upload failed"),
            RelayError::Io(_) => String::from("Internal error"),
            RelayError::Config(_) => String::from("Internal error"),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RelayError;
    use std::io;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RelayError::Forbidden.status_code(), 403);
        assert_eq!(RelayError::bad_request("No file uploaded").status_code(), 400);
        assert_eq!(RelayError::UnsupportedType(mime::TEXT_PLAIN).status_code(), 400);
        let e = RelayError::TypeMismatch{
            expected: mime::IMAGE_PNG,
            actual: mime::IMAGE_JPEG,
        };
        assert_eq!(e.status_code(), 400);
        assert_eq!(RelayError::NotFound(String::from("/uploads/x")).status_code(), 404);
        assert_eq!(RelayError::Transport(String::from("refused")).status_code(), 500);
        assert_eq!(RelayError::Storage(String::from("507")).status_code(), 500);
    }

    #[test]
    fn test_public_message_hides_detail() {
        let e = RelayError::Transport(String::from("https://dav.example.org/uploads: connection refused"));
        assert_eq!(e.public_message(), "Storage unavailable");

        let e = RelayError::Io(io::Error::new(io::ErrorKind::Other, "/tmp/.tmpXYZ: no space"));
        assert!(!e.public_message().contains("/tmp"));

        let e = RelayError::NotFound(String::from("/uploads/2024/03/05/x.png"));
        assert_eq!(e.public_message(), "File not found");

        let e = RelayError::bad_request("File too large (max 20MB)");
        assert_eq!(e.public_message(), "File too large (max 20MB)");
    }
}
