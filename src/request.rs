use std::io::Read;
use std::str::FromStr;
use std::time::SystemTime;

use mime::Mime;
use multipart::server::Multipart;
use tiny_http::Method;
use url::Url;

use log::{debug, error};

use crate::error::{
    RelayError,
    Result,
};
use crate::relay::Relay;
use crate::retrieve::Retrieved;
use crate::store::RemoteStore;
use crate::upload::{
    FilePart,
    UploadResult,
};

/// Multipart form field holding the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Query parameter naming the image to retrieve.
pub const PATH_PARAM: &str = "f";

/// Outcome of a client request, before it is rendered to a response.
#[derive(Debug)]
pub enum RequestResult {
    Found(Retrieved),
    Changed(UploadResult),
    Failed(RelayError),
    Form,
    Preflight,
}

fn requested_path(url: &str) -> Option<String> {
    let base = Url::parse("http://localhost/").ok()?;
    let u = base.join(url).ok()?;
    u.query_pairs()
        .find(|(k, _)| k == PATH_PARAM)
        .map(|(_, v)| v.into_owned())
}

fn boundary_of(content_type: &str) -> Option<String> {
    let m = Mime::from_str(content_type).ok()?;
    if m.type_() != mime::MULTIPART || m.subtype() != mime::FORM_DATA {
        return None;
    }
    m.get_param(mime::BOUNDARY).map(|v| v.as_str().to_string())
}

fn upload<S: RemoteStore>(relay: &Relay<S>, token: Option<&str>, content_type: Option<&str>, body: impl Read, now: SystemTime) -> Result<UploadResult> {
    let uploader = relay.uploader();
    uploader.authorize(token)?;

    let today = relay.config().date_at(now);
    let boundary = match content_type.and_then(boundary_of) {
        Some(v) => v,
        None => {
            debug!("upload without multipart body");
            return uploader.accept(FilePart::<&[u8]>::Missing, today);
        },
    };

    // Store only after the closing boundary. A truncated body can still
    // sniff as a valid image.
    let mut form = Multipart::with_body(body, boundary);
    let mut prepared = None;
    loop {
        match form.read_entry() {
            Ok(Some(mut field)) => {
                if prepared.is_none() && &*field.headers.name == IMAGE_FIELD {
                    debug!("found file field, client filename {:?}", field.headers.filename);
                    prepared = Some(uploader.prepare(FilePart::Received(&mut field.data))?);
                } else {
                    debug!("skipping form field {}", &field.headers.name);
                }
            },
            Ok(None) => {
                break;
            },
            Err(e) => {
                error!("malformed multipart body: {}", e);
                return uploader.accept(FilePart::<&[u8]>::Failed(e.kind().to_string()), today);
            },
        }
    }

    match prepared {
        Some(v) => uploader.store(v, today),
        None => uploader.accept(FilePart::<&[u8]>::Missing, today),
    }
}

/// Handle client input by method type.
///
/// Any request carrying the `f` query parameter is a retrieval. A `POST`
/// without it is an upload. Everything else gets the upload form.
///
/// # Arguments
///
/// * `relay` - Shared relay state.
/// * `method` - The HTTP method of the client request.
/// * `url` - The local part of the URL of the client request, including the query.
/// * `token` - Value of the upload token header, if sent.
/// * `content_type` - Value of the `Content-Type` header, if sent.
/// * `body` - Reader providing the request body.
/// * `now` - Time the request is handled at.
pub fn process_method<S: RemoteStore>(relay: &Relay<S>, method: &Method, url: &str, token: Option<&str>, content_type: Option<&str>, body: impl Read, now: SystemTime) -> RequestResult {
    if let Some(v) = requested_path(url) {
        debug!("retrieval of {:?}", &v);
        return match relay.retriever().fetch(&v, now) {
            Ok(r) => RequestResult::Found(r),
            Err(e) => RequestResult::Failed(e),
        };
    }

    match method {
        Method::Post => {
            match upload(relay, token, content_type, body, now) {
                Ok(r) => RequestResult::Changed(r),
                Err(e) => RequestResult::Failed(e),
            }
        },
        Method::Options => {
            RequestResult::Preflight
        },
        _ => {
            RequestResult::Form
        },
    }
}
