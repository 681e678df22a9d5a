use std::str::FromStr;

use ascii::AsciiString;
use tiny_http::{
    Header,
    HeaderField,
    Request,
    Response,
    StatusCode,
};

use log::{debug, error, warn};

use crate::auth::TOKEN_HEADER;
use crate::config::Config;
use crate::form::render_form;
use crate::request::RequestResult;

const JSON_TYPE: &str = "application/json";
const HTML_TYPE: &str = "text/html; charset=utf-8";

/// A response ready to be written to the client.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: u16, content_type: &str, body: Vec<u8>) -> Reply {
        Reply {
            status,
            headers: vec!((String::from("Content-Type"), content_type.to_string())),
            body,
        }
    }

    pub fn header(&self, k: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }
}

fn header(k: &str, v: &str) -> Option<Header> {
    let field = HeaderField::from_str(k).ok()?;
    let value = AsciiString::from_ascii(v).ok()?;
    Some(Header {
        field,
        value,
    })
}

pub fn origin_headers() -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = vec!();
    headers.push((
        String::from("Access-Control-Allow-Origin"),
        String::from("*"),
    ));
    headers.push((
        String::from("Access-Control-Allow-Methods"),
        String::from("OPTIONS, POST, GET"),
    ));
    headers.push((
        String::from("Access-Control-Allow-Headers"),
        format!("Content-Type,{}", TOKEN_HEADER),
    ));
    headers.push((
        String::from("Server"),
        format!("imgrelay/{}, tiny_http (Rust)", env!("CARGO_PKG_VERSION")),
    ));
    headers
}

fn json_error(status: u16, msg: &str) -> Reply {
    let body = serde_json::json!({
        "error": msg,
    });
    Reply::new(status, JSON_TYPE, body.to_string().into_bytes())
}

/// Turn the outcome of a request into status, headers and body.
///
/// Failures are logged with their full detail here, while the client only
/// gets the public message.
pub fn render(config: &Config, r: RequestResult) -> Reply {
    let mut reply = match r {
        RequestResult::Found(v) => {
            let mut reply = Reply {
                status: 200,
                headers: vec!(),
                body: v.data,
            };
            for (k, v) in v.headers.pairs() {
                reply.headers.push((k.to_string(), v));
            }
            reply
        },
        RequestResult::Changed(v) => {
            match serde_json::to_vec(&v) {
                Ok(body) => Reply::new(200, JSON_TYPE, body),
                Err(e) => {
                    error!("cannot serialize upload result: {}", e);
                    json_error(500, "Internal error")
                },
            }
        },
        RequestResult::Failed(e) => {
            let status = e.status_code();
            if status >= 500 {
                error!("request failed: {}", e);
            } else {
                warn!("request rejected: {:?}", e);
            }
            json_error(status, &e.public_message())
        },
        RequestResult::Form => {
            Reply::new(200, HTML_TYPE, render_form(config).into_bytes())
        },
        RequestResult::Preflight => {
            debug!("served options request");
            Reply {
                status: 200,
                headers: vec!(),
                body: vec!(),
            }
        },
    };
    reply.headers.extend(origin_headers());
    reply
}

/// Write the reply to the client.
pub fn exec_response(req: Request, reply: Reply) {
    let mut res = Response::from_data(reply.body)
        .with_status_code(StatusCode(reply.status));
    for (k, v) in reply.headers.iter() {
        match header(k, v) {
            Some(h) => {
                res.add_header(h);
            },
            None => {
                warn!("dropping invalid header {}: {:?}", k, v);
            },
        }
    }
    if let Err(e) = req.respond(res) {
        error!("cannot write response: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::render;
    use crate::config::Config;
    use crate::error::RelayError;
    use crate::request::RequestResult;
    use crate::retrieve::{
        Retrieved,
        ServeHeaders,
    };
    use crate::upload::UploadResult;

    fn config() -> Config {
        Config::new("http://localhost", "", "").unwrap()
    }

    fn json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[test]
    fn test_render_error() {
        let r = render(&config(), RequestResult::Failed(RelayError::Forbidden));
        assert_eq!(r.status, 403);
        assert_eq!(r.header("content-type"), Some("application/json"));
        assert_eq!(json(&r.body)["error"], "Invalid or missing upload token");

        let e = RelayError::Transport(String::from("http://dav.internal:8080/uploads: refused"));
        let r = render(&config(), RequestResult::Failed(e));
        assert_eq!(r.status, 500);
        let body = String::from_utf8(r.body).unwrap();
        assert!(!body.contains("dav.internal"));
        assert_eq!(json(body.as_bytes()), serde_json::json!({"error": "Storage unavailable"}));

        let r = render(&config(), RequestResult::Failed(RelayError::NotFound(String::from("/uploads/x"))));
        assert_eq!(r.status, 404);
        assert_eq!(json(&r.body), serde_json::json!({"error": "File not found"}));
    }

    #[test]
    fn test_render_upload() {
        let u = UploadResult {
            success: true,
            url: String::from("/?f=/uploads/2024/03/05/abc.png"),
            hash: String::from("abc"),
            size: 1024,
            mime_type: String::from("image/png"),
        };
        let r = render(&config(), RequestResult::Changed(u));
        assert_eq!(r.status, 200);
        let v = json(&r.body);
        assert_eq!(v["success"], true);
        assert_eq!(v["url"], "/?f=/uploads/2024/03/05/abc.png");
        assert_eq!(v["hash"], "abc");
        assert_eq!(v["size"], 1024);
        assert_eq!(v["type"], "image/png");
        assert_eq!(r.header("Access-Control-Allow-Origin"), Some("*"));
    }

    #[test]
    fn test_render_image() {
        let data = vec!(0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a);
        let headers = ServeHeaders::new(&data, &mime::IMAGE_PNG, &config(), UNIX_EPOCH);
        let r = render(&config(), RequestResult::Found(Retrieved {
            data: data.clone(),
            headers,
        }));
        assert_eq!(r.status, 200);
        assert_eq!(r.body, data);
        assert_eq!(r.header("Content-Type"), Some("image/png"));
        assert_eq!(r.header("Content-Length"), Some("8"));
        assert_eq!(r.header("Cache-Control"), Some("public, max-age=31536000"));
        assert_eq!(r.header("Last-Modified"), Some("Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(r.header("ETag").unwrap().starts_with('"'));
    }

    #[test]
    fn test_render_form() {
        let r = render(&config(), RequestResult::Form);
        assert_eq!(r.status, 200);
        assert_eq!(r.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert!(String::from_utf8(r.body).unwrap().contains("<form"));

        let r = render(&config(), RequestResult::Preflight);
        assert_eq!(r.status, 200);
        assert!(r.body.is_empty());
        assert_eq!(r.header("Access-Control-Allow-Headers"), Some("Content-Type,X-Upload-Token"));
    }
}
