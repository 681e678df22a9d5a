use std::io::Read;
use std::sync::Arc;

use native_tls::TlsConnector;
use ureq::{
    Agent,
    AgentBuilder,
};

use log::{debug, warn};

use crate::config::Config;
use crate::error::{
    RelayError,
    Result,
};
use crate::store::RemoteStore;

const STATUS_OK: u16 = 200;
const STATUS_CREATED: u16 = 201;
// MKCOL on an existing collection.
const STATUS_NOT_ALLOWED: u16 = 405;

/// Remote status of a completed request, or a transport failure.
fn status_of(r: std::result::Result<ureq::Response, ureq::Error>) -> Result<(u16, Option<ureq::Response>)> {
    match r {
        Ok(v) => Ok((v.status(), Some(v))),
        Err(ureq::Error::Status(code, _)) => Ok((code, None)),
        Err(ureq::Error::Transport(e)) => Err(RelayError::Transport(e.to_string())),
    }
}

/// Minimal WebDAV client against one server and credential pair.
pub struct WebDavStore {
    base_url: String,
    auth: String,
    verify_tls: bool,
    agent: Agent,
}

impl WebDavStore {

    pub fn new(config: &Config) -> Result<WebDavStore> {
        let verify_tls = !config.insecure_tls;
        if !verify_tls {
            warn!("tls certificate verification is disabled for {}", &config.webdav_url);
        }
        let tls = TlsConnector::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| RelayError::Config(format!("tls setup: {}", e)))?;
        let agent = AgentBuilder::new()
            .tls_connector(Arc::new(tls))
            .build();
        let credentials = format!("{}:{}", config.username, config.password);
        Ok(WebDavStore {
            base_url: config.webdav_url.clone(),
            auth: format!("Basic {}", base64::encode(credentials)),
            verify_tls,
            agent,
        })
    }

    /// True if the server certificate is verified on https connections.
    pub fn verifies_tls(&self) -> bool {
        self.verify_tls
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn mkcol(&self, path: &str) -> Result<bool> {
        let url = self.url_for(path);
        let r = self.agent.request("MKCOL", &url)
            .set("Authorization", &self.auth)
            .call();
        let (status, _) = status_of(r)?;
        debug!("mkcol {} -> {}", &url, status);
        Ok(status == STATUS_CREATED || status == STATUS_NOT_ALLOWED)
    }
}

impl RemoteStore for WebDavStore {

    // MKCOL does not create intermediate collections, so each ancestor is
    // ensured in turn.
    fn ensure_directory(&self, path: &str) -> Result<bool> {
        let mut current = String::new();
        let mut r = true;
        for segment in path.split('/').filter(|v| !v.is_empty()) {
            current.push('/');
            current.push_str(segment);
            r = self.mkcol(&current)?;
        }
        Ok(r)
    }

    fn put_object(&self, src: &mut dyn Read, remote_path: &str, size_hint: u64) -> Result<bool> {
        let url = self.url_for(remote_path);
        let r = self.agent.put(&url)
            .set("Authorization", &self.auth)
            .set("Content-Length", &size_hint.to_string())
            .send(src);
        let (status, _) = status_of(r)?;
        debug!("put {} bytes to {} -> {}", size_hint, &url, status);
        Ok((200..300).contains(&status))
    }

    fn get_object(&self, remote_path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(remote_path);
        let r = self.agent.get(&url)
            .set("Authorization", &self.auth)
            .call();
        let (status, res) = status_of(r)?;
        debug!("get {} -> {}", &url, status);
        let res = match res {
            Some(v) if status == STATUS_OK => v,
            _ => {
                return Err(RelayError::NotFound(remote_path.to_string()));
            },
        };
        let mut data = vec!();
        res.into_reader()
            .read_to_end(&mut data)
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(data)
    }
}
