use std::process;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use tiny_http::{
    Request,
    Server,
};

use log::{debug, info, error};

use imgrelay::auth::TOKEN_HEADER;
use imgrelay::relay::Relay;
use imgrelay::request::process_method;
use imgrelay::response::{
    exec_response,
    render,
};
use imgrelay::store::WebDavStore;

mod arg;

use arg::Settings;

fn header_value(req: &Request, name: &'static str) -> Option<String> {
    req.headers().iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn serve(relay: &Relay<WebDavStore>, mut req: Request) {
    let method = req.method().clone();
    let url = req.url().to_string();
    let token = header_value(&req, TOKEN_HEADER);
    let content_type = header_value(&req, "Content-Type");

    info!("processing request {} for {}", &method, &url);

    let r = process_method(
        relay,
        &method,
        &url,
        token.as_deref(),
        content_type.as_deref(),
        req.as_reader(),
        SystemTime::now(),
    );
    let reply = render(relay.config(), r);
    debug!("responding {} to {} {}", reply.status, &method, &url);
    exec_response(req, reply);
}

fn main() {
    env_logger::init();

    let settings = match Settings::from_args() {
        Ok(v) => v,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        },
    };

    let store = match WebDavStore::new(&settings.config) {
        Ok(v) => {
            info!("webdav store {} tls verification {}", &settings.config.webdav_url, v.verifies_tls());
            v
        },
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        },
    };
    let relay = match Relay::new(settings.config, store) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        },
    };

    let addr = format!("{}:{}", &settings.host, settings.port);
    let srv = match Server::http(&addr) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            error!("cannot listen on {}: {}", &addr, e);
            process::exit(1);
        },
    };
    info!("listening on {} with {} workers", &addr, settings.workers);

    let mut handles = vec!();
    for i in 0..settings.workers {
        let srv = srv.clone();
        let relay = relay.clone();
        handles.push(thread::spawn(move || {
            loop {
                match srv.recv() {
                    Ok(req) => {
                        serve(&relay, req);
                    },
                    Err(e) => {
                        error!("worker {}: {}", i, e);
                        break;
                    },
                };
            }
        }));
    }

    for h in handles {
        if h.join().is_err() {
            error!("worker panicked");
        }
    }
}
