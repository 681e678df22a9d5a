use std::env;
use std::path::PathBuf;

use clap::{
    App,
    Arg,
    ArgMatches,
};

use imgrelay::classify::TypeTable;
use imgrelay::config::{
    Config,
    CACHE_DURATION,
    MAX_UPLOAD_SIZE,
};
use imgrelay::error::{
    RelayError,
    Result,
};

const BIND_HOST: &str = "0.0.0.0";
const BIND_PORT: u16 = 8000;
const WORKERS: usize = 4;
const TYPES: &str = "jpg,png,gif,webp,bmp";

pub struct Settings {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub config: Config,
}

fn number<T: std::str::FromStr>(arg: &ArgMatches, name: &str) -> Result<Option<T>> {
    match arg.value_of(name) {
        Some(v) => {
            match v.parse::<T>() {
                Ok(r) => Ok(Some(r)),
                Err(_) => Err(RelayError::Config(format!("invalid value for {}: {}", name, v))),
            }
        },
        None => Ok(None),
    }
}

fn tokens_from_args(arg: &ArgMatches) -> Vec<String> {
    let mut tokens: Vec<String> = vec!();
    if let Some(vs) = arg.values_of("token") {
        for v in vs {
            tokens.push(v.to_string());
        }
    }
    if let Ok(v) = env::var("IMGRELAY_TOKENS") {
        for t in v.split(',') {
            tokens.push(t.trim().to_string());
        }
    }
    tokens
}

impl Settings {

    fn from_matches(arg: &ArgMatches) -> Result<Settings> {
        let url = arg.value_of("webdav_url").unwrap_or_default();
        let user = arg.value_of("webdav_user").unwrap_or_default();
        let password = arg.value_of("webdav_password").unwrap_or_default();

        let types = arg.value_of("types").unwrap_or(TYPES);
        let exts: Vec<&str> = types.split(',').collect();

        let mut config = Config::new(url, user, password)?
            .with_tokens(tokens_from_args(arg))
            .with_types(TypeTable::with_extensions(&exts)?)
            .with_max_size(number(arg, "max_size")?.unwrap_or(MAX_UPLOAD_SIZE))
            .with_cache_duration(number(arg, "cache_duration")?.unwrap_or(CACHE_DURATION))
            .with_insecure_tls(arg.is_present("insecure_tls"));
        if let Some(v) = arg.value_of("timezone") {
            config = config.with_timezone(v)?;
        }
        if let Some(v) = arg.value_of("public_url") {
            config = config.with_public_url(v);
        }
        if let Some(v) = arg.value_of("spool_dir") {
            config = config.with_spool_dir(PathBuf::from(v));
        }

        Ok(Settings {
            host: arg.value_of("host").unwrap_or(BIND_HOST).to_string(),
            port: number(arg, "port")?.unwrap_or(BIND_PORT),
            workers: number(arg, "workers")?.unwrap_or(WORKERS).max(1),
            config,
        })
    }

    pub fn from_args() -> Result<Settings> {
        let mut o = App::new("imgrelay");
        o = o.version(env!("CARGO_PKG_VERSION"));
        o = o.about("Content-addressed image relay backed by a WebDAV server");
        o = o.arg(
            Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .help("Host or ip to bind server to")
                .env("IMGRELAY_HOST")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("port")
                .long("port")
                .short("p")
                .value_name("PORT")
                .help("Port to bind server to")
                .env("IMGRELAY_PORT")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("workers")
                .long("workers")
                .value_name("COUNT")
                .help("Number of request handling threads")
                .env("IMGRELAY_WORKERS")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("webdav_url")
                .long("webdav-url")
                .short("u")
                .value_name("URL")
                .help("Base url of the WebDAV server")
                .env("IMGRELAY_WEBDAV_URL")
                .takes_value(true)
                .required(true)
                );
        o = o.arg(
            Arg::with_name("webdav_user")
                .long("webdav-user")
                .value_name("USER")
                .help("WebDAV user")
                .env("IMGRELAY_WEBDAV_USER")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("webdav_password")
                .long("webdav-password")
                .value_name("PASSWORD")
                .help("WebDAV password")
                .env("IMGRELAY_WEBDAV_PASSWORD")
                .hide_env_values(true)
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("token")
                .long("token")
                .short("t")
                .value_name("TOKEN")
                .help("Accepted upload token, may be repeated. Uploads are open if none is given")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                );
        o = o.arg(
            Arg::with_name("types")
                .long("types")
                .value_name("EXTENSIONS")
                .help("Comma separated image types to accept and serve [default: jpg,png,gif,webp,bmp]")
                .env("IMGRELAY_TYPES")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("max_size")
                .long("max-size")
                .value_name("BYTES")
                .help("Largest accepted upload [default: 20971520]")
                .env("IMGRELAY_MAX_SIZE")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("cache_duration")
                .long("cache-duration")
                .value_name("SECONDS")
                .help("Cache lifetime of served images [default: 31536000]")
                .env("IMGRELAY_CACHE_DURATION")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("timezone")
                .long("timezone")
                .value_name("TZ")
                .help("Timezone of the upload date partition [default: UTC]")
                .env("IMGRELAY_TIMEZONE")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("public_url")
                .long("public-url")
                .value_name("URL")
                .help("Prefix of the urls returned for uploads [default: /]")
                .env("IMGRELAY_PUBLIC_URL")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("spool_dir")
                .long("spool-dir")
                .value_name("DIR")
                .help("Directory for uploads in progress [default: system temporary directory]")
                .env("IMGRELAY_SPOOL_DIR")
                .takes_value(true)
                );
        o = o.arg(
            Arg::with_name("insecure_tls")
                .long("insecure-tls")
                .help("Do not verify the TLS certificate of the WebDAV server")
                );

        let arg_matches = o.get_matches();
        Settings::from_matches(&arg_matches)
    }
}
