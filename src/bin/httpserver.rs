//! Static file server
//!
//! Serves a base directory over HTTP with directory browsing and
//! trailing-slash redirection for directory paths.

use clap::Parser;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use url::Url;
use warp::http::{StatusCode, Uri};
use warp::path::FullPath;
use warp::{Filter, Rejection, Reply};

const DEFAULT_ADDR: &str = "127.0.0.1:5000";

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve files from a directory", long_about = None)]
struct Args {
    /// The base directory to serve content from
    #[arg(short = 'd', long)]
    base_dir: Option<PathBuf>,

    /// Addresses to listen on (e.g. http://127.0.0.1:8080), ';'-separated or repeated
    #[arg(short = 'u', long, value_delimiter = ';')]
    urls: Vec<String>,

    /// HTTP ports to listen on (loopback), ';'-separated or repeated
    #[arg(short = 'p', long = "port", value_delimiter = ';')]
    ports: Vec<u16>,

    /// JSON file with defaults for the options above
    #[arg(long, default_value = "httpserver.json")]
    config: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileConfig {
    base_dir: Option<PathBuf>,
    urls: Vec<String>,
    ports: Vec<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Missing config file is fine; a broken one is not
    let file = match tokio::fs::read_to_string(&args.config).await {
        Ok(content) => serde_json::from_str(&content)?,
        Err(_) => FileConfig::default(),
    };

    let base_dir = match args.base_dir.or(file.base_dir) {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let base_dir = Arc::new(tokio::fs::canonicalize(&base_dir).await?);

    let mut addrs = listen_addrs(&args.urls, &args.ports)?;
    if addrs.is_empty() {
        addrs = listen_addrs(&file.urls, &file.ports)?;
    }
    if addrs.is_empty() {
        addrs.push(DEFAULT_ADDR.parse()?);
    }

    let routes = routes(base_dir.clone());

    let mut servers = Vec::new();
    for addr in addrs {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            log::error!("Failed to bind to {}: {}", addr, e);
            e
        })?;
        log::info!("Listening on http://{}", addr);
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
        servers.push(tokio::spawn(
            warp::serve(routes.clone()).run_incoming(incoming),
        ));
    }

    log::info!("Serving files from: {}", base_dir.display());
    futures::future::try_join_all(servers).await?;
    Ok(())
}

fn listen_addrs(urls: &[String], ports: &[u16]) -> anyhow::Result<Vec<SocketAddr>> {
    let mut addrs = Vec::new();
    for url in urls {
        let url = match url.contains("://") {
            true => Url::parse(url)?,
            false => Url::parse(&format!("http://{}", url))?,
        };
        let resolved = url.socket_addrs(|| Some(80))?;
        addrs.extend(resolved.into_iter().find(SocketAddr::is_ipv4));
    }
    addrs.extend(ports.iter().map(|port| SocketAddr::from(([127, 0, 0, 1], *port))));
    Ok(addrs)
}

fn routes(
    base_dir: Arc<PathBuf>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let files = warp::get().and(warp::fs::dir(base_dir.as_ref().clone()));

    let base = warp::any().map(move || base_dir.clone());

    let redirect = warp::get()
        .and(warp::path::full())
        .and(base.clone())
        .and_then(redirect_directory);

    let listing = warp::get()
        .and(warp::path::full())
        .and(base)
        .and_then(list_directory);

    redirect.or(files).or(listing).recover(status_page)
}

/// Map a request path onto the base directory, refusing to leave it
fn resolve(base: &Path, path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let mut resolved = base.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

async fn redirect_directory(
    path: FullPath,
    base: Arc<PathBuf>,
) -> Result<impl Reply, Rejection> {
    let is_dir = match resolve(&base, path.as_str()) {
        Some(resolved) => tokio::fs::metadata(&resolved)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false),
        None => false,
    };

    if !is_dir || path.as_str().ends_with('/') {
        return Err(warp::reject::not_found());
    }

    let target: Uri = format!("{}/", path.as_str())
        .parse()
        .map_err(|_| warp::reject::not_found())?;
    Ok(warp::redirect::redirect(target))
}

async fn list_directory(path: FullPath, base: Arc<PathBuf>) -> Result<impl Reply, Rejection> {
    let dir = resolve(&base, path.as_str()).ok_or_else(warp::reject::not_found)?;
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|_| warp::reject::not_found())?;

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let items: String = names
        .iter()
        .map(|name| format!("<li><a href=\"{0}\">{0}</a></li>\n", escape_html(name)))
        .collect();

    Ok(warp::reply::html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Index of {0}</title></head>\n<body>\n<h1>Index of {0}</h1>\n<ul>\n{1}</ul>\n</body>\n</html>\n",
        escape_html(path.as_str()),
        items
    )))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

async fn status_page(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let status = if rejection.is_not_found() {
        StatusCode::NOT_FOUND
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(warp::reply::with_status(
        format!(
            "Status Code: {}; {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        ),
        status,
    ))
}
