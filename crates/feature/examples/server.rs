//! A tiny file server on top of the feature adapter.
//!
//! The request head is parsed here with `httparse`; in a real deployment that is
//! the listener's job.
//!
//! ```text
//! curl -v http://127.0.0.1:8080/
//! curl -v http://127.0.0.1:8080/Cargo.toml?offset=10
//! ```

use std::error::Error;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use futures::FutureExt;
use http::{Request, StatusCode, Version};
use micro_exchange::exchange::{ConnectionInfo, HttpExchange};
use micro_feature::features::{RequestFeature, ResponseFeature, SendFileFeature};
use micro_feature::{BoxError, FeatureContext, Host, application_fn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let host = Arc::new(Host::builder().application(application_fn(|ctx| serve(ctx).boxed())).build()?);

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return Err(e.into());
        }
    };

    let mut next_id = 0u64;
    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };
        let local_addr = tcp_stream.local_addr()?;
        next_id += 1;
        let connection = ConnectionInfo::new(next_id.to_string(), remote_addr, local_addr);

        let host = host.clone();
        tokio::spawn(async move {
            let (mut reader, writer) = tcp_stream.into_split();
            match read_request(&mut reader).await {
                Ok(request) => host.handle(HttpExchange::new(connection, request.into(), reader, writer)).await,
                Err(e) => warn!(cause = %e, "failed to read request head"),
            }
        });
    }
}

async fn serve(ctx: &mut FeatureContext) -> Result<(), BoxError> {
    if ctx.path() == "/" {
        ctx.response_headers().set("content-type", ["text/plain; charset=utf-8"])?;
        ctx.response_body().write(b"Hello World!").await?;
        return Ok(());
    }

    let Some(file) = resolve_file(ctx.path()) else {
        ctx.set_status(StatusCode::FORBIDDEN);
        return Ok(());
    };
    if !file.is_file() {
        ctx.set_status(StatusCode::NOT_FOUND);
        return Ok(());
    }

    let offset = ctx
        .query_string()
        .trim_start_matches('?')
        .split('&')
        .find_map(|pair| pair.strip_prefix("offset="))
        .map(str::parse)
        .transpose()?
        .unwrap_or(0);
    ctx.send_file(&file, offset, None, CancellationToken::new()).await?;
    Ok(())
}

/// Maps the decoded request path onto a file below the working directory.
///
/// Returns `None` when the path could escape it: `..`, roots and drive prefixes.
fn resolve_file(path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
        .then(|| relative.to_path_buf())
}

/// Reads and parses one request head. Bytes past the head are dropped, so
/// requests with a body are not supported.
async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request<()>, BoxError> {
    let mut buf = BytesMut::with_capacity(4 * 1024);
    loop {
        if reader.read_buf(&mut buf).await? == 0 {
            return Err("connection closed before the request head was complete".into());
        }

        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut parsed = httparse::Request::new(&mut headers);
        if parsed.parse(&buf)?.is_partial() {
            continue;
        }

        let version = if parsed.version == Some(0) { Version::HTTP_10 } else { Version::HTTP_11 };
        let mut builder = Request::builder()
            .method(parsed.method.unwrap_or("GET"))
            .uri(parsed.path.unwrap_or("/"))
            .version(version);
        for header in parsed.headers.iter() {
            builder = builder.header(header.name, header.value);
        }
        return Ok(builder.body(())?);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_resolve_below_the_working_directory() {
        assert_eq!(resolve_file("/Cargo.toml"), Some(PathBuf::from("Cargo.toml")));
        assert_eq!(resolve_file("/src/./lib.rs"), Some(PathBuf::from("src/./lib.rs")));
        assert_eq!(resolve_file("//etc/passwd"), Some(PathBuf::from("etc/passwd")));
    }

    #[test]
    fn parent_components_are_rejected() {
        assert_eq!(resolve_file("/../Cargo.toml"), None);
        assert_eq!(resolve_file("/src/../../secret"), None);
        assert_eq!(resolve_file("/a/.."), None);
    }
}
