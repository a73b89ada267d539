//! A clock endpoint behind the response cache.
//!
//! ```sh
//! RUST_LOG=http_freshness=debug cargo run --example cached_clock
//! ```

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use http_freshness::cache::{CacheMiddleware, CacheSettings, MemoryStore, RecorderMetrics, unix_now};
use http_freshness::context::Context;
use http_freshness::middleware::{MiddlewareHandler, Next, from_middleware, handler_fn};
use http_freshness::{Request, Response, StatusCode, telemetry};
use tracing::info;

const SETTINGS: &str = r#"{
    "default": { "min": 0, "max": 0 },
    "routes": {
        "/clock": { "min": 1, "max": 3 }
    }
}"#;

async fn send(chain: &[MiddlewareHandler], cache_control: Option<&str>) -> Result<Response, Box<dyn Error>> {
    let mut raw = String::from("GET /clock HTTP/1.1\r\nHost: localhost\r\n");
    if let Some(value) = cache_control {
        raw.push_str(&format!("Cache-Control: {value}\r\n"));
    }
    raw.push_str("\r\n");
    let (request, _) = Request::parse(raw.as_bytes())?;
    Ok(Next::new(chain.to_vec()).run(Context::new(request)).await)
}

fn show(label: &str, response: &Response) {
    info!(
        label,
        status = %response.status(),
        body = %String::from_utf8_lossy(response.payload()),
        etag = response.headers().get("etag").unwrap_or("-"),
        cache_control = response.headers().get("cache-control").unwrap_or("-"),
        warning = response.headers().get("warning").unwrap_or("-"),
        "response"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    telemetry::init()?;

    let settings = CacheSettings::from_json(SETTINGS)?;
    let cache = CacheMiddleware::new(settings, Arc::new(MemoryStore::new()), Arc::new(RecorderMetrics));

    let chain = vec![
        from_middleware(Arc::new(cache)),
        handler_fn(|_ctx: Context| async {
            Response::new(StatusCode::Ok)
                .header("Content-Type", "text/plain")
                .body(unix_now().to_string())
        }),
    ];

    show("first", &send(&chain, None).await?);
    show("repeat", &send(&chain, None).await?);
    show("clamped", &send(&chain, Some("max-age=0")).await?);

    tokio::time::sleep(Duration::from_secs(2)).await;
    show("no-cache", &send(&chain, Some("no-cache")).await?);

    tokio::time::sleep(Duration::from_secs(4)).await;
    show("expired", &send(&chain, None).await?);

    Ok(())
}
