use std::error::Error;

use quasi_http::application::make_application;
use quasi_http::protocol::{ProcessingOptions, QuasiBody, QuasiRequest, QuasiResponse, status};
use quasi_http::transport::memory::{MemoryClientTransport, MemoryServerTransport};
use quasi_http::{QuasiClient, QuasiServer};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

async fn echo(mut request: QuasiRequest) -> Result<QuasiResponse, Box<dyn Error + Send + Sync>> {
    info!(method = %request.method, target = %request.target, "receiving request");

    let Some(body) = request.body.take() else {
        return Ok(QuasiResponse::new(status::OK).status_message("empty"));
    };

    // hand the request body straight back, unbuffered
    let content_type = body.content_type().map(str::to_string);
    let mut reply = QuasiBody::streaming(body);
    if let Some(content_type) = content_type {
        reply = reply.with_content_type(content_type);
    }
    Ok(QuasiResponse::new(status::OK).header("X-Echo", request.target).body(reply))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let (server_transport, connector) = MemoryServerTransport::channel(ProcessingOptions::default());
    let server = match QuasiServer::builder().transport(server_transport).application(make_application(echo)).build() {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "failed to build server");
            return;
        }
    };
    tokio::spawn(async move { server.serve().await });

    let client = QuasiClient::builder()
        .transport(MemoryClientTransport::new().with_endpoint("echo", connector))
        .default_options(ProcessingOptions::default().with_timeout(Duration::from_secs(5)))
        .build()
        .expect("transport is set");

    for text in ["hello", "quasi-http over a memory pipe"] {
        let request = QuasiRequest::new("POST", "/echo").body(QuasiBody::from_bytes(text).with_content_type("text/plain"));
        match client.send("echo", request, None).await {
            Ok(mut response) => {
                let body = match response.body.as_mut() {
                    Some(body) => body.read_to_bytes(1024).await.unwrap_or_default(),
                    None => Default::default(),
                };
                info!(
                    status_code = response.status_code,
                    headers = ?response.headers,
                    body = %String::from_utf8_lossy(&body),
                    "received response"
                );
            }
            Err(e) => error!(cause = %e, "send failed"),
        }
    }
}
