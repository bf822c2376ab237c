use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;

use crate::codec::LeadChunk;
use crate::connection::QuasiConnection;
use crate::protocol::{Environment, QuasiBody, QuasiHttpError, QuasiRequest, QuasiResponse};

/// Writes `request` and reads the response lead chunk at the same time.
///
/// A response that arrives intact wins, even while the request body is
/// still being written; the unfinished write is dropped. Otherwise the first
/// failure of either side is returned. The response body comes back in
/// memory when buffering applies, else it is left on the connection.
pub(crate) async fn send<S>(
    connection: &mut QuasiConnection<S>,
    request: &mut QuasiRequest,
) -> Result<(LeadChunk, Option<Bytes>), QuasiHttpError>
where
    S: AsyncRead + AsyncWrite,
{
    let lead_chunk = LeadChunk::from_request(request);
    let (mut writer, mut reader) = connection.split_mut();

    let write = writer.write(false, &lead_chunk, request.body.as_mut());
    let read = reader.read(true);
    tokio::pin!(write, read);

    select! {
        biased;
        response = &mut read => response,
        written = &mut write => {
            written?;
            read.await
        }
    }
}

pub(crate) fn response_from_lead_chunk(
    lead_chunk: LeadChunk,
    body: Option<QuasiBody>,
    environment: Environment,
) -> QuasiResponse {
    let LeadChunk { http_version, status_code, status_message, content_type, headers, .. } = lead_chunk;
    let mut response = QuasiResponse::new(status_code);
    response.status_message = status_message;
    response.http_version = http_version;
    response.headers = headers;
    response.environment = environment;
    response.body = body.map(|mut body| {
        body.set_content_type(content_type);
        body
    });
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionRole;
    use crate::protocol::ProcessingOptions;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn test_response_wins_over_unfinished_body() {
        let (client, server) = duplex(1024);
        let mut connection = QuasiConnection::new(client, ConnectionRole::Client, &ProcessingOptions::default(), Environment::new());
        let mut peer = QuasiConnection::new(server, ConnectionRole::Server, &ProcessingOptions::default(), Environment::new());

        // the body never ends, so the write can only be cut short
        let mut request = QuasiRequest::new("PUT", "/upload").body(QuasiBody::streaming(tokio::io::repeat(b'x')));
        let responder = async {
            let (received, _) = peer.read(false).await?;
            let response = QuasiResponse::new(413).status_message(received.request_target.unwrap_or_default());
            peer.write(true, &LeadChunk::from_response(&response), None).await
        };

        let (sent, responded) = tokio::join!(send(&mut connection, &mut request), responder);
        responded.unwrap();
        let (lead_chunk, buffered) = sent.unwrap();
        assert_eq!(lead_chunk.status_code, 413);
        assert_eq!(lead_chunk.status_message.as_deref(), Some("/upload"));
        assert!(buffered.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let (client, server) = duplex(1024);
        let mut connection = QuasiConnection::new(client, ConnectionRole::Client, &ProcessingOptions::default(), Environment::new());
        let _peer = server;

        // declares more bytes than the source holds
        let mut request = QuasiRequest::new("POST", "/").body(QuasiBody::new(10, &b"short"[..]));
        let err = send(&mut connection, &mut request).await.unwrap_err();
        assert!(matches!(err, QuasiHttpError::Codec { .. }));
    }

    #[tokio::test]
    async fn test_response_from_lead_chunk() {
        let lead_chunk = LeadChunk {
            status_code: 201,
            status_message: Some("Created".to_string()),
            content_type: Some("text/plain".to_string()),
            content_length: 2,
            ..Default::default()
        };
        let mut environment = Environment::new();
        environment.insert("endpoint".to_string(), serde_json::json!("memory"));

        let mut response = response_from_lead_chunk(lead_chunk, Some(QuasiBody::from_bytes("ok")), environment);
        assert_eq!(response.status_code, 201);
        assert_eq!(response.status_message.as_deref(), Some("Created"));
        assert_eq!(response.environment.get("endpoint"), Some(&serde_json::json!("memory")));

        let body = response.body.as_mut().unwrap();
        assert_eq!(body.content_type(), Some("text/plain"));
        let mut out = String::new();
        body.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "ok");
    }
}
