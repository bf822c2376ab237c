use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::application::Application;
use crate::codec::{LeadChunk, PayloadDecoder};
use crate::connection::QuasiConnection;
use crate::protocol::{QuasiBody, QuasiHttpError, QuasiRequest};

/// Serves one request on `connection`.
///
/// The request body streams straight off the connection into the
/// application. A missing response is a protocol error.
pub(crate) async fn receive<S, A>(connection: &mut QuasiConnection<S>, application: &A) -> Result<(), QuasiHttpError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    A: Application + ?Sized,
{
    let (lead_chunk, _) = connection.read(false).await?;
    let request = request_from_lead_chunk(lead_chunk, connection)?;
    debug!(method = %request.method, target = %request.target, "request received");

    let response = application.process_request(request).await.map_err(QuasiHttpError::processing)?;
    let Some(mut response) = response else {
        return Err(QuasiHttpError::NoResponse);
    };

    debug!(status_code = response.status_code, "sending response");
    let lead_chunk = LeadChunk::from_response(&response);
    connection.write(true, &lead_chunk, response.body.as_mut()).await
}

fn request_from_lead_chunk<S>(lead_chunk: LeadChunk, connection: &mut QuasiConnection<S>) -> Result<QuasiRequest, QuasiHttpError>
where
    S: AsyncRead + Send + 'static,
{
    let LeadChunk { method, request_target, http_version, content_length, content_type, headers, .. } = lead_chunk;

    let body = if content_length == 0 {
        None
    } else {
        let payload = PayloadDecoder::new(connection.take_reader()?, content_length);
        let mut body = QuasiBody::new(content_length, payload);
        body.set_content_type(content_type);
        Some(body)
    };

    Ok(QuasiRequest {
        method: method.unwrap_or_default(),
        target: request_target.unwrap_or_default(),
        http_version,
        headers,
        body,
        environment: connection.environment().clone(),
    })
}
