//! Async read helpers used when pulling frames and bodies off a connection.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::{CodecError, QuasiHttpError};

/// Fills `buf` completely from `reader`.
///
/// Running out of data before `buf` is full is a protocol violation rather
/// than a plain io error, since every caller knows exactly how many bytes the
/// peer promised.
pub(crate) async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), QuasiHttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(CodecError::UnexpectedEof.into());
        }
        filled += n;
    }
    Ok(())
}

/// Reads `reader` to its end, failing once more than `limit` bytes show up.
pub(crate) async fn read_all_bytes<R>(reader: &mut R, limit: usize) -> Result<Bytes, QuasiHttpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = BytesMut::with_capacity(limit.min(8 * 1024));
    loop {
        if buf.len() > limit {
            return Err(QuasiHttpError::length_limit_exceeded(format!(
                "body of indeterminate length exceeds buffering limit of {limit} bytes"
            )));
        }
        // read_buf grows the buffer on demand
        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            break;
        }
    }
    Ok(buf.freeze())
}
