//! Lead chunk: the request line or status line plus headers.
//!
//! # Wire format
//!
//! ```text
//! +---------------------+---------+-------+---------------------+
//! | length (6 digits)   | version | flags | CSV header section  |
//! | ASCII decimal       | 1 byte  | 1 byte| UTF-8               |
//! +---------------------+---------+-------+---------------------+
//!                       <---------- length bytes --------------->
//! ```
//!
//! The first CSV row holds the positional fields shared by requests and
//! responses. Optional strings are preceded by a `"1"`/`"0"` presence flag,
//! since CSV alone cannot tell an absent value from an empty one. Every
//! following row is `name,value1,value2,...`.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::protocol::{CodecError, Headers, QuasiBody, QuasiRequest, QuasiResponse};
use crate::utils::ensure;
use crate::utils::number::{parse_int, parse_length_prefix};

use super::csv::{decode_csv, encode_csv};

/// Width of the ASCII length prefix in front of a lead chunk.
pub const LEAD_CHUNK_LENGTH_PREFIX: usize = 6;

/// Largest lead chunk the length prefix can describe.
pub const HARD_MAX_LEAD_CHUNK_SIZE: usize = 999_999;

/// Version written into every chunk, zero is reserved.
pub const CHUNK_VERSION: u8 = 1;

/// Version byte plus flags byte.
const CHUNK_PREFACE: usize = 2;

const SPECIAL_ROW_FIELDS: usize = 12;
const HEADER_ROW_MIN_FIELDS: usize = 2;

/// Decoded form of the request line or status line plus headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadChunk {
    /// Chunk version, [`CHUNK_VERSION`] when encoding.
    pub version: u8,
    /// Reserved, always written as zero.
    pub flags: u8,
    /// Request method, absent on responses.
    pub method: Option<String>,
    /// Request target, absent on responses.
    pub request_target: Option<String>,
    pub http_version: Option<String>,
    /// Response status, zero on requests.
    pub status_code: i32,
    pub status_message: Option<String>,
    /// Body size in bytes: zero for no body, negative when unknown.
    pub content_length: i64,
    pub content_type: Option<String>,
    /// Header values in insertion order; names without values are not encoded.
    pub headers: Headers,
}

impl Default for LeadChunk {
    fn default() -> Self {
        Self {
            version: CHUNK_VERSION,
            flags: 0,
            method: None,
            request_target: None,
            http_version: None,
            status_code: 0,
            status_message: None,
            content_length: 0,
            content_type: None,
            headers: Headers::new(),
        }
    }
}

impl LeadChunk {
    /// Lead chunk announcing `request`, with the content length and type of its body.
    pub fn from_request(request: &QuasiRequest) -> Self {
        let (content_length, content_type) = body_metadata(request.body.as_ref());
        Self {
            method: Some(request.method.clone()),
            request_target: Some(request.target.clone()),
            http_version: request.http_version.clone(),
            content_length,
            content_type,
            headers: request.headers.clone(),
            ..Default::default()
        }
    }

    /// Lead chunk announcing `response`, with the content length and type of its body.
    pub fn from_response(response: &QuasiResponse) -> Self {
        let (content_length, content_type) = body_metadata(response.body.as_ref());
        Self {
            http_version: response.http_version.clone(),
            status_code: response.status_code,
            status_message: response.status_message.clone(),
            content_length,
            content_type,
            headers: response.headers.clone(),
            ..Default::default()
        }
    }

    fn to_csv(&self) -> String {
        let status_code = self.status_code.to_string();
        let content_length = self.content_length.to_string();
        let special_row = vec![
            presence(self.method.as_ref()),
            self.method.as_deref().unwrap_or_default(),
            presence(self.request_target.as_ref()),
            self.request_target.as_deref().unwrap_or_default(),
            presence(self.http_version.as_ref()),
            self.http_version.as_deref().unwrap_or_default(),
            status_code.as_str(),
            presence(self.status_message.as_ref()),
            self.status_message.as_deref().unwrap_or_default(),
            content_length.as_str(),
            presence(self.content_type.as_ref()),
            self.content_type.as_deref().unwrap_or_default(),
        ];

        let header_rows = self
            .headers
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| std::iter::once(name.as_str()).chain(values.iter().map(String::as_str)).collect::<Vec<_>>());

        encode_csv(std::iter::once(special_row).chain(header_rows))
    }

    fn from_csv(version: u8, flags: u8, csv: &str) -> Result<Self, CodecError> {
        let mut rows = decode_csv(csv)?.into_iter();
        let special = rows.next().ok_or_else(|| CodecError::invalid_lead_chunk("missing special row"))?;
        ensure!(
            special.len() >= SPECIAL_ROW_FIELDS,
            CodecError::invalid_lead_chunk(format!(
                "special row has {} fields, at least {SPECIAL_ROW_FIELDS} required",
                special.len()
            ))
        );

        let optional = |flag_index: usize| -> Option<String> { (special[flag_index] == "1").then(|| special[flag_index + 1].clone()) };

        let status_code = parse_int(&special[6], i64::from(i32::MIN), i64::from(i32::MAX))?;
        let content_length = parse_int(&special[9], i64::MIN, i64::MAX)?;

        let mut headers = Headers::new();
        for row in rows {
            ensure!(
                row.len() >= HEADER_ROW_MIN_FIELDS,
                CodecError::invalid_lead_chunk(format!(
                    "header row has {} fields, at least {HEADER_ROW_MIN_FIELDS} required",
                    row.len()
                ))
            );
            let mut fields = row.into_iter();
            if let Some(name) = fields.next() {
                headers.entry(name).or_default().extend(fields);
            }
        }

        Ok(Self {
            version,
            flags,
            method: optional(0),
            request_target: optional(2),
            http_version: optional(4),
            status_code: i32::try_from(status_code).unwrap_or_default(),
            status_message: optional(7),
            content_length,
            content_type: optional(10),
            headers,
        })
    }
}

fn presence(value: Option<&String>) -> &'static str {
    if value.is_some() { "1" } else { "0" }
}

fn body_metadata(body: Option<&QuasiBody>) -> (i64, Option<String>) {
    body.map(|b| (b.content_length(), b.content_type().map(str::to_string))).unwrap_or((0, None))
}

/// Encoder/decoder for length-prefixed lead chunks.
///
/// The size limit is the smaller of the configured max headers size and
/// [`HARD_MAX_LEAD_CHUNK_SIZE`]. Encoding checks it before anything is put
/// into the destination buffer, decoding checks it as soon as the length
/// prefix is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadChunkCodec {
    max_size: usize,
}

impl LeadChunkCodec {
    /// The effective limit is `max_headers_size`, capped at [`HARD_MAX_LEAD_CHUNK_SIZE`].
    pub fn new(max_headers_size: usize) -> Self {
        Self { max_size: max_headers_size.min(HARD_MAX_LEAD_CHUNK_SIZE) }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Validates a length prefix and returns the number of bytes that follow it.
    pub fn decode_length(&self, prefix: &[u8]) -> Result<usize, CodecError> {
        let length = parse_length_prefix(prefix, HARD_MAX_LEAD_CHUNK_SIZE as u64)?;
        let length = usize::try_from(length).map_err(|_e| CodecError::invalid_chunk_length("length overflow"))?;
        ensure!(length <= self.max_size, CodecError::headers_too_large(length, self.max_size));
        ensure!(length >= CHUNK_PREFACE, CodecError::invalid_chunk_length(format!("lead chunk length {length} too small")));
        Ok(length)
    }
}

impl Encoder<&LeadChunk> for LeadChunkCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &LeadChunk, dst: &mut BytesMut) -> Result<(), Self::Error> {
        ensure!(item.version != 0, CodecError::InvalidVersion(item.version));

        let csv = item.to_csv();
        let length = CHUNK_PREFACE + csv.len();
        ensure!(length <= self.max_size, CodecError::headers_too_large(length, self.max_size));

        trace!(length, "encode lead chunk");
        dst.reserve(LEAD_CHUNK_LENGTH_PREFIX + length);
        dst.put_slice(format!("{length:0width$}", width = LEAD_CHUNK_LENGTH_PREFIX).as_bytes());
        dst.put_u8(item.version);
        dst.put_u8(item.flags);
        dst.put_slice(csv.as_bytes());
        Ok(())
    }
}

impl Decoder for LeadChunkCodec {
    type Item = LeadChunk;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LEAD_CHUNK_LENGTH_PREFIX {
            return Ok(None);
        }

        let length = self.decode_length(&src[..LEAD_CHUNK_LENGTH_PREFIX])?;
        if src.len() < LEAD_CHUNK_LENGTH_PREFIX + length {
            src.reserve(LEAD_CHUNK_LENGTH_PREFIX + length - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(LEAD_CHUNK_LENGTH_PREFIX + length);
        let payload = frame.split_off(LEAD_CHUNK_LENGTH_PREFIX);
        let (version, flags) = (payload[0], payload[1]);
        ensure!(version != 0, CodecError::InvalidVersion(version));

        let csv = std::str::from_utf8(&payload[CHUNK_PREFACE..])
            .map_err(|e| CodecError::invalid_lead_chunk(format!("header section is not utf-8: {e}")))?;
        trace!(length, "decode lead chunk");
        LeadChunk::from_csv(version, flags, csv).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(chunk: &LeadChunk) -> BytesMut {
        let mut dst = BytesMut::new();
        LeadChunkCodec::new(HARD_MAX_LEAD_CHUNK_SIZE).encode(chunk, &mut dst).unwrap();
        dst
    }

    #[test]
    fn test_request_round_trip() {
        let request = QuasiRequest::new("POST", "/x")
            .header("A", "1")
            .header("b", "two")
            .header("b", "")
            .header("a", "lower,case \"quoted\"")
            .body(QuasiBody::from_bytes("hello").with_content_type("text/plain"));

        let chunk = LeadChunk::from_request(&request);
        let mut buf = encode(&chunk);
        let decoded = LeadChunkCodec::new(1024).decode(&mut buf).unwrap().unwrap();

        assert!(buf.is_empty());
        assert_eq!(decoded, chunk);
        assert_eq!(decoded.method.as_deref(), Some("POST"));
        assert_eq!(decoded.request_target.as_deref(), Some("/x"));
        assert_eq!(decoded.http_version, None);
        assert_eq!(decoded.content_length, 5);
        assert_eq!(decoded.content_type.as_deref(), Some("text/plain"));
        assert_eq!(decoded.headers.get("b"), Some(&vec!["two".to_string(), String::new()]));
        assert_eq!(decoded.headers.len(), 3);
    }

    #[test]
    fn test_response_round_trip_keeps_empty_strings() {
        let mut response = QuasiResponse::new(404).status_message("");
        response.http_version = Some(String::new());
        let chunk = LeadChunk::from_response(&response);

        let decoded = LeadChunkCodec::new(1024).decode(&mut encode(&chunk)).unwrap().unwrap();
        assert_eq!(decoded.status_code, 404);
        assert_eq!(decoded.status_message.as_deref(), Some(""));
        assert_eq!(decoded.http_version.as_deref(), Some(""));
        assert_eq!(decoded.method, None);
        assert_eq!(decoded.request_target, None);
        assert_eq!(decoded.content_length, 0);
        assert!(decoded.headers.is_empty());
    }

    #[test]
    fn test_wire_layout() {
        let chunk = LeadChunk { method: Some("GET".into()), request_target: Some("/".into()), ..Default::default() };
        let buf = encode(&chunk);
        let csv = "1,GET,1,/,0,,0,0,,0,0,\n";
        assert_eq!(&buf[..6], format!("{:06}", csv.len() + 2).as_bytes());
        assert_eq!(buf[6], CHUNK_VERSION);
        assert_eq!(buf[7], 0);
        assert_eq!(&buf[8..], csv.as_bytes());
    }

    #[test]
    fn test_duplicate_rows_merge_in_order() {
        let csv = "1,GET,1,/,0,,0,0,,0,0,\nA,1,2\nB,x\nA,3\n";
        let mut buf = BytesMut::new();
        buf.put_slice(format!("{:06}", csv.len() + 2).as_bytes());
        buf.put_slice(&[1, 0]);
        buf.put_slice(csv.as_bytes());

        let decoded = LeadChunkCodec::new(1024).decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.headers.get("A"), Some(&vec!["1".to_string(), "2".to_string(), "3".to_string()]));
        assert_eq!(decoded.headers.get("B"), Some(&vec!["x".to_string()]));
    }

    #[test]
    fn test_incomplete_frame() {
        let mut full = encode(&LeadChunk::default());
        let mut partial = full.split_to(full.len() / 2 + 3);
        let mut codec = LeadChunkCodec::new(1024);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.unsplit(full);
        assert!(codec.decode(&mut partial).unwrap().is_some());
    }

    #[test]
    fn test_encode_too_large_writes_nothing() {
        let chunk = LeadChunk { headers: [("big".to_string(), vec!["x".repeat(200)])].into(), ..Default::default() };
        let mut dst = BytesMut::new();
        let result = LeadChunkCodec::new(100).encode(&chunk, &mut dst);
        assert!(matches!(result, Err(CodecError::HeadersTooLarge { max_size: 100, .. })));
        assert!(dst.is_empty());
    }

    #[test]
    fn test_default_max_headers_size() {
        let chunk = LeadChunk {
            headers: [("big".to_string(), vec!["x".repeat(crate::protocol::DEFAULT_MAX_HEADERS_SIZE)])].into(),
            ..Default::default()
        };
        let mut dst = BytesMut::new();
        let result = LeadChunkCodec::new(crate::protocol::DEFAULT_MAX_HEADERS_SIZE).encode(&chunk, &mut dst);
        assert!(matches!(result, Err(CodecError::HeadersTooLarge { .. })));
        assert!(dst.is_empty());
    }

    #[test]
    fn test_decode_rejects_oversized_prefix() {
        let mut buf = BytesMut::from(&b"002000\x01\x00"[..]);
        let result = LeadChunkCodec::new(1024).decode(&mut buf);
        assert!(matches!(result, Err(CodecError::HeadersTooLarge { current_size: 2000, max_size: 1024 })));
    }

    #[test]
    fn test_decode_rejects_zero_version() {
        let csv = "0,,0,,0,,0,0,,0,0,\n";
        let mut buf = BytesMut::new();
        buf.put_slice(format!("{:06}", csv.len() + 2).as_bytes());
        buf.put_slice(&[0, 0]);
        buf.put_slice(csv.as_bytes());
        assert!(matches!(LeadChunkCodec::new(1024).decode(&mut buf), Err(CodecError::InvalidVersion(0))));
    }

    #[test]
    fn test_decode_rejects_short_rows() {
        for csv in ["1,GET,1,/\n", "0,,0,,0,,0,0,,0,0,\nlonely\n"] {
            let mut buf = BytesMut::new();
            buf.put_slice(format!("{:06}", csv.len() + 2).as_bytes());
            buf.put_slice(&[1, 0]);
            buf.put_slice(csv.as_bytes());
            assert!(matches!(LeadChunkCodec::new(1024).decode(&mut buf), Err(CodecError::InvalidLeadChunk { .. })));
        }
    }

    #[test]
    fn test_decode_rejects_negative_length() {
        let mut buf = BytesMut::from(&b"-00010\x01\x00"[..]);
        assert!(matches!(LeadChunkCodec::new(1024).decode(&mut buf), Err(CodecError::InvalidChunkLength { .. })));
    }
}
