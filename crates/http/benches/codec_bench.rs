use std::hint::black_box;

use bytes::{Bytes, BytesMut};
use criterion::{Criterion, criterion_group, criterion_main};
use quasi_http::codec::{ChunkDecodingReader, ChunkEncodingReader, LeadChunk, LeadChunkCodec};
use quasi_http::codec::body::BodyChunkCodec;
use quasi_http::protocol::{DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_HEADERS_SIZE, PayloadItem, QuasiBody, QuasiRequest};
use tokio::io::AsyncReadExt;
use tokio_util::codec::{Decoder, Encoder};

fn sample_request() -> QuasiRequest {
    QuasiRequest::new("POST", "/api/v1/items?page=2")
        .http_version("1.1")
        .header("Content-Encoding", "identity")
        .header("Accept", "application/json")
        .header("Accept", "text/plain")
        .header("X-Request-Id", "5b2f0c4e-2f9a-4d3e-9a0c-7f1e6d2b8c11")
        .header("X-Note", "contains, commas and \"quotes\"")
        .body(QuasiBody::from_bytes("{\"name\":\"quasi\"}").with_content_type("application/json"))
}

fn bench_lead_chunk_encode(c: &mut Criterion) {
    let lead_chunk = LeadChunk::from_request(&sample_request());

    c.bench_function("encode_lead_chunk", |b| {
        b.iter(|| {
            let mut codec = LeadChunkCodec::new(DEFAULT_MAX_HEADERS_SIZE);
            let mut dst = BytesMut::with_capacity(512);
            codec.encode(black_box(&lead_chunk), &mut dst).unwrap();
            black_box(dst);
        });
    });
}

fn bench_lead_chunk_decode(c: &mut Criterion) {
    let mut encoded = BytesMut::new();
    LeadChunkCodec::new(DEFAULT_MAX_HEADERS_SIZE).encode(&LeadChunk::from_request(&sample_request()), &mut encoded).unwrap();
    let encoded = encoded.freeze();

    c.bench_function("decode_lead_chunk", |b| {
        b.iter(|| {
            let mut codec = LeadChunkCodec::new(DEFAULT_MAX_HEADERS_SIZE);
            let mut src = BytesMut::from(&encoded[..]);
            black_box(codec.decode(&mut src).unwrap());
        });
    });
}

fn bench_body_chunk_codec(c: &mut Criterion) {
    let data = Bytes::from(vec![b'q'; 64 * 1024]);

    c.bench_function("body_chunk_codec_64k", |b| {
        b.iter(|| {
            let mut codec = BodyChunkCodec::new();
            let mut buf = BytesMut::with_capacity(data.len() + 64);
            codec.encode(PayloadItem::Chunk(data.clone()), &mut buf).unwrap();
            codec.encode(PayloadItem::<Bytes>::Eof, &mut buf).unwrap();

            let mut decoder = BodyChunkCodec::new();
            while let Some(item) = decoder.decode(&mut buf).unwrap() {
                if item.is_eof() {
                    break;
                }
                black_box(item);
            }
        });
    });
}

fn bench_chunked_body_stream(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let data = vec![b'q'; 256 * 1024];

    c.bench_function("chunked_body_stream_256k", |b| {
        b.to_async(&runtime).iter(|| async {
            let encoder = ChunkEncodingReader::new(&data[..], DEFAULT_MAX_CHUNK_SIZE);
            let mut decoder = ChunkDecodingReader::new(encoder);
            let mut out = Vec::with_capacity(data.len());
            decoder.read_to_end(&mut out).await.unwrap();
            black_box(out);
        });
    });
}

criterion_group!(
    benches,
    bench_lead_chunk_encode,
    bench_lead_chunk_decode,
    bench_body_chunk_codec,
    bench_chunked_body_stream
);
criterion_main!(benches);
