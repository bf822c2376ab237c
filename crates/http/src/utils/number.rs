use crate::protocol::CodecError;

/// Parses a decimal integer, rejecting anything outside `min..=max`.
///
/// Leading and trailing ASCII whitespace is ignored, a leading sign is allowed.
pub(crate) fn parse_int(input: &str, min: i64, max: i64) -> Result<i64, CodecError> {
    let value: i64 =
        input.trim().parse().map_err(|e| CodecError::invalid_lead_chunk(format!("invalid integer {input:?}: {e}")))?;
    if value < min || value > max {
        return Err(CodecError::invalid_lead_chunk(format!("integer {value} out of range [{min}, {max}]")));
    }
    Ok(value)
}

/// Parses a fixed-width ASCII length prefix.
///
/// Negative values are reported as an invalid chunk length, any other
/// malformation as an invalid lead chunk.
pub(crate) fn parse_length_prefix(prefix: &[u8], max: u64) -> Result<u64, CodecError> {
    let text = std::str::from_utf8(prefix).map_err(|_e| CodecError::invalid_chunk_length("length prefix is not ascii"))?;
    let value: i64 =
        text.trim().parse().map_err(|_e| CodecError::invalid_chunk_length(format!("invalid length prefix {text:?}")))?;
    let value = u64::try_from(value).map_err(|_e| CodecError::invalid_chunk_length(format!("negative length {value}")))?;
    if value > max {
        return Err(CodecError::invalid_chunk_length(format!("length {value} exceeds the limit {max}")));
    }
    Ok(value)
}
