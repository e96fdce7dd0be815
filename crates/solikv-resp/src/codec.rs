use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// A RESP2 frame exchanged with a Redis-compatible server.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(Bytes),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Array(Vec<RespFrame>),
    Null,
}

impl RespFrame {
    pub fn ok() -> Self {
        RespFrame::SimpleString(Bytes::from_static(b"OK"))
    }

    pub fn error(msg: impl Into<String>) -> Self {
        RespFrame::Error(msg.into())
    }

    pub fn bulk_string(s: &str) -> Self {
        RespFrame::BulkString(Bytes::from(s.to_string()))
    }

    /// Textual payload of a string-like reply. Error replies yield their message.
    pub fn text(&self) -> Option<String> {
        match self {
            RespFrame::SimpleString(b) | RespFrame::BulkString(b) => {
                Some(String::from_utf8_lossy(b).into_owned())
            }
            RespFrame::Error(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespFrame::Error(_))
    }
}

/// Client-side RESP codec: encodes requests, decodes replies.
#[derive(Debug, Default)]
pub struct RespCodec;

impl RespCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RespCodec {
    type Item = RespFrame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match decode_frame(src) {
            Ok(Some((frame, consumed))) => {
                src.advance(consumed);
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        }
    }
}

impl Encoder<RespFrame> for RespCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst);
        Ok(())
    }
}

/// Encode a RESP frame into bytes.
pub fn encode_frame(frame: &RespFrame, dst: &mut BytesMut) {
    match frame {
        RespFrame::SimpleString(s) => write_line(dst, b'+', s),
        RespFrame::Error(msg) => write_line(dst, b'-', msg.as_bytes()),
        RespFrame::Integer(n) => write_line(dst, b':', n.to_string().as_bytes()),
        RespFrame::BulkString(data) => {
            write_line(dst, b'$', data.len().to_string().as_bytes());
            dst.extend_from_slice(data);
            dst.extend_from_slice(b"\r\n");
        }
        RespFrame::Null => dst.extend_from_slice(b"$-1\r\n"),
        RespFrame::Array(items) => {
            write_line(dst, b'*', items.len().to_string().as_bytes());
            for item in items {
                encode_frame(item, dst);
            }
        }
    }
}

fn write_line(dst: &mut BytesMut, prefix: u8, body: &[u8]) {
    dst.reserve(body.len() + 3);
    dst.extend_from_slice(&[prefix]);
    dst.extend_from_slice(body);
    dst.extend_from_slice(b"\r\n");
}

/// Try to decode a reply from the buffer. Returns (frame, bytes_consumed) or None if incomplete.
pub fn decode_frame(src: &[u8]) -> Result<Option<(RespFrame, usize)>, String> {
    let Some(&kind) = src.first() else {
        return Ok(None);
    };
    let Some(pos) = find_crlf(&src[1..]) else {
        return Ok(None);
    };
    let line = &src[1..1 + pos];
    let header_len = 1 + pos + 2;

    match kind {
        b'+' => Ok(Some((
            RespFrame::SimpleString(Bytes::copy_from_slice(line)),
            header_len,
        ))),
        b'-' => Ok(Some((
            RespFrame::Error(String::from_utf8_lossy(line).into_owned()),
            header_len,
        ))),
        b':' => Ok(Some((RespFrame::Integer(parse_int(line, "integer")?), header_len))),
        b'$' => decode_bulk_string(src, parse_int(line, "bulk length")?, header_len),
        b'*' => decode_array(src, parse_int(line, "array count")?, header_len),
        other => Err(format!("unexpected reply type byte '{}'", other as char)),
    }
}

fn find_crlf(src: &[u8]) -> Option<usize> {
    src.windows(2).position(|w| w == b"\r\n")
}

fn parse_int(line: &[u8], what: &str) -> Result<i64, String> {
    std::str::from_utf8(line)
        .map_err(|e| format!("invalid utf8 in {}: {}", what, e))?
        .parse()
        .map_err(|e| format!("invalid {}: {}", what, e))
}

fn decode_bulk_string(
    src: &[u8],
    len: i64,
    data_start: usize,
) -> Result<Option<(RespFrame, usize)>, String> {
    if len == -1 {
        return Ok(Some((RespFrame::Null, data_start)));
    }
    let len = usize::try_from(len).map_err(|_| format!("invalid bulk length: {}", len))?;
    let total_needed = data_start + len + 2;
    if src.len() < total_needed {
        return Ok(None);
    }
    if &src[data_start + len..total_needed] != b"\r\n" {
        return Err("bulk string not terminated by CRLF".to_string());
    }
    let data = Bytes::copy_from_slice(&src[data_start..data_start + len]);
    Ok(Some((RespFrame::BulkString(data), total_needed)))
}

fn decode_array(
    src: &[u8],
    count: i64,
    mut offset: usize,
) -> Result<Option<(RespFrame, usize)>, String> {
    if count == -1 {
        return Ok(Some((RespFrame::Null, offset)));
    }
    let count = usize::try_from(count).map_err(|_| format!("invalid array count: {}", count))?;
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        match decode_frame(&src[offset..])? {
            Some((frame, consumed)) => {
                items.push(frame);
                offset += consumed;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((RespFrame::Array(items), offset)))
}
