//! Content-Encoding dispatch for response bodies.
//!
//! The client never lets the HTTP stack decompress on its own; instead the
//! declared `Content-Encoding` picks one of these decoders, and body chunks
//! are pushed through it as they arrive from the socket. Nothing is buffered
//! in compressed form, and a body that does not match its declared encoding
//! fails loudly with a [`DecodeError`].

use std::fmt;
use std::io::{self, Write};

const BROTLI_BUFFER: usize = 4096;

/// Content encodings the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
    /// zlib-wrapped deflate, as HTTP servers send it.
    Deflate,
    Brotli,
}

impl Encoding {
    /// Map a `Content-Encoding` token to an encoding. Unknown or absent
    /// tokens pass through as [`Encoding::Identity`].
    ///
    /// ```
    /// use wallprobe_http::decode::Encoding;
    ///
    /// assert_eq!(Encoding::from_token(Some(" GZIP ")), Encoding::Gzip);
    /// assert_eq!(Encoding::from_token(Some("zstd")), Encoding::Identity);
    /// assert_eq!(Encoding::from_token(None), Encoding::Identity);
    /// ```
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("gzip") | Some("x-gzip") => Encoding::Gzip,
            Some("deflate") => Encoding::Deflate,
            Some("br") => Encoding::Brotli,
            _ => Encoding::Identity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::Brotli => "br",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body bytes did not match the declared encoding.
#[derive(Debug, thiserror::Error)]
#[error("{encoding} body could not be decoded: {source}")]
pub struct DecodeError {
    pub encoding: Encoding,
    #[source]
    pub source: io::Error,
}

enum Inner<W: Write> {
    /// Nothing pushed yet. Compressed decoders are built on the first
    /// non-empty chunk, so an empty body never reaches them.
    Pending(W),
    Identity(W),
    Gzip(flate2::write::GzDecoder<W>),
    Deflate(flate2::write::ZlibDecoder<W>),
    Brotli(brotli::DecompressorWriter<W>),
}

impl<W: Write> Inner<W> {
    fn start(encoding: Encoding, sink: W) -> Self {
        match encoding {
            Encoding::Identity => Inner::Identity(sink),
            Encoding::Gzip => Inner::Gzip(flate2::write::GzDecoder::new(sink)),
            Encoding::Deflate => Inner::Deflate(flate2::write::ZlibDecoder::new(sink)),
            Encoding::Brotli => {
                Inner::Brotli(brotli::DecompressorWriter::new(sink, BROTLI_BUFFER))
            }
        }
    }
}

/// Incremental decoder writing decompressed bytes into `W`.
///
/// An empty body decodes to nothing whatever its declared encoding.
///
/// ```
/// use wallprobe_http::decode::ContentDecoder;
///
/// let mut decoder = ContentDecoder::select(None, Vec::new());
/// decoder.push(b"plain ").unwrap();
/// decoder.push(b"text").unwrap();
/// assert_eq!(decoder.finish().unwrap(), b"plain text");
///
/// let empty = ContentDecoder::select(Some("gzip"), Vec::new());
/// assert!(empty.finish().unwrap().is_empty());
/// ```
pub struct ContentDecoder<W: Write> {
    encoding: Encoding,
    // Only `None` while `push` swaps the pending sink into a decoder.
    inner: Option<Inner<W>>,
}

impl<W: Write> ContentDecoder<W> {
    pub fn new(encoding: Encoding, sink: W) -> Self {
        Self {
            encoding,
            inner: Some(Inner::Pending(sink)),
        }
    }

    /// Pick the decoder for a declared `Content-Encoding` value.
    pub fn select(token: Option<&str>, sink: W) -> Self {
        Self::new(Encoding::from_token(token), sink)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Feed the next chunk of the (possibly compressed) body.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), DecodeError> {
        if chunk.is_empty() {
            return Ok(());
        }
        if let Some(Inner::Pending(sink)) = self.inner.take_if(|i| matches!(i, Inner::Pending(_))) {
            self.inner = Some(Inner::start(self.encoding, sink));
        }
        let res = match self.inner.as_mut() {
            Some(Inner::Pending(w)) | Some(Inner::Identity(w)) => w.write_all(chunk),
            Some(Inner::Gzip(d)) => d.write_all(chunk),
            Some(Inner::Deflate(d)) => d.write_all(chunk),
            Some(Inner::Brotli(d)) => d.write_all(chunk),
            None => Err(lost_sink()),
        };
        res.map_err(|source| self.error(source))
    }

    /// Flush the decoder and hand back the sink. Truncated streams fail here.
    pub fn finish(self) -> Result<W, DecodeError> {
        let encoding = self.encoding;
        let wrap = |source| DecodeError { encoding, source };
        match self.inner {
            Some(Inner::Pending(mut w)) | Some(Inner::Identity(mut w)) => {
                w.flush().map_err(wrap)?;
                Ok(w)
            }
            Some(Inner::Gzip(d)) => d.finish().map_err(wrap),
            Some(Inner::Deflate(d)) => d.finish().map_err(wrap),
            // into_inner drains the decoder and reports a stream that never completed.
            Some(Inner::Brotli(d)) => d.into_inner().map_err(|_| {
                wrap(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "brotli stream ended early",
                ))
            }),
            None => Err(wrap(lost_sink())),
        }
    }

    fn error(&self, source: io::Error) -> DecodeError {
        DecodeError {
            encoding: self.encoding,
            source,
        }
    }
}

fn lost_sink() -> io::Error {
    io::Error::other("decoder sink lost")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;

    const PAYLOAD: &str = "<html><title>知乎</title><body>content content content</body></html>";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn brotli(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut enc = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
            enc.write_all(data).unwrap();
        }
        out
    }

    /// Push in small chunks to exercise the incremental path.
    fn decode(token: &str, body: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut decoder = ContentDecoder::select(Some(token), Vec::new());
        for chunk in body.chunks(7) {
            decoder.push(chunk)?;
        }
        decoder.finish()
    }

    #[test]
    fn decodes_each_supported_encoding() {
        let raw = PAYLOAD.as_bytes();
        assert_eq!(decode("gzip", &gzip(raw)).unwrap(), raw);
        assert_eq!(decode("deflate", &zlib(raw)).unwrap(), raw);
        assert_eq!(decode("br", &brotli(raw)).unwrap(), raw);
    }

    #[test]
    fn unknown_tokens_pass_through() {
        let raw = PAYLOAD.as_bytes();
        assert_eq!(decode("identity", raw).unwrap(), raw);
        assert_eq!(decode("zstd", raw).unwrap(), raw);
        assert_eq!(decode("", raw).unwrap(), raw);
    }

    #[test]
    fn mismatched_encoding_is_an_error() {
        let err = decode("gzip", b"definitely not a gzip stream").unwrap_err();
        assert_eq!(err.encoding, Encoding::Gzip);
        assert!(err.to_string().contains("gzip"));
    }

    #[test]
    fn empty_bodies_decode_to_nothing() {
        for token in ["gzip", "deflate", "br", "identity"] {
            assert_eq!(decode(token, b"").unwrap(), b"", "{token}");
        }
        let mut decoder = ContentDecoder::select(Some("gzip"), Vec::new());
        decoder.push(b"").unwrap();
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn truncated_stream_still_fails() {
        let full = gzip(PAYLOAD.as_bytes());
        let err = decode("gzip", &full[..full.len() / 2]).unwrap_err();
        assert_eq!(err.encoding, Encoding::Gzip);
    }

    #[test]
    fn reports_selected_encoding() {
        let d = ContentDecoder::select(Some("br"), Vec::new());
        assert_eq!(d.encoding(), Encoding::Brotli);
        assert_eq!(Encoding::from_token(Some("x-gzip")), Encoding::Gzip);
        assert_eq!(Encoding::Deflate.to_string(), "deflate");
    }
}
