//! Chunked transfer coding
//!
//! The decoder is incremental: it can be fed arbitrary slices of a message
//! body as they arrive on the wire and reports how much it consumed.

use super::parser::{find_crlf, MAX_HEAD_SIZE};
use super::{Error, Result, CRLF};
use std::io::Write;

/// Chunked encoder
///
/// Encodes data in HTTP chunked transfer encoding format
pub struct ChunkedEncoder<W: Write> {
    writer: W,
}

impl<W: Write> ChunkedEncoder<W> {
    /// Create a new chunked encoder
    pub fn new(writer: W) -> Self {
        ChunkedEncoder { writer }
    }

    /// Write a chunk of data; empty chunks are skipped since a zero-size
    /// chunk terminates the body
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        write!(self.writer, "{:x}{}", data.len(), CRLF)?;
        self.writer.write_all(data)?;
        self.writer.write_all(CRLF.as_bytes())?;

        Ok(())
    }

    /// Write the last chunk and the empty trailer section
    pub fn finish(mut self) -> Result<W> {
        write!(self.writer, "0{}{}", CRLF, CRLF)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DecoderState {
    Size,
    Data { remaining: usize },
    DataEnd,
    Trailer,
    Complete,
}

/// Incremental chunked decoder
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: DecoderState,
}

impl ChunkedDecoder {
    /// Create a new chunked decoder
    pub fn new() -> Self {
        ChunkedDecoder {
            state: DecoderState::Size,
        }
    }

    /// Decode as much of `input` as possible, appending payload to `output`
    ///
    /// Returns the number of input bytes consumed and whether the last
    /// chunk and trailer section have been seen. Unconsumed bytes must be
    /// presented again, followed by more data, on the next call.
    pub fn decode(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(usize, bool)> {
        let mut pos = 0;

        loop {
            let rest = &input[pos..];
            match self.state {
                DecoderState::Size => {
                    let Some(eol) = line_end(rest)? else { break };
                    let line = std::str::from_utf8(&rest[..eol])
                        .map_err(|_| Error::InvalidChunkSize("non-UTF-8 size line".to_string()))?;

                    // Chunk extensions after ';' are ignored
                    let size_str = line.split(';').next().unwrap_or_default().trim();
                    let size = usize::from_str_radix(size_str, 16)
                        .map_err(|_| Error::InvalidChunkSize(size_str.to_string()))?;

                    pos += eol + 2;
                    self.state = if size == 0 {
                        DecoderState::Trailer
                    } else {
                        DecoderState::Data { remaining: size }
                    };
                }

                DecoderState::Data { remaining } => {
                    if rest.is_empty() {
                        break;
                    }
                    let n = remaining.min(rest.len());
                    output.extend_from_slice(&rest[..n]);
                    pos += n;
                    self.state = if n == remaining {
                        DecoderState::DataEnd
                    } else {
                        DecoderState::Data {
                            remaining: remaining - n,
                        }
                    };
                }

                DecoderState::DataEnd => {
                    if rest.len() < 2 {
                        break;
                    }
                    if &rest[..2] != CRLF.as_bytes() {
                        return Err(Error::Protocol("Expected CRLF after chunk".to_string()));
                    }
                    pos += 2;
                    self.state = DecoderState::Size;
                }

                DecoderState::Trailer => {
                    // Trailer fields are skipped up to the empty line
                    let Some(eol) = line_end(rest)? else { break };
                    pos += eol + 2;
                    if eol == 0 {
                        self.state = DecoderState::Complete;
                    }
                }

                DecoderState::Complete => break,
            }
        }

        Ok((pos, self.is_complete()))
    }

    /// Check if decoding is complete
    pub fn is_complete(&self) -> bool {
        self.state == DecoderState::Complete
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// End of the size or trailer line at the front of `rest`, if it has arrived
fn line_end(rest: &[u8]) -> Result<Option<usize>> {
    match find_crlf(rest) {
        Some(eol) => Ok(Some(eol)),
        None if rest.len() > MAX_HEAD_SIZE => {
            Err(Error::Protocol("Chunk line too long".to_string()))
        }
        None => Ok(None),
    }
}

/// Decode a complete chunked body
pub fn decode_chunked_body(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ChunkedDecoder::new();
    let mut output = Vec::new();

    let (_, complete) = decoder.decode(input, &mut output)?;
    if !complete {
        return Err(Error::Incomplete);
    }

    Ok(output)
}

/// Encode data as a chunked body using chunks of at most `chunk_size` bytes
pub fn encode_chunked_body(data: &[u8], chunk_size: usize) -> Result<Vec<u8>> {
    let mut encoder = ChunkedEncoder::new(Vec::new());

    for chunk in data.chunks(chunk_size.max(1)) {
        encoder.write_chunk(chunk)?;
    }

    encoder.finish()
}
