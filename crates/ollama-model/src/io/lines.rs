use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A reader for newline-delimited records (NDJSON) from a chunk stream.
///
/// Blank lines are skipped. The last record is returned even if the
/// stream ends without a trailing newline.
pub struct Lines {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Lines {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            while let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
                let line = self.buf.drain(..=idx).collect::<Vec<_>>();
                if let Some(line) = decode_line(&line)? {
                    return Ok(Some(line));
                }
            }

            if self.exhausted {
                let rest = std::mem::take(&mut self.buf);
                return decode_line(&rest);
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }
}

fn decode_line(bytes: &[u8]) -> Result<Option<String>, Error> {
    let Ok(line) = str::from_utf8(bytes) else {
        return Err(Error::InvalidPayload);
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(line.to_owned()))
}
