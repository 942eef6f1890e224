use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading the `data` of server-sent events from a chunk
/// stream.
///
/// Events may be delimited by either `\n\n` or `\r\n\r\n`, since Google
/// endpoints use the latter. Comments and fields other than `data` are
/// skipped.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // A buffered event is returned before reading any more data.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                // Trailing bytes without an event delimiter are dropped.
                return Ok(None);
            };
            self.buf.extend_from_slice(&bytes);
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // Events without any data line are ignored per the SSE rules, so
        // keep looking until one with data shows up.
        while let Some((end, delimiter_len)) = find_delimiter(&self.buf) {
            let block = self.buf.drain(..end + delimiter_len).collect::<Vec<_>>();
            let Ok(block) = str::from_utf8(&block[..end]) else {
                return Err(Error::InvalidPayload);
            };
            if let Some(data) = parse_data(block) {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }
}

fn find_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|idx| {
        let rest = &buf[idx..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((idx, 4))
        } else if rest.starts_with(b"\n\n") {
            Some((idx, 2))
        } else {
            None
        }
    })
}

fn parse_data(block: &str) -> Option<String> {
    let mut data: Option<String> = None;
    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        if field != "data" {
            continue;
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        let data = data.get_or_insert_default();
        if !data.is_empty() {
            data.push('\n');
        }
        data.push_str(value);
    }
    data
}
