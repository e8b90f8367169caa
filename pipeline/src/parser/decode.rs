//! Streaming transcoding of the source bytes to UTF-8.

use encoding_rs::{CoderResult, Decoder, Encoding};
use std::io::{self, Read};

const BUFFER_SIZE: usize = 8 * 1024;

/// Wraps a byte reader and yields UTF-8, decoding with `encoding_rs`.
///
/// A leading BOM is removed. Invalid sequences become U+FFFD.
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    input: Vec<u8>,
    input_start: usize,
    input_end: usize,
    output: Vec<u8>,
    output_start: usize,
    output_end: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder(),
            input: vec![0; BUFFER_SIZE],
            input_start: 0,
            input_end: 0,
            output: vec![0; BUFFER_SIZE],
            output_start: 0,
            output_end: 0,
            eof: false,
            finished: false,
        }
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.output_start < self.output_end {
                let n = buf.len().min(self.output_end - self.output_start);
                buf[..n].copy_from_slice(&self.output[self.output_start..self.output_start + n]);
                self.output_start += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }

            if self.input_start == self.input_end && !self.eof {
                let n = self.inner.read(&mut self.input)?;
                self.input_start = 0;
                self.input_end = n;
                self.eof = n == 0;
            }

            let (result, read, written, _) = self.decoder.decode_to_utf8(
                &self.input[self.input_start..self.input_end],
                &mut self.output,
                self.eof,
            );
            self.input_start += read;
            self.output_start = 0;
            self.output_end = written;

            // The decoder must not be fed again once the last call drained it.
            if self.eof && matches!(result, CoderResult::InputEmpty) {
                self.finished = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out one byte per read call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    fn decode_all<R: Read>(reader: R, encoding: &'static Encoding) -> String {
        let mut out = String::new();
        DecodingReader::new(reader, encoding).read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_utf8_split_across_reads() {
        let text = "\u{feff}LEI,Entity.LegalName\nX1,Société Générale ÄÖ €";
        let decoded = decode_all(Trickle(text.as_bytes()), encoding_rs::UTF_8);
        assert_eq!(decoded, "LEI,Entity.LegalName\nX1,Société Générale ÄÖ €");
    }

    #[test]
    fn test_windows_1252_larger_than_buffer() {
        let mut bytes = Vec::new();
        for _ in 0..3000 {
            bytes.extend_from_slice(&[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9, b'\n']);
        }
        let decoded = decode_all(&bytes[..], encoding_rs::WINDOWS_1252);
        assert_eq!(decoded.lines().count(), 3000);
        assert!(decoded.lines().all(|l| l == "Société"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode_all(&b""[..], encoding_rs::UTF_8), "");
    }
}
