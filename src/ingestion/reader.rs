//! Encoded line reading.
//!
//! Lines end at `\n`, `\r\n` or a lone `\r`. A trailing line without a terminator is still a line.
//! Bytes that are invalid in the chosen encoding decode to U+FFFD; only real I/O errors surface.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::OpenError;

/// Supported text encodings for input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    /// 7-bit US-ASCII; any byte above `0x7F` decodes to U+FFFD.
    Ascii,
}

impl TextEncoding {
    /// Resolve an encoding label (case-insensitive, common aliases accepted).
    pub fn for_label(label: &str) -> Result<Self, OpenError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859_1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            _ => Err(OpenError::UnsupportedEncoding(label.to_string())),
        }
    }

    fn decode(self, bytes: Vec<u8>) -> String {
        match self {
            Self::Utf8 => String::from_utf8(bytes)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
            Self::Latin1 => bytes.into_iter().map(char::from).collect(),
            Self::Ascii => bytes
                .into_iter()
                .map(|b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        }
    }
}

/// Reads decoded lines from a byte stream.
pub struct LineReader<R> {
    inner: R,
    encoding: TextEncoding,
    skip_lf: bool,
}

impl LineReader<BufReader<File>> {
    /// Open `path` for reading with the given encoding label.
    pub fn open(path: &Path, encoding: &str) -> Result<Self, OpenError> {
        let encoding = TextEncoding::for_label(encoding)?;
        let file = File::open(path).map_err(|source| OpenError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), encoding))
    }
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, encoding: TextEncoding) -> Self {
        Self {
            inner,
            encoding,
            skip_lf: false,
        }
    }

    /// Next line without its terminator, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        match self.read_raw_line()? {
            Some(bytes) => Ok(Some(self.encoding.decode(bytes))),
            None => Ok(None),
        }
    }

    fn read_raw_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let mut started = false;
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(started.then_some(line));
            }
            if self.skip_lf {
                self.skip_lf = false;
                if buf[0] == b'\n' {
                    self.inner.consume(1);
                    continue;
                }
            }
            started = true;
            match buf.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    line.extend_from_slice(&buf[..i]);
                    self.skip_lf = buf[i] == b'\r';
                    self.inner.consume(i + 1);
                    return Ok(Some(line));
                }
                None => {
                    let n = buf.len();
                    line.extend_from_slice(buf);
                    self.inner.consume(n);
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[u8], encoding: TextEncoding) -> Vec<String> {
        LineReader::new(input, encoding).collect::<io::Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn splits_on_all_terminators() {
        assert_eq!(lines(b"a\nb\r\nc\rd", TextEncoding::Utf8), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn trailing_terminator_adds_no_line_but_blank_lines_count() {
        assert_eq!(lines(b"a\n\nb\n", TextEncoding::Utf8), vec!["a", "", "b"]);
        assert!(lines(b"", TextEncoding::Utf8).is_empty());
        assert_eq!(lines(b"\r\n", TextEncoding::Utf8), vec![""]);
    }

    #[test]
    fn crlf_split_across_buffer_boundary() {
        let input: &[u8] = b"a\r\nb";
        let reader = BufReader::with_capacity(2, input);
        let out: Vec<String> = LineReader::new(reader, TextEncoding::Utf8)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn decodes_latin1() {
        assert_eq!(lines(b"caf\xe9", TextEncoding::Latin1), vec!["café"]);
    }

    #[test]
    fn invalid_bytes_decode_to_replacement_and_reading_continues() {
        assert_eq!(lines(b"caf\xe9\nok", TextEncoding::Utf8), vec!["caf\u{FFFD}", "ok"]);
        assert_eq!(lines(b"caf\xe9\nok", TextEncoding::Ascii), vec!["caf\u{FFFD}", "ok"]);
    }

    #[test]
    fn resolves_labels() {
        assert_eq!(TextEncoding::for_label("UTF-8").unwrap(), TextEncoding::Utf8);
        assert_eq!(TextEncoding::for_label("Latin1").unwrap(), TextEncoding::Latin1);
        assert_eq!(TextEncoding::for_label("US-ASCII").unwrap(), TextEncoding::Ascii);
        assert!(matches!(
            TextEncoding::for_label("EBCDIC"),
            Err(OpenError::UnsupportedEncoding(label)) if label == "EBCDIC"
        ));
    }
}
