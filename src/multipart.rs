//! Minimal `multipart/form-data` body parser.
//!
//! Splits a fully-read body at its boundary, separating plain form
//! fields from file parts. File parts keep the submitted filename and
//! expose their content through a reader so callers can stream it out.

use std::io::{Cursor, Read};

/// One uploaded file extracted from a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    /// Form field name.
    pub name: String,
    /// Filename as submitted by the client.
    pub filename: String,
    /// Part Content-Type, if the client sent one.
    pub content_type: Option<String>,
    data: Vec<u8>,
}

impl FilePart {
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reader over the part content.
    #[must_use]
    pub fn reader(&self) -> impl Read + '_ {
        Cursor::new(self.data.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Errors raised while parsing a multipart body.
#[derive(Debug)]
pub enum MultipartError {
    /// No boundary parameter in the Content-Type header.
    MissingBoundary,
    /// A part had no Content-Disposition header.
    MissingContentDisposition,
    /// A part's header block could not be parsed.
    InvalidPartHeaders { detail: String },
    /// Body ended before the closing boundary.
    UnexpectedEof,
}

impl std::fmt::Display for MultipartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBoundary => write!(f, "missing boundary in multipart Content-Type"),
            Self::MissingContentDisposition => {
                write!(f, "missing Content-Disposition header in part")
            }
            Self::InvalidPartHeaders { detail } => write!(f, "invalid part headers: {detail}"),
            Self::UnexpectedEof => write!(f, "unexpected end of multipart body"),
        }
    }
}

impl std::error::Error for MultipartError {}

/// Extract the boundary parameter from a multipart Content-Type value.
#[must_use]
pub fn parse_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse a Content-Disposition parameter such as `name="field"`.
fn disposition_param<'a>(disposition: &'a str, key: &str) -> Option<&'a str> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix(key)?.strip_prefix('='))
        .map(|v| v.trim_matches('"'))
}

/// Parse a multipart body into `(form fields, file parts)`.
///
/// Text parts (no filename) become form fields; parts with a filename
/// become [`FilePart`]s. Part ordering is preserved in both lists.
pub fn parse_multipart(
    body: &[u8],
    boundary: &str,
) -> Result<(Vec<(String, String)>, Vec<FilePart>), MultipartError> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut fields = Vec::new();
    let mut files = Vec::new();

    let mut rest = body;
    // Skip any preamble before the first boundary.
    let first = find_subsequence(rest, delimiter).ok_or(MultipartError::UnexpectedEof)?;
    rest = &rest[first + delimiter.len()..];

    loop {
        if rest.starts_with(b"--") {
            break; // closing boundary
        }
        let rest_after_crlf = rest.strip_prefix(b"\r\n").unwrap_or(rest);

        let end = find_subsequence(rest_after_crlf, delimiter)
            .ok_or(MultipartError::UnexpectedEof)?;
        let segment = &rest_after_crlf[..end];
        rest = &rest_after_crlf[end + delimiter.len()..];

        // Trailing CRLF before the boundary belongs to the delimiter.
        let segment = segment.strip_suffix(b"\r\n").unwrap_or(segment);

        let header_end = find_subsequence(segment, b"\r\n\r\n")
            .ok_or(MultipartError::MissingContentDisposition)?;
        let header_block = &segment[..header_end];
        let content = &segment[header_end + 4..];

        let header_text = std::str::from_utf8(header_block).map_err(|e| {
            MultipartError::InvalidPartHeaders {
                detail: e.to_string(),
            }
        })?;

        let mut disposition = None;
        let mut content_type = None;
        for line in header_text.split("\r\n") {
            let mut halves = line.splitn(2, ':');
            let name = halves.next().unwrap_or("").trim();
            let value = halves.next().unwrap_or("").trim();
            if name.eq_ignore_ascii_case("Content-Disposition") {
                disposition = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("Content-Type") {
                content_type = Some(value.to_string());
            }
        }

        let disposition = disposition.ok_or(MultipartError::MissingContentDisposition)?;
        let name = disposition_param(&disposition, "name")
            .ok_or_else(|| MultipartError::InvalidPartHeaders {
                detail: "Content-Disposition without a name parameter".to_string(),
            })?
            .to_string();

        match disposition_param(&disposition, "filename") {
            Some(filename) => files.push(FilePart {
                name,
                filename: filename.to_string(),
                content_type,
                data: content.to_vec(),
            }),
            None => fields.push((name, String::from_utf8_lossy(content).into_owned())),
        }
    }

    Ok((fields, files))
}
