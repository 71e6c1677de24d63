//! Request path parsing.
//!
//! Paths look like `/<width>x<height>/[jpg/]<origin-url><ext>`, e.g.
//! `/300x0/https://images.example.com/cat.png` or
//! `/120x120/jpg/http://images.example.com/logo.png`. A zero dimension is
//! derived from the other one, preserving the aspect ratio of the original.

use crate::error::{Error, Result};
use crate::format::OutputFormat;
use regex::Regex;
use std::sync::LazyLock;

static PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([0-9]+)x([0-9]+)(/jpg)?/(https?://[\w/.\-:~% ]+?)(\.\w+)$")
        .expect("request path pattern is valid")
});

/// A parsed resize request. One per inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    /// Target width; 0 derives it from `height`.
    pub width: u32,
    /// Target height; 0 derives it from `width`.
    pub height: u32,
    /// Origin URL, including its extension.
    pub origin_url: String,
    /// Origin extension with the leading dot, as written in the path.
    pub extension: String,
    /// Set by the `/jpg/` marker: re-encode regardless of the origin format.
    pub format_override: Option<OutputFormat>,
    /// Full request path; identity of the resized variant.
    pub path: String,
}

impl ResizeRequest {
    /// Extension used for the resized tier and the response content type.
    pub fn effective_extension(&self) -> &str {
        match self.format_override {
            Some(format) => format.extension(),
            None => &self.extension,
        }
    }

    /// Format the resized variant is encoded in.
    pub fn output_format(&self) -> OutputFormat {
        self.format_override
            .or_else(|| OutputFormat::from_extension(&self.extension))
            .unwrap_or(OutputFormat::Jpeg)
    }
}

/// Parse a request path into a [`ResizeRequest`].
///
/// Does not check that the origin is reachable.
pub fn parse_request(path: &str) -> Result<ResizeRequest> {
    let caps = PATH_PATTERN
        .captures(path)
        .ok_or_else(|| Error::malformed(format!("path does not match: {}", path)))?;

    let width: u32 = caps[1]
        .parse()
        .map_err(|_| Error::malformed(format!("could not parse width: {}", &caps[1])))?;
    let height: u32 = caps[2]
        .parse()
        .map_err(|_| Error::malformed(format!("could not parse height: {}", &caps[2])))?;

    if width == 0 && height == 0 {
        return Err(Error::malformed("width and height cannot both be 0"));
    }

    let extension = caps[5].to_string();
    if OutputFormat::from_extension(&extension).is_none() {
        return Err(Error::malformed(format!(
            "unrecognized extension: {}",
            extension
        )));
    }

    let format_override = caps.get(3).map(|_| OutputFormat::Jpeg);

    Ok(ResizeRequest {
        width,
        height,
        origin_url: format!("{}{}", &caps[4], extension),
        extension,
        format_override,
        path: path.to_string(),
    })
}
