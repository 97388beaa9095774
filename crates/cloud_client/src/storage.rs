//! Blob listing on the Storage data plane.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Method;
use url::form_urlencoded;

use crate::{CloudClient, Result};

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;

/// Service version that accepts bearer tokens.
pub const STORAGE_API_VERSION: &str = "2021-08-06";

static BLOB_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"<Name>([^<]*)</Name>") {
        Ok(regex) => regex,
        Err(err) => panic!("Blob name regex is invalid: {err}"),
    });

static NEXT_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"<NextMarker>([^<]+)</NextMarker>") {
        Ok(regex) => regex,
        Err(err) => panic!("Next marker regex is invalid: {err}"),
    });

static XML_ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);") {
        Ok(regex) => regex,
        Err(err) => panic!("XML entity regex is invalid: {err}"),
    });

#[derive(Debug, Clone)]
pub struct StorageClient {
    client: CloudClient,
}

impl StorageClient {
    /// Wraps a client whose base URL is the account's blob endpoint,
    /// e.g. `https://<account>.blob.core.windows.net`.
    pub fn new(client: CloudClient) -> Self {
        Self {
            client: client.with_header("x-ms-version", STORAGE_API_VERSION),
        }
    }

    /// Names of every blob in `container`.
    pub async fn list_blobs(&self, container: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut path = format!("/{container}?restype=container&comp=list");
            if let Some(marker) = &marker {
                // Markers are opaque and may contain reserved characters.
                path.push_str("&marker=");
                path.extend(form_urlencoded::byte_serialize(marker.as_bytes()));
            }

            let xml = self.client.request_text(Method::GET, &path, None).await?;
            names.extend(parse_blob_names(&xml));

            marker = NEXT_MARKER_REGEX
                .captures(&xml)
                .map(|captures| unescape_xml(&captures[1]));
            if marker.is_none() {
                return Ok(names);
            }
        }
    }
}

fn parse_blob_names(xml: &str) -> Vec<String> {
    BLOB_NAME_REGEX
        .captures_iter(xml)
        .map(|captures| unescape_xml(&captures[1]))
        .collect()
}

/// Resolves the predefined XML entities and numeric character references
/// in a single pass, so `&amp;lt;` becomes `&lt;` and not `<`.
fn unescape_xml(text: &str) -> String {
    XML_ENTITY_REGEX
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let entity = &captures[1];
            let resolved = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse::<u32>()))
                    .and_then(|code| code.ok())
                    .and_then(char::from_u32),
            };
            match resolved {
                Some(c) => c.to_string(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}
