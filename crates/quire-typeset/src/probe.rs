//! Remote image dimensions.

use std::io::Read;
use std::time::Duration;

use quire_renderer::{AwaitError, AwaitFuture, ImageProbe};
use ureq::Agent;

use crate::consts::IMAGE_HEADER_LEN;
use crate::error::TypesetError;
use crate::kroki::create_agent;

/// Image probe that downloads the head of a remote image and reads its size.
///
/// The awaited value is `{"width":W,"height":H}`, or `null` when the format
/// is not recognised. Transport errors fail the await.
#[derive(Debug, Clone)]
pub struct RemoteImageProbe {
    agent: Agent,
}

impl RemoteImageProbe {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
        }
    }

    fn fetch_head(agent: &Agent, url: &str) -> Result<Vec<u8>, TypesetError> {
        let response = agent
            .get(url)
            .call()
            .map_err(|e| TypesetError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(TypesetError::Http(format!("HTTP {status} for {url}")));
        }

        let mut head = Vec::new();
        response
            .into_body()
            .into_reader()
            .take(IMAGE_HEADER_LEN)
            .read_to_end(&mut head)?;
        Ok(head)
    }
}

impl ImageProbe for RemoteImageProbe {
    fn measure(&self, url: String) -> AwaitFuture {
        let agent = self.agent.clone();
        Box::pin(async move {
            let head = tokio::task::spawn_blocking(move || Self::fetch_head(&agent, &url))
                .await
                .map_err(|e| TypesetError::Task(e.to_string()))??;
            Ok::<_, AwaitError>(size_json(&head))
        })
    }
}

/// Serialize the dimensions found in `head` as script code.
fn size_json(head: &[u8]) -> String {
    match image_dimensions(head) {
        Some((width, height)) => format!(r#"{{"width":{width},"height":{height}}}"#),
        None => "null".to_owned(),
    }
}

/// Read width and height from a PNG or GIF header.
///
/// PNG: 8-byte signature, then the IHDR chunk with big-endian width/height at bytes 16-24.
/// GIF: `GIF87a`/`GIF89a`, then little-endian width/height at bytes 6-10.
pub(crate) fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() >= 24 && data.starts_with(b"\x89PNG\r\n\x1a\n") {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((width, height));
    }
    if data.len() >= 10 && (data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a")) {
        let width = u16::from_le_bytes([data[6], data[7]]);
        let height = u16::from_le_bytes([data[8], data[9]]);
        return Some((u32::from(width), u32::from(height)));
    }
    None
}
