//! Diagram figures via the Kroki service.
//!
//! Each fence is posted as `text/plain` to `{server}/{endpoint}/svg` and the
//! response body becomes the figure.

use std::time::Duration;

use quire_renderer::{Figure, TypesetFailure, Typesetter};
use ureq::Agent;

use crate::error::TypesetError;
use crate::language::DiagramLanguage;

/// Create an HTTP agent with the specified timeout.
///
/// Status codes are not turned into errors so that Kroki's error body can be
/// reported.
#[must_use]
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Typesetter for diagram languages rendered by a Kroki server.
#[derive(Debug, Clone)]
pub struct KrokiTypesetter {
    agent: Agent,
    server_url: String,
}

impl KrokiTypesetter {
    /// Create a typesetter for the server at `server_url` (e.g. `https://kroki.io`).
    #[must_use]
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
            server_url: server_url.trim_end_matches('/').to_owned(),
        }
    }

    fn endpoint_url(&self, language: DiagramLanguage) -> String {
        format!("{}/{}/svg", self.server_url, language.kroki_endpoint())
    }

    /// Render `source` to SVG.
    ///
    /// # Errors
    ///
    /// Returns [`TypesetError::Http`] on transport failure or an error status,
    /// with Kroki's error body in the message.
    pub fn render(&self, language: DiagramLanguage, source: &str) -> Result<Vec<u8>, TypesetError> {
        let url = self.endpoint_url(language);

        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain")
            .send(source.as_bytes())
            .map_err(|e| TypesetError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(TypesetError::Http(format!("HTTP {status}: {error_body}")));
        }

        let bytes = body
            .read_to_vec()
            .map_err(|e| TypesetError::Http(e.to_string()))?;
        tracing::debug!(url, bytes = bytes.len(), "rendered diagram");
        Ok(bytes)
    }
}

impl Typesetter for KrokiTypesetter {
    fn supports(&self, lang: &str) -> bool {
        DiagramLanguage::parse(lang).is_some()
    }

    fn typeset(&self, lang: &str, source: &str) -> Result<Figure, TypesetFailure> {
        let language =
            DiagramLanguage::parse(lang).ok_or_else(|| TypesetError::Unsupported(lang.to_owned()))?;
        Ok(Figure {
            bytes: self.render(language, source)?,
            ext: ".svg".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::consts::DEFAULT_TIMEOUT;

    #[test]
    fn test_endpoint_url_trims_slash() {
        let kroki = KrokiTypesetter::new("https://kroki.io/", DEFAULT_TIMEOUT);
        assert_eq!(
            kroki.endpoint_url(DiagramLanguage::Mermaid),
            "https://kroki.io/mermaid/svg"
        );
    }

    #[test]
    fn test_supports_diagram_languages_only() {
        let kroki = KrokiTypesetter::new("https://kroki.io", DEFAULT_TIMEOUT);
        assert!(kroki.supports("plantuml"));
        assert!(kroki.supports("kroki-d2"));
        assert!(!kroki.supports("typst"));
    }

    #[test]
    fn test_unsupported_language_is_rejected_without_request() {
        let kroki = KrokiTypesetter::new("http://127.0.0.1:9", DEFAULT_TIMEOUT);
        let err = kroki.typeset("rust", "fn main() {}").unwrap_err();
        assert_eq!(err.to_string(), "unsupported language: rust");
    }

    #[test]
    fn test_unreachable_server_is_http_error() {
        let kroki = KrokiTypesetter::new("http://127.0.0.1:9", Duration::from_secs(2));
        let err = kroki
            .render(DiagramLanguage::GraphViz, "digraph { a -> b }")
            .unwrap_err();
        assert!(matches!(err, TypesetError::Http(_)));
    }
}
