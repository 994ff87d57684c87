//! Diagram languages typeset through Kroki.

/// Supported diagram languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramLanguage {
    PlantUml,
    Mermaid,
    GraphViz,
    D2,
}

impl DiagramLanguage {
    /// Parse language from a code fence tag.
    ///
    /// Accepts `kroki-` prefixed names (`kroki-mermaid`) as well.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lang = s.strip_prefix("kroki-").unwrap_or(s);

        match lang {
            "plantuml" | "puml" => Some(Self::PlantUml),
            "mermaid" => Some(Self::Mermaid),
            "graphviz" | "dot" => Some(Self::GraphViz),
            "d2" => Some(Self::D2),
            _ => None,
        }
    }

    /// Kroki endpoint name for this diagram type.
    #[must_use]
    pub fn kroki_endpoint(self) -> &'static str {
        match self {
            Self::PlantUml => "plantuml",
            Self::Mermaid => "mermaid",
            Self::GraphViz => "graphviz",
            Self::D2 => "d2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kroki_endpoints() {
        assert_eq!(DiagramLanguage::PlantUml.kroki_endpoint(), "plantuml");
        assert_eq!(DiagramLanguage::Mermaid.kroki_endpoint(), "mermaid");
        assert_eq!(DiagramLanguage::GraphViz.kroki_endpoint(), "graphviz");
        assert_eq!(DiagramLanguage::D2.kroki_endpoint(), "d2");
    }

    #[test]
    fn test_aliases_and_prefix() {
        let languages = [
            ("plantuml", DiagramLanguage::PlantUml),
            ("puml", DiagramLanguage::PlantUml),
            ("mermaid", DiagramLanguage::Mermaid),
            ("graphviz", DiagramLanguage::GraphViz),
            ("dot", DiagramLanguage::GraphViz),
            ("d2", DiagramLanguage::D2),
        ];

        for (name, expected) in languages {
            assert_eq!(DiagramLanguage::parse(name), Some(expected), "{name}");
            let prefixed = format!("kroki-{name}");
            assert_eq!(DiagramLanguage::parse(&prefixed), Some(expected), "{prefixed}");
        }
    }

    #[test]
    fn test_unknown_language() {
        assert_eq!(DiagramLanguage::parse("typst"), None);
        assert_eq!(DiagramLanguage::parse("kroki-unknown"), None);
        assert_eq!(DiagramLanguage::parse(""), None);
    }
}
