//! Typst figures via the `typst` CLI.

use std::io::Write;
use std::process::{Command, Stdio};

use quire_renderer::{Figure, TypesetFailure, Typesetter};

use crate::consts::TYPST_PREAMBLE;
use crate::error::TypesetError;

/// Compiles `typst` fences to SVG by piping the source through
/// `typst compile --format svg - -`.
#[derive(Debug, Clone)]
pub struct TypstTypesetter {
    program: String,
    languages: Vec<String>,
}

impl TypstTypesetter {
    /// Create a typesetter running `program` for fences tagged with one of `languages`.
    #[must_use]
    pub fn new(program: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            program: program.into(),
            languages,
        }
    }

    /// Compile `source` to SVG.
    ///
    /// # Errors
    ///
    /// Returns [`TypesetError::Spawn`] if the compiler cannot be started and
    /// [`TypesetError::Compile`] if it rejects the source.
    pub fn compile(&self, source: &str) -> Result<Vec<u8>, TypesetError> {
        let spawn_error = |source| TypesetError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(["compile", "--format", "svg", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(TYPST_PREAMBLE.as_bytes())?;
            stdin.write_all(source.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(TypesetError::Compile {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        tracing::debug!(bytes = output.stdout.len(), "compiled typst figure");
        Ok(output.stdout)
    }
}

impl Typesetter for TypstTypesetter {
    fn supports(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }

    fn typeset(&self, lang: &str, source: &str) -> Result<Figure, TypesetFailure> {
        if !self.supports(lang) {
            return Err(TypesetError::Unsupported(lang.to_owned()).into());
        }
        Ok(Figure {
            bytes: self.compile(source)?,
            ext: ".svg".to_owned(),
        })
    }
}
