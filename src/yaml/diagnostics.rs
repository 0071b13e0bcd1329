//! YAML error types with source spans for miette

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// A YAML syntax or shape error pointing into the offending file
#[derive(Debug, Error, Diagnostic)]
#[error("Invalid YAML in {filename}: {message}")]
#[diagnostic(code(qcm::yaml::syntax), help("check indentation and quoting near the marked line"))]
pub struct YamlSyntaxError {
    pub filename: String,
    pub message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: Option<SourceSpan>,
}

impl YamlSyntaxError {
    pub fn from_serde_error(err: &serde_yml::Error, content: &str, filename: &str) -> Self {
        let span = err.location().map(|loc| {
            let offset = loc.index().min(content.len());
            let len = usize::from(offset < content.len());
            SourceSpan::from((offset, len))
        });
        Self {
            filename: filename.to_string(),
            message: err.to_string(),
            src: NamedSource::new(filename, content.to_string()),
            span,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("IO error: {0}")]
    #[diagnostic(code(qcm::yaml::io))]
    Io(#[from] std::io::Error),
}
