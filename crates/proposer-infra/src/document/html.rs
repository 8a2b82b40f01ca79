//! HTML proposal rendering with handlebars.
//!
//! The built-in template ships inside the binary; `[document] template` in
//! `config.toml` replaces it. Engineer photos are referenced by their path
//! relative to the content directory.

use std::path::Path;

use chrono::Utc;
use handlebars::Handlebars;
use proposer_core::document::DocumentAssembler;
use proposer_types::document::{CollectedProposal, RenderedDocument};
use proposer_types::error::AssemblyError;
use serde_json::json;

const TEMPLATE_NAME: &str = "proposal";
const BUILTIN_TEMPLATE: &str = include_str!("../../templates/proposal.hbs");

/// Renders collected proposals to standalone HTML documents.
pub struct HtmlDocumentAssembler {
    handlebars: Handlebars<'static>,
}

impl HtmlDocumentAssembler {
    /// Assembler using the built-in template.
    pub fn new() -> Result<Self, AssemblyError> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string(TEMPLATE_NAME, BUILTIN_TEMPLATE)
            .map_err(|e| AssemblyError::Template(e.to_string()))?;
        Ok(Self { handlebars })
    }

    /// Assembler using the template at `path`.
    pub fn from_template_file(path: &Path) -> Result<Self, AssemblyError> {
        let source = std::fs::read_to_string(path)?;
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| AssemblyError::Template(format!("{}: {e}", path.display())))?;
        tracing::info!(template = %path.display(), "using custom proposal template");
        Ok(Self { handlebars })
    }

    /// Custom template when configured, the built-in one otherwise.
    pub fn with_override(path: Option<&Path>) -> Result<Self, AssemblyError> {
        match path {
            Some(path) => Self::from_template_file(path),
            None => Self::new(),
        }
    }

    fn render_html(&self, proposal: &CollectedProposal) -> Result<String, AssemblyError> {
        let context = json!({
            "fields": proposal.fields,
            "engineers": proposal.engineers,
            "generated_at": Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        });
        self.handlebars
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| AssemblyError::Render(e.to_string()))
    }
}

impl DocumentAssembler for HtmlDocumentAssembler {
    async fn render(&self, proposal: &CollectedProposal) -> Result<RenderedDocument, AssemblyError> {
        let html = self.render_html(proposal)?;
        Ok(RenderedDocument {
            filename: format!("proposal-{}.html", Utc::now().format("%Y%m%d-%H%M%S")),
            mime_type: "text/html".to_string(),
            bytes: html.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proposer_core::document::sample_proposal;
    use proposer_types::document::ProposalEngineer;
    use proposer_types::engineer::EngineerId;

    use super::*;

    fn html(doc: &RenderedDocument) -> String {
        String::from_utf8(doc.bytes.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_render_sample() {
        let assembler = HtmlDocumentAssembler::new().unwrap();

        let doc = assembler.render(&sample_proposal()).await.unwrap();

        assert_eq!(doc.mime_type, "text/html");
        assert!(doc.filename.starts_with("proposal-"));
        assert!(doc.filename.ends_with(".html"));
        let body = html(&doc);
        assert!(body.contains("Customer portal rebuild"));
        assert!(body.contains("Alex Morgan"));
        assert!(body.contains("USD 60/h"));
    }

    #[tokio::test]
    async fn test_render_escapes_and_references_photo() {
        let assembler = HtmlDocumentAssembler::new().unwrap();
        let proposal = CollectedProposal {
            fields: BTreeMap::from([("title".to_string(), "R&D <pilot>".to_string())]),
            engineers: vec![ProposalEngineer {
                id: EngineerId::new(),
                name: "Ada".to_string(),
                details: BTreeMap::from([(
                    "photo".to_string(),
                    "engineers_photo/a.jpg".to_string(),
                )]),
                rate: None,
            }],
        };

        let body = html(&assembler.render(&proposal).await.unwrap());

        assert!(body.contains("R&amp;D &lt;pilot&gt;"));
        assert!(body.contains("engineers_photo/a.jpg"));
        assert!(body.contains("on request"));
    }

    #[tokio::test]
    async fn test_custom_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.hbs");
        std::fs::write(&path, "{{fields.title}}|{{#each engineers}}{{name}}={{rate}};{{/each}}")
            .unwrap();

        let assembler = HtmlDocumentAssembler::with_override(Some(&path)).unwrap();
        let body = html(&assembler.render(&sample_proposal()).await.unwrap());

        assert_eq!(body, "Customer portal rebuild|Alex Morgan=USD 60/h;Sam Lee=USD 45/h;");
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.hbs");
        std::fs::write(&path, "{{#if fields.title}}unclosed").unwrap();

        assert!(matches!(
            HtmlDocumentAssembler::from_template_file(&path),
            Err(AssemblyError::Template(_))
        ));
    }

    #[test]
    fn test_missing_template_is_io_error() {
        assert!(matches!(
            HtmlDocumentAssembler::from_template_file(Path::new("/no/such/template.hbs")),
            Err(AssemblyError::Io(_))
        ));
    }
}
