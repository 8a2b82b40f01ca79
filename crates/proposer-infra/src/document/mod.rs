//! Document rendering adapters.

pub mod html;

pub use html::HtmlDocumentAssembler;
