//! Reading and writing whole OME-XML documents.
//!
//! Reading runs the parse pass over the `OME` root and then a single link
//! pass, so the returned model is fully cross-linked. Writing emits the
//! model in schema order with an XML declaration.

use std::fs;
use std::path::Path;

use roxmltree::Document;

use crate::dom::Element;
use crate::error::OmeError;
use crate::model::{
    resolve_all, Entity, Key, Model, ParseContext, ParseOptions, ParseReport, ReferenceQueue,
    Registry,
};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// A parsed and linked document together with its parse-time state.
#[derive(Debug)]
pub struct ParsedDocument {
    pub model: Model,
    /// Tolerated problems found while parsing.
    pub report: ParseReport,
    /// Every reference seen, each in its final state.
    pub queue: ReferenceQueue,
    pub registry: Registry,
}

impl ParsedDocument {
    /// Looks up an object by ID, checking its type.
    pub fn lookup<T: Entity>(&self, id: &str) -> Option<Key<T>> {
        self.model.lookup(&self.registry, id)
    }
}

/// Parses an OME-XML document from a string.
pub fn from_ome_xml_str(xml: &str, options: &ParseOptions) -> Result<ParsedDocument, OmeError> {
    parse_document_str(xml, Path::new("<string>"), options)
}

/// Parses an OME-XML document from raw bytes, which must be UTF-8.
pub fn from_ome_xml_slice(
    bytes: &[u8],
    options: &ParseOptions,
) -> Result<ParsedDocument, OmeError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| OmeError::XmlParse {
        path: "<bytes>".into(),
        message: source.to_string(),
    })?;
    from_ome_xml_str(xml, options)
}

/// Reads and parses an OME-XML file.
pub fn read_ome_xml(path: &Path, options: &ParseOptions) -> Result<ParsedDocument, OmeError> {
    let xml = fs::read_to_string(path).map_err(OmeError::Io)?;
    parse_document_str(&xml, path, options)
}

/// Serializes the model as an OME-XML document.
pub fn to_ome_xml_string(model: &Model) -> Result<String, OmeError> {
    let body = model.document_element().to_xml_string()?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

/// Writes the model to `path`, creating parent directories as needed.
pub fn write_ome_xml(path: &Path, model: &Model) -> Result<(), OmeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(OmeError::Io)?;
    }
    let xml = to_ome_xml_string(model)?;
    fs::write(path, xml).map_err(OmeError::Io)
}

/// Fuzz-only entrypoint: runs the parse pass without linking, so inputs
/// with unresolvable references still reach every `update`.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_unlinked(bytes: &[u8], options: &ParseOptions) -> Result<(), OmeError> {
    let Ok(xml) = std::str::from_utf8(bytes) else {
        return Ok(());
    };
    let root = Element::from_xml_str(xml)?;
    let mut model = Model::new();
    let mut ctx = ParseContext::new(*options);
    model.parse_document(&root, &mut ctx)?;
    let _ = model.document_element();
    Ok(())
}

fn parse_document_str(
    xml: &str,
    path: &Path,
    options: &ParseOptions,
) -> Result<ParsedDocument, OmeError> {
    let document = Document::parse(xml).map_err(|source| OmeError::XmlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    let root = Element::from_node(document.root_element());

    let mut model = Model::new();
    let mut ctx = ParseContext::new(*options);
    model.parse_document(&root, &mut ctx)?;
    let resolved = resolve_all(&mut model, &mut ctx.queue, &ctx.registry)?;
    tracing::debug!(path = %path.display(), resolved, "document linked");

    Ok(ParsedDocument {
        model,
        report: ctx.report,
        queue: ctx.queue,
        registry: ctx.registry,
    })
}
