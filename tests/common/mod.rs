#![allow(dead_code)]

use std::path::PathBuf;

use ome_xml_model::model::{Entity, Key, ParseOptions};
use ome_xml_model::{from_ome_xml_str, read_ome_xml, ParsedDocument};

pub const OME_NS: &str = "http://www.openmicroscopy.org/Schemas/OME/2010-04";
pub const SA_NS: &str = "http://www.openmicroscopy.org/Schemas/SA/2010-04";
pub const ROI_NS: &str = "http://www.openmicroscopy.org/Schemas/ROI/2010-04";

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn parse_fixture(name: &str) -> ParsedDocument {
    read_ome_xml(&fixture(name), &ParseOptions::default()).expect("fixture should parse")
}

/// Wraps `body` in an `OME` root declaring the OME, SA and ROI namespaces.
pub fn ome_document(body: &str) -> String {
    format!(
        r#"<OME xmlns="{OME_NS}" xmlns:SA="{SA_NS}" xmlns:ROI="{ROI_NS}">{body}</OME>"#
    )
}

pub fn parse_body(body: &str) -> ParsedDocument {
    from_ome_xml_str(&ome_document(body), &ParseOptions::default()).expect("document should parse")
}

pub fn key<T: Entity>(document: &ParsedDocument, id: &str) -> Key<T> {
    document
        .lookup::<T>(id)
        .unwrap_or_else(|| panic!("no {} with ID {id}", T::TYPE_NAME))
}
