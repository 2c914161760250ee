//! Fuzz target for the write path.
//!
//! Any document that parses must serialize, and the output must parse
//! again with the same reference count.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ome_xml_model::io::{from_ome_xml_slice, from_ome_xml_str, to_ome_xml_string};
use ome_xml_model::model::ParseOptions;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let options = ParseOptions::default();
    let Ok(document) = from_ome_xml_slice(data, &options) else {
        return;
    };
    let written = to_ome_xml_string(&document.model).expect("parsed model serializes");
    let reparsed = from_ome_xml_str(&written, &options).expect("written document parses");
    assert_eq!(reparsed.queue.len(), document.queue.len());
});
