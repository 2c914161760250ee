//! Fuzz target for OME-XML parsing and linking.
//!
//! Feeds arbitrary bytes through the parse and link passes under both
//! mismatch policies, then through the parse pass alone. Any panic or
//! hang is a bug.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ome_xml_model::io::{from_ome_xml_slice, fuzz_parse_unlinked};
use ome_xml_model::model::ParseOptions;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_ome_xml_slice(data, &ParseOptions::default());
    let _ = from_ome_xml_slice(data, &ParseOptions::strict());
    let _ = fuzz_parse_unlinked(data, &ParseOptions::default());
});
