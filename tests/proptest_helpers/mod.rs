#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A small synthetic document: `datasets` datasets and one image per entry
/// of `image_links`, each image linking the listed datasets (by index,
/// duplicates allowed) and every annotation index in its second list.
#[derive(Clone, Debug)]
pub struct GraphSpec {
    pub datasets: usize,
    pub annotations: usize,
    pub images: Vec<(Vec<usize>, Vec<usize>)>,
}

impl GraphSpec {
    pub fn to_xml(&self) -> String {
        let mut body = String::new();
        for d in 0..self.datasets {
            body.push_str(&format!(r#"<Dataset ID="Dataset:{d}"/>"#));
        }
        for (i, (datasets, annotations)) in self.images.iter().enumerate() {
            body.push_str(&format!(r#"<Image ID="Image:{i}">"#));
            for d in datasets {
                body.push_str(&format!(r#"<DatasetRef ID="Dataset:{d}"/>"#));
            }
            for a in annotations {
                body.push_str(&format!(r#"<SA:AnnotationRef ID="Annotation:{a}"/>"#));
            }
            body.push_str("</Image>");
        }
        if self.annotations > 0 {
            body.push_str("<SA:StructuredAnnotations>");
            for a in 0..self.annotations {
                body.push_str(&format!(
                    r#"<SA:LongAnnotation ID="Annotation:{a}"><SA:Value>{a}</SA:Value></SA:LongAnnotation>"#
                ));
            }
            body.push_str("</SA:StructuredAnnotations>");
        }
        crate::common::ome_document(&body)
    }
}

pub fn arb_graph() -> impl Strategy<Value = GraphSpec> {
    (1usize..5, 1usize..4).prop_flat_map(|(datasets, annotations)| {
        let links = (
            prop::collection::vec(0..datasets, 0..6),
            prop::collection::vec(0..annotations, 0..4),
        );
        prop::collection::vec(links, 1..6).prop_map(move |images| GraphSpec {
            datasets,
            annotations,
            images,
        })
    })
}

/// `items` with later repeats removed, first occurrence order kept.
pub fn dedup_in_order(items: &[usize]) -> Vec<usize> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(item) {
            seen.push(*item);
        }
    }
    seen
}
