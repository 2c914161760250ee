//! Document inspection.
//!
//! Summarizes a parsed document: how many objects of each type it holds,
//! how many references of each kind were seen, and how much of the graph
//! is annotated.

mod report;

pub use report::{InspectReport, SummarySection, TypeCount};

use std::collections::{BTreeMap, HashSet};

use crate::io::ParsedDocument;
use crate::model::{Annotation, DescriptorState, ObjectRef};

/// Options for document inspection.
#[derive(Clone, Debug)]
pub struct InspectOptions {
    /// Width of histogram bars (in characters).
    pub bar_width: usize,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self { bar_width: 20 }
    }
}

/// Inspect a parsed document and produce a report.
pub fn inspect_document(document: &ParsedDocument, opts: &InspectOptions) -> InspectReport {
    InspectReport {
        summary: compute_summary(document),
        objects: compute_objects(document),
        references: compute_references(document),
        bar_width: opts.bar_width,
    }
}

fn compute_summary(document: &ParsedDocument) -> SummarySection {
    let model = &document.model;
    let annotated: HashSet<ObjectRef> = model
        .iter::<Annotation>()
        .flat_map(|(_, annotation)| annotation.annotated_by().iter())
        .collect();

    SummarySection {
        objects: model.object_counts().iter().map(|(_, count)| count).sum(),
        registered_ids: document.registry.len(),
        references: document.queue.len(),
        resolved: document
            .queue
            .iter()
            .filter(|d| d.state == DescriptorState::Resolved)
            .count(),
        annotations: model.count::<Annotation>(),
        annotated_objects: annotated.len(),
        warnings: document.report.warning_count(),
    }
}

/// Object counts per type, largest first; empty types are left out.
fn compute_objects(document: &ParsedDocument) -> Vec<TypeCount> {
    let counts = document
        .model
        .object_counts()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| TypeCount {
            name: name.to_string(),
            count,
        })
        .collect();
    sorted(counts)
}

fn compute_references(document: &ParsedDocument) -> Vec<TypeCount> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for descriptor in document.queue.iter() {
        *counts.entry(descriptor.kind.tag()).or_insert(0) += 1;
    }
    let counts = counts
        .into_iter()
        .map(|(name, count)| TypeCount {
            name: name.to_string(),
            count,
        })
        .collect();
    sorted(counts)
}

// Count descending, then name ascending for deterministic output.
fn sorted(mut counts: Vec<TypeCount>) -> Vec<TypeCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts
}
