//! The `OME` document root.

use super::annotation::Annotation;
use super::experiment::{Dataset, Experiment, Experimenter, Group, Project};
use super::image::Image;
use super::instrument::Instrument;
use super::keys::Key;
use super::namespaces::{OME_NS, SA_NS};
use super::object::{append_children, ModelObject};
use super::parse::{parse_composed, single_child, Attrs, ParseContext};
use super::roi::Roi;
use super::spw::{Plate, Screen};
use super::Model;
use crate::dom::{Element, QualifiedAttribute};
use crate::error::OmeError;

/// Top-level content of an OME-XML document.
#[derive(Clone, Debug, Default)]
pub struct Ome {
    pub uuid: Option<String>,
    pub creator: Option<String>,
    /// Namespaced root attributes such as `xsi:schemaLocation`.
    pub qualified_attributes: Vec<QualifiedAttribute>,
    pub projects: Vec<Key<Project>>,
    pub datasets: Vec<Key<Dataset>>,
    pub experiments: Vec<Key<Experiment>>,
    pub plates: Vec<Key<Plate>>,
    pub screens: Vec<Key<Screen>>,
    pub experimenters: Vec<Key<Experimenter>>,
    pub groups: Vec<Key<Group>>,
    pub instruments: Vec<Key<Instrument>>,
    pub images: Vec<Key<Image>>,
    pub structured_annotations: Option<StructuredAnnotations>,
    pub rois: Vec<Key<Roi>>,
}

/// The `StructuredAnnotations` container.
#[derive(Clone, Debug, Default)]
pub struct StructuredAnnotations {
    /// Annotations of every kind, in document order.
    pub annotations: Vec<Key<Annotation>>,
}

impl Model {
    /// Parses an `OME` element into the root, merging with what is already
    /// there. References are queued on `ctx`; run [`resolve_all`]
    /// afterwards.
    ///
    /// [`resolve_all`]: super::resolve_all
    pub fn parse_document(
        &mut self,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        if element.name != "OME" {
            ctx.tag_mismatch("OME", &element.name)?;
        }
        let attrs = Attrs::new(element, "OME");
        attrs.string("UUID", &mut self.root.uuid);
        attrs.string("Creator", &mut self.root.creator);
        if !element.qualified_attributes.is_empty() {
            self.root.qualified_attributes = element.qualified_attributes.clone();
        }

        self.root.projects = self.parse_top_level(ctx, element, &self.root.projects.clone())?;
        self.root.datasets = self.parse_top_level(ctx, element, &self.root.datasets.clone())?;
        self.root.experiments =
            self.parse_top_level(ctx, element, &self.root.experiments.clone())?;
        self.root.plates = self.parse_top_level(ctx, element, &self.root.plates.clone())?;
        self.root.screens = self.parse_top_level(ctx, element, &self.root.screens.clone())?;
        self.root.experimenters =
            self.parse_top_level(ctx, element, &self.root.experimenters.clone())?;
        self.root.groups = self.parse_top_level(ctx, element, &self.root.groups.clone())?;
        self.root.instruments =
            self.parse_top_level(ctx, element, &self.root.instruments.clone())?;
        self.root.images = self.parse_top_level(ctx, element, &self.root.images.clone())?;

        if let Some(container) = single_child(element, "StructuredAnnotations", "OME")? {
            let existing = self
                .root
                .structured_annotations
                .take()
                .unwrap_or_default()
                .annotations;
            let members = container
                .children
                .iter()
                .filter(|child| Annotation::accepts_tag(&child.name));
            let annotations = parse_composed(self, ctx, members, &existing)?;
            self.root.structured_annotations = Some(StructuredAnnotations { annotations });
        }

        self.root.rois = self.parse_top_level(ctx, element, &self.root.rois.clone())?;
        tracing::debug!(
            registered = ctx.registry.len(),
            queued = ctx.queue.len(),
            "document parsed"
        );
        Ok(())
    }

    fn parse_top_level<T: ModelObject>(
        &mut self,
        ctx: &mut ParseContext,
        element: &Element,
        existing: &[Key<T>],
    ) -> Result<Vec<Key<T>>, OmeError> {
        let children = element
            .children
            .iter()
            .filter(|child| T::accepts_tag(&child.name));
        parse_composed(self, ctx, children, existing)
    }

    /// Writes the whole model as an `OME` element.
    pub fn document_element(&self) -> Element {
        let root = &self.root;
        let mut element = Element::with_namespace("OME", OME_NS);
        element.set_optional_attribute("UUID", root.uuid.as_ref());
        element.set_optional_attribute("Creator", root.creator.as_ref());
        element.qualified_attributes = root.qualified_attributes.clone();
        append_children(self, &mut element, &root.projects);
        append_children(self, &mut element, &root.datasets);
        append_children(self, &mut element, &root.experiments);
        append_children(self, &mut element, &root.plates);
        append_children(self, &mut element, &root.screens);
        append_children(self, &mut element, &root.experimenters);
        append_children(self, &mut element, &root.groups);
        append_children(self, &mut element, &root.instruments);
        append_children(self, &mut element, &root.images);
        if let Some(structured) = &root.structured_annotations {
            let mut container = Element::with_namespace("StructuredAnnotations", SA_NS);
            append_children(self, &mut container, &structured.annotations);
            element.append_child(container);
        }
        append_children(self, &mut element, &root.rois);
        element
    }
}
