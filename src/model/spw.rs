//! Screens, plates and wells.

use super::annotation::{link_annotation, Annotation};
use super::image::Image;
use super::keys::{Key, RefList};
use super::lexical::Lexical;
use super::linker::{expect, relate_many, relate_one, unsupported};
use super::namespaces::SPW_NS;
use super::object::{
    append_children, append_ref, append_refs, append_text, new_element, Entity, ModelObject,
    ObjectRef,
};
use super::parse::{child_text, parse_composed, Attrs, ParseContext};
use super::reference::{LinkOp, RefKind};
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

#[derive(Clone, Debug, Default)]
pub struct Plate {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub external_identifier: Option<String>,
    pub column_naming_convention: Option<String>,
    pub row_naming_convention: Option<String>,
    pub well_origin_x: Option<Lexical<f64>>,
    pub well_origin_y: Option<Lexical<f64>>,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub description: Option<String>,
    pub wells: Vec<Key<Well>>,
    pub plate_acquisitions: Vec<Key<PlateAcquisition>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) screens: RefList<Key<Screen>>,
}

impl Plate {
    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    /// Screens listing this plate.
    pub fn screens(&self) -> &RefList<Key<Screen>> {
        &self.screens
    }
}

impl ModelObject for Plate {
    const TAG: &'static str = "Plate";
    const NAMESPACE: &'static str = SPW_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let plate = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Name", &mut plate.name);
        attrs.string("Status", &mut plate.status);
        attrs.string("ExternalIdentifier", &mut plate.external_identifier);
        attrs.string("ColumnNamingConvention", &mut plate.column_naming_convention);
        attrs.string("RowNamingConvention", &mut plate.row_naming_convention);
        attrs.lexical("WellOriginX", &mut plate.well_origin_x)?;
        attrs.lexical("WellOriginY", &mut plate.well_origin_y)?;
        attrs.parse("Rows", &mut plate.rows)?;
        attrs.parse("Columns", &mut plate.columns)?;
        child_text(element, "Description", Self::TYPE_NAME, &mut plate.description)?;
        ctx.enqueue_refs(element, Self::object_ref(key), RefKind::AnnotationRef)?;

        let existing = model[key].wells.clone();
        model[key].wells =
            parse_composed(model, ctx, element.children_by_tag(Well::TAG), &existing)?;
        let existing = model[key].plate_acquisitions.clone();
        model[key].plate_acquisitions = parse_composed(
            model,
            ctx,
            element.children_by_tag(PlateAcquisition::TAG),
            &existing,
        )?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let plate = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", plate.id.as_ref());
        element.set_optional_attribute("Name", plate.name.as_ref());
        element.set_optional_attribute("Status", plate.status.as_ref());
        element.set_optional_attribute("ExternalIdentifier", plate.external_identifier.as_ref());
        element.set_optional_attribute(
            "ColumnNamingConvention",
            plate.column_naming_convention.as_ref(),
        );
        element.set_optional_attribute("RowNamingConvention", plate.row_naming_convention.as_ref());
        element.set_optional_attribute("WellOriginX", plate.well_origin_x.as_ref());
        element.set_optional_attribute("WellOriginY", plate.well_origin_y.as_ref());
        element.set_optional_attribute("Rows", plate.rows.as_ref());
        element.set_optional_attribute("Columns", plate.columns.as_ref());
        append_text(&mut element, "Description", plate.description.as_ref());
        append_children(model, &mut element, &plate.wells);
        append_refs(model, &mut element, RefKind::AnnotationRef, &plate.annotation_links);
        append_children(model, &mut element, &plate.plate_acquisitions);
        element
    }

    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        match kind {
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                Ok(link_annotation(model, key, target, op, |p| &mut p.annotation_links))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Well {
    pub id: Option<String>,
    pub column: Option<u32>,
    pub row: Option<u32>,
    pub external_description: Option<String>,
    pub external_identifier: Option<String>,
    pub color: Option<i32>,
    pub well_samples: Vec<Key<WellSample>>,
    pub(crate) reagent: Option<Key<Reagent>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
}

impl Well {
    pub fn reagent(&self) -> Option<Key<Reagent>> {
        self.reagent
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }
}

impl ModelObject for Well {
    const TAG: &'static str = "Well";
    const NAMESPACE: &'static str = SPW_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let well = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.parse("Column", &mut well.column)?;
        attrs.parse("Row", &mut well.row)?;
        attrs.string("ExternalDescription", &mut well.external_description);
        attrs.string("ExternalIdentifier", &mut well.external_identifier);
        attrs.parse("Color", &mut well.color)?;

        let this = Self::object_ref(key);
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::ReagentRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)?;

        let existing = model[key].well_samples.clone();
        model[key].well_samples =
            parse_composed(model, ctx, element.children_by_tag(WellSample::TAG), &existing)?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let well = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", well.id.as_ref());
        element.set_optional_attribute("Column", well.column.as_ref());
        element.set_optional_attribute("Row", well.row.as_ref());
        element.set_optional_attribute("ExternalDescription", well.external_description.as_ref());
        element.set_optional_attribute("ExternalIdentifier", well.external_identifier.as_ref());
        element.set_optional_attribute("Color", well.color.as_ref());
        append_children(model, &mut element, &well.well_samples);
        append_ref(model, &mut element, RefKind::ReagentRef, well.reagent);
        append_refs(model, &mut element, RefKind::AnnotationRef, &well.annotation_links);
        element
    }

    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        Ok(match kind {
            RefKind::ReagentRef => {
                let target = expect::<Reagent>(model, kind, target)?;
                relate_one(model, key, target, key, op, |w| &mut w.reagent, |r| &mut r.wells)
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |w| &mut w.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct WellSample {
    pub id: Option<String>,
    pub position_x: Option<Lexical<f64>>,
    pub position_y: Option<Lexical<f64>>,
    pub timepoint: Option<String>,
    pub index: Option<u32>,
    pub(crate) image: Option<Key<Image>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) plate_acquisitions: RefList<Key<PlateAcquisition>>,
}

impl WellSample {
    pub fn image(&self) -> Option<Key<Image>> {
        self.image
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    pub fn plate_acquisitions(&self) -> &RefList<Key<PlateAcquisition>> {
        &self.plate_acquisitions
    }
}

impl ModelObject for WellSample {
    const TAG: &'static str = "WellSample";
    const NAMESPACE: &'static str = SPW_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let sample = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.lexical("PositionX", &mut sample.position_x)?;
        attrs.lexical("PositionY", &mut sample.position_y)?;
        attrs.string("Timepoint", &mut sample.timepoint);
        attrs.parse("Index", &mut sample.index)?;

        let this = Self::object_ref(key);
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::ImageRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let sample = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", sample.id.as_ref());
        element.set_optional_attribute("PositionX", sample.position_x.as_ref());
        element.set_optional_attribute("PositionY", sample.position_y.as_ref());
        element.set_optional_attribute("Timepoint", sample.timepoint.as_ref());
        element.set_optional_attribute("Index", sample.index.as_ref());
        append_ref(model, &mut element, RefKind::ImageRef, sample.image);
        append_refs(model, &mut element, RefKind::AnnotationRef, &sample.annotation_links);
        element
    }

    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        Ok(match kind {
            RefKind::ImageRef => {
                let target = expect::<Image>(model, kind, target)?;
                relate_one(model, key, target, key, op, |s| &mut s.image, |i| &mut i.well_samples)
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |s| &mut s.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlateAcquisition {
    pub id: Option<String>,
    pub name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub maximum_field_count: Option<u32>,
    pub description: Option<String>,
    pub(crate) well_sample_links: RefList<Key<WellSample>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
}

impl PlateAcquisition {
    pub fn well_samples(&self) -> &RefList<Key<WellSample>> {
        &self.well_sample_links
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }
}

impl ModelObject for PlateAcquisition {
    const TAG: &'static str = "PlateAcquisition";
    const NAMESPACE: &'static str = SPW_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let acquisition = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Name", &mut acquisition.name);
        attrs.string("StartTime", &mut acquisition.start_time);
        attrs.string("EndTime", &mut acquisition.end_time);
        attrs.parse("MaximumFieldCount", &mut acquisition.maximum_field_count)?;
        child_text(element, "Description", Self::TYPE_NAME, &mut acquisition.description)?;

        let this = Self::object_ref(key);
        ctx.enqueue_refs(element, this, RefKind::WellSampleRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let acquisition = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", acquisition.id.as_ref());
        element.set_optional_attribute("Name", acquisition.name.as_ref());
        element.set_optional_attribute("StartTime", acquisition.start_time.as_ref());
        element.set_optional_attribute("EndTime", acquisition.end_time.as_ref());
        element.set_optional_attribute(
            "MaximumFieldCount",
            acquisition.maximum_field_count.as_ref(),
        );
        append_text(&mut element, "Description", acquisition.description.as_ref());
        append_refs(model, &mut element, RefKind::WellSampleRef, &acquisition.well_sample_links);
        append_refs(model, &mut element, RefKind::AnnotationRef, &acquisition.annotation_links);
        element
    }

    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        Ok(match kind {
            RefKind::WellSampleRef => {
                let target = expect::<WellSample>(model, kind, target)?;
                relate_many(
                    model,
                    key,
                    target,
                    key,
                    op,
                    |a| &mut a.well_sample_links,
                    |s| &mut s.plate_acquisitions,
                )
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |a| &mut a.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Screen {
    pub id: Option<String>,
    pub name: Option<String>,
    pub screen_type: Option<String>,
    pub protocol_identifier: Option<String>,
    pub protocol_description: Option<String>,
    pub reagent_set_identifier: Option<String>,
    pub reagent_set_description: Option<String>,
    pub description: Option<String>,
    pub reagents: Vec<Key<Reagent>>,
    pub(crate) plate_links: RefList<Key<Plate>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
}

impl Screen {
    pub fn plates(&self) -> &RefList<Key<Plate>> {
        &self.plate_links
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }
}

impl ModelObject for Screen {
    const TAG: &'static str = "Screen";
    const NAMESPACE: &'static str = SPW_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let screen = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Name", &mut screen.name);
        attrs.string("Type", &mut screen.screen_type);
        attrs.string("ProtocolIdentifier", &mut screen.protocol_identifier);
        attrs.string("ProtocolDescription", &mut screen.protocol_description);
        attrs.string("ReagentSetIdentifier", &mut screen.reagent_set_identifier);
        attrs.string("ReagentSetDescription", &mut screen.reagent_set_description);
        child_text(element, "Description", Self::TYPE_NAME, &mut screen.description)?;

        let this = Self::object_ref(key);
        ctx.enqueue_refs(element, this, RefKind::PlateRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)?;

        let existing = model[key].reagents.clone();
        model[key].reagents =
            parse_composed(model, ctx, element.children_by_tag(Reagent::TAG), &existing)?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let screen = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", screen.id.as_ref());
        element.set_optional_attribute("Name", screen.name.as_ref());
        element.set_optional_attribute("Type", screen.screen_type.as_ref());
        element.set_optional_attribute("ProtocolIdentifier", screen.protocol_identifier.as_ref());
        element.set_optional_attribute("ProtocolDescription", screen.protocol_description.as_ref());
        element.set_optional_attribute(
            "ReagentSetIdentifier",
            screen.reagent_set_identifier.as_ref(),
        );
        element.set_optional_attribute(
            "ReagentSetDescription",
            screen.reagent_set_description.as_ref(),
        );
        append_text(&mut element, "Description", screen.description.as_ref());
        append_children(model, &mut element, &screen.reagents);
        append_refs(model, &mut element, RefKind::PlateRef, &screen.plate_links);
        append_refs(model, &mut element, RefKind::AnnotationRef, &screen.annotation_links);
        element
    }

    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        Ok(match kind {
            RefKind::PlateRef => {
                let target = expect::<Plate>(model, kind, target)?;
                relate_many(model, key, target, key, op, |s| &mut s.plate_links, |p| &mut p.screens)
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |s| &mut s.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Reagent {
    pub id: Option<String>,
    pub name: Option<String>,
    pub reagent_identifier: Option<String>,
    pub description: Option<String>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) wells: RefList<Key<Well>>,
}

impl Reagent {
    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    /// Wells treated with this reagent.
    pub fn wells(&self) -> &RefList<Key<Well>> {
        &self.wells
    }
}

impl ModelObject for Reagent {
    const TAG: &'static str = "Reagent";
    const NAMESPACE: &'static str = SPW_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let reagent = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Name", &mut reagent.name);
        attrs.string("ReagentIdentifier", &mut reagent.reagent_identifier);
        child_text(element, "Description", Self::TYPE_NAME, &mut reagent.description)?;
        ctx.enqueue_refs(element, Self::object_ref(key), RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let reagent = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", reagent.id.as_ref());
        element.set_optional_attribute("Name", reagent.name.as_ref());
        element.set_optional_attribute("ReagentIdentifier", reagent.reagent_identifier.as_ref());
        append_text(&mut element, "Description", reagent.description.as_ref());
        append_refs(model, &mut element, RefKind::AnnotationRef, &reagent.annotation_links);
        element
    }

    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        match kind {
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                Ok(link_annotation(model, key, target, op, |r| &mut r.annotation_links))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resolve_all;

    const SPW: &str = "http://www.openmicroscopy.org/Schemas/SPW/2010-04";

    fn load(body: &str) -> (Model, ParseContext) {
        let xml = format!(
            r#"<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2010-04" xmlns:SPW="{SPW}">{body}</OME>"#
        );
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let root = Element::from_xml_str(&xml).expect("xml");
        model.parse_document(&root, &mut ctx).expect("parse");
        resolve_all(&mut model, &mut ctx.queue, &ctx.registry).expect("link");
        (model, ctx)
    }

    #[test]
    fn screen_plate_well_graph_is_symmetric() {
        let (model, ctx) = load(
            r#"<Image ID="Image:0"/>
               <SPW:Plate ID="Plate:0" Rows="8" Columns="12">
                 <SPW:Well ID="Well:0" Row="0" Column="0">
                   <SPW:WellSample ID="WellSample:0" Index="0"><ImageRef ID="Image:0"/></SPW:WellSample>
                   <SPW:ReagentRef ID="Reagent:0"/>
                 </SPW:Well>
                 <SPW:PlateAcquisition ID="PlateAcquisition:0">
                   <SPW:WellSampleRef ID="WellSample:0"/>
                 </SPW:PlateAcquisition>
               </SPW:Plate>
               <SPW:Screen ID="Screen:0">
                 <SPW:Reagent ID="Reagent:0" Name="siRNA"/>
                 <SPW:PlateRef ID="Plate:0"/>
               </SPW:Screen>"#,
        );
        let plate: Key<Plate> = model.lookup(&ctx.registry, "Plate:0").unwrap();
        let screen: Key<Screen> = model.lookup(&ctx.registry, "Screen:0").unwrap();
        let well: Key<Well> = model.lookup(&ctx.registry, "Well:0").unwrap();
        let sample: Key<WellSample> = model.lookup(&ctx.registry, "WellSample:0").unwrap();
        let reagent: Key<Reagent> = model.lookup(&ctx.registry, "Reagent:0").unwrap();
        let image: Key<Image> = model.lookup(&ctx.registry, "Image:0").unwrap();
        let acquisition: Key<PlateAcquisition> =
            model.lookup(&ctx.registry, "PlateAcquisition:0").unwrap();

        assert_eq!(model[plate].rows, Some(8));
        assert_eq!(model[screen].plates().to_vec(), vec![plate]);
        assert_eq!(model[plate].screens().to_vec(), vec![screen]);
        assert_eq!(model[well].reagent(), Some(reagent));
        assert_eq!(model[reagent].wells().to_vec(), vec![well]);
        assert_eq!(model[sample].image(), Some(image));
        assert_eq!(model[image].well_samples().to_vec(), vec![sample]);
        assert_eq!(model[sample].plate_acquisitions().to_vec(), vec![acquisition]);
    }

    #[test]
    fn references_serialize_in_their_own_namespace() {
        let (model, ctx) = load(
            r#"<Image ID="Image:0"/>
               <SPW:Plate ID="Plate:0">
                 <SPW:Well ID="Well:0">
                   <SPW:WellSample ID="WellSample:0"><ImageRef ID="Image:0"/></SPW:WellSample>
                 </SPW:Well>
               </SPW:Plate>"#,
        );
        let sample: Key<WellSample> = model.lookup(&ctx.registry, "WellSample:0").unwrap();
        let written = WellSample::to_element(&model, sample);
        assert_eq!(written.namespace.as_deref(), Some(SPW));
        let image_ref = &written.children[0];
        assert_eq!(image_ref.name, "ImageRef");
        assert_eq!(
            image_ref.namespace.as_deref(),
            Some("http://www.openmicroscopy.org/Schemas/OME/2010-04")
        );
        assert_eq!(image_ref.attribute("ID"), Some("Image:0"));
        assert!(image_ref.children.is_empty());
    }
}
