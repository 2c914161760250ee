//! Regions of interest and their shapes.

use super::annotation::{link_annotation, Annotation};
use super::experiment::MicrobeamManipulation;
use super::image::Image;
use super::keys::{Key, RefList};
use super::lexical::Lexical;
use super::linker::{expect, unsupported};
use super::namespaces::ROI_NS;
use super::object::{
    append_children, append_refs, append_text, new_element, Entity, ModelObject, ObjectRef,
};
use super::parse::{
    child_text, concrete_element, parse_composed, single_child, Attrs, ParseContext,
};
use super::reference::{LinkOp, RefKind};
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

#[derive(Clone, Debug, Default)]
pub struct Roi {
    pub id: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub description: Option<String>,
    /// Members of the ROI's `Union`, in document order.
    pub shapes: Vec<Key<Shape>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) images: RefList<Key<Image>>,
    pub(crate) microbeam_manipulations: RefList<Key<MicrobeamManipulation>>,
}

impl Roi {
    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    pub fn images(&self) -> &RefList<Key<Image>> {
        &self.images
    }

    pub fn microbeam_manipulations(&self) -> &RefList<Key<MicrobeamManipulation>> {
        &self.microbeam_manipulations
    }
}

impl ModelObject for Roi {
    const TAG: &'static str = "ROI";
    const NAMESPACE: &'static str = ROI_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let roi = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Name", &mut roi.name);
        attrs.string("Namespace", &mut roi.namespace);
        child_text(element, "Description", Self::TYPE_NAME, &mut roi.description)?;
        ctx.enqueue_refs(element, Self::object_ref(key), RefKind::AnnotationRef)?;

        if let Some(union) = single_child(element, "Union", Self::TYPE_NAME)? {
            let members = union
                .children
                .iter()
                .filter(|child| Shape::accepts_tag(&child.name));
            let existing = model[key].shapes.clone();
            model[key].shapes = parse_composed(model, ctx, members, &existing)?;
        }
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let roi = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", roi.id.as_ref());
        element.set_optional_attribute("Name", roi.name.as_ref());
        element.set_optional_attribute("Namespace", roi.namespace.as_ref());
        let mut union = Element::new("Union");
        append_children(model, &mut union, &roi.shapes);
        element.append_child(union);
        append_refs(model, &mut element, RefKind::AnnotationRef, &roi.annotation_links);
        append_text(&mut element, "Description", roi.description.as_ref());
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

/// The concrete geometry of a shape.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeGeometry {
    Line {
        x1: Option<Lexical<f64>>,
        y1: Option<Lexical<f64>>,
        x2: Option<Lexical<f64>>,
        y2: Option<Lexical<f64>>,
    },
    Rectangle {
        x: Option<Lexical<f64>>,
        y: Option<Lexical<f64>>,
        width: Option<Lexical<f64>>,
        height: Option<Lexical<f64>>,
    },
    Mask {
        x: Option<Lexical<f64>>,
        y: Option<Lexical<f64>>,
        /// `BinData` children, kept as parsed.
        bin_data: Vec<Element>,
    },
    Ellipse {
        x: Option<Lexical<f64>>,
        y: Option<Lexical<f64>>,
        radius_x: Option<Lexical<f64>>,
        radius_y: Option<Lexical<f64>>,
    },
    Point {
        x: Option<Lexical<f64>>,
        y: Option<Lexical<f64>>,
    },
    Polyline {
        points: Option<String>,
        closed: Option<Lexical<bool>>,
    },
    Path {
        definition: Option<String>,
    },
    Text {
        x: Option<Lexical<f64>>,
        y: Option<Lexical<f64>>,
        value: Option<String>,
    },
}

impl ShapeGeometry {
    /// Concrete shape tags in schema order.
    pub const TAGS: [&'static str; 8] = [
        "Line",
        "Rectangle",
        "Mask",
        "Ellipse",
        "Point",
        "Polyline",
        "Path",
        "Text",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ShapeGeometry::Line { .. } => "Line",
            ShapeGeometry::Rectangle { .. } => "Rectangle",
            ShapeGeometry::Mask { .. } => "Mask",
            ShapeGeometry::Ellipse { .. } => "Ellipse",
            ShapeGeometry::Point { .. } => "Point",
            ShapeGeometry::Polyline { .. } => "Polyline",
            ShapeGeometry::Path { .. } => "Path",
            ShapeGeometry::Text { .. } => "Text",
        }
    }

    fn empty_for(tag: &str) -> Option<Self> {
        Some(match tag {
            "Line" => ShapeGeometry::Line { x1: None, y1: None, x2: None, y2: None },
            "Rectangle" => ShapeGeometry::Rectangle { x: None, y: None, width: None, height: None },
            "Mask" => ShapeGeometry::Mask { x: None, y: None, bin_data: Vec::new() },
            "Ellipse" => ShapeGeometry::Ellipse { x: None, y: None, radius_x: None, radius_y: None },
            "Point" => ShapeGeometry::Point { x: None, y: None },
            "Polyline" => ShapeGeometry::Polyline { points: None, closed: None },
            "Path" => ShapeGeometry::Path { definition: None },
            "Text" => ShapeGeometry::Text { x: None, y: None, value: None },
            _ => return None,
        })
    }

    fn merge(&mut self, element: &Element) -> Result<(), OmeError> {
        let attrs = Attrs::new(element, self.tag());
        match self {
            ShapeGeometry::Line { x1, y1, x2, y2 } => {
                attrs.lexical("X1", x1)?;
                attrs.lexical("Y1", y1)?;
                attrs.lexical("X2", x2)?;
                attrs.lexical("Y2", y2)?;
            }
            ShapeGeometry::Rectangle { x, y, width, height } => {
                attrs.lexical("X", x)?;
                attrs.lexical("Y", y)?;
                attrs.lexical("Width", width)?;
                attrs.lexical("Height", height)?;
            }
            ShapeGeometry::Mask { x, y, bin_data } => {
                attrs.lexical("X", x)?;
                attrs.lexical("Y", y)?;
                bin_data.extend(element.children_by_tag("BinData").cloned());
            }
            ShapeGeometry::Ellipse { x, y, radius_x, radius_y } => {
                attrs.lexical("X", x)?;
                attrs.lexical("Y", y)?;
                attrs.lexical("RadiusX", radius_x)?;
                attrs.lexical("RadiusY", radius_y)?;
            }
            ShapeGeometry::Point { x, y } => {
                attrs.lexical("X", x)?;
                attrs.lexical("Y", y)?;
            }
            ShapeGeometry::Polyline { points, closed } => {
                attrs.string("Points", points);
                attrs.lexical("Closed", closed)?;
            }
            ShapeGeometry::Path { definition } => attrs.string("Definition", definition),
            ShapeGeometry::Text { x, y, value } => {
                attrs.lexical("X", x)?;
                attrs.lexical("Y", y)?;
                attrs.string("Value", value);
            }
        }
        Ok(())
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new(self.tag());
        match self {
            ShapeGeometry::Line { x1, y1, x2, y2 } => {
                element.set_optional_attribute("X1", x1.as_ref());
                element.set_optional_attribute("Y1", y1.as_ref());
                element.set_optional_attribute("X2", x2.as_ref());
                element.set_optional_attribute("Y2", y2.as_ref());
            }
            ShapeGeometry::Rectangle { x, y, width, height } => {
                element.set_optional_attribute("X", x.as_ref());
                element.set_optional_attribute("Y", y.as_ref());
                element.set_optional_attribute("Width", width.as_ref());
                element.set_optional_attribute("Height", height.as_ref());
            }
            ShapeGeometry::Mask { x, y, bin_data } => {
                element.set_optional_attribute("X", x.as_ref());
                element.set_optional_attribute("Y", y.as_ref());
                element.children.extend(bin_data.iter().cloned());
            }
            ShapeGeometry::Ellipse { x, y, radius_x, radius_y } => {
                element.set_optional_attribute("X", x.as_ref());
                element.set_optional_attribute("Y", y.as_ref());
                element.set_optional_attribute("RadiusX", radius_x.as_ref());
                element.set_optional_attribute("RadiusY", radius_y.as_ref());
            }
            ShapeGeometry::Point { x, y } => {
                element.set_optional_attribute("X", x.as_ref());
                element.set_optional_attribute("Y", y.as_ref());
            }
            ShapeGeometry::Polyline { points, closed } => {
                element.set_optional_attribute("Points", points.as_ref());
                element.set_optional_attribute("Closed", closed.as_ref());
            }
            ShapeGeometry::Path { definition } => {
                element.set_optional_attribute("Definition", definition.as_ref());
            }
            ShapeGeometry::Text { x, y, value } => {
                element.set_optional_attribute("X", x.as_ref());
                element.set_optional_attribute("Y", y.as_ref());
                element.set_optional_attribute("Value", value.as_ref());
            }
        }
        element
    }
}

/// A member of an ROI. Presentation fields are shared by every geometry.
#[derive(Clone, Debug, Default)]
pub struct Shape {
    pub id: Option<String>,
    pub name: Option<String>,
    pub label: Option<String>,
    pub fill: Option<i32>,
    pub stroke: Option<i32>,
    pub stroke_width: Option<Lexical<f64>>,
    pub stroke_dash_array: Option<String>,
    pub font_size: Option<u32>,
    pub the_z: Option<u32>,
    pub the_t: Option<u32>,
    pub the_c: Option<u32>,
    pub transform: Option<String>,
    pub description: Option<String>,
    /// `None` until a concrete shape element is seen.
    pub geometry: Option<ShapeGeometry>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
}

impl Shape {
    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }
}

impl ModelObject for Shape {
    const TAG: &'static str = "Shape";
    const NAMESPACE: &'static str = ROI_NS;

    fn accepts_tag(tag: &str) -> bool {
        tag == Self::TAG || ShapeGeometry::TAGS.contains(&tag)
    }

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;
        let concrete = concrete_element(element, Self::TAG, &ShapeGeometry::TAGS)?;

        let shape = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Name", &mut shape.name);
        attrs.string("Label", &mut shape.label);
        attrs.parse("Fill", &mut shape.fill)?;
        attrs.parse("Stroke", &mut shape.stroke)?;
        attrs.lexical("StrokeWidth", &mut shape.stroke_width)?;
        attrs.string("StrokeDashArray", &mut shape.stroke_dash_array);
        attrs.parse("FontSize", &mut shape.font_size)?;
        attrs.parse("TheZ", &mut shape.the_z)?;
        attrs.parse("TheT", &mut shape.the_t)?;
        attrs.parse("TheC", &mut shape.the_c)?;
        attrs.string("Transform", &mut shape.transform);
        child_text(element, "Description", Self::TYPE_NAME, &mut shape.description)?;
        ctx.enqueue_refs(element, Self::object_ref(key), RefKind::AnnotationRef)?;

        let Some(concrete) = concrete else {
            return Ok(());
        };
        let shape = &mut model[key];
        let current = shape.geometry.as_ref().map(ShapeGeometry::tag);
        match (current, ShapeGeometry::empty_for(&concrete.name)) {
            (None, Some(fresh)) => shape.geometry = Some(fresh),
            (Some(existing), Some(_)) if existing != concrete.name => {
                ctx.tag_mismatch(existing, &concrete.name)?;
            }
            _ => {}
        }
        if let Some(geometry) = shape.geometry.as_mut().filter(|g| g.tag() == concrete.name) {
            geometry.merge(concrete)?;
        }
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let shape = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", shape.id.as_ref());
        element.set_optional_attribute("Name", shape.name.as_ref());
        element.set_optional_attribute("Label", shape.label.as_ref());
        element.set_optional_attribute("Fill", shape.fill.as_ref());
        element.set_optional_attribute("Stroke", shape.stroke.as_ref());
        element.set_optional_attribute("StrokeWidth", shape.stroke_width.as_ref());
        element.set_optional_attribute("StrokeDashArray", shape.stroke_dash_array.as_ref());
        element.set_optional_attribute("FontSize", shape.font_size.as_ref());
        element.set_optional_attribute("TheZ", shape.the_z.as_ref());
        element.set_optional_attribute("TheT", shape.the_t.as_ref());
        element.set_optional_attribute("TheC", shape.the_c.as_ref());
        element.set_optional_attribute("Transform", shape.transform.as_ref());
        append_text(&mut element, "Description", shape.description.as_ref());
        if let Some(geometry) = &shape.geometry {
            element.append_child(geometry.to_element());
        }
        append_refs(model, &mut element, RefKind::AnnotationRef, &shape.annotation_links);
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
                Ok(link_annotation(model, key, target, op, |s| &mut s.annotation_links))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueCode, ParseOptions};

    fn parse_roi(xml: &str, ctx: &mut ParseContext) -> (Model, Key<Roi>) {
        let mut model = Model::default();
        let element = Element::from_xml_str(xml).expect("xml");
        let roi = model.parse::<Roi>(&element, ctx).expect("parse");
        (model, roi)
    }

    #[test]
    fn union_members_keep_their_concrete_kind_and_order() {
        let mut ctx = ParseContext::default();
        let (model, roi) = parse_roi(
            r#"<ROI ID="ROI:0"><Union>
                 <Rectangle ID="Shape:0" X="1" Y="2" Width="3" Height="4"/>
                 <Mask ID="Shape:1" X="5" Y="6"/>
               </Union></ROI>"#,
            &mut ctx,
        );
        let shapes = &model[roi].shapes;
        assert_eq!(shapes.len(), 2);
        assert_eq!(
            model[shapes[0]].geometry,
            Some(ShapeGeometry::Rectangle {
                x: Some(Lexical::from(1.0)),
                y: Some(Lexical::from(2.0)),
                width: Some(Lexical::from(3.0)),
                height: Some(Lexical::from(4.0)),
            })
        );
        assert!(matches!(
            &model[shapes[1]].geometry,
            Some(ShapeGeometry::Mask { x: Some(x), .. }) if *x == 5.0
        ));
        assert_eq!(model.count::<Shape>(), 2);
    }

    #[test]
    fn wrapper_form_splits_base_and_geometry() {
        let mut ctx = ParseContext::default();
        let (model, roi) = parse_roi(
            r#"<ROI ID="ROI:0"><Union>
                 <Shape ID="Shape:0" TheZ="3" StrokeWidth="1.5"><Point X="7" Y="8"/></Shape>
               </Union></ROI>"#,
            &mut ctx,
        );
        let shape = &model[model[roi].shapes[0]];
        assert_eq!(shape.the_z, Some(3));
        assert_eq!(shape.stroke_width, Some(Lexical::from(1.5)));
        assert_eq!(shape.geometry, Some(ShapeGeometry::Point {
                x: Some(Lexical::from(7.0)),
                y: Some(Lexical::from(8.0)),
            }));
    }

    #[test]
    fn serialization_uses_wrapper_form() {
        let mut ctx = ParseContext::default();
        let (model, roi) = parse_roi(
            r#"<ROI ID="ROI:0"><Union><Ellipse ID="Shape:0" X="1" RadiusX="2"/></Union></ROI>"#,
            &mut ctx,
        );
        let written = Roi::to_element(&model, roi);
        let union = &written.children[0];
        assert_eq!(union.name, "Union");
        let shape = &union.children[0];
        assert_eq!(shape.name, "Shape");
        assert_eq!(shape.attribute("ID"), Some("Shape:0"));
        assert_eq!(shape.children[0].name, "Ellipse");
        assert_eq!(shape.children[0].attribute("RadiusX"), Some("2"));
    }

    #[test]
    fn geometry_kind_change_is_a_tag_mismatch() {
        let mut ctx = ParseContext::default();
        let mut model = Model::default();
        let line = Element::from_xml_str(r#"<Line ID="Shape:0" X1="1"/>"#).unwrap();
        let shape = model.parse::<Shape>(&line, &mut ctx).unwrap();
        let point = Element::from_xml_str(r#"<Point ID="Shape:0" X="4"/>"#).unwrap();
        model.update(shape, &point, &mut ctx).unwrap();

        assert_eq!(ctx.report.count(IssueCode::TagNameMismatch), 1);
        assert!(matches!(model[shape].geometry, Some(ShapeGeometry::Line { x1: Some(_), .. })));

        let mut strict = ParseContext::new(ParseOptions::strict());
        let mut model = Model::default();
        let shape = model.parse::<Shape>(&line, &mut strict).unwrap();
        assert!(matches!(
            model.update(shape, &point, &mut strict),
            Err(OmeError::TagNameMismatch { expected: "Line", .. })
        ));
    }

    #[test]
    fn reparsing_union_merges_shapes_by_id() {
        let xml = r#"<ROI ID="ROI:0"><Union><Point ID="Shape:0" X="1"/></Union></ROI>"#;
        let mut ctx = ParseContext::default();
        let (mut model, roi) = parse_roi(xml, &mut ctx);
        let moved = Element::from_xml_str(
            r#"<ROI ID="ROI:0"><Union><Point ID="Shape:0" X="9"/><Point ID="Shape:1"/></Union></ROI>"#,
        )
        .unwrap();
        model.update(roi, &moved, &mut ctx).unwrap();

        let shapes = &model[roi].shapes;
        assert_eq!(shapes.len(), 2);
        assert!(matches!(
            &model[shapes[0]].geometry,
            Some(ShapeGeometry::Point { x: Some(x), .. }) if *x == 9.0
        ));
    }
}
