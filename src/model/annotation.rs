//! Structured annotations.
//!
//! All ten concrete annotation elements map onto one [`Annotation`] type;
//! the element tag picks the [`AnnotationValue`] variant.

use std::str::FromStr;

use super::keys::{Key, RefList};
use super::linker::{expect, relate_many, unsupported};
use super::namespaces::{BIN_NS, SA_NS};
use super::object::{append_refs, append_text, Entity, ModelObject, ObjectRef};
use super::lexical::{Lexical, LexicalValue};
use super::parse::{child_text, single_child, Attrs, ParseContext};
use super::reference::{LinkOp, RefKind};
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

#[derive(Clone, Debug, Default)]
pub struct Annotation {
    pub id: Option<String>,
    pub namespace: Option<String>,
    pub description: Option<String>,
    /// `None` until an element with a concrete annotation tag is parsed.
    pub value: Option<AnnotationValue>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) annotated_by: RefList<ObjectRef>,
}

/// The concrete annotation kind with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationValue {
    /// Arbitrary XML kept verbatim.
    Xml(Vec<Element>),
    File(Option<BinaryFile>),
    List,
    Long(Option<i64>),
    Double(Option<Lexical<f64>>),
    Comment(Option<String>),
    Boolean(Option<Lexical<bool>>),
    Timestamp(Option<String>),
    Tag(Option<String>),
    Term(Option<String>),
}

/// `BinaryFile` of a file annotation. Its `External`/`BinData` content is
/// carried through untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BinaryFile {
    pub file_name: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub contents: Vec<Element>,
}

impl AnnotationValue {
    pub const TAGS: [&'static str; 10] = [
        "XMLAnnotation",
        "FileAnnotation",
        "ListAnnotation",
        "LongAnnotation",
        "DoubleAnnotation",
        "CommentAnnotation",
        "BooleanAnnotation",
        "TimestampAnnotation",
        "TagAnnotation",
        "TermAnnotation",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            AnnotationValue::Xml(_) => "XMLAnnotation",
            AnnotationValue::File(_) => "FileAnnotation",
            AnnotationValue::List => "ListAnnotation",
            AnnotationValue::Long(_) => "LongAnnotation",
            AnnotationValue::Double(_) => "DoubleAnnotation",
            AnnotationValue::Comment(_) => "CommentAnnotation",
            AnnotationValue::Boolean(_) => "BooleanAnnotation",
            AnnotationValue::Timestamp(_) => "TimestampAnnotation",
            AnnotationValue::Tag(_) => "TagAnnotation",
            AnnotationValue::Term(_) => "TermAnnotation",
        }
    }

    /// An empty value of the kind named by `tag`.
    pub fn empty_for(tag: &str) -> Option<Self> {
        let value = match tag {
            "XMLAnnotation" => AnnotationValue::Xml(Vec::new()),
            "FileAnnotation" => AnnotationValue::File(None),
            "ListAnnotation" => AnnotationValue::List,
            "LongAnnotation" => AnnotationValue::Long(None),
            "DoubleAnnotation" => AnnotationValue::Double(None),
            "CommentAnnotation" => AnnotationValue::Comment(None),
            "BooleanAnnotation" => AnnotationValue::Boolean(None),
            "TimestampAnnotation" => AnnotationValue::Timestamp(None),
            "TagAnnotation" => AnnotationValue::Tag(None),
            "TermAnnotation" => AnnotationValue::Term(None),
            _ => return None,
        };
        Some(value)
    }

    /// The scalar payload as text, for kinds that have one.
    pub fn text(&self) -> Option<String> {
        match self {
            AnnotationValue::Long(v) => v.map(|v| v.to_string()),
            AnnotationValue::Double(v) => v.as_ref().map(ToString::to_string),
            AnnotationValue::Boolean(v) => v.as_ref().map(ToString::to_string),
            AnnotationValue::Comment(v)
            | AnnotationValue::Timestamp(v)
            | AnnotationValue::Tag(v)
            | AnnotationValue::Term(v) => v.clone(),
            AnnotationValue::Xml(_) | AnnotationValue::File(_) | AnnotationValue::List => None,
        }
    }

    fn merge(&mut self, element: &Element) -> Result<(), OmeError> {
        let tag = self.tag();
        match self {
            AnnotationValue::Xml(content) => {
                if let Some(value) = single_child(element, "Value", tag)? {
                    *content = value.children.clone();
                }
            }
            AnnotationValue::File(file) => {
                if let Some(binary) = single_child(element, "BinaryFile", tag)? {
                    file.get_or_insert_with(BinaryFile::default).update(binary)?;
                }
            }
            AnnotationValue::List => {}
            AnnotationValue::Long(v) => parse_value(element, tag, v)?,
            AnnotationValue::Double(v) => parse_lexical_value(element, tag, v)?,
            AnnotationValue::Boolean(v) => parse_lexical_value(element, tag, v)?,
            AnnotationValue::Comment(v)
            | AnnotationValue::Timestamp(v)
            | AnnotationValue::Tag(v)
            | AnnotationValue::Term(v) => child_text(element, "Value", tag, v)?,
        }
        Ok(())
    }

    fn write(&self, element: &mut Element) {
        match self {
            AnnotationValue::Xml(content) => {
                let mut value = Element::new("Value");
                value.children = content.clone();
                element.append_child(value);
            }
            AnnotationValue::File(Some(file)) => element.append_child(file.to_element()),
            AnnotationValue::File(None) | AnnotationValue::List => {}
            other => {
                if let Some(text) = other.text() {
                    element.append_child(Element::text_element("Value", text));
                }
            }
        }
    }
}

fn value_text(element: &Element, tag: &'static str) -> Result<Option<String>, OmeError> {
    Ok(single_child(element, "Value", tag)?.map(|v| v.text().unwrap_or_default().to_string()))
}

fn parse_value<T: FromStr>(
    element: &Element,
    tag: &'static str,
    slot: &mut Option<T>,
) -> Result<(), OmeError> {
    if let Some(raw) = value_text(element, tag)? {
        let parsed = raw.parse::<T>().map_err(|_| OmeError::InvalidAttribute {
            element: tag,
            attribute: "Value",
            value: raw.clone(),
            expected: std::any::type_name::<T>(),
        })?;
        *slot = Some(parsed);
    }
    Ok(())
}

fn parse_lexical_value<T: LexicalValue>(
    element: &Element,
    tag: &'static str,
    slot: &mut Option<Lexical<T>>,
) -> Result<(), OmeError> {
    if let Some(raw) = value_text(element, tag)? {
        *slot = Some(Lexical::parse(&raw).ok_or(OmeError::InvalidAttribute {
            element: tag,
            attribute: "Value",
            value: raw.clone(),
            expected: T::EXPECTED,
        })?);
    }
    Ok(())
}

impl BinaryFile {
    fn update(&mut self, element: &Element) -> Result<(), OmeError> {
        let attrs = Attrs::new(element, "BinaryFile");
        attrs.string("FileName", &mut self.file_name);
        attrs.parse("Size", &mut self.size)?;
        attrs.string("MIMEType", &mut self.mime_type);
        if !element.children.is_empty() {
            self.contents = element.children.clone();
        }
        Ok(())
    }

    fn to_element(&self) -> Element {
        let mut element = Element::with_namespace("BinaryFile", BIN_NS);
        element.set_optional_attribute("FileName", self.file_name.as_ref());
        element.set_optional_attribute("Size", self.size.as_ref());
        element.set_optional_attribute("MIMEType", self.mime_type.as_ref());
        element.children = self.contents.clone();
        element
    }
}

impl Annotation {
    /// Schema tag of the concrete kind, or `"Annotation"` if unknown.
    pub fn kind(&self) -> &'static str {
        self.value.as_ref().map_or(Self::TAG, AnnotationValue::tag)
    }

    pub fn value_text(&self) -> Option<String> {
        self.value.as_ref().and_then(AnnotationValue::text)
    }

    /// Annotations this annotation itself refers to.
    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    /// Every object that links to this annotation, in link order.
    pub fn annotated_by(&self) -> &RefList<ObjectRef> {
        &self.annotated_by
    }

    /// The linking objects of type `T`.
    pub fn linked<T: Entity>(&self) -> Vec<Key<T>> {
        self.annotated_by
            .iter()
            .filter_map(T::from_object_ref)
            .collect()
    }
}

impl ModelObject for Annotation {
    const TAG: &'static str = "Annotation";
    const NAMESPACE: &'static str = SA_NS;

    fn accepts_tag(tag: &str) -> bool {
        AnnotationValue::TAGS.contains(&tag)
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

        let annotation = &mut model[key];
        Attrs::new(element, Self::TYPE_NAME).string("Namespace", &mut annotation.namespace);
        child_text(element, "Description", Self::TYPE_NAME, &mut annotation.description)?;
        let current = annotation.value.as_ref().map(AnnotationValue::tag);
        match (current, AnnotationValue::empty_for(&element.name)) {
            (None, Some(fresh)) => annotation.value = Some(fresh),
            (Some(existing), Some(_)) if existing != element.name => {
                ctx.tag_mismatch(existing, &element.name)?;
            }
            _ => {}
        }
        if let Some(value) = annotation.value.as_mut().filter(|v| v.tag() == element.name) {
            value.merge(element)?;
        }

        ctx.enqueue_refs(element, Self::object_ref(key), RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let annotation = &model[key];
        let mut element = Element::with_namespace(annotation.kind(), SA_NS);
        element.set_optional_attribute("ID", annotation.id.as_ref());
        element.set_optional_attribute("Namespace", annotation.namespace.as_ref());
        append_text(&mut element, "Description", annotation.description.as_ref());
        append_refs(model, &mut element, RefKind::AnnotationRef, &annotation.annotation_links);
        if let Some(value) = &annotation.value {
            value.write(&mut element);
        }
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
                Ok(link_annotation(model, key, target, op, |a| &mut a.annotation_links))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

/// Relates any annotatable object to an annotation.
pub(crate) fn link_annotation<S: Entity>(
    model: &mut Model,
    source: Key<S>,
    target: Key<Annotation>,
    op: LinkOp,
    forward: fn(&mut S) -> &mut RefList<Key<Annotation>>,
) -> bool {
    relate_many(
        model,
        source,
        target,
        S::object_ref(source),
        op,
        forward,
        |a| &mut a.annotated_by,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(xml: &str) -> (Model, Key<Annotation>, ParseContext) {
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let element = Element::from_xml_str(xml).expect("xml");
        let key = model.parse::<Annotation>(&element, &mut ctx).expect("parse");
        (model, key, ctx)
    }

    #[test]
    fn tag_selects_variant() {
        let (model, key, _) = parse_one(
            r#"<LongAnnotation xmlns="http://www.openmicroscopy.org/Schemas/SA/2010-04" ID="Annotation:0"><Value>42</Value></LongAnnotation>"#,
        );
        assert_eq!(model[key].value, Some(AnnotationValue::Long(Some(42))));
        assert_eq!(model[key].value_text().as_deref(), Some("42"));
        assert_eq!(model[key].kind(), "LongAnnotation");
    }

    #[test]
    fn boolean_value_accepts_numeric_form() {
        let (model, key, _) =
            parse_one(r#"<BooleanAnnotation ID="A:1"><Value>0</Value></BooleanAnnotation>"#);
        assert_eq!(model[key].value, Some(AnnotationValue::Boolean(Some(Lexical::from(false)))));
        assert_eq!(model[key].value_text().as_deref(), Some("0"));
    }

    #[test]
    fn bad_long_value_is_rejected() {
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let element =
            Element::from_xml_str(r#"<LongAnnotation ID="A:2"><Value>4.5</Value></LongAnnotation>"#)
                .unwrap();
        let err = model.parse::<Annotation>(&element, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            OmeError::InvalidAttribute { element: "LongAnnotation", attribute: "Value", .. }
        ));
    }

    #[test]
    fn changing_kind_on_update_keeps_existing_variant() {
        let (mut model, key, mut ctx) =
            parse_one(r#"<TagAnnotation ID="A:3"><Value>red</Value></TagAnnotation>"#);
        let other =
            Element::from_xml_str(r#"<LongAnnotation ID="A:3"><Value>7</Value></LongAnnotation>"#)
                .unwrap();
        model.update(key, &other, &mut ctx).unwrap();
        assert_eq!(model[key].value, Some(AnnotationValue::Tag(Some("red".into()))));
        assert_eq!(ctx.report.issues.len(), 1);
    }

    #[test]
    fn xml_annotation_keeps_content() {
        let (model, key, _) = parse_one(
            r#"<XMLAnnotation ID="A:4"><Value><Key>k</Key><Other a="1"/></Value></XMLAnnotation>"#,
        );
        let element = Annotation::to_element(&model, key);
        let value = element.children_by_tag("Value").next().expect("value");
        assert_eq!(value.children.len(), 2);
        assert_eq!(value.children[0].text(), Some("k"));
    }

    #[test]
    fn file_annotation_writes_binary_file_in_its_namespace() {
        let (model, key, _) = parse_one(
            r#"<FileAnnotation xmlns="http://www.openmicroscopy.org/Schemas/SA/2010-04" ID="A:5">
                 <BinaryFile xmlns="http://www.openmicroscopy.org/Schemas/BinaryFile/2010-04" FileName="a.txt" Size="12"><External href="a.txt" SHA1="00"/></BinaryFile>
               </FileAnnotation>"#,
        );
        let element = Annotation::to_element(&model, key);
        let binary = &element.children[0];
        assert_eq!(binary.name, "BinaryFile");
        assert_eq!(binary.namespace.as_deref(), Some(BIN_NS));
        assert_eq!(binary.attribute("Size"), Some("12"));
        assert_eq!(binary.children.len(), 1);
    }
}
