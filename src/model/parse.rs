//! Parse-time state and the helpers every `update` implementation shares.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::keys::Key;
use super::lexical::{Lexical, LexicalValue};
use super::object::{ModelObject, ObjectRef};
use super::reference::{ReferenceDescriptor, ReferenceQueue, RefKind};
use super::registry::{DuplicateIdPolicy, Registration, Registry};
use super::report::{IssueCode, ParseIssue, ParseReport};
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

/// How to treat an element whose tag is not the expected one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchPolicy {
    /// Proceed silently.
    Ignore,
    /// Proceed and record a [`ParseIssue`].
    #[default]
    Warn,
    /// Fail with [`OmeError::TagNameMismatch`].
    Error,
}

/// Knobs for a parse run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    pub tag_mismatch: MismatchPolicy,
    pub duplicate_ids: DuplicateIdPolicy,
}

impl ParseOptions {
    /// Options that turn every tolerated problem into an error.
    pub fn strict() -> Self {
        Self {
            tag_mismatch: MismatchPolicy::Error,
            duplicate_ids: DuplicateIdPolicy::Error,
        }
    }
}

/// Everything a parse pass threads through `update` calls: the ID
/// registry, the queue of unresolved references, and the diagnostics
/// collected so far.
#[derive(Debug, Default)]
pub struct ParseContext {
    pub registry: Registry,
    pub queue: ReferenceQueue,
    pub report: ParseReport,
    options: ParseOptions,
}

impl ParseContext {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            registry: Registry::with_policy(options.duplicate_ids),
            queue: ReferenceQueue::new(),
            report: ParseReport::new(),
            options,
        }
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Checks that `element` may be parsed as `T`.
    pub fn check_tag<T: ModelObject>(&mut self, element: &Element) -> Result<(), OmeError> {
        if T::accepts_tag(&element.name) {
            return Ok(());
        }
        self.tag_mismatch(T::TAG, &element.name)
    }

    /// Applies the mismatch policy to an unexpected tag.
    pub(crate) fn tag_mismatch(&mut self, expected: &'static str, found: &str) -> Result<(), OmeError> {
        match self.options.tag_mismatch {
            MismatchPolicy::Ignore => Ok(()),
            MismatchPolicy::Warn => {
                tracing::warn!(expected, found, "unexpected element name");
                self.report.add(ParseIssue::new(
                    IssueCode::TagNameMismatch,
                    format!("expecting node name of {expected} got {found}"),
                    found,
                ));
                Ok(())
            }
            MismatchPolicy::Error => Err(OmeError::TagNameMismatch {
                expected,
                found: found.to_string(),
            }),
        }
    }

    /// Registers `object` under `id` right away, so that later elements in
    /// the same document can refer to it.
    pub fn register(&mut self, id: &str, object: ObjectRef) -> Result<(), OmeError> {
        match self.registry.register(id, object)? {
            Registration::Replaced(previous) => {
                tracing::warn!(id, previous = previous.type_name(), "ID reassigned");
                self.report.add(ParseIssue::new(
                    IssueCode::DuplicateIdReplaced,
                    format!(
                        "{} replaces earlier {} under the same ID",
                        object.type_name(),
                        previous.type_name()
                    ),
                    id,
                ));
            }
            Registration::New => {
                tracing::trace!(id, kind = object.type_name(), "registered");
            }
            Registration::Unchanged => {}
        }
        Ok(())
    }

    /// Queues a reference from `source` to the object with `target_id`.
    pub fn enqueue(&mut self, source: ObjectRef, kind: RefKind, target_id: impl Into<String>) {
        self.queue
            .push(ReferenceDescriptor::new(source, kind, target_id));
    }

    /// Reads the element's `ID`, stores it on the object and registers it.
    ///
    /// An element without an `ID` is only accepted when it updates an
    /// object that already has one. An object keeps its first ID.
    pub(crate) fn identify<T: ModelObject>(
        &mut self,
        model: &mut Model,
        key: Key<T>,
        element: &Element,
    ) -> Result<(), OmeError> {
        match element.attribute("ID") {
            Some(id) => {
                if let Some(existing) = model[key].id().filter(|existing| *existing != id) {
                    return Err(OmeError::IdChanged {
                        element: T::TYPE_NAME,
                        existing: existing.to_string(),
                        found: id.to_string(),
                    });
                }
                model[key].set_id(id.to_string());
                self.register(id, T::object_ref(key))
            }
            None if model[key].id().is_some() => Ok(()),
            None => Err(OmeError::MissingRequiredAttribute {
                element: T::TYPE_NAME,
                attribute: "ID",
            }),
        }
    }

    /// Queues every `kind` ref element directly under `element`.
    pub(crate) fn enqueue_refs(
        &mut self,
        element: &Element,
        source: ObjectRef,
        kind: RefKind,
    ) -> Result<(), OmeError> {
        for child in element.children_by_tag(kind.tag()) {
            let id = ref_target(child, kind)?;
            self.enqueue(source, kind, id);
        }
        Ok(())
    }

    /// Queues the single `kind` ref element under `element`, if present.
    pub(crate) fn enqueue_ref(
        &mut self,
        element: &Element,
        owner: &'static str,
        source: ObjectRef,
        kind: RefKind,
    ) -> Result<(), OmeError> {
        if let Some(child) = single_child(element, kind.tag(), owner)? {
            let id = ref_target(child, kind)?;
            self.enqueue(source, kind, id);
        }
        Ok(())
    }
}

fn ref_target(element: &Element, kind: RefKind) -> Result<&str, OmeError> {
    element
        .attribute("ID")
        .ok_or(OmeError::MissingRequiredAttribute {
            element: kind.tag(),
            attribute: "ID",
        })
}

/// Attribute reader that only overwrites a slot when the attribute exists.
pub(crate) struct Attrs<'a> {
    element: &'a Element,
    owner: &'static str,
}

impl<'a> Attrs<'a> {
    pub(crate) fn new(element: &'a Element, owner: &'static str) -> Self {
        Self { element, owner }
    }

    pub(crate) fn string(&self, name: &str, slot: &mut Option<String>) {
        if let Some(value) = self.element.attribute(name) {
            *slot = Some(value.to_string());
        }
    }

    pub(crate) fn parse<T: FromStr>(
        &self,
        name: &'static str,
        slot: &mut Option<T>,
    ) -> Result<(), OmeError> {
        if let Some(raw) = self.element.attribute(name) {
            let value = raw.trim().parse::<T>().map_err(|_| OmeError::InvalidAttribute {
                element: self.owner,
                attribute: name,
                value: raw.to_string(),
                expected: std::any::type_name::<T>(),
            })?;
            *slot = Some(value);
        }
        Ok(())
    }

    /// Reads a double or boolean, keeping its spelling for output.
    pub(crate) fn lexical<T: LexicalValue>(
        &self,
        name: &'static str,
        slot: &mut Option<Lexical<T>>,
    ) -> Result<(), OmeError> {
        if let Some(raw) = self.element.attribute(name) {
            *slot = Some(Lexical::parse(raw).ok_or_else(|| OmeError::InvalidAttribute {
                element: self.owner,
                attribute: name,
                value: raw.to_string(),
                expected: T::EXPECTED,
            })?);
        }
        Ok(())
    }
}

/// `xsd:boolean`: accepts `true`, `false`, `1` and `0`.
pub(crate) fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// The only child named `tag`. More than one is a cardinality violation.
pub(crate) fn single_child<'a>(
    element: &'a Element,
    tag: &str,
    owner: &'static str,
) -> Result<Option<&'a Element>, OmeError> {
    let mut matches = element.children.iter().filter(|child| child.name == tag);
    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        return Err(OmeError::CardinalityViolation {
            parent: owner,
            child: tag.to_string(),
            count: extra + 1,
        });
    }
    Ok(first)
}

/// The concrete element of a polymorphic value.
///
/// For a wrapper element (tag `wrapper`) this is its single child whose tag
/// is one of `tags`; a bare concrete element is its own concrete element.
pub(crate) fn concrete_element<'a>(
    element: &'a Element,
    wrapper: &'static str,
    tags: &[&str],
) -> Result<Option<&'a Element>, OmeError> {
    if element.name != wrapper {
        return Ok(Some(element));
    }
    let mut matches = element
        .children
        .iter()
        .filter(|child| tags.contains(&child.name.as_str()));
    let first = matches.next();
    let extra = matches.count();
    match first {
        Some(first) if extra > 0 => Err(OmeError::CardinalityViolation {
            parent: wrapper,
            child: first.name.clone(),
            count: extra + 1,
        }),
        first => Ok(first),
    }
}

/// Reads a text-only child such as `Description` into `slot`.
pub(crate) fn child_text(
    element: &Element,
    tag: &str,
    owner: &'static str,
    slot: &mut Option<String>,
) -> Result<(), OmeError> {
    if let Some(child) = single_child(element, tag, owner)? {
        *slot = Some(child.text().unwrap_or_default().to_string());
    }
    Ok(())
}

/// Parses composed children, merging into `existing` by ID.
///
/// A child whose `ID` names an object already in `existing` updates that
/// object in place; every other child is allocated and appended. Returns
/// the full list in order.
pub(crate) fn parse_composed<'e, T: ModelObject>(
    model: &mut Model,
    ctx: &mut ParseContext,
    children: impl IntoIterator<Item = &'e Element>,
    existing: &[Key<T>],
) -> Result<Vec<Key<T>>, OmeError> {
    let mut keys = existing.to_vec();
    for child in children {
        let known = child
            .attribute("ID")
            .and_then(|id| ctx.registry.resolve(id))
            .and_then(T::from_object_ref)
            .filter(|key| existing.contains(key));
        match known {
            Some(key) => T::update(model, key, child, ctx)?,
            None => keys.push(model.parse::<T>(child, ctx)?),
        }
    }
    Ok(keys)
}

/// Parses the single composed child `tag`, updating `existing` in place
/// when there is one.
pub(crate) fn parse_composed_one<T: ModelObject>(
    model: &mut Model,
    ctx: &mut ParseContext,
    element: &Element,
    tag: &str,
    owner: &'static str,
    existing: Option<Key<T>>,
) -> Result<Option<Key<T>>, OmeError> {
    let Some(child) = single_child(element, tag, owner)? else {
        return Ok(existing);
    };
    match existing {
        Some(key) => {
            T::update(model, key, child, ctx)?;
            Ok(Some(key))
        }
        None => Ok(Some(model.parse::<T>(child, ctx)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(xml: &str) -> Element {
        Element::from_xml_str(xml).expect("parse")
    }

    #[test]
    fn attrs_only_overwrite_when_present() {
        let e = element(r#"<Pixels SizeX="512"/>"#);
        let attrs = Attrs::new(&e, "Pixels");
        let mut size_x = Some(1u32);
        let mut size_y = Some(2u32);
        attrs.parse("SizeX", &mut size_x).unwrap();
        attrs.parse("SizeY", &mut size_y).unwrap();
        assert_eq!(size_x, Some(512));
        assert_eq!(size_y, Some(2));
    }

    #[test]
    fn malformed_number_is_invalid_attribute() {
        let e = element(r#"<Pixels SizeX="big"/>"#);
        let mut size_x: Option<u32> = None;
        let err = Attrs::new(&e, "Pixels")
            .parse("SizeX", &mut size_x)
            .unwrap_err();
        assert!(matches!(
            err,
            OmeError::InvalidAttribute { attribute: "SizeX", .. }
        ));
    }

    #[test]
    fn booleans_accept_xsd_forms() {
        let e = element(r#"<Laser Tuneable="1" PockelCell="false" Bad="yes"/>"#);
        let attrs = Attrs::new(&e, "Laser");
        let mut tuneable: Option<Lexical<bool>> = None;
        let mut pockel: Option<Lexical<bool>> = None;
        let mut bad: Option<Lexical<bool>> = None;
        attrs.lexical("Tuneable", &mut tuneable).unwrap();
        attrs.lexical("PockelCell", &mut pockel).unwrap();
        assert_eq!(tuneable.as_ref().map(Lexical::as_str), Some("1"));
        assert_eq!(tuneable, Some(Lexical::from(true)));
        assert_eq!(pockel, Some(Lexical::from(false)));
        assert!(matches!(
            attrs.lexical("Bad", &mut bad),
            Err(OmeError::InvalidAttribute { expected: "boolean", .. })
        ));
    }

    #[test]
    fn single_child_rejects_repeats() {
        let e = element("<Image><Pixels/><Pixels/></Image>");
        let err = single_child(&e, "Pixels", "Image").unwrap_err();
        assert!(matches!(
            err,
            OmeError::CardinalityViolation { parent: "Image", count: 2, .. }
        ));
        assert!(single_child(&e, "Description", "Image").unwrap().is_none());
    }

    #[test]
    fn concrete_element_unwraps_or_passes_through() {
        let tags = ["Rectangle", "Mask"];
        let wrapped = element(r#"<Shape ID="Shape:0"><Rectangle X="1"/></Shape>"#);
        let inner = concrete_element(&wrapped, "Shape", &tags).unwrap().unwrap();
        assert_eq!(inner.name, "Rectangle");

        let bare = element(r#"<Mask ID="Shape:1"/>"#);
        let inner = concrete_element(&bare, "Shape", &tags).unwrap().unwrap();
        assert_eq!(inner.name, "Mask");

        let doubled = element(r#"<Shape ID="Shape:2"><Rectangle/><Mask/></Shape>"#);
        assert!(matches!(
            concrete_element(&doubled, "Shape", &tags),
            Err(OmeError::CardinalityViolation { parent: "Shape", count: 2, .. })
        ));
    }

    #[test]
    fn tag_mismatch_follows_policy() {
        let mut warn = ParseContext::default();
        warn.tag_mismatch("Channel", "Chanel").unwrap();
        assert_eq!(warn.report.count(IssueCode::TagNameMismatch), 1);

        let mut ignore = ParseContext::new(ParseOptions {
            tag_mismatch: MismatchPolicy::Ignore,
            ..ParseOptions::default()
        });
        ignore.tag_mismatch("Channel", "Chanel").unwrap();
        assert!(ignore.report.is_clean());

        let mut strict = ParseContext::new(ParseOptions::strict());
        assert!(matches!(
            strict.tag_mismatch("Channel", "Chanel"),
            Err(OmeError::TagNameMismatch { expected: "Channel", .. })
        ));
    }

    #[test]
    fn ref_without_id_is_missing_attribute() {
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let channel = model.alloc(crate::model::Channel::default());
        let e = element("<Channel><AnnotationRef/></Channel>");
        let err = ctx
            .enqueue_refs(&e, ObjectRef::Channel(channel), RefKind::AnnotationRef)
            .unwrap_err();
        assert!(matches!(
            err,
            OmeError::MissingRequiredAttribute { element: "AnnotationRef", attribute: "ID" }
        ));
    }
}
