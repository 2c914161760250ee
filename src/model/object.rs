//! The model-object abstraction.
//!
//! [`Entity`] is the arena plumbing shared by all object types and is
//! generated by [`model_objects!`]. [`ModelObject`] is the behaviour each
//! type implements by hand: parse itself from an element, write itself
//! back, and accept resolved references.

use serde::Serialize;

use super::annotation::Annotation;
use super::experiment::{Dataset, Experiment, Experimenter, Group, MicrobeamManipulation, Project};
use super::image::{Channel, Image, LightPath, Pixels, Plane};
use super::instrument::{
    Detector, DetectorSettings, Dichroic, Filter, FilterSet, Instrument, LightSource,
    LightSourceSettings, Objective, ObjectiveSettings, Otf,
};
use super::keys::{Arena, Key, RefList};
use super::linker::unsupported;
use super::parse::ParseContext;
use super::reference::{LinkOp, RefKind};
use super::roi::{Roi, Shape};
use super::spw::{Plate, PlateAcquisition, Reagent, Screen, Well, WellSample};
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

/// Arena plumbing for a model object type.
pub trait Entity: Sized + 'static {
    /// Schema type name, e.g. `"Channel"` or `"ROI"`.
    const TYPE_NAME: &'static str;

    fn arena(model: &Model) -> &Arena<Self>;
    fn arena_mut(model: &mut Model) -> &mut Arena<Self>;
    fn object_ref(key: Key<Self>) -> ObjectRef;
    fn from_object_ref(object: ObjectRef) -> Option<Key<Self>>;
}

/// A schema-defined entity that can be built from, and written to, XML.
pub trait ModelObject: Entity + Default {
    /// Element name the type is written as.
    const TAG: &'static str;
    /// Namespace of that element.
    const NAMESPACE: &'static str;

    /// Whether an element with this tag may be parsed as this type.
    fn accepts_tag(tag: &str) -> bool {
        tag == Self::TAG
    }

    /// The document ID, for types that carry one.
    fn id(&self) -> Option<&str> {
        None
    }

    fn set_id(&mut self, _id: String) {}

    /// Merges `element` into the object at `key`.
    ///
    /// Scalar properties present in the element overwrite existing values;
    /// absent ones are left alone. Composed children are appended (or
    /// merged by ID) and reference elements are queued on `ctx`, never
    /// resolved here.
    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError>;

    /// Writes the object as an element. References become bare `XyzRef`
    /// elements carrying only the target's ID.
    fn to_element(model: &Model, key: Key<Self>) -> Element;

    /// Applies (or removes) a resolved reference of kind `kind` from the
    /// object at `key` to `target`, updating the target's back reference
    /// in the same step. Returns whether the forward side changed.
    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        let _ = (model, key, target, op);
        Err(unsupported::<Self>(kind))
    }
}

macro_rules! model_objects {
    ($($variant:ident($ty:ident, $name:literal) in $field:ident;)+) => {
        /// Handle to any object in a [`Model`], tagged with its type.
        ///
        /// This is what the registry stores and what reference descriptors
        /// use as their source.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
        pub enum ObjectRef {
            $($variant(Key<$ty>),)+
        }

        impl ObjectRef {
            /// Schema type name of the referenced object.
            pub fn type_name(self) -> &'static str {
                match self {
                    $(ObjectRef::$variant(_) => $name,)+
                }
            }

            /// Position of the object in its type's arena.
            pub fn index(self) -> usize {
                match self {
                    $(ObjectRef::$variant(key) => key.index(),)+
                }
            }

            /// Checked downcast to a concrete key type.
            pub fn downcast<T: Entity>(self) -> Option<Key<T>> {
                T::from_object_ref(self)
            }
        }

        #[derive(Clone, Debug, Default)]
        pub(crate) struct Arenas {
            $(pub(crate) $field: Arena<$ty>,)+
        }

        $(
            impl Entity for $ty {
                const TYPE_NAME: &'static str = $name;

                fn arena(model: &Model) -> &Arena<Self> {
                    &model.arenas.$field
                }

                fn arena_mut(model: &mut Model) -> &mut Arena<Self> {
                    &mut model.arenas.$field
                }

                fn object_ref(key: Key<Self>) -> ObjectRef {
                    ObjectRef::$variant(key)
                }

                fn from_object_ref(object: ObjectRef) -> Option<Key<Self>> {
                    match object {
                        ObjectRef::$variant(key) => Some(key),
                        _ => None,
                    }
                }
            }
        )+

        impl Model {
            pub(crate) fn dispatch_relate(
                &mut self,
                source: ObjectRef,
                kind: RefKind,
                target: ObjectRef,
                op: LinkOp,
            ) -> Result<bool, OmeError> {
                match source {
                    $(ObjectRef::$variant(key) => <$ty as ModelObject>::relate(self, key, kind, target, op),)+
                }
            }

            /// The document ID of any object, if it has one.
            pub fn id_of(&self, object: ObjectRef) -> Option<&str> {
                match object {
                    $(ObjectRef::$variant(key) => self.arenas.$field.get(key).and_then(ModelObject::id),)+
                }
            }

            /// Number of objects of each type, in declaration order.
            pub fn object_counts(&self) -> Vec<(&'static str, usize)> {
                vec![$(($name, self.arenas.$field.len()),)+]
            }
        }
    };
}

model_objects! {
    Project(Project, "Project") in projects;
    Dataset(Dataset, "Dataset") in datasets;
    Experiment(Experiment, "Experiment") in experiments;
    MicrobeamManipulation(MicrobeamManipulation, "MicrobeamManipulation") in microbeam_manipulations;
    Experimenter(Experimenter, "Experimenter") in experimenters;
    Group(Group, "Group") in groups;
    Instrument(Instrument, "Instrument") in instruments;
    LightSource(LightSource, "LightSource") in light_sources;
    Detector(Detector, "Detector") in detectors;
    Objective(Objective, "Objective") in objectives;
    FilterSet(FilterSet, "FilterSet") in filter_sets;
    Filter(Filter, "Filter") in filters;
    Dichroic(Dichroic, "Dichroic") in dichroics;
    Otf(Otf, "OTF") in otfs;
    LightSourceSettings(LightSourceSettings, "LightSourceSettings") in light_source_settings;
    DetectorSettings(DetectorSettings, "DetectorSettings") in detector_settings;
    ObjectiveSettings(ObjectiveSettings, "ObjectiveSettings") in objective_settings;
    Image(Image, "Image") in images;
    Pixels(Pixels, "Pixels") in pixels;
    Channel(Channel, "Channel") in channels;
    Plane(Plane, "Plane") in planes;
    LightPath(LightPath, "LightPath") in light_paths;
    Plate(Plate, "Plate") in plates;
    Well(Well, "Well") in wells;
    WellSample(WellSample, "WellSample") in well_samples;
    PlateAcquisition(PlateAcquisition, "PlateAcquisition") in plate_acquisitions;
    Screen(Screen, "Screen") in screens;
    Reagent(Reagent, "Reagent") in reagents;
    Roi(Roi, "ROI") in rois;
    Shape(Shape, "Shape") in shapes;
    Annotation(Annotation, "Annotation") in annotations;
}

/// Creates the element for `T` in its own namespace.
pub(crate) fn new_element<T: ModelObject>() -> Element {
    Element::with_namespace(T::TAG, T::NAMESPACE)
}

/// A minimal `XyzRef` element pointing at `id`.
pub(crate) fn ref_element(kind: RefKind, id: &str) -> Element {
    let mut element = Element::with_namespace(kind.tag(), kind.namespace());
    element.set_attribute("ID", id);
    element
}

fn target_id<T: ModelObject>(model: &Model, key: Key<T>) -> &str {
    model[key].id().unwrap_or_default()
}

/// Appends a ref element for a singular reference, if set.
pub(crate) fn append_ref<T: ModelObject>(
    model: &Model,
    element: &mut Element,
    kind: RefKind,
    target: Option<Key<T>>,
) {
    if let Some(target) = target {
        element.append_child(ref_element(kind, target_id(model, target)));
    }
}

/// Appends one ref element per entry, in stored order.
pub(crate) fn append_refs<T: ModelObject>(
    model: &Model,
    element: &mut Element,
    kind: RefKind,
    targets: &RefList<Key<T>>,
) {
    for target in targets.iter() {
        element.append_child(ref_element(kind, target_id(model, target)));
    }
}

/// Appends each composed child's element.
pub(crate) fn append_children<T: ModelObject>(
    model: &Model,
    element: &mut Element,
    children: &[Key<T>],
) {
    for child in children {
        element.append_child(T::to_element(model, *child));
    }
}

/// Appends a text-only child element when a value is present.
pub(crate) fn append_text<T: ToString>(element: &mut Element, tag: &str, value: Option<&T>) {
    if let Some(value) = value {
        element.append_child(Element::text_element(tag, value.to_string()));
    }
}
