//! The OME-XML 2010-04 object model.
//!
//! A [`Model`] owns every object of a document in per-type arenas; objects
//! refer to each other through typed [`Key`]s. Parsing is two-phase:
//! [`Model::parse_document`] builds objects, registers IDs and queues
//! references; [`resolve_all`] then links the queue against the registry.

/// `id`/`set_id` for types with an `id: Option<String>` field.
macro_rules! id_property {
    () => {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    };
}

mod annotation;
mod experiment;
mod image;
mod instrument;
mod keys;
mod lexical;
mod linker;
pub mod namespaces;
mod object;
mod ome;
mod parse;
mod reference;
mod registry;
mod report;
mod roi;
mod spw;

use std::ops::{Index, IndexMut};

pub use annotation::{Annotation, AnnotationValue, BinaryFile};
pub use experiment::{Dataset, Experiment, Experimenter, Group, MicrobeamManipulation, Project};
pub use image::{
    Channel, Image, ImagingEnvironment, LightPath, Pixels, Plane, StageLabel, TiffData, TiffUuid,
};
pub use instrument::{
    Arc, Detector, DetectorSettings, Dichroic, Filament, Filter, FilterSet, Instrument, Laser,
    LightSource, LightSourceKind, LightSourceSettings, ManufacturerSpec, Microscope, Objective,
    ObjectiveSettings, Otf, TransmittanceRange,
};
pub use keys::{Arena, Key, RefList};
pub use lexical::{Lexical, LexicalValue};
pub use linker::resolve_all;
pub use object::{Entity, ModelObject, ObjectRef};
pub use ome::{Ome, StructuredAnnotations};
pub use parse::{MismatchPolicy, ParseContext, ParseOptions};
pub use reference::{DescriptorState, LinkOp, RefKind, ReferenceDescriptor, ReferenceQueue};
pub use registry::{DuplicateIdPolicy, Registration, Registry};
pub use report::{IssueCode, ParseIssue, ParseReport};
pub use roi::{Roi, Shape, ShapeGeometry};
pub use spw::{Plate, PlateAcquisition, Reagent, Screen, Well, WellSample};

use crate::dom::Element;
use crate::error::OmeError;
use object::Arenas;

/// All objects of one document plus its root.
#[derive(Clone, Debug, Default)]
pub struct Model {
    /// The `OME` root element's content.
    pub root: Ome,
    pub(crate) arenas: Arenas,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a detached object and returns its key.
    pub fn alloc<T: Entity>(&mut self, value: T) -> Key<T> {
        T::arena_mut(self).alloc(value)
    }

    pub fn get<T: Entity>(&self, key: Key<T>) -> Option<&T> {
        T::arena(self).get(key)
    }

    /// All objects of type `T`, in creation order.
    pub fn iter<T: Entity>(&self) -> impl Iterator<Item = (Key<T>, &T)> {
        T::arena(self).iter()
    }

    pub fn count<T: Entity>(&self) -> usize {
        T::arena(self).len()
    }

    /// Builds a new `T` from `element`.
    ///
    /// References found in the subtree are queued on `ctx`; call
    /// [`resolve_all`] once the whole document has been parsed.
    pub fn parse<T: ModelObject>(
        &mut self,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<Key<T>, OmeError> {
        let key = self.alloc(T::default());
        T::update(self, key, element, ctx)?;
        Ok(key)
    }

    /// Merges `element` into an existing object.
    pub fn update<T: ModelObject>(
        &mut self,
        key: Key<T>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        T::update(self, key, element, ctx)
    }

    pub fn to_element<T: ModelObject>(&self, key: Key<T>) -> Element {
        T::to_element(self, key)
    }

    /// Looks up an object by ID and checks its type.
    pub fn lookup<T: Entity>(&self, registry: &Registry, id: &str) -> Option<Key<T>> {
        registry.resolve(id).and_then(T::from_object_ref)
    }

    /// Adds a reference of `kind` from `source` to `target`, with its back
    /// reference. Returns false if the forward edge already existed.
    pub fn link(
        &mut self,
        source: ObjectRef,
        kind: RefKind,
        target: ObjectRef,
    ) -> Result<bool, OmeError> {
        self.dispatch_relate(source, kind, target, LinkOp::Link)
    }

    /// Removes a reference and its back reference. Returns false if the
    /// edge was not present.
    pub fn unlink(
        &mut self,
        source: ObjectRef,
        kind: RefKind,
        target: ObjectRef,
    ) -> Result<bool, OmeError> {
        self.dispatch_relate(source, kind, target, LinkOp::Unlink)
    }

    /// `Type 'ID'`, for messages.
    pub fn describe(&self, object: ObjectRef) -> String {
        match self.id_of(object) {
            Some(id) => format!("{} '{}'", object.type_name(), id),
            None => format!("{} #{}", object.type_name(), object.index()),
        }
    }
}

impl<T: Entity> Index<Key<T>> for Model {
    type Output = T;

    fn index(&self, key: Key<T>) -> &T {
        &T::arena(self)[key]
    }
}

impl<T: Entity> IndexMut<Key<T>> for Model {
    fn index_mut(&mut self, key: Key<T>) -> &mut T {
        &mut T::arena_mut(self)[key]
    }
}
