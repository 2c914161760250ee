//! Reference descriptors and the reference queue.
//!
//! While parsing, every `<XyzRef ID="..."/>` element (and every settings
//! element whose `ID` attribute names another object) becomes a
//! [`ReferenceDescriptor`]. Descriptors are not resolved during parsing;
//! they wait in the [`ReferenceQueue`] until the whole document has been
//! registered, then the linker resolves them in enqueue order.

use std::fmt;

use serde::Serialize;

use super::namespaces::{OME_NS, ROI_NS, SA_NS, SPW_NS};
use super::object::ObjectRef;

/// The kind of a reference element. One variant per reference element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RefKind {
    AnnotationRef,
    ExperimenterRef,
    GroupRef,
    /// `Group/Leader`, an experimenter leading the group.
    Leader,
    /// `Group/Contact`, the group's contact experimenter.
    Contact,
    ExperimentRef,
    InstrumentRef,
    ImageRef,
    DatasetRef,
    ProjectRef,
    RoiRef,
    MicrobeamManipulationRef,
    FilterSetRef,
    ExcitationFilterRef,
    EmissionFilterRef,
    DichroicRef,
    OtfRef,
    PlateRef,
    ReagentRef,
    WellSampleRef,
    /// `Laser/Pump`, the light source pumping a laser.
    Pump,
    /// The `ID` attribute of `LightSourceSettings`.
    LightSourceSettings,
    /// The `ID` attribute of `DetectorSettings`.
    DetectorSettings,
    /// The `ID` attribute of `ObjectiveSettings`.
    ObjectiveSettings,
}

impl RefKind {
    /// Every reference kind, in schema order.
    pub const ALL: [RefKind; 24] = [
        RefKind::AnnotationRef,
        RefKind::ExperimenterRef,
        RefKind::GroupRef,
        RefKind::Leader,
        RefKind::Contact,
        RefKind::ExperimentRef,
        RefKind::InstrumentRef,
        RefKind::ImageRef,
        RefKind::DatasetRef,
        RefKind::ProjectRef,
        RefKind::RoiRef,
        RefKind::MicrobeamManipulationRef,
        RefKind::FilterSetRef,
        RefKind::ExcitationFilterRef,
        RefKind::EmissionFilterRef,
        RefKind::DichroicRef,
        RefKind::OtfRef,
        RefKind::PlateRef,
        RefKind::ReagentRef,
        RefKind::WellSampleRef,
        RefKind::Pump,
        RefKind::LightSourceSettings,
        RefKind::DetectorSettings,
        RefKind::ObjectiveSettings,
    ];

    /// The XML tag carrying this reference.
    pub fn tag(self) -> &'static str {
        match self {
            RefKind::AnnotationRef => "AnnotationRef",
            RefKind::ExperimenterRef => "ExperimenterRef",
            RefKind::GroupRef => "GroupRef",
            RefKind::Leader => "Leader",
            RefKind::Contact => "Contact",
            RefKind::ExperimentRef => "ExperimentRef",
            RefKind::InstrumentRef => "InstrumentRef",
            RefKind::ImageRef => "ImageRef",
            RefKind::DatasetRef => "DatasetRef",
            RefKind::ProjectRef => "ProjectRef",
            RefKind::RoiRef => "ROIRef",
            RefKind::MicrobeamManipulationRef => "MicrobeamManipulationRef",
            RefKind::FilterSetRef => "FilterSetRef",
            RefKind::ExcitationFilterRef => "ExcitationFilterRef",
            RefKind::EmissionFilterRef => "EmissionFilterRef",
            RefKind::DichroicRef => "DichroicRef",
            RefKind::OtfRef => "OTFRef",
            RefKind::PlateRef => "PlateRef",
            RefKind::ReagentRef => "ReagentRef",
            RefKind::WellSampleRef => "WellSampleRef",
            RefKind::Pump => "Pump",
            RefKind::LightSourceSettings => "LightSourceSettings",
            RefKind::DetectorSettings => "DetectorSettings",
            RefKind::ObjectiveSettings => "ObjectiveSettings",
        }
    }

    /// Namespace of the reference element.
    pub fn namespace(self) -> &'static str {
        match self {
            RefKind::AnnotationRef => SA_NS,
            RefKind::RoiRef => ROI_NS,
            RefKind::PlateRef | RefKind::ReagentRef | RefKind::WellSampleRef => SPW_NS,
            _ => OME_NS,
        }
    }

    /// Schema type name the target must have.
    pub fn target_type(self) -> &'static str {
        match self {
            RefKind::AnnotationRef => "Annotation",
            RefKind::ExperimenterRef | RefKind::Leader | RefKind::Contact => "Experimenter",
            RefKind::GroupRef => "Group",
            RefKind::ExperimentRef => "Experiment",
            RefKind::InstrumentRef => "Instrument",
            RefKind::ImageRef => "Image",
            RefKind::DatasetRef => "Dataset",
            RefKind::ProjectRef => "Project",
            RefKind::RoiRef => "ROI",
            RefKind::MicrobeamManipulationRef => "MicrobeamManipulation",
            RefKind::FilterSetRef => "FilterSet",
            RefKind::ExcitationFilterRef | RefKind::EmissionFilterRef => "Filter",
            RefKind::DichroicRef => "Dichroic",
            RefKind::OtfRef => "OTF",
            RefKind::PlateRef => "Plate",
            RefKind::ReagentRef => "Reagent",
            RefKind::WellSampleRef => "WellSample",
            RefKind::Pump | RefKind::LightSourceSettings => "LightSource",
            RefKind::DetectorSettings => "Detector",
            RefKind::ObjectiveSettings => "Objective",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Resolution state of a descriptor. Resolution is one-shot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DescriptorState {
    Queued,
    Resolved,
    Failed(String),
}

/// "`source` refers to the object with ID `target_id` via `kind`".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReferenceDescriptor {
    pub source: ObjectRef,
    pub kind: RefKind,
    pub target_id: String,
    pub state: DescriptorState,
}

impl ReferenceDescriptor {
    pub fn new(source: ObjectRef, kind: RefKind, target_id: impl Into<String>) -> Self {
        Self {
            source,
            kind,
            target_id: target_id.into(),
            state: DescriptorState::Queued,
        }
    }
}

/// Append-only, ordered queue of descriptors awaiting the link pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReferenceQueue {
    pub(crate) descriptors: Vec<ReferenceDescriptor>,
}

impl ReferenceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: ReferenceDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDescriptor> {
        self.descriptors.iter()
    }

    /// Descriptors that have not been through the link pass yet.
    pub fn pending(&self) -> impl Iterator<Item = &ReferenceDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.state == DescriptorState::Queued)
    }
}

/// Direction of an explicit link mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOp {
    Link,
    Unlink,
}
