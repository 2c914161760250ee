//! Instrument hardware and the per-acquisition settings that point at it.

use super::image::{Channel, Image, LightPath};
use super::keys::{Key, RefList};
use super::lexical::Lexical;
use super::linker::{expect, relate_many, relate_one, unsupported};
use super::namespaces::OME_NS;
use super::object::{
    append_children, append_ref, append_refs, new_element, Entity, ModelObject, ObjectRef,
};
use super::parse::{
    concrete_element, parse_composed, parse_composed_one, single_child, Attrs, ParseContext,
};
use super::reference::{LinkOp, RefKind};
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

/// Attributes shared by every piece of hardware.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManufacturerSpec {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub lot_number: Option<String>,
}

impl ManufacturerSpec {
    fn read(&mut self, attrs: &Attrs<'_>) {
        attrs.string("Manufacturer", &mut self.manufacturer);
        attrs.string("Model", &mut self.model);
        attrs.string("SerialNumber", &mut self.serial_number);
        attrs.string("LotNumber", &mut self.lot_number);
    }

    fn write(&self, element: &mut Element) {
        element.set_optional_attribute("Manufacturer", self.manufacturer.as_ref());
        element.set_optional_attribute("Model", self.model.as_ref());
        element.set_optional_attribute("SerialNumber", self.serial_number.as_ref());
        element.set_optional_attribute("LotNumber", self.lot_number.as_ref());
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Microscope {
    pub spec: ManufacturerSpec,
    pub microscope_type: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Instrument {
    pub id: Option<String>,
    pub microscope: Option<Microscope>,
    pub light_sources: Vec<Key<LightSource>>,
    pub detectors: Vec<Key<Detector>>,
    pub objectives: Vec<Key<Objective>>,
    pub filter_sets: Vec<Key<FilterSet>>,
    pub filters: Vec<Key<Filter>>,
    pub dichroics: Vec<Key<Dichroic>>,
    pub otfs: Vec<Key<Otf>>,
    pub(crate) images: RefList<Key<Image>>,
}

impl Instrument {
    /// Images acquired on this instrument.
    pub fn images(&self) -> &RefList<Key<Image>> {
        &self.images
    }
}

impl ModelObject for Instrument {
    const TAG: &'static str = "Instrument";
    const NAMESPACE: &'static str = OME_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        if let Some(child) = single_child(element, "Microscope", Self::TYPE_NAME)? {
            let microscope = model[key].microscope.get_or_insert_with(Microscope::default);
            let attrs = Attrs::new(child, "Microscope");
            microscope.spec.read(&attrs);
            attrs.string("Type", &mut microscope.microscope_type);
        }

        let existing = model[key].light_sources.clone();
        let light_sources = parse_composed(
            model,
            ctx,
            element
                .children
                .iter()
                .filter(|child| LightSource::accepts_tag(&child.name)),
            &existing,
        )?;
        model[key].light_sources = light_sources;

        let existing = model[key].detectors.clone();
        model[key].detectors =
            parse_composed(model, ctx, element.children_by_tag(Detector::TAG), &existing)?;
        let existing = model[key].objectives.clone();
        model[key].objectives =
            parse_composed(model, ctx, element.children_by_tag(Objective::TAG), &existing)?;
        let existing = model[key].filter_sets.clone();
        model[key].filter_sets =
            parse_composed(model, ctx, element.children_by_tag(FilterSet::TAG), &existing)?;
        let existing = model[key].filters.clone();
        model[key].filters =
            parse_composed(model, ctx, element.children_by_tag(Filter::TAG), &existing)?;
        let existing = model[key].dichroics.clone();
        model[key].dichroics =
            parse_composed(model, ctx, element.children_by_tag(Dichroic::TAG), &existing)?;
        let existing = model[key].otfs.clone();
        model[key].otfs = parse_composed(model, ctx, element.children_by_tag(Otf::TAG), &existing)?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let instrument = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", instrument.id.as_ref());
        if let Some(microscope) = &instrument.microscope {
            let mut child = Element::new("Microscope");
            microscope.spec.write(&mut child);
            child.set_optional_attribute("Type", microscope.microscope_type.as_ref());
            element.append_child(child);
        }
        append_children(model, &mut element, &instrument.light_sources);
        append_children(model, &mut element, &instrument.detectors);
        append_children(model, &mut element, &instrument.objectives);
        append_children(model, &mut element, &instrument.filter_sets);
        append_children(model, &mut element, &instrument.filters);
        append_children(model, &mut element, &instrument.dichroics);
        append_children(model, &mut element, &instrument.otfs);
        element
    }
}

#[derive(Clone, Debug, Default)]
pub struct LightSource {
    pub id: Option<String>,
    pub spec: ManufacturerSpec,
    pub power: Option<Lexical<f64>>,
    /// `None` until a concrete light source element is seen.
    pub kind: Option<LightSourceKind>,
    pub(crate) pump: Option<Key<LightSource>>,
    pub(crate) pumped_lasers: RefList<Key<LightSource>>,
    pub(crate) settings: RefList<Key<LightSourceSettings>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LightSourceKind {
    Laser(Laser),
    Filament(Filament),
    Arc(Arc),
    LightEmittingDiode,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Laser {
    pub laser_type: Option<String>,
    pub laser_medium: Option<String>,
    pub wavelength: Option<u32>,
    pub frequency_multiplication: Option<u32>,
    pub tuneable: Option<Lexical<bool>>,
    pub pulse: Option<String>,
    pub pockel_cell: Option<Lexical<bool>>,
    pub repetition_rate: Option<Lexical<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filament {
    pub filament_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arc {
    pub arc_type: Option<String>,
}

impl LightSourceKind {
    pub const TAGS: [&'static str; 4] = ["Laser", "Filament", "Arc", "LightEmittingDiode"];

    pub fn tag(&self) -> &'static str {
        match self {
            LightSourceKind::Laser(_) => "Laser",
            LightSourceKind::Filament(_) => "Filament",
            LightSourceKind::Arc(_) => "Arc",
            LightSourceKind::LightEmittingDiode => "LightEmittingDiode",
        }
    }

    fn empty_for(tag: &str) -> Option<Self> {
        match tag {
            "Laser" => Some(LightSourceKind::Laser(Laser::default())),
            "Filament" => Some(LightSourceKind::Filament(Filament::default())),
            "Arc" => Some(LightSourceKind::Arc(Arc::default())),
            "LightEmittingDiode" => Some(LightSourceKind::LightEmittingDiode),
            _ => None,
        }
    }

    fn merge(&mut self, element: &Element) -> Result<(), OmeError> {
        let attrs = Attrs::new(element, self.tag());
        match self {
            LightSourceKind::Laser(laser) => {
                attrs.string("Type", &mut laser.laser_type);
                attrs.string("LaserMedium", &mut laser.laser_medium);
                attrs.parse("Wavelength", &mut laser.wavelength)?;
                attrs.parse("FrequencyMultiplication", &mut laser.frequency_multiplication)?;
                attrs.lexical("Tuneable", &mut laser.tuneable)?;
                attrs.string("Pulse", &mut laser.pulse);
                attrs.lexical("PockelCell", &mut laser.pockel_cell)?;
                attrs.lexical("RepetitionRate", &mut laser.repetition_rate)?;
            }
            LightSourceKind::Filament(filament) => attrs.string("Type", &mut filament.filament_type),
            LightSourceKind::Arc(arc) => attrs.string("Type", &mut arc.arc_type),
            LightSourceKind::LightEmittingDiode => {}
        }
        Ok(())
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new(self.tag());
        match self {
            LightSourceKind::Laser(laser) => {
                element.set_optional_attribute("Type", laser.laser_type.as_ref());
                element.set_optional_attribute("LaserMedium", laser.laser_medium.as_ref());
                element.set_optional_attribute("Wavelength", laser.wavelength.as_ref());
                element.set_optional_attribute(
                    "FrequencyMultiplication",
                    laser.frequency_multiplication.as_ref(),
                );
                element.set_optional_attribute("Tuneable", laser.tuneable.as_ref());
                element.set_optional_attribute("Pulse", laser.pulse.as_ref());
                element.set_optional_attribute("PockelCell", laser.pockel_cell.as_ref());
                element.set_optional_attribute("RepetitionRate", laser.repetition_rate.as_ref());
            }
            LightSourceKind::Filament(filament) => {
                element.set_optional_attribute("Type", filament.filament_type.as_ref());
            }
            LightSourceKind::Arc(arc) => {
                element.set_optional_attribute("Type", arc.arc_type.as_ref());
            }
            LightSourceKind::LightEmittingDiode => {}
        }
        element
    }
}

impl LightSource {
    /// The light source pumping this laser.
    pub fn pump(&self) -> Option<Key<LightSource>> {
        self.pump
    }

    /// Lasers naming this light source as their pump.
    pub fn pumped_lasers(&self) -> &RefList<Key<LightSource>> {
        &self.pumped_lasers
    }

    pub fn settings(&self) -> &RefList<Key<LightSourceSettings>> {
        &self.settings
    }
}

impl ModelObject for LightSource {
    const TAG: &'static str = "LightSource";
    const NAMESPACE: &'static str = OME_NS;

    fn accepts_tag(tag: &str) -> bool {
        tag == Self::TAG || LightSourceKind::TAGS.contains(&tag)
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
        let concrete = concrete_element(element, Self::TAG, &LightSourceKind::TAGS)?;

        let source = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        source.spec.read(&attrs);
        attrs.lexical("Power", &mut source.power)?;

        let Some(concrete) = concrete else {
            return Ok(());
        };
        let current = source.kind.as_ref().map(LightSourceKind::tag);
        match (current, LightSourceKind::empty_for(&concrete.name)) {
            (None, Some(fresh)) => source.kind = Some(fresh),
            (Some(existing), Some(_)) if existing != concrete.name => {
                ctx.tag_mismatch(existing, &concrete.name)?;
            }
            _ => {}
        }
        if let Some(kind) = source.kind.as_mut().filter(|k| k.tag() == concrete.name) {
            kind.merge(concrete)?;
        }

        if concrete.name == "Laser" {
            ctx.enqueue_ref(concrete, "Laser", Self::object_ref(key), RefKind::Pump)?;
        }
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let source = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", source.id.as_ref());
        source.spec.write(&mut element);
        element.set_optional_attribute("Power", source.power.as_ref());
        if let Some(kind) = &source.kind {
            let mut concrete = kind.to_element();
            append_ref(model, &mut concrete, RefKind::Pump, source.pump);
            element.append_child(concrete);
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
            RefKind::Pump => {
                let target = expect::<LightSource>(model, kind, target)?;
                Ok(relate_one(model, key, target, key, op, |l| &mut l.pump, |p| &mut p.pumped_lasers))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Detector {
    pub id: Option<String>,
    pub spec: ManufacturerSpec,
    pub gain: Option<Lexical<f64>>,
    pub voltage: Option<Lexical<f64>>,
    pub offset: Option<Lexical<f64>>,
    pub zoom: Option<Lexical<f64>>,
    pub amplification_gain: Option<Lexical<f64>>,
    pub detector_type: Option<String>,
    pub(crate) settings: RefList<Key<DetectorSettings>>,
}

impl Detector {
    pub fn settings(&self) -> &RefList<Key<DetectorSettings>> {
        &self.settings
    }
}

impl ModelObject for Detector {
    const TAG: &'static str = "Detector";
    const NAMESPACE: &'static str = OME_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let detector = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        detector.spec.read(&attrs);
        attrs.lexical("Gain", &mut detector.gain)?;
        attrs.lexical("Voltage", &mut detector.voltage)?;
        attrs.lexical("Offset", &mut detector.offset)?;
        attrs.lexical("Zoom", &mut detector.zoom)?;
        attrs.lexical("AmplificationGain", &mut detector.amplification_gain)?;
        attrs.string("Type", &mut detector.detector_type);
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let detector = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", detector.id.as_ref());
        detector.spec.write(&mut element);
        element.set_optional_attribute("Gain", detector.gain.as_ref());
        element.set_optional_attribute("Voltage", detector.voltage.as_ref());
        element.set_optional_attribute("Offset", detector.offset.as_ref());
        element.set_optional_attribute("Zoom", detector.zoom.as_ref());
        element.set_optional_attribute("AmplificationGain", detector.amplification_gain.as_ref());
        element.set_optional_attribute("Type", detector.detector_type.as_ref());
        element
    }
}

#[derive(Clone, Debug, Default)]
pub struct Objective {
    pub id: Option<String>,
    pub spec: ManufacturerSpec,
    pub correction: Option<String>,
    pub immersion: Option<String>,
    pub lens_na: Option<Lexical<f64>>,
    pub nominal_magnification: Option<u32>,
    pub calibrated_magnification: Option<Lexical<f64>>,
    pub working_distance: Option<Lexical<f64>>,
    pub iris: Option<Lexical<bool>>,
    pub(crate) settings: RefList<Key<ObjectiveSettings>>,
}

impl Objective {
    pub fn settings(&self) -> &RefList<Key<ObjectiveSettings>> {
        &self.settings
    }
}

impl ModelObject for Objective {
    const TAG: &'static str = "Objective";
    const NAMESPACE: &'static str = OME_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let objective = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        objective.spec.read(&attrs);
        attrs.string("Correction", &mut objective.correction);
        attrs.string("Immersion", &mut objective.immersion);
        attrs.lexical("LensNA", &mut objective.lens_na)?;
        attrs.parse("NominalMagnification", &mut objective.nominal_magnification)?;
        attrs.lexical("CalibratedMagnification", &mut objective.calibrated_magnification)?;
        attrs.lexical("WorkingDistance", &mut objective.working_distance)?;
        attrs.lexical("Iris", &mut objective.iris)?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let objective = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", objective.id.as_ref());
        objective.spec.write(&mut element);
        element.set_optional_attribute("Correction", objective.correction.as_ref());
        element.set_optional_attribute("Immersion", objective.immersion.as_ref());
        element.set_optional_attribute("LensNA", objective.lens_na.as_ref());
        element.set_optional_attribute(
            "NominalMagnification",
            objective.nominal_magnification.as_ref(),
        );
        element.set_optional_attribute(
            "CalibratedMagnification",
            objective.calibrated_magnification.as_ref(),
        );
        element.set_optional_attribute("WorkingDistance", objective.working_distance.as_ref());
        element.set_optional_attribute("Iris", objective.iris.as_ref());
        element
    }
}

#[derive(Clone, Debug, Default)]
pub struct FilterSet {
    pub id: Option<String>,
    pub spec: ManufacturerSpec,
    pub(crate) excitation_filter_links: RefList<Key<Filter>>,
    pub(crate) dichroic: Option<Key<Dichroic>>,
    pub(crate) emission_filter_links: RefList<Key<Filter>>,
    pub(crate) channels: RefList<Key<Channel>>,
    pub(crate) otfs: RefList<Key<Otf>>,
}

impl FilterSet {
    pub fn excitation_filters(&self) -> &RefList<Key<Filter>> {
        &self.excitation_filter_links
    }

    pub fn dichroic(&self) -> Option<Key<Dichroic>> {
        self.dichroic
    }

    pub fn emission_filters(&self) -> &RefList<Key<Filter>> {
        &self.emission_filter_links
    }

    pub fn channels(&self) -> &RefList<Key<Channel>> {
        &self.channels
    }

    pub fn otfs(&self) -> &RefList<Key<Otf>> {
        &self.otfs
    }
}

impl ModelObject for FilterSet {
    const TAG: &'static str = "FilterSet";
    const NAMESPACE: &'static str = OME_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;
        model[key]
            .spec
            .read(&Attrs::new(element, Self::TYPE_NAME));

        let this = Self::object_ref(key);
        ctx.enqueue_refs(element, this, RefKind::ExcitationFilterRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::DichroicRef)?;
        ctx.enqueue_refs(element, this, RefKind::EmissionFilterRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let set = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", set.id.as_ref());
        set.spec.write(&mut element);
        append_refs(model, &mut element, RefKind::ExcitationFilterRef, &set.excitation_filter_links);
        append_ref(model, &mut element, RefKind::DichroicRef, set.dichroic);
        append_refs(model, &mut element, RefKind::EmissionFilterRef, &set.emission_filter_links);
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
            RefKind::ExcitationFilterRef => {
                let target = expect::<Filter>(model, kind, target)?;
                relate_many(
                    model,
                    key,
                    target,
                    key,
                    op,
                    |s| &mut s.excitation_filter_links,
                    |f| &mut f.excitation_filter_sets,
                )
            }
            RefKind::EmissionFilterRef => {
                let target = expect::<Filter>(model, kind, target)?;
                relate_many(
                    model,
                    key,
                    target,
                    key,
                    op,
                    |s| &mut s.emission_filter_links,
                    |f| &mut f.emission_filter_sets,
                )
            }
            RefKind::DichroicRef => {
                let target = expect::<Dichroic>(model, kind, target)?;
                relate_one(model, key, target, key, op, |s| &mut s.dichroic, |d| &mut d.filter_sets)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransmittanceRange {
    pub cut_in: Option<u32>,
    pub cut_out: Option<u32>,
    pub cut_in_tolerance: Option<u32>,
    pub cut_out_tolerance: Option<u32>,
    pub transmittance: Option<Lexical<f64>>,
}

#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub id: Option<String>,
    pub spec: ManufacturerSpec,
    pub filter_type: Option<String>,
    pub filter_wheel: Option<String>,
    pub transmittance_range: Option<TransmittanceRange>,
    pub(crate) excitation_filter_sets: RefList<Key<FilterSet>>,
    pub(crate) emission_filter_sets: RefList<Key<FilterSet>>,
    pub(crate) excitation_light_paths: RefList<Key<LightPath>>,
    pub(crate) emission_light_paths: RefList<Key<LightPath>>,
}

impl Filter {
    /// Filter sets using this filter for excitation.
    pub fn excitation_filter_sets(&self) -> &RefList<Key<FilterSet>> {
        &self.excitation_filter_sets
    }

    /// Filter sets using this filter for emission.
    pub fn emission_filter_sets(&self) -> &RefList<Key<FilterSet>> {
        &self.emission_filter_sets
    }

    pub fn excitation_light_paths(&self) -> &RefList<Key<LightPath>> {
        &self.excitation_light_paths
    }

    pub fn emission_light_paths(&self) -> &RefList<Key<LightPath>> {
        &self.emission_light_paths
    }
}

impl ModelObject for Filter {
    const TAG: &'static str = "Filter";
    const NAMESPACE: &'static str = OME_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let filter = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        filter.spec.read(&attrs);
        attrs.string("Type", &mut filter.filter_type);
        attrs.string("FilterWheel", &mut filter.filter_wheel);

        if let Some(child) = single_child(element, "TransmittanceRange", Self::TYPE_NAME)? {
            let range = filter
                .transmittance_range
                .get_or_insert_with(TransmittanceRange::default);
            let attrs = Attrs::new(child, "TransmittanceRange");
            attrs.parse("CutIn", &mut range.cut_in)?;
            attrs.parse("CutOut", &mut range.cut_out)?;
            attrs.parse("CutInTolerance", &mut range.cut_in_tolerance)?;
            attrs.parse("CutOutTolerance", &mut range.cut_out_tolerance)?;
            attrs.lexical("Transmittance", &mut range.transmittance)?;
        }
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let filter = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", filter.id.as_ref());
        filter.spec.write(&mut element);
        element.set_optional_attribute("Type", filter.filter_type.as_ref());
        element.set_optional_attribute("FilterWheel", filter.filter_wheel.as_ref());
        if let Some(range) = &filter.transmittance_range {
            let mut child = Element::new("TransmittanceRange");
            child.set_optional_attribute("CutIn", range.cut_in.as_ref());
            child.set_optional_attribute("CutOut", range.cut_out.as_ref());
            child.set_optional_attribute("CutInTolerance", range.cut_in_tolerance.as_ref());
            child.set_optional_attribute("CutOutTolerance", range.cut_out_tolerance.as_ref());
            child.set_optional_attribute("Transmittance", range.transmittance.as_ref());
            element.append_child(child);
        }
        element
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dichroic {
    pub id: Option<String>,
    pub spec: ManufacturerSpec,
    pub(crate) filter_sets: RefList<Key<FilterSet>>,
    pub(crate) light_paths: RefList<Key<LightPath>>,
}

impl Dichroic {
    pub fn filter_sets(&self) -> &RefList<Key<FilterSet>> {
        &self.filter_sets
    }

    pub fn light_paths(&self) -> &RefList<Key<LightPath>> {
        &self.light_paths
    }
}

impl ModelObject for Dichroic {
    const TAG: &'static str = "Dichroic";
    const NAMESPACE: &'static str = OME_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;
        model[key]
            .spec
            .read(&Attrs::new(element, Self::TYPE_NAME));
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let dichroic = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", dichroic.id.as_ref());
        dichroic.spec.write(&mut element);
        element
    }
}

#[derive(Clone, Debug, Default)]
pub struct Otf {
    pub id: Option<String>,
    pub pixel_type: Option<String>,
    pub size_x: Option<u32>,
    pub size_y: Option<u32>,
    pub optical_axis_averaged: Option<Lexical<bool>>,
    pub objective_settings: Option<Key<ObjectiveSettings>>,
    /// The OTF's `BinaryFile`, kept as parsed.
    pub binary_file: Option<Element>,
    pub(crate) filter_set: Option<Key<FilterSet>>,
    pub(crate) channels: RefList<Key<Channel>>,
}

impl Otf {
    pub fn filter_set(&self) -> Option<Key<FilterSet>> {
        self.filter_set
    }

    pub fn channels(&self) -> &RefList<Key<Channel>> {
        &self.channels
    }
}

impl ModelObject for Otf {
    const TAG: &'static str = "OTF";
    const NAMESPACE: &'static str = OME_NS;

    id_property!();

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        ctx.identify(model, key, element)?;

        let otf = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Type", &mut otf.pixel_type);
        attrs.parse("SizeX", &mut otf.size_x)?;
        attrs.parse("SizeY", &mut otf.size_y)?;
        attrs.lexical("OpticalAxisAveraged", &mut otf.optical_axis_averaged)?;
        if let Some(binary) = single_child(element, "BinaryFile", Self::TYPE_NAME)? {
            otf.binary_file = Some(binary.clone());
        }
        ctx.enqueue_ref(element, Self::TYPE_NAME, Self::object_ref(key), RefKind::FilterSetRef)?;

        let existing = model[key].objective_settings;
        model[key].objective_settings = parse_composed_one(
            model,
            ctx,
            element,
            ObjectiveSettings::TAG,
            Self::TYPE_NAME,
            existing,
        )?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let otf = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", otf.id.as_ref());
        element.set_optional_attribute("Type", otf.pixel_type.as_ref());
        element.set_optional_attribute("SizeX", otf.size_x.as_ref());
        element.set_optional_attribute("SizeY", otf.size_y.as_ref());
        element.set_optional_attribute("OpticalAxisAveraged", otf.optical_axis_averaged.as_ref());
        if let Some(settings) = otf.objective_settings {
            element.append_child(ObjectiveSettings::to_element(model, settings));
        }
        append_ref(model, &mut element, RefKind::FilterSetRef, otf.filter_set);
        if let Some(binary) = &otf.binary_file {
            element.append_child(binary.clone());
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
            RefKind::FilterSetRef => {
                let target = expect::<FilterSet>(model, kind, target)?;
                Ok(relate_one(model, key, target, key, op, |o| &mut o.filter_set, |s| &mut s.otfs))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

/// Reads the `ID` attribute a settings element uses to point at its
/// device. It is required unless an earlier parse already supplied it.
fn settings_target<'a>(
    element: &'a Element,
    owner: &'static str,
    slot: &mut Option<String>,
) -> Result<Option<&'a str>, OmeError> {
    match element.attribute("ID") {
        Some(id) => {
            *slot = Some(id.to_string());
            Ok(Some(id))
        }
        None if slot.is_some() => Ok(None),
        None => Err(OmeError::MissingRequiredAttribute {
            element: owner,
            attribute: "ID",
        }),
    }
}

/// The ID a settings element writes: its linked device's, else the one
/// it was parsed with.
fn settings_id<'a, T: ModelObject>(
    model: &'a Model,
    target: Option<Key<T>>,
    parsed: &'a Option<String>,
) -> Option<&'a str> {
    target
        .and_then(|key| model[key].id())
        .or(parsed.as_deref())
}

#[derive(Clone, Debug, Default)]
pub struct LightSourceSettings {
    pub attenuation: Option<Lexical<f64>>,
    pub wavelength: Option<u32>,
    pub(crate) target_id: Option<String>,
    pub(crate) light_source: Option<Key<LightSource>>,
}

impl LightSourceSettings {
    pub fn light_source(&self) -> Option<Key<LightSource>> {
        self.light_source
    }
}

impl ModelObject for LightSourceSettings {
    const TAG: &'static str = "LightSourceSettings";
    const NAMESPACE: &'static str = OME_NS;

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        let settings = &mut model[key];
        let target = settings_target(element, Self::TYPE_NAME, &mut settings.target_id)?;
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.lexical("Attenuation", &mut settings.attenuation)?;
        attrs.parse("Wavelength", &mut settings.wavelength)?;
        if let Some(id) = target {
            ctx.enqueue(Self::object_ref(key), RefKind::LightSourceSettings, id);
        }
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let settings = &model[key];
        let mut element = new_element::<Self>();
        if let Some(id) = settings_id(model, settings.light_source, &settings.target_id) {
            element.set_attribute("ID", id);
        }
        element.set_optional_attribute("Attenuation", settings.attenuation.as_ref());
        element.set_optional_attribute("Wavelength", settings.wavelength.as_ref());
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
            RefKind::LightSourceSettings => {
                let target = expect::<LightSource>(model, kind, target)?;
                Ok(relate_one(model, key, target, key, op, |s| &mut s.light_source, |l| &mut l.settings))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DetectorSettings {
    pub offset: Option<Lexical<f64>>,
    pub gain: Option<Lexical<f64>>,
    pub voltage: Option<Lexical<f64>>,
    pub read_out_rate: Option<Lexical<f64>>,
    pub binning: Option<String>,
    pub(crate) target_id: Option<String>,
    pub(crate) detector: Option<Key<Detector>>,
}

impl DetectorSettings {
    pub fn detector(&self) -> Option<Key<Detector>> {
        self.detector
    }
}

impl ModelObject for DetectorSettings {
    const TAG: &'static str = "DetectorSettings";
    const NAMESPACE: &'static str = OME_NS;

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        let settings = &mut model[key];
        let target = settings_target(element, Self::TYPE_NAME, &mut settings.target_id)?;
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.lexical("Offset", &mut settings.offset)?;
        attrs.lexical("Gain", &mut settings.gain)?;
        attrs.lexical("Voltage", &mut settings.voltage)?;
        attrs.lexical("ReadOutRate", &mut settings.read_out_rate)?;
        attrs.string("Binning", &mut settings.binning);
        if let Some(id) = target {
            ctx.enqueue(Self::object_ref(key), RefKind::DetectorSettings, id);
        }
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let settings = &model[key];
        let mut element = new_element::<Self>();
        if let Some(id) = settings_id(model, settings.detector, &settings.target_id) {
            element.set_attribute("ID", id);
        }
        element.set_optional_attribute("Offset", settings.offset.as_ref());
        element.set_optional_attribute("Gain", settings.gain.as_ref());
        element.set_optional_attribute("Voltage", settings.voltage.as_ref());
        element.set_optional_attribute("ReadOutRate", settings.read_out_rate.as_ref());
        element.set_optional_attribute("Binning", settings.binning.as_ref());
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
            RefKind::DetectorSettings => {
                let target = expect::<Detector>(model, kind, target)?;
                Ok(relate_one(model, key, target, key, op, |s| &mut s.detector, |d| &mut d.settings))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ObjectiveSettings {
    pub correction_collar: Option<Lexical<f64>>,
    pub medium: Option<String>,
    pub refractive_index: Option<Lexical<f64>>,
    pub(crate) target_id: Option<String>,
    pub(crate) objective: Option<Key<Objective>>,
}

impl ObjectiveSettings {
    pub fn objective(&self) -> Option<Key<Objective>> {
        self.objective
    }
}

impl ModelObject for ObjectiveSettings {
    const TAG: &'static str = "ObjectiveSettings";
    const NAMESPACE: &'static str = OME_NS;

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        let settings = &mut model[key];
        let target = settings_target(element, Self::TYPE_NAME, &mut settings.target_id)?;
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.lexical("CorrectionCollar", &mut settings.correction_collar)?;
        attrs.string("Medium", &mut settings.medium);
        attrs.lexical("RefractiveIndex", &mut settings.refractive_index)?;
        if let Some(id) = target {
            ctx.enqueue(Self::object_ref(key), RefKind::ObjectiveSettings, id);
        }
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let settings = &model[key];
        let mut element = new_element::<Self>();
        if let Some(id) = settings_id(model, settings.objective, &settings.target_id) {
            element.set_attribute("ID", id);
        }
        element.set_optional_attribute("CorrectionCollar", settings.correction_collar.as_ref());
        element.set_optional_attribute("Medium", settings.medium.as_ref());
        element.set_optional_attribute("RefractiveIndex", settings.refractive_index.as_ref());
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
            RefKind::ObjectiveSettings => {
                let target = expect::<Objective>(model, kind, target)?;
                Ok(relate_one(model, key, target, key, op, |s| &mut s.objective, |o| &mut o.settings))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}
