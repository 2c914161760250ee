//! Images and their pixel data description.

use super::annotation::{link_annotation, Annotation};
use super::experiment::{Dataset, Experiment, Experimenter, Group, MicrobeamManipulation};
use super::instrument::{
    DetectorSettings, Dichroic, Filter, FilterSet, Instrument, LightSourceSettings,
    ObjectiveSettings, Otf,
};
use super::keys::{Key, RefList};
use super::lexical::Lexical;
use super::linker::{expect, relate_many, relate_one, unsupported};
use super::namespaces::OME_NS;
use super::object::{
    append_children, append_ref, append_refs, append_text, new_element, Entity, ModelObject,
    ObjectRef,
};
use super::parse::{
    child_text, parse_composed, parse_composed_one, single_child, Attrs, ParseContext,
};
use super::reference::{LinkOp, RefKind};
use super::roi::Roi;
use super::spw::WellSample;
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImagingEnvironment {
    pub temperature: Option<Lexical<f64>>,
    pub air_pressure: Option<Lexical<f64>>,
    pub humidity: Option<Lexical<f64>>,
    pub co2_percent: Option<Lexical<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageLabel {
    pub name: Option<String>,
    pub x: Option<Lexical<f64>>,
    pub y: Option<Lexical<f64>>,
    pub z: Option<Lexical<f64>>,
}

#[derive(Clone, Debug, Default)]
pub struct Image {
    pub id: Option<String>,
    pub name: Option<String>,
    pub acquired_date: Option<String>,
    pub description: Option<String>,
    pub objective_settings: Option<Key<ObjectiveSettings>>,
    pub imaging_environment: Option<ImagingEnvironment>,
    pub stage_label: Option<StageLabel>,
    pub pixels: Option<Key<Pixels>>,
    pub(crate) experimenter: Option<Key<Experimenter>>,
    pub(crate) experiment: Option<Key<Experiment>>,
    pub(crate) group: Option<Key<Group>>,
    pub(crate) instrument: Option<Key<Instrument>>,
    pub(crate) dataset_links: RefList<Key<Dataset>>,
    pub(crate) roi_links: RefList<Key<Roi>>,
    pub(crate) microbeam_manipulation_links: RefList<Key<MicrobeamManipulation>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) well_samples: RefList<Key<WellSample>>,
}

impl Image {
    pub fn experimenter(&self) -> Option<Key<Experimenter>> {
        self.experimenter
    }

    pub fn experiment(&self) -> Option<Key<Experiment>> {
        self.experiment
    }

    pub fn group(&self) -> Option<Key<Group>> {
        self.group
    }

    pub fn instrument(&self) -> Option<Key<Instrument>> {
        self.instrument
    }

    pub fn datasets(&self) -> &RefList<Key<Dataset>> {
        &self.dataset_links
    }

    pub fn rois(&self) -> &RefList<Key<Roi>> {
        &self.roi_links
    }

    pub fn microbeam_manipulations(&self) -> &RefList<Key<MicrobeamManipulation>> {
        &self.microbeam_manipulation_links
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    /// Well samples showing this image.
    pub fn well_samples(&self) -> &RefList<Key<WellSample>> {
        &self.well_samples
    }
}

impl ModelObject for Image {
    const TAG: &'static str = "Image";
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

        let image = &mut model[key];
        Attrs::new(element, Self::TYPE_NAME).string("Name", &mut image.name);
        child_text(element, "AcquiredDate", Self::TYPE_NAME, &mut image.acquired_date)?;
        child_text(element, "Description", Self::TYPE_NAME, &mut image.description)?;

        if let Some(child) = single_child(element, "ImagingEnvironment", Self::TYPE_NAME)? {
            let environment = image
                .imaging_environment
                .get_or_insert_with(ImagingEnvironment::default);
            let attrs = Attrs::new(child, "ImagingEnvironment");
            attrs.lexical("Temperature", &mut environment.temperature)?;
            attrs.lexical("AirPressure", &mut environment.air_pressure)?;
            attrs.lexical("Humidity", &mut environment.humidity)?;
            attrs.lexical("CO2Percent", &mut environment.co2_percent)?;
        }
        if let Some(child) = single_child(element, "StageLabel", Self::TYPE_NAME)? {
            let label = image.stage_label.get_or_insert_with(StageLabel::default);
            let attrs = Attrs::new(child, "StageLabel");
            attrs.string("Name", &mut label.name);
            attrs.lexical("X", &mut label.x)?;
            attrs.lexical("Y", &mut label.y)?;
            attrs.lexical("Z", &mut label.z)?;
        }

        let this = Self::object_ref(key);
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::ExperimenterRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::ExperimentRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::GroupRef)?;
        ctx.enqueue_refs(element, this, RefKind::DatasetRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::InstrumentRef)?;
        ctx.enqueue_refs(element, this, RefKind::RoiRef)?;
        ctx.enqueue_refs(element, this, RefKind::MicrobeamManipulationRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)?;

        let existing = model[key].objective_settings;
        model[key].objective_settings = parse_composed_one(
            model,
            ctx,
            element,
            ObjectiveSettings::TAG,
            Self::TYPE_NAME,
            existing,
        )?;
        let existing = model[key].pixels;
        model[key].pixels =
            parse_composed_one(model, ctx, element, Pixels::TAG, Self::TYPE_NAME, existing)?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let image = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", image.id.as_ref());
        element.set_optional_attribute("Name", image.name.as_ref());
        append_text(&mut element, "AcquiredDate", image.acquired_date.as_ref());
        append_ref(model, &mut element, RefKind::ExperimenterRef, image.experimenter);
        append_text(&mut element, "Description", image.description.as_ref());
        append_ref(model, &mut element, RefKind::ExperimentRef, image.experiment);
        append_ref(model, &mut element, RefKind::GroupRef, image.group);
        append_refs(model, &mut element, RefKind::DatasetRef, &image.dataset_links);
        append_ref(model, &mut element, RefKind::InstrumentRef, image.instrument);
        if let Some(settings) = image.objective_settings {
            element.append_child(ObjectiveSettings::to_element(model, settings));
        }
        if let Some(environment) = &image.imaging_environment {
            let mut child = Element::new("ImagingEnvironment");
            child.set_optional_attribute("Temperature", environment.temperature.as_ref());
            child.set_optional_attribute("AirPressure", environment.air_pressure.as_ref());
            child.set_optional_attribute("Humidity", environment.humidity.as_ref());
            child.set_optional_attribute("CO2Percent", environment.co2_percent.as_ref());
            element.append_child(child);
        }
        if let Some(label) = &image.stage_label {
            let mut child = Element::new("StageLabel");
            child.set_optional_attribute("Name", label.name.as_ref());
            child.set_optional_attribute("X", label.x.as_ref());
            child.set_optional_attribute("Y", label.y.as_ref());
            child.set_optional_attribute("Z", label.z.as_ref());
            element.append_child(child);
        }
        if let Some(pixels) = image.pixels {
            element.append_child(Pixels::to_element(model, pixels));
        }
        append_refs(model, &mut element, RefKind::RoiRef, &image.roi_links);
        append_refs(
            model,
            &mut element,
            RefKind::MicrobeamManipulationRef,
            &image.microbeam_manipulation_links,
        );
        append_refs(model, &mut element, RefKind::AnnotationRef, &image.annotation_links);
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
            RefKind::ExperimenterRef => {
                let target = expect::<Experimenter>(model, kind, target)?;
                relate_one(model, key, target, key, op, |i| &mut i.experimenter, |e| &mut e.images)
            }
            RefKind::ExperimentRef => {
                let target = expect::<Experiment>(model, kind, target)?;
                relate_one(model, key, target, key, op, |i| &mut i.experiment, |e| &mut e.images)
            }
            RefKind::GroupRef => {
                let target = expect::<Group>(model, kind, target)?;
                relate_one(model, key, target, key, op, |i| &mut i.group, |g| &mut g.images)
            }
            RefKind::InstrumentRef => {
                let target = expect::<Instrument>(model, kind, target)?;
                relate_one(model, key, target, key, op, |i| &mut i.instrument, |x| &mut x.images)
            }
            RefKind::DatasetRef => {
                let target = expect::<Dataset>(model, kind, target)?;
                relate_many(model, key, target, key, op, |i| &mut i.dataset_links, |d| &mut d.images)
            }
            RefKind::RoiRef => {
                let target = expect::<Roi>(model, kind, target)?;
                relate_many(model, key, target, key, op, |i| &mut i.roi_links, |r| &mut r.images)
            }
            RefKind::MicrobeamManipulationRef => {
                let target = expect::<MicrobeamManipulation>(model, kind, target)?;
                relate_many(
                    model,
                    key,
                    target,
                    key,
                    op,
                    |i| &mut i.microbeam_manipulation_links,
                    |m| &mut m.images,
                )
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |i| &mut i.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

/// `UUID` child of `TiffData`: the file holding the planes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TiffUuid {
    pub file_name: Option<String>,
    pub value: Option<String>,
}

/// Where a run of planes lives inside a TIFF file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TiffData {
    pub ifd: Option<u32>,
    pub first_z: Option<u32>,
    pub first_t: Option<u32>,
    pub first_c: Option<u32>,
    pub plane_count: Option<u32>,
    pub uuid: Option<TiffUuid>,
}

impl TiffData {
    fn from_element(element: &Element) -> Result<Self, OmeError> {
        let mut data = TiffData::default();
        let attrs = Attrs::new(element, "TiffData");
        attrs.parse("IFD", &mut data.ifd)?;
        attrs.parse("FirstZ", &mut data.first_z)?;
        attrs.parse("FirstT", &mut data.first_t)?;
        attrs.parse("FirstC", &mut data.first_c)?;
        attrs.parse("PlaneCount", &mut data.plane_count)?;
        if let Some(child) = single_child(element, "UUID", "TiffData")? {
            data.uuid = Some(TiffUuid {
                file_name: child.attribute("FileName").map(str::to_string),
                value: child.text().map(str::to_string),
            });
        }
        Ok(data)
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new("TiffData");
        element.set_optional_attribute("IFD", self.ifd.as_ref());
        element.set_optional_attribute("FirstZ", self.first_z.as_ref());
        element.set_optional_attribute("FirstT", self.first_t.as_ref());
        element.set_optional_attribute("FirstC", self.first_c.as_ref());
        element.set_optional_attribute("PlaneCount", self.plane_count.as_ref());
        if let Some(uuid) = &self.uuid {
            let mut child = Element::new("UUID");
            child.set_optional_attribute("FileName", uuid.file_name.as_ref());
            child.text = uuid.value.clone();
            element.append_child(child);
        }
        element
    }
}

#[derive(Clone, Debug, Default)]
pub struct Pixels {
    pub id: Option<String>,
    pub dimension_order: Option<String>,
    pub pixel_type: Option<String>,
    pub size_x: Option<u32>,
    pub size_y: Option<u32>,
    pub size_z: Option<u32>,
    pub size_c: Option<u32>,
    pub size_t: Option<u32>,
    pub physical_size_x: Option<Lexical<f64>>,
    pub physical_size_y: Option<Lexical<f64>>,
    pub physical_size_z: Option<Lexical<f64>>,
    pub time_increment: Option<Lexical<f64>>,
    pub channels: Vec<Key<Channel>>,
    /// Inline `BinData` blocks, kept as parsed.
    pub bin_data: Vec<Element>,
    pub tiff_data: Vec<TiffData>,
    pub planes: Vec<Key<Plane>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
}

impl Pixels {
    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }
}

impl ModelObject for Pixels {
    const TAG: &'static str = "Pixels";
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

        let pixels = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("DimensionOrder", &mut pixels.dimension_order);
        attrs.string("Type", &mut pixels.pixel_type);
        attrs.parse("SizeX", &mut pixels.size_x)?;
        attrs.parse("SizeY", &mut pixels.size_y)?;
        attrs.parse("SizeZ", &mut pixels.size_z)?;
        attrs.parse("SizeC", &mut pixels.size_c)?;
        attrs.parse("SizeT", &mut pixels.size_t)?;
        attrs.lexical("PhysicalSizeX", &mut pixels.physical_size_x)?;
        attrs.lexical("PhysicalSizeY", &mut pixels.physical_size_y)?;
        attrs.lexical("PhysicalSizeZ", &mut pixels.physical_size_z)?;
        attrs.lexical("TimeIncrement", &mut pixels.time_increment)?;

        pixels
            .bin_data
            .extend(element.children_by_tag("BinData").cloned());
        for child in element.children_by_tag("TiffData") {
            pixels.tiff_data.push(TiffData::from_element(child)?);
        }
        ctx.enqueue_refs(element, Self::object_ref(key), RefKind::AnnotationRef)?;

        let existing = model[key].channels.clone();
        model[key].channels =
            parse_composed(model, ctx, element.children_by_tag(Channel::TAG), &existing)?;
        let existing = model[key].planes.clone();
        model[key].planes =
            parse_composed(model, ctx, element.children_by_tag(Plane::TAG), &existing)?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let pixels = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", pixels.id.as_ref());
        element.set_optional_attribute("DimensionOrder", pixels.dimension_order.as_ref());
        element.set_optional_attribute("Type", pixels.pixel_type.as_ref());
        element.set_optional_attribute("SizeX", pixels.size_x.as_ref());
        element.set_optional_attribute("SizeY", pixels.size_y.as_ref());
        element.set_optional_attribute("SizeZ", pixels.size_z.as_ref());
        element.set_optional_attribute("SizeC", pixels.size_c.as_ref());
        element.set_optional_attribute("SizeT", pixels.size_t.as_ref());
        element.set_optional_attribute("PhysicalSizeX", pixels.physical_size_x.as_ref());
        element.set_optional_attribute("PhysicalSizeY", pixels.physical_size_y.as_ref());
        element.set_optional_attribute("PhysicalSizeZ", pixels.physical_size_z.as_ref());
        element.set_optional_attribute("TimeIncrement", pixels.time_increment.as_ref());
        append_children(model, &mut element, &pixels.channels);
        element.children.extend(pixels.bin_data.iter().cloned());
        element
            .children
            .extend(pixels.tiff_data.iter().map(TiffData::to_element));
        append_children(model, &mut element, &pixels.planes);
        append_refs(model, &mut element, RefKind::AnnotationRef, &pixels.annotation_links);
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
pub struct Channel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub samples_per_pixel: Option<u32>,
    pub illumination_type: Option<String>,
    pub pinhole_size: Option<Lexical<f64>>,
    pub acquisition_mode: Option<String>,
    pub contrast_method: Option<String>,
    pub excitation_wavelength: Option<u32>,
    pub emission_wavelength: Option<u32>,
    pub fluor: Option<String>,
    pub nd_filter: Option<Lexical<f64>>,
    pub pockel_cell_setting: Option<i32>,
    pub color: Option<i32>,
    pub light_source_settings: Option<Key<LightSourceSettings>>,
    pub detector_settings: Option<Key<DetectorSettings>>,
    pub light_path: Option<Key<LightPath>>,
    pub(crate) otf: Option<Key<Otf>>,
    pub(crate) filter_set: Option<Key<FilterSet>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
}

impl Channel {
    pub fn otf(&self) -> Option<Key<Otf>> {
        self.otf
    }

    pub fn filter_set(&self) -> Option<Key<FilterSet>> {
        self.filter_set
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }
}

impl ModelObject for Channel {
    const TAG: &'static str = "Channel";
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

        let channel = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("Name", &mut channel.name);
        attrs.parse("SamplesPerPixel", &mut channel.samples_per_pixel)?;
        attrs.string("IlluminationType", &mut channel.illumination_type);
        attrs.lexical("PinholeSize", &mut channel.pinhole_size)?;
        attrs.string("AcquisitionMode", &mut channel.acquisition_mode);
        attrs.string("ContrastMethod", &mut channel.contrast_method);
        attrs.parse("ExcitationWavelength", &mut channel.excitation_wavelength)?;
        attrs.parse("EmissionWavelength", &mut channel.emission_wavelength)?;
        attrs.string("Fluor", &mut channel.fluor);
        attrs.lexical("NDFilter", &mut channel.nd_filter)?;
        attrs.parse("PockelCellSetting", &mut channel.pockel_cell_setting)?;
        attrs.parse("Color", &mut channel.color)?;

        let this = Self::object_ref(key);
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::OtfRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::FilterSetRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)?;

        let existing = model[key].light_source_settings;
        model[key].light_source_settings = parse_composed_one(
            model,
            ctx,
            element,
            LightSourceSettings::TAG,
            Self::TYPE_NAME,
            existing,
        )?;
        let existing = model[key].detector_settings;
        model[key].detector_settings = parse_composed_one(
            model,
            ctx,
            element,
            DetectorSettings::TAG,
            Self::TYPE_NAME,
            existing,
        )?;
        let existing = model[key].light_path;
        model[key].light_path =
            parse_composed_one(model, ctx, element, LightPath::TAG, Self::TYPE_NAME, existing)?;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let channel = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", channel.id.as_ref());
        element.set_optional_attribute("Name", channel.name.as_ref());
        element.set_optional_attribute("SamplesPerPixel", channel.samples_per_pixel.as_ref());
        element.set_optional_attribute("IlluminationType", channel.illumination_type.as_ref());
        element.set_optional_attribute("PinholeSize", channel.pinhole_size.as_ref());
        element.set_optional_attribute("AcquisitionMode", channel.acquisition_mode.as_ref());
        element.set_optional_attribute("ContrastMethod", channel.contrast_method.as_ref());
        element.set_optional_attribute(
            "ExcitationWavelength",
            channel.excitation_wavelength.as_ref(),
        );
        element.set_optional_attribute("EmissionWavelength", channel.emission_wavelength.as_ref());
        element.set_optional_attribute("Fluor", channel.fluor.as_ref());
        element.set_optional_attribute("NDFilter", channel.nd_filter.as_ref());
        element.set_optional_attribute("PockelCellSetting", channel.pockel_cell_setting.as_ref());
        element.set_optional_attribute("Color", channel.color.as_ref());

        if let Some(settings) = channel.light_source_settings {
            element.append_child(LightSourceSettings::to_element(model, settings));
        }
        append_ref(model, &mut element, RefKind::OtfRef, channel.otf);
        if let Some(settings) = channel.detector_settings {
            element.append_child(DetectorSettings::to_element(model, settings));
        }
        append_ref(model, &mut element, RefKind::FilterSetRef, channel.filter_set);
        append_refs(model, &mut element, RefKind::AnnotationRef, &channel.annotation_links);
        if let Some(path) = channel.light_path {
            element.append_child(LightPath::to_element(model, path));
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
        Ok(match kind {
            RefKind::OtfRef => {
                let target = expect::<Otf>(model, kind, target)?;
                relate_one(model, key, target, key, op, |c| &mut c.otf, |o| &mut o.channels)
            }
            RefKind::FilterSetRef => {
                let target = expect::<FilterSet>(model, kind, target)?;
                relate_one(model, key, target, key, op, |c| &mut c.filter_set, |s| &mut s.channels)
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |c| &mut c.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

/// One plane of the pixel block. Planes carry no ID, so re-parsing a
/// `Pixels` element appends its planes again.
#[derive(Clone, Debug, Default)]
pub struct Plane {
    pub the_z: Option<u32>,
    pub the_t: Option<u32>,
    pub the_c: Option<u32>,
    pub delta_t: Option<Lexical<f64>>,
    pub exposure_time: Option<Lexical<f64>>,
    pub position_x: Option<Lexical<f64>>,
    pub position_y: Option<Lexical<f64>>,
    pub position_z: Option<Lexical<f64>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
}

impl Plane {
    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }
}

impl ModelObject for Plane {
    const TAG: &'static str = "Plane";
    const NAMESPACE: &'static str = OME_NS;

    fn update(
        model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;

        let plane = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.parse("TheZ", &mut plane.the_z)?;
        attrs.parse("TheT", &mut plane.the_t)?;
        attrs.parse("TheC", &mut plane.the_c)?;
        attrs.lexical("DeltaT", &mut plane.delta_t)?;
        attrs.lexical("ExposureTime", &mut plane.exposure_time)?;
        attrs.lexical("PositionX", &mut plane.position_x)?;
        attrs.lexical("PositionY", &mut plane.position_y)?;
        attrs.lexical("PositionZ", &mut plane.position_z)?;

        ctx.enqueue_refs(element, Self::object_ref(key), RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let plane = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("TheZ", plane.the_z.as_ref());
        element.set_optional_attribute("TheT", plane.the_t.as_ref());
        element.set_optional_attribute("TheC", plane.the_c.as_ref());
        element.set_optional_attribute("DeltaT", plane.delta_t.as_ref());
        element.set_optional_attribute("ExposureTime", plane.exposure_time.as_ref());
        element.set_optional_attribute("PositionX", plane.position_x.as_ref());
        element.set_optional_attribute("PositionY", plane.position_y.as_ref());
        element.set_optional_attribute("PositionZ", plane.position_z.as_ref());
        append_refs(model, &mut element, RefKind::AnnotationRef, &plane.annotation_links);
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
pub struct LightPath {
    pub(crate) excitation_filter_links: RefList<Key<Filter>>,
    pub(crate) dichroic: Option<Key<Dichroic>>,
    pub(crate) emission_filter_links: RefList<Key<Filter>>,
}

impl LightPath {
    pub fn excitation_filters(&self) -> &RefList<Key<Filter>> {
        &self.excitation_filter_links
    }

    pub fn dichroic(&self) -> Option<Key<Dichroic>> {
        self.dichroic
    }

    pub fn emission_filters(&self) -> &RefList<Key<Filter>> {
        &self.emission_filter_links
    }
}

impl ModelObject for LightPath {
    const TAG: &'static str = "LightPath";
    const NAMESPACE: &'static str = OME_NS;

    fn update(
        _model: &mut Model,
        key: Key<Self>,
        element: &Element,
        ctx: &mut ParseContext,
    ) -> Result<(), OmeError> {
        ctx.check_tag::<Self>(element)?;
        let this = Self::object_ref(key);
        ctx.enqueue_refs(element, this, RefKind::ExcitationFilterRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::DichroicRef)?;
        ctx.enqueue_refs(element, this, RefKind::EmissionFilterRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let path = &model[key];
        let mut element = new_element::<Self>();
        append_refs(model, &mut element, RefKind::ExcitationFilterRef, &path.excitation_filter_links);
        append_ref(model, &mut element, RefKind::DichroicRef, path.dichroic);
        append_refs(model, &mut element, RefKind::EmissionFilterRef, &path.emission_filter_links);
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
                    |p| &mut p.excitation_filter_links,
                    |f| &mut f.excitation_light_paths,
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
                    |p| &mut p.emission_filter_links,
                    |f| &mut f.emission_light_paths,
                )
            }
            RefKind::DichroicRef => {
                let target = expect::<Dichroic>(model, kind, target)?;
                relate_one(model, key, target, key, op, |p| &mut p.dichroic, |d| &mut d.light_paths)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resolve_all;

    const OME: &str = "http://www.openmicroscopy.org/Schemas/OME/2010-04";

    fn parse_image(body: &str) -> (Model, ParseContext, Key<Image>) {
        let xml = format!(r#"<Image xmlns="{OME}" ID="Image:0">{body}</Image>"#);
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let element = Element::from_xml_str(&xml).expect("xml");
        let image = model.parse::<Image>(&element, &mut ctx).expect("parse");
        (model, ctx, image)
    }

    #[test]
    fn channels_keep_document_order() {
        let (model, _, image) = parse_image(
            r#"<Pixels ID="Pixels:0" SizeC="3">
                 <Channel ID="Channel:2" Name="c"/>
                 <Channel ID="Channel:0" Name="a"/>
                 <Channel ID="Channel:1" Name="b"/>
               </Pixels>"#,
        );
        let pixels = model[image].pixels.unwrap();
        let names: Vec<_> = model[pixels]
            .channels
            .iter()
            .map(|c| model[*c].name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn second_pixels_element_is_a_cardinality_violation() {
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let element = Element::from_xml_str(
            r#"<Image ID="Image:0"><Pixels ID="Pixels:0"/><Pixels ID="Pixels:1"/></Image>"#,
        )
        .unwrap();
        assert!(matches!(
            model.parse::<Image>(&element, &mut ctx),
            Err(OmeError::CardinalityViolation { parent: "Image", count: 2, .. })
        ));
    }

    #[test]
    fn missing_id_is_rejected() {
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let element = Element::from_xml_str(r#"<Channel Name="x"/>"#).unwrap();
        assert!(matches!(
            model.parse::<Channel>(&element, &mut ctx),
            Err(OmeError::MissingRequiredAttribute { element: "Channel", attribute: "ID" })
        ));
    }

    #[test]
    fn update_without_id_keeps_existing_identity() {
        let (mut model, mut ctx, image) = parse_image("");
        let rename = Element::from_xml_str(r#"<Image Name="renamed"/>"#).unwrap();
        model.update(image, &rename, &mut ctx).unwrap();
        assert_eq!(model[image].id.as_deref(), Some("Image:0"));
        assert_eq!(model[image].name.as_deref(), Some("renamed"));
    }

    #[test]
    fn otf_ref_to_wrong_type_is_a_mismatch() {
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let root = Element::from_xml_str(&format!(
            r#"<OME xmlns="{OME}">
                 <Dataset ID="Dataset:0"/>
                 <Image ID="Image:0">
                   <Pixels ID="Pixels:0">
                     <Channel ID="Channel:0"><OTFRef ID="Dataset:0"/></Channel>
                   </Pixels>
                 </Image>
               </OME>"#
        ))
        .unwrap();
        model.parse_document(&root, &mut ctx).unwrap();
        let err = resolve_all(&mut model, &mut ctx.queue, &ctx.registry).unwrap_err();
        match err {
            OmeError::ReferenceTypeMismatch { kind, id, expected, found } => {
                assert_eq!(kind, RefKind::OtfRef);
                assert_eq!(id, "Dataset:0");
                assert_eq!(expected, "OTF");
                assert_eq!(found, "Dataset");
            }
            other => panic!("expected ReferenceTypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn tiff_data_and_planes_append_on_reparse() {
        let body = r#"<Pixels ID="Pixels:0">
                 <TiffData IFD="0" PlaneCount="1"><UUID FileName="a.tif">urn:uuid:1</UUID></TiffData>
                 <Plane TheZ="0" TheT="0" TheC="0"/>
               </Pixels>"#;
        let (mut model, mut ctx, image) = parse_image(body);
        let pixels = model[image].pixels.unwrap();
        let again = Element::from_xml_str(&format!(r#"<Image ID="Image:0">{body}</Image>"#)).unwrap();
        model.update(image, &again, &mut ctx).unwrap();

        assert_eq!(model[image].pixels, Some(pixels));
        assert_eq!(model[pixels].planes.len(), 2);
        assert_eq!(model[pixels].tiff_data.len(), 2);
        assert_eq!(
            model[pixels].tiff_data[0].uuid.as_ref().and_then(|u| u.value.as_deref()),
            Some("urn:uuid:1")
        );
    }
}
