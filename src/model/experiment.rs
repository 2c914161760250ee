//! People, groups and the organisational containers: projects, datasets
//! and experiments.

use super::annotation::{link_annotation, Annotation};
use super::image::Image;
use super::instrument::LightSourceSettings;
use super::keys::{Key, RefList};
use super::linker::{expect, relate_many, relate_one, unsupported};
use super::namespaces::OME_NS;
use super::object::{
    append_children, append_ref, append_refs, append_text, new_element, Entity, ModelObject,
    ObjectRef,
};
use super::parse::{child_text, parse_composed, Attrs, ParseContext};
use super::reference::{LinkOp, RefKind};
use super::roi::Roi;
use super::Model;
use crate::dom::Element;
use crate::error::OmeError;

#[derive(Clone, Debug, Default)]
pub struct Project {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub(crate) experimenter: Option<Key<Experimenter>>,
    pub(crate) group: Option<Key<Group>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) datasets: RefList<Key<Dataset>>,
}

impl Project {
    pub fn experimenter(&self) -> Option<Key<Experimenter>> {
        self.experimenter
    }

    pub fn group(&self) -> Option<Key<Group>> {
        self.group
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    /// Datasets that list this project.
    pub fn datasets(&self) -> &RefList<Key<Dataset>> {
        &self.datasets
    }
}

impl ModelObject for Project {
    const TAG: &'static str = "Project";
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

        let project = &mut model[key];
        Attrs::new(element, Self::TYPE_NAME).string("Name", &mut project.name);
        child_text(element, "Description", Self::TYPE_NAME, &mut project.description)?;

        let this = Self::object_ref(key);
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::ExperimenterRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::GroupRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let project = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", project.id.as_ref());
        element.set_optional_attribute("Name", project.name.as_ref());
        append_text(&mut element, "Description", project.description.as_ref());
        append_ref(model, &mut element, RefKind::ExperimenterRef, project.experimenter);
        append_ref(model, &mut element, RefKind::GroupRef, project.group);
        append_refs(model, &mut element, RefKind::AnnotationRef, &project.annotation_links);
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
                relate_one(model, key, target, key, op, |p| &mut p.experimenter, |e| &mut e.projects)
            }
            RefKind::GroupRef => {
                let target = expect::<Group>(model, kind, target)?;
                relate_one(model, key, target, key, op, |p| &mut p.group, |g| &mut g.projects)
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |p| &mut p.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub(crate) experimenter: Option<Key<Experimenter>>,
    pub(crate) group: Option<Key<Group>>,
    pub(crate) project_links: RefList<Key<Project>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) images: RefList<Key<Image>>,
}

impl Dataset {
    pub fn experimenter(&self) -> Option<Key<Experimenter>> {
        self.experimenter
    }

    pub fn group(&self) -> Option<Key<Group>> {
        self.group
    }

    pub fn projects(&self) -> &RefList<Key<Project>> {
        &self.project_links
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    /// Images that list this dataset.
    pub fn images(&self) -> &RefList<Key<Image>> {
        &self.images
    }
}

impl ModelObject for Dataset {
    const TAG: &'static str = "Dataset";
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

        let dataset = &mut model[key];
        Attrs::new(element, Self::TYPE_NAME).string("Name", &mut dataset.name);
        child_text(element, "Description", Self::TYPE_NAME, &mut dataset.description)?;

        let this = Self::object_ref(key);
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::ExperimenterRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::GroupRef)?;
        ctx.enqueue_refs(element, this, RefKind::ProjectRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let dataset = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", dataset.id.as_ref());
        element.set_optional_attribute("Name", dataset.name.as_ref());
        append_text(&mut element, "Description", dataset.description.as_ref());
        append_ref(model, &mut element, RefKind::ExperimenterRef, dataset.experimenter);
        append_ref(model, &mut element, RefKind::GroupRef, dataset.group);
        append_refs(model, &mut element, RefKind::ProjectRef, &dataset.project_links);
        append_refs(model, &mut element, RefKind::AnnotationRef, &dataset.annotation_links);
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
                relate_one(model, key, target, key, op, |d| &mut d.experimenter, |e| &mut e.datasets)
            }
            RefKind::GroupRef => {
                let target = expect::<Group>(model, kind, target)?;
                relate_one(model, key, target, key, op, |d| &mut d.group, |g| &mut g.datasets)
            }
            RefKind::ProjectRef => {
                let target = expect::<Project>(model, kind, target)?;
                relate_many(model, key, target, key, op, |d| &mut d.project_links, |p| &mut p.datasets)
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |d| &mut d.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Experiment {
    pub id: Option<String>,
    pub experiment_type: Option<String>,
    pub description: Option<String>,
    pub microbeam_manipulations: Vec<Key<MicrobeamManipulation>>,
    pub(crate) experimenter: Option<Key<Experimenter>>,
    pub(crate) images: RefList<Key<Image>>,
}

impl Experiment {
    pub fn experimenter(&self) -> Option<Key<Experimenter>> {
        self.experimenter
    }

    pub fn images(&self) -> &RefList<Key<Image>> {
        &self.images
    }
}

impl ModelObject for Experiment {
    const TAG: &'static str = "Experiment";
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

        let experiment = &mut model[key];
        Attrs::new(element, Self::TYPE_NAME).string("Type", &mut experiment.experiment_type);
        child_text(element, "Description", Self::TYPE_NAME, &mut experiment.description)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, Self::object_ref(key), RefKind::ExperimenterRef)?;

        let existing = model[key].microbeam_manipulations.clone();
        let manipulations = parse_composed(
            model,
            ctx,
            element.children_by_tag(MicrobeamManipulation::TAG),
            &existing,
        )?;
        model[key].microbeam_manipulations = manipulations;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let experiment = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", experiment.id.as_ref());
        element.set_optional_attribute("Type", experiment.experiment_type.as_ref());
        append_text(&mut element, "Description", experiment.description.as_ref());
        append_ref(model, &mut element, RefKind::ExperimenterRef, experiment.experimenter);
        append_children(model, &mut element, &experiment.microbeam_manipulations);
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
            RefKind::ExperimenterRef => {
                let target = expect::<Experimenter>(model, kind, target)?;
                Ok(relate_one(model, key, target, key, op, |x| &mut x.experimenter, |e| &mut e.experiments))
            }
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MicrobeamManipulation {
    pub id: Option<String>,
    pub manipulation_type: Option<String>,
    pub light_source_settings: Vec<Key<LightSourceSettings>>,
    pub(crate) roi_links: RefList<Key<Roi>>,
    pub(crate) experimenter: Option<Key<Experimenter>>,
    pub(crate) images: RefList<Key<Image>>,
}

impl MicrobeamManipulation {
    pub fn rois(&self) -> &RefList<Key<Roi>> {
        &self.roi_links
    }

    pub fn experimenter(&self) -> Option<Key<Experimenter>> {
        self.experimenter
    }

    pub fn images(&self) -> &RefList<Key<Image>> {
        &self.images
    }
}

impl ModelObject for MicrobeamManipulation {
    const TAG: &'static str = "MicrobeamManipulation";
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

        Attrs::new(element, Self::TYPE_NAME).string("Type", &mut model[key].manipulation_type);

        let this = Self::object_ref(key);
        ctx.enqueue_refs(element, this, RefKind::RoiRef)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::ExperimenterRef)?;

        let existing = model[key].light_source_settings.clone();
        let settings = parse_composed(
            model,
            ctx,
            element.children_by_tag(LightSourceSettings::TAG),
            &existing,
        )?;
        model[key].light_source_settings = settings;
        Ok(())
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let manipulation = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", manipulation.id.as_ref());
        element.set_optional_attribute("Type", manipulation.manipulation_type.as_ref());
        append_refs(model, &mut element, RefKind::RoiRef, &manipulation.roi_links);
        append_ref(model, &mut element, RefKind::ExperimenterRef, manipulation.experimenter);
        append_children(model, &mut element, &manipulation.light_source_settings);
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
            RefKind::RoiRef => {
                let target = expect::<Roi>(model, kind, target)?;
                relate_many(model, key, target, key, op, |m| &mut m.roi_links, |r| &mut r.microbeam_manipulations)
            }
            RefKind::ExperimenterRef => {
                let target = expect::<Experimenter>(model, kind, target)?;
                relate_one(model, key, target, key, op, |m| &mut m.experimenter, |e| &mut e.microbeam_manipulations)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Experimenter {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub institution: Option<String>,
    pub user_name: Option<String>,
    pub(crate) group_links: RefList<Key<Group>>,
    pub(crate) annotation_links: RefList<Key<Annotation>>,
    pub(crate) images: RefList<Key<Image>>,
    pub(crate) datasets: RefList<Key<Dataset>>,
    pub(crate) projects: RefList<Key<Project>>,
    pub(crate) experiments: RefList<Key<Experiment>>,
    pub(crate) microbeam_manipulations: RefList<Key<MicrobeamManipulation>>,
    pub(crate) led_groups: RefList<Key<Group>>,
    pub(crate) contact_groups: RefList<Key<Group>>,
}

impl Experimenter {
    pub fn groups(&self) -> &RefList<Key<Group>> {
        &self.group_links
    }

    pub fn annotations(&self) -> &RefList<Key<Annotation>> {
        &self.annotation_links
    }

    pub fn images(&self) -> &RefList<Key<Image>> {
        &self.images
    }

    pub fn datasets(&self) -> &RefList<Key<Dataset>> {
        &self.datasets
    }

    pub fn projects(&self) -> &RefList<Key<Project>> {
        &self.projects
    }

    pub fn experiments(&self) -> &RefList<Key<Experiment>> {
        &self.experiments
    }

    pub fn microbeam_manipulations(&self) -> &RefList<Key<MicrobeamManipulation>> {
        &self.microbeam_manipulations
    }

    /// Groups naming this experimenter as `Leader`.
    pub fn led_groups(&self) -> &RefList<Key<Group>> {
        &self.led_groups
    }

    /// Groups naming this experimenter as `Contact`.
    pub fn contact_groups(&self) -> &RefList<Key<Group>> {
        &self.contact_groups
    }
}

impl ModelObject for Experimenter {
    const TAG: &'static str = "Experimenter";
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

        let experimenter = &mut model[key];
        let attrs = Attrs::new(element, Self::TYPE_NAME);
        attrs.string("FirstName", &mut experimenter.first_name);
        attrs.string("MiddleName", &mut experimenter.middle_name);
        attrs.string("LastName", &mut experimenter.last_name);
        attrs.string("Email", &mut experimenter.email);
        attrs.string("Institution", &mut experimenter.institution);
        attrs.string("UserName", &mut experimenter.user_name);

        let this = Self::object_ref(key);
        ctx.enqueue_refs(element, this, RefKind::GroupRef)?;
        ctx.enqueue_refs(element, this, RefKind::AnnotationRef)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let experimenter = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", experimenter.id.as_ref());
        element.set_optional_attribute("FirstName", experimenter.first_name.as_ref());
        element.set_optional_attribute("MiddleName", experimenter.middle_name.as_ref());
        element.set_optional_attribute("LastName", experimenter.last_name.as_ref());
        element.set_optional_attribute("Email", experimenter.email.as_ref());
        element.set_optional_attribute("Institution", experimenter.institution.as_ref());
        element.set_optional_attribute("UserName", experimenter.user_name.as_ref());
        append_refs(model, &mut element, RefKind::GroupRef, &experimenter.group_links);
        append_refs(model, &mut element, RefKind::AnnotationRef, &experimenter.annotation_links);
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
            RefKind::GroupRef => {
                let target = expect::<Group>(model, kind, target)?;
                relate_many(model, key, target, key, op, |e| &mut e.group_links, |g| &mut g.experimenters)
            }
            RefKind::AnnotationRef => {
                let target = expect::<Annotation>(model, kind, target)?;
                link_annotation(model, key, target, op, |e| &mut e.annotation_links)
            }
            _ => return Err(unsupported::<Self>(kind)),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Group {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub(crate) leader: Option<Key<Experimenter>>,
    pub(crate) contact: Option<Key<Experimenter>>,
    pub(crate) images: RefList<Key<Image>>,
    pub(crate) datasets: RefList<Key<Dataset>>,
    pub(crate) projects: RefList<Key<Project>>,
    pub(crate) experimenters: RefList<Key<Experimenter>>,
}

impl Group {
    pub fn leader(&self) -> Option<Key<Experimenter>> {
        self.leader
    }

    pub fn contact(&self) -> Option<Key<Experimenter>> {
        self.contact
    }

    pub fn images(&self) -> &RefList<Key<Image>> {
        &self.images
    }

    pub fn datasets(&self) -> &RefList<Key<Dataset>> {
        &self.datasets
    }

    pub fn projects(&self) -> &RefList<Key<Project>> {
        &self.projects
    }

    /// Experimenters listing this group.
    pub fn experimenters(&self) -> &RefList<Key<Experimenter>> {
        &self.experimenters
    }
}

impl ModelObject for Group {
    const TAG: &'static str = "Group";
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

        let group = &mut model[key];
        Attrs::new(element, Self::TYPE_NAME).string("Name", &mut group.name);
        child_text(element, "Description", Self::TYPE_NAME, &mut group.description)?;

        let this = Self::object_ref(key);
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::Leader)?;
        ctx.enqueue_ref(element, Self::TYPE_NAME, this, RefKind::Contact)
    }

    fn to_element(model: &Model, key: Key<Self>) -> Element {
        let group = &model[key];
        let mut element = new_element::<Self>();
        element.set_optional_attribute("ID", group.id.as_ref());
        element.set_optional_attribute("Name", group.name.as_ref());
        append_text(&mut element, "Description", group.description.as_ref());
        append_ref(model, &mut element, RefKind::Leader, group.leader);
        append_ref(model, &mut element, RefKind::Contact, group.contact);
        element
    }

    fn relate(
        model: &mut Model,
        key: Key<Self>,
        kind: RefKind,
        target: ObjectRef,
        op: LinkOp,
    ) -> Result<bool, OmeError> {
        let target = match kind {
            RefKind::Leader | RefKind::Contact => expect::<Experimenter>(model, kind, target)?,
            _ => return Err(unsupported::<Self>(kind)),
        };
        Ok(if kind == RefKind::Leader {
            relate_one(model, key, target, key, op, |g| &mut g.leader, |e| &mut e.led_groups)
        } else {
            relate_one(model, key, target, key, op, |g| &mut g.contact, |e| &mut e.contact_groups)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resolve_all;

    fn load(xml: &str) -> (Model, ParseContext) {
        let mut model = Model::default();
        let mut ctx = ParseContext::default();
        let root = Element::from_xml_str(xml).expect("xml");
        model.parse_document(&root, &mut ctx).expect("parse");
        resolve_all(&mut model, &mut ctx.queue, &ctx.registry).expect("link");
        (model, ctx)
    }

    #[test]
    fn group_leader_and_contact_have_separate_back_references() {
        let (model, ctx) = load(
            r#"<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2010-04">
              <Experimenter ID="Experimenter:0" FirstName="Ada"/>
              <Experimenter ID="Experimenter:1"/>
              <Group ID="Group:0" Name="lab">
                <Leader ID="Experimenter:0"/>
                <Contact ID="Experimenter:1"/>
              </Group>
            </OME>"#,
        );
        let group: Key<Group> = model.lookup(&ctx.registry, "Group:0").unwrap();
        let ada: Key<Experimenter> = model.lookup(&ctx.registry, "Experimenter:0").unwrap();
        let other: Key<Experimenter> = model.lookup(&ctx.registry, "Experimenter:1").unwrap();
        assert_eq!(model[group].leader(), Some(ada));
        assert_eq!(model[group].contact(), Some(other));
        assert_eq!(model[ada].led_groups().to_vec(), vec![group]);
        assert!(model[ada].contact_groups().is_empty());
        assert_eq!(model[other].contact_groups().to_vec(), vec![group]);
    }

    #[test]
    fn dataset_lists_projects_in_document_order() {
        let (model, ctx) = load(
            r#"<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2010-04">
              <Project ID="Project:0"/>
              <Project ID="Project:1"/>
              <Dataset ID="Dataset:0">
                <ProjectRef ID="Project:1"/>
                <ProjectRef ID="Project:0"/>
              </Dataset>
            </OME>"#,
        );
        let dataset: Key<Dataset> = model.lookup(&ctx.registry, "Dataset:0").unwrap();
        let p0: Key<Project> = model.lookup(&ctx.registry, "Project:0").unwrap();
        let p1: Key<Project> = model.lookup(&ctx.registry, "Project:1").unwrap();
        assert_eq!(model[dataset].projects().to_vec(), vec![p1, p0]);
        assert_eq!(model[p0].datasets().to_vec(), vec![dataset]);
    }

    #[test]
    fn group_rejects_unrelated_kind() {
        let mut model = Model::default();
        let group = model.alloc(Group::default());
        let image = model.alloc(Image::default());
        let err = model
            .link(Group::object_ref(group), RefKind::ImageRef, Image::object_ref(image))
            .unwrap_err();
        assert!(matches!(
            err,
            OmeError::UnsupportedReferenceKind { owner: "Group", kind: RefKind::ImageRef }
        ));
    }
}
