mod common;

use common::{key, parse_body};
use ome_xml_model::dom::Element;
use ome_xml_model::model::{
    resolve_all, Annotation, Dataset, DescriptorState, Entity, Image, ParseContext, Plane,
    Project, RefKind,
};
use ome_xml_model::OmeError;

#[test]
fn unlink_removes_both_directions() {
    let mut document = parse_body(
        r#"<Dataset ID="Dataset:0"/>
           <Image ID="Image:0"><DatasetRef ID="Dataset:0"/></Image>"#,
    );
    let image = key::<Image>(&document, "Image:0");
    let dataset = key::<Dataset>(&document, "Dataset:0");

    let removed = document
        .model
        .unlink(Image::object_ref(image), RefKind::DatasetRef, Dataset::object_ref(dataset))
        .unwrap();
    assert!(removed);
    assert!(document.model[image].datasets().is_empty());
    assert!(document.model[dataset].images().is_empty());

    let again = document
        .model
        .unlink(Image::object_ref(image), RefKind::DatasetRef, Dataset::object_ref(dataset))
        .unwrap();
    assert!(!again);
}

#[test]
fn linking_twice_keeps_one_edge() {
    let mut document = parse_body(
        r#"<Project ID="Project:0"/>
           <Dataset ID="Dataset:0"><ProjectRef ID="Project:0"/></Dataset>"#,
    );
    let project = key::<Project>(&document, "Project:0");
    let dataset = key::<Dataset>(&document, "Dataset:0");

    let added = document
        .model
        .link(Dataset::object_ref(dataset), RefKind::ProjectRef, Project::object_ref(project))
        .unwrap();
    assert!(!added);
    assert_eq!(document.model[dataset].projects().len(), 1);
    assert_eq!(document.model[project].datasets().len(), 1);
}

#[test]
fn annotation_back_references_span_types() {
    let document = parse_body(
        r#"<Project ID="Project:0"><SA:AnnotationRef ID="Annotation:0"/></Project>
           <Dataset ID="Dataset:0"><SA:AnnotationRef ID="Annotation:0"/></Dataset>
           <Image ID="Image:0"><SA:AnnotationRef ID="Annotation:0"/></Image>
           <SA:StructuredAnnotations>
             <SA:TagAnnotation ID="Annotation:0"><SA:Value>shared</SA:Value></SA:TagAnnotation>
           </SA:StructuredAnnotations>"#,
    );
    let annotation = key::<Annotation>(&document, "Annotation:0");
    let model = &document.model;

    let owners: Vec<_> = model[annotation]
        .annotated_by()
        .iter()
        .map(|owner| model.describe(owner))
        .collect();
    assert_eq!(
        owners,
        ["Project 'Project:0'", "Dataset 'Dataset:0'", "Image 'Image:0'"]
    );
    assert_eq!(model[annotation].linked::<Dataset>().len(), 1);
    assert_eq!(model[annotation].value_text().as_deref(), Some("shared"));
}

#[test]
fn update_merges_into_an_existing_object() {
    let mut document = parse_body(
        r#"<Dataset ID="Dataset:0"/><Dataset ID="Dataset:1"/>
           <Image ID="Image:0" Name="before"><DatasetRef ID="Dataset:0"/></Image>"#,
    );
    let image = key::<Image>(&document, "Image:0");

    let patch = Element::from_xml_str(&format!(
        r#"<Image xmlns="{}" ID="Image:0" Name="after"><DatasetRef ID="Dataset:1"/></Image>"#,
        common::OME_NS
    ))
    .unwrap();

    let mut ctx = ParseContext::default();
    ctx.registry = document.registry.clone();
    document.model.update(image, &patch, &mut ctx).unwrap();
    resolve_all(&mut document.model, &mut ctx.queue, &ctx.registry).unwrap();

    let model = &document.model;
    assert_eq!(model[image].name.as_deref(), Some("after"));
    let ids: Vec<_> = model[image]
        .datasets()
        .iter()
        .map(|dataset| model[dataset].id.clone().unwrap_or_default())
        .collect();
    assert_eq!(ids, ["Dataset:0", "Dataset:1"]);
}

#[test]
fn reparsing_adds_id_less_children() {
    let mut document = parse_body(
        r#"<Image ID="Image:0">
             <Pixels ID="Pixels:0" DimensionOrder="XYZCT" Type="uint8" SizeX="1" SizeY="1" SizeZ="1" SizeC="1" SizeT="2">
               <Plane TheZ="0" TheT="0" TheC="0"/>
             </Pixels>
           </Image>"#,
    );
    let image = key::<Image>(&document, "Image:0");
    let patch = Element::from_xml_str(&format!(
        r#"<Image xmlns="{}" ID="Image:0">
             <Pixels ID="Pixels:0"><Plane TheZ="0" TheT="1" TheC="0"/></Pixels>
           </Image>"#,
        common::OME_NS
    ))
    .unwrap();

    let mut ctx = ParseContext::default();
    ctx.registry = document.registry.clone();
    document.model.update(image, &patch, &mut ctx).unwrap();

    let model = &document.model;
    let pixels = model[image].pixels.expect("pixels kept");
    assert_eq!(model[pixels].size_t, Some(2));
    assert_eq!(model[pixels].planes.len(), 2);
    assert_eq!(model.count::<Plane>(), 2);
}

#[test]
fn repeating_an_update_does_not_duplicate_references() {
    let mut document = parse_body(r#"<Dataset ID="Dataset:0"/><Image ID="Image:0"/>"#);
    let image = key::<Image>(&document, "Image:0");
    let dataset = key::<Dataset>(&document, "Dataset:0");
    let patch = Element::from_xml_str(&format!(
        r#"<Image xmlns="{}" ID="Image:0"><DatasetRef ID="Dataset:0"/></Image>"#,
        common::OME_NS
    ))
    .unwrap();

    let mut ctx = ParseContext::default();
    ctx.registry = document.registry.clone();
    document.model.update(image, &patch, &mut ctx).unwrap();
    document.model.update(image, &patch, &mut ctx).unwrap();
    assert_eq!(ctx.queue.len(), 2);
    assert_eq!(ctx.queue.pending().count(), 2);

    let resolved = resolve_all(&mut document.model, &mut ctx.queue, &ctx.registry).unwrap();
    assert_eq!(resolved, 2);
    assert_eq!(ctx.queue.pending().count(), 0);
    assert!(ctx
        .queue
        .iter()
        .all(|d| d.state == DescriptorState::Resolved));

    let model = &document.model;
    assert_eq!(model[image].datasets().to_vec(), vec![dataset]);
    assert_eq!(model[dataset].images().to_vec(), vec![image]);
}

#[test]
fn update_cannot_change_an_objects_id() {
    let mut document = parse_body(r#"<Image ID="Image:0" Name="kept"/>"#);
    let image = key::<Image>(&document, "Image:0");
    let patch = Element::from_xml_str(&format!(
        r#"<Image xmlns="{}" ID="Image:7" Name="renamed"/>"#,
        common::OME_NS
    ))
    .unwrap();

    let mut ctx = ParseContext::default();
    ctx.registry = document.registry.clone();
    let err = document.model.update(image, &patch, &mut ctx).unwrap_err();
    match err {
        OmeError::IdChanged {
            element,
            existing,
            found,
        } => {
            assert_eq!(element, "Image");
            assert_eq!(existing, "Image:0");
            assert_eq!(found, "Image:7");
        }
        other => panic!("expected IdChanged, got {other:?}"),
    }
    assert_eq!(document.model[image].id.as_deref(), Some("Image:0"));
    assert_eq!(document.model[image].name.as_deref(), Some("kept"));
    assert!(ctx.registry.resolve("Image:7").is_none());
}
