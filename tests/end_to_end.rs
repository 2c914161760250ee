mod common;

use common::{key, ome_document, parse_body, parse_fixture};
use ome_xml_model::dom::Element;
use ome_xml_model::model::{
    AnnotationValue, DescriptorState, DuplicateIdPolicy, IssueCode, LightSourceKind,
    MismatchPolicy, ParseOptions, RefKind, ShapeGeometry,
};
use ome_xml_model::model::{
    Annotation, Channel, Dataset, Experimenter, Filter, FilterSet, Group, Image, LightSource,
    Pixels, Plate, Reagent, Roi, Screen, Well, WellSample,
};
use ome_xml_model::{from_ome_xml_str, to_ome_xml_string, OmeError};

#[test]
fn channel_annotation_links_both_ways() {
    let document = parse_body(
        r#"<Image ID="Image:0">
             <Pixels ID="Pixels:0" DimensionOrder="XYZCT" Type="uint8" SizeX="1" SizeY="1" SizeZ="1" SizeC="1" SizeT="1">
               <Channel ID="Channel:0"><SA:AnnotationRef ID="Annotation:0"/></Channel>
             </Pixels>
           </Image>
           <SA:StructuredAnnotations>
             <SA:LongAnnotation ID="Annotation:0"><SA:Value>42</SA:Value></SA:LongAnnotation>
           </SA:StructuredAnnotations>"#,
    );

    let channel = key::<Channel>(&document, "Channel:0");
    let annotation = key::<Annotation>(&document, "Annotation:0");
    let model = &document.model;

    assert_eq!(model[channel].annotations().to_vec(), vec![annotation]);
    assert_eq!(model[annotation].value, Some(AnnotationValue::Long(Some(42))));
    assert_eq!(model[annotation].linked::<Channel>(), vec![channel]);
    assert!(document
        .queue
        .iter()
        .all(|d| d.state == DescriptorState::Resolved));
}

#[test]
fn references_may_precede_their_targets() {
    // Every ref here points at an object that appears later in the document.
    let document = parse_body(
        r#"<Image ID="Image:0">
             <ExperimenterRef ID="Experimenter:0"/>
             <DatasetRef ID="Dataset:0"/>
             <InstrumentRef ID="Instrument:0"/>
           </Image>
           <Dataset ID="Dataset:0"/>
           <Experimenter ID="Experimenter:0"/>
           <Instrument ID="Instrument:0"/>"#,
    );

    let image = key::<Image>(&document, "Image:0");
    let dataset = key::<Dataset>(&document, "Dataset:0");
    let experimenter = key::<Experimenter>(&document, "Experimenter:0");
    let model = &document.model;

    assert_eq!(model[image].experimenter(), Some(experimenter));
    assert_eq!(model[image].datasets().to_vec(), vec![dataset]);
    assert!(model[image].instrument().is_some());
    assert_eq!(model[dataset].images().to_vec(), vec![image]);
    assert_eq!(model[experimenter].images().to_vec(), vec![image]);
}

#[test]
fn dangling_reference_fails_the_document() {
    let xml = ome_document(r#"<Image ID="Image:0"><DatasetRef ID="Dataset:9"/></Image>"#);
    let err = from_ome_xml_str(&xml, &ParseOptions::default()).unwrap_err();

    match err {
        OmeError::DanglingReference { owner, kind, id } => {
            assert_eq!(owner, "Image 'Image:0'");
            assert_eq!(kind, RefKind::DatasetRef);
            assert_eq!(id, "Dataset:9");
        }
        other => panic!("expected DanglingReference, got {other:?}"),
    }
}

#[test]
fn reference_to_wrong_type_is_rejected() {
    let xml = ome_document(
        r#"<Project ID="Project:0"/>
           <Image ID="Image:0"><DatasetRef ID="Project:0"/></Image>"#,
    );
    let err = from_ome_xml_str(&xml, &ParseOptions::default()).unwrap_err();

    match err {
        OmeError::ReferenceTypeMismatch {
            kind,
            id,
            expected,
            found,
        } => {
            assert_eq!(kind, RefKind::DatasetRef);
            assert_eq!(id, "Project:0");
            assert_eq!(expected, "Dataset");
            assert_eq!(found, "Project");
        }
        other => panic!("expected ReferenceTypeMismatch, got {other:?}"),
    }
}

#[test]
fn many_valued_references_keep_document_order() {
    let document = parse_body(
        r#"<Dataset ID="id1"/><Dataset ID="id2"/><Dataset ID="id3"/>
           <Image ID="Image:0">
             <DatasetRef ID="id3"/><DatasetRef ID="id1"/><DatasetRef ID="id2"/>
           </Image>"#,
    );

    let image = key::<Image>(&document, "Image:0");
    let model = &document.model;
    let ids: Vec<_> = model[image]
        .datasets()
        .iter()
        .map(|dataset| model[dataset].id.clone().unwrap_or_default())
        .collect();
    assert_eq!(ids, ["id3", "id1", "id2"]);
}

#[test]
fn union_keeps_shape_kinds_in_order() {
    let document = parse_body(
        r#"<ROI:ROI ID="ROI:0">
             <ROI:Union>
               <ROI:Rectangle ID="Shape:0" X="1" Y="2" Width="3" Height="4"/>
               <ROI:Mask ID="Shape:1" X="5" Y="6"/>
             </ROI:Union>
           </ROI:ROI>"#,
    );

    let roi = key::<Roi>(&document, "ROI:0");
    let model = &document.model;
    let shapes = &model[roi].shapes;
    assert_eq!(shapes.len(), 2);
    assert!(matches!(
        &model[shapes[0]].geometry,
        Some(ShapeGeometry::Rectangle { width: Some(w), .. }) if *w == 3.0
    ));
    assert!(matches!(
        &model[shapes[1]].geometry,
        Some(ShapeGeometry::Mask { x: Some(x), .. }) if *x == 5.0
    ));
}

#[test]
fn sample_document_builds_a_symmetric_graph() {
    let document = parse_fixture("sample.ome.xml");
    let model = &document.model;
    assert!(document.report.is_clean());
    assert!(document
        .queue
        .iter()
        .all(|d| d.state == DescriptorState::Resolved));

    let image = key::<Image>(&document, "Image:0");
    let sample = key::<WellSample>(&document, "WellSample:0");
    assert_eq!(model[sample].image(), Some(image));
    assert_eq!(model[image].well_samples().to_vec(), vec![sample]);

    let plate = key::<Plate>(&document, "Plate:0");
    let screen = key::<Screen>(&document, "Screen:0");
    assert_eq!(model[screen].plates().to_vec(), vec![plate]);
    assert_eq!(model[plate].screens().to_vec(), vec![screen]);

    let well = key::<Well>(&document, "Well:0");
    let reagent = key::<Reagent>(&document, "Reagent:0");
    assert_eq!(model[well].reagent(), Some(reagent));
    assert_eq!(model[reagent].wells().to_vec(), vec![well]);

    let group = key::<Group>(&document, "Group:0");
    let experimenter = key::<Experimenter>(&document, "Experimenter:0");
    assert_eq!(model[group].leader(), Some(experimenter));
    assert_eq!(model[group].contact(), Some(experimenter));
    assert_eq!(model[experimenter].led_groups().to_vec(), vec![group]);
    assert_eq!(model[experimenter].groups().to_vec(), vec![group]);

    let laser = key::<LightSource>(&document, "LightSource:0");
    let arc = key::<LightSource>(&document, "LightSource:1");
    assert!(matches!(model[laser].kind, Some(LightSourceKind::Laser(_))));
    assert_eq!(model[laser].pump(), Some(arc));
    assert_eq!(model[arc].pumped_lasers().to_vec(), vec![laser]);
    assert_eq!(model[laser].settings().len(), 2);

    let filter_set = key::<FilterSet>(&document, "FilterSet:0");
    let excitation = key::<Filter>(&document, "Filter:0");
    assert_eq!(model[excitation].excitation_filter_sets().to_vec(), vec![filter_set]);
    assert_eq!(model[excitation].excitation_light_paths().len(), 1);
    assert_eq!(model[filter_set].channels().len(), 1);
    assert_eq!(model[filter_set].otfs().len(), 1);

    let shared = key::<Annotation>(&document, "Annotation:0");
    assert_eq!(model[shared].linked::<Channel>().len(), 2);
    let tag = key::<Annotation>(&document, "Annotation:2");
    let comment = key::<Annotation>(&document, "Annotation:1");
    assert_eq!(model[tag].annotations().to_vec(), vec![comment]);
    assert_eq!(model[comment].annotated_by().len(), 3);
}

#[test]
fn sample_document_round_trips() {
    let document = parse_fixture("sample.ome.xml");
    let written = to_ome_xml_string(&document.model).unwrap();

    let original =
        Element::from_xml_str(&std::fs::read_to_string(common::fixture("sample.ome.xml")).unwrap())
            .unwrap();
    let reread = Element::from_xml_str(&written).unwrap();
    assert!(
        reread.is_equivalent(&original),
        "written document differs from fixture:\n{written}"
    );

    let reparsed = from_ome_xml_str(&written, &ParseOptions::default()).unwrap();
    assert!(reparsed
        .model
        .document_element()
        .is_equivalent(&document.model.document_element()));
    assert_eq!(reparsed.queue.len(), document.queue.len());
}

#[test]
fn references_serialize_as_bare_id_elements() {
    let document = parse_fixture("sample.ome.xml");
    let written = to_ome_xml_string(&document.model).unwrap();

    assert!(written.contains(r#"<DatasetRef ID="Dataset:0"/>"#));
    assert!(written.contains(r#"<Pump ID="LightSource:1"/>"#));
    assert!(written.contains(
        r#"<ROIRef xmlns="http://www.openmicroscopy.org/Schemas/ROI/2010-04" ID="ROI:0"/>"#
    ));
}

#[test]
fn duplicate_ids_fail_unless_last_write_wins() {
    let xml = std::fs::read_to_string(common::fixture("duplicate_ids.ome.xml")).unwrap();

    let err = from_ome_xml_str(&xml, &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, OmeError::DuplicateId { ref id, .. } if id == "Dataset:0"));

    let options = ParseOptions {
        duplicate_ids: DuplicateIdPolicy::LastWriteWins,
        ..ParseOptions::default()
    };
    let document = from_ome_xml_str(&xml, &options).unwrap();
    let dataset = key::<Dataset>(&document, "Dataset:0");
    assert_eq!(document.model[dataset].name.as_deref(), Some("second"));
    assert_eq!(document.report.count(IssueCode::DuplicateIdReplaced), 1);
}

#[test]
fn misnamed_root_warns_or_fails_by_policy() {
    let xml = std::fs::read_to_string(common::fixture("misnamed_root.ome.xml")).unwrap();

    let document = from_ome_xml_str(&xml, &ParseOptions::default()).unwrap();
    assert_eq!(document.report.count(IssueCode::TagNameMismatch), 1);
    assert_eq!(document.model.root.images.len(), 1);

    let strict = ParseOptions {
        tag_mismatch: MismatchPolicy::Error,
        ..ParseOptions::default()
    };
    let err = from_ome_xml_str(&xml, &strict).unwrap_err();
    assert!(matches!(err, OmeError::TagNameMismatch { expected: "OME", .. }));
}

#[test]
fn typed_attributes_keep_their_spelling() {
    let body = r#"<Instrument ID="Instrument:0">
             <LightSource ID="LightSource:0" Power="2.50">
               <Laser Tuneable="1" PockelCell="0" RepetitionRate="1e3"/>
             </LightSource>
           </Instrument>
           <Image ID="Image:0">
             <Pixels ID="Pixels:0" DimensionOrder="XYZCT" Type="uint8" SizeX="1" SizeY="1" SizeZ="1" SizeC="1" SizeT="1" PhysicalSizeX="1.0" PhysicalSizeY="0.650"/>
           </Image>
           <SA:StructuredAnnotations>
             <SA:DoubleAnnotation ID="Annotation:0"><SA:Value>1.50</SA:Value></SA:DoubleAnnotation>
             <SA:BooleanAnnotation ID="Annotation:1"><SA:Value>1</SA:Value></SA:BooleanAnnotation>
           </SA:StructuredAnnotations>"#;
    let document = parse_body(body);
    let pixels = key::<Pixels>(&document, "Pixels:0");
    let laser = key::<LightSource>(&document, "LightSource:0");
    let model = &document.model;

    assert_eq!(model[pixels].physical_size_x.as_ref().map(|v| *v.value()), Some(1.0));
    match &model[laser].kind {
        Some(LightSourceKind::Laser(laser)) => {
            assert_eq!(laser.tuneable.as_ref().map(|v| *v.value()), Some(true));
            assert_eq!(laser.pockel_cell.as_ref().map(|v| *v.value()), Some(false));
        }
        other => panic!("expected laser, got {other:?}"),
    }

    let written = to_ome_xml_string(model).unwrap();
    for expected in [
        r#"PhysicalSizeX="1.0""#,
        r#"PhysicalSizeY="0.650""#,
        r#"Power="2.50""#,
        r#"Tuneable="1""#,
        r#"PockelCell="0""#,
        r#"RepetitionRate="1e3""#,
        "<Value>1.50</Value>",
        "<Value>1</Value>",
    ] {
        assert!(written.contains(expected), "missing {expected} in:\n{written}");
    }

    let original = Element::from_xml_str(&ome_document(body)).unwrap();
    let reread = Element::from_xml_str(&written).unwrap();
    assert!(
        reread.is_equivalent(&original),
        "written document differs from input:\n{written}"
    );
}

#[test]
fn xml_annotation_keeps_namespaced_attributes() {
    let xml = format!(
        r#"<OME xmlns="{}" xmlns:SA="{}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="{} http://www.openmicroscopy.org/Schemas/OME/2010-04/ome.xsd">
             <SA:StructuredAnnotations>
               <SA:XMLAnnotation ID="Annotation:0"><SA:Value><x xmlns:q="urn:q" q:a="1">t</x></SA:Value></SA:XMLAnnotation>
             </SA:StructuredAnnotations>
           </OME>"#,
        common::OME_NS,
        common::SA_NS,
        common::OME_NS
    );
    let document = from_ome_xml_str(&xml, &ParseOptions::default()).unwrap();
    let written = to_ome_xml_string(&document.model).unwrap();

    assert!(written.contains(r#"xmlns:q="urn:q" q:a="1""#), "{written}");
    assert!(
        written.contains(r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="#),
        "{written}"
    );

    let reparsed = from_ome_xml_str(&written, &ParseOptions::default()).unwrap();
    let annotation = key::<Annotation>(&reparsed, "Annotation:0");
    match &reparsed.model[annotation].value {
        Some(AnnotationValue::Xml(content)) => {
            let attr = &content[0].qualified_attributes[0];
            assert_eq!((attr.namespace.as_str(), attr.name.as_str()), ("urn:q", "a"));
            assert_eq!(attr.value, "1");
            assert_eq!(content[0].text(), Some("t"));
        }
        other => panic!("expected XML annotation, got {other:?}"),
    }
}
