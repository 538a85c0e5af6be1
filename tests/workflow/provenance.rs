//! Provenance recorded in the output image after a run.

use crate::common::Fixture;
use tric::archive::{AccessMode, ArchiveStore, DataType, SifStore};
use tric::model::{TrailEntry, RUN_METADATA_NAME};

#[test]
fn test_trail_names_every_image_with_its_header_identity() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    fx.tric.create(&workflow).unwrap();

    let record = fx.tric.run(&workflow).unwrap();

    let trail = record.record_trail.clone().expect("run record carries a trail");
    assert_eq!(trail.inputs, vec![TrailEntry::new("I", fx.reopened_id("I"))]);
    assert_eq!(trail.application, Some(TrailEntry::new("A", fx.reopened_id("A"))));
    assert_eq!(trail.output, Some(TrailEntry::new("O", fx.reopened_id("O"))));
    assert_eq!(record.id, fx.reopened_id("O"));
}

#[test]
fn test_execution_command_is_the_application_runscript() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    fx.tric.create(&workflow).unwrap();

    let record = fx.tric.run(&workflow).unwrap();

    assert_eq!(record.execution_command, "python /opt/model.py --in /I --out /O");
}

#[test]
fn test_run_record_is_embedded_in_output_image() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    let built = fx.tric.create(&workflow).unwrap();
    let output_id = built[2].id;

    let record = fx.tric.run(&workflow).unwrap();

    let image = SifStore::new()
        .open(&fx.image("O"), AccessMode::ReadOnly)
        .unwrap();
    assert_eq!(image.id(), output_id);
    let json = image.objects_of_type(DataType::GenericJson).unwrap();
    assert_eq!(json.len(), 1);
    assert_eq!(json[0].descriptor.name, RUN_METADATA_NAME);

    let embedded: serde_json::Value = serde_json::from_slice(&json[0].data).unwrap();
    assert_eq!(embedded["UUID"], output_id.to_string());
    assert_eq!(embedded["Name"], "O");
    assert_eq!(
        embedded["RecordTrail"]["ApplicationContainer"]["UUID"],
        fx.reopened_id("A").to_string()
    );

    let report = fx.tric.inspect(fx.image("O")).unwrap();
    assert_eq!(report.metadata, vec![record]);
}

#[test]
fn test_inputs_and_application_untouched_by_run() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    fx.tric.create(&workflow).unwrap();
    let before: Vec<_> = ["A", "I"]
        .iter()
        .map(|n| fx.tric.inspect(fx.image(n)).unwrap())
        .collect();

    fx.tric.run(&workflow).unwrap();

    for report in before {
        let after = fx.tric.inspect(&report.path).unwrap();
        assert_eq!(after.objects, report.objects);
        assert_eq!(after.metadata, report.metadata);
    }
}

#[test]
fn test_rerun_appends_another_record() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    fx.tric.create(&workflow).unwrap();

    let first = fx.tric.run(&workflow).unwrap();
    let second = fx.tric.run(&workflow).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.record_trail, second.record_trail);
    let report = fx.tric.inspect(fx.image("O")).unwrap();
    assert_eq!(report.metadata.len(), 2);
}
