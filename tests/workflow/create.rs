//! Building the images of a workflow.

use crate::common::Fixture;
use std::collections::HashSet;
use std::path::PathBuf;
use tric::archive::{AccessMode, ArchiveStore, DataType, FsType, PartType, SifStore};
use tric::model::{ContainerRole, NO_OPERATION};
use tric::Error;

#[test]
fn test_create_builds_every_image_in_order() {
    let fx = Fixture::new();
    let workflow = fx.workflow();

    let built = fx.tric.create(&workflow).unwrap();

    let summary: Vec<_> = built.iter().map(|b| (b.role, b.name.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (ContainerRole::Application, "A"),
            (ContainerRole::Input, "I"),
            (ContainerRole::Output, "O"),
        ]
    );
    for image in &built {
        assert_eq!(image.path, fx.image(&image.name));
        assert!(image.path.exists());
        assert_eq!(image.id, fx.reopened_id(&image.name));
    }

    let ids: HashSet<_> = built.iter().map(|b| b.id).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_tools_invoked_in_build_order() {
    let fx = Fixture::new();
    fx.tric.create(&fx.workflow()).unwrap();

    let programs: Vec<String> = fx
        .tools
        .rendered()
        .iter()
        .map(|c| c.split(' ').next().unwrap().to_string())
        .collect();
    assert_eq!(
        programs,
        vec!["apptainer", "mkfs.ext3", "tune2fs", "mkfs.ext3", "tune2fs"]
    );
    assert!(fx.tools.rendered()[0].starts_with("apptainer build --fakeroot --force "));
    assert!(fx.tools.invocations_of("apptainer run").is_empty());
}

#[test]
fn test_input_image_holds_staged_data_partition() {
    let fx = Fixture::new();
    fx.tric.create(&fx.workflow()).unwrap();

    let staged = fx.tools.staged_trees();
    assert_eq!(
        staged[0],
        vec![
            PathBuf::from("I"),
            PathBuf::from("I/raw"),
            PathBuf::from("I/raw/day1.bin"),
            PathBuf::from("I/readings.csv"),
        ]
    );
    assert_eq!(staged[1], vec![PathBuf::from("O")]);

    let image = SifStore::new()
        .open(&fx.image("I"), AccessMode::ReadOnly)
        .unwrap();
    let partition = image.find("I").unwrap().expect("partition named after the input");
    assert_eq!(partition.data_type, DataType::Partition);
    assert_eq!(partition.size, 1 << 20);
    let info = partition.partition.clone().unwrap();
    assert_eq!(info.fs, FsType::Ext3);
    assert_eq!(info.part, PartType::Data);
    assert!(image.read(&partition).unwrap().starts_with(b"EXT3"));
}

#[test]
fn test_static_metadata_on_application_and_inputs_only() {
    let fx = Fixture::new();
    fx.tric.create(&fx.workflow()).unwrap();

    for name in ["A", "I"] {
        let report = fx.tric.inspect(fx.image(name)).unwrap();
        assert_eq!(report.metadata.len(), 1, "{name}");
        let record = &report.metadata[0];
        assert_eq!(record.id, report.id);
        assert_eq!(record.name, name);
        assert_eq!(record.created_at, report.created_at);
        assert_eq!(record.execution_command, NO_OPERATION);
        assert!(record.record_trail.is_none());
    }

    let output = fx.tric.inspect(fx.image("O")).unwrap();
    assert!(output.metadata.is_empty());
    assert_eq!(output.objects.len(), 1);
}

#[test]
fn test_staging_leaves_work_dir_empty() {
    let fx = Fixture::new();
    fx.tric.create(&fx.workflow()).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(fx.path("work")).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_failed_input_keeps_application_image() {
    let fx = Fixture::new();
    fx.tools.fail_on("mkfs.ext3");

    let err = fx.tric.create(&fx.workflow()).unwrap_err();

    assert_eq!(err.failed_container(), Some("I"));
    assert!(err.is_tool_failure());
    assert!(fx.image("A").exists());
    assert!(!fx.image("I").exists());
    assert!(!fx.image("O").exists());
}

#[test]
fn test_failed_application_builds_nothing_else() {
    let fx = Fixture::new();
    fx.tools.fail_on("apptainer build");

    let err = fx.tric.create(&fx.workflow()).unwrap_err();

    assert_eq!(err.failed_container(), Some("A"));
    assert_eq!(fx.tools.rendered().len(), 1);
    assert!(!fx.image("A").exists());
}

#[test]
fn test_invalid_description_rejected_before_any_tool_runs() {
    let fx = Fixture::new();
    let mut workflow = fx.workflow();
    workflow.name = "../escape".to_string();

    let err = fx.tric.create(&workflow).unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(fx.tools.rendered().is_empty());

    let mut workflow = fx.workflow();
    workflow.output.name = "I".to_string();
    assert!(matches!(fx.tric.create(&workflow), Err(Error::Config(_))));
    assert!(fx.tools.rendered().is_empty());
}

#[test]
fn test_missing_input_source_names_container() {
    let fx = Fixture::new();
    let mut workflow = fx.workflow();
    workflow.inputs[0].source = Some(fx.path("no-such-data"));

    let err = fx.tric.create(&workflow).unwrap_err();

    assert_eq!(err.failed_container(), Some("I"));
    assert!(!fx.image("I").exists());
}

#[test]
fn test_create_from_description_file() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    let description = fx.path(&workflow.description_file_name());
    workflow.save(&description).unwrap();

    let (loaded, built) = fx.tric.create_from_file(&description).unwrap();

    assert_eq!(loaded, workflow);
    assert_eq!(built.len(), 3);
}
