//! Running a built workflow.

use crate::common::Fixture;
use tric::Error;

#[test]
fn test_run_command_binds_inputs_then_output() {
    let fx = Fixture::new();
    let workflow = fx.workflow();

    let command = fx.tric.compose_run_command(&workflow);

    assert_eq!(
        command.to_string(),
        "apptainer run -B I.sif:/I:image-src=/I -B O.sif:/O:image-src=/O A.sif"
    );
}

#[test]
fn test_run_executes_in_image_dir() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    fx.tric.create(&workflow).unwrap();

    fx.tric.run(&workflow).unwrap();

    let runs = fx.tools.invocations_of("apptainer run");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].dir(), Some(fx.path("images").as_path()));
    assert!(runs[0].inherits_output());
    assert_eq!(
        runs[0].to_string(),
        fx.tric.compose_run_command(&workflow).to_string()
    );
}

#[test]
fn test_failed_run_leaves_output_unannotated() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    fx.tric.create(&workflow).unwrap();
    fx.tools.fail_on("apptainer run");

    let err = fx.tric.run(&workflow).unwrap_err();

    assert!(matches!(err, Error::Workflow(_)));
    assert!(err.is_tool_failure());
    assert!(fx.tric.inspect(fx.image("O")).unwrap().metadata.is_empty());

    fx.tools.clear_failure();
    fx.tric.run(&workflow).unwrap();
    assert_eq!(fx.tric.inspect(fx.image("O")).unwrap().metadata.len(), 1);
}

#[test]
fn test_run_before_create_does_not_annotate() {
    let fx = Fixture::new();
    let workflow = fx.workflow();

    let err = fx.tric.run(&workflow).unwrap_err();

    assert!(matches!(err, Error::Workflow(_) | Error::Io(_) | Error::Archive(_)));
    assert!(!fx.image("O").exists());
}

#[test]
fn test_run_from_description_file() {
    let fx = Fixture::new();
    let workflow = fx.workflow();
    let description = fx.path("workflow.json");
    workflow.save(&description).unwrap();
    fx.tric.create_from_file(&description).unwrap();

    let (loaded, record) = fx.tric.run_from_file(&description).unwrap();

    assert_eq!(loaded.name, workflow.name);
    assert_eq!(record.name, "O");
    assert!(record.has_run());
}

mod properties {
    use crate::common::Fixture;
    use proptest::prelude::*;
    use tric::model::ContainerConfig;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_input_bound_before_output(
            names in prop::collection::btree_set("[a-z][a-z0-9_]{0,8}", 0..5)
        ) {
            let fx = Fixture::new();
            let mut workflow = fx.workflow();
            workflow.inputs = names
                .iter()
                .map(|n| ContainerConfig::new(format!("in_{n}")).with_size(4096))
                .collect();

            let command = fx.tric.compose_run_command(&workflow);
            let args = command.args();

            prop_assert_eq!(args.first().map(String::as_str), Some("run"));
            prop_assert_eq!(args.last().map(String::as_str), Some("A.sif"));
            prop_assert_eq!(args.len(), 2 * (names.len() + 1) + 2);
            for (i, n) in names.iter().enumerate() {
                prop_assert_eq!(&args[2 * i + 2], &format!("in_{n}.sif:/in_{n}:image-src=/in_{n}"));
            }
            prop_assert_eq!(&args[args.len() - 2], "O.sif:/O:image-src=/O");
        }
    }
}
