//! Workflow execution

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::provenance::ProvenanceRecorder;
use std::fmt;
use tracing::info;
use tric_core::{ContainerConfig, ContainerMetadata, WorkflowConfig};
use tric_staging::ToolInvocation;

/// The composed container-runtime command line
///
/// Kept as an argument list; the string form is for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInvocation {
    program: String,
    args: Vec<String>,
}

impl RunInvocation {
    /// Compose `<program> run -B ... <app>.sif` for a workflow
    ///
    /// Inputs are bound in order, then the output; each image is mounted at
    /// `/<name>` from the filesystem root `/<name>` inside its partition.
    pub fn compose(program: impl Into<String>, config: &WorkflowConfig) -> Self {
        let mut args = vec!["run".to_string()];
        for container in config.inputs.iter().chain(std::iter::once(&config.output)) {
            args.push("-B".to_string());
            args.push(bind_spec(container));
        }
        args.push(config.application.image_file_name());
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program name or path
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// As a tool invocation
    pub fn to_tool_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(self.program.clone()).args(&self.args)
    }
}

impl fmt::Display for RunInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

fn bind_spec(container: &ContainerConfig) -> String {
    format!(
        "{}:{}:image-src={}",
        container.image_file_name(),
        container.bind_path(),
        container.bind_path()
    )
}

/// Executes a built workflow and records its provenance
#[derive(Debug, Clone)]
pub struct WorkflowRunner {
    ctx: EngineContext,
}

impl WorkflowRunner {
    /// Runner using `ctx`
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// The command that runs `config`
    pub fn compose_run_command(&self, config: &WorkflowConfig) -> RunInvocation {
        RunInvocation::compose(self.ctx.settings().tools.apptainer.clone(), config)
    }

    /// Run the composed command in the image directory
    ///
    /// Blocks until the command exits. Failing to start it or a non-zero
    /// exit is an error.
    pub fn execute(&self, config: &WorkflowConfig) -> EngineResult<RunInvocation> {
        let command = self.compose_run_command(config);
        info!(workflow = %config.name, %command, "running workflow");

        let invocation = command
            .to_tool_invocation()
            .current_dir(self.ctx.image_dir())
            .inherit_output();
        self.ctx
            .runner()
            .run(&invocation)
            .map_err(|source| EngineError::Run {
                workflow: config.name.clone(),
                source,
            })?;
        Ok(command)
    }

    /// Validate, execute, then annotate the output image
    ///
    /// The output image is only touched once the command has exited
    /// successfully.
    pub fn run(&self, config: &WorkflowConfig) -> EngineResult<ContainerMetadata> {
        config.validate()?;
        self.execute(config)?;
        self.recorder().annotate_output(config)
    }

    /// Provenance recorder over this runner's images
    pub fn recorder(&self) -> ProvenanceRecorder<'_> {
        ProvenanceRecorder::new(self.ctx.store(), self.ctx.image_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ContainerBuilder;
    use crate::testing::{FakeTools, DEFINITION};
    use proptest::prelude::*;
    use std::sync::Arc;
    use tric_archive::{ArchiveStore, SifStore};
    use tric_core::Settings;

    fn config(inputs: &[&str], output: &str, app: &str) -> WorkflowConfig {
        WorkflowConfig {
            name: "wf".to_string(),
            application: ContainerConfig::new(app).with_source("app.def"),
            inputs: inputs
                .iter()
                .map(|n| ContainerConfig::new(*n).with_size(1024))
                .collect(),
            output: ContainerConfig::new(output).with_size(1024),
        }
    }

    #[test]
    fn test_compose_run_command() {
        let command = RunInvocation::compose("apptainer", &config(&["a", "b"], "c", "app"));
        assert_eq!(
            command.to_string(),
            "apptainer run -B a.sif:/a:image-src=/a -B b.sif:/b:image-src=/b -B c.sif:/c:image-src=/c app.sif"
        );
        assert_eq!(command.program(), "apptainer");
        assert_eq!(command.args().len(), 8);
    }

    #[test]
    fn test_compose_without_inputs() {
        let command = RunInvocation::compose("apptainer", &config(&[], "out", "A"));
        assert_eq!(
            command.to_string(),
            "apptainer run -B out.sif:/out:image-src=/out A.sif"
        );
    }

    fn runner_over(tools: FakeTools) -> (tempfile::TempDir, WorkflowConfig, Arc<FakeTools>, WorkflowRunner) {
        let dir = tempfile::tempdir().unwrap();
        let def = dir.path().join("A.def");
        std::fs::write(&def, DEFINITION).unwrap();
        let settings = Settings {
            image_dir: dir.path().join("images"),
            ..Settings::default()
        };
        let tools = Arc::new(tools);
        let ctx = EngineContext::new(settings, Arc::new(SifStore::new()), tools.clone());
        let config = WorkflowConfig {
            name: "wf".to_string(),
            application: ContainerConfig::new("A").with_source(def),
            inputs: vec![ContainerConfig::new("I").with_size(1 << 20)],
            output: ContainerConfig::new("O").with_size(2 << 20),
        };
        ContainerBuilder::new(ctx.clone())
            .create_workflow(&config)
            .unwrap();
        (dir, config, tools, WorkflowRunner::new(ctx))
    }

    #[test]
    fn test_execute_runs_in_image_dir() {
        let (dir, config, tools, runner) = runner_over(FakeTools::default());
        runner.execute(&config).unwrap();

        let calls = tools.calls.lock().unwrap();
        let run = calls.last().unwrap();
        assert_eq!(
            run.to_string(),
            "apptainer run -B I.sif:/I:image-src=/I -B O.sif:/O:image-src=/O A.sif"
        );
        assert_eq!(run.dir(), Some(dir.path().join("images").as_path()));
        assert!(run.inherits_output());
    }

    #[test]
    fn test_run_annotates_output() {
        let (_dir, config, _tools, runner) = runner_over(FakeTools::default());
        let record = runner.run(&config).unwrap();

        let output = runner.ctx.image_path(&config.output);
        assert_eq!(record.id, SifStore::new().identity(&output).unwrap());
        let metadata = runner.recorder().read_metadata(&output).unwrap();
        assert_eq!(metadata, vec![record]);
    }

    #[test]
    fn test_failed_run_leaves_output_unannotated() {
        let (_dir, config, _tools, runner) = runner_over(FakeTools::failing("apptainer run"));

        let err = runner.run(&config).unwrap_err();
        assert!(matches!(err, EngineError::Run { .. }));
        let output = runner.ctx.image_path(&config.output);
        assert!(runner.recorder().read_metadata(&output).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn test_compose_binds_every_input_in_order(
            names in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
        ) {
            let names: Vec<String> = names.into_iter().map(|n| format!("in_{n}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let command = RunInvocation::compose("apptainer", &config(&refs, "out", "app"));

            let args = command.args();
            prop_assert_eq!(args.first().map(String::as_str), Some("run"));
            prop_assert_eq!(args.last().map(String::as_str), Some("app.sif"));
            prop_assert_eq!(args.len(), 2 + 2 * (names.len() + 1));
            for (i, name) in names.iter().enumerate() {
                prop_assert_eq!(&args[1 + 2 * i], "-B");
                prop_assert_eq!(&args[2 + 2 * i], &format!("{name}.sif:/{name}:image-src=/{name}"));
            }
        }
    }
}
