//! Shared fixtures for integration tests.
//!
//! `FakeTools` stands in for the container runtime and the ext3 tools so
//! the whole pipeline runs without external binaries:
//! - `apptainer build` writes a real image holding the definition file
//! - `mkfs.ext3` stamps the raw file and records the staged tree
//! - `tune2fs` does nothing
//! - `apptainer run` records the invocation

#![allow(dead_code)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tric::archive::{ArchiveStore, FsType, ObjectInput, PartType, PartitionInfo, SifStore};
use tric::model::{ContainerConfig, WorkflowConfig};
use tric::staging::{StagingError, StagingResult, ToolInvocation, ToolOutput, ToolRunner};
use tric::Tric;
use walkdir::WalkDir;

pub const DEFINITION: &str = "\
Bootstrap: docker
From: python:3.11-slim

%files
    model.py /opt/model.py

%runscript
    python /opt/model.py --in /I --out /O

%post
    pip install numpy
";

#[derive(Default)]
pub struct FakeTools {
    calls: Mutex<Vec<ToolInvocation>>,
    staged: Mutex<Vec<Vec<PathBuf>>>,
    fail_on: Mutex<Option<String>>,
}

impl FakeTools {
    pub fn fail_on(&self, step: &str) {
        *self.fail_on.lock().unwrap() = Some(step.to_string());
    }

    pub fn clear_failure(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    /// Every invocation, rendered
    pub fn rendered(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(ToString::to_string).collect()
    }

    /// Invocations of one step, e.g. `apptainer run`
    pub fn invocations_of(&self, step: &str) -> Vec<ToolInvocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| step_of(c) == step)
            .cloned()
            .collect()
    }

    /// Relative paths present in each staged filesystem root, per mkfs call
    pub fn staged_trees(&self) -> Vec<Vec<PathBuf>> {
        self.staged.lock().unwrap().clone()
    }
}

fn step_of(invocation: &ToolInvocation) -> String {
    match invocation.arguments().first() {
        Some(sub) if invocation.program() == "apptainer" => {
            format!("apptainer {}", sub.to_string_lossy())
        }
        _ => invocation.program().to_string(),
    }
}

fn tree(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.unwrap().path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    paths.sort();
    paths
}

impl ToolRunner for FakeTools {
    fn run(&self, invocation: &ToolInvocation) -> StagingResult<ToolOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let step = step_of(invocation);
        if self.fail_on.lock().unwrap().as_deref() == Some(step.as_str()) {
            return Err(StagingError::ToolFailed {
                command: invocation.to_string(),
                status: Some(1),
                stderr: format!("{step}: simulated failure"),
            });
        }

        let args = invocation.arguments();
        match step.as_str() {
            "apptainer build" => {
                let definition = fs::read(&args[4])?;
                let system = PartitionInfo {
                    fs: FsType::Squash,
                    part: PartType::PrimarySystem,
                    arch: "amd64".to_string(),
                };
                SifStore::new()
                    .create(
                        Path::new(&args[3]),
                        vec![
                            ObjectInput::def_file("", definition),
                            ObjectInput::partition("", vec![0x5A; 4096], system),
                        ],
                    )
                    .map_err(|e| io::Error::other(e.to_string()))?;
            }
            "mkfs.ext3" => {
                self.staged.lock().unwrap().push(tree(Path::new(&args[1])));
                let raw = fs::OpenOptions::new().write(true).open(&args[2])?;
                (&raw).write_all(b"EXT3")?;
            }
            _ => {}
        }
        Ok(ToolOutput::default())
    }
}

/// A workflow with one application `A`, one input `I` and output `O`
pub struct Fixture {
    pub dir: TempDir,
    pub tools: Arc<FakeTools>,
    pub tric: Tric,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tools = Arc::new(FakeTools::default());
        let tric = Tric::builder()
            .image_dir(dir.path().join("images"))
            .work_dir(dir.path().join("work"))
            .tool_runner(tools.clone())
            .build();
        Self { dir, tools, tric }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Definition file, a data directory and the workflow description
    pub fn workflow(&self) -> WorkflowConfig {
        let def = self.path("A.def");
        fs::write(&def, DEFINITION).unwrap();
        let data = self.path("data");
        fs::create_dir_all(data.join("raw")).unwrap();
        fs::write(data.join("readings.csv"), b"t,v\n0,1.5\n").unwrap();
        fs::write(data.join("raw").join("day1.bin"), [7u8; 64]).unwrap();

        WorkflowConfig {
            name: "soil-moisture".to_string(),
            application: ContainerConfig::new("A").with_source(def),
            inputs: vec![ContainerConfig::new("I")
                .with_source(data)
                .with_size(1 << 20)],
            output: ContainerConfig::new("O").with_size(2 << 20),
        }
    }

    pub fn image(&self, name: &str) -> PathBuf {
        self.path("images").join(format!("{name}.sif"))
    }

    /// Identity read from an image by an independent store
    pub fn reopened_id(&self, name: &str) -> tric::model::ImageId {
        SifStore::new().identity(&self.image(name)).unwrap()
    }
}
