//! Tool runner double for engine tests

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tric_archive::{ArchiveStore, FsType, ObjectInput, PartType, PartitionInfo, SifStore};
use tric_staging::{StagingError, StagingResult, ToolInvocation, ToolOutput, ToolRunner};

/// Simulates `apptainer build`, `mkfs.ext3`, `tune2fs` and `apptainer run`
#[derive(Default)]
pub(crate) struct FakeTools {
    pub(crate) calls: Mutex<Vec<ToolInvocation>>,
    pub(crate) fail_on: Option<&'static str>,
}

impl FakeTools {
    pub(crate) fn failing(step: &'static str) -> Self {
        Self {
            fail_on: Some(step),
            ..Self::default()
        }
    }

    pub(crate) fn rendered(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn step(invocation: &ToolInvocation) -> String {
        match invocation.arguments().first() {
            Some(sub) if invocation.program() == "apptainer" => {
                format!("apptainer {}", sub.to_string_lossy())
            }
            _ => invocation.program().to_string(),
        }
    }
}

impl ToolRunner for FakeTools {
    fn run(&self, invocation: &ToolInvocation) -> StagingResult<ToolOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let step = Self::step(invocation);
        if self.fail_on == Some(step.as_str()) {
            return Err(StagingError::ToolFailed {
                command: invocation.to_string(),
                status: Some(1),
                stderr: format!("{step} failed"),
            });
        }

        let args = invocation.arguments();
        match step.as_str() {
            "apptainer build" => {
                let image = PathBuf::from(&args[3]);
                let definition = fs::read(&args[4])?;
                let system = PartitionInfo {
                    fs: FsType::Squash,
                    part: PartType::PrimarySystem,
                    arch: "amd64".to_string(),
                };
                SifStore::new()
                    .create(
                        &image,
                        vec![
                            ObjectInput::def_file("", definition),
                            ObjectInput::partition("", vec![0x5A; 4096], system),
                        ],
                    )
                    .map_err(|e| io::Error::other(e.to_string()))?;
            }
            "mkfs.ext3" => {
                let raw = fs::OpenOptions::new().write(true).open(&args[2])?;
                (&raw).write_all(b"EXT3")?;
            }
            _ => {}
        }
        Ok(ToolOutput::default())
    }
}

/// Definition file with a two-line run-script
pub(crate) const DEFINITION: &str = "Bootstrap: docker\nFrom: alpine\n\n%runscript\n    cat /I/data.txt\n    ls /O\n\n%post\n    apk add bash\n";
