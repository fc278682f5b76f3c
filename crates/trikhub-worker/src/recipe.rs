//! How to spawn a worker process for a given runtime and entry point.

use std::path::PathBuf;

use tokio::process::Command;
use trikhub_core::{Runtime, TrikId};

/// Everything needed to spawn (or respawn) a worker's subprocess.
#[derive(Debug, Clone)]
pub struct SpawnRecipe {
    pub trik_id: TrikId,
    pub runtime: Runtime,
    /// Absolute path to the trik's entry point file.
    pub entry_path: PathBuf,
    /// Working directory the process is spawned in (the trik's own
    /// directory, so relative requires/imports resolve).
    pub working_dir: PathBuf,
    /// Startup handshake deadline.
    pub startup_timeout_ms: u64,
}

impl SpawnRecipe {
    #[must_use]
    pub fn command(&self) -> Command {
        let mut cmd = match self.runtime {
            Runtime::Node => {
                let mut c = Command::new("node");
                c.arg(&self.entry_path);
                c
            },
            Runtime::Python => {
                let mut c = Command::new("python3");
                c.arg(&self.entry_path);
                c
            },
            Runtime::Native => Command::new(&self.entry_path),
        };
        cmd.current_dir(&self.working_dir);
        cmd.env("TRIKHUB_TRIK_ID", self.trik_id.as_str());
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}
