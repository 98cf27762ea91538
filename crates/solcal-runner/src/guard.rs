//! Scoped cleanup: transient input files and the stray-process sweep.

use std::io::{Seek, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::HarnessResult;

/// A file the solver reads, rewritten before each use and deleted on drop.
#[derive(Debug)]
pub struct TransientFile {
    file: NamedTempFile,
}

impl TransientFile {
    /// Create an empty file with the given prefix in the system temp dir.
    pub fn new(prefix: &str) -> HarnessResult<Self> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".json")
            .tempfile()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Replace the file's contents.
    pub fn overwrite(&mut self, contents: &str) -> HarnessResult<()> {
        let handle = self.file.as_file_mut();
        handle.set_len(0)?;
        handle.rewind()?;
        handle.write_all(contents.as_bytes())?;
        handle.sync_data()?;
        Ok(())
    }
}

/// Longest process name the kernel reports; `pkill -x` matches against it.
pub const PROCESS_NAME_MAX: usize = 15;

/// Kills every process with the solver's name when dropped.
///
/// Covers orphans the solver leaves outside its own process group. Held for
/// the whole run so it fires on success, on error and on interrupt.
#[derive(Debug)]
pub struct ProcessSweep {
    process_name: String,
}

impl ProcessSweep {
    /// `executable` is the solver's file name; it is cut to the
    /// [`PROCESS_NAME_MAX`] bytes the kernel keeps.
    pub fn new(executable: &str) -> Self {
        Self {
            process_name: kernel_name(executable).to_string(),
        }
    }

    /// Name passed to `pkill -x`.
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Sweep now. Repeated sweeps are harmless.
    pub fn sweep(&self) {
        match std::process::Command::new("pkill")
            .arg("-x")
            .arg(&self.process_name)
            .status()
        {
            // pkill exits 1 when nothing matched.
            Ok(status) => debug!(process = %self.process_name, code = ?status.code(), "Swept solver processes"),
            Err(e) => warn!(process = %self.process_name, error = %e, "Process sweep failed"),
        }
    }
}

impl Drop for ProcessSweep {
    fn drop(&mut self) {
        self.sweep();
    }
}

fn kernel_name(executable: &str) -> &str {
    let mut end = executable.len().min(PROCESS_NAME_MAX);
    while !executable.is_char_boundary(end) {
        end -= 1;
    }
    &executable[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_replaces_contents() {
        let mut file = TransientFile::new("solcal-test-").unwrap();
        file.overwrite("{\"max rank\": 13, \"long\": true}").unwrap();
        file.overwrite("{}").unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "{}");
    }

    #[test]
    fn test_file_removed_on_drop() {
        let file = TransientFile::new("solcal-test-").unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_long_names_cut_to_kernel_length() {
        assert_eq!(ProcessSweep::new("solvitaire").process_name(), "solvitaire");
        assert_eq!(
            ProcessSweep::new("solvitaire-release-x86_64").process_name(),
            "solvitaire-rele"
        );
        assert_eq!(ProcessSweep::new("solvitaire-rele").process_name(), "solvitaire-rele");
        // Never splits a character.
        assert_eq!(ProcessSweep::new("solvitaire-xééé").process_name(), "solvitaire-xé");
    }

    #[test]
    fn test_sweep_without_matches_is_harmless() {
        let sweep = ProcessSweep::new("solcal-no-such-process");
        sweep.sweep();
        sweep.sweep();
    }
}
