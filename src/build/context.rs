use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::template;

/// File name of the wrapped-command script inside the context.
pub const COMMAND_SCRIPT: &str = "run-command.sh";

/// File name of the materialized credential-setup script.
pub const SETUP_SCRIPT: &str = "setup-creds.sh";

/// Per-run build context: a scratch directory holding the rendered
/// Dockerfile, the wrapped-command script, and the credential-setup script.
///
/// The caller owns removal; it happens on graceful shutdown AND on every
/// fatal path, so no artifact outlives the process.
#[derive(Debug)]
pub struct BuildContext {
    dir: PathBuf,
}

impl BuildContext {
    /// Create a fresh context directory under the system temp dir.
    pub fn create() -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let dir = parent.join(format!("dockwatch-build-{ts}"));
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the user command to an executable script file.
    ///
    /// The command text goes in verbatim after a bash shebang; multiline
    /// commands and shell metacharacters need no escaping here.
    pub fn write_command_script(&self, command: &str) -> io::Result<PathBuf> {
        let path = self.dir.join(COMMAND_SCRIPT);
        let mut contents = String::with_capacity(command.len() + 16);
        contents.push_str("#!/bin/bash\n");
        contents.push_str(command);
        if !command.ends_with('\n') {
            contents.push('\n');
        }
        fs::write(&path, contents)?;
        make_executable(&path)?;
        Ok(path)
    }

    /// Render the Dockerfile into the context.
    pub fn write_dockerfile(&self) -> io::Result<PathBuf> {
        let path = self.dir.join("Dockerfile");
        fs::write(&path, template::render_dockerfile(COMMAND_SCRIPT))?;
        Ok(path)
    }

    /// Materialize the embedded credential-setup script, marked executable.
    pub fn write_setup_script(&self) -> io::Result<PathBuf> {
        let path = self.dir.join(SETUP_SCRIPT);
        fs::write(&path, template::setup_script())?;
        make_executable(&path)?;
        Ok(path)
    }

    /// Remove the context directory and everything in it.
    pub fn remove(&self) -> io::Result<()> {
        fs::remove_dir_all(&self.dir)
    }
}

fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
