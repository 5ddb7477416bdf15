use std::io;
use std::process::Command;

use anyhow::{Result, bail};

use super::commands;
use super::types::{CmdOutput, DockerInvocation};

/// Seam between the session and the external runtime: tests substitute a
/// recording implementation, production uses [`SystemDocker`].
pub trait Docker {
    fn invoke(&self, inv: &DockerInvocation) -> io::Result<CmdOutput>;
}

/// Runs invocations via `std::process::Command`, synchronously, capturing
/// stdout and stderr. There is no timeout; a hung external command hangs
/// the session.
pub struct SystemDocker;

impl Docker for SystemDocker {
    fn invoke(&self, inv: &DockerInvocation) -> io::Result<CmdOutput> {
        let output = Command::new(&inv.program).args(&inv.args).output()?;
        Ok(CmdOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Verify that the Docker daemon is reachable before any work starts.
pub fn ensure_available(docker: &dyn Docker) -> Result<()> {
    let out = match docker.invoke(&commands::server_version()) {
        Ok(out) => out,
        Err(err) => bail!("failed to invoke `docker` — is it installed and on PATH? ({err})"),
    };
    if !out.success() {
        bail!("docker daemon is not running (exit {})", out.code_or_one());
    }
    Ok(())
}

/// Extract the image ID from `docker image inspect` output.
///
/// Inspect prints a JSON array with one object per image; a present image
/// yields exactly one element whose `Id` pins the inspected bytes.
pub fn image_id_from_inspect(stdout: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(stdout).ok()?;
    value.get(0)?.get("Id")?.as_str().map(str::to_owned)
}
