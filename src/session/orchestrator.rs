use std::sync::mpsc::Receiver;

use crate::build::BuildContext;
use crate::config::Config;
use crate::docker::commands::{self, RunSpec};
use crate::docker::engine::image_id_from_inspect;
use crate::docker::{CmdOutput, ContainerHandle, Docker, DockerInvocation};
use crate::error::Error;

use super::types::{EventSink, SessionEvent, ShutdownOutcome};

/// One container-with-log-forwarding lifecycle: resolve or build the image,
/// configure the daemon for awslogs delivery, launch detached, block until a
/// termination signal, stop the container.
///
/// Runs on the caller's thread; all external commands are synchronous.
pub struct ContainerLogSession<'a> {
    docker: &'a dyn Docker,
    config: &'a Config,
    sink: EventSink,
}

impl<'a> ContainerLogSession<'a> {
    pub fn new(docker: &'a dyn Docker, config: &'a Config, sink: EventSink) -> Self {
        Self {
            docker,
            config,
            sink,
        }
    }

    /// Check whether the image exists; build it from the rendered context if
    /// not. Returns the image reference the run invocation should use: the
    /// inspected image ID when the image was already present, the image name
    /// after a fresh build.
    pub fn resolve_image(&self, ctx: &BuildContext) -> Result<String, Error> {
        let image = &self.config.docker_image;

        let inspect = self.invoke(&commands::inspect_image(image))?;
        if inspect.success() {
            let id = image_id_from_inspect(&inspect.stdout);
            self.sink.emit(SessionEvent::ImageFound {
                image: image.clone(),
                id: id.clone(),
            });
            return Ok(id.unwrap_or_else(|| image.clone()));
        }

        ctx.write_command_script(&self.config.bash_command)
            .map_err(|source| Error::Io {
                context: "failed to write command script",
                source,
            })?;
        ctx.write_dockerfile().map_err(|source| Error::Io {
            context: "failed to write Dockerfile",
            source,
        })?;

        self.sink.emit(SessionEvent::BuildStarted {
            image: image.clone(),
        });
        let build = self.invoke(&commands::build_image(image, ctx.dir()))?;
        self.forward_output(&build);
        if !build.success() {
            return Err(Error::Build {
                code: build.code_or_one(),
                detail: build.stderr.trim().to_string(),
            });
        }
        self.sink.emit(SessionEvent::BuildFinished {
            image: image.clone(),
        });
        Ok(image.clone())
    }

    /// Install AWS credentials into the Docker daemon via the embedded setup
    /// script. Host-wide side effect; idempotent in effect, never rolled back.
    pub fn configure_logging(&self, ctx: &BuildContext) -> Result<(), Error> {
        let script = ctx.write_setup_script().map_err(|source| Error::Io {
            context: "failed to materialize credential setup script",
            source,
        })?;

        let inv = commands::setup_credentials(
            &script,
            &self.config.aws_access_key_id,
            &self.config.aws_secret_access_key,
        );
        // Setup output is discarded; only the exit code matters here.
        let out = self.invoke(&inv)?;
        if !out.success() {
            return Err(Error::Config {
                code: out.code_or_one(),
            });
        }
        self.sink.emit(SessionEvent::CredentialsConfigured);
        Ok(())
    }

    /// Start the detached container with awslogs forwarding and return its
    /// handle.
    pub fn launch(&self, image_ref: &str) -> Result<ContainerHandle, Error> {
        let handle = ContainerHandle::derive(&self.config.docker_image);
        let spec = RunSpec {
            image_ref,
            name: handle.as_str(),
            region: &self.config.aws_region,
            group: &self.config.aws_cloudwatch_group,
            stream: &self.config.aws_cloudwatch_stream,
            extra_args: &self.config.extra_run_args,
        };

        let run = self.invoke(&commands::run_detached(&spec))?;
        if !run.success() {
            self.forward_output(&run);
            return Err(Error::Launch {
                code: run.code_or_one(),
                detail: run.stderr.trim().to_string(),
            });
        }

        self.sink.emit(SessionEvent::Launched {
            handle: handle.clone(),
            container_id: run.stdout.trim().to_string(),
        });
        Ok(handle)
    }

    /// Block until the signal handler wakes the channel, then stop the
    /// container (best-effort) and remove the build context.
    ///
    /// Runs exactly once per process. Failures here are reported through the
    /// sink and never escalate; the caller exits 0 regardless.
    pub fn await_termination(
        &self,
        handle: &ContainerHandle,
        ctx: &BuildContext,
        shutdown: &Receiver<()>,
    ) -> ShutdownOutcome {
        // recv errors only if the handler half is gone; either way, shut down.
        let _ = shutdown.recv();

        self.sink.emit(SessionEvent::Stopping {
            handle: handle.clone(),
        });
        let stop_succeeded = match self.stop(handle) {
            Ok(out) if out.success() => {
                self.sink.emit(SessionEvent::Stopped {
                    handle: handle.clone(),
                });
                true
            }
            Ok(out) => {
                self.sink.emit(SessionEvent::StopFailed {
                    handle: handle.clone(),
                    code: out.status,
                });
                false
            }
            Err(_) => {
                self.sink.emit(SessionEvent::StopFailed {
                    handle: handle.clone(),
                    code: None,
                });
                false
            }
        };

        if let Err(err) = ctx.remove() {
            self.sink.emit(SessionEvent::CleanupFailed {
                message: err.to_string(),
            });
        }

        ShutdownOutcome { stop_succeeded }
    }

    /// Plain `docker stop`; the caller decides what a failure means.
    pub fn stop(&self, handle: &ContainerHandle) -> Result<CmdOutput, Error> {
        self.invoke(&commands::stop_container(handle.as_str()))
    }

    fn invoke(&self, inv: &DockerInvocation) -> Result<CmdOutput, Error> {
        self.docker.invoke(inv).map_err(|source| Error::Spawn {
            program: inv.program.clone(),
            source,
        })
    }

    fn forward_output(&self, out: &CmdOutput) {
        if !out.stdout.is_empty() {
            self.sink.emit(SessionEvent::Stdout(out.stdout.clone()));
        }
        if !out.stderr.is_empty() {
            self.sink.emit(SessionEvent::Stderr(out.stderr.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::sync::mpsc;

    use super::*;

    /// Scripted stand-in for the docker CLI: records every invocation and
    /// replies with configured exit codes per subcommand.
    struct ScriptedDocker {
        calls: RefCell<Vec<DockerInvocation>>,
        inspect_status: i32,
        build_status: i32,
        setup_status: i32,
        run_status: i32,
        stop_status: i32,
    }

    impl ScriptedDocker {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                inspect_status: 0,
                build_status: 0,
                setup_status: 0,
                run_status: 0,
                stop_status: 0,
            }
        }

        fn subcommands(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|inv| {
                    if inv.program == "docker" {
                        inv.args[0].clone()
                    } else {
                        "setup".to_string()
                    }
                })
                .collect()
        }

        fn count(&self, subcommand: &str) -> usize {
            self.subcommands()
                .iter()
                .filter(|s| *s == subcommand)
                .count()
        }
    }

    impl Docker for ScriptedDocker {
        fn invoke(&self, inv: &DockerInvocation) -> io::Result<CmdOutput> {
            self.calls.borrow_mut().push(inv.clone());
            let (status, stdout) = if inv.program != "docker" {
                (self.setup_status, String::new())
            } else {
                match inv.args[0].as_str() {
                    "image" => (
                        self.inspect_status,
                        r#"[{"Id":"sha256:feedface"}]"#.to_string(),
                    ),
                    "build" => (self.build_status, "Successfully built".to_string()),
                    "run" => (self.run_status, "0123456789ab\n".to_string()),
                    "stop" => (self.stop_status, String::new()),
                    _ => (0, String::new()),
                }
            };
            Ok(CmdOutput {
                status: Some(status),
                stdout,
                stderr: String::new(),
            })
        }
    }

    fn test_config() -> Config {
        Config {
            docker_image: "web".into(),
            bash_command: "echo hi".into(),
            aws_cloudwatch_group: "g".into(),
            aws_cloudwatch_stream: "s".into(),
            aws_access_key_id: "AKIA".into(),
            aws_secret_access_key: "secret".into(),
            aws_region: "us-east-1".into(),
            extra_run_args: Vec::new(),
        }
    }

    fn scratch_context() -> (tempfile::TempDir, BuildContext) {
        let parent = tempfile::tempdir().expect("failed to create tempdir");
        let ctx = BuildContext::create_in(parent.path()).expect("failed to create context");
        (parent, ctx)
    }

    #[test]
    fn existing_image_skips_the_build() {
        let docker = ScriptedDocker::new();
        let cfg = test_config();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();

        let image_ref = session.resolve_image(&ctx).unwrap();

        assert_eq!(image_ref, "sha256:feedface");
        assert_eq!(docker.count("build"), 0);
    }

    #[test]
    fn absent_image_builds_exactly_once() {
        let mut docker = ScriptedDocker::new();
        docker.inspect_status = 1;
        let cfg = test_config();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();

        let image_ref = session.resolve_image(&ctx).unwrap();

        assert_eq!(image_ref, "web");
        assert_eq!(docker.count("build"), 1);
        assert!(ctx.dir().join("Dockerfile").exists());
        assert!(ctx.dir().join(crate::build::COMMAND_SCRIPT).exists());
    }

    #[test]
    fn build_failure_carries_the_exit_code() {
        let mut docker = ScriptedDocker::new();
        docker.inspect_status = 1;
        docker.build_status = 125;
        let cfg = test_config();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();

        let err = session.resolve_image(&ctx).unwrap_err();
        assert_eq!(err.exit_code(), 125);
    }

    #[test]
    fn metacharacter_command_stays_out_of_the_dockerfile() {
        let mut docker = ScriptedDocker::new();
        docker.inspect_status = 1;
        let mut cfg = test_config();
        cfg.bash_command = "echo 'a && b' | tee /tmp/out; env > /dev/null".into();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();

        session.resolve_image(&ctx).unwrap();

        let script =
            std::fs::read_to_string(ctx.dir().join(crate::build::COMMAND_SCRIPT)).unwrap();
        let dockerfile = std::fs::read_to_string(ctx.dir().join("Dockerfile")).unwrap();
        assert!(script.contains(&cfg.bash_command));
        assert!(!dockerfile.contains(&cfg.bash_command));
    }

    #[test]
    fn configure_logging_failure_is_config_error() {
        let mut docker = ScriptedDocker::new();
        docker.setup_status = 3;
        let cfg = test_config();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();

        let err = session.configure_logging(&ctx).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn full_session_orders_build_before_run() {
        let mut docker = ScriptedDocker::new();
        docker.inspect_status = 1;
        let cfg = test_config();
        let (tx, rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();

        let image_ref = session.resolve_image(&ctx).unwrap();
        session.configure_logging(&ctx).unwrap();
        let handle = session.launch(&image_ref).unwrap();

        assert_eq!(docker.subcommands(), ["image", "build", "setup", "run"]);
        assert!(handle.as_str().starts_with("web-container-"));

        let events: Vec<_> = rx.try_iter().collect();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, SessionEvent::Launched { .. }))
        );
    }

    #[test]
    fn run_invocation_carries_log_options_and_handle() {
        let cfg = test_config();
        let docker = ScriptedDocker::new();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));

        let handle = session.launch("sha256:feedface").unwrap();

        let calls = docker.calls.borrow();
        let run = calls.iter().find(|inv| inv.args[0] == "run").unwrap();
        assert!(run.args.contains(&"awslogs-region=us-east-1".into()));
        assert!(run.args.contains(&"awslogs-group=g".into()));
        assert!(run.args.contains(&"awslogs-stream=s".into()));
        assert!(run.args.contains(&"awslogs-create-group=true".into()));
        assert!(run.args.contains(&handle.as_str().to_string()));
        assert_eq!(run.args.last(), Some(&"sha256:feedface".to_string()));
    }

    #[test]
    fn launch_failure_carries_the_exit_code() {
        let mut docker = ScriptedDocker::new();
        docker.run_status = 126;
        let cfg = test_config();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));

        let err = session.launch("web").unwrap_err();
        assert_eq!(err.exit_code(), 126);
    }

    #[test]
    fn interrupt_stops_exactly_once_and_cleans_up() {
        let docker = ScriptedDocker::new();
        let cfg = test_config();
        let (tx, _rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();
        ctx.write_command_script("echo hi").unwrap();

        let handle = ContainerHandle::derive("web");
        let (signal_tx, signal_rx) = mpsc::channel();
        signal_tx.send(()).unwrap();

        let outcome = session.await_termination(&handle, &ctx, &signal_rx);

        assert!(outcome.stop_succeeded);
        assert_eq!(docker.count("stop"), 1);
        let calls = docker.calls.borrow();
        let stop = calls.iter().find(|inv| inv.args[0] == "stop").unwrap();
        assert_eq!(stop.args[1], handle.as_str());
        assert!(!ctx.dir().exists());
    }

    #[test]
    fn failed_stop_still_completes_shutdown() {
        let mut docker = ScriptedDocker::new();
        docker.stop_status = 1;
        let cfg = test_config();
        let (tx, rx) = mpsc::channel();
        let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));
        let (_parent, ctx) = scratch_context();

        let handle = ContainerHandle::derive("web");
        let (signal_tx, signal_rx) = mpsc::channel();
        signal_tx.send(()).unwrap();

        let outcome = session.await_termination(&handle, &ctx, &signal_rx);

        assert!(!outcome.stop_succeeded);
        assert_eq!(docker.count("stop"), 1);
        let events: Vec<_> = rx.try_iter().collect();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, SessionEvent::StopFailed { .. }))
        );
        // The build context is removed even when stop fails.
        assert!(!ctx.dir().exists());
    }
}
