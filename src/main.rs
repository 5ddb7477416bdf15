use std::io;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver};

use anyhow::Context;
use clap::Parser;

use dockwatch::build::BuildContext;
use dockwatch::config::{Config, FileConfig, Overrides};
use dockwatch::docker::{self, CancelToken, SystemDocker};
use dockwatch::error::Error;
use dockwatch::session::{ContainerLogSession, EventSink, SessionEvent};
use dockwatch::signal;

/// Run a shell command in a Docker container with its logs forwarded to an
/// AWS CloudWatch log group/stream via the awslogs driver.
#[derive(Parser, Debug)]
#[command(name = "dockwatch", version)]
struct Cli {
    /// Name of the Docker image to run; built from the embedded template
    /// when no such image exists
    #[arg(long)]
    docker_image: Option<String>,

    /// Bash command to run inside the container
    #[arg(long)]
    bash_command: Option<String>,

    /// AWS CloudWatch log group (created if absent)
    #[arg(long)]
    aws_cloudwatch_group: Option<String>,

    /// AWS CloudWatch log stream
    #[arg(long)]
    aws_cloudwatch_stream: Option<String>,

    #[arg(long)]
    aws_access_key_id: Option<String>,

    #[arg(long)]
    aws_secret_access_key: Option<String>,

    #[arg(long)]
    aws_region: Option<String>,

    /// Extra argument passed through to `docker run` (repeatable)
    #[arg(long = "extra-run-arg", value_name = "ARG")]
    extra_run_args: Vec<String>,
}

impl Cli {
    fn into_overrides(self) -> Overrides {
        Overrides {
            docker_image: self.docker_image,
            bash_command: self.bash_command,
            aws_cloudwatch_group: self.aws_cloudwatch_group,
            aws_cloudwatch_stream: self.aws_cloudwatch_stream,
            aws_access_key_id: self.aws_access_key_id,
            aws_secret_access_key: self.aws_secret_access_key,
            aws_region: self.aws_region,
            extra_run_args: self.extra_run_args,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dockwatch: {err:#}");
            let code = err.downcast_ref::<Error>().map_or(1, Error::exit_code);
            ExitCode::from(code.clamp(1, 255) as u8)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let file = FileConfig::load(&cwd)?;
    let cfg = Config::resolve(cli.into_overrides(), file)?;

    let docker = SystemDocker;
    docker::ensure_available(&docker)?;

    // Handlers go in before any container exists; they only flip the token
    // and wake the channel, so the late-bound handle never enters them.
    let cancel = CancelToken::new();
    let shutdown = signal::install(cancel.clone()).context("failed to install signal handlers")?;

    let (tx, events) = mpsc::channel();
    let drain = std::thread::spawn(move || {
        for event in events {
            report(&event);
        }
    });

    let ctx = BuildContext::create().map_err(|source| Error::Io {
        context: "failed to create build context",
        source,
    })?;
    let session = ContainerLogSession::new(&docker, &cfg, EventSink::new(tx));

    let result = run_session(&session, &ctx, &cancel, &shutdown);

    // Fatal and cancelled-early paths still remove the artifacts; the
    // graceful path already did inside await_termination.
    match ctx.remove() {
        Err(err) if err.kind() != io::ErrorKind::NotFound => {
            eprintln!("dockwatch: failed to remove build context: {err}");
        }
        _ => {}
    }

    drop(session);
    let _ = drain.join();

    result.map_err(Into::into)
}

fn run_session(
    session: &ContainerLogSession,
    ctx: &BuildContext,
    cancel: &CancelToken,
    shutdown: &Receiver<()>,
) -> Result<(), Error> {
    let image_ref = session.resolve_image(ctx)?;
    if cancel.is_cancelled() {
        return Ok(());
    }

    session.configure_logging(ctx)?;
    if cancel.is_cancelled() {
        return Ok(());
    }

    let handle = session.launch(&image_ref)?;
    let _ = session.await_termination(&handle, ctx, shutdown);
    Ok(())
}

fn report(event: &SessionEvent) {
    match event {
        SessionEvent::ImageFound { image, id } => match id {
            Some(id) => eprintln!("image {image} already present ({id}); skipping build"),
            None => eprintln!("image {image} already present; skipping build"),
        },
        SessionEvent::BuildStarted { image } => eprintln!("building image {image}"),
        SessionEvent::Stdout(text) => {
            eprintln!("[stdout]");
            eprintln!("{}", text.trim_end());
        }
        SessionEvent::Stderr(text) => {
            eprintln!("[stderr]");
            eprintln!("{}", text.trim_end());
        }
        SessionEvent::BuildFinished { image } => eprintln!("build of {image} finished"),
        SessionEvent::CredentialsConfigured => {
            eprintln!("docker daemon configured for awslogs delivery");
        }
        SessionEvent::Launched {
            handle,
            container_id,
        } => {
            eprintln!("container {handle} started ({container_id})");
            eprintln!("forwarding logs; press Ctrl-C to stop the container and exit");
        }
        SessionEvent::Stopping { handle } => eprintln!("stopping container {handle}"),
        SessionEvent::Stopped { handle } => eprintln!("container {handle} stopped"),
        SessionEvent::StopFailed { handle, code } => match code {
            Some(code) => {
                eprintln!("failed to stop container {handle} (docker stop exited {code})");
            }
            None => eprintln!("failed to stop container {handle}"),
        },
        SessionEvent::CleanupFailed { message } => {
            eprintln!("failed to remove build artifacts: {message}");
        }
    }
}
