use std::path::Path;

use super::types::DockerInvocation;

/// Logging driver passed to `docker run`.
const LOG_DRIVER: &str = "awslogs";

/// Build a `docker image inspect` invocation for the existence check.
///
/// Exit code 0 means the image is present; stdout carries the inspect JSON.
pub fn inspect_image(image: &str) -> DockerInvocation {
    DockerInvocation::docker(vec!["image".into(), "inspect".into(), image.into()])
}

/// Build a `docker build` invocation for a rendered build context.
pub fn build_image(image: &str, context: &Path) -> DockerInvocation {
    DockerInvocation::docker(vec![
        "build".into(),
        "-t".into(),
        image.into(),
        context.display().to_string(),
    ])
}

/// Everything `docker run` needs for a detached, log-forwarding container.
pub struct RunSpec<'a> {
    pub image_ref: &'a str,
    pub name: &'a str,
    pub region: &'a str,
    pub group: &'a str,
    pub stream: &'a str,
    pub extra_args: &'a [String],
}

/// Build the detached `docker run` invocation with awslogs forwarding.
pub fn run_detached(spec: &RunSpec<'_>) -> DockerInvocation {
    let mut args = vec![
        "run".into(),
        "--name".into(),
        spec.name.into(),
        "-d".into(),
        format!("--log-driver={LOG_DRIVER}"),
        "--log-opt".into(),
        format!("awslogs-region={}", spec.region),
        "--log-opt".into(),
        format!("awslogs-group={}", spec.group),
        "--log-opt".into(),
        format!("awslogs-stream={}", spec.stream),
        "--log-opt".into(),
        "awslogs-create-group=true".into(),
    ];
    args.extend(spec.extra_args.iter().cloned());
    args.push(spec.image_ref.into());
    DockerInvocation::docker(args)
}

/// Build the `docker stop` invocation for the shutdown path.
pub fn stop_container(handle: &str) -> DockerInvocation {
    DockerInvocation::docker(vec!["stop".into(), handle.into()])
}

/// Build the daemon availability probe.
pub fn server_version() -> DockerInvocation {
    DockerInvocation::docker(vec![
        "version".into(),
        "--format".into(),
        "{{.Server.Version}}".into(),
    ])
}

/// Build the credential-setup invocation: the materialized script with the
/// two credential strings as positional arguments.
pub fn setup_credentials(script: &Path, key_id: &str, secret: &str) -> DockerInvocation {
    DockerInvocation {
        program: script.display().to_string(),
        args: vec![key_id.into(), secret.into()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_targets_the_image() {
        let inv = inspect_image("web");
        assert_eq!(inv.program, "docker");
        assert_eq!(inv.args, ["image", "inspect", "web"]);
    }

    #[test]
    fn build_tags_image_and_points_at_context() {
        let inv = build_image("web", Path::new("/tmp/ctx"));
        assert!(inv.args.contains(&"build".into()));
        assert!(inv.args.contains(&"-t".into()));
        assert!(inv.args.contains(&"web".into()));
        assert_eq!(inv.args.last(), Some(&"/tmp/ctx".to_string()));
    }

    #[test]
    fn run_carries_all_awslogs_options() {
        let spec = RunSpec {
            image_ref: "web",
            name: "web-container-1",
            region: "us-east-1",
            group: "g",
            stream: "s",
            extra_args: &[],
        };
        let inv = run_detached(&spec);
        assert!(inv.args.contains(&"-d".into()));
        assert!(inv.args.contains(&"--log-driver=awslogs".into()));
        assert!(inv.args.contains(&"awslogs-region=us-east-1".into()));
        assert!(inv.args.contains(&"awslogs-group=g".into()));
        assert!(inv.args.contains(&"awslogs-stream=s".into()));
        assert!(inv.args.contains(&"awslogs-create-group=true".into()));
        // The image ref closes the invocation so every option binds to run.
        assert_eq!(inv.args.last(), Some(&"web".to_string()));
    }

    #[test]
    fn run_names_the_container() {
        let spec = RunSpec {
            image_ref: "web",
            name: "web-container-1",
            region: "r",
            group: "g",
            stream: "s",
            extra_args: &[],
        };
        let inv = run_detached(&spec);
        let pos = inv.args.iter().position(|a| a == "--name").unwrap();
        assert_eq!(inv.args[pos + 1], "web-container-1");
    }

    #[test]
    fn run_places_extra_args_before_image() {
        let extra = vec!["-e".to_string(), "FOO=bar".to_string()];
        let spec = RunSpec {
            image_ref: "web",
            name: "n",
            region: "r",
            group: "g",
            stream: "s",
            extra_args: &extra,
        };
        let inv = run_detached(&spec);
        let e = inv.args.iter().position(|a| a == "FOO=bar").unwrap();
        let i = inv.args.iter().position(|a| a == "web").unwrap();
        assert!(e < i);
    }

    #[test]
    fn stop_targets_the_handle() {
        let inv = stop_container("web-container-1");
        assert_eq!(inv.args, ["stop", "web-container-1"]);
    }

    #[test]
    fn setup_runs_script_with_positional_credentials() {
        let inv = setup_credentials(Path::new("/tmp/ctx/setup-creds.sh"), "AKIA", "s3cr3t");
        assert_eq!(inv.program, "/tmp/ctx/setup-creds.sh");
        assert_eq!(inv.args, ["AKIA", "s3cr3t"]);
    }
}
