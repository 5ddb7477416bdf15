use anyhow::{Context, Result, anyhow};

use super::loader::FileConfig;

/// Fully-resolved invocation parameters. Built once at startup from CLI
/// flags layered over the optional config file; immutable afterward.
#[derive(Debug, Clone)]
pub struct Config {
    pub docker_image: String,
    pub bash_command: String,
    pub aws_cloudwatch_group: String,
    pub aws_cloudwatch_stream: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    /// Extra `docker run` arguments, already split into a vector.
    pub extra_run_args: Vec<String>,
}

/// Option-valued view of the CLI flags, before layering.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub docker_image: Option<String>,
    pub bash_command: Option<String>,
    pub aws_cloudwatch_group: Option<String>,
    pub aws_cloudwatch_stream: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: Option<String>,
    pub extra_run_args: Vec<String>,
}

impl Config {
    /// Layer CLI flags over file values; every parameter must come from one
    /// of the two.
    pub fn resolve(cli: Overrides, file: Option<FileConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let require = |cli_value: Option<String>, file_value: Option<String>, flag: &str| {
            cli_value
                .or(file_value)
                .ok_or_else(|| anyhow!("--{flag} is required (flag or .dockwatch.yml)"))
        };

        let extra_run_args = if !cli.extra_run_args.is_empty() {
            cli.extra_run_args
        } else if let Some(raw) = file.extra_run_args {
            shell_words::split(&raw).context("invalid extra_run_args in .dockwatch.yml")?
        } else {
            Vec::new()
        };

        Ok(Self {
            docker_image: require(cli.docker_image, file.docker_image, "docker-image")?,
            bash_command: require(cli.bash_command, file.bash_command, "bash-command")?,
            aws_cloudwatch_group: require(
                cli.aws_cloudwatch_group,
                file.aws_cloudwatch_group,
                "aws-cloudwatch-group",
            )?,
            aws_cloudwatch_stream: require(
                cli.aws_cloudwatch_stream,
                file.aws_cloudwatch_stream,
                "aws-cloudwatch-stream",
            )?,
            aws_access_key_id: require(
                cli.aws_access_key_id,
                file.aws_access_key_id,
                "aws-access-key-id",
            )?,
            aws_secret_access_key: require(
                cli.aws_secret_access_key,
                file.aws_secret_access_key,
                "aws-secret-access-key",
            )?,
            aws_region: require(cli.aws_region, file.aws_region, "aws-region")?,
            extra_run_args,
        })
    }
}
