use serde::Deserialize;

/// Optional `.dockwatch.yml` values; anything the CLI flags don't supply
/// may come from here.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub docker_image: Option<String>,
    pub bash_command: Option<String>,
    pub aws_cloudwatch_group: Option<String>,
    pub aws_cloudwatch_stream: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: Option<String>,
    /// One string, split with shell quoting rules at resolve time.
    pub extra_run_args: Option<String>,
}

impl FileConfig {
    /// Load config from a `.dockwatch.yml` in the given directory.
    pub fn load(dir: &std::path::Path) -> anyhow::Result<Option<Self>> {
        let path = dir.join(".dockwatch.yml");
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let config: FileConfig = serde_yaml::from_str(&contents)?;
        Ok(Some(config))
    }
}
