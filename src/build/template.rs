use include_dir::{Dir, include_dir};

static TEMPLATES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Placeholder substituted with the wrapped-command script name.
const SCRIPT_VAR: &str = "{{ bash_script }}";

/// Render the Dockerfile around the named command script.
///
/// Only the script NAME goes into the Dockerfile. The command text itself
/// lives in the script file, so shell metacharacters and multiline commands
/// never touch a Dockerfile instruction.
pub fn render_dockerfile(script_name: &str) -> String {
    embedded("Dockerfile.template").replace(SCRIPT_VAR, script_name)
}

/// The credential-setup script shipped inside the binary.
pub fn setup_script() -> &'static str {
    embedded("setup-creds.sh")
}

fn embedded(name: &str) -> &'static str {
    TEMPLATES
        .get_file(name)
        .and_then(|f| f.contents_utf8())
        .expect("template is embedded at compile time")
}
