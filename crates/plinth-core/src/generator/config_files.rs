//! Moving tool configuration out of the manifest into dedicated files

use super::manifest::Manifest;
use crate::tree::{Content, TreeError, VirtualTree};
use serde_json::Value;

/// Writer recorded in the tree for extracted config files
pub const CONFIG_FILES_OWNER: &str = "config-files";

#[derive(Debug, Clone, Copy)]
enum Format {
    /// `module.exports = { ... }`
    JsModule,
    /// One entry per line
    Lines,
}

const TRANSFORMS: &[(&str, &str, Format)] = &[
    ("babel", "babel.config.js", Format::JsModule),
    ("browserslist", ".browserslistrc", Format::Lines),
    ("postcss", "postcss.config.js", Format::JsModule),
    ("eslintConfig", ".eslintrc.js", Format::JsModule),
    ("jest", "jest.config.js", Format::JsModule),
];

/// Extract known config keys from `manifest` into files in `tree`
///
/// A key stays in the manifest when the tree already has its file or when
/// its value cannot be expressed in the file format. Returns the files written.
pub fn extract_config_files(
    manifest: &mut Manifest,
    tree: &mut VirtualTree,
) -> Result<Vec<String>, TreeError> {
    let mut written = Vec::new();

    for (key, file, format) in TRANSFORMS {
        let Some(value) = manifest.get(key) else {
            continue;
        };
        if tree.contains(file) {
            tracing::debug!(key, file, "config file already generated; keeping key in manifest");
            continue;
        }
        let Some(contents) = render(value, *format) else {
            tracing::debug!(key, "config value not extractable");
            continue;
        };

        tree.write(CONFIG_FILES_OWNER, file, Content::text(contents), None)?;
        manifest.remove(key);
        written.push(file.to_string());
    }

    Ok(written)
}

fn render(value: &Value, format: Format) -> Option<String> {
    match format {
        Format::JsModule => {
            let body = serde_json::to_string_pretty(value).ok()?;
            Some(format!("module.exports = {}\n", body))
        }
        Format::Lines => {
            let lines = value
                .as_array()?
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("{}\n", lines.join("\n")))
        }
    }
}
