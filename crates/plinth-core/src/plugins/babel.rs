//! Babel plugin: only configuration, no files of its own

use super::BABEL;
use crate::generator::GeneratorApi;
use anyhow::Result;
use serde_json::json;

pub(super) fn generate(api: &mut GeneratorApi<'_>) -> Result<()> {
    api.extend_package(json!({
        "babel": {
            "presets": [format!("{}/preset", BABEL)]
        },
        "dependencies": {
            "core-js": "^3.6.5"
        }
    }))
}
