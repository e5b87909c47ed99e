//! Vuex store plugin

use crate::generator::GeneratorApi;
use anyhow::Result;
use include_dir::{include_dir, Dir};
use serde_json::{json, Value};

static TEMPLATE: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates/vuex");

const ENTRY: &str = "src/main.js";

pub(super) fn generate(api: &mut GeneratorApi<'_>) -> Result<()> {
    api.inject_imports(ENTRY, ["import store from './store'"])?;
    api.inject_root_options(ENTRY, ["store"])?;
    api.extend_package(json!({
        "dependencies": {
            "vuex": "^3.4.0"
        }
    }))?;
    api.render(&TEMPLATE, Value::Null, None)
}
