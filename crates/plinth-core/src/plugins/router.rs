//! Router plugin

use crate::generator::GeneratorApi;
use anyhow::Result;
use include_dir::{include_dir, Dir};
use serde_json::{json, Value};

static TEMPLATE: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates/router");

const ENTRY: &str = "src/main.js";

pub(super) fn generate(api: &mut GeneratorApi<'_>) -> Result<()> {
    let history_mode = api
        .options()
        .get("historyMode")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    api.inject_imports(ENTRY, ["import router from './router'"])?;
    api.inject_root_options(ENTRY, ["router"])?;
    api.extend_package(json!({
        "dependencies": {
            "vue-router": "^3.2.0"
        }
    }))?;
    api.render(&TEMPLATE, json!({ "historyMode": history_mode }), None)
}

#[cfg(test)]
mod tests {
    use crate::generator::{run_generators, Manifest};
    use crate::plugins::{PluginCatalog, ROUTER, VUEX};
    use crate::preset::{prepare_preset, PluginEntry, Preset};

    #[test]
    fn test_router_and_vuex_extend_entry_in_preset_order() {
        let mut preset = Preset::default();
        preset
            .plugins
            .push(PluginEntry::new(ROUTER).with_option("historyMode", true));
        preset.plugins.push(PluginEntry::new(VUEX));
        let preset = prepare_preset(preset, "app", false).unwrap();
        let plugins = PluginCatalog::builtin().load(&preset);

        let files = run_generators(&preset, "app", &plugins, Manifest::new("app"))
            .unwrap()
            .tree
            .resolve()
            .unwrap()
            .files;

        let main = String::from_utf8(files["src/main.js"].clone()).unwrap();
        let router = main.find("import router from './router'").unwrap();
        let store = main.find("import store from './store'").unwrap();
        assert!(router < store);
        assert!(main.contains("new Vue({\n  router,\n  store,\n  render: h => h(App)"));

        let index = String::from_utf8(files["src/router/index.js"].clone()).unwrap();
        assert!(index.contains("mode: 'history'"));
        assert!(files.contains_key("src/store/index.js"));
    }
}
