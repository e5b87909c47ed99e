//! Core service plugin: application entry, root component and build scripts

use super::ROUTER;
use crate::generator::GeneratorApi;
use crate::preset::CssPreprocessor;
use anyhow::Result;
use include_dir::{include_dir, Dir};
use serde_json::{json, Value};

static BASE: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates/service/base");
static HELLO_WORLD: Dir<'static> =
    include_dir!("$CARGO_MANIFEST_DIR/templates/service/hello-world");

pub(super) fn generate(api: &mut GeneratorApi<'_>) -> Result<()> {
    let bare = api
        .options()
        .get("bare")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let css = api
        .options()
        .get("cssPreprocessor")
        .and_then(Value::as_str)
        .and_then(CssPreprocessor::parse);
    let router = api.has_plugin(ROUTER);

    let data = json!({
        "bare": bare,
        "router": router,
        "lang": css.map(style_lang).unwrap_or(""),
    });
    api.render(&BASE, data.clone(), None)?;
    if !bare && !router {
        api.render(&HELLO_WORLD, data, None)?;
    }

    api.extend_package(json!({
        "scripts": {
            "serve": "cli-service serve",
            "build": "cli-service build"
        },
        "dependencies": {
            "vue": "^2.6.11"
        },
        "devDependencies": {
            "vue-template-compiler": "^2.6.11"
        },
        "browserslist": ["> 1%", "last 2 versions", "not dead"]
    }))?;

    if let Some(css) = css {
        api.extend_package(json!({ "devDependencies": css_dependencies(css) }))?;
    }
    Ok(())
}

fn style_lang(css: CssPreprocessor) -> &'static str {
    match css {
        CssPreprocessor::Sass | CssPreprocessor::DartSass => "scss",
        CssPreprocessor::Less => "less",
        CssPreprocessor::Stylus => "stylus",
    }
}

fn css_dependencies(css: CssPreprocessor) -> Value {
    match css {
        CssPreprocessor::Sass => json!({"node-sass": "^4.12.0", "sass-loader": "^8.0.2"}),
        CssPreprocessor::DartSass => json!({"sass": "^1.26.5", "sass-loader": "^8.0.2"}),
        CssPreprocessor::Less => json!({"less": "^3.0.4", "less-loader": "^5.0.0"}),
        CssPreprocessor::Stylus => json!({"stylus": "^0.54.7", "stylus-loader": "^3.0.2"}),
    }
}
