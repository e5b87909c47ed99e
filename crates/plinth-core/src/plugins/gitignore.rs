//! Writes `.gitignore`; later plugins append lines instead of replacing it

use crate::generator::GeneratorApi;
use crate::tree::{AppendLines, Middleware};
use anyhow::Result;
use include_dir::{include_dir, Dir};
use serde_json::Value;
use std::sync::Arc;

static TEMPLATE: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates/gitignore");

pub(super) fn generate(api: &mut GeneratorApi<'_>) -> Result<()> {
    let lines: Middleware = Arc::new(AppendLines);
    api.render(&TEMPLATE, Value::Null, Some(lines))
}
