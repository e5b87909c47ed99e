//! Extension points for generated entry files
//!
//! Plugins do not edit entry source text. They register import lines and root
//! options, which are spliced in after every generator has run.

/// Line after which root options are inserted
pub const ROOT_OPTIONS_ANCHOR: &str = "new Vue({";

/// Append-only contributions to one file, in preset order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionPoint {
    pub imports: Vec<String>,
    pub root_options: Vec<String>,
}

impl ExtensionPoint {
    pub fn add_import(&mut self, import: &str) {
        let import = import.trim();
        if !import.is_empty() && !self.imports.iter().any(|i| i == import) {
            self.imports.push(import.to_string());
        }
    }

    pub fn add_root_option(&mut self, option: &str) {
        let option = option.trim().trim_end_matches(',');
        if !option.is_empty() && !self.root_options.iter().any(|o| o == option) {
            self.root_options.push(option.to_string());
        }
    }

    pub fn apply(&self, source: &str) -> String {
        let with_imports = inject_imports(source, &self.imports);
        inject_root_options(&with_imports, &self.root_options)
    }
}

/// Insert import lines after the last top-level `import`, or at the top
pub fn inject_imports(source: &str, imports: &[String]) -> String {
    let mut lines: Vec<String> = source.lines().map(str::to_string).collect();
    let fresh: Vec<&String> = imports
        .iter()
        .filter(|i| !lines.iter().any(|l| l.trim() == i.as_str()))
        .collect();
    if fresh.is_empty() {
        return source.to_string();
    }

    let at = lines
        .iter()
        .rposition(|l| l.starts_with("import "))
        .map_or(0, |i| i + 1);
    for (offset, import) in fresh.into_iter().enumerate() {
        lines.insert(at + offset, import.clone());
    }
    join(lines, source)
}

/// Insert root options after the line holding [`ROOT_OPTIONS_ANCHOR`]
pub fn inject_root_options(source: &str, options: &[String]) -> String {
    if options.is_empty() {
        return source.to_string();
    }

    let mut lines: Vec<String> = source.lines().map(str::to_string).collect();
    let Some(anchor) = lines.iter().position(|l| l.contains(ROOT_OPTIONS_ANCHOR)) else {
        tracing::warn!("no `{}` found; root options not injected", ROOT_OPTIONS_ANCHOR);
        return source.to_string();
    };

    let indent = lines
        .get(anchor + 1)
        .map(|l| l.len() - l.trim_start().len())
        .filter(|n| *n > 0)
        .unwrap_or(2);
    let fresh: Vec<String> = options
        .iter()
        .map(|o| format!("{}{},", " ".repeat(indent), o))
        .filter(|o| !lines.iter().any(|l| l.trim() == o.trim()))
        .collect();

    for (offset, option) in fresh.into_iter().enumerate() {
        lines.insert(anchor + 1 + offset, option);
    }
    join(lines, source)
}

fn join(lines: Vec<String>, original: &str) -> String {
    let mut out = lines.join("\n");
    if original.ends_with('\n') {
        out.push('\n');
    }
    out
}
