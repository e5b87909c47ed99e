//! Project name validation (npm package-name rules for new packages)

use crate::error::CreateError;

const MAX_LENGTH: usize = 214;

const BLACKLIST: &[&str] = &["node_modules", "favicon.ico"];

const CORE_MODULES: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "dns", "domain", "events", "fs", "http", "http2", "https", "inspector",
    "module", "net", "os", "path", "perf_hooks", "process", "punycode", "querystring",
    "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls", "trace_events",
    "tty", "url", "util", "v8", "vm", "worker_threads", "zlib",
];

/// Every rule `name` breaks; empty when it is a valid new package name
pub fn name_problems(name: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if name.is_empty() {
        problems.push("name length must be greater than zero".to_string());
        return problems;
    }
    if name.starts_with('.') {
        problems.push("name cannot start with a period".to_string());
    }
    if name.starts_with('_') {
        problems.push("name cannot start with an underscore".to_string());
    }
    if name.trim() != name {
        problems.push("name cannot contain leading or trailing spaces".to_string());
    }
    for blacklisted in BLACKLIST {
        if name.eq_ignore_ascii_case(blacklisted) {
            problems.push(format!("{} is a blacklisted name", blacklisted));
        }
    }
    if CORE_MODULES.contains(&name) {
        problems.push(format!("{} is a core module name", name));
    }
    if name.len() > MAX_LENGTH {
        problems.push(format!(
            "name can no longer contain more than {} characters",
            MAX_LENGTH
        ));
    }
    if name.to_lowercase() != name {
        problems.push("name can no longer contain capital letters".to_string());
    }
    let bare = name.rsplit('/').next().unwrap_or(name);
    if bare.contains(['~', '\'', '!', '(', ')', '*']) {
        problems.push("name can no longer contain special characters (\"~'!()*\")".to_string());
    }
    if !is_url_friendly(name) && !is_url_friendly_scoped(name) {
        problems.push("name can only contain URL-friendly characters".to_string());
    }

    problems
}

/// Reject names npm would not accept for a new package
pub fn validate_project_name(name: &str) -> Result<(), CreateError> {
    let reasons = name_problems(name);
    if reasons.is_empty() {
        return Ok(());
    }
    Err(CreateError::InvalidProjectName {
        name: name.to_string(),
        reasons,
    })
}

fn is_url_friendly(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.!~*'()".contains(c))
}

fn is_url_friendly_scoped(name: &str) -> bool {
    let Some(rest) = name.strip_prefix('@') else {
        return false;
    };
    match rest.split_once('/') {
        Some((scope, pkg)) => is_url_friendly(scope) && is_url_friendly(pkg),
        None => false,
    }
}
