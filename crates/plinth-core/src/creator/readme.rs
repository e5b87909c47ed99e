//! README for generated projects

use crate::generator::Manifest;
use crate::install::PackageManagerKind;

const SCRIPT_DESCRIPTIONS: &[(&str, &str)] = &[
    ("serve", "Compiles and hot-reloads for development"),
    ("build", "Compiles and minifies for production"),
    ("test:unit", "Run your unit tests"),
    ("test:e2e", "Run your end-to-end tests"),
    ("lint", "Lints and fixes files"),
];

pub const README_FILE: &str = "README.md";

/// Project README listing setup and the manifest's known scripts
pub fn generate_readme(manifest: &Manifest, package_manager: PackageManagerKind) -> String {
    let name = manifest.name().unwrap_or("project");
    let scripts = manifest.scripts();

    let mut out = format!(
        "# {}\n\n## Project setup\n```\n{}\n```\n",
        name,
        package_manager.install_command()
    );
    for (script, description) in SCRIPT_DESCRIPTIONS {
        if scripts.contains_key(*script) {
            out.push_str(&format!(
                "\n### {}\n```\n{}\n```\n",
                description,
                package_manager.run_command(script)
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_readme_uses_package_manager_commands() {
        let mut manifest = Manifest::new("shop");
        manifest
            .extend(json!({"scripts": {"serve": "x", "build": "y", "custom": "z"}}))
            .unwrap();

        let readme = generate_readme(&manifest, PackageManagerKind::Yarn);
        assert!(readme.starts_with("# shop\n"));
        assert!(readme.contains("```\nyarn\n```"));
        assert!(readme.contains("yarn serve"));
        assert!(readme.contains("Compiles and minifies for production"));
        assert!(!readme.contains("custom"));
    }
}
