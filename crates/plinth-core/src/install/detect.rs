//! Package manager detection

use super::PackageManagerKind;
use std::process::Command;

/// Package managers in order of preference
const PREFERENCE: &[PackageManagerKind] = &[
    PackageManagerKind::Yarn,
    PackageManagerKind::Pnpm,
    PackageManagerKind::Npm,
];

/// Check if a package manager answers `--version`
pub fn is_available(kind: PackageManagerKind) -> bool {
    Command::new(kind.binary())
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// First available package manager, npm if none answers
pub fn detect_package_manager() -> PackageManagerKind {
    PREFERENCE
        .iter()
        .copied()
        .find(|kind| is_available(*kind))
        .unwrap_or(PackageManagerKind::Npm)
}

/// CLI choice, else the rc file preference, else detection
pub fn select_package_manager(
    cli: Option<PackageManagerKind>,
    preferred: Option<PackageManagerKind>,
) -> PackageManagerKind {
    cli.or(preferred).unwrap_or_else(detect_package_manager)
}
