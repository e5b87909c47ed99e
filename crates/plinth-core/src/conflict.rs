//! Conflict resolution and the write step
//!
//! Every path of the resolved tree gets exactly one [`ConflictAction`],
//! decided before anything is written. Files already in the target directory
//! that the tree does not mention are never touched.

use crate::error::CreateError;
use crate::generator::MANIFEST_FILE;
use crate::install::Baseline;
use crate::prompt::{Choice, Prompter};
use crate::tree::{AppendLines, Clash, JsonMerge, Merge, ResolvedTree};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictAction {
    /// Path does not exist yet
    Write,
    /// Existing bytes equal the generated bytes
    Identical,
    Overwrite,
    /// Existing content combined with the generated content
    Merge,
    Skip,
    /// Pre-run bytes put back over a file the pipeline wrote earlier in the run
    Restore,
    Abort,
}

impl ConflictAction {
    /// Whether the action puts bytes on disk
    pub fn writes(&self) -> bool {
        matches!(
            self,
            ConflictAction::Write
                | ConflictAction::Overwrite
                | ConflictAction::Merge
                | ConflictAction::Restore
        )
    }
}

impl fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictAction::Write => "write",
            ConflictAction::Identical => "identical",
            ConflictAction::Overwrite => "overwrite",
            ConflictAction::Merge => "merge",
            ConflictAction::Skip => "skip",
            ConflictAction::Restore => "restore",
            ConflictAction::Abort => "abort",
        };
        write!(f, "{}", s)
    }
}

/// Merge strategy registered for a file name, if any
pub fn merge_strategy(path: &str) -> Option<Box<dyn Merge>> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name {
        MANIFEST_FILE => Some(Box::new(JsonMerge)),
        ".gitignore" => Some(Box::new(AppendLines)),
        _ => None,
    }
}

/// One decided path
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub path: String,
    pub action: ConflictAction,
    /// Bytes to write; merged content for [`ConflictAction::Merge`]
    pub contents: Vec<u8>,
}

/// Every decision for one target directory
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    pub target: PathBuf,
    pub files: Vec<PlannedFile>,
    /// Paths two plugins wrote without merge middleware
    pub clashes: Vec<Clash>,
}

impl WritePlan {
    pub fn actions(&self) -> BTreeMap<&str, ConflictAction> {
        self.files
            .iter()
            .map(|f| (f.path.as_str(), f.action))
            .collect()
    }

    pub fn count(&self, action: ConflictAction) -> usize {
        self.files.iter().filter(|f| f.action == action).count()
    }
}

/// Decides what happens to each generated path
pub struct ConflictResolver<'a> {
    prompter: &'a dyn Prompter,
    force: bool,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(prompter: &'a dyn Prompter, force: bool) -> Self {
        Self { prompter, force }
    }

    /// Compute the action of every path of `tree` against `target`
    ///
    /// `baseline` overrides what is on disk for paths the pipeline itself
    /// wrote earlier in the run. Those paths are still rewritten when the
    /// disk no longer holds the planned bytes.
    pub fn plan(
        &self,
        tree: ResolvedTree,
        target: &Path,
        baseline: &Baseline,
    ) -> Result<WritePlan, CreateError> {
        let mut files = Vec::with_capacity(tree.files.len());

        for (path, generated) in tree.files {
            let on_disk = read_existing(&target.join(&path))?;
            let (existing, rewritten) = match baseline.get(&path) {
                Some(content) => (content.clone(), Some(on_disk)),
                None => (on_disk, None),
            };
            let (mut action, contents) = self.decide(&path, existing, generated, target)?;
            tracing::debug!(%path, %action, "conflict decision");
            if action == ConflictAction::Abort {
                return Err(CreateError::ConflictAborted {
                    target: target.to_path_buf(),
                });
            }
            if let Some(on_disk) = rewritten {
                action = reconcile_rewritten(action, on_disk.as_deref(), &contents);
            }
            files.push(PlannedFile {
                path,
                action,
                contents,
            });
        }

        Ok(WritePlan {
            target: target.to_path_buf(),
            files,
            clashes: tree.clashes,
        })
    }

    fn decide(
        &self,
        path: &str,
        existing: Option<Vec<u8>>,
        generated: Vec<u8>,
        target: &Path,
    ) -> Result<(ConflictAction, Vec<u8>), CreateError> {
        let Some(existing) = existing else {
            return Ok((ConflictAction::Write, generated));
        };
        if existing == generated {
            return Ok((ConflictAction::Identical, generated));
        }

        if let Some(merged) = merge_existing(path, &existing, &generated) {
            if merged == existing {
                return Ok((ConflictAction::Identical, merged));
            }
            return Ok((ConflictAction::Merge, merged));
        }

        if self.force || !self.prompter.is_interactive() {
            return Ok((ConflictAction::Overwrite, generated));
        }

        let choices = [
            Choice::new("overwrite", "Overwrite"),
            Choice::new("skip", "Skip"),
            Choice::new("abort", "Abort"),
        ];
        let picked = self
            .prompter
            .select(
                &format!("{} already exists in {}. Pick an action:", path, target.display()),
                &choices,
            )
            .map_err(CreateError::Prompt)?;

        match picked.as_str() {
            "overwrite" => Ok((ConflictAction::Overwrite, generated)),
            "skip" => Ok((ConflictAction::Skip, existing)),
            _ => Ok((ConflictAction::Abort, existing)),
        }
    }
}

/// A path the pipeline already replaced this run must end up holding `contents`
fn reconcile_rewritten(
    action: ConflictAction,
    on_disk: Option<&[u8]>,
    contents: &[u8],
) -> ConflictAction {
    if action.writes() || on_disk == Some(contents) {
        return action;
    }
    match action {
        ConflictAction::Skip => ConflictAction::Restore,
        _ => ConflictAction::Overwrite,
    }
}

fn merge_existing(path: &str, existing: &[u8], generated: &[u8]) -> Option<Vec<u8>> {
    let strategy = merge_strategy(path)?;
    let existing = std::str::from_utf8(existing).ok()?;
    let generated = std::str::from_utf8(generated).ok()?;
    match strategy.merge(existing, generated) {
        Ok(merged) => Some(merged.into_bytes()),
        Err(e) => {
            tracing::warn!(%path, error = %format!("{:#}", e), "existing file could not be merged");
            None
        }
    }
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, CreateError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CreateError::io(path, e)),
    }
}

/// Put every writing action of `plan` on disk, one atomic rename per file
///
/// Returns the paths written.
pub async fn write_plan(plan: &WritePlan) -> Result<Vec<String>, CreateError> {
    let mut written = Vec::new();
    for file in plan.files.iter().filter(|f| f.action.writes()) {
        let path = plan.target.join(&file.path);
        write_atomic(&path, &file.contents).await?;
        tracing::debug!(path = %file.path, action = %file.action, "wrote file");
        written.push(file.path.clone());
    }
    Ok(written)
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CreateError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| CreateError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{}.plinth-tmp", file_name));
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| CreateError::io(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(CreateError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::scripted::Scripted;
    use crate::prompt::Unattended;

    fn tree(files: &[(&str, &str)]) -> ResolvedTree {
        ResolvedTree {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
                .collect(),
            clashes: Vec::new(),
        }
    }

    #[test]
    fn test_missing_target_only_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("missing");
        let prompter = Scripted::new(&[]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(
                tree(&[("a.txt", "a"), ("src/main.js", "main"), (".gitignore", "x\n")]),
                &target,
                &Baseline::new(),
            )
            .unwrap();
        assert_eq!(plan.count(ConflictAction::Write), 3);
        assert_eq!(prompter.asked_count(), 0);
    }

    #[test]
    fn test_identical_and_merge() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("same.txt"), "same").unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "node_modules\n").unwrap();
        std::fs::write(
            tmp.path().join(MANIFEST_FILE),
            r#"{"name":"old","dependencies":{"a":"1"}}"#,
        )
        .unwrap();

        let prompter = Scripted::new(&[]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(
                tree(&[
                    ("same.txt", "same"),
                    (".gitignore", "node_modules\n/dist\n"),
                    (MANIFEST_FILE, r#"{"name":"new","dependencies":{"b":"2"}}"#),
                ]),
                tmp.path(),
                &Baseline::new(),
            )
            .unwrap();

        let actions = plan.actions();
        assert_eq!(actions["same.txt"], ConflictAction::Identical);
        assert_eq!(actions[".gitignore"], ConflictAction::Merge);
        assert_eq!(actions[MANIFEST_FILE], ConflictAction::Merge);

        let manifest = plan.files.iter().find(|f| f.path == MANIFEST_FILE).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&manifest.contents).unwrap();
        assert_eq!(value["name"], "new");
        assert_eq!(value["dependencies"]["a"], "1");
        assert_eq!(value["dependencies"]["b"], "2");
    }

    #[test]
    fn test_baseline_overrides_disk() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_FILE), "{\"name\":\"installer\"}").unwrap();
        let mut baseline = Baseline::new();
        baseline.insert(MANIFEST_FILE.to_string(), None);

        let prompter = Scripted::new(&[]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(tree(&[(MANIFEST_FILE, "{}")]), tmp.path(), &baseline)
            .unwrap();
        assert_eq!(plan.actions()[MANIFEST_FILE], ConflictAction::Write);
    }

    #[tokio::test]
    async fn test_rewritten_path_rewritten_when_result_matches_baseline() {
        let tmp = tempfile::tempdir().unwrap();
        let full = r#"{"name":"app","scripts":{"serve":"serve"}}"#;
        std::fs::write(tmp.path().join(MANIFEST_FILE), r#"{"name":"app"}"#).unwrap();
        let mut baseline = Baseline::new();
        baseline.insert(MANIFEST_FILE.to_string(), Some(full.as_bytes().to_vec()));

        let prompter = Scripted::new(&[]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(tree(&[(MANIFEST_FILE, full)]), tmp.path(), &baseline)
            .unwrap();
        assert_eq!(plan.actions()[MANIFEST_FILE], ConflictAction::Overwrite);

        write_plan(&plan).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(MANIFEST_FILE)).unwrap(),
            full
        );
    }

    #[test]
    fn test_rewritten_path_untouched_when_disk_already_matches() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "same").unwrap();
        let mut baseline = Baseline::new();
        baseline.insert("notes.txt".to_string(), Some(b"same".to_vec()));

        let prompter = Scripted::new(&[]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(tree(&[("notes.txt", "same")]), tmp.path(), &baseline)
            .unwrap();
        assert_eq!(plan.actions()["notes.txt"], ConflictAction::Identical);
    }

    #[test]
    fn test_skipped_rewritten_path_restores_baseline() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("App.vue"), "stub").unwrap();
        let mut baseline = Baseline::new();
        baseline.insert("App.vue".to_string(), Some(b"mine".to_vec()));

        let prompter = Scripted::new(&["skip"]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(tree(&[("App.vue", "generated")]), tmp.path(), &baseline)
            .unwrap();
        let file = &plan.files[0];
        assert_eq!(file.action, ConflictAction::Restore);
        assert_eq!(file.contents, b"mine".to_vec());
    }

    #[test]
    fn test_force_and_unattended_overwrite_without_prompting() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("App.vue"), "old").unwrap();

        let prompter = Scripted::new(&[]);
        let plan = ConflictResolver::new(&prompter, true)
            .plan(tree(&[("App.vue", "new")]), tmp.path(), &Baseline::new())
            .unwrap();
        assert_eq!(plan.actions()["App.vue"], ConflictAction::Overwrite);
        assert_eq!(prompter.asked_count(), 0);

        let plan = ConflictResolver::new(&Unattended, false)
            .plan(tree(&[("App.vue", "new")]), tmp.path(), &Baseline::new())
            .unwrap();
        assert_eq!(plan.actions()["App.vue"], ConflictAction::Overwrite);
    }

    #[test]
    fn test_prompted_skip_and_abort() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("App.vue"), "old").unwrap();

        let prompter = Scripted::new(&["skip"]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(tree(&[("App.vue", "new")]), tmp.path(), &Baseline::new())
            .unwrap();
        assert_eq!(plan.actions()["App.vue"], ConflictAction::Skip);

        let prompter = Scripted::new(&["abort"]);
        let err = ConflictResolver::new(&prompter, false)
            .plan(tree(&[("App.vue", "new")]), tmp.path(), &Baseline::new())
            .unwrap_err();
        assert!(matches!(err, CreateError::ConflictAborted { .. }));

        let prompter = Scripted::new(&["abort"]);
        let (action, _) = ConflictResolver::new(&prompter, false)
            .decide("App.vue", Some(b"old".to_vec()), b"new".to_vec(), tmp.path())
            .unwrap();
        assert_eq!(action, ConflictAction::Abort);
    }

    #[tokio::test]
    async fn test_write_plan_leaves_skipped_and_untracked_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("keep.txt"), "mine").unwrap();
        std::fs::write(tmp.path().join("App.vue"), "old").unwrap();

        let prompter = Scripted::new(&["skip"]);
        let plan = ConflictResolver::new(&prompter, false)
            .plan(
                tree(&[("App.vue", "new"), ("src/main.js", "main")]),
                tmp.path(),
                &Baseline::new(),
            )
            .unwrap();
        let written = write_plan(&plan).await.unwrap();

        assert_eq!(written, vec!["src/main.js".to_string()]);
        assert_eq!(std::fs::read_to_string(tmp.path().join("App.vue")).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(tmp.path().join("keep.txt")).unwrap(), "mine");
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("src/main.js")).unwrap(),
            "main"
        );
        assert!(!tmp.path().join("src/.main.js.plinth-tmp").exists());
    }
}
