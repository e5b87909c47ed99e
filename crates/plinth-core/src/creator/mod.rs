//! The `create` state machine
//!
//! One run walks `ResolvingPreset → Installing → Generating →
//! ResolvingConflicts → Writing → Finalizing → Done`; any failure moves it to
//! `Failed`. Nothing touches the filesystem before `Installing`, and nothing
//! in the target directory changes between `Installing` and `Writing` apart
//! from the installer's manifest and whatever the package manager creates.

pub mod name;
pub mod readme;
pub mod target;

use crate::conflict::{write_plan, ConflictResolver, WritePlan};
use crate::error::CreateError;
use crate::generator::{run_generators, Manifest};
use crate::install::{
    select_package_manager, InstallationPlan, PackageManager, PackageManagerKind, PluginInstaller,
};
use crate::plugins::PluginCatalog;
use crate::preset::{
    builtin_prompt_modules, prepare_preset, Preset, PresetFetcher, PresetOptions, PresetResolver,
    PresetStore, PromptModule,
};
use crate::prompt::Prompter;
use crate::tree::Content;
use crate::vcs::{should_init_git, VersionControl, DEFAULT_COMMIT_MESSAGE};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub use name::{name_problems, validate_project_name};
pub use readme::{generate_readme, README_FILE};
pub use target::{prepare_target, TargetMode};

/// Writer recorded in the tree for the generated README
const README_OWNER: &str = "readme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingPreset,
    Installing,
    Generating,
    ResolvingConflicts,
    Writing,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ResolvingPreset => "resolving preset",
            Stage::Installing => "installing plugins",
            Stage::Generating => "invoking generators",
            Stage::ResolvingConflicts => "resolving conflicts",
            Stage::Writing => "writing files",
            Stage::Finalizing => "finalizing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Options of one `create` call
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub preset: PresetOptions,
    /// Scaffold without beginner instructions
    pub bare: bool,
    /// Remove an existing target directory without asking
    pub force: bool,
    /// Merge into an existing target directory without asking
    pub merge: bool,
    pub package_manager: Option<PackageManagerKind>,
    pub registry: Option<Url>,
    /// `Some(true)` forces git init, `Some(false)` skips it, `None` decides
    pub git: Option<bool>,
    pub commit_message: Option<String>,
}

/// External systems a run talks to
pub struct Collaborators<'a> {
    pub prompter: &'a dyn Prompter,
    pub store: &'a dyn PresetStore,
    pub fetcher: &'a PresetFetcher,
    pub package_manager: &'a dyn PackageManager,
    pub vcs: &'a dyn VersionControl,
}

/// What a finished run produced
#[derive(Debug)]
pub struct Created {
    pub project_name: String,
    pub target: PathBuf,
    pub preset: Preset,
    pub package_manager: PackageManagerKind,
    pub plan: WritePlan,
    pub written: Vec<String>,
    pub git_initialized: bool,
}

type StageObserver = Box<dyn Fn(Stage) + Send + Sync>;

/// Orchestrates project creation
pub struct Creator<'a> {
    name: String,
    target: PathBuf,
    in_current: bool,
    collaborators: Collaborators<'a>,
    catalog: PluginCatalog,
    prompt_modules: Vec<PromptModule>,
    preferred_package_manager: Option<PackageManagerKind>,
    history: Vec<Stage>,
    observer: Option<StageObserver>,
}

impl<'a> Creator<'a> {
    /// `project` is a name (created under `cwd`) or `.` for `cwd` itself
    pub fn new(project: &str, cwd: &Path, collaborators: Collaborators<'a>) -> Self {
        let in_current = project == ".";
        let (name, target) = if in_current {
            let name = cwd
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (name, cwd.to_path_buf())
        } else {
            (project.to_string(), cwd.join(project))
        };

        Self {
            name,
            target,
            in_current,
            collaborators,
            catalog: PluginCatalog::builtin(),
            prompt_modules: builtin_prompt_modules(),
            preferred_package_manager: None,
            history: Vec::new(),
            observer: None,
        }
    }

    pub fn with_catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_prompt_modules(mut self, modules: Vec<PromptModule>) -> Self {
        self.prompt_modules = modules;
        self
    }

    /// Package manager from the rc file, used when the options name none
    pub fn with_preferred_package_manager(mut self, kind: Option<PackageManagerKind>) -> Self {
        self.preferred_package_manager = kind;
        self
    }

    /// Called on every stage transition
    pub fn on_stage<F>(mut self, observer: F) -> Self
    where
        F: Fn(Stage) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn project_name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Every stage entered so far, in order
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn stage(&self) -> Option<Stage> {
        self.history.last().copied()
    }

    pub async fn create(&mut self, options: CreateOptions) -> Result<Created, CreateError> {
        let result = self.run(&options).await;
        match &result {
            Ok(_) => self.enter(Stage::Done),
            Err(e) => {
                tracing::error!(error = %e, "project creation failed");
                self.enter(Stage::Failed);
            }
        }
        result
    }

    fn enter(&mut self, stage: Stage) {
        tracing::info!(%stage, project = %self.name, "stage");
        self.history.push(stage);
        if let Some(observer) = &self.observer {
            observer(stage);
        }
    }

    async fn run(&mut self, options: &CreateOptions) -> Result<Created, CreateError> {
        validate_project_name(&self.name)?;

        self.enter(Stage::ResolvingPreset);
        let resolver = PresetResolver {
            store: self.collaborators.store,
            fetcher: self.collaborators.fetcher,
            prompter: self.collaborators.prompter,
            prompt_modules: &self.prompt_modules,
        };
        let preset = resolver.resolve(&options.preset).await?;
        let preset = prepare_preset(preset, &self.name, options.bare)?;

        self.enter(Stage::Installing);
        prepare_target(
            &self.target,
            self.in_current,
            options.force,
            options.merge,
            self.collaborators.prompter,
        )?;
        let package_manager =
            select_package_manager(options.package_manager, self.preferred_package_manager);
        let installer = PluginInstaller {
            catalog: &self.catalog,
            package_manager: self.collaborators.package_manager,
        };
        let installed = installer
            .install(
                &preset,
                &self.target,
                Manifest::new(&self.name),
                package_manager,
                options.registry.clone(),
            )
            .await?;

        self.enter(Stage::Generating);
        let mut generation =
            run_generators(&preset, &self.name, &installed.plugins, installed.manifest)?;
        if !generation.tree.contains(README_FILE) {
            let readme = generate_readme(&generation.manifest, package_manager);
            generation
                .tree
                .write(README_OWNER, README_FILE, Content::text(readme), None)?;
        }
        let resolved = generation.tree.resolve()?;

        self.enter(Stage::ResolvingConflicts);
        let plan = ConflictResolver::new(self.collaborators.prompter, options.force).plan(
            resolved,
            &self.target,
            &installed.baseline,
        )?;
        for clash in &plan.clashes {
            tracing::warn!(
                path = %clash.path,
                first = %clash.first,
                second = %clash.second,
                "file overwritten by a later plugin"
            );
        }

        self.enter(Stage::Writing);
        let written = write_plan(&plan).await?;

        self.enter(Stage::Finalizing);
        let sync = InstallationPlan::from_manifest(
            &generation.manifest,
            package_manager,
            options.registry.clone(),
        );
        if sync.project_deps != installed.plan.project_deps {
            tracing::info!("generators changed dependencies; installing again");
            if let Err(e) = self
                .collaborators
                .package_manager
                .install(&self.target, &sync)
                .await
            {
                tracing::warn!(error = %format!("{:#}", e), "dependency sync failed");
            }
        }

        for (plugin, hook) in generation.hooks {
            if let Err(e) = hook(self.target.as_path()) {
                tracing::warn!(%plugin, error = %format!("{:#}", e), "completion hook failed");
            }
        }

        let git_initialized = self.init_git(options).await;

        Ok(Created {
            project_name: self.name.clone(),
            target: self.target.clone(),
            preset,
            package_manager,
            plan,
            written,
            git_initialized,
        })
    }

    async fn init_git(&self, options: &CreateOptions) -> bool {
        let vcs = self.collaborators.vcs;
        if !should_init_git(vcs, &self.target, options.git).await {
            return false;
        }
        if let Err(e) = vcs.init(&self.target).await {
            tracing::warn!(error = %format!("{:#}", e), "git init failed");
            return false;
        }
        let message = options
            .commit_message
            .as_deref()
            .unwrap_or(DEFAULT_COMMIT_MESSAGE);
        if let Err(e) = vcs.commit_all(&self.target, message).await {
            tracing::warn!(
                error = %format!("{:#}", e),
                "initial commit failed; you may need to configure your git user"
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictAction;
    use crate::generator::{GeneratorApi, MANIFEST_FILE};
    use crate::install::fake::RecordingPackageManager;
    use crate::plugins::{PluginSpec, SERVICE};
    use crate::preset::{MemoryPresetStore, DEFAULT_PRESET_BASE_URL};
    use crate::prompt::scripted::Scripted;
    use crate::prompt::Unattended;
    use crate::tree::RenderSource;
    use crate::vcs::fake::RecordingVcs;
    use serde_json::Value;

    struct Fixture {
        store: MemoryPresetStore,
        fetcher: PresetFetcher,
        pm: RecordingPackageManager,
        vcs: RecordingVcs,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryPresetStore::new(),
                fetcher: PresetFetcher::new(Url::parse(DEFAULT_PRESET_BASE_URL).unwrap(), "test"),
                pm: RecordingPackageManager::default(),
                vcs: RecordingVcs::default(),
            }
        }

        fn collaborators<'a>(&'a self, prompter: &'a dyn Prompter) -> Collaborators<'a> {
            Collaborators {
                prompter,
                store: &self.store,
                fetcher: &self.fetcher,
                package_manager: &self.pm,
                vcs: &self.vcs,
            }
        }
    }

    fn inline(preset: &str) -> CreateOptions {
        CreateOptions {
            preset: PresetOptions {
                inline_preset: Some(preset.to_string()),
                ..Default::default()
            },
            package_manager: Some(PackageManagerKind::Npm),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_inline_service_preset_writes_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let fx = Fixture::new();
        let mut creator = Creator::new("my-app", tmp.path(), fx.collaborators(&Unattended));

        let created = creator
            .create(inline(r#"{"plugins":{"@core/cli-service":{}}}"#))
            .await
            .unwrap();

        let manifest: Value = serde_json::from_str(
            &std::fs::read_to_string(tmp.path().join("my-app").join(MANIFEST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["name"], "my-app");
        assert!(tmp.path().join("my-app/README.md").exists());
        assert!(tmp.path().join("my-app/.gitignore").exists());
        assert_eq!(created.plan.count(ConflictAction::Write), created.plan.files.len());
        assert_eq!(
            creator.history(),
            &[
                Stage::ResolvingPreset,
                Stage::Installing,
                Stage::Generating,
                Stage::ResolvingConflicts,
                Stage::Writing,
                Stage::Finalizing,
                Stage::Done,
            ]
        );
        // plugin install, then the sync for dependencies the service added
        assert_eq!(fx.pm.calls(), 2);
        assert!(created.git_initialized);
        assert_eq!(fx.vcs.calls(), vec!["init".to_string(), "commit init".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_name_fails_before_any_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let fx = Fixture::new();
        let mut creator = Creator::new("Bad Name", tmp.path(), fx.collaborators(&Unattended));

        let err = creator.create(inline("{\"plugins\":{}}")).await.unwrap_err();
        assert!(matches!(err, CreateError::InvalidProjectName { .. }));
        assert_eq!(creator.history(), &[Stage::Failed]);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_preset_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let fx = Fixture::new();
        let mut creator = Creator::new("app", tmp.path(), fx.collaborators(&Unattended));

        let err = creator.create(inline("{not json")).await.unwrap_err();
        assert!(matches!(err, CreateError::InvalidPreset { .. }));
        assert_eq!(creator.history(), &[Stage::ResolvingPreset, Stage::Failed]);
        assert!(!tmp.path().join("app").exists());
        assert_eq!(fx.pm.calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_generator_leaves_no_rendered_files() {
        let tmp = tempfile::tempdir().unwrap();
        let fx = Fixture::new();
        let catalog = PluginCatalog::builtin().with(
            "@acme/cli-plugin-broken",
            PluginSpec::new(|api: &mut GeneratorApi<'_>| -> anyhow::Result<()> {
                for name in ["one.txt", "two.txt", "three.txt"] {
                    api.render(RenderSource::file(name, "x"), Value::Null, None)?;
                }
                anyhow::bail!("boom")
            }),
        );
        let mut creator = Creator::new("app", tmp.path(), fx.collaborators(&Unattended))
            .with_catalog(catalog);

        let err = creator
            .create(inline(r#"{"plugins":{"@acme/cli-plugin-broken":{}}}"#))
            .await
            .unwrap_err();

        assert_eq!(err.plugin(), Some("@acme/cli-plugin-broken"));
        for name in ["one.txt", "two.txt", "three.txt"] {
            assert!(!tmp.path().join("app").join(name).exists());
        }
        assert_eq!(creator.stage(), Some(Stage::Failed));
    }

    #[tokio::test]
    async fn test_force_rewrites_without_prompts() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("app");
        std::fs::create_dir_all(app.join("src")).unwrap();
        std::fs::write(app.join("stale.txt"), "stale").unwrap();
        std::fs::write(app.join("src/main.js"), "old").unwrap();

        let fx = Fixture::new();
        let prompter = Scripted::new(&[]);
        let mut creator = Creator::new("app", tmp.path(), fx.collaborators(&prompter));
        let mut options = inline(r#"{"plugins":{"@core/cli-plugin-babel":{}}}"#);
        options.force = true;

        let created = creator.create(options).await.unwrap();

        assert_eq!(prompter.asked_count(), 0);
        assert!(!app.join("stale.txt").exists());
        assert!(std::fs::read_to_string(app.join("src/main.js"))
            .unwrap()
            .contains("new Vue({"));
        assert_eq!(created.plan.count(ConflictAction::Write), created.plan.files.len());
    }

    #[tokio::test]
    async fn test_identical_runs_produce_identical_trees() {
        let options = || inline(r#"{"plugins":{"@core/cli-plugin-router":{"historyMode":true},"@core/cli-plugin-vuex":{}}}"#);
        let mut outputs = Vec::new();
        for _ in 0..2 {
            let tmp = tempfile::tempdir().unwrap();
            let fx = Fixture::new();
            let mut creator = Creator::new("same", tmp.path(), fx.collaborators(&Unattended));
            creator.create(options()).await.unwrap();

            let root = tmp.path().join("same");
            let mut files = std::collections::BTreeMap::new();
            for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.unwrap();
                if entry.file_type().is_file() {
                    let rel = entry.path().strip_prefix(&root).unwrap().to_path_buf();
                    files.insert(rel, std::fs::read(entry.path()).unwrap());
                }
            }
            outputs.push(files);
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn test_dependency_sync_runs_second_install() {
        let tmp = tempfile::tempdir().unwrap();
        let fx = Fixture::new();
        let mut creator = Creator::new("app", tmp.path(), fx.collaborators(&Unattended));
        creator
            .create(inline(r#"{"plugins":{"@core/cli-plugin-router":{}}}"#))
            .await
            .unwrap();

        // service and router add runtime dependencies during generation
        assert_eq!(fx.pm.calls(), 2);
        let plans = fx.pm.plans.lock().unwrap();
        assert!(plans[1].project_deps.contains_key("vue-router"));
        assert!(plans[0].project_deps.contains_key(SERVICE));
    }

    #[tokio::test]
    async fn test_current_directory_uses_folder_name() {
        let tmp = tempfile::tempdir().unwrap();
        let cwd = tmp.path().join("folder-app");
        std::fs::create_dir_all(&cwd).unwrap();
        let fx = Fixture::new();
        let prompter = Scripted::new(&["yes"]);
        let mut creator = Creator::new(".", &cwd, fx.collaborators(&prompter));
        assert_eq!(creator.project_name(), "folder-app");

        let mut options = inline(r#"{"plugins":{}}"#);
        options.git = Some(false);
        let created = creator.create(options).await.unwrap();
        assert_eq!(created.target, cwd);
        assert!(!created.git_initialized);
        assert!(cwd.join("package.json").exists());
    }
}
