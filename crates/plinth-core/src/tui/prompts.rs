//! Charm-style CLI prompts using cliclack

use crate::config::RcFile;
use crate::creator::{Collaborators, CreateOptions, Created, Creator, Stage};
use crate::install::CommandPackageManager;
use crate::invoke::{InvokeOptions, Invoked, Invoker};
use crate::plugins::PluginCatalog;
use crate::preset::{PresetFetcher, RcPresetStore};
use crate::product::ProductConfig;
use crate::prompt::{Choice, Prompter, Unattended};
use crate::vcs::GitCli;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Prompter backed by cliclack
#[derive(Debug, Clone, Copy, Default)]
pub struct CliclackPrompter;

impl Prompter for CliclackPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Ok(cliclack::confirm(message).initial_value(default).interact()?)
    }

    fn select(&self, message: &str, choices: &[Choice]) -> Result<String> {
        let mut select = cliclack::select(message);
        for choice in choices {
            select = select.item(choice.value.clone(), &choice.label, &choice.hint);
        }
        Ok(select.interact()?)
    }

    fn multiselect(&self, message: &str, choices: &[Choice]) -> Result<Vec<String>> {
        let mut multi = cliclack::multiselect(message);
        for choice in choices {
            multi = multi.item(choice.value.clone(), &choice.label, &choice.hint);
        }
        let initial: Vec<String> = choices
            .iter()
            .filter(|c| c.selected)
            .map(|c| c.value.clone())
            .collect();
        Ok(multi.initial_values(initial).required(false).interact()?)
    }

    fn input(&self, message: &str, default: &str) -> Result<String> {
        let mut input = cliclack::input(message).required(false);
        if !default.is_empty() {
            input = input.placeholder(default).default_input(default);
        }
        let value: String = input.interact()?;
        Ok(value)
    }
}

/// CLI arguments for the create command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    /// Project name, or `.` for the current directory
    pub project: String,

    pub options: CreateOptions,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Create a project with interactive prompts
pub async fn run<C: ProductConfig>(config: &C, args: CreateArgs) -> Result<()> {
    cliclack::intro(config.display_name())?;

    let rc_path = RcFile::default_path(config.rc_file_name());
    let rc = load_rc(&rc_path)?;
    let store = RcPresetStore::new(rc_path);
    let fetcher = PresetFetcher::from_config(config)?;
    let package_manager = CommandPackageManager::new();
    let vcs = GitCli;
    let prompter: &dyn Prompter = if args.yes {
        &Unattended
    } else {
        &CliclackPrompter
    };
    let cwd = std::env::current_dir()?;

    let mut creator = Creator::new(
        &args.project,
        &cwd,
        Collaborators {
            prompter,
            store: &store,
            fetcher: &fetcher,
            package_manager: &package_manager,
            vcs: &vcs,
        },
    )
    .with_preferred_package_manager(rc.package_manager)
    .on_stage(report_stage);

    cliclack::log::info(format!(
        "Creating project in {}",
        creator.target().display().to_string().yellow()
    ))?;

    let created = match creator.create(args.options).await {
        Ok(created) => created,
        Err(e) => {
            let e = anyhow::Error::from(e);
            cliclack::outro_cancel(format!("{:#}", e))?;
            return Err(e);
        }
    };

    report_created(&created)?;
    print_next_steps(config, &created)?;

    Ok(())
}

fn load_rc(path: &Path) -> Result<RcFile> {
    match RcFile::load(path) {
        Ok(rc) => Ok(rc),
        Err(e) => {
            cliclack::log::warning(format!("Ignoring unreadable rc file: {:#}", e))?;
            Ok(RcFile::default())
        }
    }
}

fn report_stage(stage: Stage) {
    let message = match stage {
        Stage::Installing => "Installing plugins. This might take a while...",
        Stage::Generating => "Invoking generators...",
        Stage::Writing => "Writing files...",
        Stage::Finalizing => "Finishing up...",
        _ => return,
    };
    let _ = cliclack::log::step(message);
}

fn report_created(created: &Created) -> Result<()> {
    for clash in &created.plan.clashes {
        cliclack::log::warning(format!(
            "{} from {} was overwritten by {}",
            clash.path, clash.first, clash.second
        ))?;
    }
    cliclack::log::success(format!(
        "Successfully created project {} ({} files written)",
        created.project_name.cyan(),
        created.written.len()
    ))?;
    if created.git_initialized {
        cliclack::log::info("Initialized a git repository")?;
    }
    Ok(())
}

fn print_next_steps<C: ProductConfig>(config: &C, created: &Created) -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let dir = created
        .target
        .strip_prefix(&cwd)
        .unwrap_or(&created.target);
    let steps = config.next_steps(dir, created.package_manager);

    println!();
    println!("  {}", console::style("Next steps").bold());
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step);
    }

    cliclack::outro("Happy coding!")?;

    Ok(())
}

/// Which single-plugin command to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginCommand {
    /// Install, then invoke
    Add,
    Invoke,
}

#[derive(Debug, Clone)]
pub struct PluginArgs {
    pub command: PluginCommand,
    pub plugin: String,
    pub options: InvokeOptions,
    pub yes: bool,
}

/// Add or invoke one plugin in the project in the current directory
pub async fn run_plugin<C: ProductConfig>(config: &C, args: PluginArgs) -> Result<()> {
    cliclack::intro(config.display_name())?;

    let rc = load_rc(&RcFile::default_path(config.rc_file_name()))?;
    let package_manager = CommandPackageManager::new();
    let catalog = PluginCatalog::builtin();
    let prompter: &dyn Prompter = if args.yes {
        &Unattended
    } else {
        &CliclackPrompter
    };
    let invoker = Invoker {
        dir: std::env::current_dir()?,
        prompter,
        package_manager: &package_manager,
        catalog: &catalog,
        preferred_package_manager: rc.package_manager,
    };

    let spinner = cliclack::spinner();
    let result = match args.command {
        PluginCommand::Add => {
            spinner.start(format!("Installing {}...", args.plugin));
            invoker.add(&args.plugin, args.options).await
        }
        PluginCommand::Invoke => {
            spinner.start(format!("Invoking generator for {}...", args.plugin));
            invoker.invoke(&args.plugin, args.options).await
        }
    };

    match result {
        Ok(invoked) => {
            spinner.stop(format!("Invoked {}", invoked.plugin));
            report_invoked(&invoked)?;
            cliclack::outro("Done")?;
            Ok(())
        }
        Err(e) => {
            spinner.error("Failed");
            let e = anyhow::Error::from(e);
            cliclack::outro_cancel(format!("{:#}", e))?;
            Err(e)
        }
    }
}

fn report_invoked(invoked: &Invoked) -> Result<()> {
    if invoked.written.is_empty() {
        cliclack::log::info("No files changed")?;
        return Ok(());
    }
    let files = invoked
        .written
        .iter()
        .map(|f| format!("  {}", f))
        .collect::<Vec<_>>()
        .join("\n");
    cliclack::log::info(format!("The following files have been updated / added:\n{}", files))?;
    Ok(())
}
