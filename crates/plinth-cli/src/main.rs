//! plinth CLI - Project scaffolding from plugin presets

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plinth_core::creator::CreateOptions;
use plinth_core::invoke::InvokeOptions;
use plinth_core::preset::PresetOptions;
use plinth_core::tui::{CreateArgs, PluginArgs, PluginCommand};
use plinth_core::{PackageManagerKind, ProductConfig};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

/// Environment variable holding the log filter
const LOG_ENV: &str = "PLINTH_LOG";

/// plinth product configuration
#[derive(Clone)]
pub struct PlinthConfig;

impl ProductConfig for PlinthConfig {
    fn name(&self) -> &'static str {
        "plinth"
    }

    fn display_name(&self) -> &'static str {
        "plinth"
    }

    fn preset_url_env(&self) -> &'static str {
        "PLINTH_PRESET_URL"
    }

    fn rc_file_name(&self) -> &'static str {
        ".plinthrc"
    }

    fn cli_description(&self) -> &'static str {
        "CLI for scaffolding projects from plugin presets"
    }

    fn next_steps(&self, dir: &Path, package_manager: PackageManagerKind) -> Vec<String> {
        let mut steps = Vec::new();

        // Step 1: cd to directory if not current
        if !dir.as_os_str().is_empty() && dir != Path::new(".") {
            steps.push(format!("cd {}", dir.display()));
        }

        // Step 2: start the dev server
        steps.push(package_manager.run_command("serve"));

        steps
    }
}

#[derive(Parser, Debug)]
#[command(name = "plinth")]
#[command(about = "CLI for scaffolding projects from plugin presets")]
#[command(version)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error), overridden by PLINTH_LOG
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project
    Create(CliCreateArgs),
    /// Install a plugin and invoke its generator in the current project
    Add(CliAddArgs),
    /// Invoke the generator of an installed plugin in the current project
    Invoke(CliInvokeArgs),
}

#[derive(Parser, Debug)]
pub struct CliCreateArgs {
    /// Project name, or `.` to create in the current directory
    #[arg(value_name = "app-name")]
    pub app_name: String,

    /// Saved preset name, local preset file or remote preset
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Skip prompts and use the default preset
    #[arg(short, long)]
    pub default: bool,

    /// Skip prompts and use an inline JSON string as preset
    #[arg(short, long = "inline-preset", value_name = "json")]
    pub inline_preset: Option<String>,

    /// Use the specified package manager when installing dependencies
    #[arg(short = 'm', long = "package-manager", value_enum)]
    pub package_manager: Option<PackageManagerKind>,

    /// Use the specified registry when installing dependencies
    #[arg(short, long)]
    pub registry: Option<Url>,

    /// Force git initialization with an optional initial commit message
    #[arg(short, long, value_name = "message", num_args = 0..=1, conflicts_with = "no_git")]
    pub git: Option<Option<String>>,

    /// Skip git initialization
    #[arg(short, long = "no-git")]
    pub no_git: bool,

    /// Overwrite target directory if it exists
    #[arg(short, long)]
    pub force: bool,

    /// Merge target directory if it exists (ignored with --force)
    #[arg(long)]
    pub merge: bool,

    /// Use the specified proxy when creating the project
    #[arg(short = 'x', long)]
    pub proxy: Option<String>,

    /// Scaffold the project without beginner instructions
    #[arg(short, long)]
    pub bare: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

impl From<CliCreateArgs> for CreateArgs {
    fn from(args: CliCreateArgs) -> Self {
        let git = if args.no_git {
            Some(false)
        } else if args.git.is_some() {
            Some(true)
        } else {
            None
        };

        CreateArgs {
            project: args.app_name,
            options: CreateOptions {
                preset: PresetOptions {
                    inline_preset: args.inline_preset,
                    preset: args.preset,
                    default: args.default,
                },
                bare: args.bare,
                force: args.force,
                merge: args.merge,
                package_manager: args.package_manager,
                registry: args.registry,
                git,
                commit_message: args.git.flatten(),
            },
            yes: args.yes,
        }
    }
}

#[derive(Parser, Debug)]
pub struct CliAddArgs {
    /// Plugin name, e.g. `router` or `@acme/foo`
    pub plugin: String,

    /// Use the specified registry when installing the plugin
    #[arg(long)]
    pub registry: Option<Url>,

    /// Generator option as key=value (repeatable)
    #[arg(long = "option", value_name = "key=value", value_parser = parse_option)]
    pub options: Vec<(String, serde_json::Value)>,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Debug)]
pub struct CliInvokeArgs {
    /// Plugin name, e.g. `router` or `@acme/foo`
    pub plugin: String,

    /// Generator option as key=value (repeatable)
    #[arg(long = "option", value_name = "key=value", value_parser = parse_option)]
    pub options: Vec<(String, serde_json::Value)>,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

/// `key=value`, where value is parsed as JSON when it can be (`true`, `3`)
/// and kept as a string otherwise
fn parse_option(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    if key.is_empty() {
        return Err(format!("empty option name in `{}`", raw));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn invoke_options(
    options: Vec<(String, serde_json::Value)>,
    registry: Option<Url>,
) -> InvokeOptions {
    InvokeOptions {
        options: options.into_iter().collect(),
        registry,
        ..Default::default()
    }
}

fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn set_proxy(proxy: &str) -> Result<()> {
    Url::parse(proxy).with_context(|| format!("Invalid proxy URL: {}", proxy))?;
    std::env::set_var("HTTP_PROXY", proxy);
    std::env::set_var("HTTPS_PROXY", proxy);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    init_tracing(&args.log_level);
    tracing::debug!(command = ?args.command, "parsed arguments");
    let config = PlinthConfig;

    let result = match args.command {
        Command::Create(create_args) => {
            if let Some(proxy) = &create_args.proxy {
                set_proxy(proxy)?;
            }
            plinth_core::run(&config, create_args.into()).await
        }
        Command::Add(add_args) => {
            let plugin_args = PluginArgs {
                command: PluginCommand::Add,
                plugin: add_args.plugin,
                options: invoke_options(add_args.options, add_args.registry),
                yes: add_args.yes,
            };
            plinth_core::tui::run_plugin(&config, plugin_args).await
        }
        Command::Invoke(invoke_args) => {
            let plugin_args = PluginArgs {
                command: PluginCommand::Invoke,
                plugin: invoke_args.plugin,
                options: invoke_options(invoke_args.options, None),
                yes: invoke_args.yes,
            };
            plinth_core::tui::run_plugin(&config, plugin_args).await
        }
    };

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}
