//! Command dispatch

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, ForestCommands, LoadArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::render::ToTermTree;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{keys, CoverageSummary, CoverageTree, Metadata, PackageFilter};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Summary { load, json }) => _summary(cli, load, *json),
        Some(Commands::Packages {
            load,
            pattern,
            min,
            max,
            where_meta,
            json,
        }) => {
            let filter = build_filter(pattern.as_deref(), *min, *max, where_meta)?;
            _packages(cli, load, &filter, *json)
        }
        Some(Commands::Show {
            import_path,
            load,
            json,
        }) => _show(cli, load, import_path, *json),
        Some(Commands::Tree { load, packages }) => _tree(cli, load, *packages),
        Some(Commands::Forest { command }) => match command {
            ForestCommands::Add { name, load } => _forest_add(cli, load, name),
            ForestCommands::List => _forest_list(cli),
            ForestCommands::Remove { name } => _forest_remove(cli, name),
            ForestCommands::Compare { import_path } => _forest_compare(cli, import_path),
        },
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show { root } => _config_show(cli, root),
            ConfigCommands::Path { root } => _config_path(root),
            ConfigCommands::Template => {
                output::info(&Settings::template());
                Ok(())
            }
        },
        Some(Commands::Completion { shell }) => _completion(*shell),
        None => Ok(()),
    }
}

// ============================================================
// HELPERS
// ============================================================

/// Splits `key=value`; the key must be non-empty.
pub fn parse_key_value(raw: &str) -> CliResult<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidArgs(format!(
            "expected KEY=VALUE, got '{raw}'"
        ))),
    }
}

pub fn build_filter(
    pattern: Option<&str>,
    min: Option<f64>,
    max: Option<f64>,
    where_meta: &[String],
) -> CliResult<PackageFilter> {
    let mut filter = PackageFilter::new();
    if let Some(pattern) = pattern {
        filter = filter.with_pattern(pattern);
    }
    for (flag, value) in [("--min", min), ("--max", max)] {
        if let Some(rate) = value {
            if !(0.0..=1.0).contains(&rate) {
                return Err(CliError::InvalidArgs(format!(
                    "{flag} must be within 0.0..=1.0, got {rate}"
                )));
            }
        }
    }
    if let Some(rate) = min {
        filter = filter.with_min_coverage(rate);
    }
    if let Some(rate) = max {
        filter = filter.with_max_coverage(rate);
    }
    for raw in where_meta {
        let (key, value) = parse_key_value(raw)?;
        filter = filter.with_metadata(key, value);
    }
    Ok(filter)
}

fn settings_for(cli: &Cli, root: &Path) -> CliResult<Settings> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load(Some(root))?,
    };
    Ok(settings)
}

fn container_for(cli: &Cli, load: &LoadArgs) -> CliResult<ServiceContainer> {
    let mut settings = settings_for(cli, &load.root)?;
    if load.max_depth.is_some() {
        settings.max_depth = load.max_depth;
    }
    if load.sequential {
        settings.parallel = false;
    }
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

fn load_tree(container: &ServiceContainer, load: &LoadArgs) -> CliResult<CoverageTree> {
    let loader = container.loader();
    let mut tree = loader.new_tree();
    for raw in &load.meta {
        let (key, value) = parse_key_value(raw)?;
        tree.set_metadata(key, value);
    }
    Ok(loader.load_into(tree, &load.root)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    output::info(&serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_metadata(metadata: &Metadata) {
    for (key, value) in metadata {
        output::detail(&format!("{}: {}", key.dimmed(), value));
    }
}

// ============================================================
// COMMANDS
// ============================================================

#[instrument(skip(cli))]
fn _summary(cli: &Cli, load: &LoadArgs, json: bool) -> CliResult<()> {
    let container = container_for(cli, load)?;
    let tree = load_tree(&container, load)?;
    let summary = tree.summary();

    if json {
        #[derive(Serialize)]
        struct SummaryView<'a> {
            summary: CoverageSummary,
            metadata: &'a Metadata,
        }
        return print_json(&SummaryView {
            summary,
            metadata: tree.metadata(),
        });
    }

    output::header(&format!("Coverage of {}", load.root.display()));
    print_metadata(tree.metadata());
    output::info(&output::summary_line(&summary));
    Ok(())
}

#[instrument(skip(cli))]
fn _packages(cli: &Cli, load: &LoadArgs, filter: &PackageFilter, json: bool) -> CliResult<()> {
    let container = container_for(cli, load)?;
    let tree = load_tree(&container, load)?;
    let matched = tree.filter_packages(filter)?;

    if json {
        return print_json(&matched);
    }

    for package in &matched {
        output::info(&format!(
            "{} {:>7}/{:<7} {}",
            output::rate(package.coverage_rate),
            package.covered_lines,
            package.total_lines,
            package.import_path
        ));
    }
    let summary = CoverageSummary::from_packages(matched.iter().copied());
    output::header(&output::summary_line(&summary));
    Ok(())
}

#[instrument(skip(cli))]
fn _show(cli: &Cli, load: &LoadArgs, import_path: &str, json: bool) -> CliResult<()> {
    let container = container_for(cli, load)?;
    let tree = load_tree(&container, load)?;
    let package = tree
        .get_package(import_path)
        .ok_or_else(|| CliError::NotFound(format!("package '{import_path}'")))?;

    if json {
        return print_json(package);
    }

    output::header(&package.import_path);
    output::detail(&format!("{}: {}", "module".dimmed(), package.module_path));
    print_metadata(&package.metadata);
    output::info(&format!(
        "{} {}/{} lines",
        output::rate(package.coverage_rate),
        package.covered_lines,
        package.total_lines
    ));
    for function in &package.functions {
        output::detail(&format!(
            "{} {:>5}/{:<5} {}:{}",
            output::rate(function.coverage_rate),
            function.covered_lines,
            function.total_lines,
            function.file,
            function.name
        ));
    }
    Ok(())
}

#[instrument(skip(cli))]
fn _tree(cli: &Cli, load: &LoadArgs, with_packages: bool) -> CliResult<()> {
    let container = container_for(cli, load)?;
    let tree = load_tree(&container, load)?;
    output::info(&tree.to_term_tree(with_packages));
    Ok(())
}

#[instrument(skip(cli))]
fn _forest_add(cli: &Cli, load: &LoadArgs, name: &str) -> CliResult<()> {
    let container = container_for(cli, load)?;
    let tree = load_tree(&container, load)?;

    let root = std::fs::canonicalize(&load.root)
        .map_err(|e| InfraError::io(format!("resolve {}", load.root.display()), e))?;
    // explicit --meta values win over detected ones
    let mut source = tree.metadata().clone();
    source
        .entry("root".into())
        .or_insert_with(|| root.display().to_string());
    if !source.contains_key(keys::MACHINE) {
        if let Ok(machine) = hostname::get() {
            source.insert(keys::MACHINE.into(), machine.to_string_lossy().into_owned());
        }
    }
    source
        .entry(keys::LOADED_AT.into())
        .or_insert_with(|| chrono::Local::now().to_rfc3339());

    let store = container.forest_store();
    let mut forest = store.load()?;
    let summary = tree.summary();
    if forest.add(name, source, Arc::new(tree)).is_some() {
        output::warning(&format!("replaced existing tree '{name}'"));
    }
    store.save(&forest)?;
    output::success(&format!("{}: {}", name, output::summary_line(&summary)));
    Ok(())
}

#[instrument(skip(cli))]
fn _forest_list(cli: &Cli) -> CliResult<()> {
    let container = ServiceContainer::new(settings_for(cli, Path::new("."))?);
    let forest = container.forest_store().load()?;
    if forest.is_empty() {
        output::info(&format!(
            "no trees in {}",
            container.settings.forest_file.display()
        ));
        return Ok(());
    }
    for (name, summary) in forest.summaries() {
        output::action(name, &output::summary_line(&summary));
        if let Some(loaded_at) = forest
            .get(name)
            .and_then(|e| e.source.get(keys::LOADED_AT))
        {
            output::detail(&format!("{}: {}", keys::LOADED_AT.dimmed(), loaded_at));
        }
    }
    Ok(())
}

#[instrument(skip(cli))]
fn _forest_remove(cli: &Cli, name: &str) -> CliResult<()> {
    let container = ServiceContainer::new(settings_for(cli, Path::new("."))?);
    let store = container.forest_store();
    let mut forest = store.load()?;
    if forest.remove(name).is_none() {
        return Err(CliError::NotFound(format!("tree '{name}'")));
    }
    store.save(&forest)?;
    output::success(&format!("removed '{name}'"));
    Ok(())
}

#[instrument(skip(cli))]
fn _forest_compare(cli: &Cli, import_path: &str) -> CliResult<()> {
    let container = ServiceContainer::new(settings_for(cli, Path::new("."))?);
    let forest = container.forest_store().load()?;
    let rows = forest.compare(import_path);
    if rows.is_empty() {
        return Err(CliError::NotFound(format!(
            "package '{import_path}' in any stored tree"
        )));
    }
    output::header(import_path);
    for row in rows {
        output::detail(&format!(
            "{} {:>7}/{:<7} {}",
            output::rate(row.coverage_rate),
            row.covered_lines,
            row.total_lines,
            row.tree
        ));
    }
    Ok(())
}

fn _config_show(cli: &Cli, root: &Path) -> CliResult<()> {
    let settings = settings_for(cli, root)?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn _config_path(root: &Path) -> CliResult<()> {
    let marker = |p: &Path| if p.exists() { "" } else { " (not found)" };
    match global_config_path() {
        Some(path) => output::action("global", &format!("{}{}", path.display(), marker(&path))),
        None => output::action("global", &"(no config directory)"),
    }
    let local = local_config_path(root);
    output::action("local", &format!("{}{}", local.display(), marker(&local)));
    Ok(())
}

fn _completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
