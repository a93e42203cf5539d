//! Command dispatch: loads settings, wires services and runs one subcommand

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, Direction, NodePath};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, SaveFormat, Settings};
use crate::domain::{NodeId, NoteTree};
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Commands::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Commands::Show { file, at, content } => _show(&container, file, at.as_ref(), *content),
        Commands::Cat { file, path } => _cat(&container, file, path),
        Commands::Convert {
            source,
            target,
            format,
        } => _convert(&container, source, target, *format),
        Commands::Merge {
            base,
            other,
            at,
            output,
        } => _merge(&container, base, other, at.as_ref(), output.as_deref()),
        Commands::Add {
            file,
            name,
            parent,
            content,
        } => _add(&container, file, parent.as_ref(), name, content),
        Commands::Remove { file, path } => _remove(&container, file, path),
        Commands::Move {
            file,
            path,
            direction,
        } => _move(&container, file, path, *direction),
        Commands::Config { command } => _config(&container, command),
        Commands::Completion { .. } => Ok(()),
    }
}

fn resolve(tree: &NoteTree, path: Option<&NodePath>) -> CliResult<NodeId> {
    let Some(path) = path else {
        return Ok(tree.root());
    };
    tree.resolve(path.indices())
        .ok_or_else(|| CliError::InvalidArgs(format!("no note at position {path}")))
}

/// Writes `tree` back in the configured format and reports the path.
fn save(container: &ServiceContainer, tree: &NoteTree, target: &Path) -> CliResult<()> {
    let written = container
        .documents
        .save_as(tree, target, container.settings.save_format)?;
    output::action("Saved", &written.display());
    Ok(())
}

#[instrument(skip(container))]
fn _show(
    container: &ServiceContainer,
    file: &Path,
    at: Option<&NodePath>,
    content: bool,
) -> CliResult<()> {
    let tree = container.documents.load(file)?;
    let tree = match at {
        Some(_) => tree.extract(resolve(&tree, at)?)?,
        None => tree,
    };
    let rendered = if content {
        tree.to_tree_string_with_content()
    } else {
        tree.to_tree_string()
    };
    output::info(&rendered);
    Ok(())
}

#[instrument(skip(container))]
fn _cat(container: &ServiceContainer, file: &Path, path: &NodePath) -> CliResult<()> {
    let tree = container.documents.load(file)?;
    let id = resolve(&tree, Some(path))?;
    let node = tree.node(id)?;
    output::info(&node.content);
    Ok(())
}

#[instrument(skip(container))]
fn _convert(
    container: &ServiceContainer,
    source: &Path,
    target: &Path,
    format: Option<SaveFormat>,
) -> CliResult<()> {
    let tree = container.documents.load(source)?;
    let format = format.unwrap_or(container.settings.save_format);
    debug!("converting {} nodes as {:?}", tree.node_count(), format);
    let written = container.documents.save_as(&tree, target, format)?;
    output::success(&format!(
        "{} -> {} ({} notes)",
        source.display(),
        written.display(),
        tree.node_count()
    ));
    Ok(())
}

#[instrument(skip(container))]
fn _merge(
    container: &ServiceContainer,
    base: &Path,
    other: &Path,
    at: Option<&NodePath>,
    output_path: Option<&Path>,
) -> CliResult<()> {
    let mut tree = container.documents.load(base)?;
    let source = container.documents.load(other)?;
    let target = resolve(&tree, at)?;

    let added = tree.merge(target, &source, source.root())?;
    output::detail(&format!("merged {} top-level notes", added.len()));

    save(container, &tree, output_path.unwrap_or(base))
}

#[instrument(skip(container, content))]
fn _add(
    container: &ServiceContainer,
    file: &Path,
    parent: Option<&NodePath>,
    name: &str,
    content: &str,
) -> CliResult<()> {
    let mut tree = container.documents.load(file)?;
    let parent = resolve(&tree, parent)?;
    let id = tree.add_node(parent, name, content)?;
    if let Ok(path) = tree.path_of(id) {
        output::detail(&format!("added '{}' at {}", name, NodePath(path)));
    }
    save(container, &tree, file)
}

#[instrument(skip(container))]
fn _remove(container: &ServiceContainer, file: &Path, path: &NodePath) -> CliResult<()> {
    if path.is_root() {
        return Err(CliError::Usage("the root note cannot be removed".into()));
    }
    let mut tree = container.documents.load(file)?;
    let id = resolve(&tree, Some(path))?;
    tree.remove_node(id)?;
    save(container, &tree, file)
}

#[instrument(skip(container))]
fn _move(
    container: &ServiceContainer,
    file: &Path,
    path: &NodePath,
    direction: Direction,
) -> CliResult<()> {
    let mut tree = container.documents.load(file)?;
    let id = resolve(&tree, Some(path))?;

    let moved = match direction {
        Direction::Up => tree.move_up(id),
        Direction::Down => tree.move_down(id),
        Direction::Indent => tree.indent(id),
        Direction::Outdent => tree.outdent(id),
    }?;

    if !moved {
        output::warning(&format!("note at {path} cannot move {direction:?}; nothing changed"));
        return Ok(());
    }
    if let Ok(new_path) = tree.path_of(id) {
        output::detail(&format!("{} -> {}", path, NodePath(new_path)));
    }
    save(container, &tree, file)
}

fn _config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::header("Effective settings");
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                let state = if container.fs.exists(&path) {
                    "exists"
                } else {
                    "not found"
                };
                output::info(&format!("{} ({})", path.display(), state));
            }
            None => output::warning("no config directory for this platform"),
        },
    }
    Ok(())
}
