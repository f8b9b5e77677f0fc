//! naco - query and update Naemon object configuration
//!
//! Filters and updates are written in a small sandboxed expression
//! language; matching blocks are printed, updated, or deleted while every
//! untouched byte of the configuration files is preserved.

mod filters;
mod report;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use naco_config::{
    commit_path, objdef_engine, CommitOutcome, ConfigFile, ConfigStream, ObjectDefinition,
    TypeRegistry, WriteStrategy, TRANSACTION_SUFFIX,
};
use naco_expr::{Engine, ExprError, Expression};
use walkdir::WalkDir;

use report::{MetadataMode, OutputMode, Report};

#[derive(Parser)]
#[command(name = "naco")]
#[command(about = "naco - query and update Naemon object configuration")]
#[command(version)]
struct Cli {
    /// Include object definitions matching this filter expression; all
    /// directives are available as variables. Repeatable; filters union.
    #[arg(short = 'f', long = "filter", value_name = "EXPR")]
    filters: Vec<String>,

    /// Read filter expressions from a file, one per non-blank line
    #[arg(long = "filter-file", value_name = "PATH")]
    filter_files: Vec<PathBuf>,

    /// Match hosts by host_name
    #[arg(short = 'H', long = "host", value_name = "HOST_NAME")]
    hosts: Vec<String>,

    /// Match services by "HOST;DESCRIPTION", or by bare description
    #[arg(short = 's', long = "service", value_name = "HOST;DESCRIPTION")]
    services: Vec<String>,

    /// Match commands by command_name
    #[arg(long = "command", value_name = "COMMAND_NAME")]
    commands: Vec<String>,

    /// Match contacts by contact_name
    #[arg(long = "contact", value_name = "CONTACT_NAME")]
    contacts: Vec<String>,

    /// Match hostgroups by hostgroup_name
    #[arg(long = "hostgroup", value_name = "HOSTGROUP_NAME")]
    hostgroups: Vec<String>,

    /// Match servicegroups by servicegroup_name
    #[arg(long = "servicegroup", value_name = "SERVICEGROUP_NAME")]
    servicegroups: Vec<String>,

    /// Update matching object definitions with this expression. Supports
    /// `=` to set a directive, and `+=`/`-=` to add and remove members of
    /// comma-separated collection directives. Assigning None or '' removes
    /// the directive.
    #[arg(short = 'u', long = "update", value_name = "EXPR")]
    updates: Vec<String>,

    /// Delete matching object definitions
    #[arg(short = 'd', long)]
    delete: bool,

    /// How updated configuration files are written: in place, with a
    /// backup of the original, or as a pending transaction file
    #[arg(short = 'w', long, value_enum, default_value = "transaction")]
    write: WriteMode,

    /// Disable the modification-time guard when committing
    #[arg(long)]
    no_transaction_check: bool,

    /// Promote pending transaction files over the originals and exit
    #[arg(long)]
    commit: bool,

    /// Count the distinct values of this directive over matching object
    /// definitions; suppresses record output
    #[arg(short = 'c', long = "count", value_name = "DIRECTIVE")]
    count: Vec<String>,

    /// How matching object definitions are printed
    #[arg(short = 'o', long, value_enum, default_value = "config")]
    output: OutputMode,

    /// Print only these directives
    #[arg(long = "select", value_name = "DIRECTIVE")]
    select: Vec<String>,

    /// Metadata printed around matching object definitions
    #[arg(short = 'm', long = "metadata", value_enum, default_values = ["file", "total"])]
    metadata: Vec<MetadataMode>,

    /// Stop after this many matching object definitions (0 = unlimited)
    #[arg(long, default_value_t = 0, value_name = "N")]
    limit: usize,

    /// Configuration files, or directories containing *.cfg files. Object
    /// definitions are read from stdin when omitted.
    #[arg(value_name = "CONFIG_FILE")]
    config_files: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum WriteMode {
    Overwrite,
    Backup,
    Transaction,
}

impl From<WriteMode> for WriteStrategy {
    fn from(mode: WriteMode) -> Self {
        match mode {
            WriteMode::Overwrite => WriteStrategy::Overwrite,
            WriteMode::Backup => WriteStrategy::Backup,
            WriteMode::Transaction => WriteStrategy::Transaction,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        if let Some(diagnostic) = e
            .downcast_ref::<ExprError>()
            .and_then(ExprError::caret_diagnostic)
        {
            eprintln!("Error: syntax error in expression:\n\n{diagnostic}");
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = expand_paths(&cli.config_files);
    if cli.commit {
        return run_commit(&paths, !cli.no_transaction_check);
    }

    let filter_exprs = compile_filters(&cli)?;
    let update_exprs = compile_updates(&cli.updates)?;
    let update_mode = !update_exprs.is_empty() || cli.delete;
    if update_mode && paths.is_empty() {
        bail!("unable to use --update or --delete without named config files");
    }
    if cli.output == OutputMode::Value && cli.select.is_empty() {
        bail!("unable to use --output value without --select");
    }

    let engine = objdef_engine();
    let registry = TypeRegistry::builtin();
    let mut report = Report::new(
        cli.output,
        cli.select.clone(),
        &cli.metadata,
        &cli.count,
        cli.limit,
    );

    if paths.is_empty() {
        read_stdin(&engine, &registry, &filter_exprs, &mut report)?;
    } else if update_mode {
        let strategy = cli.write.into();
        for path in &paths {
            let done = edit_file(
                path,
                strategy,
                &engine,
                &registry,
                &filter_exprs,
                &update_exprs,
                cli.delete,
                &mut report,
            )?;
            if done {
                // Limit reached; later files are not opened at all
                break;
            }
        }
    } else {
        'files: for path in &paths {
            let mut session = ConfigFile::open(path, registry.clone())
                .with_context(|| format!("failed to open {}", path.display()))?;
            while let Some(objdef) = session.read_object()? {
                report.tally();
                let matches = matching_filters(&engine, &filter_exprs, &objdef)?;
                if filter_exprs.is_empty() || !matches.is_empty() {
                    report.record(&objdef, &matches)?;
                    if report.limit_reached() {
                        break 'files;
                    }
                }
            }
        }
    }

    report.finish();
    Ok(())
}

/// Rewrite one file under `strategy`. Returns true when the match limit
/// was reached, in which case the rest of the file has been passed through
/// unchanged.
#[allow(clippy::too_many_arguments)]
fn edit_file(
    path: &Path,
    strategy: WriteStrategy,
    engine: &Engine,
    registry: &TypeRegistry,
    filter_exprs: &[Expression],
    update_exprs: &[Expression],
    delete: bool,
    report: &mut Report,
) -> Result<bool> {
    let mut session = ConfigFile::open_update(path, registry.clone(), strategy)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut limited = false;
    while let Some(mut objdef) = session.read_object()? {
        if limited {
            session.keep()?;
            continue;
        }
        report.tally();
        let matches = matching_filters(engine, filter_exprs, &objdef)?;
        if filter_exprs.is_empty() || !matches.is_empty() {
            for update in update_exprs {
                engine.eval_update(update, &mut objdef)?;
            }
            if delete {
                session.delete()?;
            } else {
                session.replace(&objdef)?;
            }
            report.record(&objdef, &matches)?;
            limited = report.limit_reached();
        } else {
            session.keep()?;
        }
    }
    session.finish()?;
    Ok(limited)
}

fn read_stdin(
    engine: &Engine,
    registry: &TypeRegistry,
    filter_exprs: &[Expression],
    report: &mut Report,
) -> Result<()> {
    let stdin = io::stdin();
    let mut stream = ConfigStream::new(stdin.lock(), registry.clone());
    while let Some(objdef) = stream.read_object()? {
        report.tally();
        let matches = matching_filters(engine, filter_exprs, &objdef)?;
        if filter_exprs.is_empty() || !matches.is_empty() {
            report.record(&objdef, &matches)?;
            if report.limit_reached() {
                break;
            }
        }
    }
    Ok(())
}

fn run_commit(paths: &[PathBuf], check_mtime: bool) -> Result<()> {
    if paths.is_empty() {
        bail!("unable to use --commit without named config files");
    }
    for path in paths {
        match commit_path(path, check_mtime)? {
            CommitOutcome::Promoted => {
                println!(
                    "{}{} -> {}",
                    path.display(),
                    TRANSACTION_SUFFIX,
                    path.display()
                );
            }
            outcome => println!("{}: {outcome}", path.display()),
        }
    }
    Ok(())
}

/// Filters from every source: expressions, filter files, and the shortcut
/// options expanded through [`filters`]
fn compile_filters(cli: &Cli) -> Result<Vec<Expression>> {
    let mut texts = cli.filters.clone();
    for path in &cli.filter_files {
        texts.extend(filters::load_filter_file(path)?);
    }
    texts.extend(cli.hosts.iter().map(|v| filters::host(v)));
    texts.extend(cli.services.iter().map(|v| filters::service(v)));
    texts.extend(cli.commands.iter().map(|v| filters::command(v)));
    texts.extend(cli.contacts.iter().map(|v| filters::contact(v)));
    texts.extend(cli.hostgroups.iter().map(|v| filters::hostgroup(v)));
    texts.extend(cli.servicegroups.iter().map(|v| filters::servicegroup(v)));
    texts
        .iter()
        .map(|text| Expression::compile(text).map_err(Into::into))
        .collect()
}

fn compile_updates(updates: &[String]) -> Result<Vec<Expression>> {
    updates
        .iter()
        .map(|text| Expression::compile_update(text).map_err(Into::into))
        .collect()
}

fn matching_filters<'e>(
    engine: &Engine,
    filter_exprs: &'e [Expression],
    objdef: &ObjectDefinition,
) -> Result<Vec<&'e Expression>> {
    let mut matches = Vec::new();
    for expr in filter_exprs {
        if engine.eval(expr, objdef)?.is_truthy() {
            matches.push(expr);
        }
    }
    Ok(matches)
}

/// Expand directory arguments to their directly contained `*.cfg` files
fn expand_paths(args: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for arg in args {
        if arg.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(arg)
                .max_depth(1)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .filter(|path| path.extension().is_some_and(|ext| ext == "cfg"))
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(arg.clone());
        }
    }
    paths
}
