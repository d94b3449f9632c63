//! simstage command line.
//!
//! Parses arguments, builds the workspace, prints the validation report
//! and stages the assets when every check passed.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use owo_colors::OwoColorize;

use simstage_kernel::locator::{PACKAGE_PATH_VAR, PackagePathLocator};
use simstage_kernel::stage::{self, FsStager, StagedFolder};
use simstage_kernel::validator::Validator;
use simstage_kernel::workspace::{ScanError, Workspace};
use simstage_kernel::{Severity, StageConfig, ValidationOutcome};

/// Validate a robot simulation workspace and stage its assets.
#[derive(Parser, Debug, Clone)]
#[command(name = "simstage", version)]
#[command(about = "Validate a robot simulation workspace and stage the assets it needs")]
pub struct Cli {
    /// Workspace `src` folder (default: found above the anchor package)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Colon-separated package search roots
    #[arg(long, env = PACKAGE_PATH_VAR, value_name = "PATHS")]
    pub package_path: Option<String>,

    /// Colon-separated Gazebo resource roots (default: the configured
    /// environment variable)
    #[arg(long, value_name = "PATHS")]
    pub resource_path: Option<String>,

    /// Configuration file (default: the user config file if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Folder the assets are staged into
    #[arg(long, short = 'o', value_name = "DIR", default_value = "simulation_files")]
    pub output: PathBuf,

    /// Validate only, copy nothing
    #[arg(long)]
    pub check_only: bool,

    /// Log progress to stderr
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Writes the human readable report.
pub struct Reporter<W> {
    out: W,
    color: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn workspace(&mut self, root: &Path) -> io::Result<()> {
        writeln!(self.out, "Using workspace '{}'.", root.display())
    }

    pub fn outcome(&mut self, name: &str, outcome: &ValidationOutcome) -> io::Result<()> {
        let text = format!(
            "{} {name:<20}\t: {}",
            outcome.severity.glyph(),
            outcome.message
        );
        self.styled(outcome.severity, &text)
    }

    pub fn heading(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "\n{text}")
    }

    pub fn staged(&mut self, folder: &StagedFolder) -> io::Result<()> {
        let text = format!(
            "{} {} -> {}",
            Severity::Ok.glyph(),
            folder.source.display(),
            folder.destination.display()
        );
        self.styled(Severity::Ok, &text)
    }

    pub fn missing(&mut self, folder: &Path) -> io::Result<()> {
        let text = format!(
            "{} {} does not exist, skipped",
            Severity::Warning.glyph(),
            folder.display()
        );
        self.styled(Severity::Warning, &text)
    }

    fn styled(&mut self, severity: Severity, text: &str) -> io::Result<()> {
        if !self.color {
            return writeln!(self.out, "{text}");
        }
        match severity {
            Severity::Ok => writeln!(self.out, "{}", text.green()),
            Severity::Warning => writeln!(self.out, "{}", text.yellow()),
            Severity::Error => writeln!(self.out, "{}", text.red()),
        }
    }
}

/// Run simstage. Returns false when validation failed.
pub fn run<W: Write>(cli: &Cli, reporter: &mut Reporter<W>) -> Result<bool> {
    let config = StageConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let Some(search_path) = cli.package_path.as_deref() else {
        bail!("{PACKAGE_PATH_VAR} is not set. Did you source your workspace?");
    };
    let locator = Arc::new(PackagePathLocator::from_search_path(search_path));

    let mut ws = open_workspace(cli.workspace.as_deref(), locator, config)?;
    if let Some(resource_path) = &cli.resource_path {
        ws = ws.with_resource_search_path(Some(resource_path.clone()));
    }
    reporter.workspace(ws.root())?;

    let mut write_error = None;
    let passed = Validator::standard().run_with(&ws, |name, outcome| {
        if let Err(e) = reporter.outcome(name, outcome) {
            write_error.get_or_insert(e);
        }
    });
    if let Some(e) = write_error {
        return Err(e.into());
    }

    if !passed || cli.check_only {
        return Ok(passed);
    }

    reporter.heading("Staging simulation files...")?;
    let report = stage::stage(&ws, &cli.output, &FsStager::new())
        .with_context(|| format!("staging into {}", cli.output.display()))?;

    for folder in &report.folders {
        reporter.staged(folder)?;
    }
    for folder in &report.missing {
        reporter.missing(folder)?;
    }
    tracing::info!(
        copied = report.files_copied(),
        skipped = report.files_skipped(),
        pruned = report.pruned.files_removed,
        "staging finished"
    );

    Ok(true)
}

fn open_workspace(
    dir: Option<&Path>,
    locator: Arc<PackagePathLocator>,
    config: StageConfig,
) -> Result<Workspace> {
    if let Some(dir) = dir {
        let root = dir
            .canonicalize()
            .with_context(|| format!("workspace folder {}", dir.display()))?;
        return Ok(Workspace::new(root, locator).with_config(config));
    }

    let anchor = config.anchor_package.clone();
    Workspace::discover(locator, config).map_err(|e| {
        let hint = match &e {
            ScanError::AnchorNotFound { .. } => format!(
                "Cannot find package '{anchor}'. Did you clone it into your workspace, build \
                 the workspace and source it?"
            ),
            ScanError::WorkspaceRootNotFound(_) => format!(
                "Cannot find your workspace 'src' folder. Did you place the '{anchor}' package \
                 in your 'src' folder?"
            ),
            _ => "Cannot open the workspace".to_string(),
        };
        anyhow::Error::new(e).context(hint)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_line_layout() {
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter
            .outcome("World file", &ValidationOutcome::ok("World file is correct."))
            .unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(text, "✔ World file          \t: World file is correct.\n");
    }

    #[test]
    fn colored_lines_carry_escape_codes() {
        let mut reporter = Reporter::new(Vec::new(), true);
        reporter
            .outcome("Mesh files", &ValidationOutcome::error("bad texture"))
            .unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.starts_with("\u{1b}[31m"));
        assert!(text.contains("✘ Mesh files"));
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["simstage", "--package-path", "/ws/src"]);
        assert_eq!(cli.output, PathBuf::from("simulation_files"));
        assert!(!cli.check_only);
        assert_eq!(cli.package_path.as_deref(), Some("/ws/src"));
    }
}
