//! Reflow Pager - Entry Point
//!
//! Drives the pagination engine over a simulated document description and
//! prints every emitted event as a JSON line on stdout.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use tracing::{info, warn};

use reflow_pager::bake::JsonFileGeometryStore;
use reflow_pager::config::{
    apply_cli_overrides, apply_env_overrides, load_config_with_precedence, merge_config,
    CliOverrides, ResolvedConfig,
};
use reflow_pager::events::{EventSink, JsonLinesSink, Tee, TracingSink};
use reflow_pager::model::{Flow, PagerError, Viewport};
use reflow_pager::navigation::{NavOutcome, NavTarget, NavigationController};
use reflow_pager::simulated::{SimDocument, SimSectionStore, SimulatedSurface};
use reflow_pager::surface::LayoutDirectives;

/// Reflow Pager - paginate a simulated multi-section document
#[derive(Parser, Debug)]
#[command(name = "reflow-pager")]
#[command(version)]
#[command(about = "Paginate a simulated multi-section document and print pager events as JSON")]
pub struct Args {
    /// Path to the JSON document description
    pub document: PathBuf,

    /// Viewport width
    #[arg(long, default_value_t = 1000.0)]
    pub width: f64,

    /// Viewport height
    #[arg(long, default_value_t = 1000.0)]
    pub height: f64,

    /// Presentation flow ("paginated" or "scrolled")
    #[arg(long)]
    pub flow: Option<Flow>,

    /// Section to open first
    #[arg(short, long, default_value_t = 0)]
    pub section: usize,

    /// Page turns to perform after opening
    #[arg(short, long, default_value_t = 0)]
    pub turns: u32,

    /// Turn backward instead of forward
    #[arg(long)]
    pub reverse: bool,

    /// Fingerprint of the typographic settings, part of the geometry cache key
    #[arg(long, default_value = "default")]
    pub fingerprint: String,

    /// Do not read or write the geometry cache
    #[arg(long)]
    pub no_cache: bool,

    /// Directory of the geometry cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            flow: self.flow,
            geometry_cache_dir: self.cache_dir.clone(),
        }
    }
}

/// Defaults → Config File → Env Vars → CLI Args
fn resolve_config(args: &Args) -> Result<ResolvedConfig, PagerError> {
    let config_file = load_config_with_precedence(args.config.clone())?;
    let merged = merge_config(config_file);
    let with_env = apply_env_overrides(merged);
    Ok(apply_cli_overrides(with_env, args.overrides()))
}

fn read_document(path: &Path) -> Result<SimDocument, PagerError> {
    let text = std::fs::read_to_string(path).map_err(|source| PagerError::Document {
        path: path.to_path_buf(),
        source,
    })?;
    SimDocument::from_json(&text).map_err(|e| PagerError::InvalidDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

async fn run(args: Args, config: ResolvedConfig) -> Result<(), PagerError> {
    let document = read_document(&args.document)?;
    let engine = config.engine();

    let mut directives = LayoutDirectives::new(engine.flow, Viewport::new(args.width, args.height))
        .with_fingerprint(args.fingerprint.clone());
    directives.gap = engine.gap;
    directives.max_columns = engine.max_columns;

    let sink: Rc<dyn EventSink> = Rc::new(Tee(JsonLinesSink::new(std::io::stdout()), TracingSink));
    let mut nav = NavigationController::new(
        Rc::new(SimSectionStore::new(document)),
        Rc::new(SimulatedSurface::new()),
        sink,
        directives,
        engine,
    );
    if args.no_cache {
        info!("Geometry cache disabled");
    } else {
        info!(dir = ?config.geometry_cache_dir, "Using geometry cache");
        nav = nav.with_geometry_store(Rc::new(JsonFileGeometryStore::new(
            config.geometry_cache_dir.clone(),
        )));
    }

    nav.go_to(NavTarget::section(args.section)).await?;
    prefetch_neighbors(&nav).await;
    for turn in 0..args.turns {
        let outcome = if args.reverse {
            nav.prev().await?
        } else {
            nav.next().await?
        };
        if outcome == NavOutcome::Unchanged {
            info!(turn, "Reached the edge of the document");
            break;
        }
        prefetch_neighbors(&nav).await;
    }
    Ok(())
}

/// Load the displayed section's neighbors while the reader is idle.
async fn prefetch_neighbors(nav: &NavigationController) {
    let loaded = nav.prefetch_idle().await;
    if loaded > 0 {
        info!(loaded, "Prefetched neighboring sections");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    reflow_pager::logging::init(&config.log_file_path)?;
    info!(config = ?config, "Configuration loaded and resolved");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    if let Err(e) = runtime.block_on(run(args, config)) {
        warn!(error = %e, "Run failed");
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_does_not_error() {
        let result = Args::try_parse_from(["reflow-pager", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_error() {
        let result = Args::try_parse_from(["reflow-pager", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_document_is_required() {
        let result = Args::try_parse_from(["reflow-pager"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["reflow-pager", "book.json"]);
        assert_eq!(args.document, PathBuf::from("book.json"));
        assert_eq!(args.width, 1000.0);
        assert_eq!(args.height, 1000.0);
        assert_eq!(args.flow, None);
        assert_eq!(args.section, 0);
        assert_eq!(args.turns, 0);
        assert!(!args.reverse);
        assert!(!args.no_cache);
        assert_eq!(args.fingerprint, "default");
    }

    #[test]
    fn test_flow_parses_case_insensitively() {
        let args = Args::parse_from(["reflow-pager", "book.json", "--flow", "Scrolled"]);
        assert_eq!(args.flow, Some(Flow::Scrolled));
    }

    #[test]
    fn test_flow_rejects_unknown_value() {
        let result = Args::try_parse_from(["reflow-pager", "book.json", "--flow", "spread"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_combined_flags() {
        let args = Args::parse_from([
            "reflow-pager",
            "book.json",
            "-s",
            "3",
            "-t",
            "5",
            "--reverse",
            "--width",
            "640",
            "--cache-dir",
            "/tmp/geometry",
        ]);
        assert_eq!(args.section, 3);
        assert_eq!(args.turns, 5);
        assert!(args.reverse);
        assert_eq!(args.width, 640.0);
        assert_eq!(args.cache_dir, Some(PathBuf::from("/tmp/geometry")));
    }

    #[test]
    fn test_cli_flow_overrides_config_file() {
        use reflow_pager::config::ConfigFile;

        let config_file = ConfigFile {
            flow: Some(Flow::Scrolled),
            ..ConfigFile::default()
        };
        let merged = merge_config(Some(config_file));
        assert_eq!(merged.flow, Flow::Scrolled);

        let args = Args::parse_from(["reflow-pager", "book.json", "--flow", "paginated"]);
        let resolved = apply_cli_overrides(merged, args.overrides());
        assert_eq!(resolved.flow, Flow::Paginated);
    }

    #[test]
    fn test_missing_document_maps_to_document_error() {
        let missing = PathBuf::from("/nonexistent/reflow-pager/book.json");
        assert!(matches!(
            read_document(&missing),
            Err(PagerError::Document { .. })
        ));
    }
}
