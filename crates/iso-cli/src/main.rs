//! Root store analyzer CLI.
//!
//! Commands:
//! - `iso layout` - Print the object store schema
//! - `iso ranges` - Print the snapshot partition of every full image kind
//! - `iso analyze --out <path> [--image <path>]` - Bootstrap (or restore) a group and write its report and root image

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use iso_common_core::{LibraryId, SnapshotKind};
use iso_vm::{Field, GroupConfig, IsolateGroup, RootImage, StoreError, StoreReport, SystemLibraries};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "iso")]
#[command(about = "Isolate group root store analyzer", long_about = None)]
struct Cli {
    /// Group configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable (or with a `no-` prefix, disable) an experimental feature
    #[arg(long = "enable-experiment", global = true, value_delimiter = ',')]
    experiments: Vec<String>,

    /// Verbose logging (overridden by ISO_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the object store schema
    Layout {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the snapshot partition of every full image kind
    Ranges,

    /// Bootstrap a group (or restore one from an image) and write its
    /// report and root image
    Analyze {
        /// Output file
        #[arg(long)]
        out: PathBuf,

        /// Root image to restore instead of partitioning a fresh group
        /// (a bare image or the output of an earlier `analyze`)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Image kind to partition (full, full-core, full-jit, full-aot)
        #[arg(long, default_value = "full-aot")]
        kind: String,

        /// Bootstrap libraries to load (defaults to the configuration)
        #[arg(long, value_delimiter = ',')]
        libraries: Vec<String>,

        /// SDK version recorded in the output
        #[arg(long = "sdk-version")]
        sdk_version: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Layout { json } => cmd_layout(json),
        Commands::Ranges => cmd_ranges(),
        Commands::Analyze { ref out, ref image, ref kind, ref libraries, ref sdk_version } => {
            load_config(&cli).and_then(|config| {
                let args = AnalyzeArgs {
                    out,
                    image: image.as_deref(),
                    kind,
                    libraries,
                    sdk_version: sdk_version.as_deref(),
                };
                cmd_analyze(config, &args)
            })
        }
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ISO_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {}", e);
    }
}

fn load_config(cli: &Cli) -> Result<GroupConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            GroupConfig::from_json(&text)?
        }
        None => GroupConfig::default(),
    };
    Ok(config.with_experiments(cli.experiments.iter().cloned()))
}

fn parse_library(name: &str) -> Result<LibraryId, String> {
    let name = name.strip_prefix("sys:").unwrap_or(name);
    LibraryId::ALL
        .into_iter()
        .find(|id| id.name() == name)
        .ok_or_else(|| format!("unknown library '{}'", name))
}

fn parse_kind(name: &str) -> Result<SnapshotKind, String> {
    SnapshotKind::from_name(name)
        .filter(|k| k.is_full())
        .ok_or_else(|| format!("'{}' is not a full image kind", name))
}

/// Print the schema, one slot per line.
fn cmd_layout(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let layout = StoreReport::layout();
    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }
    println!("{:>5} {:>6}  {:<16} {:<20} name", "index", "offset", "access", "kind");
    for slot in &layout {
        println!(
            "{:>5} {:>6}  {:<16} {:<20} {}",
            slot.index, slot.offset, slot.access, slot.kind, slot.name
        );
    }
    Ok(())
}

fn cmd_ranges() -> Result<(), Box<dyn std::error::Error>> {
    for range in StoreReport::snapshot_ranges() {
        println!(
            "{:<10} [{:>3}, {:>3})  {:>3} slots  bytes [{}, {})",
            range.kind.name(), range.from, range.to, range.slots, range.bytes.0, range.bytes.1
        );
    }
    Ok(())
}

struct AnalyzeArgs<'a> {
    out: &'a Path,
    image: Option<&'a Path>,
    kind: &'a str,
    libraries: &'a [String],
    sdk_version: Option<&'a str>,
}

/// Bootstrap a group and touch every lazy group whose library is loaded.
fn bootstrap_group(config: GroupConfig) -> Result<Arc<IsolateGroup>, Box<dyn std::error::Error>> {
    let group = IsolateGroup::create(config, &SystemLibraries::standard())?;
    let store = group.object_store();
    for field in Field::iter() {
        if let Some(lazy) = field.access().lazy_group() {
            if store.registry().is_loaded(lazy.library()) {
                store.get(field)?;
            }
        }
    }
    Ok(group)
}

/// Read a root image, either bare or embedded in an analysis file.
fn read_image(path: &Path) -> Result<RootImage, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| StoreError::MalformedImage(e.to_string()))?;
    let image = value.get("image").cloned().unwrap_or(value);
    Ok(serde_json::from_value(image).map_err(|e| StoreError::MalformedImage(e.to_string()))?)
}

/// Write the report plus the root image of a fresh group, or of a group
/// restored from `--image`.
///
/// An image carries roots only. The heap they point into is rebuilt by
/// bootstrapping the configured libraries, which allocates deterministically.
fn cmd_analyze(mut config: GroupConfig, args: &AnalyzeArgs<'_>) -> Result<(), Box<dyn std::error::Error>> {
    if !args.libraries.is_empty() {
        let ids = args.libraries.iter().map(|l| parse_library(l)).collect::<Result<Vec<_>, _>>()?;
        config = config.with_libraries(&ids);
    }

    let base = bootstrap_group(config.clone())?;
    let (group, image) = match args.image {
        Some(path) => {
            let image = read_image(path)?;
            let group = IsolateGroup::restore(config, base.heap().clone(), &image)?;
            tracing::info!(path = %path.display(), kind = %image.kind, "image restored");
            (group, image)
        }
        None => {
            let kind = parse_kind(args.kind)?;
            let image = base
                .object_store()
                .write_snapshot(&base.safepoint_handler().stop_the_world(), kind)?;
            (base, image)
        }
    };

    let store = group.object_store();
    let report = StoreReport::capture(store);
    let features = group.config().features()?;
    let output = serde_json::json!({
        "sdk_version": args.sdk_version.unwrap_or(env!("CARGO_PKG_VERSION")),
        "kind": image.kind,
        "experiments": features.enabled_names(),
        "report": report,
        "image": image,
    });

    let out = args.out;
    fs::write(out, serde_json::to_string_pretty(&output)?)
        .map_err(|e| format!("cannot write {}: {}", out.display(), e))?;
    tracing::info!(path = %out.display(), populated = report.populated, "analysis written");
    println!("wrote {} ({} of {} slots populated)", out.display(), report.populated, Field::COUNT);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(out: &Path, image: Option<&Path>, kind: &str) -> Result<(), Box<dyn std::error::Error>> {
        let args = AnalyzeArgs {
            out,
            image,
            kind,
            libraries: &[],
            sdk_version: Some("test"),
        };
        cmd_analyze(GroupConfig::default(), &args)
    }

    fn output(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_analyze_restores_written_image() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");

        analyze(&first, None, "full").unwrap();
        analyze(&second, Some(&first), "full-aot").unwrap();

        let (a, b) = (output(&first), output(&second));
        assert_eq!(b["kind"], "full");
        assert_eq!(a["image"], b["image"]);
        assert_eq!(a["report"]["libraries"], b["report"]["libraries"]);
        assert_eq!(a["report"]["slots"], b["report"]["slots"]);
        assert_eq!(a["report"]["populated"], b["report"]["populated"]);
    }

    #[test]
    fn test_analyze_accepts_bare_image() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let bare = dir.path().join("bare.json");
        let second = dir.path().join("second.json");

        analyze(&first, None, "full-jit").unwrap();
        fs::write(&bare, output(&first)["image"].to_string()).unwrap();
        analyze(&second, Some(&bare), "full").unwrap();
        assert_eq!(output(&second)["kind"], "full-jit");
    }

    #[test]
    fn test_analyze_rejects_mismatched_image() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        analyze(&first, None, "full").unwrap();

        let mut value = output(&first);
        value["image"]["kind"] = serde_json::json!("full-aot");
        fs::write(&first, value.to_string()).unwrap();

        let err = analyze(&second, Some(&first), "full").unwrap_err();
        assert!(err.to_string().contains("expected"), "{}", err);
        assert!(!second.exists());
    }

    #[test]
    fn test_analyze_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{\"kind\": 3}").unwrap();
        let err = analyze(&dir.path().join("out.json"), Some(&bad), "full").unwrap_err();
        assert!(err.to_string().contains("malformed"), "{}", err);
    }
}
