use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use formats::export::ExportFormat;
use formats::polyline::SERVICE_PRECISION;
use tools::{ExportTarget, ToolError};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect saved routing-service responses")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Kind {
    Directions,
    Isochrones,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Json,
    Geojson,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode an encoded shape into [[lat, lng], ...]
    Decode {
        shape: String,
        #[arg(long, default_value_t = SERVICE_PRECISION)]
        precision: u32,
    },

    /// Normalize a /route or /isochrone response and summarize the outcome
    Normalize { response: PathBuf },

    /// Print the maneuver list of the main route
    Narrative { response: PathBuf },

    /// Write the download file for a saved response
    Export {
        response: PathBuf,
        #[arg(long, value_enum, default_value = "directions")]
        kind: Kind,
        #[arg(long, value_enum, default_value = "geojson")]
        format: Format,
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Elevation profile of the main route from a /route and a /height response
    Heightgraph {
        route: PathBuf,
        height: PathBuf,
        /// Shape reduction used for the /height request
        #[arg(long, default_value_t = 1000)]
        max_points: usize,
    },

    /// Parse a permalink, or move it onto another base URL
    Permalink {
        url: String,
        #[arg(long)]
        rebase: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main(Args::parse()) {
        error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn read(path: &Path) -> Result<String, String> {
    debug!(?path, "reading response");
    fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))
}

fn real_main(args: Args) -> Result<(), String> {
    let tool = |r: Result<String, ToolError>| r.map_err(|e| e.to_string());
    let output = match args.command {
        Command::Decode { shape, precision } => tool(tools::decode(&shape, precision))?,
        Command::Normalize { response } => tool(tools::normalize(&read(&response)?))?,
        Command::Narrative { response } => tool(tools::narrative(&read(&response)?))?,
        Command::Export {
            response,
            kind,
            format,
            out,
        } => {
            let target = match kind {
                Kind::Directions => ExportTarget::Directions,
                Kind::Isochrones => ExportTarget::Isochrones,
            };
            let format = match format {
                Format::Json => ExportFormat::Json,
                Format::Geojson => ExportFormat::GeoJson,
            };
            let contents = tool(tools::export(&read(&response)?, target, format))?;
            if let Some(path) = out {
                fs::write(&path, contents).map_err(|e| format!("write {path:?}: {e}"))?;
                return Ok(());
            }
            contents
        }
        Command::Heightgraph {
            route,
            height,
            max_points,
        } => tool(tools::heightgraph(&read(&route)?, &read(&height)?, max_points))?,
        Command::Permalink { url, rebase } => tool(tools::permalink(&url, rebase.as_deref()))?,
    };
    println!("{output}");
    Ok(())
}
