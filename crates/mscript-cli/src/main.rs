//! `mscript` - run a MethodSCRIPT on an instrument and decode the results

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mscript_core::archive::write_raw_lines;
use mscript_core::mscript::{column_values, parse_result_lines_with, ResultSet};
use mscript_core::protocol::{discover_port_with, list_ports, Connection, ConnectionConfig};
use mscript_core::simulator::SimulatedPort;
use mscript_core::{Instrument, Script, TracingSink};

#[derive(Parser, Debug)]
#[command(name = "mscript")]
#[command(about = "Run a MethodSCRIPT on a connected instrument and decode the results")]
#[command(version)]
struct Args {
    /// Script file to execute
    #[arg(short, long)]
    script: PathBuf,

    /// Serial port (auto-detected when omitted)
    #[arg(short, long)]
    port: Option<String>,

    /// Per-line read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Directory for raw response archives
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// JSON connection configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the built-in simulated instrument instead of a serial port
    #[arg(long)]
    demo: bool,

    /// Print the decoded result set as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let default = if verbose {
        "mscript=debug,info"
    } else {
        "mscript=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Configuration file (or defaults) with command line overrides applied
fn load_config(args: &Args) -> Result<ConnectionConfig> {
    let mut config = match &args.config {
        Some(path) => ConnectionConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ConnectionConfig::default(),
    };
    if let Some(port) = &args.port {
        config.port_name = port.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    Ok(config)
}

fn connect(args: &Args, config: &mut ConnectionConfig) -> Result<Connection> {
    if args.demo {
        let port = SimulatedPort::new("simulator");
        return port
            .open(config.timeout())
            .context("opening simulated instrument");
    }

    if config.port_name.is_empty() {
        config.port_name = discover_port_with(&list_ports(), &config.signatures, None)
            .context("no port given and auto-detection failed")?;
        tracing::info!("Using port {}", config.port_name);
    }
    Connection::open_with(config).with_context(|| format!("opening {}", config.port_name))
}

/// Archive file prefix derived from the script name
fn archive_prefix(script: &Path) -> String {
    script
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("measurement")
        .to_string()
}

fn log_summary(results: &ResultSet) {
    for (curve_index, curve) in results.curves().iter().enumerate() {
        tracing::info!(
            "Curve {} ({} packages)",
            curve_index,
            curve.packages().len()
        );
        for package in curve.packages() {
            let values: Vec<String> = package.values().iter().map(|v| v.to_string()).collect();
            tracing::debug!("  {}", values.join("; "));
        }
    }

    for column in 0..2 {
        match column_values(results, column) {
            Ok(values) if !values.is_empty() => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                tracing::info!(
                    "Column {}: {} values, min {:e}, max {:e}",
                    column,
                    values.len(),
                    min,
                    max
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Column {}: {}", column, e),
        }
    }
}

fn run(args: Args) -> Result<()> {
    let script = Script::from_file(&args.script)
        .with_context(|| format!("loading script {}", args.script.display()))?;
    let mut config = load_config(&args)?;
    let connection = connect(&args, &mut config)?;

    let mut device = Instrument::with_markers(connection, config.markers.clone(), TracingSink);
    let device_type = device.device_type().context("identifying instrument")?;
    tracing::debug!("Device type: {:?}", device_type);

    device.send_script(&script)?;
    let lines = match device.read_until_end() {
        Ok(lines) => lines,
        Err(e) => {
            // Keep whatever did arrive
            if let Some(raw) = e.raw_lines() {
                let path = write_raw_lines(&args.output, &archive_prefix(&args.script), raw)?;
                tracing::warn!("Partial response saved to {}", path.display());
            }
            return Err(e).context("reading measurement results");
        }
    };
    drop(device);

    let path = write_raw_lines(&args.output, &archive_prefix(&args.script), &lines)
        .context("archiving raw response")?;
    tracing::info!("Raw response saved to {}", path.display());

    let results = parse_result_lines_with(&lines, &config.markers)
        .with_context(|| format!("decoding {}", path.display()))?;
    if results.curves().is_empty() {
        tracing::warn!("The script produced no curves");
    }
    log_summary(&results);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);
    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_archive_prefix() {
        assert_eq!(archive_prefix(Path::new("scripts/chrono_amp.mscr")), "chrono_amp");
        assert_eq!(archive_prefix(Path::new("/")), "measurement");
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["mscript", "--script", "a.mscr"]);
        assert_eq!(args.output, PathBuf::from("output"));
        assert!(args.port.is_none());
        assert!(!args.demo);
    }

    #[test]
    fn test_load_config_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port_name": "/dev/ttyACM0", "timeout_ms": 500}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::parse_from(["mscript", "-s", "a.mscr", "-c", &path, "--timeout-ms", "900"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.port_name, "/dev/ttyACM0");
        assert_eq!(config.timeout_ms, 900);
    }

    #[test]
    fn test_demo_run_archives_response() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ca.mscr");
        std::fs::write(&script, "e\nmeas_loop_ca p c 0 100m 500m\nendloop\n\n").unwrap();
        let output = dir.path().join("out");

        let args = Args::parse_from([
            "mscript",
            "--script",
            script.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--demo",
        ]);
        run(args).unwrap();

        let archived: Vec<_> = std::fs::read_dir(&output).unwrap().collect();
        assert_eq!(archived.len(), 1);
    }

    #[test]
    fn test_demo_run_without_curves_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("idle.mscr");
        std::fs::write(&script, "e\nwait 10m\n\n").unwrap();
        let output = dir.path().join("out");
        let args = Args::parse_from([
            "mscript",
            "--script",
            script.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--demo",
        ]);
        run(args).unwrap();

        // An empty result set is still a complete run and gets archived
        let archived: Vec<_> = std::fs::read_dir(&output).unwrap().collect();
        assert_eq!(archived.len(), 1);
    }

    #[test]
    fn test_duration_from_config() {
        let config = ConnectionConfig {
            timeout_ms: 250,
            ..ConnectionConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }
}
