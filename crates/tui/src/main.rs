mod renderer;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use ember_core::canvas::Viewport;
use ember_core::provider::{StackProvider, TreeProvider};
use ember_core::{FlamegraphConfig, FlamegraphWidget, svg};

const USAGE: &str = "Usage: ember <stacks.folded> [--config cfg.json] [--svg out.svg] [--width N]";
const DEFAULT_SVG_WIDTH: f64 = 1200.0;

#[derive(Debug, Default)]
struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    svg: Option<PathBuf>,
    width: Option<f64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut input = None;
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(args.next().context("--config needs a path")?.into()),
            "--svg" => parsed.svg = Some(args.next().context("--svg needs a path")?.into()),
            "--width" => {
                let value = args.next().context("--width needs a number")?;
                let width: f64 = value
                    .parse()
                    .with_context(|| format!("invalid --width {value:?}"))?;
                if width.is_nan() || width <= 0.0 {
                    bail!("--width must be positive, got {width}");
                }
                parsed.width = Some(width);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {arg:?}\n{USAGE}"),
        }
    }
    parsed.input = input.context(USAGE)?;
    Ok(parsed)
}

fn load_config(path: Option<&Path>) -> Result<FlamegraphConfig> {
    let Some(path) = path else {
        return Ok(FlamegraphConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    FlamegraphConfig::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
}

fn export_svg(widget: &mut FlamegraphWidget, path: &Path, width: f64) -> Result<()> {
    // First pass learns the content height, second paints all of it.
    let probe = widget.paint(&Viewport::new(width, widget.config().node_height));
    let frame = widget.paint(&Viewport::new(width, probe.content_height));
    let document = svg::render_svg(&frame.commands, width, frame.content_height, false);
    std::fs::write(path, document).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "svg written");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(args.config.as_deref())?;

    let data = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let provider = StackProvider::from_collapsed(&data)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    let mut widget = FlamegraphWidget::new(config, provider.metrics());
    widget.refresh(&provider);
    if widget.data().is_none() {
        bail!("no flame graph for {}", args.input.display());
    }

    match &args.svg {
        Some(path) => export_svg(&mut widget, path, args.width.unwrap_or(DEFAULT_SVG_WIDTH)),
        None => renderer::run(widget, &provider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        parse_args(args.iter().map(ToString::to_string))
    }

    #[test]
    fn parses_all_options() {
        let args = parse(&["perf.folded", "--svg", "out.svg", "--width", "800", "--config", "c.json"]).unwrap();
        assert_eq!(args.input, PathBuf::from("perf.folded"));
        assert_eq!(args.svg, Some(PathBuf::from("out.svg")));
        assert_eq!(args.config, Some(PathBuf::from("c.json")));
        assert_eq!(args.width, Some(800.0));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.folded", "b.folded"]).is_err());
        assert!(parse(&["a.folded", "--width", "wide"]).is_err());
        assert!(parse(&["a.folded", "--width", "0"]).is_err());
        assert!(parse(&["a.folded", "--verbose"]).is_err());
    }
}
