use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use parlay_terminal::analysis_fetch::parse_analysis_json;
use parlay_terminal::config::viewport_from_env;
use parlay_terminal::distribution::{DEFAULT_INTERVALS, try_render_distribution};

fn usage() -> &'static str {
    "usage: render_curve <mean> <std_dev> <line>\n       render_curve --json <analysis_response.json>"
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (mean, std_dev, line) = match args.as_slice() {
        [flag, path] if flag == "--json" => {
            let path = PathBuf::from(path);
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let result = parse_analysis_json(&raw)?;
            println!(
                "{} {} {} {}",
                result.player, result.bet_type, result.line, result.stat_type
            );
            let Some(params) = result.distribution_params() else {
                println!("not renderable: response has no std dev");
                return Ok(());
            };
            params
        }
        [mean, std_dev, line] => (
            mean.parse::<f64>().context("mean must be a number")?,
            std_dev.parse::<f64>().context("std_dev must be a number")?,
            line.parse::<f64>().context("line must be a number")?,
        ),
        _ => bail!("{}", usage()),
    };

    // Offline helper: no network, prints what the chart would draw.
    let viewport = viewport_from_env();
    match try_render_distribution(mean, std_dev, line, Some(viewport), DEFAULT_INTERVALS) {
        Ok(curve) => {
            println!(
                "viewport {}x{} padding {}",
                viewport.width, viewport.height, viewport.padding
            );
            println!(
                "mean {:.3} std_dev {:.3} domain [{:.3}, {:.3}]",
                curve.mean, curve.std_dev, curve.min_x, curve.max_x
            );
            println!(
                "line {:.3} -> x {:.2} ({})",
                line,
                curve.line_marker_x,
                if curve.line_marker_visible() {
                    "visible"
                } else {
                    "off chart"
                }
            );
            println!("points {}", curve.path.len());
            println!("{}", curve.path_descriptor());
        }
        Err(err) => println!("not renderable: {err}"),
    }
    Ok(())
}
