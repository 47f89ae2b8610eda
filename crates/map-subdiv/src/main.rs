mod input;
mod logging;
mod settings;

use anyhow::Context;
use clap::Parser;
use map_subdiv_lib::{LevelSummary, MapBuilder, MapSource, MemorySink, Tile};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::input::InputMap;
use crate::settings::Settings;

/// One level of the JSON output
#[derive(Serialize)]
struct LevelOutput {
    summary: LevelSummary,
    tiles: Vec<Tile>,
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    let _guard = logging::setup_logging_and_profiling();
    run(&settings)
}

fn run(settings: &Settings) -> anyhow::Result<()> {
    profiling::scope!("run");
    let text = std::fs::read_to_string(&settings.input)
        .with_context(|| format!("reading {}", settings.input.display()))?;
    let map: InputMap = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", settings.input.display()))?;
    let details = map.into_details();
    tracing::info!(
        bounds = ?details.bounds(),
        points = details.points().len(),
        lines = details.lines().len(),
        shapes = details.shapes().len(),
        "map loaded"
    );

    let builder = MapBuilder::new(settings.builder_config());
    let built = builder
        .build_levels(&details, &settings.levels, |_| MemorySink::new())
        .context("building levels")?;

    for (summary, _) in &built {
        println!(
            "level {} (resolution {}): {} tiles, {} points, {} lines, {} shapes{}",
            summary.level,
            summary.resolution,
            summary.tiles,
            summary.points,
            summary.lines,
            summary.shapes,
            if summary.oversized_tiles > 0 {
                format!(", {} tiles over a limit", summary.oversized_tiles)
            } else {
                String::new()
            }
        );
    }

    if let Some(path) = &settings.output {
        let levels: Vec<LevelOutput> = built
            .into_iter()
            .map(|(summary, sink)| LevelOutput {
                summary,
                tiles: sink.into_tiles(),
            })
            .collect();
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &levels)
            .with_context(|| format!("writing {}", path.display()))?;
        writer.flush()?;
        tracing::info!(path = %path.display(), "tiles written");
    }
    Ok(())
}
