//! SVG charts for finished tables.

use std::path::Path;

use color_eyre::eyre::{eyre, Result};
use plotters::prelude::*;

use super::types::BandRow;

const CHART_DIMENSIONS: (u32, u32) = (1024, 768);

/// Upper bound of the y axis with a 5% buffer
fn y_max<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let max = values.into_iter().fold(0.0f64, f64::max);
    if max > 0.0 {
        max * 1.05
    } else {
        1.0
    }
}

/// Bar chart of one value per label
pub fn plot_bars(path: &Path, title: &str, y_desc: &str, bars: &[(String, f64)]) -> Result<()> {
    let root_area = SVGBackend::new(path, CHART_DIMENSIONS).into_drawing_area();
    root_area.fill(&WHITE)?;

    let labels: Vec<String> = bars.iter().map(|(label, _)| label.clone()).collect();
    let x_range = (0u32..bars.len().max(1) as u32).into_segmented();
    let y_range = 0.0..y_max(bars.iter().map(|(_, v)| *v));

    let mut ctx = ChartBuilder::on(&root_area)
        .set_label_area_size(LabelAreaPosition::Left, 100)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .margin(20)
        .caption(title, ("sans-serif", 30))
        .build_cartesian_2d(x_range, y_range)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc(y_desc)
        .label_style(("sans-serif", 18))
        .draw()?;

    ctx.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
            BLUE.mix(0.7).filled(),
        );
        bar.set_margin(0, 0, 15, 15);
        bar
    }))?;

    root_area
        .present()
        .map_err(|e| eyre!("Failed to write chart {}: {}", path.display(), e))?;
    log::info!("Chart written to {}", path.display());
    Ok(())
}

/// Mean throughput line with a shaded 95% confidence band
pub fn plot_band(path: &Path, title: &str, band: &[BandRow]) -> Result<()> {
    let root_area = SVGBackend::new(path, CHART_DIMENSIONS).into_drawing_area();
    root_area.fill(&WHITE)?;

    let bin_width = band
        .get(1)
        .map(|r| r.time_s - band[0].time_s)
        .unwrap_or(1.0);
    let x_end = band.last().map(|r| r.time_s + bin_width).unwrap_or(1.0);
    let y_range = 0.0..y_max(band.iter().map(|r| r.mean_mbps + r.ci95_mbps));

    let mut ctx = ChartBuilder::on(&root_area)
        .set_label_area_size(LabelAreaPosition::Left, 100)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .margin(20)
        .caption(title, ("sans-serif", 30))
        .build_cartesian_2d(0.0..x_end, y_range)?;

    ctx.configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Throughput (Mbps)")
        .label_style(("sans-serif", 18))
        .draw()?;

    let upper = band.iter().map(|r| (r.time_s, r.mean_mbps + r.ci95_mbps));
    let lower = band
        .iter()
        .rev()
        .map(|r| (r.time_s, (r.mean_mbps - r.ci95_mbps).max(0.0)));
    let outline: Vec<(f64, f64)> = upper.chain(lower).collect();

    ctx.draw_series(std::iter::once(Polygon::new(outline, BLUE.mix(0.2))))?;
    ctx.draw_series(LineSeries::new(
        band.iter().map(|r| (r.time_s, r.mean_mbps)),
        BLUE,
    ))?;

    root_area
        .present()
        .map_err(|e| eyre!("Failed to write chart {}: {}", path.display(), e))?;
    log::info!("Chart written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_y_max() {
        assert_eq!(y_max(Vec::new()), 1.0);
        assert_eq!(y_max(vec![0.0, 0.0]), 1.0);
        assert!((y_max(vec![1.0, 2.0]) - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_plot_bars_writes_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("goodput.svg");
        let bars = vec![("cubic".to_string(), 4.2), ("reno".to_string(), 3.9)];

        plot_bars(&path, "Goodput (Mbps)", "Mbps", &bars).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("cubic"));
    }

    #[test]
    fn test_plot_band_writes_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("band.svg");
        let band: Vec<BandRow> = (0..5)
            .map(|bin| BandRow {
                bin,
                time_s: bin as f64 * 0.2,
                mean_mbps: 1.0 + bin as f64,
                std_mbps: 0.1,
                ci95_mbps: 0.2,
            })
            .collect();

        plot_band(&path, "cubic", &band).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }
}
