use plotters::prelude::*;
use thiserror::Error;

use crate::services::series_merge::MergedRow;

#[derive(Error, Debug)]
pub enum LatencyPlotError {
    #[error("no latency points to plot")]
    EmptySeries,
    #[error("failed to render latency plot: {0}")]
    Plot(String),
}

/// Renders the merged EMAIL (A) / TELEGRAM (B) p95 series as a line chart PNG.
pub async fn write_latency_plot_png(
    output_path: &str,
    rows: &[MergedRow],
) -> Result<(), LatencyPlotError> {
    if rows.iter().all(|row| row.value_a.is_none() && row.value_b.is_none()) {
        return Err(LatencyPlotError::EmptySeries);
    }
    let output_path = output_path.to_string();
    let rows = rows.to_vec();
    tokio::task::spawn_blocking(move || render_plot_png(&output_path, &rows))
        .await
        .map_err(|e| LatencyPlotError::Plot(e.to_string()))??;
    Ok(())
}

fn render_plot_png(output_path: &str, rows: &[MergedRow]) -> Result<(), LatencyPlotError> {
    let max_latency = rows
        .iter()
        .flat_map(|row| [row.value_a, row.value_b])
        .flatten()
        .fold(0.0_f64, f64::max);
    let max_y = (max_latency * 1.1).max(1.0);
    let max_x = rows.len().saturating_sub(1).max(1) as i32;

    let root = BitMapBackend::new(output_path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| LatencyPlotError::Plot(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("P95 Latency by Channel", ("sans-serif", 30))
        .x_label_area_size(55)
        .y_label_area_size(65)
        .build_cartesian_2d(0..max_x, 0.0..max_y)
        .map_err(|e| LatencyPlotError::Plot(e.to_string()))?;

    let label_count = rows.len().clamp(1, 8);
    chart
        .configure_mesh()
        .x_desc("Time (UTC)")
        .y_desc("p95 latency (ms)")
        .label_style(("sans-serif", 18))
        .axis_desc_style(("sans-serif", 22))
        .x_labels(label_count)
        .x_label_formatter(&|index| {
            if *index < 0 {
                return String::new();
            }
            rows.get(*index as usize)
                .map(|row| row.timestamp.format("%H:%M:%S").to_string())
                .unwrap_or_default()
        })
        .draw()
        .map_err(|e| LatencyPlotError::Plot(e.to_string()))?;

    let email_color = RGBColor(30, 122, 204);
    let telegram_color = RGBColor(0, 168, 120);
    let series = [
        ("EMAIL", email_color, rows.iter().map(|row| row.value_a).collect::<Vec<_>>()),
        ("TELEGRAM", telegram_color, rows.iter().map(|row| row.value_b).collect::<Vec<_>>()),
    ];

    for (label, color, values) in series {
        // Gaps (missing values) are skipped rather than drawn as zero.
        let points: Vec<(i32, f64)> = values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| value.map(|value| (idx as i32, value)))
            .collect();
        if points.is_empty() {
            continue;
        }
        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            .map_err(|e| LatencyPlotError::Plot(e.to_string()))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart
            .draw_series(points.into_iter().map(|point| Circle::new(point, 3, color.filled())))
            .map_err(|e| LatencyPlotError::Plot(e.to_string()))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| LatencyPlotError::Plot(e.to_string()))?;

    root.present()
        .map_err(|e| LatencyPlotError::Plot(e.to_string()))?;
    Ok(())
}
