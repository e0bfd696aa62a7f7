//! Bulk properties of a baked flow, e.g. how fast it cools and how far it runs.

// Output types are x/y tuples, for plotting.

use std::error::Error;

use plotters::{
    element::PathElement,
    prelude::{ChartBuilder, Color, IntoDrawingArea, SVGBackend, BLACK, RED, WHITE},
    series::LineSeries,
};

use crate::{playback::PlaybackBuffer, util};

/// Mean temperature of a snapshot's particles (K). `None` if it has no particles.
pub fn mean_temperature(particles: &[[f64; 4]]) -> Option<f64> {
    if particles.is_empty() {
        return None;
    }
    Some(particles.iter().map(|p| p[3]).sum::<f64>() / particles.len() as f64)
}

/// How far the flow has run: the largest horizontal distance of any particle from `center` (m).
pub fn flow_front(particles: &[[f64; 4]], center: [f64; 2]) -> f64 {
    particles
        .iter()
        .map(|p| {
            let dx = p[0] - center[0];
            let dy = p[1] - center[1];
            (dx * dx + dy * dy).sqrt()
        })
        .fold(0., f64::max)
}

/// X: t (s). Y: mean temperature (K). Snapshots without particles are skipped.
pub fn temperature_series(buffer: &PlaybackBuffer) -> Vec<(f64, f64)> {
    buffer
        .snapshots
        .iter()
        .enumerate()
        .filter_map(|(i, snap)| {
            mean_temperature(&snap.particles).map(|t| (i as f64 * buffer.acquisition_interval, t))
        })
        .collect()
}

/// X: t (s). Y: flow front distance from the crater (m).
pub fn flow_front_series(buffer: &PlaybackBuffer, center: [f64; 2]) -> Vec<(f64, f64)> {
    buffer
        .snapshots
        .iter()
        .enumerate()
        .map(|(i, snap)| {
            (
                i as f64 * buffer.acquisition_interval,
                flow_front(&snap.particles, center),
            )
        })
        .collect()
}

/// Write a 2d line plot to `{filename}.svg`.
pub fn plot(
    data: &[(f64, f64)],
    x_label: &str,
    y_label: &str,
    plot_title: &str,
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    let mut x_range = util::range(data.iter().map(|(x, _)| *x));
    let mut y_range = util::range(data.iter().map(|(_, y)| *y));

    // Plotters needs a non-empty range.
    for range in [&mut x_range, &mut y_range] {
        if !(range.0 < range.1) {
            let mid = if range.0.is_finite() { range.0 } else { 0. };
            *range = (mid - 1., mid + 1.);
        }
    }

    let fname = format!("{filename}.svg");
    let root = SVGBackend::new(&fname, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(plot_title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()?;

    chart
        .draw_series(LineSeries::new(data.iter().cloned(), RED))?
        .label("Data")
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

pub fn plot_temperature(data: &[(f64, f64)], desc: &str) -> Result<(), Box<dyn Error>> {
    plot(
        data,
        "t (s)",
        "T (K)",
        &format!("Mean lava temperature, {desc}"),
        &format!("temp_plot_{desc}"),
    )
}

pub fn plot_flow_front(data: &[(f64, f64)], desc: &str) -> Result<(), Box<dyn Error>> {
    plot(
        data,
        "t (s)",
        "distance (m)",
        &format!("Flow front, {desc}"),
        &format!("front_plot_{desc}"),
    )
}
