//! Drawing figure descriptions with the plotters bitmap backend
use std::path::Path;

use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{Figure, Layer, Panel, RenderError, Shade};

/// Font size of row titles in points
const ROW_TITLE_PT: f64 = 20.0;
/// Font size of panel titles, axis labels and ticks in points
const LABEL_PT: f64 = 16.0;
/// Height of rug ticks as a share of the y range
const RUG_HEIGHT: f64 = 0.03;

fn rgb(shade: Shade) -> RGBColor {
    let (r, g, b) = shade.rgb();
    RGBColor(r, g, b)
}

/// Split a polyline into the runs that lie inside the box
/// `[x0, x1] × [y0, y1]`, cutting segments where they cross its edges
///
/// # Example
///
/// ```
/// use yieldreg::plot::clip_polyline;
///
/// let line = [(0.0, 0.0), (2.0, 2.0), (4.0, 0.0)];
/// let runs = clip_polyline(&line, (0.0, 4.0), (0.0, 1.0));
///
/// assert_eq!(runs, vec![vec![(0.0, 0.0), (1.0, 1.0)], vec![(3.0, 1.0), (4.0, 0.0)]]);
/// ```
pub fn clip_polyline(
    points: &[(f64, f64)],
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> Vec<Vec<(f64, f64)>> {
    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for pair in points.windows(2) {
        match clip_segment(pair[0], pair[1], x_range, y_range) {
            Some((a, b)) => {
                if current.last() != Some(&a) {
                    if current.len() > 1 {
                        runs.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(a);
                }
                current.push(b);
            }
            None => {
                if current.len() > 1 {
                    runs.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}

/// Liang-Barsky clipping of the segment `a -> b`
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    if !(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite())
    {
        return None;
    }
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, a.0 - x0),
        (dx, x1 - a.0),
        (-dy, a.1 - y0),
        (dy, y1 - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    let at = |t: f64| {
        if t == 0.0 {
            a
        } else if t == 1.0 {
            b
        } else {
            (t.mul_add(dx, a.0), t.mul_add(dy, a.1))
        }
    };
    Some((at(t0), at(t1)))
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    scale: f64,
) -> Result<(), RenderError> {
    let (x0, x1) = panel.x_limits();
    let (y0, y1) = panel.y_limits();
    let font = ("sans-serif", LABEL_PT * scale);
    let margin = (8.0 * scale) as u32;

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, font)
        .margin(margin)
        .x_label_area_size((4.0 * LABEL_PT * scale) as u32)
        .y_label_area_size((5.0 * LABEL_PT * scale) as u32)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .label_style(font)
        .axis_desc_style(font)
        .draw()?;

    for layer in &panel.layers {
        match layer {
            Layer::Histogram { hist, shade, label } => {
                let color = rgb(*shade);
                let bars = hist
                    .bars()
                    .filter(|&(l, r, h)| h > 0.0 && r > x0 && l < x1)
                    .map(|(l, r, h)| {
                        Rectangle::new(
                            [(l.max(x0), 0.0), (r.min(x1), h.min(y1))],
                            color.filled(),
                        )
                    });
                let series = chart.draw_series(bars)?;
                if let Some(label) = label {
                    let size = (0.5 * LABEL_PT * scale) as i32;
                    series.label(label.as_str()).legend(move |(x, y)| {
                        Rectangle::new(
                            [(x, y - size / 2), (x + size, y + size / 2)],
                            color.filled(),
                        )
                    });
                }
            }
            Layer::LineFan {
                x,
                lines,
                shade,
                alpha,
            } => {
                let style = rgb(*shade).mix(*alpha).stroke_width(1);
                for line in lines {
                    let points: Vec<(f64, f64)> =
                        x.iter().copied().zip(line.iter().copied()).collect();
                    for run in clip_polyline(&points, (x0, x1), (y0, y1)) {
                        chart.draw_series(LineSeries::new(run, style))?;
                    }
                }
            }
            Layer::Rug { xs, shade } => {
                let color = rgb(*shade);
                let tick = RUG_HEIGHT * (y1 - y0);
                chart.draw_series(
                    xs.iter()
                        .filter(|&&x| x >= x0 && x <= x1)
                        .map(|&x| PathElement::new(vec![(x, y0), (x, y0 + tick)], color)),
                )?;
            }
        }
    }

    if panel.legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.0))
            .border_style(WHITE.mix(0.0))
            .label_font(font)
            .draw()?;
    }
    Ok(())
}

/// Render `figure` to a PNG file at `dpi` dots per inch
///
/// Font sizes are given in points, so text keeps its physical size at any
/// resolution.
pub fn render_png(
    figure: &Figure,
    path: &Path,
    dpi: u32,
) -> Result<(), RenderError> {
    if figure.rows.is_empty() || figure.rows.iter().any(|r| r.panels.is_empty())
    {
        return Err(RenderError::EmptyFigure);
    }
    let (width, height) = figure.pixel_size(dpi);
    if width == 0 || height == 0 {
        return Err(RenderError::ZeroSize { width, height });
    }
    let scale = f64::from(dpi) / 72.0;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let strips = root.split_evenly((figure.rows.len(), 1));
    for (strip, row) in strips.iter().zip(&figure.rows) {
        let title_font = ("sans-serif", ROW_TITLE_PT * scale)
            .into_font()
            .style(FontStyle::Bold);
        let body = strip.titled(&row.title, title_font)?;
        let cells = body.split_evenly((1, row.panels.len()));
        for (cell, panel) in cells.iter().zip(&row.panels) {
            draw_panel(cell, panel, scale)?;
        }
    }
    root.present()?;
    debug!("rendered {}x{} px to {}", width, height, path.display());
    Ok(())
}
