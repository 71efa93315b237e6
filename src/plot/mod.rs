//! Figure descriptions and their PNG rendering
//!
//! Figures are plain values: a grid of rows, each a titled strip of panels,
//! each panel a stack of layers. Building one has no side effect; only
//! [`render_png`] touches the file system.
mod figures;
mod render;

pub use figures::{
    fan_lines, posterior_figure, prior_figure, FAN_DRAWS, HIST_BINS,
    SOIL_GRID_POINTS,
};
pub use render::{clip_polyline, render_png};

use std::fmt;
use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use serde::{Deserialize, Serialize};

use crate::misc::Histogram;

/// Fill and stroke colours used by the figures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shade {
    Black,
    Grey,
}

impl Shade {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Shade::Black => (0, 0, 0),
            Shade::Grey => (128, 128, 128),
        }
    }
}

/// One drawable element of a panel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Layer {
    /// Bars of a histogram, with an optional legend entry
    Histogram {
        hist: Histogram,
        shade: Shade,
        label: Option<String>,
    },
    /// Lines sharing the x values, drawn with the given opacity
    LineFan {
        x: Vec<f64>,
        lines: Vec<Vec<f64>>,
        shade: Shade,
        alpha: f64,
    },
    /// Short ticks along the bottom axis
    Rug { xs: Vec<f64>, shade: Shade },
}

impl Layer {
    /// `(x_min, x_max)` of the layer's data
    fn x_extent(&self) -> Option<(f64, f64)> {
        match self {
            Layer::Histogram { hist, .. } => {
                let edges = hist.edges();
                Some((*edges.first()?, *edges.last()?))
            }
            Layer::LineFan { x, .. } | Layer::Rug { xs: x, .. } => extent(x),
        }
    }

    /// `(y_min, y_max)` of the layer's data. Rugs have none.
    fn y_extent(&self) -> Option<(f64, f64)> {
        match self {
            Layer::Histogram { hist, .. } => Some((0.0, hist.max_height())),
            Layer::LineFan { lines, .. } => {
                extent(lines.iter().flatten().copied())
            }
            Layer::Rug { .. } => None,
        }
    }
}

fn extent<I>(xs: I) -> Option<(f64, f64)>
where
    I: IntoIterator,
    I::Item: std::borrow::Borrow<f64>,
{
    use std::borrow::Borrow;
    xs.into_iter()
        .map(|x| *x.borrow())
        .filter(|x| x.is_finite())
        .fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((f64::min(lo, x), f64::max(hi, x))),
        })
}

/// Axes with their labels and layers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Fixed x limits, or `None` to fit the data
    pub x_range: Option<(f64, f64)>,
    /// Fixed y limits, or `None` to fit the data
    pub y_range: Option<(f64, f64)>,
    pub layers: Vec<Layer>,
    /// Show a legend of the labelled layers
    pub legend: bool,
}

impl Panel {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Panel {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            x_range: None,
            y_range: None,
            layers: Vec::new(),
            legend: false,
        }
    }

    pub fn with_x_range(mut self, lo: f64, hi: f64) -> Self {
        self.x_range = Some((lo, hi));
        self
    }

    pub fn with_y_range(mut self, lo: f64, hi: f64) -> Self {
        self.y_range = Some((lo, hi));
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_legend(mut self) -> Self {
        self.legend = true;
        self
    }

    /// The x limits to draw: the fixed ones or the padded data extent
    pub fn x_limits(&self) -> (f64, f64) {
        self.x_range.unwrap_or_else(|| {
            pad(combine(self.layers.iter().filter_map(Layer::x_extent)))
        })
    }

    /// The y limits to draw. Histograms fit only the bars inside the x
    /// limits.
    pub fn y_limits(&self) -> (f64, f64) {
        if let Some(range) = self.y_range {
            return range;
        }
        let (x_lo, x_hi) = self.x_limits();
        let extents = self.layers.iter().filter_map(|layer| match layer {
            Layer::Histogram { hist, .. } => Some((
                0.0,
                hist.bars()
                    .filter(|(l, r, _)| *r > x_lo && *l < x_hi)
                    .map(|(_, _, h)| h)
                    .fold(0.0, f64::max),
            )),
            _ => layer.y_extent(),
        });
        let (lo, hi) = pad(combine(extents));
        // bars rise from the axis
        if self
            .layers
            .iter()
            .any(|layer| matches!(layer, Layer::Histogram { .. }))
        {
            (0.0, hi)
        } else {
            (lo, hi)
        }
    }
}

fn combine<I: Iterator<Item = (f64, f64)>>(extents: I) -> Option<(f64, f64)> {
    extents.reduce(|(a, b), (c, d)| (a.min(c), b.max(d)))
}

/// Pad an extent by 5% on each side; a missing or empty one becomes [0, 1]
fn pad(extent: Option<(f64, f64)>) -> (f64, f64) {
    match extent {
        Some((lo, hi)) if hi > lo => {
            let margin = 0.05 * (hi - lo);
            (lo - margin, hi + margin)
        }
        Some((lo, _)) => (lo - 0.5, lo + 0.5),
        None => (0.0, 1.0),
    }
}

/// A titled strip of panels side by side
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub title: String,
    pub panels: Vec<Panel>,
}

/// A grid of titled rows
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Width and height in inches
    pub size: (f64, f64),
    pub rows: Vec<Row>,
}

impl Figure {
    /// Pixel dimensions at `dpi` dots per inch
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let dpi = f64::from(dpi);
        (
            (self.size.0 * dpi).round() as u32,
            (self.size.1 * dpi).round() as u32,
        )
    }

    pub fn panel(&self, row: usize, col: usize) -> Option<&Panel> {
        self.rows.get(row).and_then(|r| r.panels.get(col))
    }
}

#[derive(Debug)]
pub enum RenderError {
    /// The output location could not be prepared
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The drawing backend failed
    Backend(String),
    /// A figure needs a sample site the results do not have
    MissingSite { name: String },
    /// The figure has no rows or a row has no panels
    EmptyFigure,
    /// The image would have a zero dimension
    ZeroSize { width: u32, height: u32 },
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "{}: {source}", path.display())
            }
            Self::Backend(msg) => write!(f, "drawing failed: {msg}"),
            Self::MissingSite { name } => {
                write!(f, "no draws of sample site '{name}'")
            }
            Self::EmptyFigure => write!(f, "figure has nothing to draw"),
            Self::ZeroSize { width, height } => {
                write!(f, "image size {width}x{height} has no pixels")
            }
        }
    }
}

impl<E> From<DrawingAreaErrorKind<E>> for RenderError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Backend(err.to_string())
    }
}
