//! Gaussian curve rasterization for the result panel.
//!
//! Turns `(mean, std_dev, line)` from an analysis response into a polyline in
//! viewport pixel space plus the horizontal position of the betting line.

use std::f64::consts::PI;
use std::fmt::Write as _;

use anyhow::{Result, anyhow, bail};

pub const DEFAULT_WIDTH: f64 = 300.0;
pub const DEFAULT_HEIGHT: f64 = 120.0;
pub const DEFAULT_PADDING: f64 = 20.0;
pub const DEFAULT_INTERVALS: usize = 100;

/// Half-width of the plotted domain, in standard deviations.
const DOMAIN_SIGMAS: f64 = 3.0;
/// Cosmetic vertical multiplier applied to `density * std_dev`.
const DENSITY_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            padding: DEFAULT_PADDING,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64, padding: f64) -> Option<Self> {
        let vp = Self {
            width,
            height,
            padding,
        };
        vp.is_valid().then_some(vp)
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.padding.is_finite()
            && self.padding >= 0.0
            && self.drawable_width() > 0.0
            && self.drawable_height() > 0.0
    }

    pub fn drawable_width(&self) -> f64 {
        self.width - 2.0 * self.padding
    }

    pub fn drawable_height(&self) -> f64 {
        self.height - 2.0 * self.padding
    }

    /// Left and right pixel edges of the drawable region.
    pub fn drawable_x_range(&self) -> (f64, f64) {
        (self.padding, self.width - self.padding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    /// Domain value (same units as the stat).
    pub value: f64,
    pub density: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionCurve {
    pub path: Vec<CurvePoint>,
    pub line_marker_x: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub min_x: f64,
    pub max_x: f64,
    pub viewport: Viewport,
}

impl DistributionCurve {
    /// True when the marker lands inside the drawable region.
    pub fn line_marker_visible(&self) -> bool {
        let (left, right) = self.viewport.drawable_x_range();
        self.line_marker_x >= left && self.line_marker_x <= right
    }

    /// Index of the sample with the highest density.
    pub fn peak_index(&self) -> Option<usize> {
        self.path
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.density.total_cmp(&b.density))
            .map(|(idx, _)| idx)
    }

    /// SVG-style path descriptor: `M x,y L x,y ...`.
    pub fn path_descriptor(&self) -> String {
        let mut out = String::with_capacity(self.path.len() * 16);
        for (idx, p) in self.path.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            let cmd = if idx == 0 { 'M' } else { 'L' };
            let _ = write!(out, "{cmd}{:.2},{:.2}", p.x, p.y);
        }
        out
    }

    /// Map a domain value into horizontal pixel space (unclamped).
    pub fn project_x(&self, value: f64) -> f64 {
        project(value, self.min_x, self.max_x, &self.viewport)
    }
}

pub fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    (-0.5 * z * z).exp() / (std_dev * (2.0 * PI).sqrt())
}

/// Render with the default 100 sampling intervals. `None` means "not renderable".
pub fn render_distribution(
    mean: f64,
    std_dev: f64,
    line_value: f64,
    viewport: Option<Viewport>,
) -> Option<DistributionCurve> {
    render_distribution_sampled(mean, std_dev, line_value, viewport, DEFAULT_INTERVALS)
}

pub fn render_distribution_sampled(
    mean: f64,
    std_dev: f64,
    line_value: f64,
    viewport: Option<Viewport>,
    intervals: usize,
) -> Option<DistributionCurve> {
    try_render_distribution(mean, std_dev, line_value, viewport, intervals).ok()
}

/// Same as [`render_distribution_sampled`] but reports why nothing was drawn.
pub fn try_render_distribution(
    mean: f64,
    std_dev: f64,
    line_value: f64,
    viewport: Option<Viewport>,
    intervals: usize,
) -> Result<DistributionCurve> {
    if !(std_dev > 0.0) {
        bail!("std dev must be > 0 (got {std_dev})");
    }
    if !mean.is_finite() || !std_dev.is_finite() || !line_value.is_finite() {
        bail!("non-finite input (mean {mean}, std dev {std_dev}, line {line_value})");
    }
    if intervals == 0 {
        bail!("need at least one sampling interval");
    }
    let viewport = viewport.unwrap_or_default();
    if !viewport.is_valid() {
        bail!("viewport has no drawable area");
    }

    let min_x = mean - DOMAIN_SIGMAS * std_dev;
    let max_x = mean + DOMAIN_SIGMAS * std_dev;
    // Tiny std devs next to a huge mean can collapse the domain.
    if !(max_x > min_x) {
        bail!("domain collapsed at mean {mean}, std dev {std_dev}");
    }

    let step = (max_x - min_x) / intervals as f64;
    let mut path = Vec::with_capacity(intervals + 1);
    for i in 0..=intervals {
        // Pin the last sample to max_x so the domain end is exact.
        let value = if i == intervals {
            max_x
        } else {
            min_x + step * i as f64
        };
        let density = normal_pdf(value, mean, std_dev);
        let scaled = density * std_dev * DENSITY_SCALE;
        let x = project(value, min_x, max_x, &viewport);
        let y = viewport.height - viewport.padding - scaled * viewport.drawable_height();
        if !x.is_finite() || !y.is_finite() || !density.is_finite() {
            return Err(anyhow!("non-finite sample at {value}"));
        }
        if let Some(prev) = path.last().map(|p: &CurvePoint| p.x)
            && x <= prev
        {
            bail!("samples not increasing at {value}");
        }
        path.push(CurvePoint {
            value,
            density,
            x,
            y,
        });
    }

    let line_marker_x = project(line_value, min_x, max_x, &viewport);
    if !line_marker_x.is_finite() {
        bail!("line marker is not finite");
    }

    Ok(DistributionCurve {
        path,
        line_marker_x,
        mean,
        std_dev,
        min_x,
        max_x,
        viewport,
    })
}

fn project(value: f64, min_x: f64, max_x: f64, viewport: &Viewport) -> f64 {
    let scale = viewport.drawable_width() / (max_x - min_x);
    viewport.padding + (value - min_x) * scale
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MemoKey {
    mean: u64,
    std_dev: u64,
    line_value: u64,
    viewport: Viewport,
    intervals: usize,
}

/// Single-slot memo: recomputes only when the inputs change. A rejection is
/// memoized too, with its reason.
#[derive(Debug, Clone, Default)]
pub struct CurveMemo {
    key: Option<MemoKey>,
    value: Option<std::result::Result<DistributionCurve, String>>,
    computations: usize,
}

impl CurveMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        mean: f64,
        std_dev: f64,
        line_value: f64,
        viewport: Viewport,
    ) -> Option<&DistributionCurve> {
        let key = MemoKey {
            mean: mean.to_bits(),
            std_dev: std_dev.to_bits(),
            line_value: line_value.to_bits(),
            viewport,
            intervals: DEFAULT_INTERVALS,
        };
        if self.key != Some(key) {
            let rendered =
                try_render_distribution(mean, std_dev, line_value, Some(viewport), DEFAULT_INTERVALS)
                    .map_err(|e| e.to_string());
            self.value = Some(rendered);
            self.key = Some(key);
            self.computations += 1;
        }
        self.value.as_ref().and_then(|v| v.as_ref().ok())
    }

    /// Why the last lookup produced no curve, if it didn't.
    pub fn last_error(&self) -> Option<&str> {
        match self.value.as_ref() {
            Some(Err(reason)) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// How many times the curve was actually recomputed.
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.value = None;
    }
}
