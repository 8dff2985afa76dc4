// ============================================================================
// Chart - Rendu PNG d'un graphique en chandeliers
// ============================================================================
// Dessine une PriceSeries dans un bitmap en mémoire avec plotters, puis
// l'encode en PNG.
//
// STRUCTURE DE LA FIGURE :
// - Titre centré en haut
// - Panneau des prix : grille en pointillés, mèches, corps, moyennes mobiles
// - Panneau de volume (optionnel) : barres colorées comme les chandelles
//
// L'axe X est l'index de la chandelle (pas le temps) : les week-ends et les
// nuits ne laissent pas de trous dans le graphique.
// ============================================================================

use std::ops::Range;

use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use thiserror::Error;
use tracing::debug;

use crate::models::{Bar, PriceSeries};

pub mod style; // Couleurs, polices et dimensions

pub use style::ChartStyle;

/// Nombre indicatif de graduations sur l'axe des prix
const Y_LABELS: usize = 6;

/// Nombre indicatif de graduations sur l'axe du volume
const VOLUME_LABELS: usize = 3;

/// Nombre indicatif de dates sur l'axe X
const X_LABELS: usize = 8;

/// Marge autour de chaque panneau, en pixels
const PANE_MARGIN: u32 = 12;

/// Erreurs de rendu
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot render an empty price series")]
    EmptySeries,

    #[error("drawing failed: {0}")]
    Backend(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

fn backend_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Backend(err.to_string())
}

type Pane<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Renderer de graphiques en chandeliers
///
/// CONCEPT RUST : Aucun état mutable
/// - `render` prend &self et alloue son propre bitmap à chaque appel
/// - Le bitmap est libéré à la fin de l'appel (RAII)
/// - Un même renderer peut donc servir plusieurs requêtes en parallèle
#[derive(Debug, Clone, Default)]
pub struct ChartRenderer {
    style: ChartStyle,
}

impl ChartRenderer {
    pub fn new(style: ChartStyle) -> Self {
        Self { style }
    }

    /// Dessine la série et retourne l'image PNG
    ///
    /// # Arguments
    /// * `series` - Chandelles à afficher (non vide)
    /// * `title` - Titre déjà composé par l'appelant
    /// * `moving_averages` - Longueurs des SMA de clôture à superposer
    /// * `show_volume` - Ajoute le panneau de volume sous les prix
    pub fn render(
        &self,
        series: &PriceSeries,
        title: &str,
        moving_averages: &[usize],
        show_volume: bool,
    ) -> Result<Vec<u8>, RenderError> {
        if series.is_empty() {
            return Err(RenderError::EmptySeries);
        }

        let (width, height) = self.style.pixel_size();
        let mut buffer = vec![0u8; width as usize * height as usize * 3];

        self.draw(
            &mut buffer,
            (width, height),
            series,
            title,
            moving_averages,
            show_volume,
        )?;

        let png = encode_png(&buffer, width, height)?;
        debug!(
            ticker = %series.symbol,
            bars = series.len(),
            width,
            height,
            bytes = png.len(),
            "Chart rendered"
        );
        Ok(png)
    }

    fn draw(
        &self,
        buffer: &mut [u8],
        size: (u32, u32),
        series: &PriceSeries,
        title: &str,
        moving_averages: &[usize],
        show_volume: bool,
    ) -> Result<(), RenderError> {
        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&self.style.background).map_err(backend_error)?;

        let title_font = self.font(self.style.title_font_size);
        let plot_area = root.titled(title, title_font).map_err(backend_error)?;

        let bars = series.bars();
        let x_range = -0.5..(bars.len() as f64 - 0.5);
        let x_format = date_format(bars);

        if show_volume {
            let plot_height = plot_area.dim_in_pixel().1 as f64;
            let split = (plot_height * (1.0 - self.style.volume_ratio)).round() as u32;
            let (price_area, volume_area) = plot_area.split_vertically(split);

            self.draw_price_pane(&price_area, series, x_range.clone(), moving_averages, None)?;
            self.draw_volume_pane(&volume_area, series, x_range, x_format)?;
        } else {
            self.draw_price_pane(&plot_area, series, x_range, moving_averages, Some(x_format))?;
        }

        root.present().map_err(backend_error)?;
        Ok(())
    }

    /// Panneau des prix : grille, chandelles, moyennes mobiles et légende
    ///
    /// `x_format` vaut `None` quand le panneau de volume porte l'axe des dates.
    fn draw_price_pane(
        &self,
        area: &Pane<'_>,
        series: &PriceSeries,
        x_range: Range<f64>,
        moving_averages: &[usize],
        x_format: Option<&str>,
    ) -> Result<(), RenderError> {
        let bars = series.bars();
        let low = series.min_low().ok_or(RenderError::EmptySeries)?;
        let high = series.max_high().ok_or(RenderError::EmptySeries)?;
        let y_range = padded_range(low, high);

        let mut chart = ChartBuilder::on(area)
            .margin(PANE_MARGIN)
            .x_label_area_size(if x_format.is_some() { self.x_label_area() } else { 0 })
            .y_label_area_size(self.y_label_area())
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(backend_error)?;

        let grid_style = self.style.grid_color.stroke_width(1);
        let (dash, gap) = self.style.grid_dash;
        for line in grid_lines(&x_range, &y_range, Y_LABELS) {
            chart
                .draw_series(DashedLineSeries::new(line, dash, gap, grid_style))
                .map_err(backend_error)?;
        }

        let format = x_format.unwrap_or_default();
        let x_formatter = |x: &f64| index_label(bars, *x, format);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(if x_format.is_some() { X_LABELS } else { 0 })
            .x_label_formatter(&x_formatter)
            .y_labels(Y_LABELS)
            .y_label_formatter(&|y| format!("{:.2}", y))
            .y_desc("Price (USD)")
            .axis_style(&self.style.foreground)
            .label_style(self.font(self.style.label_font_size))
            .axis_desc_style(self.font(self.style.axis_font_size))
            .draw()
            .map_err(backend_error)?;

        // Mèches puis corps, pour que le corps recouvre la mèche
        let wick_style = self.style.wick_color.stroke_width(1);
        chart
            .draw_series(bars.iter().enumerate().map(|(i, bar)| {
                let x = i as f64;
                PathElement::new(vec![(x, bar.low), (x, bar.high)], wick_style)
            }))
            .map_err(backend_error)?;

        let half = self.style.body_width / 2.0;
        chart
            .draw_series(bars.iter().enumerate().map(|(i, bar)| {
                let x = i as f64;
                Rectangle::new(
                    [(x - half, bar.body_bottom()), (x + half, bar.body_top())],
                    self.direction_color(bar).filled(),
                )
            }))
            .map_err(backend_error)?;

        for (index, &window) in moving_averages.iter().enumerate() {
            let color = self.style.moving_average_color(index);
            let points: Vec<(f64, f64)> = series
                .simple_moving_average(window)
                .into_iter()
                .enumerate()
                .filter_map(|(i, value)| value.map(|v| (i as f64, v)))
                .collect();

            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(backend_error)?
                .label(format!("MA{}", window))
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
        }

        if !moving_averages.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(self.style.background.mix(0.8).filled())
                .border_style(&self.style.foreground)
                .label_font(self.font(self.style.label_font_size))
                .draw()
                .map_err(backend_error)?;
        }

        Ok(())
    }

    /// Panneau de volume : une barre par chandelle, même couleur que le corps
    fn draw_volume_pane(
        &self,
        area: &Pane<'_>,
        series: &PriceSeries,
        x_range: Range<f64>,
        x_format: &str,
    ) -> Result<(), RenderError> {
        let bars = series.bars();
        let max_volume = series.max_volume().unwrap_or(0).max(1) as f64;
        let y_range = 0.0..max_volume * 1.1;

        let mut chart = ChartBuilder::on(area)
            .margin(PANE_MARGIN)
            .margin_top(0)
            .x_label_area_size(self.x_label_area())
            .y_label_area_size(self.y_label_area())
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(backend_error)?;

        let grid_style = self.style.grid_color.stroke_width(1);
        let (dash, gap) = self.style.grid_dash;
        for line in grid_lines(&x_range, &y_range, VOLUME_LABELS) {
            chart
                .draw_series(DashedLineSeries::new(line, dash, gap, grid_style))
                .map_err(backend_error)?;
        }

        let x_formatter = |x: &f64| index_label(bars, *x, x_format);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(X_LABELS)
            .x_label_formatter(&x_formatter)
            .y_labels(VOLUME_LABELS)
            .y_label_formatter(&|v| format_volume(*v))
            .y_desc("Volume")
            .axis_style(&self.style.foreground)
            .label_style(self.font(self.style.label_font_size))
            .axis_desc_style(self.font(self.style.axis_font_size))
            .draw()
            .map_err(backend_error)?;

        let half = self.style.body_width / 2.0;
        chart
            .draw_series(bars.iter().enumerate().map(|(i, bar)| {
                let x = i as f64;
                Rectangle::new(
                    [(x - half, 0.0), (x + half, bar.volume as f64)],
                    self.direction_color(bar).filled(),
                )
            }))
            .map_err(backend_error)?;

        Ok(())
    }

    fn direction_color(&self, bar: &Bar) -> RGBColor {
        if bar.is_up() {
            self.style.up_color
        } else {
            self.style.down_color
        }
    }

    fn font(&self, points: f64) -> TextStyle<'_> {
        (
            self.style.font_family.as_str(),
            self.style.points_to_pixels(points),
        )
            .into_font()
            .color(&self.style.foreground)
    }

    fn x_label_area(&self) -> u32 {
        (self.style.points_to_pixels(self.style.label_font_size) * 2.5) as u32
    }

    fn y_label_area(&self) -> u32 {
        (self.style.points_to_pixels(self.style.label_font_size) * 6.0) as u32
    }
}

/// Encode un bitmap RGB en PNG
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(buffer, width, height, ColorType::Rgb8)?;
    Ok(png)
}

/// Plage de prix avec 5% de marge ; une plage plate est élargie autour du prix
fn padded_range(low: f64, high: f64) -> Range<f64> {
    let span = high - low;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        (high.abs() * 0.01).max(1.0)
    };
    (low - pad)..(high + pad)
}

/// Segments de la grille : horizontaux et verticaux, aux mêmes positions
/// que les graduations des axes
fn grid_lines(x_range: &Range<f64>, y_range: &Range<f64>, y_labels: usize) -> Vec<Vec<(f64, f64)>> {
    let x_coord: RangedCoordf64 = x_range.clone().into();
    let y_coord: RangedCoordf64 = y_range.clone().into();

    let horizontal = y_coord
        .key_points(y_labels)
        .into_iter()
        .map(|y| vec![(x_range.start, y), (x_range.end, y)]);
    let vertical = x_coord
        .key_points(X_LABELS)
        .into_iter()
        .map(|x| vec![(x, y_range.start), (x, y_range.end)]);

    horizontal.chain(vertical).collect()
}

/// Format des dates de l'axe X
///
/// - Plusieurs chandelles le même jour : intraday, on affiche l'heure
/// - Sinon : la date seule
fn date_format(bars: &[Bar]) -> &'static str {
    let intraday = bars
        .windows(2)
        .any(|w| w[0].timestamp.date_naive() == w[1].timestamp.date_naive());

    if intraday {
        "%m-%d %H:%M"
    } else {
        "%Y-%m-%d"
    }
}

/// Label de la chandelle la plus proche de `x` (vide hors de la série)
fn index_label(bars: &[Bar], x: f64, format: &str) -> String {
    let index = x.round();
    if index < 0.0 || format.is_empty() {
        return String::new();
    }
    bars.get(index as usize)
        .map(|bar| bar.timestamp.format(format).to_string())
        .unwrap_or_default()
}

/// Volume compact : 950, 12.5K, 3.2M, 1.1B
fn format_volume(volume: f64) -> String {
    let abs = volume.abs();
    if abs >= 1e9 {
        format!("{:.1}B", volume / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", volume / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", volume / 1e3)
    } else {
        format!("{:.0}", volume)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
