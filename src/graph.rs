#![cfg(feature = "web")]
use crate::chart::{ChartData, ChartKind, PieSlice};
use image::{ImageOutputFormat, RgbImage};
use plotters::prelude::*;
use std::error::Error;
use std::f64::consts::PI;
use std::io::Cursor;

/// Largest accepted image side in pixels.
pub const MAX_DIMENSION: u32 = 4096;

/// Configuration options for chart rendering
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Caption used when the chart config has no title
    pub title: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Renders projected chart data to a PNG image
///
/// Bar, line and area charts plot one series per configured y-axis field
/// against the point labels; pie charts draw the precomputed slices.
/// Empty data renders a placeholder message.
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
pub fn render_png(data: &ChartData, options: &GraphOptions) -> Result<Vec<u8>, Box<dyn Error>> {
    let (width, height) = (options.width, options.height);
    let mut pixels = vec![0u8; buffer_len(width, height)?];
    let title = data.title.clone().unwrap_or_else(|| options.title.clone());

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        if data.is_empty() || (data.points.is_empty() && data.slices.is_empty()) {
            root.draw(&Text::new(
                "Select at least one numeric field to plot",
                (20, (height / 2) as i32),
                ("sans-serif", 20).into_font(),
            ))?;
        } else {
            match data.kind {
                ChartKind::Bar => draw_bars(&root, data, &title)?,
                ChartKind::Line => draw_lines(&root, data, &title, false)?,
                ChartKind::Area => draw_lines(&root, data, &title, true)?,
                ChartKind::Pie => draw_pie(&root, &data.slices, &title)?,
            }
        }

        root.present()?;
    }

    encode_png(pixels, width, height)
}

/// Size of the RGB pixel buffer, rejecting empty or oversized images.
fn buffer_len(width: u32, height: u32) -> Result<usize, Box<dyn Error>> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(format!(
            "Image size {}x{} outside 1..={} pixels per side",
            width, height, MAX_DIMENSION
        )
        .into());
    }
    Ok(width as usize * height as usize * 3)
}

fn encode_png(pixels: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, Box<dyn Error>> {
    let image = RgbImage::from_raw(width, height, pixels).ok_or("Pixel buffer size mismatch")?;
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageOutputFormat::Png)?;
    Ok(png.into_inner())
}

fn series_color(index: usize) -> RGBAColor {
    Palette99::pick(index).mix(1.0)
}

/// Value axis bounds: always includes zero and spans at least 1
fn value_range(data: &ChartData) -> (f64, f64) {
    let values = data.points.iter().flat_map(|p| p.values.iter().copied());
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let max = if max - min < 1.0 { min + 1.0 } else { max };
    (min, max * 1.1)
}

fn draw_bars(
    root: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    data: &ChartData,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    let count = data.points.len();
    let (min_y, max_y) = value_range(data);
    let labels: Vec<String> = data.points.iter().map(|p| p.label.clone()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..count as f64 - 0.5, min_y..max_y)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(count.min(20))
        .x_label_formatter(&|x| label_at(&labels, *x))
        .draw()?;

    let series_count = data.series.len().max(1);
    let width = 0.8 / series_count as f64;

    for (s, name) in data.series.iter().enumerate() {
        let color = series_color(s);
        chart
            .draw_series(data.points.iter().enumerate().map(|(i, point)| {
                let x0 = i as f64 - 0.4 + s as f64 * width;
                Rectangle::new([(x0, 0.0), (x0 + width, point.values[s])], color.filled())
            }))?
            .label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    Ok(())
}

fn draw_lines(
    root: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    data: &ChartData,
    title: &str,
    filled: bool,
) -> Result<(), Box<dyn Error>> {
    let count = data.points.len();
    let (min_y, max_y) = value_range(data);
    let labels: Vec<String> = data.points.iter().map(|p| p.label.clone()).collect();
    let max_x = if count > 1 { count as f64 - 1.0 } else { 1.0 };

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..max_x, min_y..max_y)?;

    chart
        .configure_mesh()
        .x_labels(count.min(20))
        .x_label_formatter(&|x| label_at(&labels, *x))
        .draw()?;

    for (s, name) in data.series.iter().enumerate() {
        let color = series_color(s);
        let points: Vec<(f64, f64)> = data
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.values[s]))
            .collect();

        if filled {
            chart
                .draw_series(
                    AreaSeries::new(points, 0.0, color.mix(0.2)).border_style(color.stroke_width(2)),
                )?
                .label(name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        } else {
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))?
                .label(name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    Ok(())
}

fn draw_pie(
    root: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    slices: &[PieSlice],
    title: &str,
) -> Result<(), Box<dyn Error>> {
    let (width, height) = root.dim_in_pixel();
    root.draw(&Text::new(
        title.to_string(),
        (10, 10),
        ("sans-serif", 30).into_font(),
    ))?;

    let total: f64 = slices.iter().map(|s| s.value.max(0.0)).sum();
    if total <= 0.0 {
        return Ok(());
    }

    let center = ((width / 2) as i32, (height / 2 + 20) as i32);
    let radius = (width.min(height) as f64 / 2.0 - 60.0).max(10.0);
    let mut start = -PI / 2.0;

    for (i, slice) in slices.iter().enumerate() {
        let sweep = slice.value.max(0.0) / total * 2.0 * PI;
        if sweep <= 0.0 {
            continue;
        }

        // Polygon approximation of the arc, one vertex per ~2 degrees
        let steps = ((sweep / (PI / 90.0)).ceil() as usize).max(1);
        let mut outline = vec![center];
        for step in 0..=steps {
            let angle = start + sweep * step as f64 / steps as f64;
            outline.push((
                center.0 + (radius * angle.cos()) as i32,
                center.1 + (radius * angle.sin()) as i32,
            ));
        }
        root.draw(&Polygon::new(outline, series_color(i).filled()))?;

        let middle = start + sweep / 2.0;
        let label_pos = (
            center.0 + ((radius + 20.0) * middle.cos()) as i32 - 20,
            center.1 + ((radius + 20.0) * middle.sin()) as i32,
        );
        let percent = slice.value.max(0.0) / total * 100.0;
        root.draw(&Text::new(
            format!("{} ({:.0}%)", slice.label, percent),
            label_pos,
            ("sans-serif", 14).into_font(),
        ))?;

        start += sweep;
    }

    Ok(())
}

fn label_at(labels: &[String], x: f64) -> String {
    let index = x.round();
    if index < 0.0 || (x - index).abs() > 0.01 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartPoint;

    #[test]
    fn labels_only_on_whole_positions() {
        let labels = vec!["Ann".to_string(), "Bob".to_string()];
        assert_eq!(label_at(&labels, 1.0), "Bob");
        assert_eq!(label_at(&labels, 0.5), "");
        assert_eq!(label_at(&labels, 5.0), "");
    }

    #[test]
    fn oversized_images_are_rejected() {
        assert_eq!(buffer_len(800, 600).unwrap(), 800 * 600 * 3);
        assert!(buffer_len(0, 600).is_err());
        assert!(buffer_len(u32::MAX, u32::MAX).is_err());

        let data = ChartData {
            kind: ChartKind::Bar,
            title: None,
            series: Vec::new(),
            points: Vec::new(),
            slices: Vec::new(),
        };
        let options = GraphOptions {
            width: 100_000,
            height: 100_000,
            ..GraphOptions::default()
        };
        assert!(render_png(&data, &options).is_err());
    }

    #[test]
    fn value_range_includes_zero() {
        let data = ChartData {
            kind: ChartKind::Bar,
            title: None,
            series: vec!["Age".to_string()],
            points: vec![ChartPoint {
                label: "Row 1".to_string(),
                values: vec![30.0],
            }],
            slices: Vec::new(),
        };
        let (min, max) = value_range(&data);
        assert_eq!(min, 0.0);
        assert!(max > 30.0);
    }
}
