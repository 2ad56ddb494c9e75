// Best-effort rendering of the two image artifacts. Nothing here feeds back
// into the numeric results; callers log failures and keep going.

use std::error::Error;
use std::path::Path;

use log::debug;
use plotters::prelude::*;

use district_stats::{CorrelationMatrix, SimpleRegression};

use crate::dms::merge::MergedRow;

/// Scatter of votes against DMS totals, with the fitted line, one text label
/// per district and a small annotation with the fit statistics.
pub fn render_scatter(
    path: &Path,
    rows: &[MergedRow],
    fit: &SimpleRegression,
) -> Result<(), Box<dyn Error>> {
    if rows.is_empty() {
        return Ok(());
    }
    let xs: Vec<f64> = rows.iter().map(|r| r.dms_total as f64).collect();
    let ys: Vec<f64> = rows.iter().map(|r| r.team_mirai_votes as f64).collect();
    let x_min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let y_min = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let x_span = (x_max - x_min).max(1.0);
    let y_span = (y_max - y_min).max(1.0);
    let x_lo = x_min - 0.05 * x_span;
    let x_hi = x_max + 0.10 * x_span;
    let y_lo = y_min - 0.05 * y_span;
    let y_hi = y_max + 0.10 * y_span;

    let root = BitMapBackend::new(path, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Scatter Plot: DMS Count vs Team Mirai Votes",
            ("sans-serif", 28),
        )
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .x_desc("DMS Total Count")
        .y_desc("Team Mirai Votes")
        .draw()?;

    chart.draw_series(
        xs.iter()
            .zip(ys.iter())
            .map(|(x, y)| Circle::new((*x, *y), 6, BLUE.mix(0.6).filled())),
    )?;

    let line = vec![
        (x_min, fit.slope * x_min + fit.intercept),
        (x_max, fit.slope * x_max + fit.intercept),
    ];
    chart
        .draw_series(LineSeries::new(line, RED.stroke_width(2)))?
        .label(format!("y = {:.2}x + {:.2}", fit.slope, fit.intercept))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart.draw_series(rows.iter().map(|r| {
        Text::new(
            r.district.clone(),
            (
                r.dms_total as f64 + 0.01 * x_span,
                r.team_mirai_votes as f64 + 0.01 * y_span,
            ),
            ("sans-serif", 14),
        )
    }))?;

    let annotations = [
        format!("R² = {:.3}", fit.r_squared),
        format!("p-value = {:.4}", fit.p_value),
        format!("Std Error = {:.2}", fit.std_err),
    ];
    chart.draw_series(annotations.iter().enumerate().map(|(i, line)| {
        Text::new(
            line.clone(),
            (x_lo + 0.02 * x_span, y_hi - (0.04 + 0.04 * i as f64) * y_span),
            ("sans-serif", 16),
        )
    }))?;

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    debug!("render_scatter: wrote {:?}", path);
    Ok(())
}

/// Colored cell grid of the correlation matrix, with the coefficient printed
/// in each cell.
pub fn render_heatmap(path: &Path, corr: &CorrelationMatrix) -> Result<(), Box<dyn Error>> {
    let n = corr.len();
    if n == 0 {
        return Ok(());
    }
    let root = BitMapBackend::new(path, (900, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Correlation Matrix", ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(160)
        .build_cartesian_2d(0.0..n as f64, 0.0..n as f64)?;

    let names = corr.names.clone();
    let x_names = names.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&move |v| {
            let idx = v.floor() as usize;
            x_names.get(idx).cloned().unwrap_or_default()
        })
        .y_label_formatter(&move |v| {
            let idx = v.floor() as usize;
            names.get(idx).cloned().unwrap_or_default()
        })
        .draw()?;

    for i in 0..n {
        for j in 0..n {
            let v = corr.get(i, j);
            // Row 0 renders at the top.
            let x0 = j as f64;
            let y0 = (n - 1 - i) as f64;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                cell_color(v).filled(),
            )))?;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                BLACK,
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.3}", v),
                (x0 + 0.35, y0 + 0.5),
                ("sans-serif", 18),
            )))?;
        }
    }
    root.present()?;
    debug!("render_heatmap: wrote {:?}", path);
    Ok(())
}

// White at zero, saturating to red for +1 and blue for -1.
fn cell_color(v: f64) -> RGBColor {
    let t = v.clamp(-1.0, 1.0);
    if t >= 0.0 {
        let u = (255.0 * (1.0 - t)) as u8;
        RGBColor(255, u, u)
    } else {
        let u = (255.0 * (1.0 + t)) as u8;
        RGBColor(u, u, 255)
    }
}
