//! Visualization utilities: render detail-view charts to **SVG** or **PNG**.
//!
//! - Population over time on the left axis (auto-scaled), male/female share on a
//!   secondary 0–100 % axis
//! - Age distribution as one bar per single year of age
//! - Locale-aware tick labels (`30,000` vs `30.000`)
//! - Backend picked from the file extension (`.svg` → SVG, anything else → PNG)

pub mod util;

use crate::models::{AgeBucket, YearlySummary};
use anyhow::{Result, anyhow};

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;

use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use std::path::Path;
use std::sync::Once;

use util::{
    FEMALE_COLOR, MALE_COLOR, POPULATION_COLOR, choose_axis_scale, compute_left_label_area_px,
    format_count, format_scaled, map_locale,
};

/// One-time registration for a fallback "sans-serif" font when using the `ab_glyph` text path.
/// Required because `ab_glyph` doesn't discover OS fonts.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// Line chart of a country's population and sex shares over time.
///
/// `series` must be ascending by year, as produced by `summarize::summarize_series`.
pub fn plot_series<P: AsRef<Path>>(
    series: &[YearlySummary],
    out_path: P,
    width: u32,
    height: u32,
    locale_tag: &str,
) -> Result<()> {
    if series.is_empty() {
        return Err(anyhow!("no data to plot"));
    }
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();

    if is_svg(out_path) {
        let root = SVGBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_series_chart(root, series, locale_tag)
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_series_chart(root, series, locale_tag)
    }
}

/// Bar chart of population by single year of age.
pub fn plot_age_distribution<P: AsRef<Path>>(
    buckets: &[AgeBucket],
    title: &str,
    out_path: P,
    width: u32,
    height: u32,
    locale_tag: &str,
) -> Result<()> {
    if buckets.is_empty() {
        return Err(anyhow!("no data to plot"));
    }
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();

    if is_svg(out_path) {
        let root = SVGBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_age_chart(root, buckets, title, locale_tag)
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (width, height)).into_drawing_area();
        draw_age_chart(root, buckets, title, locale_tag)
    }
}

fn axis_title(scale_word: &str) -> String {
    if scale_word.is_empty() {
        "Population".to_string()
    } else {
        format!("Population ({scale_word})")
    }
}

fn draw_series_chart<DB>(
    root: DrawingArea<DB, Shift>,
    series: &[YearlySummary],
    locale_tag: &str,
) -> Result<()>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let (mut min_year, mut max_year) = series
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), s| (lo.min(s.year), hi.max(s.year)));
    let caption = match series.last() {
        Some(last) if min_year != max_year => {
            format!("{}: population {}–{}", last.country, min_year, max_year)
        }
        Some(last) => format!("{}: population {}", last.country, last.year),
        None => "Population".to_string(),
    };
    if min_year == max_year {
        min_year -= 1;
        max_year += 1;
    }

    let max_pop = series
        .iter()
        .map(|s| s.population)
        .filter(|p| p.is_finite())
        .fold(0.0, f64::max);
    let (yscale, scale_word) = choose_axis_scale(max_pop);
    let ymax = if max_pop > 0.0 { max_pop / yscale * 1.05 } else { 1.0 };
    let (_num_locale, dec_sep) = map_locale(locale_tag);

    let y_label_count = 10usize;
    let left_px = compute_left_label_area_px(0.0, ymax, y_label_count, 12);

    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .caption(caption, (FontFamily::SansSerif, 22))
        .set_label_area_size(LabelAreaPosition::Left, left_px)
        .set_label_area_size(LabelAreaPosition::Right, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 48)
        .build_cartesian_2d(min_year..max_year, 0f64..ymax)
        .map_err(|e| anyhow!("{:?}", e))?
        .set_secondary_coord(min_year..max_year, 0f64..100f64);

    let x_label_fmt = |y: &i32| y.to_string();
    let y_label_fmt = |v: &f64| format_scaled(*v, dec_sep);
    let pct_label_fmt = |v: &f64| format!("{:.0}%", v);
    let x_label_count = ((max_year - min_year + 1) as usize).min(12);

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc(axis_title(scale_word))
        .x_labels(x_label_count)
        .y_labels(y_label_count)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style((FontFamily::SansSerif, 12))
        .axis_desc_style((FontFamily::SansSerif, 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    chart
        .configure_secondary_axes()
        .y_desc("Share of population (%)")
        .y_labels(6)
        .y_label_formatter(&pct_label_fmt)
        .label_style((FontFamily::SansSerif, 12))
        .axis_desc_style((FontFamily::SansSerif, 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    let pop_style = POPULATION_COLOR.stroke_width(2);
    chart
        .draw_series(LineSeries::new(
            series.iter().map(|s| (s.year, s.population / yscale)),
            pop_style,
        ))
        .map_err(|e| anyhow!("{:?}", e))?
        .label("Total population")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], pop_style));

    for (label, color, pick) in [
        ("Male %", MALE_COLOR, (|s: &YearlySummary| s.male) as fn(&YearlySummary) -> f64),
        ("Female %", FEMALE_COLOR, |s: &YearlySummary| s.female),
    ] {
        let style = color.stroke_width(2);
        chart
            .draw_secondary_series(LineSeries::new(
                series.iter().map(|s| (s.year, pick(s))),
                style,
            ))
            .map_err(|e| anyhow!("{:?}", e))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .position(SeriesLabelPosition::LowerLeft)
        .background_style(WHITE.mix(0.85))
        .label_font((FontFamily::SansSerif, 13))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}

fn draw_age_chart<DB>(
    root: DrawingArea<DB, Shift>,
    buckets: &[AgeBucket],
    title: &str,
    locale_tag: &str,
) -> Result<()>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    let max_pop = buckets
        .iter()
        .map(|b| b.population)
        .filter(|p| p.is_finite())
        .fold(0.0, f64::max);
    let (yscale, scale_word) = choose_axis_scale(max_pop);
    let ymax = if max_pop > 0.0 { max_pop / yscale * 1.05 } else { 1.0 };
    let (num_locale, dec_sep) = map_locale(locale_tag);

    let y_label_count = 8usize;
    let left_px = compute_left_label_area_px(0.0, ymax, y_label_count, 12);
    let caption = if title.trim().is_empty() {
        let total: f64 = buckets.iter().map(|b| b.population).sum();
        format!("Age distribution (total {})", format_count(total, num_locale))
    } else {
        title.trim().to_string()
    };

    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .caption(caption, (FontFamily::SansSerif, 22))
        .set_label_area_size(LabelAreaPosition::Left, left_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 48)
        .build_cartesian_2d(-0.5f64..100.5f64, 0f64..ymax)
        .map_err(|e| anyhow!("{:?}", e))?;

    let x_label_fmt = |x: &f64| format!("{}", x.round() as i32);
    let y_label_fmt = |v: &f64| format_scaled(*v, dec_sep);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Age")
        .y_desc(axis_title(scale_word))
        .x_labels(11)
        .y_labels(y_label_count)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style((FontFamily::SansSerif, 12))
        .axis_desc_style((FontFamily::SansSerif, 14))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    let fill = POPULATION_COLOR.filled();
    chart
        .draw_series(buckets.iter().map(|b| {
            let x = b.age as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, b.population / yscale)], fill)
        }))
        .map_err(|e| anyhow!("{:?}", e))?;

    root.present().map_err(|e| anyhow!("{:?}", e))?;
    Ok(())
}
