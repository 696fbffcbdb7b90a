//! Utility functions for visualization: colors, scaling, locale mapping, label sizing.

use num_format::{Locale, ToFormattedString};
use plotters::prelude::*;

/// Series colors of the dashboard.
pub const POPULATION_COLOR: RGBColor = RGBColor(126, 211, 33); // #7ED321
pub const MALE_COLOR: RGBColor = RGBColor(74, 144, 226); // #4A90E2
pub const FEMALE_COLOR: RGBColor = RGBColor(233, 78, 119); // #E94E77

/// Pick a single Y-axis scale and its human label based on the overall magnitude.
/// Returns (scale, label), e.g. (1e6, "millions").
pub fn choose_axis_scale(max_abs: f64) -> (f64, &'static str) {
    if max_abs >= 1.0e9 {
        (1.0e9, "billions")
    } else if max_abs >= 1.0e6 {
        (1.0e6, "millions")
    } else if max_abs >= 1.0e3 {
        (1.0e3, "thousands")
    } else {
        (1.0, "")
    }
}

/// Map a user-provided locale tag to a `num_format::Locale` and its decimal separator char.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'), // default
    }
}

/// Whole number with locale thousands separators, e.g. `5,379,475`.
pub fn format_count(v: f64, locale: &Locale) -> String {
    if !v.is_finite() {
        return "NA".to_string();
    }
    (v.round() as i64).to_formatted_string(locale)
}

/// Tick label for an already-scaled value: fewer decimals for larger magnitudes.
pub fn format_scaled(v: f64, dec_sep: char) -> String {
    let a = v.abs();
    let prec = if a >= 100.0 {
        0
    } else if a >= 10.0 {
        1
    } else {
        2
    };
    let s = format!("{:.*}", prec, v);
    if dec_sep == '.' { s } else { s.replace('.', &dec_sep.to_string()) }
}

/// Heuristic: estimate pixel width of text (Plotters has no built-in text measuring).
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Compute a tight left label area width for the Y axis (in pixels),
/// based on the formatted tick labels that will appear.
///
/// Returns a width clamped to a sensible range to avoid extremes.
pub fn compute_left_label_area_px(
    ymin_scaled: f64,
    ymax_scaled: f64,
    ticks: usize,
    font_px: u32,
) -> u32 {
    let mut max_px = 0u32;
    for i in 0..=ticks {
        let t = if ticks == 0 {
            0.0
        } else {
            i as f64 / ticks as f64
        };
        let v = ymin_scaled + (ymax_scaled - ymin_scaled) * t;
        max_px = max_px.max(estimate_text_width_px(&format_scaled(v, '.'), font_px));
    }
    // Room for tick marks plus the rotated axis title.
    max_px.saturating_add(34).clamp(56, 140)
}
