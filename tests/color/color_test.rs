//! Integration tests for color interpolation and number formatting.

use heatgrid::color::{format_number, interpolate, Legend, Rgb};

#[test]
fn test_interpolate_endpoints() {
    assert_eq!(interpolate("#000000", "#ffffff", 0.0, 10.0, 0.0), "#000000");
    assert_eq!(interpolate("#000000", "#ffffff", 0.0, 10.0, 10.0), "#ffffff");
}

#[test]
fn test_interpolate_midpoint_per_channel() {
    // each channel blends independently
    assert_eq!(interpolate("#000000", "#ff0000", 0.0, 10.0, 5.0), "#800000");
    assert_eq!(interpolate("#00ff00", "#0000ff", 0.0, 10.0, 5.0), "#008080");
}

#[test]
fn test_interpolate_is_monotonic_per_channel() {
    let reds: Vec<u8> = (0..=10)
        .map(|v| {
            let hex = interpolate("#000000", "#ff0000", 0.0, 10.0, v as f64);
            Rgb::parse_hex(&hex).unwrap().r
        })
        .collect();
    assert!(reds.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(reds[0], 0);
    assert_eq!(reds[10], 255);
}

#[test]
fn test_interpolate_clamps_out_of_range_values() {
    assert_eq!(interpolate("#000000", "#ffffff", 0.0, 10.0, -5.0), "#000000");
    assert_eq!(interpolate("#000000", "#ffffff", 0.0, 10.0, 99.0), "#ffffff");
}

#[test]
fn test_degenerate_range_yields_max_color() {
    // max == min
    assert_eq!(interpolate("#000000", "#ffffff", 7.0, 7.0, 7.0), "#ffffff");
    // max < min (empty input leaves the range inverted)
    assert_eq!(
        interpolate("#000000", "#ffffff", f64::MAX, f64::MIN, 0.0),
        "#ffffff"
    );
}

#[test]
fn test_bad_hex_falls_back_to_defaults() {
    // defaults are the pale-green / deep-blue gradient endpoints
    assert_eq!(interpolate("nope", "#123", 0.0, 10.0, 0.0), "#f0f9e8");
    assert_eq!(interpolate("#ffffff", "oops", 0.0, 10.0, 10.0), "#084081");
}

#[test]
fn test_shorthand_hex_expands() {
    assert_eq!(interpolate("#000", "#fff", 0.0, 1.0, 1.0), "#ffffff");
}

#[test]
fn test_format_number_magnitudes() {
    assert_eq!(format_number(1_500_000.0), "1.5M");
    assert_eq!(format_number(2_500.0), "2.5K");
    assert_eq!(format_number(42.0), "42");
}

#[test]
fn test_format_number_boundaries() {
    assert_eq!(format_number(999.0), "999");
    assert_eq!(format_number(1_000.0), "1.0K");
    assert_eq!(format_number(999_999.0), "1,000.0K");
    assert_eq!(format_number(1_000_000.0), "1.0M");
}

#[test]
fn test_format_number_negative_and_fractional() {
    assert_eq!(format_number(-1_500.0), "-1.5K");
    assert_eq!(format_number(-42.0), "-42");
    assert_eq!(format_number(0.4), "0");
    assert_eq!(format_number(0.6), "1");
}

#[test]
fn test_legend_normalizes_colors_and_labels() {
    let legend = Legend::new("#ABC", "bogus", 500.0, 2_000_000.0);
    assert_eq!(legend.color_min, "#aabbcc");
    assert_eq!(legend.color_max, "#084081");
    assert_eq!(legend.min_label, "500");
    assert_eq!(legend.max_label, "2.0M");
    assert_eq!(
        legend.gradient_css(),
        "linear-gradient(90deg, #aabbcc, #084081)"
    );
}
