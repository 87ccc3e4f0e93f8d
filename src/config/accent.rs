use crate::constants::color::DEFAULT_ACCENT;

/// System accent names mapped to translucent border colors
const ACCENT_PALETTE: &[(&str, &str)] = &[
    ("blue", "rgba(53, 132, 228, 0.4)"),
    ("teal", "rgba(51, 209, 122, 0.4)"),
    ("green", "rgba(46, 194, 126, 0.4)"),
    ("yellow", "rgba(248, 228, 92, 0.4)"),
    ("orange", "rgba(255, 120, 0, 0.4)"),
    ("red", "rgba(237, 51, 59, 0.4)"),
    ("pink", "rgba(224, 27, 36, 0.4)"),
    ("purple", "rgba(145, 65, 172, 0.4)"),
    ("slate", "rgba(99, 104, 128, 0.4)"),
];

/// Border color for a system accent name, or the default when unknown/unavailable
pub fn accent_to_rgba(accent: Option<&str>) -> &'static str {
    accent
        .and_then(|name| ACCENT_PALETTE.iter().find(|(n, _)| *n == name))
        .map(|(_, rgba)| *rgba)
        .unwrap_or(DEFAULT_ACCENT)
}
