/// Vehicle paint from a spawn index using golden angle hue distribution,
/// so consecutive spawns get clearly different colors.
pub fn color_from_index(index: u64) -> u32 {
    let hue = (index.wrapping_mul(137) % 360) as f64;
    hsv_to_rgb(hue, 0.7, 0.95)
}

/// Format a 24-bit color as `#rrggbb`.
pub fn color_hex(color: u32) -> String {
    format!("#{:06x}", color & 0xFF_FFFF)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> u32 {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let ri = ((r + m) * 255.0).round() as u32;
    let gi = ((g + m) * 255.0).round() as u32;
    let bi = ((b + m) * 255.0).round() as u32;

    (ri << 16) | (gi << 8) | bi
}
