//! Colour helpers shared by the block codecs.

/// Expand RGB565 to RGB888, replicating high bits into the low ones.
pub(crate) fn rgb565_to_rgb888(color: u16) -> [u8; 3] {
    let r5 = (color >> 11) & 0x1F;
    let g6 = (color >> 5) & 0x3F;
    let b5 = color & 0x1F;
    [
        ((r5 << 3) | (r5 >> 2)) as u8,
        ((g6 << 2) | (g6 >> 4)) as u8,
        ((b5 << 3) | (b5 >> 2)) as u8,
    ]
}

fn mix(a: u8, b: u8, wa: u16, wb: u16) -> u8 {
    ((a as u16 * wa + b as u16 * wb) / (wa + wb)) as u8
}

/// The four RGBA colours a BC1 colour block indexes into.
///
/// With `c0 <= c1` and `punch_through` set (BC1 only) the block is in
/// three-colour mode: index 2 is the midpoint and index 3 transparent black.
pub(crate) fn color_palette(c0: u16, c1: u16, punch_through: bool) -> [[u8; 4]; 4] {
    let [r0, g0, b0] = rgb565_to_rgb888(c0);
    let [r1, g1, b1] = rgb565_to_rgb888(c1);

    if c0 <= c1 && punch_through {
        [
            [r0, g0, b0, 255],
            [r1, g1, b1, 255],
            [mix(r0, r1, 1, 1), mix(g0, g1, 1, 1), mix(b0, b1, 1, 1), 255],
            [0, 0, 0, 0],
        ]
    } else {
        [
            [r0, g0, b0, 255],
            [r1, g1, b1, 255],
            [mix(r0, r1, 2, 1), mix(g0, g1, 2, 1), mix(b0, b1, 2, 1), 255],
            [mix(r0, r1, 1, 2), mix(g0, g1, 1, 2), mix(b0, b1, 1, 2), 255],
        ]
    }
}

/// The eight alpha values a BC3 alpha block indexes into.
pub(crate) fn alpha_palette(a0: u8, a1: u8) -> [u8; 8] {
    let (a0w, a1w) = (a0 as u16, a1 as u16);
    if a0 > a1 {
        [
            a0,
            a1,
            ((6 * a0w + a1w) / 7) as u8,
            ((5 * a0w + 2 * a1w) / 7) as u8,
            ((4 * a0w + 3 * a1w) / 7) as u8,
            ((3 * a0w + 4 * a1w) / 7) as u8,
            ((2 * a0w + 5 * a1w) / 7) as u8,
            ((a0w + 6 * a1w) / 7) as u8,
        ]
    } else {
        [
            a0,
            a1,
            ((4 * a0w + a1w) / 5) as u8,
            ((3 * a0w + 2 * a1w) / 5) as u8,
            ((2 * a0w + 3 * a1w) / 5) as u8,
            ((a0w + 4 * a1w) / 5) as u8,
            0,
            255,
        ]
    }
}
