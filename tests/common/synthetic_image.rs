/// Horizontal bright-on-dark edge: rows above `edge_row` dark, the edge
/// row itself mid-gray, rows below bright. The mid-gray row puts the
/// gradient peak exactly on `edge_row`.
pub fn horizontal_edge_u8(width: usize, height: usize, edge_row: usize) -> Vec<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(edge_row < height, "edge row must lie inside the image");

    let mut img = vec![30u8; width * height];
    for y in edge_row..height {
        let val = if y == edge_row { 125u8 } else { 220u8 };
        for x in 0..width {
            img[y * width + x] = val;
        }
    }
    img
}

/// Paint a uniform square patch over the buffer (occlusion).
pub fn occlude(img: &mut [u8], width: usize, x0: usize, y0: usize, size: usize, value: u8) {
    let height = img.len() / width;
    for y in y0..(y0 + size).min(height) {
        for x in x0..(x0 + size).min(width) {
            img[y * width + x] = value;
        }
    }
}
