//! Channel composition: stretched bands in, three 8-bit channels out.

/// An RGB tile with its validity mask, ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTile {
    pub width: u32,
    pub height: u32,
    /// Red, green and blue planes, row-major
    pub channels: [Vec<u8>; 3],
    /// Non-zero where the pixel holds data
    pub mask: Vec<u8>,
}

/// Build RGB from stretched bands.
///
/// One band is repeated into all channels, two bands become
/// `(b0, b1, b1)`, and only the first three of longer lists are used.
/// An empty band list yields black.
pub fn compose(width: u32, height: u32, bands: Vec<Vec<u8>>, mask: Vec<u8>) -> RenderedTile {
    let mut bands = bands.into_iter();
    let size = width as usize * height as usize;

    let first = bands.next().unwrap_or_else(|| vec![0; size]);
    let channels = match (bands.next(), bands.next()) {
        (None, _) => [first.clone(), first.clone(), first],
        (Some(second), None) => [first, second.clone(), second],
        (Some(second), Some(third)) => [first, second, third],
    };

    RenderedTile {
        width,
        height,
        channels,
        mask,
    }
}
