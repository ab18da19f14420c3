//! NV12 → RGB24 colour conversion.
//!
//! NV12 stores a full-resolution luma plane followed by a half-resolution
//! plane of interleaved `U, V` pairs, `width * height * 3 / 2` bytes in
//! total. Conversion uses BT.601 limited-range coefficients in 20-bit
//! fixed point, so results are deterministic across platforms.

use crate::error::ConvertError;

// BT.601 coefficients scaled by 2^20.
const SHIFT: u32 = 20;
const HALF: i32 = 1 << (SHIFT - 1);
const CY: i32 = 1_220_542;
const CUB: i32 = 2_116_026;
const CUG: i32 = -409_993;
const CVG: i32 = -852_492;
const CVR: i32 = 1_673_527;

// ── RgbImage ─────────────────────────────────────────────────────

/// A tightly-packed RGB24 image, row-major, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbImage {
    /// A `width` x `height` image filled with one colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgb.repeat(pixels),
        }
    }

    /// The 1x1 black image handed out when no frame is available.
    pub fn placeholder() -> Self {
        Self::filled(1, 1, [0, 0, 0])
    }

    /// Returns the `[r, g, b]` bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let at = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[at], self.data[at + 1], self.data[at + 2]]
    }
}

// ── Conversion ───────────────────────────────────────────────────

/// Number of bytes an NV12 frame of the given size occupies.
pub fn nv12_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(3)
        .map(|n| n / 2)
}

#[inline]
fn clamp_shift(v: i32) -> u8 {
    ((v + HALF) >> SHIFT).clamp(0, 255) as u8
}

/// Convert one `Y, U, V` sample triple to RGB.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = (y as i32 - 16).max(0) * CY;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    [
        clamp_shift(y + CVR * v),
        clamp_shift(y + CVG * v + CUG * u),
        clamp_shift(y + CUB * u),
    ]
}

/// Convert an NV12 buffer into a freshly allocated [`RgbImage`].
///
/// Extra bytes past `width * height * 3 / 2` are ignored.
pub fn nv12_to_rgb(nv12: &[u8], width: u32, height: u32) -> Result<RgbImage, ConvertError> {
    if width == 0 || height == 0 {
        return Err(ConvertError::ZeroDimension { width, height });
    }
    if width % 2 != 0 || height % 2 != 0 {
        return Err(ConvertError::OddDimension { width, height });
    }
    let expected = nv12_len(width, height).ok_or(ConvertError::SizeOverflow { width, height })?;
    if nv12.len() < expected {
        return Err(ConvertError::Truncated {
            expected,
            actual: nv12.len(),
        });
    }

    let w = width as usize;
    let h = height as usize;
    let (luma, chroma) = nv12[..expected].split_at(w * h);
    let mut data = vec![0u8; w * h * 3];

    for (row, out_row) in data.chunks_exact_mut(w * 3).enumerate() {
        let y_row = &luma[row * w..(row + 1) * w];
        let uv_row = &chroma[(row / 2) * w..(row / 2 + 1) * w];
        for (x, px) in out_row.chunks_exact_mut(3).enumerate() {
            let uv = (x / 2) * 2;
            px.copy_from_slice(&yuv_to_rgb(y_row[x], uv_row[uv], uv_row[uv + 1]));
        }
    }

    Ok(RgbImage {
        width,
        height,
        data,
    })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_nv12(w: u32, h: u32, y: u8, u: u8, v: u8) -> Vec<u8> {
        let luma = (w * h) as usize;
        let mut buf = vec![y; luma];
        for _ in 0..luma / 4 {
            buf.push(u);
            buf.push(v);
        }
        buf
    }

    #[test]
    fn mid_gray_pattern() {
        let nv12 = solid_nv12(640, 480, 128, 128, 128);
        assert_eq!(nv12.len(), 460_800);
        let img = nv12_to_rgb(&nv12, 640, 480).unwrap();
        assert_eq!((img.width, img.height), (640, 480));
        assert_eq!(img.data.len(), 640 * 480 * 3);
        assert!(img.data.chunks_exact(3).all(|p| p == [130, 130, 130]));
    }

    #[test]
    fn reference_points() {
        assert_eq!(yuv_to_rgb(16, 128, 128), [0, 0, 0]);
        assert_eq!(yuv_to_rgb(235, 128, 128), [255, 255, 255]);
        let red = yuv_to_rgb(81, 90, 240);
        assert!(red[0] > 240 && red[1] < 10 && red[2] < 10, "{red:?}");
    }

    #[test]
    fn chroma_is_shared_by_2x2_blocks() {
        // 4x2 image: left block neutral, right block strongly red.
        let mut nv12 = vec![128u8; 8];
        nv12.extend_from_slice(&[128, 128, 90, 240]);
        let img = nv12_to_rgb(&nv12, 4, 2).unwrap();
        for y in 0..2 {
            assert_eq!(img.pixel(0, y), img.pixel(1, y));
            assert_eq!(img.pixel(2, y), img.pixel(3, y));
        }
        assert_ne!(img.pixel(0, 0), img.pixel(2, 0));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let nv12 = vec![0u8; 10];
        assert_eq!(
            nv12_to_rgb(&nv12, 4, 4),
            Err(ConvertError::Truncated {
                expected: 24,
                actual: 10
            })
        );
        assert!(nv12_to_rgb(&[], 2, 2).is_err());
    }

    #[test]
    fn bad_dimensions_are_rejected() {
        assert!(matches!(
            nv12_to_rgb(&[0; 64], 0, 4),
            Err(ConvertError::ZeroDimension { .. })
        ));
        assert!(matches!(
            nv12_to_rgb(&[0; 64], 4, 0),
            Err(ConvertError::ZeroDimension { .. })
        ));
        assert!(matches!(
            nv12_to_rgb(&[0; 64], 3, 2),
            Err(ConvertError::OddDimension { .. })
        ));
    }

    #[test]
    fn output_does_not_alias_input() {
        let mut nv12 = solid_nv12(2, 2, 128, 128, 128);
        let img = nv12_to_rgb(&nv12, 2, 2).unwrap();
        nv12.fill(0);
        assert_eq!(img.pixel(1, 1), [130, 130, 130]);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut nv12 = solid_nv12(2, 2, 235, 128, 128);
        nv12.extend_from_slice(&[1, 2, 3]);
        let img = nv12_to_rgb(&nv12, 2, 2).unwrap();
        assert_eq!(img.data, vec![255; 12]);
    }

    #[test]
    fn placeholder_is_one_black_pixel() {
        let img = RgbImage::placeholder();
        assert_eq!((img.width, img.height), (1, 1));
        assert_eq!(img.data, vec![0, 0, 0]);
    }
}
