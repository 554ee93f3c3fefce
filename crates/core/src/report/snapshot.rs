//! Decoding of the visualizer snapshot embedded in reports.

use png::{ColorType, Decoder, Transformations};

use super::report_errors::RenderError;

/// An 8-bit RGB raster, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::UnreadableSnapshot(
                "image has zero size".to_string(),
            ));
        }
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(RenderError::UnreadableSnapshot(format!(
                "expected {} bytes of RGB data, found {}",
                expected,
                rgb.len()
            )));
        }
        Ok(Self { width, height, rgb })
    }

    /// Decodes a PNG. Alpha is composited over white.
    pub fn from_png(bytes: &[u8]) -> Result<Self, RenderError> {
        let mut decoder = Decoder::new(bytes);
        decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| RenderError::UnreadableSnapshot(e.to_string()))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| RenderError::UnreadableSnapshot(e.to_string()))?;
        buf.truncate(info.buffer_size());

        let rgb = match info.color_type {
            ColorType::Rgb => buf,
            ColorType::Rgba => buf
                .chunks_exact(4)
                .flat_map(|px| {
                    let a = px[3];
                    [over_white(px[0], a), over_white(px[1], a), over_white(px[2], a)]
                })
                .collect(),
            ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g]).collect(),
            ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|px| {
                    let g = over_white(px[0], px[1]);
                    [g, g, g]
                })
                .collect(),
            ColorType::Indexed => {
                return Err(RenderError::UnreadableSnapshot(
                    "palette image was not expanded".to_string(),
                ))
            }
        };

        Self::new(info.width, info.height, rgb)
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, color: ColorType, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_rgb_png() {
        let data = [255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 20, 30];
        let png = encode_png(2, 2, ColorType::Rgb, &data);
        let image = RasterImage::from_png(&png).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        assert_eq!(image.rgb, data.to_vec());
    }

    #[test]
    fn test_alpha_is_composited_over_white() {
        let png = encode_png(1, 1, ColorType::Rgba, &[0, 0, 0, 0]);
        let image = RasterImage::from_png(&png).unwrap();
        assert_eq!(image.rgb, vec![255, 255, 255]);

        let png = encode_png(1, 1, ColorType::Rgba, &[0, 0, 0, 255]);
        assert_eq!(RasterImage::from_png(&png).unwrap().rgb, vec![0, 0, 0]);
    }

    #[test]
    fn test_grayscale_expands() {
        let png = encode_png(2, 1, ColorType::Grayscale, &[0, 200]);
        let image = RasterImage::from_png(&png).unwrap();
        assert_eq!(image.rgb, vec![0, 0, 0, 200, 200, 200]);
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let err = RasterImage::from_png(b"definitely not a png").unwrap_err();
        assert!(matches!(err, RenderError::UnreadableSnapshot(_)));
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        assert!(RasterImage::new(2, 2, vec![0; 5]).is_err());
        assert!(RasterImage::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_aspect_ratio() {
        let image = RasterImage::new(4, 2, vec![0; 24]).unwrap();
        assert_eq!(image.aspect_ratio(), 0.5);
    }
}
