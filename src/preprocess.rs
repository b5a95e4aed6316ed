use crate::error::ApiError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;

/// Side length of the square network input.
pub const INPUT_SIZE: u32 = 224;

/// Decodes a base64 image into the `[1, 3, 224, 224]` tensor the classifier
/// expects: RGB, stretched to size, channels first, scaled to `[0, 1]`.
pub fn image_to_tensor(image_base64: &str) -> Result<Array4<f32>, ApiError> {
    let bytes = STANDARD.decode(base64_alphabet_only(image_base64))?;
    let rgb = image::load_from_memory(&bytes)?.to_rgb8();
    Ok(rgb_to_tensor(&rgb))
}

/// Drops bytes outside the standard alphabet, such as line breaks in wrapped
/// payloads. Padding is still checked by the decoder.
fn base64_alphabet_only(input: &str) -> Vec<u8> {
    input
        .bytes()
        .filter(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .collect()
}

fn rgb_to_tensor(rgb: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let side = INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Encodes `image` as PNG and then base64, like the mobile client does.
    pub(crate) fn encode_png(image: DynamicImage) -> String {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageOutputFormat::Png).unwrap();
        STANDARD.encode(bytes.into_inner())
    }

    #[test]
    fn produces_a_unit_range_chw_tensor() {
        let img = RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        let tensor = image_to_tensor(&encode_png(DynamicImage::ImageRgb8(img))).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(tensor.slice(ndarray::s![0, 2, .., ..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn solid_colour_survives_resize_unchanged() {
        let img = RgbImage::from_pixel(31, 97, Rgb([255, 51, 0]));
        let tensor = image_to_tensor(&encode_png(DynamicImage::ImageRgb8(img))).unwrap();

        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 1, 100, 100]], 0.2);
        assert_eq!(tensor[[0, 2, 223, 223]], 0.0);
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 0]));
        let tensor = image_to_tensor(&encode_png(DynamicImage::ImageRgba8(img))).unwrap();

        assert!(tensor.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn malformed_base64_is_a_decode_error() {
        let err = image_to_tensor("not base64 at all!").unwrap_err();
        assert!(matches!(err, ApiError::Base64(_)));
    }

    #[test]
    fn line_wrapped_base64_is_accepted() {
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([255, 0, ((x * 7 + y * 13) % 256) as u8]));
        let flat = encode_png(DynamicImage::ImageRgb8(img));
        let wrapped = flat
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        assert!(wrapped.len() > flat.len());

        let tensor = image_to_tensor(&wrapped).unwrap();
        assert_eq!(tensor[[0, 0, 10, 10]], 1.0);
        assert_eq!(tensor[[0, 1, 10, 10]], 0.0);
    }

    #[test]
    fn characters_outside_the_alphabet_are_ignored() {
        assert_eq!(base64_alphabet_only(" aGVs\nbG8=\t"), b"aGVsbG8=".to_vec());
    }

    #[test]
    fn bytes_that_are_not_an_image_are_rejected() {
        let err = image_to_tensor(&STANDARD.encode(b"plain text, not pixels")).unwrap_err();
        assert!(matches!(err, ApiError::Image(_)));
    }
}
