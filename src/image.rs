use crate::refs::{ObjectReferences, RefType};
use crate::{CertificateError, Result};
use base64::Engine;
use image::{ColorType, DynamicImage, GenericImageView};
use miniz_oxide::deflate::{compress_to_vec_zlib, CompressionLevel};
use pdf_writer::{Filter, Finish, Pdf, Ref};
use std::collections::HashMap;
use usvg::Tree;

pub enum RasterImageType {
    /// Baseline RGB JPEG data, embedded as-is with the DCT filter
    DirectlyEmbeddableJpeg(Vec<u8>),
    Image(DynamicImage),
}

pub enum ImageType {
    Raster(RasterImageType),
    SVG(Box<Tree>),
}

/// An image that can be placed on pages: logos, signatures, and inspection photos.
///
/// `width` and `height` are the intrinsic size of the image in pixels (for SVGs, in
/// user units), used to preserve aspect ratio when scaling onto the page.
pub struct Image {
    pub image: ImageType,
    pub width: f32,
    pub height: f32,
}

struct EncodeOutput {
    filter: Filter,
    bytes: Vec<u8>,
    mask: Option<Vec<u8>>,
}

impl Image {
    /// Decode an image from raw file bytes, sniffing whether it's an SVG or a raster format
    pub fn from_bytes(data: &[u8]) -> Result<Image> {
        if looks_like_svg(data) {
            Self::new_svg(data)
        } else {
            Self::new_raster_from_bytes(data)
        }
    }

    /// Decode an image from a `data:image/...;base64,...` URI, as produced by signature
    /// pads and logo uploads
    pub fn from_data_uri(uri: &str) -> Result<Image> {
        let bytes = decode_data_uri(uri)?;
        Self::from_bytes(&bytes)
    }

    pub fn new_svg(data: &[u8]) -> Result<Image> {
        let opts = usvg::Options::default();
        let tree = Tree::from_data(data, &opts)?;
        let size = tree.size();
        let width = size.width();
        let height = size.height();

        Ok(Image {
            image: ImageType::SVG(Box::new(tree)),
            width,
            height,
        })
    }

    pub fn new_raster_from_bytes(data: &[u8]) -> Result<Image> {
        let format = image::guess_format(data)?;
        let image = image::load_from_memory_with_format(data, format)?;

        match (format, image.color()) {
            (image::ImageFormat::Jpeg, ColorType::Rgb8) => {
                // we can embed it directly!
                let width = image.width() as f32;
                let height = image.height() as f32;

                Ok(Image {
                    image: ImageType::Raster(RasterImageType::DirectlyEmbeddableJpeg(
                        data.to_vec(),
                    )),
                    width,
                    height,
                })
            }
            _ => Ok(Self::new_raster(image)),
        }
    }

    pub fn new_raster(image: DynamicImage) -> Image {
        let width = image.width() as f32;
        let height = image.height() as f32;
        Image {
            image: ImageType::Raster(RasterImageType::Image(image)),
            width,
            height,
        }
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    fn encode_raster(raster: &RasterImageType) -> EncodeOutput {
        match raster {
            RasterImageType::DirectlyEmbeddableJpeg(bytes) => EncodeOutput {
                filter: Filter::DctDecode,
                bytes: bytes.clone(),
                mask: None,
            },
            RasterImageType::Image(image) => {
                let level = CompressionLevel::DefaultLevel as u8;

                let mask = image.color().has_alpha().then(|| {
                    let alphas: Vec<_> = image.pixels().map(|p| (p.2).0[3]).collect();
                    compress_to_vec_zlib(&alphas, level)
                });

                let bytes = compress_to_vec_zlib(image.to_rgb8().as_raw(), level);

                EncodeOutput {
                    filter: Filter::FlateDecode,
                    bytes,
                    mask,
                }
            }
        }
    }

    pub(crate) fn write(
        &self,
        refs: &mut ObjectReferences,
        image_index: usize,
        writer: &mut Pdf,
    ) -> Result<()> {
        match &self.image {
            ImageType::Raster(raster) => {
                let id = refs.gen(RefType::Image(image_index));
                let encoded = Self::encode_raster(raster);

                let mask_id = encoded
                    .mask
                    .as_ref()
                    .map(|_| refs.gen(RefType::ImageMask(image_index)));

                let mut image = writer.image_xobject(id, encoded.bytes.as_slice());
                image.filter(encoded.filter);
                image.width(self.width as i32);
                image.height(self.height as i32);
                image.color_space().device_rgb();
                image.bits_per_component(8);
                if let Some(mask_id) = mask_id {
                    image.s_mask(mask_id);
                }
                image.finish();

                // add a transparency mask if we have one
                if let (Some(mask_id), Some(mask)) = (mask_id, encoded.mask.as_ref()) {
                    let mut s_mask = writer.image_xobject(mask_id, mask.as_slice());
                    s_mask.filter(Filter::FlateDecode);
                    s_mask.width(self.width as i32);
                    s_mask.height(self.height as i32);
                    s_mask.color_space().device_gray();
                    s_mask.bits_per_component(8);
                }
            }
            ImageType::SVG(tree) => {
                // the converted chunk holds a single 1x1 xobject plus its dependencies,
                // numbered from 1; move it into our id space
                let (chunk, svg_ref) =
                    svg2pdf::to_chunk(tree, svg2pdf::ConversionOptions::default())
                        .map_err(|e| CertificateError::SvgConversion(e.to_string()))?;

                let mut renumbered: HashMap<Ref, Ref> = HashMap::new();
                let chunk =
                    chunk.renumber(|old| *renumbered.entry(old).or_insert_with(|| refs.bump()));
                let Some(&xobject) = renumbered.get(&svg_ref) else {
                    return Err(CertificateError::SvgConversion(
                        "converted SVG has no root xobject".to_string(),
                    ));
                };
                writer.extend(&chunk);
                refs.alias(RefType::Image(image_index), xobject);
            }
        }

        Ok(())
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// Decode the payload of a base64 `data:` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let uri = uri.trim();
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CertificateError::DataUri("missing `data:` prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CertificateError::DataUri("missing `,` separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(CertificateError::DataUri(format!(
            "unsupported encoding in `{header}`"
        )));
    }
    if payload.is_empty() {
        return Err(CertificateError::DataUri("empty payload".to_string()));
    }
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

/// Whether `uri` looks like an embeddable image payload (`data:image/...;base64,...`)
pub fn is_image_data_uri(uri: &str) -> bool {
    let uri = uri.trim();
    uri.starts_with("data:image/") && uri.contains(";base64,") && !uri.ends_with(',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).expect("can encode png");
        out.into_inner()
    }

    #[test]
    fn decodes_png_data_uri() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(4, 2));
        let image = Image::from_data_uri(&format!("data:image/png;base64,{encoded}"))
            .expect("can decode");
        assert_eq!(image.width, 4.0);
        assert_eq!(image.height, 2.0);
        assert_eq!(image.aspect_ratio(), 2.0);
    }

    #[test]
    fn rejects_malformed_data_uris() {
        assert!(decode_data_uri("image/png;base64,AAAA").is_err());
        assert!(decode_data_uri("data:image/png;base64,").is_err());
        assert!(decode_data_uri("data:image/png,AAAA").is_err());
        assert!(decode_data_uri("data:image/png;base64,!!!").is_err());
        assert!(!is_image_data_uri("data:image/png;base64,"));
        assert!(!is_image_data_uri("https://example.com/sig.png"));
        assert!(is_image_data_uri("data:image/png;base64,iVBORw0KGgo="));
    }

    #[test]
    fn parses_svg_logos() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="red"/></svg>"#;
        let image = Image::from_bytes(svg).expect("can parse svg");
        assert!(matches!(image.image, ImageType::SVG(_)));
        assert_eq!(image.width, 40.0);
        assert_eq!(image.height, 20.0);
    }
}
