use crate::{
    refs::{ObjectReferences, RefType},
    PDFError, Pt,
};
use id_arena::Id;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use miniz_oxide::deflate::{compress_to_vec_zlib, CompressionLevel};
use pdf_writer::{Filter, Finish, Pdf};
use std::path::Path;

/// How the pixel data will end up in the PDF
enum Raster {
    /// RGB JPEG data that PDF readers can decode themselves
    Jpeg(Vec<u8>),
    Decoded(DynamicImage),
}

/// A raster image, stored once per document and drawn by any number of
/// [ImageFlowable](crate::ImageFlowable)s
pub struct Image {
    raster: Raster,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

pub type ImageId = Id<Image>;

struct EncodeOutput {
    filter: Filter,
    bytes: Vec<u8>,
    mask: Option<Vec<u8>>,
}

impl Image {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Image, PDFError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let is_tga = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("tga"))
            .unwrap_or(false);
        let format = if is_tga {
            ImageFormat::Tga
        } else {
            image::guess_format(&data)?
        };
        Image::decode(data, format)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Image, PDFError> {
        let format = image::guess_format(&data)?;
        Image::decode(data, format)
    }

    fn decode(data: Vec<u8>, format: ImageFormat) -> Result<Image, PDFError> {
        let image = image::load_from_memory_with_format(&data, format)?;
        match (format, image.color()) {
            (ImageFormat::Jpeg, ColorType::Rgb8) => Ok(Image {
                width: image.width(),
                height: image.height(),
                raster: Raster::Jpeg(data),
            }),
            _ => Ok(Image::new_raster(image)),
        }
    }

    pub fn new_raster(image: DynamicImage) -> Image {
        Image {
            width: image.width(),
            height: image.height(),
            raster: Raster::Decoded(image),
        }
    }

    /// The size the image occupies when drawn at the given resolution
    pub fn natural_size(&self, dpi: f32) -> (Pt, Pt) {
        let scale = 72.0 / dpi;
        (
            Pt(self.width as f32 * scale),
            Pt(self.height as f32 * scale),
        )
    }

    fn encode(&self) -> EncodeOutput {
        match &self.raster {
            Raster::Jpeg(bytes) => EncodeOutput {
                filter: Filter::DctDecode,
                bytes: bytes.clone(),
                mask: None,
            },
            Raster::Decoded(image) => {
                let level = CompressionLevel::DefaultLevel as u8;

                let mask = image.color().has_alpha().then(|| {
                    let alphas: Vec<u8> = image.pixels().map(|(_, _, p)| p.0[3]).collect();
                    compress_to_vec_zlib(&alphas, level)
                });

                EncodeOutput {
                    filter: Filter::FlateDecode,
                    bytes: compress_to_vec_zlib(image.to_rgb8().as_raw(), level),
                    mask,
                }
            }
        }
    }

    pub(crate) fn write(&self, refs: &mut ObjectReferences, image_index: usize, writer: &mut Pdf) {
        let id = refs.gen(RefType::Image(image_index));
        let encoded = self.encode();

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

        if let (Some(mask_id), Some(mask)) = (mask_id, encoded.mask) {
            let mut s_mask = writer.image_xobject(mask_id, mask.as_slice());
            s_mask.filter(Filter::FlateDecode);
            s_mask.width(self.width as i32);
            s_mask.height(self.height as i32);
            s_mask.color_space().device_gray();
            s_mask.bits_per_component(8);
        }
    }
}
