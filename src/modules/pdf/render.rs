use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageResult, Rgba};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Px,
    Rgb,
};
use thiserror::Error;

use super::config::PdfConfig;
use super::layout::{DocumentLayout, DrawOp, FontWeight};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to load font: {0}")]
    Font(String),

    #[error("Failed to write document: {0}")]
    Write(String),

    #[error("Document has no pages")]
    Empty,
}

const JPEG_QUALITY: u8 = 85;

/// TrueType fonts embedded in place of the builtin Helvetica family
#[derive(Debug, Clone)]
pub struct PdfFonts {
    pub regular: Vec<u8>,
    /// Builtin Helvetica Bold is used for bold text when absent
    pub bold: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FontSource<'a> {
    Builtin(BuiltinFont),
    External(&'a [u8]),
}

fn font_sources(fonts: Option<&PdfFonts>) -> (FontSource<'_>, FontSource<'_>) {
    match fonts {
        Some(fonts) => (
            FontSource::External(&fonts.regular),
            fonts
                .bold
                .as_deref()
                .map_or(FontSource::Builtin(BuiltinFont::HelveticaBold), FontSource::External),
        ),
        None => (
            FontSource::Builtin(BuiltinFont::Helvetica),
            FontSource::Builtin(BuiltinFont::HelveticaBold),
        ),
    }
}

fn add_font(doc: &PdfDocumentReference, source: FontSource<'_>) -> Result<IndirectFontRef, PdfError> {
    let font = match source {
        FontSource::Builtin(builtin) => doc.add_builtin_font(builtin),
        FontSource::External(bytes) => doc.add_external_font(Cursor::new(bytes)),
    };
    font.map_err(|e| PdfError::Font(e.to_string()))
}

/// RGB pixels composited onto white
fn flatten_onto_white(image: &DynamicImage) -> (u32, u32, Vec<u8>) {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);

    for pixel in rgba.pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        for channel in [r, g, b] {
            pixels.push((channel as f32 * alpha + 255.0 * (1.0 - alpha)) as u8);
        }
    }

    (width, height, pixels)
}

fn encode_jpeg(pixels: &[u8], width: u32, height: u32) -> ImageResult<Vec<u8>> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode(
        pixels,
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg)
}

/// Image XObject built once per source image.
///
/// printpdf keeps images as page resources, so every page that draws a raster
/// gets its own copy of `xobject`. Storing it as JPEG keeps that copy small.
struct RasterData {
    width: u32,
    height: u32,
    xobject: ImageXObject,
}

impl RasterData {
    fn from_image(image: &DynamicImage) -> Self {
        let (width, height, pixels) = flatten_onto_white(image);
        let (image_data, image_filter) = match encode_jpeg(&pixels, width, height) {
            Ok(jpeg) => (jpeg, Some(ImageFilter::DCT)),
            Err(e) => {
                tracing::warn!("JPEG encoding failed, embedding raw pixels: {}", e);
                (pixels, None)
            }
        };

        Self {
            width,
            height,
            xobject: ImageXObject {
                width: Px(width as usize),
                height: Px(height as usize),
                color_space: ColorSpace::Rgb,
                bits_per_component: ColorBits::Bit8,
                interpolate: true,
                image_data,
                image_filter,
                clipping_bbox: None,
                smask: None,
            },
        }
    }

    fn to_pdf_image(&self) -> Image {
        Image::from(self.xobject.clone())
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render a paginated layout into PDF bytes.
///
/// `fonts` replaces the builtin Helvetica family with embedded TrueType fonts.
pub fn render_document(
    layout: &DocumentLayout,
    config: &PdfConfig,
    title: &str,
    fonts: Option<&PdfFonts>,
) -> Result<Vec<u8>, PdfError> {
    if layout.pages.is_empty() {
        return Err(PdfError::Empty);
    }

    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        Mm(layout.page_width),
        Mm(layout.page_height),
        "Layer 1",
    );

    let (regular, bold) = font_sources(fonts);
    let fonts = Fonts {
        regular: add_font(&doc, regular)?,
        bold: add_font(&doc, bold)?,
    };

    // Keyed by allocation so a background shared by every page is converted once
    let mut rasters: HashMap<*const DynamicImage, Arc<RasterData>> = HashMap::new();

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_ref, layer_ref) = doc.add_page(
                Mm(layout.page_width),
                Mm(layout.page_height),
                "Layer 1",
            );
            doc.get_page(page_ref).get_layer(layer_ref)
        };

        for op in &page.ops {
            match op {
                DrawOp::Background { image } => {
                    let raster = raster_for(&mut rasters, image);
                    draw_stretched(&layer, &raster, layout.page_width, layout.page_height);
                }
                DrawOp::Text {
                    text,
                    x,
                    y,
                    size,
                    weight,
                } => {
                    let font = match weight {
                        FontWeight::Regular => &fonts.regular,
                        FontWeight::Bold => &fonts.bold,
                    };
                    layer.set_fill_color(to_color(config.text_color));
                    layer.use_text(
                        text.as_str(),
                        *size,
                        Mm(*x),
                        Mm(layout.page_height - *y),
                        font,
                    );
                }
                DrawOp::Rule { x1, x2, y } => {
                    layer.set_outline_color(to_color(config.rule_color));
                    layer.set_outline_thickness(config.rule_thickness);
                    let y = layout.page_height - *y;
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(*x1), Mm(y)), false),
                            (Point::new(Mm(*x2), Mm(y)), false),
                        ],
                        is_closed: false,
                    });
                }
                DrawOp::Image {
                    image,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let raster = raster_for(&mut rasters, image);
                    draw_image(&layer, &raster, *x, layout.page_height - *y - *height, *width, *height);
                }
            }
        }
    }

    doc.save_to_bytes()
        .map_err(|e| PdfError::Write(e.to_string()))
}

fn raster_for(
    cache: &mut HashMap<*const DynamicImage, Arc<RasterData>>,
    image: &Arc<DynamicImage>,
) -> Arc<RasterData> {
    Arc::clone(
        cache
            .entry(Arc::as_ptr(image))
            .or_insert_with(|| Arc::new(RasterData::from_image(image))),
    )
}

fn to_color(color: super::config::RgbColor) -> Color {
    Color::Rgb(Rgb::new(color.r, color.g, color.b, None))
}

/// DPI that makes `pixels` span `mm` millimeters
fn dpi_for(pixels: u32, mm: f32) -> f32 {
    pixels as f32 / (mm / 25.4)
}

fn draw_image(
    layer: &PdfLayerReference,
    raster: &RasterData,
    x: f32,
    bottom: f32,
    width: f32,
    height: f32,
) {
    if raster.width == 0 || raster.height == 0 || width <= 0.0 || height <= 0.0 {
        return;
    }

    let dpi = dpi_for(raster.width, width);
    let natural_height = raster.height as f32 / dpi * 25.4;

    raster.to_pdf_image().add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(bottom)),
            dpi: Some(dpi),
            scale_y: Some(height / natural_height),
            ..Default::default()
        },
    );
}

fn draw_stretched(layer: &PdfLayerReference, raster: &RasterData, width: f32, height: f32) {
    draw_image(layer, raster, 0.0, 0.0, width, height);
}
