//! Image-only PDF assembly
//!
//! Builds a document with one page per intermediate image. Each page holds a
//! single full-bleed RGB image XObject, Flate-compressed, and is sized so the
//! image maps back to the source page at the rasterization DPI.

use std::io::Write;
use std::path::PathBuf;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::error::PipelineError;

/// Resource name of the page image inside each page
const IMAGE_NAME: &str = "Im0";

/// Convert a pixel length to PDF points at `dpi`
pub fn points(pixels: u32, dpi: u32) -> f32 {
    pixels as f32 * 72.0 / dpi as f32
}

/// Write a PDF built from `pages` (already in page order) to `out`.
///
/// Images are decoded one at a time; only their compressed streams stay in
/// memory until the document is written. Returns the page count.
pub fn write_image_pdf<W: Write>(pages: &[PathBuf], dpi: u32, out: &mut W) -> Result<usize, PipelineError> {
    if pages.is_empty() {
        return Err(PipelineError::NoPages);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for path in pages {
        let image = image::open(path)
            .map_err(|e| PipelineError::Image(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        let (width, height) = image.dimensions();

        let image_id = add_image(&mut doc, width, height, image.into_raw())?;
        let page_id = add_page(&mut doc, pages_id, image_id, points(width, dpi), points(height, dpi))?;
        kids.push(page_id.into());
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save_to(out)
        .map_err(|e| PipelineError::Assemble(e.to_string()))?;

    Ok(count)
}

fn add_image(doc: &mut Document, width: u32, height: u32, rgb: Vec<u8>) -> Result<ObjectId, PipelineError> {
    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    );
    stream
        .compress()
        .map_err(|e| PipelineError::Assemble(e.to_string()))?;

    Ok(doc.add_object(stream))
}

fn add_page(
    doc: &mut Document,
    parent: ObjectId,
    image_id: ObjectId,
    width_pt: f32,
    height_pt: f32,
) -> Result<ObjectId, PipelineError> {
    // q  w 0 0 h 0 0 cm  /Im0 Do  Q
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0.into(),
                    0.into(),
                    height_pt.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![IMAGE_NAME.into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| PipelineError::Assemble(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    }))
}
