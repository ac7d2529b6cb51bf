//! Fixtures shared by the pipeline tests

use std::path::Path;
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::error::PipelineError;
use super::raster::{PageSink, Rasterizer};
use super::types::PageImage;

/// Write a Letter-sized PDF with one line of text per page.
///
/// `MediaBox` and `Resources` live on the page tree node only, so pages
/// depend on inherited attributes.
pub fn write_text_pdf(path: &Path, lines: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for line in lines {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Deterministic in-process rasterizer.
///
/// Reads the page count with lopdf and renders each page as a solid image of
/// `width x height` pixels whose red channel encodes the page count and whose
/// green channel encodes the page index.
pub struct FakeRasterizer {
    pub width: u32,
    pub height: u32,
    /// Fail with a render error on this zero-based page
    pub fail_at: Option<usize>,
    /// Sleep before each page
    pub page_delay: Option<Duration>,
}

impl Default for FakeRasterizer {
    fn default() -> Self {
        Self {
            width: 40,
            height: 50,
            fail_at: None,
            page_delay: None,
        }
    }
}

impl FakeRasterizer {
    pub fn pixel(page_count: usize, index: usize) -> Rgb<u8> {
        Rgb([page_count as u8, index as u8, 7])
    }
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, source: &Path, _dpi: u32, sink: &mut PageSink<'_>) -> Result<usize, PipelineError> {
        let doc = Document::load(source).map_err(|e| PipelineError::Decode(e.to_string()))?;
        let count = doc.get_pages().len();

        for index in 0..count {
            if let Some(delay) = self.page_delay {
                std::thread::sleep(delay);
            }
            if self.fail_at == Some(index) {
                return Err(PipelineError::Render {
                    page: index + 1,
                    detail: "simulated failure".to_string(),
                });
            }
            let pixels = RgbImage::from_pixel(self.width, self.height, Self::pixel(count, index));
            sink(PageImage {
                index,
                pixels: DynamicImage::ImageRgb8(pixels),
            })?;
        }

        Ok(count)
    }
}

/// Names of all entries in `dir`, sorted
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
