//! Shared fixtures for the HTTP tests

use std::path::Path;
use std::sync::Arc;

use arki_server::config::Config;
use arki_server::pipeline::{PageImage, PageSink, PipelineError, Rasterizer};
use arki_server::routes;
use arki_server::state::AppState;
use axum::Router;
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

pub const MAX_UPLOAD_BYTES: u64 = 64 * 1024;

/// Renders every page as a small solid image; page count read with lopdf
pub struct SolidRasterizer;

impl Rasterizer for SolidRasterizer {
    fn rasterize(&self, source: &Path, _dpi: u32, sink: &mut PageSink<'_>) -> Result<usize, PipelineError> {
        let doc = Document::load(source).map_err(|e| PipelineError::Decode(e.to_string()))?;
        let count = doc.get_pages().len();
        for index in 0..count {
            let pixels = RgbImage::from_pixel(17, 22, Rgb([index as u8, 0, 0]));
            sink(PageImage {
                index,
                pixels: DynamicImage::ImageRgb8(pixels),
            })?;
        }
        Ok(count)
    }
}

pub struct TestApp {
    pub root: TempDir,
    pub config: Config,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.upload_dir = root.path().join("uploads");
        config.storage.processed_dir = root.path().join("processed");
        config.storage.scratch_dir = root.path().join("scratch");
        config.storage.max_upload_bytes = MAX_UPLOAD_BYTES;

        let state = AppState::new(config.clone(), Arc::new(SolidRasterizer));
        state.prepare().await.unwrap();

        Self {
            root,
            config,
            router: routes::app(state),
        }
    }

    pub fn uploads(&self) -> Vec<String> {
        entries(&self.config.storage.upload_dir)
    }

    pub fn processed(&self) -> Vec<String> {
        entries(&self.config.storage.processed_dir)
    }

    pub fn scratch(&self) -> Vec<String> {
        entries(&self.config.storage.scratch_dir)
    }
}

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

/// A Letter-sized PDF with one line of text per page
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
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
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
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
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
