use std::sync::Arc;

use image::DynamicImage;

use super::config::PdfConfig;
use super::text::{line_height, wrap_text};

/// Text weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// A single positioned drawing instruction.
///
/// Coordinates are millimeters measured from the top-left corner of the page.
#[derive(Debug, Clone)]
pub enum DrawOp {
    /// Full-page image drawn beneath everything else
    Background { image: Arc<DynamicImage> },
    /// One line of text; `y` is the baseline
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        weight: FontWeight,
    },
    /// Horizontal rule across the content width
    Rule { x1: f32, x2: f32, y: f32 },
    /// Raster image; `y` is the top edge
    Image {
        image: Arc<DynamicImage>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

/// Fully paginated document ready for rendering
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All text lines in drawing order
    #[cfg(test)]
    pub fn text_lines(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|page| page.ops.iter())
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Scale `(width, height)` down so it fits both bounds, preserving the aspect ratio
pub fn fit_within(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    let (mut w, mut h) = (width, height);
    if w > max_width {
        h = h * max_width / w;
        w = max_width;
    }
    if h > max_height {
        w = w * max_height / h;
        h = max_height;
    }
    (w, h)
}

/// Cursor-based page builder.
///
/// Every page (including the first) starts with the background operation when a
/// background is set, so it always sits beneath page content.
pub struct LayoutBuilder {
    config: PdfConfig,
    background: Option<Arc<DynamicImage>>,
    pages: Vec<PageLayout>,
    cursor: f32,
}

impl LayoutBuilder {
    pub fn new(config: PdfConfig, background: Option<Arc<DynamicImage>>) -> Self {
        let mut builder = Self {
            cursor: config.margin,
            config,
            background,
            pages: Vec::new(),
        };
        builder.new_page();
        builder
    }

    #[cfg(test)]
    pub fn config(&self) -> &PdfConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Start a fresh page with the cursor at the top margin
    pub fn new_page(&mut self) {
        let mut page = PageLayout::default();
        if let Some(background) = &self.background {
            page.ops.push(DrawOp::Background {
                image: Arc::clone(background),
            });
        }
        self.pages.push(page);
        self.cursor = self.config.margin;
    }

    /// Space left above the footer band on the current page
    pub fn remaining(&self) -> f32 {
        self.config.content_bottom() - self.cursor
    }

    /// Break to a new page unless `height` still fits. A page that has nothing
    /// on it yet is never abandoned. Returns true when a break happened.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.remaining() < height && self.cursor > self.config.margin {
            self.new_page();
            return true;
        }
        false
    }

    pub fn advance(&mut self, dy: f32) {
        self.cursor += dy;
    }

    fn push(&mut self, op: DrawOp) {
        // new() always creates the first page
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Word-wrapped text across the content width, one line at a time.
    /// Lines that would cross the content bottom continue on a new page.
    pub fn text(&mut self, text: &str, size: f32, weight: FontWeight) {
        let width = self.config.content_width();
        let lh = line_height(size);

        for line in wrap_text(text, width, size) {
            if self.cursor + lh > self.config.content_bottom() {
                self.new_page();
            }
            self.cursor += lh;
            if line.is_empty() {
                continue;
            }
            let op = DrawOp::Text {
                text: line,
                x: self.config.margin,
                y: self.cursor,
                size,
                weight,
            };
            self.push(op);
        }
    }

    /// Horizontal rule at the cursor
    pub fn rule(&mut self) {
        let op = DrawOp::Rule {
            x1: self.config.margin,
            x2: self.config.page_width - self.config.margin,
            y: self.cursor,
        };
        self.push(op);
    }

    /// Heading, body, then a closing rule
    pub fn section(&mut self, title: &str, body: &str) {
        let sizes = self.config.font_sizes;
        self.text(title, sizes.subtitle, FontWeight::Bold);
        self.advance(2.0);
        self.text(body, sizes.normal, FontWeight::Regular);
        self.advance(5.0);
        self.rule();
        self.advance(3.0);
    }

    /// Place an image at the left margin with its top edge on the cursor
    pub fn image(&mut self, image: Arc<DynamicImage>, width: f32, height: f32) {
        let op = DrawOp::Image {
            image,
            x: self.config.margin,
            y: self.cursor,
            width,
            height,
        };
        self.push(op);
        self.cursor += height;
    }

    /// Stamp the footer on every page and return the finished layout
    pub fn finish(mut self, footer: &str, size: f32) -> DocumentLayout {
        let lh = line_height(size);
        let lines = wrap_text(footer, self.config.content_width(), size);
        let top = self.config.content_bottom();

        for page in &mut self.pages {
            let mut y = top;
            for line in &lines {
                y += lh;
                if line.is_empty() {
                    continue;
                }
                page.ops.push(DrawOp::Text {
                    text: line.clone(),
                    x: self.config.margin,
                    y,
                    size,
                    weight: FontWeight::Regular,
                });
            }
        }

        DocumentLayout {
            page_width: self.config.page_width,
            page_height: self.config.page_height,
            pages: self.pages,
        }
    }
}
