/// Font sizes in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub title: f32,
    pub subtitle: f32,
    pub normal: f32,
    pub small: f32,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            title: 16.0,
            subtitle: 14.0,
            normal: 12.0,
            small: 10.0,
        }
    }
}

/// RGB color with 0.0..=1.0 channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }
}

/// Page geometry and typography, all lengths in millimeters
#[derive(Debug, Clone, PartialEq)]
pub struct PdfConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_sizes: FontSizes,
    /// Height reserved above the bottom margin for the footer
    pub footer_height: f32,
    pub max_photo_height: f32,
    /// Minimum free space required before a photo or signature block is placed
    pub min_photo_block: f32,
    pub photo_gap: f32,
    pub logo_width: f32,
    pub text_color: RgbColor,
    pub rule_color: RgbColor,
    pub rule_thickness: f32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 20.0,
            font_sizes: FontSizes::default(),
            footer_height: 20.0,
            max_photo_height: 80.0,
            min_photo_block: 50.0,
            photo_gap: 10.0,
            logo_width: 30.0,
            text_color: RgbColor::from_u8(0x1e, 0x29, 0x3b),
            rule_color: RgbColor::from_u8(0xe2, 0xe8, 0xf0),
            rule_thickness: 0.3,
        }
    }
}

impl PdfConfig {
    pub fn with_margin(margin: f32) -> Self {
        Self {
            margin,
            ..Self::default()
        }
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Lowest y (from the top edge) body text may reach
    pub fn content_bottom(&self) -> f32 {
        self.page_height - self.margin - self.footer_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let config = PdfConfig::default();
        assert_eq!(config.content_width(), 170.0);
        assert_eq!(config.content_bottom(), 257.0);
    }

    #[test]
    fn test_with_margin() {
        let config = PdfConfig::with_margin(10.0);
        assert_eq!(config.content_width(), 190.0);
        assert_eq!(config.font_sizes, FontSizes::default());
    }
}
