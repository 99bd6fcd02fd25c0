//! Photo renditions and EXIF presentation.

use serde::{Deserialize, Serialize};

/// How a rendition fits the source image into its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Crop to fill the box exactly.
    Fill,
    /// Scale down to fit inside the box.
    Fit,
}

/// A derived JPEG rendition of a photo. Never persisted; computed from the
/// source image reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rendition {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub fit: FitMode,
    pub quality: u8,
}

pub const SQUARE_THUMBNAIL: Rendition = Rendition {
    name: "square",
    width: 400,
    height: 400,
    fit: FitMode::Fill,
    quality: 80,
};

pub const LARGE_IMAGE: Rendition = Rendition {
    name: "large",
    width: 1200,
    height: 800,
    fit: FitMode::Fit,
    quality: 90,
};

impl Rendition {
    /// Path of this rendition for a stored image, e.g.
    /// `photos/2024/a.jpg` → `renditions/square/photos/2024/a.jpg`.
    pub fn path_for(&self, image: &str) -> String {
        let source = image.trim_start_matches('/');
        let stem = source.rsplit_once('.').map_or(source, |(stem, _)| stem);
        format!("renditions/{}/{stem}.jpg", self.name)
    }
}

/// Camera settings extracted from EXIF. Empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifFields {
    pub camera: String,
    pub lens: String,
    pub focal_length: String,
    pub aperture: String,
    pub shutter_speed: String,
    pub iso: String,
}

impl ExifFields {
    /// One-line summary such as `Sony A7R IV | 24-70mm | f/8 | 1/250s | ISO 100`.
    pub fn display_line(&self) -> String {
        let parts: Vec<String> = [
            (self.camera.as_str(), "", ""),
            (self.lens.as_str(), "", ""),
            (self.focal_length.as_str(), "", ""),
            (self.aperture.as_str(), "f/", ""),
            (self.shutter_speed.as_str(), "", "s"),
            (self.iso.as_str(), "ISO ", ""),
        ]
        .into_iter()
        .filter(|(value, _, _)| !value.trim().is_empty())
        .map(|(value, prefix, suffix)| format!("{prefix}{}{suffix}", value.trim()))
        .collect();

        if parts.is_empty() {
            "No EXIF data".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_line_formats_present_fields() {
        let exif = ExifFields {
            camera: "Fujifilm X-T4".into(),
            lens: String::new(),
            focal_length: "35mm".into(),
            aperture: "2.8".into(),
            shutter_speed: "1/500".into(),
            iso: "160".into(),
        };
        assert_eq!(
            exif.display_line(),
            "Fujifilm X-T4 | 35mm | f/2.8 | 1/500s | ISO 160"
        );
    }

    #[test]
    fn display_line_reports_missing_exif() {
        assert_eq!(ExifFields::default().display_line(), "No EXIF data");
    }

    #[test]
    fn rendition_paths_are_jpeg() {
        assert_eq!(
            SQUARE_THUMBNAIL.path_for("photos/2024/05/lake.png"),
            "renditions/square/photos/2024/05/lake.jpg"
        );
        assert_eq!(LARGE_IMAGE.path_for("/raw"), "renditions/large/raw.jpg");
    }
}
