use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" => Some(Self::Image),
            "mp4" | "webm" | "mov" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Pixel dimensions of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width after rescaling to `row_height`, rounded and never below 1.
    pub fn scaled_width(&self, row_height: u32) -> u32 {
        if self.height == 0 {
            return 1;
        }
        let scaled = (row_height as f64 * self.width as f64 / self.height as f64).round();
        (scaled as u32).max(1)
    }
}

/// One listed media file, as handed to the packer and serialized to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    pub id: u32,
    pub src: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
    pub scaled_width: u32,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

impl MediaDescriptor {
    /// Builds a descriptor, substituting `fallback` for unusable dimensions.
    pub fn new(
        id: u32,
        src: String,
        kind: MediaKind,
        dims: Dimensions,
        fallback: Dimensions,
        row_height: u32,
    ) -> Self {
        let dims = if dims.is_valid() { dims } else { fallback };
        let alt = alt_text(&src);
        Self {
            id,
            src,
            alt,
            width: dims.width,
            height: dims.height,
            scaled_width: dims.scaled_width(row_height),
            kind,
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// File name without extension, dashes read as spaces.
    pub fn display_name(&self) -> &str {
        &self.alt
    }
}

fn alt_text(src: &str) -> String {
    let file = src.rsplit('/').next().unwrap_or(src);
    let stem = file.split('.').next().unwrap_or(file);
    stem.replace('-', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: Dimensions = Dimensions::new(1920, 1080);

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("JPG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("gif"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("MoV"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("webp"), None);
        assert_eq!(MediaKind::from_extension("txt"), None);
    }

    #[test]
    fn test_scaled_width() {
        assert_eq!(HD.scaled_width(400), 711);
        assert_eq!(Dimensions::new(1000, 1000).scaled_width(400), 400);
        assert_eq!(Dimensions::new(1, 4000).scaled_width(400), 1);
    }

    #[test]
    fn test_invalid_dimensions_use_fallback() {
        let item = MediaDescriptor::new(
            3,
            "/gallery-images/outfit1/clip.mp4".into(),
            MediaKind::Video,
            Dimensions::new(0, 0),
            HD,
            400,
        );
        assert_eq!((item.width, item.height), (1920, 1080));
        assert_eq!(item.scaled_width, 711);
        assert!(item.is_video());
    }

    #[test]
    fn test_alt_text_from_src() {
        let item = MediaDescriptor::new(
            1,
            "/gallery-images/other/red-silk-dress.v2.jpg".into(),
            MediaKind::Image,
            Dimensions::new(800, 1200),
            HD,
            400,
        );
        assert_eq!(item.display_name(), "red silk dress");
        assert!((item.aspect_ratio() - 0.6667).abs() < 0.001);
    }

    #[test]
    fn test_json_shape() {
        let item = MediaDescriptor::new(
            7,
            "/gallery-images/outfit2/a.png".into(),
            MediaKind::Image,
            Dimensions::new(400, 400),
            HD,
            400,
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["scaledWidth"], 400);
        assert_eq!(json["type"], "image");
        assert_eq!(json["id"], 7);
        assert_eq!(json["alt"], "a");
    }
}
