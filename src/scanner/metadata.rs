//! Dimension probing for listed media.
//!
//! Images are measured from their headers through the `image` crate. Videos
//! get a best-effort container scan (MP4/MOV track header, Matroska/WebM
//! video element). Anything that cannot be measured reports `None` and the
//! caller substitutes the configured default dimensions.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use image::ImageReader;
use tracing::{debug, trace, warn};

use crate::models::{Dimensions, MediaKind};

/// How much of a video file is scanned for dimension metadata.
const VIDEO_PROBE_BYTES: u64 = 256 * 1024;

/// Dimensions above this are treated as garbage from a false match.
const MAX_DIMENSION: u32 = 65_535;

/// Matroska element IDs.
const MKV_VIDEO: u8 = 0xE0;
const MKV_PIXEL_WIDTH: u64 = 0xB0;
const MKV_PIXEL_HEIGHT: u64 = 0xBA;

/// Probes media dimensions, falling back to a configured default.
#[derive(Debug, Clone, Copy)]
pub struct DimensionProbe {
    fallback: Dimensions,
}

impl DimensionProbe {
    pub fn new(fallback: Dimensions) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> Dimensions {
        self.fallback
    }

    /// Measured dimensions, or the fallback when probing fails.
    pub fn dimensions(&self, path: &Path, kind: MediaKind) -> Dimensions {
        match Self::probe(path, kind) {
            Some(dims) => dims,
            None => {
                debug!(
                    "Using fallback {}x{} for {:?}",
                    self.fallback.width, self.fallback.height, path
                );
                self.fallback
            }
        }
    }

    /// Measured dimensions, `None` when the file cannot be measured.
    pub fn probe(path: &Path, kind: MediaKind) -> Option<Dimensions> {
        let result = match kind {
            MediaKind::Image => Self::image_dimensions(path),
            MediaKind::Video => Self::video_dimensions(path),
        };

        match result {
            Ok(Some(dims)) if dims.is_valid() => {
                trace!("Got dimensions {}x{} for {:?}", dims.width, dims.height, path);
                Some(dims)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to probe {:?}: {:#}", path, e);
                None
            }
        }
    }

    fn image_dimensions(path: &Path) -> Result<Option<Dimensions>> {
        let (width, height) = ImageReader::open(path)
            .with_context(|| format!("Failed to open image: {:?}", path))?
            .with_guessed_format()
            .context("Failed to guess image format")?
            .into_dimensions()
            .with_context(|| format!("Failed to read dimensions: {:?}", path))?;
        Ok(Some(Dimensions::new(width, height)))
    }

    fn video_dimensions(path: &Path) -> Result<Option<Dimensions>> {
        let mut buffer = Vec::new();
        File::open(path)
            .with_context(|| format!("Failed to open video: {:?}", path))?
            .take(VIDEO_PROBE_BYTES)
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read video: {:?}", path))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let dims = match ext.as_str() {
            "mp4" | "mov" => parse_mp4(&buffer),
            "webm" => parse_matroska(&buffer),
            _ => parse_mp4(&buffer).or_else(|| parse_matroska(&buffer)),
        };
        if dims.is_none() {
            debug!("No video dimensions found in {:?}", path);
        }
        Ok(dims)
    }
}

fn sane(width: u32, height: u32) -> Option<Dimensions> {
    let dims = Dimensions::new(width, height);
    (dims.is_valid() && width <= MAX_DIMENSION && height <= MAX_DIMENSION).then_some(dims)
}

fn be_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Reads width/height from the first video `tkhd` box.
///
/// Width and height are 16.16 fixed point, after a version-dependent block of
/// timestamps and the 36-byte matrix. Audio tracks report zero and are skipped.
fn parse_mp4(buf: &[u8]) -> Option<Dimensions> {
    let mut from = 0;
    while let Some(pos) = find(&buf[from..], b"tkhd") {
        let payload = from + pos + 4;
        let offset = match buf.get(payload).copied() {
            Some(0) => payload + 76,
            Some(1) => payload + 88,
            _ => {
                from = payload;
                continue;
            }
        };
        if let (Some(w), Some(h)) = (be_u32(buf, offset), be_u32(buf, offset + 4)) {
            if let Some(dims) = sane(w >> 16, h >> 16) {
                return Some(dims);
            }
        }
        from = payload;
    }
    None
}

/// Reads PixelWidth/PixelHeight from the children of a Matroska `Video` element.
fn parse_matroska(buf: &[u8]) -> Option<Dimensions> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == MKV_VIDEO {
            if let Some((size, size_len)) = read_vint(&buf[i + 1..], false) {
                let start = i + 1 + size_len;
                let end = start.saturating_add(size as usize).min(buf.len());
                if let Some(dims) = video_children(&buf[start..end]) {
                    return Some(dims);
                }
            }
        }
        i += 1;
    }
    None
}

fn video_children(mut body: &[u8]) -> Option<Dimensions> {
    let (mut width, mut height) = (0u32, 0u32);
    while !body.is_empty() {
        let (id, id_len) = read_vint(body, true)?;
        let (size, size_len) = read_vint(&body[id_len..], false)?;
        let value_at = id_len + size_len;
        let value_end = value_at.checked_add(size as usize)?;
        let value = body.get(value_at..value_end)?;

        if (id == MKV_PIXEL_WIDTH || id == MKV_PIXEL_HEIGHT) && (1..=4).contains(&value.len()) {
            let n = value.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
            if id == MKV_PIXEL_WIDTH {
                width = n;
            } else {
                height = n;
            }
        }
        body = &body[value_end..];
    }
    sane(width, height)
}

/// Decodes an EBML variable-length integer, returning `(value, byte_len)`.
/// Element IDs keep their length marker bit; sizes drop it.
fn read_vint(data: &[u8], keep_marker: bool) -> Option<(u64, usize)> {
    let first = *data.first()?;
    if first == 0 {
        return None;
    }
    let len = first.leading_zeros() as usize + 1;
    let bytes = data.get(..len)?;
    let head = if keep_marker {
        first as u64
    } else {
        (first as u64) & ((1u64 << (8 - len)) - 1)
    };
    let value = bytes[1..].iter().fold(head, |acc, b| (acc << 8) | *b as u64);
    Some((value, len))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HD: Dimensions = Dimensions::new(1920, 1080);

    fn tkhd_v0(width: u32, height: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        buf.extend_from_slice(b"moov");
        buf.extend_from_slice(&[0, 0, 0, 92]);
        buf.extend_from_slice(b"tkhd");
        let mut payload = vec![0u8; 84];
        payload[76..80].copy_from_slice(&(width << 16).to_be_bytes());
        payload[80..84].copy_from_slice(&(height << 16).to_be_bytes());
        buf.extend_from_slice(&payload);
        buf
    }

    fn mkv_video(width: u16, height: u16) -> Vec<u8> {
        let mut video = vec![0xB0, 0x82];
        video.extend_from_slice(&width.to_be_bytes());
        video.extend_from_slice(&[0xBA, 0x82]);
        video.extend_from_slice(&height.to_be_bytes());
        let mut buf = vec![0x1A, 0x45, 0xDF, 0xA3, 0x80];
        buf.push(MKV_VIDEO);
        buf.push(0x80 | video.len() as u8);
        buf.extend_from_slice(&video);
        buf
    }

    fn temp_with(suffix: &str, bytes: &[u8]) -> NamedTempFile {
        let mut temp = NamedTempFile::with_suffix(suffix).unwrap();
        temp.write_all(bytes).unwrap();
        temp
    }

    #[test]
    fn test_png_dimensions() {
        let temp = NamedTempFile::with_suffix(".png").unwrap();
        image::RgbImage::new(30, 20).save(temp.path()).unwrap();
        assert_eq!(
            DimensionProbe::probe(temp.path(), MediaKind::Image),
            Some(Dimensions::new(30, 20))
        );
    }

    #[test]
    fn test_nonexistent_image_uses_fallback() {
        let probe = DimensionProbe::new(HD);
        let dims = probe.dimensions(Path::new("/nonexistent/image.jpg"), MediaKind::Image);
        assert_eq!(dims, HD);
    }

    #[test]
    fn test_corrupt_image_uses_fallback() {
        let temp = temp_with(".jpg", b"not a real jpeg file");
        let probe = DimensionProbe::new(Dimensions::new(640, 480));
        assert_eq!(
            probe.dimensions(temp.path(), MediaKind::Image),
            Dimensions::new(640, 480)
        );
    }

    #[test]
    fn test_mp4_track_header() {
        assert_eq!(parse_mp4(&tkhd_v0(1280, 720)), Some(Dimensions::new(1280, 720)));

        let temp = temp_with(".mp4", &tkhd_v0(1080, 1920));
        assert_eq!(
            DimensionProbe::probe(temp.path(), MediaKind::Video),
            Some(Dimensions::new(1080, 1920))
        );
    }

    #[test]
    fn test_mp4_skips_audio_track() {
        let mut buf = tkhd_v0(0, 0);
        buf.extend_from_slice(&tkhd_v0(640, 360));
        assert_eq!(parse_mp4(&buf), Some(Dimensions::new(640, 360)));
    }

    #[test]
    fn test_webm_video_element() {
        assert_eq!(parse_matroska(&mkv_video(854, 480)), Some(Dimensions::new(854, 480)));

        let temp = temp_with(".webm", &mkv_video(3840, 2160));
        assert_eq!(
            DimensionProbe::probe(temp.path(), MediaKind::Video),
            Some(Dimensions::new(3840, 2160))
        );
    }

    #[test]
    fn test_unparseable_video_uses_fallback() {
        let temp = temp_with(".mov", b"\x00\x00\x00\x08free");
        let probe = DimensionProbe::new(HD);
        assert_eq!(probe.dimensions(temp.path(), MediaKind::Video), HD);
        assert_eq!(probe.fallback(), HD);
    }

    #[test]
    fn test_read_vint() {
        assert_eq!(read_vint(&[0x82], false), Some((2, 1)));
        assert_eq!(read_vint(&[0x40, 0x02], false), Some((2, 2)));
        assert_eq!(read_vint(&[0xB0], true), Some((0xB0, 1)));
        assert_eq!(read_vint(&[0x00], false), None);
        assert_eq!(read_vint(&[0x40], false), None);
    }
}
