//! Page loading for images and scanned PDFs using lopdf.
//!
//! Scanned receipt PDFs carry one full-page scan per page as an image
//! XObject; that scan is the rasterized page. Pages without a usable scan
//! are skipped.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgb};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::Result;
use crate::error::{NotaError, PdfError};
use crate::models::config::PdfConfig;

/// Loads the rasterized pages of an input document.
pub struct PageLoader {
    config: PdfConfig,
}

impl PageLoader {
    /// Create a loader with the given PDF configuration.
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    /// Load all pages of an image or PDF file.
    pub fn load(&self, path: &Path) -> std::result::Result<Vec<DynamicImage>, NotaError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if extension == "pdf" {
            let data = std::fs::read(path)?;
            Ok(self.load_pdf(&data)?)
        } else {
            Ok(vec![image::open(path)?])
        }
    }

    /// Load page scans from PDF bytes.
    pub fn load_pdf(&self, data: &[u8]) -> Result<Vec<DynamicImage>> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        let mut scans = Vec::with_capacity(pages.len());
        for (page_no, page_id) in pages.iter() {
            if self.config.max_pages > 0 && scans.len() >= self.config.max_pages {
                break;
            }
            match page_scan(&doc, *page_id) {
                Some(scan) => scans.push(scan),
                None => debug!("Page {} has no usable scan, skipping", page_no),
            }
        }

        if scans.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded {} page scans from PDF", scans.len());
        Ok(scans)
    }
}

impl Default for PageLoader {
    fn default() -> Self {
        Self::new(PdfConfig::default())
    }
}

/// Pick the largest image on a page as its scan.
fn page_scan(doc: &Document, page_id: ObjectId) -> Option<DynamicImage> {
    let resources = page_resources(doc, page_id)?;
    let xobjects = resources.get(b"XObject").ok()?;
    let (_, xobjects) = doc.dereference(xobjects).ok()?;
    let Object::Dictionary(xobjects) = xobjects else {
        return None;
    };

    let mut best: Option<DynamicImage> = None;
    for (_name, obj_ref) in xobjects.iter() {
        let Ok((_, obj)) = doc.dereference(obj_ref) else {
            continue;
        };
        if let Some(image) = extract_image_object(doc, obj) {
            let larger = best
                .as_ref()
                .is_none_or(|b| image.width() * image.height() > b.width() * b.height());
            if larger {
                best = Some(image);
            }
        }
    }
    best
}

/// Resources dictionary for a page, handling inheritance.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<lopdf::Dictionary> {
    let mut node_id = page_id;
    loop {
        let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(resources))) = doc.dereference(resources) {
                return Some(resources.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => return None,
        }
    }
}

/// Decode an image XObject into a `DynamicImage`.
fn extract_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    let subtype = dict.get(b"Subtype").ok()?;
    if subtype.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) if !arr.is_empty() => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                // JPEG scan, decode the raw stream directly.
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter, skipping");
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    decode_raw_image(&data, width, height, color_space)
}

/// Rebuild an RGB image from raw RGB or grayscale samples.
fn decode_raw_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
) -> Option<DynamicImage> {
    let expected_rgb = (width * height * 3) as usize;
    let expected_gray = (width * height) as usize;

    if (color_space == b"DeviceRGB" || color_space == b"RGB") && data.len() >= expected_rgb {
        let buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..expected_rgb].to_vec())?;
        return Some(DynamicImage::ImageRgb8(buffer));
    }

    if (color_space == b"DeviceGray" || color_space == b"G") && data.len() >= expected_gray {
        let mut rgb = Vec::with_capacity(expected_rgb);
        for &gray in &data[..expected_gray] {
            rgb.extend_from_slice(&[gray, gray, gray]);
        }
        let buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb)?;
        return Some(DynamicImage::ImageRgb8(buffer));
    }

    trace!(
        "Could not decode raw image: data_len={}, expected_rgb={}",
        data.len(),
        expected_rgb
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        DynamicImage::new_rgb8(40, 60).save(&path).unwrap();

        let loader = PageLoader::default();
        let pages = loader.load(&path).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].width(), 40);
    }

    #[test]
    fn test_load_rejects_garbage_pdf() {
        let loader = PageLoader::default();
        assert!(loader.load_pdf(b"not a pdf").is_err());
    }

    #[test]
    fn test_decode_raw_gray_image() {
        let data = vec![128u8; 4];
        let image = decode_raw_image(&data, 2, 2, b"DeviceGray").unwrap();
        assert_eq!(image.width(), 2);
    }
}
