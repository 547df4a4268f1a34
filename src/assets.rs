//! Asset processing: originals, web-size and thumbnail derivatives.
//!
//! Every non-text file is mirrored into the output tree. Raster images
//! (`jpg`, `jpeg`, `png`) additionally get two JPEG derivatives:
//!
//! ```text
//! content/testdir/test.jpg  →  _site/testdir/test.jpg        (verbatim copy)
//!                              _site/testdir/test_web.jpg    (fits 1280×720)
//!                              _site/testdir/test_thumb.jpg  (fits 384×216)
//! ```
//!
//! Both derivatives preserve aspect ratio, never upscale, and are encoded
//! at quality 80. Derivative URLs recorded on the node are relative to the
//! node's own site directory (`testdir/test_thumb.jpg`), never prefixed
//! with the output root.
//!
//! ## Staleness
//!
//! Work is skipped when the destination is at least as new as the source;
//! a missing destination always regenerates. Derivatives are only skipped
//! when *both* exist and neither is older than the source. On a skip the
//! original dimensions are still recorded (header read, no decode).
//!
//! ## Failure mode
//!
//! A source that cannot be decoded (corrupt file, unsupported color mode)
//! logs a warning and leaves the size/derivative fields unset; it never
//! aborts the build. I/O failures at the output boundary do propagate.

use crate::tree::FileNode;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, BufWriter};
use std::path::Path;

/// Extensions handled by the image pipeline.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Bounding boxes and encoding quality for derivatives.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    /// Maximum (width, height) of the web-size derivative.
    pub web_box: (u32, u32),
    /// Maximum (width, height) of the thumbnail derivative.
    pub thumb_box: (u32, u32),
    /// JPEG quality (0-100).
    pub quality: u8,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            web_box: (1280, 720),
            thumb_box: (384, 216),
            quality: 80,
        }
    }
}

/// What the processor actually did, for progress reporting.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessOutcome {
    pub copied: bool,
    pub encoded: bool,
}

/// Whether `dest` needs regenerating from `source`: missing destinations
/// always do; otherwise the source must be strictly newer.
pub fn is_stale(source: &Path, dest: &Path) -> io::Result<bool> {
    if !dest.exists() {
        return Ok(true);
    }
    let src = fs::metadata(source)?.modified()?;
    let dst = fs::metadata(dest)?.modified()?;
    Ok(src > dst)
}

/// Copy `source` to `dest` unless the destination is already up to date.
/// Returns whether a copy happened.
pub fn copy_if_stale(source: &Path, dest: &Path) -> io::Result<bool> {
    if !is_stale(source, dest)? {
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(true)
}

/// SHA-256 of a file's contents, as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{digest:x}"))
}

fn mime_type(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" | "jpeg" => Some("image/jpg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Process an image file node: copy the original, generate derivatives,
/// and record url/mime/size/hash onto the node.
pub fn process_image(
    node: &mut FileNode,
    output_root: &Path,
    config: &AssetConfig,
) -> io::Result<ProcessOutcome> {
    let dest_dir = output_root.join(&node.site_dir);
    fs::create_dir_all(&dest_dir)?;

    let original_name = format!("{}.{}", node.file_name, node.ext);
    let copied = copy_if_stale(&node.source_path, &dest_dir.join(&original_name))?;

    node.url = Some(node.site_path.clone());
    node.mime_type = mime_type(&node.ext).map(str::to_string);
    node.hash = Some(hash_file(&node.source_path)?);

    let web_name = format!("{}_web.jpg", node.file_name);
    let thumb_name = format!("{}_thumb.jpg", node.file_name);
    let web_path = dest_dir.join(&web_name);
    let thumb_path = dest_dir.join(&thumb_name);

    let needs_encode = is_stale(&node.source_path, &web_path)?
        || is_stale(&node.source_path, &thumb_path)?;

    if !needs_encode {
        match image::image_dimensions(&node.source_path) {
            Ok(size) => {
                node.size = Some(size);
                node.web = Some(format!("{}/{}", node.site_dir, web_name));
                node.thumbnail = Some(format!("{}/{}", node.site_dir, thumb_name));
            }
            Err(err) => {
                eprintln!(
                    "warning: cannot read dimensions of {}: {err}",
                    node.source_path.display()
                );
            }
        }
        return Ok(ProcessOutcome {
            copied,
            encoded: false,
        });
    }

    let decoded = match image::open(&node.source_path) {
        Ok(img) => img,
        Err(err) => {
            eprintln!(
                "warning: cannot decode image {}: {err}",
                node.source_path.display()
            );
            return Ok(ProcessOutcome {
                copied,
                encoded: false,
            });
        }
    };

    // Alpha and palette modes are flattened to plain RGB before encoding.
    let rgb = decoded.to_rgb8();
    node.size = Some(rgb.dimensions());

    save_jpeg(&fit_within(&rgb, config.web_box), &web_path, config.quality)?;
    save_jpeg(
        &fit_within(&rgb, config.thumb_box),
        &thumb_path,
        config.quality,
    )?;

    node.web = Some(format!("{}/{}", node.site_dir, web_name));
    node.thumbnail = Some(format!("{}/{}", node.site_dir, thumb_name));

    Ok(ProcessOutcome {
        copied,
        encoded: true,
    })
}

/// Copy a passthrough file (anything the image pipeline and the text
/// renderers don't handle) to its mirrored output path.
pub fn copy_passthrough(node: &mut FileNode, output_root: &Path) -> io::Result<bool> {
    let dest = output_root.join(&node.site_dir).join(format!(
        "{}{}",
        node.file_name,
        if node.ext.is_empty() {
            String::new()
        } else {
            format!(".{}", node.ext)
        }
    ));
    node.url = Some(node.site_path.clone());
    copy_if_stale(&node.source_path, &dest)
}

/// Shrink to fit inside `(width, height)`, preserving aspect ratio.
/// Images already inside the box are returned unscaled.
fn fit_within(img: &RgbImage, (max_w, max_h): (u32, u32)) -> RgbImage {
    let (w, h) = img.dimensions();
    if w <= max_w && h <= max_h {
        return img.clone();
    }
    let scale = f64::min(max_w as f64 / w as f64, max_h as f64 / h as f64);
    let target_w = ((w as f64 * scale).round() as u32).max(1);
    let target_h = ((h as f64 * scale).round() as u32).max(1);
    image::imageops::resize(img, target_w, target_h, FilterType::Lanczos3)
}

fn save_jpeg(img: &RgbImage, path: &Path, quality: u8) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
    encoder
        .encode(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Node, build};
    use image::Rgb;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_test_image(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = RgbImage::from_pixel(width, height, Rgb([120, 40, 200]));
        img.save(path).unwrap();
    }

    fn image_node(root: &Path, rel: &str) -> FileNode {
        let tree = build(root).unwrap();
        let mut node = tree;
        let mut parts: Vec<&str> = rel.split('/').collect();
        let file = parts.pop().unwrap();
        for part in parts {
            node = match node.children.remove(part) {
                Some(Node::Dir(d)) => d,
                _ => panic!("missing dir {part}"),
            };
        }
        match node.children.remove(file) {
            Some(Node::File(f)) => f,
            _ => panic!("missing file {rel}"),
        }
    }

    // =========================================================================
    // Staleness
    // =========================================================================

    #[test]
    fn missing_dest_is_stale() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, "x").unwrap();
        assert!(is_stale(&src, &tmp.path().join("missing")).unwrap());
    }

    #[test]
    fn newer_dest_is_fresh() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        let dst = tmp.path().join("b.txt");
        fs::write(&src, "x").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(30));
        fs::write(&dst, "y").unwrap();
        assert!(!is_stale(&src, &dst).unwrap());
    }

    #[test]
    fn newer_source_is_stale() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        let dst = tmp.path().join("b.txt");
        fs::write(&dst, "y").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(30));
        fs::write(&src, "x").unwrap();
        assert!(is_stale(&src, &dst).unwrap());
    }

    #[test]
    fn copy_if_stale_skips_fresh_dest() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        let dst = tmp.path().join("out/a.txt");
        fs::write(&src, "v1").unwrap();

        assert!(copy_if_stale(&src, &dst).unwrap());
        assert!(!copy_if_stale(&src, &dst).unwrap());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "v1");
    }

    // =========================================================================
    // Image processing
    // =========================================================================

    #[test]
    fn process_image_produces_copy_and_derivatives() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        write_test_image(&content.join("testdir/test.jpg"), 200, 200);

        let mut node = image_node(&content, "testdir/test.jpg");
        let outcome = process_image(&mut node, &out, &AssetConfig::default()).unwrap();

        assert!(outcome.copied);
        assert!(outcome.encoded);
        assert!(out.join("testdir/test.jpg").exists());
        assert!(out.join("testdir/test_web.jpg").exists());
        assert!(out.join("testdir/test_thumb.jpg").exists());

        assert_eq!(node.size, Some((200, 200)));
        assert_eq!(node.mime_type.as_deref(), Some("image/jpg"));
        assert_eq!(node.url.as_deref(), Some("testdir/test.jpg"));
        assert_eq!(node.web.as_deref(), Some("testdir/test_web.jpg"));
        assert_eq!(node.thumbnail.as_deref(), Some("testdir/test_thumb.jpg"));
        assert_eq!(node.hash.as_deref().map(str::len), Some(64));
    }

    #[test]
    fn png_keeps_native_extension_for_original() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        write_test_image(&content.join("test.png"), 64, 64);

        let mut node = image_node(&content, "test.png");
        process_image(&mut node, &out, &AssetConfig::default()).unwrap();

        assert!(out.join("test.png").exists());
        assert!(out.join("test_web.jpg").exists());
        assert_eq!(node.mime_type.as_deref(), Some("image/png"));
        assert_eq!(node.url.as_deref(), Some("./test.png"));
    }

    #[test]
    fn derivatives_fit_bounding_box() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        write_test_image(&content.join("wide.jpg"), 2000, 500);

        let mut node = image_node(&content, "wide.jpg");
        process_image(&mut node, &out, &AssetConfig::default()).unwrap();

        let (w, h) = image::image_dimensions(out.join("wide_web.jpg")).unwrap();
        assert!(w <= 1280 && h <= 720);
        assert_eq!((w, h), (1280, 320)); // aspect preserved

        let (tw, th) = image::image_dimensions(out.join("wide_thumb.jpg")).unwrap();
        assert!(tw <= 384 && th <= 216);
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        write_test_image(&content.join("small.jpg"), 100, 80);

        let mut node = image_node(&content, "small.jpg");
        process_image(&mut node, &out, &AssetConfig::default()).unwrap();

        assert_eq!(
            image::image_dimensions(out.join("small_web.jpg")).unwrap(),
            (100, 80)
        );
    }

    #[test]
    fn fresh_derivatives_skip_encoding_but_record_size() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        write_test_image(&content.join("pic.jpg"), 150, 150);

        let mut node = image_node(&content, "pic.jpg");
        process_image(&mut node, &out, &AssetConfig::default()).unwrap();

        let mut again = image_node(&content, "pic.jpg");
        let outcome = process_image(&mut again, &out, &AssetConfig::default()).unwrap();

        assert!(!outcome.encoded);
        assert!(!outcome.copied);
        assert_eq!(again.size, Some((150, 150)));
        assert_eq!(again.thumbnail.as_deref(), Some("./pic_thumb.jpg"));
    }

    #[test]
    fn newer_source_regenerates_derivatives() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        write_test_image(&content.join("pic.jpg"), 150, 150);

        let mut node = image_node(&content, "pic.jpg");
        process_image(&mut node, &out, &AssetConfig::default()).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(30));
        write_test_image(&content.join("pic.jpg"), 180, 120);

        let mut again = image_node(&content, "pic.jpg");
        let outcome = process_image(&mut again, &out, &AssetConfig::default()).unwrap();

        assert!(outcome.encoded);
        assert_eq!(again.size, Some((180, 120)));
    }

    #[test]
    fn undecodable_image_leaves_derived_fields_unset() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("broken.jpg"), b"not an image at all").unwrap();

        let mut node = image_node(&content, "broken.jpg");
        let outcome = process_image(&mut node, &out, &AssetConfig::default()).unwrap();

        assert!(!outcome.encoded);
        assert_eq!(node.size, None);
        assert_eq!(node.thumbnail, None);
        assert_eq!(node.web, None);
        // The original is still mirrored and identified.
        assert!(out.join("broken.jpg").exists());
        assert_eq!(node.mime_type.as_deref(), Some("image/jpg"));
    }

    // =========================================================================
    // Passthrough
    // =========================================================================

    #[test]
    fn passthrough_copies_with_native_extension() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let out = tmp.path().join("_site");
        fs::create_dir_all(content.join("docs")).unwrap();
        fs::write(content.join("docs/paper.pdf"), b"%PDF").unwrap();

        let mut node = image_node(&content, "docs/paper.pdf");
        assert!(copy_passthrough(&mut node, &out).unwrap());
        assert!(out.join("docs/paper.pdf").exists());
        assert_eq!(node.url.as_deref(), Some("docs/paper.pdf"));
        assert!(!copy_passthrough(&mut node, &out).unwrap());
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    #[test]
    fn hash_file_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path: PathBuf = tmp.path().join("f.bin");
        fs::write(&path, b"hello world").unwrap();
        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }
}
