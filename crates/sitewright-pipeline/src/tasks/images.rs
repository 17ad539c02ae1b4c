//! Image copy and optimization.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::gif::{GifDecoder, GifEncoder};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder, ImageFormat};
use rayon::prelude::*;

use crate::context::BuildContext;
use crate::task::{Category, Task, TaskError, TaskReport};
use crate::tasks::{copy_file, write_output};

/// Copies images into `images/`, optimizing them in production.
#[derive(Debug, Default)]
pub struct ImageTask;

impl Task for ImageTask {
    fn name(&self) -> &'static str {
        "images"
    }

    fn category(&self) -> Category {
        Category::Images
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let files = ctx.registry().images().resolve(ctx.root())?;
        let images_dir = ctx.output_dir("images");
        let quality = ctx.registry().images.jpeg_quality.clamp(1, 100);
        let production = ctx.is_production();

        let saved: Vec<u64> = files
            .par_iter()
            .map(|file| {
                let target = images_dir.join(&file.relative);
                if !production {
                    copy_file(&file.path, &target)?;
                    return Ok(0);
                }

                let original = fs::read(&file.path).map_err(|e| TaskError::ReadError {
                    path: file.path.display().to_string(),
                    message: e.to_string(),
                })?;
                let optimized = optimize(&file.path, &original, quality)?;
                let saved = original.len().saturating_sub(optimized.len()) as u64;
                write_output(&target, optimized)?;
                Ok(saved)
            })
            .collect::<Result<_, TaskError>>()?;

        if production {
            let total: u64 = saved.iter().sum();
            tracing::info!("Optimized {} images, saved {} bytes", files.len(), total);
        }

        Ok(TaskReport::files(files.len()))
    }
}

/// Re-encode an image, returning whichever of the original and the
/// re-encoded bytes is smaller. Formats without an optimizer pass through.
pub fn optimize(path: &Path, original: &[u8], jpeg_quality: u8) -> Result<Vec<u8>, TaskError> {
    let image_error = |message: String| TaskError::ImageError {
        path: path.display().to_string(),
        message,
    };

    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    let encoded = if is_svg {
        minify_svg(original).map_err(image_error)?
    } else {
        match ImageFormat::from_path(path) {
            Ok(ImageFormat::Png) => Some(encode_png(original).map_err(image_error)?),
            Ok(ImageFormat::Jpeg) => Some(encode_jpeg(original, jpeg_quality).map_err(image_error)?),
            Ok(ImageFormat::Gif) => encode_gif(original).map_err(image_error)?,
            _ => None,
        }
    };

    match encoded {
        Some(encoded) if encoded.len() < original.len() => Ok(encoded),
        _ => Ok(original.to_vec()),
    }
}

fn encode_png(original: &[u8]) -> Result<Vec<u8>, String> {
    let decoded = image::load_from_memory_with_format(original, ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    let mut encoded = Cursor::new(Vec::new());
    let encoder =
        PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, FilterType::Adaptive);
    decoded
        .write_with_encoder(encoder)
        .map_err(|e| e.to_string())?;
    Ok(encoded.into_inner())
}

fn encode_jpeg(original: &[u8], quality: u8) -> Result<Vec<u8>, String> {
    let decoded = image::load_from_memory_with_format(original, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;

    let mut encoded = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
    decoded
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| e.to_string())?;
    Ok(encoded.into_inner())
}

/// Re-encode a still GIF. Animated GIFs pass through untouched.
fn encode_gif(original: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let decoder = GifDecoder::new(Cursor::new(original)).map_err(|e| e.to_string())?;
    let frames = decoder
        .into_frames()
        .take(2)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    if frames.len() != 1 {
        return Ok(None);
    }

    let decoded = image::load_from_memory_with_format(original, ImageFormat::Gif)
        .map_err(|e| e.to_string())?;

    let mut encoded = Cursor::new(Vec::new());
    decoded
        .to_rgba8()
        .write_with_encoder(GifEncoder::new(&mut encoded))
        .map_err(|e| e.to_string())?;
    Ok(Some(encoded.into_inner()))
}

/// Elements usvg drops or flattens when rendering support is compiled out.
const SVG_PASSTHROUGH: &[&str] = &["<text", "<animate", "<set", "<script", "<foreignObject"];

/// Rewrite an SVG through usvg with no indentation.
fn minify_svg(original: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let source = String::from_utf8_lossy(original);
    if SVG_PASSTHROUGH.iter().any(|tag| source.contains(tag)) {
        return Ok(None);
    }

    let tree = usvg::Tree::from_data(original, &usvg::Options::default()).map_err(|e| e.to_string())?;
    let minified = tree.to_string(&usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    });
    Ok(Some(minified.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use crate::tasks::testing::{context, tree, write};
    use image::codecs::gif::Repeat;
    use image::{Frame, ImageBuffer, Rgb, Rgba};
    use tempfile::tempdir;

    fn write_png(root: &Path, rel: &str) {
        let image = ImageBuffer::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        // Fast compression leaves room for the optimizer.
        let file = fs::File::create(&path).unwrap();
        let encoder = PngEncoder::new_with_quality(file, CompressionType::Fast, FilterType::NoFilter);
        image.write_with_encoder(encoder).unwrap();
    }

    #[test]
    fn development_copies_verbatim() {
        let temp = tempdir().unwrap();
        write_png(temp.path(), "src/images/photos/a.png");
        write(temp.path(), "src/images/logo.svg", "<svg></svg>");
        write(temp.path(), "src/images/readme.txt", "skip me");

        ImageTask.run(&context(temp.path(), Mode::Development)).unwrap();

        let out = temp.path().join("dev/images");
        assert_eq!(tree(&out), vec!["logo.svg", "photos/a.png"]);
        assert_eq!(
            fs::read(out.join("photos/a.png")).unwrap(),
            fs::read(temp.path().join("src/images/photos/a.png")).unwrap()
        );
    }

    const LOGO: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!-- Exported by a drawing tool; nothing below needs this comment. -->
<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 16 16">
    <metadata>
        <description>Square logo padded with editor whitespace</description>
    </metadata>
    <g>
        <rect x="0" y="0" width="16" height="16" fill="#336699"/>
    </g>
</svg>
"##;

    fn write_gif(root: &Path, rel: &str, frames: u32) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        let file = fs::File::create(&path).unwrap();
        let mut encoder = GifEncoder::new(file);
        if frames > 1 {
            encoder.set_repeat(Repeat::Infinite).unwrap();
        }
        for i in 0..frames {
            let buffer = ImageBuffer::from_fn(32, 32, |x, y| {
                Rgba([(x * 8) as u8, (y * 8) as u8, (i * 60) as u8, 255])
            });
            encoder.encode_frame(Frame::new(buffer)).unwrap();
        }
    }

    #[test]
    fn production_never_grows_images() {
        let temp = tempdir().unwrap();
        write_png(temp.path(), "src/images/a.png");
        write_gif(temp.path(), "src/images/still.gif", 1);

        ImageTask.run(&context(temp.path(), Mode::Production)).unwrap();

        for name in ["a.png", "still.gif"] {
            let original = fs::read(temp.path().join("src/images").join(name)).unwrap();
            let optimized = fs::read(temp.path().join("build/images").join(name)).unwrap();
            assert!(optimized.len() <= original.len(), "{name} grew");
            assert!(image::load_from_memory(&optimized).is_ok(), "{name} unreadable");
        }
    }

    #[test]
    fn production_minifies_svg() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/images/logo.svg", LOGO);

        ImageTask.run(&context(temp.path(), Mode::Production)).unwrap();

        let svg = fs::read_to_string(temp.path().join("build/images/logo.svg")).unwrap();
        assert!(svg.len() < LOGO.len());
        assert!(!svg.contains("Exported"));
        assert!(!svg.contains("<metadata"));
        assert!(usvg::Tree::from_data(svg.as_bytes(), &usvg::Options::default()).is_ok());
    }

    #[test]
    fn svg_with_text_is_kept_verbatim() {
        let temp = tempdir().unwrap();
        let source = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"40\" height=\"10\">\n  <text x=\"0\" y=\"8\">Logo</text>\n</svg>\n";
        write(temp.path(), "src/images/wordmark.svg", source);

        ImageTask.run(&context(temp.path(), Mode::Production)).unwrap();

        let svg = fs::read_to_string(temp.path().join("build/images/wordmark.svg")).unwrap();
        assert_eq!(svg, source);
    }

    #[test]
    fn animated_gif_is_kept_verbatim() {
        let temp = tempdir().unwrap();
        write_gif(temp.path(), "src/images/spinner.gif", 3);

        ImageTask.run(&context(temp.path(), Mode::Production)).unwrap();

        assert_eq!(
            fs::read(temp.path().join("build/images/spinner.gif")).unwrap(),
            fs::read(temp.path().join("src/images/spinner.gif")).unwrap()
        );
    }

    #[test]
    fn corrupt_image_fails_in_production() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/images/broken.png", "not a png");

        let err = ImageTask
            .run(&context(temp.path(), Mode::Production))
            .unwrap_err();

        assert!(matches!(err, TaskError::ImageError { .. }));
    }

    #[test]
    fn malformed_svg_fails_in_production() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/images/broken.svg", "<svg><g></svg>");

        let err = ImageTask
            .run(&context(temp.path(), Mode::Production))
            .unwrap_err();

        assert!(matches!(err, TaskError::ImageError { .. }));
    }
}
