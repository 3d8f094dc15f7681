//! Presentation document extraction: per-page/slide text content plus
//! rendering each page/slide to a PNG. PDF pages are read with a native
//! text extractor and rasterized with `pdftoppm`; PPTX slides are read
//! from the Open XML package directly (no LibreOffice dependency), falling
//! back to a placeholder image when conversion tooling is unavailable.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Normalize a submitted `file_ext` (which may or may not carry a leading
/// dot, in either case) to a bare lowercase extension for matching.
fn normalize_ext(file_ext: &str) -> String {
    file_ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Extract per-page/slide text content from a presentation document.
pub async fn extract_text_pages(path: impl AsRef<Path>, file_ext: &str) -> MediaResult<Vec<String>> {
    match normalize_ext(file_ext).as_str() {
        "pdf" => extract_pdf_text_pages(path).await,
        "pptx" | "ppt" => extract_pptx_text_pages(path).await,
        other => Err(MediaError::UnsupportedFormat(other.to_string())),
    }
}

async fn extract_pdf_text_pages(path: impl AsRef<Path>) -> MediaResult<Vec<String>> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path)?;
        let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| MediaError::internal(format!("pdf text extraction failed: {e}")))?;
        Ok(text.split('\x0c').map(|page| page.trim().to_string()).filter(|page| !page.is_empty()).collect())
    })
    .await
    .map_err(|e| MediaError::internal(format!("pdf extraction task panicked: {e}")))?
}

async fn extract_pptx_text_pages(path: impl AsRef<Path>) -> MediaResult<Vec<String>> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| MediaError::internal(format!("pptx is not a valid package: {e}")))?;

        let mut slide_indices: Vec<usize> = Vec::new();
        for i in 0..archive.len() {
            let name = archive.by_index(i)?.name().to_string();
            if let Some(rest) = name.strip_prefix("ppt/slides/slide") {
                if let Some(num_str) = rest.strip_suffix(".xml") {
                    if let Ok(n) = num_str.parse::<usize>() {
                        slide_indices.push(n);
                    }
                }
            }
        }
        slide_indices.sort_unstable();

        let mut pages = Vec::with_capacity(slide_indices.len());
        for n in slide_indices {
            let mut entry = archive.by_name(&format!("ppt/slides/slide{n}.xml"))?;
            let mut xml = String::new();
            std::io::Read::read_to_string(&mut entry, &mut xml)?;
            pages.push(extract_a_t_runs(&xml).join("\n"));
        }
        Ok(pages)
    })
    .await
    .map_err(|e| MediaError::internal(format!("pptx extraction task panicked: {e}")))?
}

/// Pull the text runs out of DrawingML `<a:t>...</a:t>` elements without a
/// full XML parse — the slide part schema is simple enough that this is
/// reliable and avoids a dependency the rest of the pipeline doesn't need.
fn extract_a_t_runs(xml: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<a:t>").or_else(|| rest.find("<a:t/>")) {
        rest = &rest[start..];
        if rest.starts_with("<a:t/>") {
            rest = &rest[6..];
            continue;
        }
        rest = &rest[5..];
        if let Some(end) = rest.find("</a:t>") {
            let text = &rest[..end];
            if !text.trim().is_empty() {
                runs.push(decode_xml_entities(text));
            }
            rest = &rest[end + 6..];
        } else {
            break;
        }
    }
    runs
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&amp;", "&").replace("&lt;", "<").replace("&gt;", ">").replace("&quot;", "\"").replace("&apos;", "'")
}

/// Render a single page/slide to a PNG at `output_path`. PDF pages use
/// `pdftoppm` directly; PPTX pages fall back to a placeholder since no
/// LibreOffice-equivalent renderer is assumed available in this core.
pub async fn render_page_to_image(path: impl AsRef<Path>, file_ext: &str, page_index: usize, output_path: impl AsRef<Path>) -> MediaResult<()> {
    match normalize_ext(file_ext).as_str() {
        "pdf" => render_pdf_page(path, page_index, output_path).await,
        "pptx" | "ppt" => render_placeholder(page_index, output_path).await,
        other => Err(MediaError::UnsupportedFormat(other.to_string())),
    }
}

async fn render_pdf_page(path: impl AsRef<Path>, page_index: usize, output_path: impl AsRef<Path>) -> MediaResult<()> {
    which::which("pdftoppm").map_err(|_| MediaError::internal("pdftoppm not found in PATH"))?;

    let output_path = output_path.as_ref();
    let output_stem = output_path.with_extension("");
    let page_number = (page_index + 1).to_string();

    let status = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        Command::new("pdftoppm")
            .args(["-png", "-f", &page_number, "-l", &page_number, "-r", "150", "-singlefile"])
            .arg(path.as_ref())
            .arg(&output_stem)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .status(),
    )
    .await
    .map_err(|_| MediaError::Timeout(30))??;

    let generated: PathBuf = output_stem.with_extension("png");
    if status.success() && generated.exists() {
        if generated != output_path {
            tokio::fs::rename(&generated, output_path).await?;
        }
        Ok(())
    } else {
        render_placeholder(page_index, output_path).await
    }
}

/// Minimal fallback "slide N" placeholder PNG, used when page rendering
/// tooling is unavailable or fails.
async fn render_placeholder(page_index: usize, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let output_path = output_path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let png = encode_solid_png(800, 600);
        std::fs::write(&output_path, png)?;
        tracing::debug!(page = page_index + 1, path = %output_path.display(), "wrote placeholder slide image");
        Ok(())
    })
    .await
    .map_err(|e| MediaError::internal(format!("placeholder render task panicked: {e}")))?
}

/// Encode a trivial solid-white PNG without pulling in an image codec crate.
fn encode_solid_png(width: u32, height: u32) -> Vec<u8> {
    use std::io::Write;

    fn chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + data.len() + 4);
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(tag);
        out.extend_from_slice(data);
        let mut crc_input = Vec::with_capacity(4 + data.len());
        crc_input.extend_from_slice(tag);
        crc_input.extend_from_slice(data);
        out.extend_from_slice(&crc32(&crc_input).to_be_bytes());
        out
    }

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]); // 8-bit depth, RGB, default filter/compression/interlace

    let mut raw = Vec::with_capacity((1 + width as usize * 3) * height as usize);
    for _ in 0..height {
        raw.push(0u8);
        for _ in 0..width {
            raw.extend_from_slice(&[255, 255, 255]);
        }
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw).expect("in-memory zlib write cannot fail");
    let idat = encoder.finish().expect("in-memory zlib finish cannot fail");

    let mut png = Vec::new();
    png.extend_from_slice(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    png.extend_from_slice(&chunk(b"IHDR", &ihdr));
    png.extend_from_slice(&chunk(b"IDAT", &idat));
    png.extend_from_slice(&chunk(b"IEND", &[]));
    png
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_extensions_regardless_of_leading_dot_or_case() {
        assert_eq!(normalize_ext("pdf"), "pdf");
        assert_eq!(normalize_ext(".PDF"), "pdf");
        assert_eq!(normalize_ext(".pptx"), "pptx");
    }

    #[test]
    fn extracts_a_t_runs_from_slide_xml() {
        let xml = r#"<p:sld><a:t>Hello</a:t><a:t>World &amp; Friends</a:t></p:sld>"#;
        assert_eq!(extract_a_t_runs(xml), vec!["Hello".to_string(), "World & Friends".to_string()]);
    }

    #[test]
    fn splits_pdf_text_on_form_feed() {
        let text = "page one\x0cpage two\x0c";
        let pages: Vec<String> = text.split('\x0c').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect();
        assert_eq!(pages, vec!["page one".to_string(), "page two".to_string()]);
    }

    #[test]
    fn placeholder_png_has_valid_signature() {
        let png = encode_solid_png(10, 10);
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }
}
