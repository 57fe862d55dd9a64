//! Format resolution: source sniffing and output codec selection.
//!
//! Everything here is a pure function of its inputs. Sources that the runtime
//! cannot rasterize are rejected here, before any pixel buffer exists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encode::Encoder;
use crate::CompressError;

/// An output codec the engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
}

impl Codec {
    /// Whether the codec accepts a continuous quality parameter.
    ///
    /// PNG has none; its lossy path goes through the channel quantizer.
    pub fn supports_quality(self) -> bool {
        !matches!(self, Codec::Png)
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Codec::Jpeg => "image/jpeg",
            Codec::Png => "image/png",
            Codec::WebP => "image/webp",
            Codec::Avif => "image/avif",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Jpeg => "jpg",
            Codec::Png => "png",
            Codec::WebP => "webp",
            Codec::Avif => "avif",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Jpeg => "jpeg",
            Codec::Png => "png",
            Codec::WebP => "webp",
            Codec::Avif => "avif",
        };
        f.write_str(name)
    }
}

/// The requested output format of a compression request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Keep the source codec (sources without an encoder map to PNG).
    #[default]
    Auto,
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
}

impl OutputFormat {
    fn explicit_codec(self) -> Option<Codec> {
        match self {
            OutputFormat::Auto => None,
            OutputFormat::Jpeg => Some(Codec::Jpeg),
            OutputFormat::Png => Some(Codec::Png),
            OutputFormat::WebP => Some(Codec::WebP),
            OutputFormat::Avif => Some(Codec::Avif),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CompressError;

    /// Parse a format name or MIME type (`"webp"`, `"image/webp"`); empty means auto.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        let name = value.strip_prefix("image/").unwrap_or(&value);
        match name {
            "" | "auto" => Ok(OutputFormat::Auto),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(CompressError::InvalidConfig(format!(
                "unknown output format: {value}"
            ))),
        }
    }
}

/// Detected format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
    Gif,
    Bmp,
    Tiff,
    /// Vector graphics; needs an external rasterizer.
    Svg,
    /// HEIC/HEIF multi-image containers.
    Heic,
    /// Live-photo bundles (a ZIP of a still and a movie).
    LivePhoto,
    Pdf,
    #[default]
    Unknown,
}

impl SourceFormat {
    /// Sniff the format from the leading bytes of a file.
    pub fn from_signature(bytes: &[u8]) -> SourceFormat {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return SourceFormat::Jpeg;
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return SourceFormat::Png;
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return SourceFormat::Gif;
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return SourceFormat::WebP;
        }
        if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            return SourceFormat::Tiff;
        }
        if bytes.starts_with(b"%PDF") {
            return SourceFormat::Pdf;
        }
        if bytes.starts_with(b"PK\x03\x04") {
            return SourceFormat::LivePhoto;
        }
        if let Some(format) = sniff_iso_bmff(bytes) {
            return format;
        }
        if bytes.starts_with(b"BM") && bytes.len() >= 14 {
            return SourceFormat::Bmp;
        }
        if looks_like_svg(bytes) {
            return SourceFormat::Svg;
        }
        SourceFormat::Unknown
    }

    /// Detect the format from a declared MIME type, falling back to the file extension.
    pub fn from_name_and_mime(file_name: &str, mime: &str) -> SourceFormat {
        let from_mime = match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => SourceFormat::Jpeg,
            "image/png" | "image/apng" => SourceFormat::Png,
            "image/webp" => SourceFormat::WebP,
            "image/avif" => SourceFormat::Avif,
            "image/gif" => SourceFormat::Gif,
            "image/bmp" | "image/x-ms-bmp" => SourceFormat::Bmp,
            "image/tiff" => SourceFormat::Tiff,
            "image/svg+xml" => SourceFormat::Svg,
            "image/heic" | "image/heif" | "image/heic-sequence" | "image/heif-sequence" => {
                SourceFormat::Heic
            }
            "application/pdf" => SourceFormat::Pdf,
            _ => SourceFormat::Unknown,
        };
        if from_mime != SourceFormat::Unknown {
            return from_mime;
        }

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" | "pjpeg" => SourceFormat::Jpeg,
            "png" | "apng" => SourceFormat::Png,
            "webp" => SourceFormat::WebP,
            "avif" => SourceFormat::Avif,
            "gif" => SourceFormat::Gif,
            "bmp" | "dib" => SourceFormat::Bmp,
            "tif" | "tiff" => SourceFormat::Tiff,
            "svg" | "svgz" => SourceFormat::Svg,
            "heic" | "heif" | "hif" => SourceFormat::Heic,
            "livp" => SourceFormat::LivePhoto,
            "pdf" => SourceFormat::Pdf,
            _ => SourceFormat::Unknown,
        }
    }

    /// Combine signature sniffing with the name/MIME hint.
    ///
    /// A rejected container on either side wins, so a renamed `.livp` or a
    /// mislabelled HEIC never reaches the decoder.
    pub fn detect(bytes: &[u8], file_name: &str, mime: &str) -> SourceFormat {
        let sniffed = SourceFormat::from_signature(bytes);
        let declared = SourceFormat::from_name_and_mime(file_name, mime);
        if declared.is_rejected_container() {
            return declared;
        }
        if sniffed != SourceFormat::Unknown {
            sniffed
        } else {
            declared
        }
    }

    /// Whether the runtime can produce pixels for this format.
    pub fn is_rasterizable(self) -> bool {
        matches!(
            self,
            SourceFormat::Jpeg
                | SourceFormat::Png
                | SourceFormat::WebP
                | SourceFormat::Avif
                | SourceFormat::Gif
                | SourceFormat::Bmp
                | SourceFormat::Tiff
        )
    }

    fn is_rejected_container(self) -> bool {
        matches!(
            self,
            SourceFormat::Svg | SourceFormat::Heic | SourceFormat::LivePhoto | SourceFormat::Pdf
        )
    }

    /// The codec `OutputFormat::Auto` resolves to.
    pub fn preferred_codec(self) -> Option<Codec> {
        match self {
            SourceFormat::Jpeg => Some(Codec::Jpeg),
            SourceFormat::Png => Some(Codec::Png),
            SourceFormat::WebP => Some(Codec::WebP),
            SourceFormat::Avif => Some(Codec::Avif),
            SourceFormat::Gif | SourceFormat::Bmp | SourceFormat::Tiff => Some(Codec::Png),
            _ => None,
        }
    }

    /// Ensure the source can be rasterized.
    pub fn ensure_rasterizable(self) -> Result<(), CompressError> {
        if self.is_rasterizable() {
            return Ok(());
        }
        let reason = match self {
            SourceFormat::Svg => "vector graphics (SVG) need an external rasterizer",
            SourceFormat::Heic => "HEIC/HEIF containers are not supported",
            SourceFormat::LivePhoto => "live photo containers are not supported",
            SourceFormat::Pdf => "PDF documents are not images",
            _ => "unrecognized image data",
        };
        Err(CompressError::UnsupportedSourceFormat(reason.to_string()))
    }
}

/// Outcome of format resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFormat {
    pub source: SourceFormat,
    pub codec: Codec,
    pub supports_quality: bool,
}

/// Pick the output codec for a source format and requested output format.
pub fn resolve_output(source: SourceFormat, output: OutputFormat) -> Result<Codec, CompressError> {
    source.ensure_rasterizable()?;
    match output.explicit_codec() {
        Some(codec) => Ok(codec),
        None => source.preferred_codec().ok_or_else(|| {
            CompressError::UnsupportedSourceFormat(format!("no output codec for {source:?}"))
        }),
    }
}

/// Resolve a file name, declared MIME type and requested output format.
///
/// `supports_quality` is answered by `encoder`, so it matches how that
/// encoder will actually treat the chosen codec.
pub fn resolve<E: Encoder + ?Sized>(
    file_name: &str,
    mime: &str,
    output: OutputFormat,
    encoder: &E,
) -> Result<ResolvedFormat, CompressError> {
    let source = SourceFormat::from_name_and_mime(file_name, mime);
    let codec = resolve_output(source, output)?;
    Ok(ResolvedFormat {
        source,
        codec,
        supports_quality: encoder.supports_quality(codec),
    })
}

/// Classify ISO-BMFF (`ftyp`) files: AVIF versus HEIC/HEIF.
fn sniff_iso_bmff(bytes: &[u8]) -> Option<SourceFormat> {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return None;
    }
    let box_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = box_len.clamp(12, bytes.len());
    // major brand at 8..12, minor version at 12..16, compatible brands after
    let mut brands = vec![&bytes[8..12]];
    if end > 16 {
        brands.extend(bytes[16..end].chunks_exact(4));
    }

    if brands.iter().any(|b| *b == b"avif" || *b == b"avis") {
        return Some(SourceFormat::Avif);
    }
    const HEIF_BRANDS: [&[u8]; 9] = [
        b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs", b"mif1",
    ];
    if brands.iter().any(|b| HEIF_BRANDS.contains(b)) {
        return Some(SourceFormat::Heic);
    }
    None
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    (text.starts_with("<?xml") || text.starts_with("<svg") || text.starts_with("<!DOCTYPE svg"))
        && text.contains("<svg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RasterEncoder;

    fn ftyp(major: &[u8; 4], compatible: &[&[u8; 4]]) -> Vec<u8> {
        let len = 16 + compatible.len() * 4;
        let mut bytes = (len as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(b"ftyp");
        bytes.extend_from_slice(major);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        for brand in compatible {
            bytes.extend_from_slice(*brand);
        }
        bytes
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("auto".parse::<OutputFormat>().unwrap(), OutputFormat::Auto);
        assert_eq!("".parse::<OutputFormat>().unwrap(), OutputFormat::Auto);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("image/webp".parse::<OutputFormat>().unwrap(), OutputFormat::WebP);
        assert!(matches!(
            "gif".parse::<OutputFormat>(),
            Err(CompressError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_codec_quality_support() {
        assert!(Codec::Jpeg.supports_quality());
        assert!(Codec::WebP.supports_quality());
        assert!(Codec::Avif.supports_quality());
        assert!(!Codec::Png.supports_quality());
    }

    #[test]
    fn test_codec_mime_and_extension() {
        assert_eq!(Codec::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(Codec::Jpeg.extension(), "jpg");
        assert_eq!(Codec::WebP.mime_type(), "image/webp");
        assert_eq!(Codec::Avif.extension(), "avif");
    }

    #[test]
    fn test_signature_common_formats() {
        assert_eq!(
            SourceFormat::from_signature(&[0xFF, 0xD8, 0xFF, 0xE0]),
            SourceFormat::Jpeg
        );
        assert_eq!(
            SourceFormat::from_signature(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            SourceFormat::Png
        );
        assert_eq!(
            SourceFormat::from_signature(b"RIFF\x24\x00\x00\x00WEBPVP8 "),
            SourceFormat::WebP
        );
        assert_eq!(SourceFormat::from_signature(b"GIF89a\x01\x00"), SourceFormat::Gif);
        assert_eq!(SourceFormat::from_signature(b"II*\0\x08\0\0\0"), SourceFormat::Tiff);
        assert_eq!(SourceFormat::from_signature(&[0x00, 0x01]), SourceFormat::Unknown);
    }

    #[test]
    fn test_signature_iso_bmff() {
        assert_eq!(
            SourceFormat::from_signature(&ftyp(b"avif", &[b"mif1", b"miaf"])),
            SourceFormat::Avif
        );
        assert_eq!(
            SourceFormat::from_signature(&ftyp(b"mif1", &[b"avif"])),
            SourceFormat::Avif
        );
        assert_eq!(
            SourceFormat::from_signature(&ftyp(b"heic", &[b"mif1", b"heic"])),
            SourceFormat::Heic
        );
    }

    #[test]
    fn test_signature_containers_and_vectors() {
        assert_eq!(
            SourceFormat::from_signature(b"PK\x03\x04\x14\x00"),
            SourceFormat::LivePhoto
        );
        assert_eq!(SourceFormat::from_signature(b"%PDF-1.7"), SourceFormat::Pdf);
        assert_eq!(
            SourceFormat::from_signature(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"x\"/>"),
            SourceFormat::Svg
        );
        assert_eq!(SourceFormat::from_signature(b"  <svg width=\"1\"/>"), SourceFormat::Svg);
    }

    #[test]
    fn test_name_and_mime() {
        assert_eq!(
            SourceFormat::from_name_and_mime("photo.bin", "image/jpeg"),
            SourceFormat::Jpeg
        );
        assert_eq!(SourceFormat::from_name_and_mime("Photo.JPG", ""), SourceFormat::Jpeg);
        assert_eq!(SourceFormat::from_name_and_mime("IMG_0001.livp", ""), SourceFormat::LivePhoto);
        assert_eq!(
            SourceFormat::from_name_and_mime("a.png", "image/svg+xml"),
            SourceFormat::Svg
        );
        assert_eq!(SourceFormat::from_name_and_mime("noext", ""), SourceFormat::Unknown);
    }

    #[test]
    fn test_detect_prefers_declared_container() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(SourceFormat::detect(&jpeg, "x.heic", ""), SourceFormat::Heic);
        assert_eq!(SourceFormat::detect(&jpeg, "x.png", ""), SourceFormat::Jpeg);
        assert_eq!(SourceFormat::detect(&[0, 0], "x.png", ""), SourceFormat::Png);
    }

    #[test]
    fn test_resolve_auto_preserves_source() {
        let resolved = resolve("a.jpg", "image/jpeg", OutputFormat::Auto, &RasterEncoder::new()).unwrap();
        assert_eq!(resolved.codec, Codec::Jpeg);
        assert!(resolved.supports_quality);

        let resolved = resolve("a.png", "", OutputFormat::Auto, &RasterEncoder::new()).unwrap();
        assert_eq!(resolved.codec, Codec::Png);
        assert!(!resolved.supports_quality);
    }

    #[test]
    fn test_resolve_auto_without_encoder_maps_to_png() {
        for name in ["a.gif", "a.bmp", "a.tiff"] {
            let resolved = resolve(name, "", OutputFormat::Auto, &RasterEncoder::new()).unwrap();
            assert_eq!(resolved.codec, Codec::Png);
        }
    }

    #[test]
    fn test_resolve_quality_support_follows_encoder() {
        let encoder = RasterEncoder::new();
        for output in [
            OutputFormat::Jpeg,
            OutputFormat::Png,
            OutputFormat::WebP,
            OutputFormat::Avif,
        ] {
            let resolved = resolve("a.png", "image/png", output, &encoder).unwrap();
            assert_eq!(
                resolved.supports_quality,
                encoder.supports_quality(resolved.codec),
                "{output:?}"
            );
        }
    }

    #[cfg(not(feature = "lossy-webp"))]
    #[test]
    fn test_resolve_webp_without_lossy_encoder_has_no_quality() {
        let resolved = resolve("a.jpg", "image/jpeg", OutputFormat::WebP, &RasterEncoder::new()).unwrap();
        assert_eq!(resolved.codec, Codec::WebP);
        assert!(!resolved.supports_quality);
    }

    #[test]
    fn test_resolve_explicit_output() {
        let resolved = resolve("a.png", "image/png", OutputFormat::WebP, &RasterEncoder::new()).unwrap();
        assert_eq!(resolved.source, SourceFormat::Png);
        assert_eq!(resolved.codec, Codec::WebP);
    }

    #[test]
    fn test_resolve_rejects_unrasterizable() {
        for (name, mime) in [
            ("a.svg", "image/svg+xml"),
            ("a.heic", "image/heic"),
            ("a.livp", ""),
            ("a.pdf", "application/pdf"),
            ("a.xyz", ""),
        ] {
            let result = resolve(name, mime, OutputFormat::Jpeg, &RasterEncoder::new());
            assert!(
                matches!(result, Err(CompressError::UnsupportedSourceFormat(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_output_format_serde_names() {
        assert_eq!(OutputFormat::default(), OutputFormat::Auto);
        assert_eq!(OutputFormat::WebP.explicit_codec(), Some(Codec::WebP));
    }
}
