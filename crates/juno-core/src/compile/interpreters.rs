//! Interpreter output formats.

use crate::cell::Format;

/// The method chain that decodes an interpreter's output file.
pub fn decode_method(format: Format) -> &'static str {
    match format {
        Format::Arrow => ".arrow()",
        Format::Parquet => ".parquet()",
        Format::Json => ".json()",
        Format::Blob => ".blob()",
        Format::Text => ".text()",
        Format::Xml => ".xml()",
        Format::Html => ".text().then((text) => html({raw: [text]}))",
        Format::Buffer => ".arrayBuffer()",
        Format::Jpeg | Format::Png | Format::Gif | Format::Svg | Format::Webp => ".image()",
        Format::Csv => ".csv({typed: true})",
        Format::Tsv => ".tsv({typed: true})",
    }
}

/// File extension used when caching an interpreter's output.
pub fn file_extension(format: Option<Format>) -> &'static str {
    match format {
        Some(Format::Html | Format::Text) => ".txt",
        Some(Format::Jpeg) => ".jpg",
        Some(Format::Json) => ".json",
        Some(Format::Arrow) => ".arrow",
        Some(Format::Parquet) => ".parquet",
        Some(Format::Csv) => ".csv",
        Some(Format::Tsv) => ".tsv",
        Some(Format::Png) => ".png",
        Some(Format::Gif) => ".gif",
        Some(Format::Svg) => ".svg",
        Some(Format::Webp) => ".webp",
        Some(Format::Xml) => ".xml",
        Some(Format::Blob | Format::Buffer) | None => ".bin",
    }
}
