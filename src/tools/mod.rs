//! Local file tools: PDF assembly and rasterisation, image conversion, meme
//! captions, QR codes, passwords and unit conversion.
//!
//! Each tool is a plain function over bytes. None of them touch the
//! filesystem; reading inputs and writing outputs is the caller's job.

pub mod convert;
pub mod meme;
pub mod pages;
pub mod password;
pub mod pdf;
pub mod qr;
pub mod queue;
pub mod raster;
pub mod units;

pub use convert::{convert_image, ConvertedImage, ImageFormatTarget};
pub use meme::{generate_meme, CaptionEdge, MemeLayout, MemeOutput, MEME_FILE_NAME};
pub use pages::parse_page_range;
pub use password::{generate_password, DEFAULT_PASSWORD_LENGTH, PASSWORD_CHARSET};
pub use pdf::{images_to_pdf, merge_pdfs, split_pdf, NamedFile, SplitOutput};
pub use qr::{generate_qr, QrOutput};
pub use queue::MergeQueue;
pub use raster::{rasterize_pdf, RasterOptions, RenderedPage};
pub use units::{convert_units, UnitCategory};
