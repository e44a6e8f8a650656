pub mod ocr;
pub mod raster;
pub mod rewrite;

pub use ocr::{TesseractExtractor, TextExtractor};
pub use raster::{PageRasterizer, PopplerRasterizer};
pub use rewrite::{IdentityRewriter, PageRewriter};

/// Raw OCR text for one page. Page numbers are 1-based and contiguous,
/// matching rasterized page order exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}
