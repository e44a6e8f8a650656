/// Optional per-page text transform between extraction and classification.
/// The intended use is OCR proofreading (e.g. a language-model pass); the
/// shipped default is the identity transform.
pub trait PageRewriter: Send + Sync {
    fn rewrite(&self, text: &str) -> String;
}

/// Pass-through rewriter: output equals input.
pub struct IdentityRewriter;

impl PageRewriter for IdentityRewriter {
    fn rewrite(&self, text: &str) -> String {
        text.to_string()
    }
}
