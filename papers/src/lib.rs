pub mod arxiv;
pub mod catalog;
pub mod extract;
pub mod parser;
pub mod source;

pub use arxiv::ArxivLinkExtractor;
pub use parser::ArxivPaperParser;
pub use source::{ArxivHttpSource, PaperError, PaperSource};
