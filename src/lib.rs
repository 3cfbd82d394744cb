//! Lay out flowing, styled text on pages and write the result as a PDF.
//!
//! A [Document] holds [DocumentPart]s, each a list of flowables set on pages of one
//! [PageTemplate]. [Document::render] lays the document out, repeating passes until
//! page numbers and cross references settle, and [RenderedDocument::write] writes it.
//!
//! ```
//! use pdf_flow::{layout::Paragraph, pagesize::A5, Document, DocumentPart, PageTemplate};
//! use pdf_flow::{layout::Margins, Pt};
//!
//! let mut body = DocumentPart::new("body", PageTemplate::new(A5, Margins::all(Pt(36.0))));
//! body.push(Paragraph::new("Hello, world!"));
//!
//! let mut document = Document::default();
//! document.add_part(body);
//! let rendered = document.render().expect("can lay out the document");
//! assert_eq!(rendered.pages.len(), 1);
//!
//! let mut pdf = Vec::new();
//! rendered.write(&mut pdf).expect("can write the document");
//! ```

mod canvas;
pub use canvas::*;

mod colour;
pub use colour::*;

mod content;

mod document;
pub use document::*;

mod font;
pub use font::*;

mod hyphenate;
pub use hyphenate::*;

mod image;
pub use self::image::*;

mod info;
pub use info::*;

/// Flowables, the containers they are laid out in, and the layout context
pub mod layout;

mod metrics;
pub use metrics::*;

mod outline;
pub use outline::{Outline, OutlineEntry};

mod page;
pub use page::*;

pub mod pagesize;

mod rect;
pub use rect::*;

pub(crate) mod refs;

mod structure;
pub use structure::*;

mod style;
pub use style::*;

mod template;
pub use template::*;

mod text;
pub use text::*;

mod units;
pub use units::*;

mod error;
pub use error::*;

/// Re-export PDF-writer functionality, mostly for custom [pdf_writer::Content] generation
pub use pdf_writer;
