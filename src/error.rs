use thiserror::Error;

/// All errors that the crate can generate.
///
/// Running out of room in a container is *not* an error; see
/// [LayoutResult](crate::layout::LayoutResult). Everything here aborts the render.
#[derive(Error, Debug)]
pub enum PDFError {
    #[error(transparent)]
    /// An I/O error occurred
    Io(#[from] std::io::Error),

    #[error(transparent)]
    /// [owned_ttf_parser] failed to parse the font
    FaceParsingError(#[from] owned_ttf_parser::FaceParsingError),

    #[error(transparent)]
    /// [image] failed to parse the image
    Image(#[from] image::ImageError),

    #[error(transparent)]
    /// A style attribute could not be resolved to a value of the expected type
    Style(#[from] StyleError),

    #[error("no font registered for family `{family}`")]
    /// The style referenced a font family that was never added to the [FontSet](crate::FontSet)
    FontNotFound { family: String },

    #[error("flowable `{flowable}` was resumed with state belonging to another flowable")]
    /// A flowable received a resume state it did not produce
    StateMismatch { flowable: &'static str },

    #[error("document did not converge after {passes} passes")]
    /// Page numbers or references kept changing between render passes
    NotConverged { passes: usize },

    #[error("page {page} still requested a reflow after {reflows} attempts")]
    /// A page kept discovering new floats or footnotes
    ReflowLimit { page: usize, reflows: usize },

    #[error("part `{part}` made no progress on page {page}; its content cannot fit on an empty page")]
    /// A fresh page was unable to hold any content at all
    NoProgress { part: String, page: usize },
}

/// Errors raised while resolving style attributes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    #[error("style attribute `{attribute}` expects {expected}, found {found}")]
    WrongType {
        attribute: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
