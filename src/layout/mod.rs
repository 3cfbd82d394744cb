//! Flowables and the containers they are laid out in.
//!
//! Everything placed on a page is a [Flowable]. A flowable renders itself into a
//! [Container] and reports back through a [LayoutResult]: it was placed, it ran out
//! of room (with a [FlowableState] to continue from on the next container), it asked
//! for a page break, or the page has to be laid out again to make room for a float or
//! footnote. A [Chain] feeds the flowables of a document part through one container
//! after another.
//!
//! ```
//! use pdf_flow::layout::{Flowable, Group, Paragraph, Spacer};
//! use pdf_flow::Pt;
//! use std::rc::Rc;
//!
//! let flowables: Vec<Rc<dyn Flowable>> = vec![
//!     Rc::new(Paragraph::new("first")),
//!     Rc::new(Spacer::new(Pt(6.0))),
//!     Rc::new(Paragraph::new("second")),
//! ];
//! let group = Group::new(flowables).with_style("quote");
//! assert_eq!(group.flowables().len(), 3);
//! ```

pub(crate) mod chain;
mod container;
pub mod context;
mod flowable;
pub(crate) mod group;
mod line;
mod margins;
mod paragraph;
pub(crate) mod word;

pub use chain::{Chain, ChainOutcome};
pub use container::*;
pub use context::{LayoutContext, PrepareContext, RenderOptions, Warning};
pub use flowable::*;
pub use group::{Float, Group, Inseparable, Labeled, List};
pub use line::{LineSpacing, TabAlign, TabPosition, TabStop, TextAlign};
pub use margins::*;
pub use paragraph::*;
