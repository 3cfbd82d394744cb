use crate::{
    content::render_canvas,
    hyphenate::{HyphenationCache, Hyphenators},
    image::{Image, ImageId},
    info::Info,
    layout::{
        context::{Baseline, PassState, RenderOptions, Warning},
        BreakKind, Chain, ChainOutcome, PrepareContext,
    },
    metrics::{FontSet, StandardFont},
    outline::{Anchor, Outline},
    page::{render_page, Page, Resources},
    canvas::CanvasItem,
    rect::Rect,
    refs::{ObjectReferences, RefType},
    style::{StyleChain, StyleSheet},
    template::DocumentPart,
    PDFError, Pt,
};
use id_arena::Arena;
use pdf_writer::{
    types::{ActionType, AnnotationType},
    Finish, Name, Pdf, Ref,
};
use std::{collections::HashMap, io::Write};

/// A document is the main object: it holds the content (a list of [DocumentPart]s)
/// and everything needed to lay it out. [Document::render] lays it out into pages,
/// which [RenderedDocument::write] then writes as a PDF.
pub struct Document {
    pub stylesheet: StyleSheet,
    pub fonts: FontSet,
    pub images: Arena<Image>,
    pub info: Option<Info>,
    pub hyphenators: Hyphenators,
    pub options: RenderOptions,
    parts: Vec<DocumentPart>,
}

impl Default for Document {
    /// A document with the built-in style sheet and the Courier family
    fn default() -> Self {
        let mut fonts = FontSet::new();
        fonts.add("Courier", StandardFont::courier());
        Document::new(fonts)
    }
}

impl Document {
    pub fn new(fonts: FontSet) -> Document {
        Document {
            stylesheet: StyleSheet::default(),
            fonts,
            images: Arena::new(),
            info: None,
            hyphenators: Hyphenators::default(),
            options: RenderOptions::default(),
            parts: Vec::new(),
        }
    }

    /// Sets information about the document. If not provided, no information block will be
    /// written to the PDF
    pub fn set_info(&mut self, info: Info) {
        self.info = Some(info);
    }

    /// Add an image to the document. Images are stored once and can be drawn by any
    /// number of [ImageFlowable](crate::ImageFlowable)s.
    pub fn add_image(&mut self, image: Image) -> ImageId {
        self.images.alloc(image)
    }

    /// Append a part; parts are laid out in the order they are added
    pub fn add_part(&mut self, part: DocumentPart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[DocumentPart] {
        &self.parts
    }

    /// Lay out the document, repeating passes until page counts and references
    /// stop changing
    pub fn render(&self) -> Result<RenderedDocument<'_>, PDFError> {
        self.render_seeded(None)
    }

    /// Like [Document::render], starting from the page counts and references of an
    /// earlier render (see [RenderedDocument::baseline]). A good seed saves passes.
    pub fn render_seeded(
        &self,
        seed: Option<Baseline>,
    ) -> Result<RenderedDocument<'_>, PDFError> {
        let styles = StyleChain::root(&self.stylesheet);
        let mut hyphenation = HyphenationCache::default();
        let mut previous = seed;

        for pass in 1..=self.options.max_passes {
            log::info!("starting render pass {pass}");
            let output = self.render_pass(previous.as_ref(), &mut hyphenation, &styles)?;
            let baseline = Baseline {
                part_pages: output.part_pages,
                references: output.state.references.clone(),
            };
            if previous.as_ref() == Some(&baseline) {
                log::info!(
                    "layout converged after {pass} passes, {} pages",
                    output.pages.len()
                );
                let PassState {
                    warnings,
                    unresolved,
                    outline,
                    ..
                } = output.state;
                return Ok(RenderedDocument {
                    document: self,
                    pages: output.pages,
                    report: RenderReport {
                        passes: pass,
                        warnings,
                        unresolved_references: unresolved.into_iter().collect(),
                    },
                    outline,
                    baseline,
                });
            }
            log::debug!("pass {pass} changed page counts or references");
            previous = Some(baseline);
        }

        Err(PDFError::NotConverged {
            passes: self.options.max_passes,
        })
    }

    fn render_pass(
        &self,
        previous: Option<&Baseline>,
        hyphenation: &mut HyphenationCache,
        styles: &StyleChain<'_>,
    ) -> Result<PassOutput, PDFError> {
        let mut state = PassState::default();
        {
            let mut ctx = PrepareContext::new(&mut state);
            for part in self.parts.iter() {
                for flowable in part.flowables.iter() {
                    flowable.prepare(&mut ctx)?;
                }
            }
        }

        let mut resources = Resources {
            fonts: &self.fonts,
            images: &self.images,
            options: &self.options,
            hyphenators: &self.hyphenators,
            hyphenation,
            previous,
        };
        let mut pages: Vec<Page> = Vec::new();
        let mut part_pages = Vec::with_capacity(self.parts.len());

        for part in self.parts.iter() {
            let template = &part.template;
            let first = pages.len();
            let mut chain = Chain::new(part.flowables.clone());
            let mut next = BreakKind::Any;

            loop {
                let number = pages.len() + 1;
                if !on_side(next, number) {
                    log::debug!("blank page {number} before a {next:?} page");
                    let label = template.number_format.format(number);
                    pages.push(Page::blank(template.size, number, label));
                    continue;
                }

                let rendered =
                    render_page(template, &mut chain, number, &mut resources, &mut state, styles)?;
                pages.push(rendered.page);
                next = BreakKind::Any;
                match rendered.outcome {
                    // floats that didn't fit yet still need a page
                    ChainOutcome::Done if state.pending_floats.is_empty() => break,
                    ChainOutcome::PageBreak(kind) => next = kind,
                    _ if !rendered.progressed => {
                        return Err(PDFError::NoProgress {
                            part: part.name.clone(),
                            page: number,
                        })
                    }
                    _ => {}
                }
            }

            if let Some(kind) = part.end_at {
                let number = pages.len() + 1;
                if !on_side(kind, number) {
                    let label = template.number_format.format(number);
                    pages.push(Page::blank(template.size, number, label));
                }
            }
            log::debug!("part `{}` takes {} pages", part.name, pages.len() - first);
            part_pages.push(pages.len() - first);
        }

        Ok(PassOutput {
            pages,
            part_pages,
            state,
        })
    }
}

/// Whether the page numbered `number` is of the requested kind. Page 1 is a
/// right-hand page.
fn on_side(kind: BreakKind, number: usize) -> bool {
    match kind {
        BreakKind::Any => true,
        BreakKind::Left => number % 2 == 0,
        BreakKind::Right => number % 2 == 1,
    }
}

struct PassOutput {
    pages: Vec<Page>,
    part_pages: Vec<usize>,
    state: PassState,
}

/// What happened while rendering, for the final pass
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    pub passes: usize,
    pub warnings: Vec<Warning>,
    /// Ids that were referenced but never defined; they show as "??"
    pub unresolved_references: Vec<String>,
}

/// A laid out document, ready to be written
pub struct RenderedDocument<'d> {
    document: &'d Document,
    pub pages: Vec<Page>,
    pub report: RenderReport,
    pub outline: Outline,
    baseline: Baseline,
}

impl<'d> RenderedDocument<'d> {
    /// False when references could not be resolved. The document can still be
    /// written, with placeholders in their place.
    pub fn succeeded(&self) -> bool {
        self.report.unresolved_references.is_empty()
    }

    /// The converged page counts and references, for seeding a later render
    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Where each named destination ended up
    fn anchors(&self) -> HashMap<String, Anchor> {
        let mut anchors = HashMap::new();
        for (page_index, page) in self.pages.iter().enumerate() {
            for item in page.canvas.items() {
                if let CanvasItem::Destination { name, x, top } = item {
                    anchors.entry(name.clone()).or_insert(Anchor {
                        page_index,
                        x: *x,
                        top: *top,
                    });
                }
            }
        }
        anchors
    }

    /// Write the entire document to the writer. Note: although this can write to arbitrary
    /// streams, the entire document is "rendered" in memory first. If you have a very large
    /// document, this could allocate a significant amount of memory. This limitation is due
    /// to the underlying pdf-writer implementation.
    pub fn write<W: Write>(&self, mut w: W) -> Result<(), PDFError> {
        let document = self.document;
        let mut refs = ObjectReferences::new();

        let catalog_id = refs.gen(RefType::Catalog);
        let page_tree_id = refs.gen(RefType::PageTree);

        let mut writer = Pdf::new();
        if let Some(info) = &document.info {
            info.write(&mut refs, &mut writer);
        }

        let page_refs: Vec<Ref> = (0..self.pages.len())
            .map(|i| refs.gen(RefType::Page(i)))
            .collect();
        writer
            .pages(page_tree_id)
            .count(page_refs.len() as i32)
            .kids(page_refs.iter().copied());

        for (id, face) in document.fonts.iter() {
            face.write(&mut refs, id.index(), &mut writer)?;
        }
        for (id, image) in document.images.iter() {
            image.write(&mut refs, id.index(), &mut writer);
        }

        let anchors = self.anchors();
        for (page_index, page) in self.pages.iter().enumerate() {
            self.write_page(&mut refs, page_index, page, &page_refs, &anchors, &mut writer)?;
        }

        let heights: Vec<Pt> = self.pages.iter().map(|page| page.size.height).collect();
        let outline = self.outline.write(&mut refs, &anchors, &heights, &mut writer);

        let mut catalog = writer.catalog(catalog_id);
        catalog.pages(page_tree_id);
        if let Some(outline) = outline {
            catalog.outlines(outline);
        }
        catalog.finish();

        w.write_all(writer.finish().as_slice()).map_err(Into::into)
    }

    fn write_page(
        &self,
        refs: &mut ObjectReferences,
        page_index: usize,
        page: &Page,
        page_refs: &[Ref],
        anchors: &HashMap<String, Anchor>,
        writer: &mut Pdf,
    ) -> Result<(), PDFError> {
        let document = self.document;
        let height = page.size.height;
        let content_id = refs.gen(RefType::ContentForPage(page_index));
        let annotations = self.write_links(refs, page_index, page, page_refs, anchors, writer);

        let mut page_writer = writer.page(page_refs[page_index]);
        page_writer.media_box(
            Rect::from_top_left(Pt(0.0), Pt(0.0), page.size.width, height, height).into(),
        );
        page_writer.parent(refs.get_or_gen(RefType::PageTree));

        let mut resources = page_writer.resources();
        let mut resource_fonts = resources.fonts();
        for (id, _) in document.fonts.iter() {
            if let Some(font) = refs.get(RefType::Font(id.index())) {
                resource_fonts.pair(Name(format!("F{}", id.index()).as_bytes()), font);
            }
        }
        resource_fonts.finish();
        let mut resource_xobjects = resources.x_objects();
        for (id, _) in document.images.iter() {
            if let Some(image) = refs.get(RefType::Image(id.index())) {
                resource_xobjects.pair(Name(format!("I{}", id.index()).as_bytes()), image);
            }
        }
        resource_xobjects.finish();
        resources.finish();

        if !annotations.is_empty() {
            page_writer.annotations(annotations.iter().copied());
        }
        page_writer.contents(content_id);
        page_writer.finish();

        let content = render_canvas(&page.canvas, height, &document.fonts)?;
        writer.stream(content_id, content.as_slice());
        Ok(())
    }

    /// Write a link annotation for every link on the page whose target was placed
    fn write_links(
        &self,
        refs: &mut ObjectReferences,
        page_index: usize,
        page: &Page,
        page_refs: &[Ref],
        anchors: &HashMap<String, Anchor>,
        writer: &mut Pdf,
    ) -> Vec<Ref> {
        let mut ids = Vec::new();
        for item in page.canvas.items() {
            let CanvasItem::Link {
                target,
                x,
                top,
                width,
                height,
            } = item
            else {
                continue;
            };
            let Some(anchor) = anchors.get(target) else {
                log::debug!("link to `{target}` has no destination");
                continue;
            };
            let Some(target_page) = self.pages.get(anchor.page_index) else {
                continue;
            };

            let id = refs.gen(RefType::Annotation(page_index, ids.len()));
            let rect = Rect::from_top_left(*x, *top, *width, *height, page.size.height);
            let mut annotation = writer.annotation(id);
            annotation
                .subtype(AnnotationType::Link)
                .rect(rect.into())
                .border(0.0, 0.0, 0.0, None);
            annotation
                .action()
                .action_type(ActionType::GoTo)
                .destination()
                .page(page_refs[anchor.page_index])
                .xyz(*anchor.x, *(target_page.size.height - anchor.top), None);
            annotation.finish();
            ids.push(id);
        }
        ids
    }
}
