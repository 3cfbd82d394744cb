//! Rectangular regions that content is flowed into.

use crate::{canvas::Canvas, Pt};
use derive_more::{Deref, DerefMut};

/// Lengths below this are rounding noise, not overflow
const TOLERANCE: f32 = 1e-3;

/// Returned by [Container::advance] when the requested space isn't available
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ContainerFull;

/// How a container's height behaves as content is added
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ContainerKind {
    /// Constant height; advancing past it overflows
    Fixed,
    /// Anchored at its top edge and growing downwards as content is added
    DownExpanding { max_height: Pt },
    /// Anchored at its bottom edge and growing upwards as content is added
    UpExpanding { max_height: Pt },
    /// Grows like [ContainerKind::DownExpanding] but is never composited onto a parent
    /// unless explicitly placed with [Container::place_at]
    Virtual { max_height: Pt },
}

/// A rectangular region with a vertical cursor. Everything drawn into a container is
/// recorded on its own [Canvas] in container-local coordinates and moved into the
/// parent when the container is placed.
#[derive(Debug, Clone)]
pub struct Container {
    kind: ContainerKind,
    /// Left edge, relative to the parent
    pub left: Pt,
    /// The top edge, or the bottom edge for up-expanding containers
    anchor: Pt,
    pub width: Pt,
    height: Pt,
    cursor: Pt,
    canvas: Canvas,
}

impl Container {
    pub fn fixed(left: Pt, top: Pt, width: Pt, height: Pt) -> Container {
        Container::new(ContainerKind::Fixed, left, top, width, height)
    }

    /// A container growing down from `top`, overflowing once it would grow past
    /// `max_height` ([Pt::INFINITY] for no limit)
    pub fn down_expanding(left: Pt, top: Pt, width: Pt, max_height: Pt) -> Container {
        Container::new(
            ContainerKind::DownExpanding { max_height },
            left,
            top,
            width,
            Pt(0.0),
        )
    }

    /// A container growing up from `bottom`
    pub fn up_expanding(left: Pt, bottom: Pt, width: Pt, max_height: Pt) -> Container {
        Container::new(
            ContainerKind::UpExpanding { max_height },
            left,
            bottom,
            width,
            Pt(0.0),
        )
    }

    /// A detached container for measuring content before committing to it
    pub fn virtual_container(width: Pt, max_height: Pt) -> Container {
        Container::new(
            ContainerKind::Virtual { max_height },
            Pt(0.0),
            Pt(0.0),
            width,
            Pt(0.0),
        )
    }

    fn new(kind: ContainerKind, left: Pt, anchor: Pt, width: Pt, height: Pt) -> Container {
        Container {
            kind,
            left,
            anchor,
            width,
            height,
            cursor: Pt(0.0),
            canvas: Canvas::new(),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// How far content has advanced from the top of the container
    pub fn cursor(&self) -> Pt {
        self.cursor
    }

    pub fn height(&self) -> Pt {
        self.height
    }

    /// The largest height the container can reach
    pub fn capacity(&self) -> Pt {
        match self.kind {
            ContainerKind::Fixed => self.height,
            ContainerKind::DownExpanding { max_height }
            | ContainerKind::UpExpanding { max_height }
            | ContainerKind::Virtual { max_height } => max_height,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        self.capacity() - self.cursor
    }

    /// The top edge, relative to the parent
    pub fn top(&self) -> Pt {
        match self.kind {
            ContainerKind::UpExpanding { .. } => self.anchor - self.height,
            _ => self.anchor,
        }
    }

    /// Move the cursor down by `height`. Fails without changing anything if that
    /// would take the cursor past the container's capacity.
    pub fn advance(&mut self, height: Pt) -> Result<(), ContainerFull> {
        let cursor = self.cursor + height;
        if *cursor > *self.capacity() + TOLERANCE {
            return Err(ContainerFull);
        }
        self.advance_unchecked(height);
        Ok(())
    }

    /// Move the cursor without checking the capacity
    pub fn advance_unchecked(&mut self, height: Pt) {
        self.cursor += height;
        if !matches!(self.kind, ContainerKind::Fixed) {
            self.height = self.height.max(self.cursor);
        }
    }

    /// Whether `height` more fits below the cursor
    pub fn fits(&self, height: Pt) -> bool {
        *(self.cursor + height) <= *self.capacity() + TOLERANCE
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.approx_eq(Pt(0.0)) && self.canvas.is_empty()
    }

    /// A down-expanding container starting at the cursor, indented by `left`, that
    /// may grow into the space remaining in this one
    pub fn child(&self, left: Pt, width: Pt) -> Container {
        Container::down_expanding(left, self.cursor, width, self.remaining_height())
    }

    /// Composite an in-flow child created by [Container::child] and advance past it
    pub fn place(&mut self, child: Container) {
        let bottom = child.top() + child.height;
        let (left, top) = (child.left, child.top());
        self.canvas.append(child.canvas, left, top);
        if bottom > self.cursor {
            self.advance_unchecked(bottom - self.cursor);
        }
    }

    /// Composite this container's content onto `parent` at the given position,
    /// without moving the parent's cursor
    pub fn place_at(self, parent: &mut Container, left: Pt, top: Pt) {
        parent.canvas.append(self.canvas, left, top);
    }
}

/// A tentative child: content is rendered into it, and it is either placed into its
/// parent in one piece or dropped with no trace
#[derive(Debug, Deref, DerefMut)]
pub struct MaybeContainer {
    inner: Container,
}

impl MaybeContainer {
    /// A child below the cursor of `parent`, as wide as the parent
    pub fn new(parent: &Container) -> MaybeContainer {
        MaybeContainer {
            inner: parent.child(Pt(0.0), parent.width),
        }
    }

    pub fn place(self, parent: &mut Container) {
        parent.place(self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_containers_overflow_without_moving() {
        let mut container = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(50.0));
        assert!(container.advance(Pt(30.0)).is_ok());
        assert_eq!(container.advance(Pt(30.0)), Err(ContainerFull));
        assert_eq!(container.cursor(), Pt(30.0));
        assert_eq!(container.remaining_height(), Pt(20.0));
        assert!(container.advance(Pt(20.0)).is_ok());
        assert_eq!(container.height(), Pt(50.0));
    }

    #[test]
    fn expanding_containers_grow_up_to_their_limit() {
        let mut down = Container::down_expanding(Pt(0.0), Pt(10.0), Pt(100.0), Pt(40.0));
        down.advance(Pt(25.0)).unwrap();
        assert_eq!(down.height(), Pt(25.0));
        assert_eq!(down.top(), Pt(10.0));
        assert!(down.advance(Pt(20.0)).is_err());

        let mut up = Container::up_expanding(Pt(0.0), Pt(700.0), Pt(100.0), Pt::INFINITY);
        up.advance(Pt(30.0)).unwrap();
        assert_eq!(up.top(), Pt(670.0));
        up.advance(Pt(20.0)).unwrap();
        assert_eq!(up.top(), Pt(650.0));
    }

    #[test]
    fn placing_a_child_advances_the_parent() {
        let mut parent = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));
        parent.advance(Pt(10.0)).unwrap();
        let mut child = parent.child(Pt(5.0), Pt(90.0));
        assert_eq!(child.remaining_height(), Pt(90.0));
        child.advance(Pt(15.0)).unwrap();
        parent.place(child);
        assert_eq!(parent.cursor(), Pt(25.0));
    }

    #[test]
    fn dropped_maybe_containers_leave_no_trace() {
        let mut parent = Container::fixed(Pt(0.0), Pt(0.0), Pt(100.0), Pt(100.0));
        {
            let mut maybe = MaybeContainer::new(&parent);
            maybe.advance(Pt(40.0)).unwrap();
        }
        assert!(parent.is_empty());

        let mut maybe = MaybeContainer::new(&parent);
        maybe.advance(Pt(40.0)).unwrap();
        maybe.place(&mut parent);
        assert_eq!(parent.cursor(), Pt(40.0));
    }
}
