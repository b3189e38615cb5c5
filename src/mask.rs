//! Collision mask lifecycle.
//!
//! The mask is a full-screen field that doubles as the painted canvas and the
//! collision field the boid kernel samples, so it has to match the output
//! surface 1:1. [`CollisionMask::sync`] is the per-frame dirty check:
//!
//! ```text
//! Absent          --sync(w, h)--> Present(w, h)
//! Present(w, h)   --sync(w, h)--> Present(w, h)      (no-op)
//! Present(w, h)   --sync(x, y)--> Present(x, y)      (recreate)
//! ```
//!
//! A replacement is always allocated and bound before the old surface is
//! released.

/// Allocation seam for collision mask surfaces.
///
/// `bind_mask` points both the paint pass (write target) and the boid
/// kernel (read-only sampler) at the surface.
pub trait MaskAllocator {
    /// Backend handle for one mask surface.
    type Mask;

    fn create_mask(&mut self, width: u32, height: u32) -> Self::Mask;
    fn bind_mask(&mut self, mask: &Self::Mask);
    /// Drop whatever mask is bound. Called before the last release.
    fn unbind_mask(&mut self) {}
    fn release_mask(&mut self, mask: Self::Mask);
}

/// What a dirty check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSync {
    /// Sizes matched; nothing changed.
    Unchanged,
    /// No surface existed; one was created.
    Created { width: u32, height: u32 },
    /// The surface was replaced at a new size (or because it was stale).
    Recreated {
        from: (u32, u32),
        to: (u32, u32),
    },
}

#[derive(Debug)]
enum State<M> {
    Absent,
    Present {
        width: u32,
        height: u32,
        id: u64,
        surface: M,
    },
}

/// Owner of the live collision mask surface.
#[derive(Debug)]
pub struct CollisionMask<M> {
    state: State<M>,
    stale: bool,
    next_id: u64,
}

impl<M> Default for CollisionMask<M> {
    fn default() -> Self {
        Self {
            state: State::Absent,
            stale: false,
            next_id: 1,
        }
    }
}

impl<M> CollisionMask<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the mask in line with a `width` x `height` output surface.
    pub fn sync<A>(&mut self, allocator: &mut A, width: u32, height: u32) -> MaskSync
    where
        A: MaskAllocator<Mask = M>,
    {
        let from = match &self.state {
            State::Present {
                width: w,
                height: h,
                ..
            } if *w == width && *h == height && !self.stale => return MaskSync::Unchanged,
            State::Present {
                width: w,
                height: h,
                ..
            } => Some((*w, *h)),
            State::Absent => None,
        };

        let surface = allocator.create_mask(width, height);
        allocator.bind_mask(&surface);

        let id = self.next_id;
        self.next_id += 1;
        self.stale = false;

        let previous = std::mem::replace(
            &mut self.state,
            State::Present {
                width,
                height,
                id,
                surface,
            },
        );
        if let State::Present { surface: old, .. } = previous {
            allocator.release_mask(old);
        }

        match from {
            Some(from) => {
                log::debug!(
                    "collision mask recreated: {}x{} -> {}x{}",
                    from.0,
                    from.1,
                    width,
                    height
                );
                MaskSync::Recreated {
                    from,
                    to: (width, height),
                }
            }
            None => {
                log::debug!("collision mask created: {}x{}", width, height);
                MaskSync::Created { width, height }
            }
        }
    }

    /// Force the next [`sync`](Self::sync) to replace the surface with a
    /// blank one even if the size is unchanged.
    ///
    /// The current surface stays bound until its replacement exists.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Release the surface. The mask is [`Absent`](Self::is_present) afterwards.
    pub fn release<A>(&mut self, allocator: &mut A)
    where
        A: MaskAllocator<Mask = M>,
    {
        if let State::Present { surface, .. } = std::mem::replace(&mut self.state, State::Absent) {
            allocator.unbind_mask();
            allocator.release_mask(surface);
        }
        self.stale = false;
    }

    pub fn is_present(&self) -> bool {
        matches!(self.state, State::Present { .. })
    }

    /// Whether the next sync will recreate the surface regardless of size.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Current size, if a surface exists.
    pub fn size(&self) -> Option<(u32, u32)> {
        match self.state {
            State::Present { width, height, .. } => Some((width, height)),
            State::Absent => None,
        }
    }

    /// Identity of the current surface. Changes on every (re)creation.
    pub fn id(&self) -> Option<u64> {
        match self.state {
            State::Present { id, .. } => Some(id),
            State::Absent => None,
        }
    }

    pub fn surface(&self) -> Option<&M> {
        match &self.state {
            State::Present { surface, .. } => Some(surface),
            State::Absent => None,
        }
    }

    pub fn surface_mut(&mut self) -> Option<&mut M> {
        match &mut self.state {
            State::Present { surface, .. } => Some(surface),
            State::Absent => None,
        }
    }
}
