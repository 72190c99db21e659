//! Viewport sizing and resize coalescing.
//!
//! Window systems can deliver several resize events between two frames, and
//! a minimized window reports a zero extent. [`ViewportController`] clamps
//! every request to at least 1x1, keeps only the latest one, and hands the
//! scheduler at most one effective resize per tick.

/// Smallest extent a viewport is ever resized to.
pub const MIN_EXTENT: u32 = 1;

/// Drawable size in device pixels. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    width: u32,
    height: u32,
}

impl ViewportSize {
    /// Clamp each dimension to at least [`MIN_EXTENT`].
    pub fn clamped(width: u32, height: u32) -> Self {
        if width < MIN_EXTENT || height < MIN_EXTENT {
            log::debug!(
                "clamping viewport {}x{} to a minimum of {}x{}",
                width,
                height,
                MIN_EXTENT,
                MIN_EXTENT
            );
        }
        Self {
            width: width.max(MIN_EXTENT),
            height: height.max(MIN_EXTENT),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// `[width, height]` as floats, the layout of the compositor's resolution.
    #[inline]
    pub fn resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for ViewportSize {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::clamped(size.width, size.height)
    }
}

/// Anything whose GPU resources follow the viewport size.
pub trait ResizeSink {
    type Error;

    /// Bring every size-dependent resource to `size`.
    ///
    /// Must be idempotent: applying the current size again changes nothing
    /// observable.
    fn apply_viewport(&mut self, size: ViewportSize) -> Result<(), Self::Error>;
}

/// Tracks the applied viewport and coalesces pending resizes.
#[derive(Debug, Clone)]
pub struct ViewportController {
    current: ViewportSize,
    pending: Option<ViewportSize>,
    applied: u64,
}

impl ViewportController {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            current: ViewportSize::clamped(width, height),
            pending: None,
            applied: 0,
        }
    }

    /// Size last applied to the sinks.
    #[inline]
    pub fn current(&self) -> ViewportSize {
        self.current
    }

    /// Number of resizes actually applied.
    #[inline]
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    /// Queue a resize. Later requests replace earlier ones.
    pub fn request(&mut self, width: u32, height: u32) {
        self.pending = Some(ViewportSize::clamped(width, height));
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the queued size if it differs from the applied one.
    pub fn take_pending(&mut self) -> Option<ViewportSize> {
        let next = self.pending.take()?;
        if next == self.current {
            None
        } else {
            Some(next)
        }
    }

    /// Apply a resize to `sink` right away.
    ///
    /// The sink is called even when the size is unchanged, so a sink that
    /// lost its resources (e.g. a lost surface) can rebuild them.
    pub fn on_resize<S: ResizeSink>(
        &mut self,
        width: u32,
        height: u32,
        sink: &mut S,
    ) -> Result<ViewportSize, S::Error> {
        let size = ViewportSize::clamped(width, height);
        self.apply(size, sink)?;
        Ok(size)
    }

    /// Apply a queued resize, if any. At most one per call.
    pub fn apply_pending<S: ResizeSink>(
        &mut self,
        sink: &mut S,
    ) -> Result<Option<ViewportSize>, S::Error> {
        match self.take_pending() {
            Some(size) => {
                self.apply(size, sink)?;
                Ok(Some(size))
            }
            None => Ok(None),
        }
    }

    fn apply<S: ResizeSink>(&mut self, size: ViewportSize, sink: &mut S) -> Result<(), S::Error> {
        sink.apply_viewport(size)?;
        if size != self.current {
            log::debug!(
                "viewport {}x{} -> {}x{}",
                self.current.width,
                self.current.height,
                size.width,
                size.height
            );
            self.applied += 1;
        }
        self.current = size;
        Ok(())
    }
}
