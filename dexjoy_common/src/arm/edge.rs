//! Level-to-pulse button filter.

/// Converts a held button level into a one-shot press pulse.
///
/// ```text
/// level : F T T F T
/// pulse : F T F F T
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeFilter {
    previous: bool,
}

impl EdgeFilter {
    /// New filter with the button considered released.
    pub const fn new() -> Self {
        Self { previous: false }
    }

    /// Feed one sample. Returns true on a released-to-pressed transition.
    ///
    /// The sample is recorded even when the filter fires.
    #[inline]
    pub fn sample(&mut self, level: bool) -> bool {
        let pulse = level && !self.previous;
        self.previous = level;
        pulse
    }

    /// Last recorded level.
    #[inline]
    pub fn level(&self) -> bool {
        self.previous
    }
}
