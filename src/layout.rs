//! # Layout
//!
//! A time slice of a contour function at outer time `tstp` is packed into one contiguous
//! buffer of complex matrices, each stored row-major. For `tstp >= 0` the buffer holds three
//! blocks in a fixed order:
//!
//! | block        | matrices   | content                       |
//! |--------------|------------|-------------------------------|
//! | retarded     | `tstp + 1` | `R(tstp, t_j)`, `j = 0..=tstp` |
//! | left-mixing  | `ntau + 1` | `⌈(tstp, τ_j)`, `j = 0..=ntau` |
//! | lesser       | `tstp + 1` | `<(t_i, tstp)`, `i = 0..=tstp` |
//!
//! For the equilibrium slice, `tstp = -1`, the buffer holds a single Matsubara block of
//! `ntau + 1` matrices `M(τ_i)`.
use std::ops::Range;

/// The outer time index of the equilibrium, Matsubara-only, slice
pub const MATSUBARA: isize = -1;

/// The independent components stored in a time slice
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Component {
    /// The imaginary-time branch, only present at `tstp = -1`
    Matsubara,
    /// The retarded component `R(tstp, t_j)`
    Retarded,
    /// The left-mixing component `⌈(tstp, τ_j)`
    LeftMixing,
    /// The lesser component `<(t_i, tstp)`
    Lesser,
}

/// Dimensions of a packed time slice, from which every block boundary follows
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    tstp: isize,
    ntau: usize,
    size1: usize,
    size2: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            tstp: 0,
            ntau: 0,
            size1: 0,
            size2: 0,
        }
    }
}

impl Layout {
    /// The layout of a slice at `tstp` with `ntau + 1` imaginary-time points and `size1 x size2`
    /// matrices
    pub fn new(tstp: isize, ntau: usize, size1: usize, size2: usize) -> Self {
        require!(tstp >= MATSUBARA, "tstp must be at least -1, found {}", tstp);
        Self {
            tstp,
            ntau,
            size1,
            size2,
        }
    }

    /// As [`Layout::new`], or `None` when `tstp < -1` or the buffer length does not fit in
    /// `usize`
    ///
    /// Every block boundary of a layout returned here is bounded by its length, so none of
    /// the range arithmetic can overflow.
    pub fn checked(tstp: isize, ntau: usize, size1: usize, size2: usize) -> Option<Self> {
        if tstp < MATSUBARA {
            return None;
        }
        let points = usize::try_from(tstp.checked_add(1)?).ok()?;
        let tau_points = ntau.checked_add(1)?;
        let matrices = if tstp == MATSUBARA {
            tau_points
        } else {
            points.checked_mul(2)?.checked_add(tau_points)?
        };
        matrices.checked_mul(size1.checked_mul(size2)?)?;
        Some(Self::new(tstp, ntau, size1, size2))
    }

    /// The outer time index
    pub fn tstp(&self) -> isize {
        self.tstp
    }

    /// The last imaginary-time index
    pub fn ntau(&self) -> usize {
        self.ntau
    }

    /// Matrix rows
    pub fn size1(&self) -> usize {
        self.size1
    }

    /// Matrix columns
    pub fn size2(&self) -> usize {
        self.size2
    }

    /// The number of complex entries in one matrix
    pub fn element_size(&self) -> usize {
        self.size1 * self.size2
    }

    /// True for the equilibrium slice, which only stores the Matsubara component
    pub fn is_matsubara(&self) -> bool {
        self.tstp == MATSUBARA
    }

    /// The number of real-time matrices in the retarded and lesser blocks
    fn real_time_points(&self) -> usize {
        (self.tstp + 1) as usize
    }

    /// The total buffer length, in complex entries
    pub fn len(&self) -> usize {
        if self.is_matsubara() {
            (self.ntau + 1) * self.element_size()
        } else {
            (2 * self.real_time_points() + self.ntau + 1) * self.element_size()
        }
    }

    /// True when the buffer holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The components stored in the buffer, in storage order
    pub fn components(&self) -> &'static [Component] {
        if self.is_matsubara() {
            &[Component::Matsubara]
        } else {
            &[Component::Retarded, Component::LeftMixing, Component::Lesser]
        }
    }

    /// The number of matrices in the block storing `component`
    pub fn points(&self, component: Component) -> usize {
        self.check_component(component);
        match component {
            Component::Matsubara | Component::LeftMixing => self.ntau + 1,
            Component::Retarded | Component::Lesser => self.real_time_points(),
        }
    }

    /// The buffer range of the block storing `component`
    pub fn block(&self, component: Component) -> Range<usize> {
        self.check_component(component);
        let es = self.element_size();
        let start = match component {
            Component::Matsubara | Component::Retarded => 0,
            Component::LeftMixing => self.real_time_points() * es,
            Component::Lesser => (self.real_time_points() + self.ntau + 1) * es,
        };
        start..start + self.points(component) * es
    }

    /// The buffer range of matrix `index` within the block storing `component`
    pub fn element(&self, component: Component, index: usize) -> Range<usize> {
        let points = self.points(component);
        require!(
            index < points,
            "index {} is outside the {:?} block of {} matrices",
            index,
            component,
            points
        );
        let es = self.element_size();
        let start = self.block(component).start + index * es;
        start..start + es
    }

    fn check_component(&self, component: Component) {
        require!(
            self.is_matsubara() == (component == Component::Matsubara),
            "the slice at tstp {} does not store the {:?} component",
            self.tstp,
            component
        );
    }
}

#[cfg(test)]
mod test {
    use super::{Component, Layout, MATSUBARA};
    use proptest::prelude::*;

    #[test]
    fn blocks_partition_the_buffer_in_order() {
        let layout = Layout::new(2, 3, 2, 2);
        assert_eq!(layout.len(), (3 * 2 + 4) * 4);
        assert_eq!(layout.block(Component::Retarded), 0..12);
        assert_eq!(layout.block(Component::LeftMixing), 12..28);
        assert_eq!(layout.block(Component::Lesser), 28..40);
        assert_eq!(layout.element(Component::Lesser, 1), 32..36);
    }

    #[test]
    fn matsubara_slice_has_a_single_block() {
        let layout = Layout::new(MATSUBARA, 4, 1, 1);
        assert_eq!(layout.len(), 5);
        assert_eq!(layout.block(Component::Matsubara), 0..5);
    }

    #[test]
    #[should_panic(expected = "does not store")]
    fn real_time_block_is_absent_from_the_matsubara_slice() {
        let _ = Layout::new(MATSUBARA, 4, 1, 1).block(Component::Retarded);
    }

    #[test]
    #[should_panic(expected = "tstp must be at least -1")]
    fn tstp_below_matsubara_is_rejected() {
        let _ = Layout::new(-2, 4, 1, 1);
    }

    #[test]
    fn checked_layout_rejects_lengths_past_usize() {
        assert_eq!(Layout::checked(2, 3, 2, 2), Some(Layout::new(2, 3, 2, 2)));
        assert_eq!(Layout::checked(-2, 3, 1, 1), None);
        assert_eq!(Layout::checked(0, usize::MAX, 1, 1), None);
        assert_eq!(Layout::checked(0, usize::MAX, 0, 0), None);
        assert_eq!(Layout::checked(isize::MAX, 0, 1, 1), None);
        assert_eq!(Layout::checked(1, 1, usize::MAX, 2), None);
        assert_eq!(Layout::checked(MATSUBARA, usize::MAX / 2, 1, 3), None);
    }

    proptest! {
        #[test]
        fn length_follows_the_packing_formula(
            tstp in -1isize..20,
            ntau in 0usize..20,
            size1 in 0usize..5,
            size2 in 0usize..5,
        ) {
            let layout = Layout::new(tstp, ntau, size1, size2);
            let expected = if tstp == -1 {
                (ntau + 1) * size1 * size2
            } else {
                ((tstp as usize + 1) * 2 + ntau + 1) * size1 * size2
            };
            prop_assert_eq!(layout.len(), expected);
        }
    }
}
