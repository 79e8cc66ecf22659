//! # Views
//!
//! A view borrows the blocks of a time slice without owning them. The blocks may be the three
//! regions of one packed [`TimeSlice`](crate::TimeSlice) buffer, or three separate runs inside
//! the storage of a [`HermMatrix`](crate::HermMatrix). All reads and all of the in-place
//! algebra operate through the blocks, so a view supports the same operations as the owner.
//!
//! The borrow ties the lifetime of a view to its owner: a view cannot outlive the storage it
//! refers to, and no other access to that storage is possible while a mutable view exists.
use crate::{
    access::{ContourRead, ContourWrite, TimestepSource},
    layout::{Component, Layout},
    statistics::Statistics,
    timestep::TimeSlice,
};
use num_complex::Complex64;

#[derive(Copy, Clone, Debug)]
enum Blocks<'a> {
    Matsubara(&'a [Complex64]),
    RealTime {
        ret: &'a [Complex64],
        tv: &'a [Complex64],
        les: &'a [Complex64],
    },
}

#[derive(Debug)]
enum BlocksMut<'a> {
    Matsubara(&'a mut [Complex64]),
    RealTime {
        ret: &'a mut [Complex64],
        tv: &'a mut [Complex64],
        les: &'a mut [Complex64],
    },
}

fn missing_component(layout: &Layout, component: Component) -> ! {
    panic!(
        "the slice at tstp {} does not store the {:?} component",
        layout.tstp(),
        component
    )
}

fn check_block(layout: &Layout, component: Component, len: usize) {
    require!(
        layout.block(component).len() == len,
        "the {:?} block of a slice laid out as {:?} holds {} entries, found {}",
        component,
        layout,
        layout.block(component).len(),
        len
    );
}

/// An immutable borrowed time slice
#[derive(Copy, Clone, Debug)]
pub struct TimeSliceView<'a> {
    layout: Layout,
    statistics: Statistics,
    blocks: Blocks<'a>,
}

impl<'a> TimeSliceView<'a> {
    /// A view of a buffer packed as described by `layout`
    pub fn packed(layout: Layout, statistics: Statistics, data: &'a [Complex64]) -> Self {
        require!(
            data.len() == layout.len(),
            "a slice laid out as {:?} needs {} entries, found {}",
            layout,
            layout.len(),
            data.len()
        );
        let blocks = if layout.is_matsubara() {
            Blocks::Matsubara(data)
        } else {
            let (ret, rest) = data.split_at(layout.block(Component::Retarded).len());
            let (tv, les) = rest.split_at(layout.block(Component::LeftMixing).len());
            Blocks::RealTime { ret, tv, les }
        };
        Self {
            layout,
            statistics,
            blocks,
        }
    }

    /// A view of the Matsubara slice stored in `mat`
    pub fn from_matsubara(layout: Layout, statistics: Statistics, mat: &'a [Complex64]) -> Self {
        check_block(&layout, Component::Matsubara, mat.len());
        Self {
            layout,
            statistics,
            blocks: Blocks::Matsubara(mat),
        }
    }

    /// A view of a real-time slice with separately stored blocks
    pub fn from_blocks(
        layout: Layout,
        statistics: Statistics,
        ret: &'a [Complex64],
        tv: &'a [Complex64],
        les: &'a [Complex64],
    ) -> Self {
        check_block(&layout, Component::Retarded, ret.len());
        check_block(&layout, Component::LeftMixing, tv.len());
        check_block(&layout, Component::Lesser, les.len());
        Self {
            layout,
            statistics,
            blocks: Blocks::RealTime { ret, tv, les },
        }
    }

    /// Copy the viewed data into a newly allocated slice
    pub fn to_timeslice(&self) -> TimeSlice {
        let mut slice = TimeSlice::with_shape(
            self.layout.tstp(),
            self.layout.ntau(),
            self.layout.size1(),
            self.layout.size2(),
            self.statistics,
        );
        slice.set_timestep(self.layout.tstp(), self);
        slice
    }
}

impl ContourRead for TimeSliceView<'_> {
    fn layout(&self) -> Layout {
        self.layout
    }

    fn statistics(&self) -> Statistics {
        self.statistics
    }

    fn block(&self, component: Component) -> &[Complex64] {
        match (component, &self.blocks) {
            (Component::Matsubara, Blocks::Matsubara(mat)) => mat,
            (Component::Retarded, Blocks::RealTime { ret, .. }) => ret,
            (Component::LeftMixing, Blocks::RealTime { tv, .. }) => tv,
            (Component::Lesser, Blocks::RealTime { les, .. }) => les,
            _ => missing_component(&self.layout, component),
        }
    }
}

impl TimestepSource for TimeSliceView<'_> {
    fn timestep_view(&self, tstp: isize) -> TimeSliceView<'_> {
        require!(
            tstp == self.layout.tstp(),
            "the view holds tstp {}, not {}",
            self.layout.tstp(),
            tstp
        );
        *self
    }
}

/// A mutable borrowed time slice
#[derive(Debug)]
pub struct TimeSliceViewMut<'a> {
    layout: Layout,
    statistics: Statistics,
    blocks: BlocksMut<'a>,
}

impl<'a> TimeSliceViewMut<'a> {
    /// A mutable view of a buffer packed as described by `layout`
    pub fn packed(layout: Layout, statistics: Statistics, data: &'a mut [Complex64]) -> Self {
        require!(
            data.len() == layout.len(),
            "a slice laid out as {:?} needs {} entries, found {}",
            layout,
            layout.len(),
            data.len()
        );
        let blocks = if layout.is_matsubara() {
            BlocksMut::Matsubara(data)
        } else {
            let (ret, rest) = data.split_at_mut(layout.block(Component::Retarded).len());
            let (tv, les) = rest.split_at_mut(layout.block(Component::LeftMixing).len());
            BlocksMut::RealTime { ret, tv, les }
        };
        Self {
            layout,
            statistics,
            blocks,
        }
    }

    /// A mutable view of the Matsubara slice stored in `mat`
    pub fn from_matsubara(
        layout: Layout,
        statistics: Statistics,
        mat: &'a mut [Complex64],
    ) -> Self {
        check_block(&layout, Component::Matsubara, mat.len());
        Self {
            layout,
            statistics,
            blocks: BlocksMut::Matsubara(mat),
        }
    }

    /// A mutable view of a real-time slice with separately stored blocks
    pub fn from_blocks(
        layout: Layout,
        statistics: Statistics,
        ret: &'a mut [Complex64],
        tv: &'a mut [Complex64],
        les: &'a mut [Complex64],
    ) -> Self {
        check_block(&layout, Component::Retarded, ret.len());
        check_block(&layout, Component::LeftMixing, tv.len());
        check_block(&layout, Component::Lesser, les.len());
        Self {
            layout,
            statistics,
            blocks: BlocksMut::RealTime { ret, tv, les },
        }
    }

    /// Reborrow as an immutable view
    pub fn as_view(&self) -> TimeSliceView<'_> {
        let blocks = match &self.blocks {
            BlocksMut::Matsubara(mat) => Blocks::Matsubara(mat),
            BlocksMut::RealTime { ret, tv, les } => Blocks::RealTime { ret, tv, les },
        };
        TimeSliceView {
            layout: self.layout,
            statistics: self.statistics,
            blocks,
        }
    }
}

impl ContourRead for TimeSliceViewMut<'_> {
    fn layout(&self) -> Layout {
        self.layout
    }

    fn statistics(&self) -> Statistics {
        self.statistics
    }

    fn block(&self, component: Component) -> &[Complex64] {
        match (component, &self.blocks) {
            (Component::Matsubara, BlocksMut::Matsubara(mat)) => mat,
            (Component::Retarded, BlocksMut::RealTime { ret, .. }) => ret,
            (Component::LeftMixing, BlocksMut::RealTime { tv, .. }) => tv,
            (Component::Lesser, BlocksMut::RealTime { les, .. }) => les,
            _ => missing_component(&self.layout, component),
        }
    }
}

impl ContourWrite for TimeSliceViewMut<'_> {
    fn block_mut(&mut self, component: Component) -> &mut [Complex64] {
        match (component, &mut self.blocks) {
            (Component::Matsubara, BlocksMut::Matsubara(mat)) => mat,
            (Component::Retarded, BlocksMut::RealTime { ret, .. }) => ret,
            (Component::LeftMixing, BlocksMut::RealTime { tv, .. }) => tv,
            (Component::Lesser, BlocksMut::RealTime { les, .. }) => les,
            _ => missing_component(&self.layout, component),
        }
    }
}

impl TimestepSource for TimeSliceViewMut<'_> {
    fn timestep_view(&self, tstp: isize) -> TimeSliceView<'_> {
        require!(
            tstp == self.layout.tstp(),
            "the view holds tstp {}, not {}",
            self.layout.tstp(),
            tstp
        );
        self.as_view()
    }
}
