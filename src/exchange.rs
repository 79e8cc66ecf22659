//! # Exchange between ranks
//!
//! Slices computed on different ranks are combined through a [`Communicator`], which provides
//! the point-to-point and collective primitives on flat complex buffers. The data types never
//! query the process group themselves: a [`TimesliceExchange`] is handed the communicator
//! explicitly and moves the packed buffers of slices through it.
//!
//! [`LocalGroup`] provides an in-process group, one [`LocalCommunicator`] per rank, backed by
//! channels. Each communicator is moved onto its own thread.
//!
//! ```
//! use keldysh_contour::{LocalGroup, TimeSlice, TimesliceExchange};
//! use num_complex::Complex64;
//!
//! let group = LocalGroup::new(2);
//! let sums = std::thread::scope(|scope| {
//!     let handles: Vec<_> = group
//!         .into_iter()
//!         .map(|comm| {
//!             scope.spawn(move || {
//!                 let mut slice = TimeSlice::new(0, 1, 1);
//!                 slice.data_mut().fill(Complex64::new(1., 0.));
//!                 TimesliceExchange::new(&comm).reduce(&mut slice, 0).unwrap();
//!                 slice
//!             })
//!         })
//!         .collect();
//!     handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
//! });
//! assert!(sums[0].data().iter().all(|x| *x == Complex64::new(2., 0.)));
//! ```
use crate::{
    access::ContourRead, error::ContourError, moving::MovingTimeSlice, timestep::TimeSlice,
    Result,
};
use num_complex::Complex64;
use std::{
    cell::RefCell,
    sync::mpsc::{channel, Receiver, Sender},
};

/// Point-to-point and collective operations on complex buffers within a group of ranks
///
/// Every call blocks until the peers it depends on have taken part.
pub trait Communicator {
    /// The rank of the caller within the group
    fn rank(&self) -> usize;
    /// The number of ranks in the group
    fn size(&self) -> usize;
    /// Send `data` to rank `dest`, labelled with `tag`
    fn send(&self, data: &[Complex64], dest: usize, tag: i32) -> Result<()>;
    /// Receive a buffer labelled with `tag` from rank `source` into `data`
    fn recv(&self, data: &mut [Complex64], source: usize, tag: i32) -> Result<()>;
    /// Overwrite `data` on every rank with the contents on `root`
    fn broadcast(&self, data: &mut [Complex64], root: usize) -> Result<()>;
    /// Sum `data` over all ranks, element-wise, into the buffer on `root`
    ///
    /// The buffers on the other ranks are left unchanged.
    fn reduce_sum(&self, data: &mut [Complex64], root: usize) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Channel {
    Tagged(i32),
    Broadcast,
    Reduce,
}

#[derive(Debug)]
struct Message {
    source: usize,
    channel: Channel,
    payload: Vec<Complex64>,
}

/// Constructor for an in-process group of ranks
pub struct LocalGroup;

impl LocalGroup {
    /// Create the communicators of a group of `size` ranks, ordered by rank
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Vec<LocalCommunicator> {
        let (senders, receivers): (Vec<Sender<Message>>, Vec<Receiver<Message>>) =
            (0..size).map(|_| channel()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| LocalCommunicator {
                rank,
                peers: senders
                    .iter()
                    .enumerate()
                    .map(|(peer, sender)| (peer != rank).then(|| sender.clone()))
                    .collect(),
                receiver,
                pending: RefCell::new(Vec::new()),
            })
            .collect()
    }
}

/// One rank of a [`LocalGroup`]
///
/// Messages which arrive ahead of the call that consumes them are held back, so messages
/// from one source on one channel are always consumed in the order they were sent.
#[derive(Debug)]
pub struct LocalCommunicator {
    rank: usize,
    /// Senders to every other rank, `None` at the caller's own rank
    peers: Vec<Option<Sender<Message>>>,
    receiver: Receiver<Message>,
    pending: RefCell<Vec<Message>>,
}

impl LocalCommunicator {
    fn check_rank(&self, rank: usize) -> Result<()> {
        if rank < self.peers.len() {
            Ok(())
        } else {
            Err(ContourError::Rank {
                rank,
                size: self.peers.len(),
            })
        }
    }

    fn post(&self, dest: usize, channel: Channel, payload: Vec<Complex64>) -> Result<()> {
        self.check_rank(dest)?;
        let message = Message {
            source: self.rank,
            channel,
            payload,
        };
        match &self.peers[dest] {
            Some(sender) => sender
                .send(message)
                .map_err(|_| ContourError::Disconnected { rank: dest }),
            None => {
                self.pending.borrow_mut().push(message);
                Ok(())
            }
        }
    }

    fn take(&self, source: usize, channel: Channel) -> Result<Vec<Complex64>> {
        self.check_rank(source)?;
        let matches = |message: &Message| message.source == source && message.channel == channel;
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(position) = pending.iter().position(matches) {
                return Ok(pending.remove(position).payload);
            }
        }
        loop {
            let message = self
                .receiver
                .recv()
                .map_err(|_| ContourError::Disconnected { rank: source })?;
            if matches(&message) {
                return Ok(message.payload);
            }
            self.pending.borrow_mut().push(message);
        }
    }

    fn take_into(&self, data: &mut [Complex64], source: usize, channel: Channel) -> Result<()> {
        let payload = self.take(source, channel)?;
        if payload.len() != data.len() {
            return Err(ContourError::PayloadLength {
                expected: data.len(),
                found: payload.len(),
            });
        }
        data.copy_from_slice(&payload);
        Ok(())
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, data: &[Complex64], dest: usize, tag: i32) -> Result<()> {
        self.post(dest, Channel::Tagged(tag), data.to_vec())
    }

    fn recv(&self, data: &mut [Complex64], source: usize, tag: i32) -> Result<()> {
        self.take_into(data, source, Channel::Tagged(tag))
    }

    fn broadcast(&self, data: &mut [Complex64], root: usize) -> Result<()> {
        self.check_rank(root)?;
        if self.rank != root {
            return self.take_into(data, root, Channel::Broadcast);
        }
        for dest in (0..self.size()).filter(|&dest| dest != root) {
            self.post(dest, Channel::Broadcast, data.to_vec())?;
        }
        Ok(())
    }

    fn reduce_sum(&self, data: &mut [Complex64], root: usize) -> Result<()> {
        self.check_rank(root)?;
        if self.rank != root {
            return self.post(root, Channel::Reduce, data.to_vec());
        }
        let mut contribution = vec![Complex64::default(); data.len()];
        for source in (0..self.size()).filter(|&source| source != root) {
            self.take_into(&mut contribution, source, Channel::Reduce)?;
            data.iter_mut()
                .zip(&contribution)
                .for_each(|(x, y)| *x += y);
        }
        Ok(())
    }
}

/// A packed buffer which can be moved between ranks as is
pub trait ExchangeBuffer {
    /// The packed buffer
    fn buffer(&self) -> &[Complex64];
    /// The packed buffer, mutably
    fn buffer_mut(&mut self) -> &mut [Complex64];
}

impl ExchangeBuffer for TimeSlice {
    fn buffer(&self) -> &[Complex64] {
        self.data()
    }

    fn buffer_mut(&mut self) -> &mut [Complex64] {
        self.data_mut()
    }
}

impl ExchangeBuffer for MovingTimeSlice {
    fn buffer(&self) -> &[Complex64] {
        self.data()
    }

    fn buffer_mut(&mut self) -> &mut [Complex64] {
        self.data_mut()
    }
}

/// Moves slices between the ranks of a communicator
///
/// The buffers travel without a header: both sides must agree on the layout, which the
/// shaped variants of [`TimesliceExchange::bcast`] and [`TimesliceExchange::recv`] establish
/// by resizing the receiving slice first.
pub struct TimesliceExchange<'c, C: Communicator> {
    comm: &'c C,
}

impl<'c, C: Communicator> TimesliceExchange<'c, C> {
    pub fn new(comm: &'c C) -> Self {
        Self { comm }
    }

    /// The rank of the caller
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// Sum the slices of all ranks into the slice on `root`
    #[tracing::instrument(name = "Reducing time slice", skip(self, slice), fields(rank = self.comm.rank()))]
    pub fn reduce<S: ExchangeBuffer>(&self, slice: &mut S, root: usize) -> Result<()> {
        self.comm.reduce_sum(slice.buffer_mut(), root)
    }

    /// Broadcast the slice at `tstp` from `root`, every other rank is first resized to
    /// `(tstp, ntau, size1)`
    #[tracing::instrument(name = "Broadcasting time slice", skip(self, slice), fields(rank = self.comm.rank()))]
    pub fn bcast(
        &self,
        slice: &mut TimeSlice,
        tstp: isize,
        ntau: usize,
        size1: usize,
        root: usize,
    ) -> Result<()> {
        if self.comm.rank() == root {
            require!(
                slice.tstp() == tstp && slice.ntau() == ntau && slice.size1() == size1,
                "the slice on the root is ({}, {}, {}), not the broadcast ({}, {}, {})",
                slice.tstp(),
                slice.ntau(),
                slice.size1(),
                tstp,
                ntau,
                size1
            );
        } else {
            slice.resize(tstp, ntau, size1);
        }
        self.comm.broadcast(slice.data_mut(), root)
    }

    /// Broadcast the slice at `tstp` from `root`, keeping each rank's `ntau` and matrix shape
    pub fn bcast_keep_shape(&self, slice: &mut TimeSlice, tstp: isize, root: usize) -> Result<()> {
        let (ntau, size1, size2) = (slice.ntau(), slice.size1(), slice.size2());
        if self.comm.rank() == root {
            require!(
                slice.tstp() == tstp,
                "the slice on the root holds tstp {}, not {}",
                slice.tstp(),
                tstp
            );
        } else {
            slice.resize_with_shape(tstp, ntau, size1, size2);
        }
        tracing::debug!(rank = self.comm.rank(), tstp, root, "broadcasting time slice");
        self.comm.broadcast(slice.data_mut(), root)
    }

    /// Send the slice at `tstp` to `dest`, a send to the caller's own rank does nothing
    #[tracing::instrument(name = "Sending time slice", skip(self, slice), fields(rank = self.comm.rank()))]
    pub fn send(
        &self,
        slice: &TimeSlice,
        tstp: isize,
        ntau: usize,
        size1: usize,
        dest: usize,
        tag: i32,
    ) -> Result<()> {
        if self.comm.rank() == dest {
            return Ok(());
        }
        require!(
            slice.tstp() == tstp && slice.ntau() == ntau && slice.size1() == size1,
            "the slice is ({}, {}, {}), not the announced ({}, {}, {})",
            slice.tstp(),
            slice.ntau(),
            slice.size1(),
            tstp,
            ntau,
            size1
        );
        self.comm.send(slice.data(), dest, tag)
    }

    /// Send the slice at `tstp` to `dest` without announcing its shape
    pub fn send_keep_shape(&self, slice: &TimeSlice, tstp: isize, dest: usize, tag: i32) -> Result<()> {
        if self.comm.rank() == dest {
            return Ok(());
        }
        require!(
            slice.tstp() == tstp,
            "the slice holds tstp {}, not {}",
            slice.tstp(),
            tstp
        );
        self.comm.send(slice.data(), dest, tag)
    }

    /// Resize to `(tstp, ntau, size1)` and receive the slice sent by `source`
    ///
    /// A receive from the caller's own rank leaves the slice untouched.
    #[tracing::instrument(name = "Receiving time slice", skip(self, slice), fields(rank = self.comm.rank()))]
    pub fn recv(
        &self,
        slice: &mut TimeSlice,
        tstp: isize,
        ntau: usize,
        size1: usize,
        source: usize,
        tag: i32,
    ) -> Result<()> {
        if self.comm.rank() == source {
            return Ok(());
        }
        slice.resize(tstp, ntau, size1);
        self.comm.recv(slice.data_mut(), source, tag)
    }

    /// Receive the slice at `tstp` sent by `source`, keeping `ntau` and the matrix shape
    pub fn recv_keep_shape(
        &self,
        slice: &mut TimeSlice,
        tstp: isize,
        source: usize,
        tag: i32,
    ) -> Result<()> {
        if self.comm.rank() == source {
            return Ok(());
        }
        let (ntau, size1, size2) = (slice.ntau(), slice.size1(), slice.size2());
        slice.resize_with_shape(tstp, ntau, size1, size2);
        self.comm.recv(slice.data_mut(), source, tag)
    }
}

#[cfg(test)]
mod test {
    use super::{Communicator, LocalCommunicator, LocalGroup, TimesliceExchange};
    use crate::{error::ContourError, ContourRead, MovingTimeSlice, Statistics, TimeSlice};
    use num_complex::Complex64;

    /// Run `f` on every rank of a fresh group, returning the results in rank order
    fn on_group<T: Send>(size: usize, f: impl Fn(LocalCommunicator) -> T + Sync) -> Vec<T> {
        let f = &f;
        std::thread::scope(|scope| {
            let handles: Vec<_> = LocalGroup::new(size)
                .into_iter()
                .map(|comm| scope.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        })
    }

    fn slice_on(rank: usize) -> TimeSlice {
        let mut slice = TimeSlice::new(1, 2, 1);
        for (n, x) in slice.data_mut().iter_mut().enumerate() {
            *x = Complex64::new(rank as f64 + 1., n as f64);
        }
        slice
    }

    #[test]
    fn reduce_sums_into_the_root_only() {
        let slices = on_group(3, |comm| {
            let mut slice = slice_on(comm.rank());
            TimesliceExchange::new(&comm).reduce(&mut slice, 1).unwrap();
            slice
        });
        for (n, x) in slices[1].data().iter().enumerate() {
            assert_eq!(*x, Complex64::new(6., 3. * n as f64));
        }
        assert_eq!(slices[0], slice_on(0));
        assert_eq!(slices[2], slice_on(2));
    }

    #[test]
    fn reduce_moves_moving_window_slices() {
        let slices = on_group(3, |comm| {
            let mut slice = MovingTimeSlice::new(2, 7, 1, Statistics::Fermion);
            slice.data_mut().fill(Complex64::new(0.5, -1.));
            TimesliceExchange::new(&comm).reduce(&mut slice, 0).unwrap();
            slice
        });
        assert!(slices[0]
            .data()
            .iter()
            .all(|x| *x == Complex64::new(1.5, -3.)));
    }

    #[test]
    fn broadcast_resizes_the_receivers() {
        let slices = on_group(3, |comm| {
            let mut slice = if comm.rank() == 2 {
                slice_on(2)
            } else {
                TimeSlice::default()
            };
            TimesliceExchange::new(&comm)
                .bcast(&mut slice, 1, 2, 1, 2)
                .unwrap();
            slice
        });
        for slice in &slices {
            assert_eq!(slice, &slice_on(2));
        }
    }

    #[test]
    fn broadcast_keeping_the_shape() {
        let slices = on_group(3, |comm| {
            let mut slice = if comm.rank() == 0 {
                slice_on(0)
            } else {
                TimeSlice::new(0, 2, 1)
            };
            TimesliceExchange::new(&comm)
                .bcast_keep_shape(&mut slice, 1, 0)
                .unwrap();
            slice
        });
        assert!(slices.iter().all(|slice| slice.tstp() == 1));
        assert_eq!(slices[1], slice_on(0));
    }

    #[test]
    fn point_to_point_transfer_honours_tags() {
        let slices = on_group(3, |comm| {
            let exchange = TimesliceExchange::new(&comm);
            let mut slice = slice_on(comm.rank());
            match comm.rank() {
                0 => {
                    exchange.send(&slice, 1, 2, 1, 2, 7).unwrap();
                    exchange.send_keep_shape(&slice_on(1), 1, 2, 8).unwrap();
                }
                2 => {
                    let mut other = TimeSlice::default();
                    // Receive in the opposite order to the sends
                    exchange.recv_keep_shape(&mut slice, 1, 0, 8).unwrap();
                    exchange.recv(&mut other, 1, 2, 1, 0, 7).unwrap();
                    assert_eq!(other, slice_on(0));
                }
                _ => {
                    exchange.recv(&mut slice, 1, 2, 1, 1, 3).unwrap();
                }
            }
            slice
        });
        assert_eq!(slices[2], slice_on(1));
        assert_eq!(slices[1], slice_on(1));
    }

    #[test]
    fn mismatched_payload_is_an_error() {
        let results = on_group(2, |comm| {
            if comm.rank() == 0 {
                comm.send(&[Complex64::default(); 3], 1, 0).map(|_| 0)
            } else {
                let mut data = [Complex64::default(); 2];
                comm.recv(&mut data, 0, 0).map(|_| 0)
            }
        });
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ContourError::PayloadLength {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn hung_up_peer_is_reported() {
        let mut group = LocalGroup::new(2);
        let survivor = group.remove(0);
        drop(group);
        let mut data = [Complex64::default(); 1];
        assert!(matches!(
            survivor.recv(&mut data, 1, 0),
            Err(ContourError::Disconnected { rank: 1 })
        ));
    }

    #[test]
    fn rank_outside_the_group_is_an_error() {
        let comm = LocalGroup::new(1).remove(0);
        assert!(matches!(
            comm.send(&[], 3, 0),
            Err(ContourError::Rank { rank: 3, size: 1 })
        ));
    }
}
