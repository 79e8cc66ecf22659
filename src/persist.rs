//! # Archives
//!
//! Time slices are persisted as [`TimeSliceRecord`]s: the scalars `tstp`, `ntau`, `sig`,
//! `size1` and `size2`, followed by the stored blocks as flat complex arrays under their
//! names, `mat` for the Matsubara slice and `ret`, `tv`, `les` otherwise. A
//! [`SliceArchive`] collects records under group names and is written to disk as a short
//! header followed by the `postcard` encoding of the groups.
//!
//! Reading a record back resizes the target first, so any slice can be loaded into any
//! other.
use crate::{
    access::{ContourRead, ContourWrite},
    error::ContourError,
    layout::{Component, Layout},
    statistics::Statistics,
    timestep::TimeSlice,
    Result,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

const MAGIC: &[u8; 4] = b"KCTS";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 5;

fn block_name(component: Component) -> &'static str {
    match component {
        Component::Matsubara => "mat",
        Component::Retarded => "ret",
        Component::LeftMixing => "tv",
        Component::Lesser => "les",
    }
}

/// The persisted form of one time slice
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSliceRecord {
    /// The outer time, `-1` for the Matsubara slice
    pub tstp: isize,
    /// The last imaginary-time index
    pub ntau: usize,
    /// Particle statistics
    pub sig: Statistics,
    /// Matrix rows
    pub size1: usize,
    /// Matrix columns
    pub size2: usize,
    /// The stored blocks by name
    pub blocks: BTreeMap<String, Vec<Complex64>>,
}

impl TimeSliceRecord {
    /// Record the stored blocks of `slice`
    pub fn from_slice<S: ContourRead + ?Sized>(slice: &S) -> Self {
        let layout = slice.layout();
        let blocks = layout
            .components()
            .iter()
            .map(|&component| {
                (
                    block_name(component).to_string(),
                    slice.block(component).to_vec(),
                )
            })
            .collect();
        Self {
            tstp: layout.tstp(),
            ntau: layout.ntau(),
            sig: slice.statistics(),
            size1: layout.size1(),
            size2: layout.size2(),
            blocks,
        }
    }

    fn malformed(&self, reason: String) -> ContourError {
        ContourError::MalformedRecord {
            tstp: self.tstp,
            reason,
        }
    }

    /// Resize `slice` to the recorded layout and copy the blocks in
    pub fn read_into(&self, slice: &mut TimeSlice) -> Result<()> {
        if self.tstp < -1 {
            return Err(self.malformed("tstp is below -1".into()));
        }
        let layout = Layout::checked(self.tstp, self.ntau, self.size1, self.size2)
            .ok_or_else(|| {
                self.malformed(format!(
                    "a slice with ntau {} and {} x {} matrices does not fit in memory",
                    self.ntau, self.size1, self.size2
                ))
            })?;
        for &component in layout.components() {
            let name = block_name(component);
            let expected = layout.block(component).len();
            match self.blocks.get(name) {
                Some(block) if block.len() == expected => {}
                Some(block) => {
                    return Err(self.malformed(format!(
                        "block {} holds {} entries, expected {}",
                        name,
                        block.len(),
                        expected
                    )))
                }
                None => return Err(self.malformed(format!("block {} is missing", name))),
            }
        }

        slice.resize_with_shape(self.tstp, self.ntau, self.size1, self.size2);
        slice.set_statistics(self.sig);
        let mut view = slice.view_mut();
        for &component in layout.components() {
            if let Some(block) = self.blocks.get(block_name(component)) {
                view.block_mut(component).copy_from_slice(block);
            }
        }
        Ok(())
    }
}

/// Named groups of time slice records
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceArchive {
    groups: BTreeMap<String, TimeSliceRecord>,
}

impl SliceArchive {
    /// An archive without groups
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` under `group`, replacing any previous record of that name
    pub fn insert(&mut self, group: impl Into<String>, record: TimeSliceRecord) {
        self.groups.insert(group.into(), record);
    }

    /// The record stored under `group`
    pub fn get(&self, group: &str) -> Result<&TimeSliceRecord> {
        self.groups
            .get(group)
            .ok_or_else(|| ContourError::MissingGroup(group.to_string()))
    }

    /// The group names in sorted order
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Encode the archive, header first
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = postcard::to_stdvec(self)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(VERSION);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode an archive written by [`SliceArchive::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ContourError::Format(format!(
                "{} bytes is shorter than the header",
                bytes.len()
            )));
        }
        if &bytes[..4] != MAGIC {
            return Err(ContourError::Format("unknown magic bytes".into()));
        }
        if bytes[4] != VERSION {
            return Err(ContourError::Format(format!(
                "version {} is not supported",
                bytes[4]
            )));
        }
        Ok(postcard::from_bytes(&bytes[HEADER_LEN..])?)
    }

    /// Write the archive to `path`, creating missing parent directories
    #[tracing::instrument(name = "Writing archive", skip(self), fields(groups = self.len()))]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Read an archive written by [`SliceArchive::save`]
    #[tracing::instrument(name = "Reading archive")]
    pub fn load(path: &Path) -> Result<Self> {
        let archive = Self::from_bytes(&fs::read(path)?)?;
        tracing::debug!(groups = archive.len(), "archive loaded");
        Ok(archive)
    }
}

impl TimeSlice {
    /// Store this slice in `archive` under `group`
    pub fn write_to_archive(&self, archive: &mut SliceArchive, group: &str) {
        archive.insert(group, TimeSliceRecord::from_slice(self));
    }

    /// Replace this slice with the record stored under `group`
    pub fn read_from_archive(&mut self, archive: &SliceArchive, group: &str) -> Result<()> {
        archive.get(group)?.read_into(self)
    }
}

#[cfg(test)]
mod test {
    use super::{SliceArchive, TimeSliceRecord};
    use crate::{error::ContourError, layout::MATSUBARA, Statistics, TimeSlice};
    use num_complex::Complex64;

    fn numbered(tstp: isize, statistics: Statistics) -> TimeSlice {
        let mut slice = TimeSlice::with_shape(tstp, 2, 2, 1, statistics);
        for (n, x) in slice.data_mut().iter_mut().enumerate() {
            *x = Complex64::new(n as f64 / 3., -(n as f64).sqrt());
        }
        slice
    }

    #[test]
    fn records_name_the_stored_blocks() {
        let record = TimeSliceRecord::from_slice(&numbered(1, Statistics::Fermion));
        let names: Vec<_> = record.blocks.keys().map(String::as_str).collect();
        assert_eq!(names, ["les", "ret", "tv"]);
        let record = TimeSliceRecord::from_slice(&numbered(MATSUBARA, Statistics::Fermion));
        assert!(record.blocks.contains_key("mat"));
    }

    #[test]
    fn archive_file_reproduces_every_slice_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slices").join("archive.bin");

        let slices = [
            numbered(MATSUBARA, Statistics::Fermion),
            numbered(0, Statistics::Boson),
            numbered(3, Statistics::Fermion),
        ];
        let mut archive = SliceArchive::new();
        for (n, slice) in slices.iter().enumerate() {
            slice.write_to_archive(&mut archive, &format!("g{}", n));
        }
        archive.save(&path).unwrap();

        let loaded = SliceArchive::load(&path).unwrap();
        assert_eq!(loaded.groups().collect::<Vec<_>>(), ["g0", "g1", "g2"]);
        for (n, slice) in slices.iter().enumerate() {
            let mut back = TimeSlice::default();
            back.read_from_archive(&loaded, &format!("g{}", n)).unwrap();
            assert_eq!(&back, slice);
        }
    }

    #[test]
    fn missing_group_is_reported() {
        let mut slice = TimeSlice::new(0, 1, 1);
        let result = slice.read_from_archive(&SliceArchive::new(), "absent");
        assert!(matches!(result, Err(ContourError::MissingGroup(name)) if name == "absent"));
    }

    #[test]
    fn truncated_block_is_rejected_before_resizing() {
        let mut record = TimeSliceRecord::from_slice(&numbered(2, Statistics::Fermion));
        record.blocks.get_mut("tv").unwrap().pop();
        let mut slice = TimeSlice::new(0, 1, 1);
        let result = record.read_into(&mut slice);
        assert!(matches!(result, Err(ContourError::MalformedRecord { tstp: 2, .. })));
        assert_eq!(slice, TimeSlice::new(0, 1, 1));
    }

    #[test]
    fn overflowing_dimensions_are_a_malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overflow.bin");
        let record = TimeSliceRecord {
            tstp: 0,
            ntau: usize::MAX,
            sig: Statistics::Fermion,
            size1: 1,
            size2: 1,
            blocks: [("ret".to_string(), vec![Complex64::default()])]
                .into_iter()
                .collect(),
        };
        let mut archive = SliceArchive::new();
        archive.insert("overflow", record);
        archive.save(&path).unwrap();

        let mut slice = TimeSlice::new(1, 1, 1);
        let result = slice.read_from_archive(&SliceArchive::load(&path).unwrap(), "overflow");
        assert!(matches!(result, Err(ContourError::MalformedRecord { tstp: 0, .. })));
        assert_eq!(slice, TimeSlice::new(1, 1, 1));

        let mut record = TimeSliceRecord::from_slice(&numbered(1, Statistics::Fermion));
        record.size1 = usize::MAX;
        record.size2 = 2;
        assert!(matches!(
            record.read_into(&mut slice),
            Err(ContourError::MalformedRecord { tstp: 1, .. })
        ));
    }

    #[test]
    fn foreign_bytes_are_not_an_archive() {
        assert!(matches!(
            SliceArchive::from_bytes(b"HDF\x89\x01\x02"),
            Err(ContourError::Format(_))
        ));
        assert!(matches!(
            SliceArchive::from_bytes(b"KC"),
            Err(ContourError::Format(_))
        ));
    }
}
