use serde::{Deserialize, Serialize};
use std::fmt;

/// The particle statistics of a contour function
///
/// The statistics fix the sign `sig` in the symmetry relations between contour components,
/// `sig = -1` for fermions and `sig = +1` for bosons.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Statistics {
    /// Fermi-Dirac statistics, `sig = -1`
    #[default]
    Fermion,
    /// Bose-Einstein statistics, `sig = +1`
    Boson,
}

impl Statistics {
    /// The sign `sig` as an integer
    pub fn sig(self) -> i32 {
        match self {
            Statistics::Fermion => -1,
            Statistics::Boson => 1,
        }
    }

    /// The sign `sig` as a float, for use in arithmetic on the stored data
    pub fn sign(self) -> f64 {
        self.sig() as f64
    }

    /// True for fermions
    pub fn is_fermionic(self) -> bool {
        self == Statistics::Fermion
    }
}

impl TryFrom<i32> for Statistics {
    type Error = String;

    fn try_from(sig: i32) -> Result<Self, Self::Error> {
        match sig {
            -1 => Ok(Statistics::Fermion),
            1 => Ok(Statistics::Boson),
            _ => Err(format!("sig must be -1 or +1, found {}", sig)),
        }
    }
}

impl From<Statistics> for i32 {
    fn from(statistics: Statistics) -> Self {
        statistics.sig()
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistics::Fermion => write!(f, "fermion"),
            Statistics::Boson => write!(f, "boson"),
        }
    }
}
