use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Structure;

/// The three atoms taking part in the reaction, stored as 1-based indices. For
/// hydrogen abstraction these are the carbon losing the hydrogen, the migrating
/// hydrogen, and the oxygen of the attacking radical
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveSite {
    pub c: usize,
    pub h: usize,
    pub o: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteError {
    /// an index of 0 or one past the end of the structure
    OutOfRange { index: usize, len: usize },
    /// the element at `index` changed from `want` to `got`
    Element { index: usize, want: usize, got: usize },
    /// the number of atoms changed
    Length { want: usize, got: usize },
}

impl Display for SiteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteError::OutOfRange { index, len } => write!(
                f,
                "active-site index {index} out of range for {len} atoms"
            ),
            SiteError::Element { index, want, got } => write!(
                f,
                "active-site atom {index} changed from Z={want} to Z={got}"
            ),
            SiteError::Length { want, got } => {
                write!(f, "expected {want} atoms, found {got}")
            }
        }
    }
}

impl std::error::Error for SiteError {}

impl ActiveSite {
    pub fn new(c: usize, h: usize, o: usize) -> Self {
        Self { c, h, o }
    }

    /// the 0-based (c, h, o) indices
    pub fn zero_based(&self) -> (usize, usize, usize) {
        (self.c - 1, self.h - 1, self.o - 1)
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.c, self.h, self.o]
    }

    /// check that every index points at an atom of `s`
    pub fn check(&self, s: &Structure) -> Result<(), SiteError> {
        for index in self.indices() {
            if index == 0 || index > s.len() {
                return Err(SiteError::OutOfRange {
                    index,
                    len: s.len(),
                });
            }
        }
        Ok(())
    }

    /// check that replacing `old` with `new` keeps the atom count and the
    /// elements at the active-site positions
    pub fn check_replacement(
        &self,
        old: &Structure,
        new: &Structure,
    ) -> Result<(), SiteError> {
        if old.len() != new.len() {
            return Err(SiteError::Length {
                want: old.len(),
                got: new.len(),
            });
        }
        self.check(new)?;
        for index in self.indices() {
            let want = old.atoms[index - 1].atomic_number;
            let got = new.atoms[index - 1].atomic_number;
            if want != got {
                return Err(SiteError::Element { index, want, got });
            }
        }
        Ok(())
    }

    /// C-H distance, H-O distance, and C-H-O angle in `s`
    pub fn measure(&self, s: &Structure) -> (f64, f64, f64) {
        let (c, h, o) = self.zero_based();
        (s.distance(c, h), s.distance(h, o), s.angle(c, h, o))
    }
}

/// CHO-style listing, `C=1 H=2 O=7`
impl Display for ActiveSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C={} H={} O={}", self.c, self.h, self.o)
    }
}

#[cfg(test)]
mod tests {
    use crate::structure;

    use super::*;

    #[test]
    fn replacement() {
        let old = structure![
            C 0.0 0.0 0.0
            H 1.1 0.0 0.0
            O 2.4 0.0 0.0
        ];
        let site = ActiveSite::new(1, 2, 3);
        let mut new = old.clone();
        new.atoms[1].x = 1.2;
        assert_eq!(site.check_replacement(&old, &new), Ok(()));

        new.atoms[2].atomic_number = 7;
        assert_eq!(
            site.check_replacement(&old, &new),
            Err(SiteError::Element {
                index: 3,
                want: 8,
                got: 7
            })
        );

        new.atoms.pop();
        assert!(matches!(
            site.check_replacement(&old, &new),
            Err(SiteError::Length { want: 3, got: 2 })
        ));
    }

    #[test]
    fn out_of_range() {
        let s = structure![H 0.0 0.0 0.0];
        assert!(ActiveSite::new(0, 1, 1).check(&s).is_err());
        assert!(ActiveSite::new(1, 1, 2).check(&s).is_err());
    }
}
