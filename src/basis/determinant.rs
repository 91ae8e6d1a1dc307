//! Bit-encoded Slater determinants.
//!
//! A determinant over `nmo` spin-orbitals is stored as a `u128` occupation
//! pattern: bit `i` set means orbital `i` is occupied. Determinants are plain
//! values; set algebra produces new determinants.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

use crate::error::BasisError;

/// Largest orbital space a single determinant can represent.
pub const MAX_ORBITALS: usize = 128;

/// Occupation-number state over a fixed number of orbitals.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Determinant {
    bits: u128,
    nmo: usize,
}

#[inline]
fn width_mask(nmo: usize) -> u128 {
    if nmo >= MAX_ORBITALS {
        u128::MAX
    } else {
        (1u128 << nmo) - 1
    }
}

impl Determinant {
    /// Build a determinant from the indices of its occupied orbitals.
    pub fn new<I>(occupied: I, nmo: usize) -> Result<Self, BasisError>
    where
        I: IntoIterator<Item = usize>,
    {
        if nmo > MAX_ORBITALS {
            return Err(BasisError::TooManyOrbitals { nmo, max: MAX_ORBITALS });
        }
        let mut bits = 0u128;
        for index in occupied {
            if index >= nmo {
                return Err(BasisError::InvalidIndex { index, nmo });
            }
            bits |= 1u128 << index;
        }
        Ok(Self { bits, nmo })
    }

    /// Empty determinant (no occupied orbitals).
    pub fn vacuum(nmo: usize) -> Result<Self, BasisError> {
        Self::new(std::iter::empty(), nmo)
    }

    /// Wrap a raw bit pattern. Bits at or above `nmo` are discarded.
    pub fn from_bits(bits: u128, nmo: usize) -> Self {
        debug_assert!(nmo <= MAX_ORBITALS);
        Self { bits: bits & width_mask(nmo), nmo }
    }

    /// Canonical integer key of this determinant.
    #[inline]
    pub fn bits(&self) -> u128 {
        self.bits
    }

    #[inline]
    pub fn nmo(&self) -> usize {
        self.nmo
    }

    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        index < self.nmo && (self.bits >> index) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.nmo, "orbital {index} outside [0, {})", self.nmo);
        self.bits |= 1u128 << index;
    }

    #[inline]
    pub fn clear(&mut self, index: usize) {
        debug_assert!(index < self.nmo, "orbital {index} outside [0, {})", self.nmo);
        self.bits &= !(1u128 << index);
    }

    /// Number of occupied orbitals.
    #[inline]
    pub fn count_occupation(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Index of the `k`-th occupied orbital, counting from 1 in ascending
    /// order. Returns `nmo` when `k == 0` or `k` exceeds the occupation.
    pub fn find_nth(&self, k: usize) -> usize {
        if k == 0 || k > self.count_occupation() {
            return self.nmo;
        }
        let mut bits = self.bits;
        for _ in 1..k {
            bits &= bits - 1;
        }
        bits.trailing_zeros() as usize
    }

    /// Number of occupied orbitals strictly between `a` and `b`.
    ///
    /// The order of the two bounds does not matter.
    pub fn count_between(&self, a: usize, b: usize) -> usize {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        if hi <= lo + 1 {
            return 0;
        }
        let below_hi = width_mask(hi);
        let upto_lo = width_mask(lo + 1);
        (self.bits & below_hi & !upto_lo).count_ones() as usize
    }

    pub fn occupied_indices(&self) -> Vec<usize> {
        let mut indices = Vec::with_capacity(self.count_occupation());
        let mut bits = self.bits;
        while bits != 0 {
            indices.push(bits.trailing_zeros() as usize);
            bits &= bits - 1;
        }
        indices
    }

    pub fn unoccupied_indices(&self) -> Vec<usize> {
        (0..self.nmo).filter(|&i| !self.is_occupied(i)).collect()
    }
}

impl BitAnd for Determinant {
    type Output = Determinant;

    fn bitand(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.nmo, rhs.nmo);
        Determinant { bits: self.bits & rhs.bits, nmo: self.nmo }
    }
}

impl BitOr for Determinant {
    type Output = Determinant;

    fn bitor(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.nmo, rhs.nmo);
        Determinant { bits: self.bits | rhs.bits, nmo: self.nmo }
    }
}

impl BitXor for Determinant {
    type Output = Determinant;

    fn bitxor(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.nmo, rhs.nmo);
        Determinant { bits: self.bits ^ rhs.bits, nmo: self.nmo }
    }
}

/// Occupation string, lowest orbital first: `Det(11110000)`.
impl fmt::Display for Determinant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Det(")?;
        for i in 0..self.nmo {
            write!(f, "{}", if self.is_occupied(i) { '1' } else { '0' })?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_out_of_range_index() {
        let err = Determinant::new([0, 3, 8], 8).unwrap_err();
        assert_eq!(err, BasisError::InvalidIndex { index: 8, nmo: 8 });
        assert!(matches!(
            Determinant::new([0], 129),
            Err(BasisError::TooManyOrbitals { .. })
        ));
    }

    #[test]
    fn test_round_trip_all_subsets() {
        let nmo = 8;
        for pattern in 0u32..(1 << nmo) {
            let indices: Vec<usize> = (0..nmo).filter(|i| pattern >> i & 1 == 1).collect();
            let det = Determinant::new(indices.iter().copied(), nmo).unwrap();
            assert_eq!(det.occupied_indices(), indices);
            assert_eq!(det.count_occupation(), indices.len());
            assert_eq!(det.bits(), pattern as u128);
        }
    }

    #[test]
    fn test_find_nth() {
        let det = Determinant::new([1, 4, 5, 7], 8).unwrap();
        assert_eq!(det.find_nth(1), 1);
        assert_eq!(det.find_nth(2), 4);
        assert_eq!(det.find_nth(3), 5);
        assert_eq!(det.find_nth(4), 7);
        assert_eq!(det.find_nth(0), 8);
        assert_eq!(det.find_nth(5), 8);
    }

    #[test]
    fn test_set_clear_and_occupation() {
        let mut det = Determinant::vacuum(6).unwrap();
        det.set(2);
        det.set(5);
        assert!(det.is_occupied(2) && det.is_occupied(5));
        det.clear(2);
        assert!(!det.is_occupied(2));
        assert!(!det.is_occupied(17));
        assert_eq!(det.unoccupied_indices(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_count_between() {
        let det = Determinant::new([0, 2, 3, 6, 7], 8).unwrap();
        assert_eq!(det.count_between(0, 7), 3);
        assert_eq!(det.count_between(7, 0), 3);
        assert_eq!(det.count_between(1, 4), 2);
        assert_eq!(det.count_between(2, 3), 0);
        assert_eq!(det.count_between(4, 4), 0);
    }

    #[test]
    fn test_count_between_full_width() {
        let det = Determinant::from_bits(u128::MAX, 128);
        assert_eq!(det.count_between(0, 127), 126);
    }

    #[test]
    fn test_from_bits_masks_high_bits() {
        let det = Determinant::from_bits(0b1_0000_0011, 8);
        assert_eq!(det.occupied_indices(), vec![0, 1]);
    }

    #[test]
    fn test_display() {
        let det = Determinant::new([0, 1, 4], 6).unwrap();
        assert_eq!(det.to_string(), "Det(110010)");
    }

    proptest! {
        #[test]
        fn prop_xor_parity_and_difference(a in 0u64..(1 << 12), b in 0u64..(1 << 12)) {
            let nmo = 12;
            let da = Determinant::from_bits(a as u128, nmo);
            let db = Determinant::from_bits(b as u128, nmo);
            let diff = da ^ db;
            if da.count_occupation() == db.count_occupation() {
                prop_assert_eq!(diff.count_occupation() % 2, 0);
            }
            let only_a: Vec<usize> = da
                .occupied_indices()
                .into_iter()
                .filter(|&i| !db.is_occupied(i))
                .collect();
            prop_assert_eq!((diff & da).occupied_indices(), only_a);
            prop_assert_eq!((da | db).count_occupation() + (da & db).count_occupation(),
                da.count_occupation() + db.count_occupation());
        }

        #[test]
        fn prop_find_nth_walks_occupied(bits in 0u128..(1u128 << 40)) {
            let det = Determinant::from_bits(bits, 40);
            for (k, &index) in det.occupied_indices().iter().enumerate() {
                prop_assert_eq!(det.find_nth(k + 1), index);
            }
        }
    }
}
