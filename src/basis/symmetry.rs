//! Symmetry-partitioned one- and two-body bases.
//!
//! One-body orbital indices and two-body orbital pairs `(i < j)` are grouped
//! into channels of equal symmetry key. Reverse lookup tables give the channel
//! id and in-channel position of any orbital or pair in O(1); the two-body
//! table is addressed by triangular packing of the pair.
//!
//! The same partition drives excitation sampling: an excitation only ever
//! moves particles within the channel of the orbitals it removes, so every
//! proposal respects the selection rules of the Hamiltonian.

use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use super::determinant::{Determinant, MAX_ORBITALS};
use super::orbital::{one_body_symmetry_key, two_body_symmetry_key, Orbital};
use crate::error::BasisError;

/// Location of a basis element inside the partition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelSlot {
    pub channel: usize,
    pub position: usize,
}

/// Proposed single excitation `hole -> particle`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SingleExcitation {
    pub hole: usize,
    pub particle: usize,
    /// Reciprocal of the probability of proposing this excitation
    pub inverse_probability: usize,
}

/// Proposed double excitation `(h1, h2) -> (p1, p2)`, both pairs ascending.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DoubleExcitation {
    pub holes: (usize, usize),
    pub particles: (usize, usize),
    /// Reciprocal of the probability of proposing this excitation
    pub inverse_probability: usize,
}

/// Orbital space of `nmo` orbitals holding `particle_number` particles,
/// partitioned into symmetry channels.
#[derive(Clone, Debug)]
pub struct SymmetryBasis {
    orbitals: Vec<Orbital>,
    nmo: usize,
    particle_number: usize,
    one_body_channels: Vec<Vec<usize>>,
    two_body_channels: Vec<Vec<(usize, usize)>>,
    one_body_lookup: Vec<ChannelSlot>,
    two_body_lookup: Vec<ChannelSlot>,
}

/// Map `x` in `1..=n(n-1)/2` onto the `x`-th pair `(a, b)`, `1 <= a < b <= n`,
/// in lexicographic order.
fn inverse_combination_2(n: usize, x: usize) -> (usize, usize) {
    // pairs whose first element is below m + 1
    let before = |m: usize| m * (2 * n - m - 1) / 2;

    let c = (2 * n - 1) as f64;
    let disc = (c * c - 8.0 * x as f64).max(0.0);
    let root = (c - disc.sqrt()) / 2.0;
    let mut m = (root.ceil() as usize).saturating_sub(1).min(n - 2);
    while m + 1 < n - 1 && before(m + 1) < x {
        m += 1;
    }
    while m > 0 && before(m) >= x {
        m -= 1;
    }

    let a = m + 1;
    (a, a + (x - before(m)))
}

impl SymmetryBasis {
    /// Partition `orbitals` into symmetry channels for `particle_number`
    /// particles.
    ///
    /// Orbitals must be listed with `index` equal to their position. Channels
    /// are numbered in order of first appearance.
    pub fn build(orbitals: Vec<Orbital>, particle_number: usize) -> Result<Self, BasisError> {
        let nmo = orbitals.len();
        if nmo > MAX_ORBITALS {
            return Err(BasisError::TooManyOrbitals { nmo, max: MAX_ORBITALS });
        }
        if particle_number > nmo {
            return Err(BasisError::ParticleNumberExceedsOrbitals {
                particles: particle_number,
                nmo,
            });
        }
        for (position, orb) in orbitals.iter().enumerate() {
            if orb.index != position {
                return Err(BasisError::MisplacedOrbital { position, index: orb.index });
            }
        }

        let mut one_body_keys: HashMap<i32, usize> = HashMap::new();
        let mut one_body_channels: Vec<Vec<usize>> = Vec::new();
        for orb in orbitals.iter() {
            let next = one_body_channels.len();
            let channel = *one_body_keys.entry(one_body_symmetry_key(orb)).or_insert(next);
            if channel == next {
                one_body_channels.push(Vec::new());
            }
            one_body_channels[channel].push(orb.index);
        }

        let mut two_body_keys: HashMap<i32, usize> = HashMap::new();
        let mut two_body_channels: Vec<Vec<(usize, usize)>> = Vec::new();
        for i in 0..nmo {
            for j in (i + 1)..nmo {
                let key = two_body_symmetry_key(&orbitals[i], &orbitals[j]);
                let next = two_body_channels.len();
                let channel = *two_body_keys.entry(key).or_insert(next);
                if channel == next {
                    two_body_channels.push(Vec::new());
                }
                two_body_channels[channel].push((i, j));
            }
        }

        let one_body_lookup = Self::build_lookup(
            "one-body",
            nmo,
            one_body_channels.iter().map(|ch| ch.iter().copied()),
        )?;
        let two_body_lookup = Self::build_lookup(
            "two-body",
            nmo * nmo.saturating_sub(1) / 2,
            two_body_channels
                .iter()
                .map(|ch| ch.iter().map(|&(i, j)| Self::pair_slot(nmo, i, j))),
        )?;

        debug!(
            nmo,
            particle_number,
            one_body_channels = one_body_channels.len(),
            two_body_channels = two_body_channels.len(),
            "symmetry basis built"
        );

        Ok(Self {
            orbitals,
            nmo,
            particle_number,
            one_body_channels,
            two_body_channels,
            one_body_lookup,
            two_body_lookup,
        })
    }

    /// Invert a channel list into a slot table, refusing any slot that is
    /// claimed twice or never claimed.
    fn build_lookup<C, S>(
        kind: &'static str,
        size: usize,
        channels: C,
    ) -> Result<Vec<ChannelSlot>, BasisError>
    where
        C: Iterator<Item = S>,
        S: Iterator<Item = usize>,
    {
        let mut table: Vec<Option<ChannelSlot>> = vec![None; size];
        for (channel, members) in channels.enumerate() {
            for (position, slot) in members.enumerate() {
                match table.get_mut(slot) {
                    Some(entry) if entry.is_none() => {
                        *entry = Some(ChannelSlot { channel, position });
                    }
                    _ => return Err(BasisError::DuplicateChannelSlot { kind, slot }),
                }
            }
        }
        table
            .into_iter()
            .enumerate()
            .map(|(slot, entry)| entry.ok_or(BasisError::MissingChannelSlot { kind, slot }))
            .collect()
    }

    /// Triangular packing of the pair `i < j` over `nmo` orbitals.
    #[inline]
    fn pair_slot(nmo: usize, i: usize, j: usize) -> usize {
        debug_assert!(i < j && j < nmo);
        i * (2 * nmo - i - 3) / 2 + j - 1
    }

    #[inline]
    pub fn nmo(&self) -> usize {
        self.nmo
    }

    #[inline]
    pub fn particle_number(&self) -> usize {
        self.particle_number
    }

    #[inline]
    pub fn orbital(&self, index: usize) -> &Orbital {
        &self.orbitals[index]
    }

    pub fn orbitals(&self) -> &[Orbital] {
        &self.orbitals
    }

    pub fn one_body_channels(&self) -> &[Vec<usize>] {
        &self.one_body_channels
    }

    pub fn two_body_channels(&self) -> &[Vec<(usize, usize)>] {
        &self.two_body_channels
    }

    #[inline]
    pub fn one_body_slot(&self, index: usize) -> ChannelSlot {
        self.one_body_lookup[index]
    }

    /// Channel slot of the unordered pair `{i, j}`, `i != j`.
    #[inline]
    pub fn two_body_slot(&self, i: usize, j: usize) -> ChannelSlot {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        self.two_body_lookup[Self::pair_slot(self.nmo, lo, hi)]
    }

    /// Lowest-energy determinant: the first `N` orbitals in list order.
    ///
    /// Assumes the orbital list is sorted by ascending energy.
    pub fn minimum_det(&self) -> Determinant {
        Determinant::from_bits(
            (0..self.particle_number).fold(0u128, |bits, i| bits | (1u128 << i)),
            self.nmo,
        )
    }

    /// Propose a symmetry-allowed single excitation out of `det`.
    ///
    /// Returns `None` when the chosen orbital's channel has no free target.
    pub fn single_excite<R: Rng + ?Sized>(
        &self,
        det: &Determinant,
        rng: &mut R,
    ) -> Option<SingleExcitation> {
        let n = self.particle_number;
        if n == 0 {
            return None;
        }
        let hole = det.find_nth(rng.gen_range(1..=n));
        let channel = self.one_body_channels.get(self.one_body_lookup.get(hole)?.channel)?;

        let free = channel.iter().filter(|&&r| !det.is_occupied(r)).count();
        if free == 0 {
            return None;
        }
        let pick = rng.gen_range(1..=free);
        let particle = channel
            .iter()
            .copied()
            .filter(|&r| !det.is_occupied(r))
            .nth(pick - 1)?;

        Some(SingleExcitation {
            hole,
            particle,
            inverse_probability: free * n,
        })
    }

    /// Propose a symmetry-allowed double excitation out of `det`.
    ///
    /// Returns `None` when the chosen pair's channel has no free target pair.
    pub fn double_excite<R: Rng + ?Sized>(
        &self,
        det: &Determinant,
        rng: &mut R,
    ) -> Option<DoubleExcitation> {
        let n = self.particle_number;
        if n < 2 {
            return None;
        }
        let pair_count = n * (n - 1) / 2;
        let (rank_a, rank_b) = inverse_combination_2(n, rng.gen_range(1..=pair_count));
        let a = det.find_nth(rank_a);
        let b = det.find_nth(rank_b);
        if b >= self.nmo {
            return None;
        }
        let channel = &self.two_body_channels[self.two_body_slot(a, b).channel];

        let is_free = |&(r, s): &(usize, usize)| !det.is_occupied(r) && !det.is_occupied(s);
        let free = channel.iter().filter(|p| is_free(p)).count();
        if free == 0 {
            return None;
        }
        let pick = rng.gen_range(1..=free);
        let particles = channel.iter().copied().filter(|p| is_free(p)).nth(pick - 1)?;

        Some(DoubleExcitation {
            holes: (a, b),
            particles,
            inverse_probability: free * pair_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::pairing_orbitals;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pairing_basis(p_max: usize, particles: usize) -> SymmetryBasis {
        SymmetryBasis::build(pairing_orbitals(p_max, 1.0), particles).unwrap()
    }

    #[test]
    fn test_inverse_combination_matches_enumeration() {
        for n in 2..12 {
            let mut x = 0;
            for a in 1..n {
                for b in (a + 1)..=n {
                    x += 1;
                    assert_eq!(inverse_combination_2(n, x), (a, b), "n={n}, x={x}");
                }
            }
        }
    }

    #[test]
    fn test_partition_is_total_and_disjoint() {
        let basis = pairing_basis(4, 4);
        let nmo = basis.nmo();

        let mut seen = vec![0usize; nmo];
        for ch in basis.one_body_channels() {
            for &i in ch {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));

        let mut pairs = vec![0usize; nmo * nmo];
        for ch in basis.two_body_channels() {
            for &(i, j) in ch {
                assert!(i < j);
                pairs[i * nmo + j] += 1;
            }
        }
        for i in 0..nmo {
            for j in (i + 1)..nmo {
                assert_eq!(pairs[i * nmo + j], 1, "pair ({i}, {j})");
            }
        }

        let one: usize = basis.one_body_channels().iter().map(Vec::len).sum();
        let two: usize = basis.two_body_channels().iter().map(Vec::len).sum();
        assert_eq!(one, nmo);
        assert_eq!(two, nmo * (nmo - 1) / 2);
    }

    #[test]
    fn test_lookup_tables_agree_with_channels() {
        let basis = pairing_basis(3, 2);
        for (c, ch) in basis.one_body_channels().iter().enumerate() {
            for (p, &i) in ch.iter().enumerate() {
                assert_eq!(basis.one_body_slot(i), ChannelSlot { channel: c, position: p });
            }
        }
        for (c, ch) in basis.two_body_channels().iter().enumerate() {
            for (p, &(i, j)) in ch.iter().enumerate() {
                let slot = ChannelSlot { channel: c, position: p };
                assert_eq!(basis.two_body_slot(i, j), slot);
                assert_eq!(basis.two_body_slot(j, i), slot);
            }
        }
    }

    #[test]
    fn test_channels_share_symmetry_key() {
        let basis = pairing_basis(4, 4);
        for ch in basis.two_body_channels() {
            let (i0, j0) = ch[0];
            let key = two_body_symmetry_key(basis.orbital(i0), basis.orbital(j0));
            for &(i, j) in ch {
                assert_eq!(two_body_symmetry_key(basis.orbital(i), basis.orbital(j)), key);
            }
        }
    }

    #[test]
    fn test_build_rejects_bad_input() {
        assert!(matches!(
            SymmetryBasis::build(pairing_orbitals(2, 1.0), 5),
            Err(BasisError::ParticleNumberExceedsOrbitals { particles: 5, nmo: 4 })
        ));
        let mut orbitals = pairing_orbitals(2, 1.0);
        orbitals.swap(0, 1);
        assert!(matches!(
            SymmetryBasis::build(orbitals, 2),
            Err(BasisError::MisplacedOrbital { position: 0, index: 1 })
        ));
    }

    #[test]
    fn test_duplicate_slot_is_fatal() {
        let channels = vec![vec![0usize, 1], vec![1usize]];
        let err = SymmetryBasis::build_lookup(
            "one-body",
            2,
            channels.iter().map(|ch| ch.iter().copied()),
        )
        .unwrap_err();
        assert_eq!(err, BasisError::DuplicateChannelSlot { kind: "one-body", slot: 1 });

        let channels = vec![vec![0usize]];
        let err = SymmetryBasis::build_lookup(
            "one-body",
            2,
            channels.iter().map(|ch| ch.iter().copied()),
        )
        .unwrap_err();
        assert_eq!(err, BasisError::MissingChannelSlot { kind: "one-body", slot: 1 });
    }

    #[test]
    fn test_minimum_det() {
        let basis = pairing_basis(4, 4);
        assert_eq!(basis.minimum_det().occupied_indices(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_excite_stays_in_channel() {
        let basis = pairing_basis(4, 4);
        let det = basis.minimum_det();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let ex = basis.single_excite(&det, &mut rng).unwrap();
            assert!(det.is_occupied(ex.hole));
            assert!(!det.is_occupied(ex.particle));
            assert_eq!(basis.one_body_slot(ex.hole).channel, basis.one_body_slot(ex.particle).channel);
            // two free same-spin orbitals, four particles
            assert_eq!(ex.inverse_probability, 2 * 4);
        }
    }

    #[test]
    fn test_single_excite_none_when_channel_full() {
        // spin-up orbitals are 0 and 2; both occupied, spin-down orbital 3 free
        let basis = pairing_basis(2, 2);
        let det = Determinant::new([0, 2], basis.nmo()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(basis.single_excite(&det, &mut rng), None);
        }
    }

    #[test]
    fn test_double_excite_conserves_pair_symmetry() {
        let basis = pairing_basis(4, 4);
        let det = basis.minimum_det();
        let mut rng = StdRng::seed_from_u64(11);
        let mut proposals = 0;
        for _ in 0..1000 {
            let Some(ex) = basis.double_excite(&det, &mut rng) else {
                continue;
            };
            proposals += 1;
            let (h1, h2) = ex.holes;
            let (p1, p2) = ex.particles;
            assert!(h1 < h2 && p1 < p2);
            assert!(det.is_occupied(h1) && det.is_occupied(h2));
            assert!(!det.is_occupied(p1) && !det.is_occupied(p2));
            assert_eq!(basis.two_body_slot(h1, h2).channel, basis.two_body_slot(p1, p2).channel);
            assert_eq!(ex.inverse_probability % 6, 0);
        }
        assert!(proposals > 0);
    }

    #[test]
    fn test_double_excite_none_when_no_free_pair() {
        // all four orbitals occupied: nothing to excite into
        let basis = pairing_basis(2, 4);
        let det = basis.minimum_det();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(basis.double_excite(&det, &mut rng), None);
    }
}
