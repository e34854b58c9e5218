//! "Cheap magic" division — the Granlund-Montgomery-style multiply-shift
//! replacement for `x % d` used by the `Magic` addressing regime.
//!
//! Not every divisor admits a pure multiply-shift-subtract reduction; some
//! require an extra rounding correction after the multiply. We only accept
//! divisors from the former ("cheap") family, scanning upward from the
//! desired block count until one is found.

/// A divisor paired with the multiply-shift constants that reduce `x % divisor`
/// to `x - ((x as u64 * multiplier) >> shift) * divisor`, valid for every
/// `x: u32`. `shift` is the *full-width* shift against the 64-bit product
/// (always `>= 32`), not the post-high-word shift `s` from Warren's
/// `magicu` — taking the high 32 bits of the product and then shifting by
/// `s` more is the same operation as one 64-bit shift by `32 + s`, and
/// `shift` here already has the `32` folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicDivisor {
    /// The chosen divisor (`>= desired_block_cnt`, not necessarily minimal).
    pub divisor: u32,
    pub(crate) multiplier: u32,
    pub(crate) shift: u32,
}

impl MagicDivisor {
    /// Reduces `x % self.divisor` via multiply-shift-subtract.
    #[inline(always)]
    #[must_use]
    pub fn fast_mod(&self, x: u32) -> u32 {
        let q = ((x as u64 * self.multiplier as u64) >> self.shift) as u32;
        x - q * self.divisor
    }
}

/// Unsigned 32-bit magic-number division constants, after Warren,
/// *Hacker's Delight*, 2nd ed., Figure 10-2 ("magicu"). Returns
/// `(multiplier, shift, needs_add)`; `needs_add` is true when the
/// multiply-shift result additionally requires a rounding correction,
/// in which case the divisor is not "cheap" for our purposes. `shift` is
/// returned as the algorithm's `p` directly (the full 64-bit-product
/// shift), not `p - 32` — `fast_mod` shifts the untruncated `x as u64 *
/// multiplier` product, so the `32` that `p - 32` would subtract must
/// stay folded into the shift amount.
fn magic_u32(d: u32) -> (u32, u32, bool) {
    assert!(d >= 2, "magic division is undefined for d < 2");

    let mut add = false;
    let nc: u32 = 0u32.wrapping_sub(1).wrapping_sub(0u32.wrapping_sub(d) % d);
    let mut p: u32 = 31;
    let mut q1: u32 = 0x8000_0000u32 / nc;
    let mut r1: u32 = 0x8000_0000u32.wrapping_sub(q1.wrapping_mul(nc));
    let mut q2: u32 = 0x7FFF_FFFFu32 / d;
    let mut r2: u32 = 0x7FFF_FFFFu32.wrapping_sub(q2.wrapping_mul(d));

    loop {
        p += 1;
        if r1 >= nc.wrapping_sub(r1) {
            q1 = q1.wrapping_mul(2).wrapping_add(1);
            r1 = r1.wrapping_mul(2).wrapping_sub(nc);
        } else {
            q1 = q1.wrapping_mul(2);
            r1 = r1.wrapping_mul(2);
        }
        if r2.wrapping_add(1) >= d.wrapping_sub(r2) {
            if q2 >= 0x7FFF_FFFF {
                add = true;
            }
            q2 = q2.wrapping_mul(2).wrapping_add(1);
            r2 = r2.wrapping_mul(2).wrapping_add(1).wrapping_sub(d);
        } else {
            if q2 >= 0x8000_0000 {
                add = true;
            }
            q2 = q2.wrapping_mul(2);
            r2 = r2.wrapping_mul(2).wrapping_add(1);
        }
        let delta = d.wrapping_sub(1).wrapping_sub(r2);
        if !(p < 64 && (q1 < delta || (q1 == delta && r1 == 0))) {
            break;
        }
    }

    let m = q2.wrapping_add(1);
    (m, p, add)
}

/// Finds the smallest divisor `>= max(desired_block_cnt, 2)` that admits a
/// pure multiply-shift-subtract reduction (no post-multiply rounding
/// correction needed), and returns its magic constants.
#[must_use]
pub fn next_cheap_magic(desired_block_cnt: u32) -> MagicDivisor {
    let mut d = desired_block_cnt.max(2);
    loop {
        let (multiplier, shift, needs_add) = magic_u32(d);
        if !needs_add {
            return MagicDivisor {
                divisor: d,
                multiplier,
                shift,
            };
        }
        d += 1;
    }
}
