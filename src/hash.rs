/// MurmurHash3 `fmix64` finalizer.
///
/// Flips roughly half the output bits for any single-bit change of the input,
/// which is what linear probing needs to keep clusters short on sequential
/// keys.
#[inline(always)]
pub fn mix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hash of a raw key, used for bucket addressing.
        #[inline(always)]
        pub fn hash(key: i64) -> u64 {
            use core::hash::BuildHasher;
            foldhash::fast::FixedState::default().hash_one(key)
        }
    } else {
        /// Hash of a raw key, used for bucket addressing.
        #[inline(always)]
        pub fn hash(key: i64) -> u64 {
            mix64(key as u64)
        }
    }
}

/// Home bucket of `hash` in a table with the given mask.
#[inline(always)]
pub fn slot(hash: u64, mask: usize) -> usize {
    hash as usize & mask
}

/// Next bucket on the probe sequence, wrapping at capacity.
#[inline(always)]
pub fn next_slot(slot: usize, mask: usize) -> usize {
    slot.wrapping_add(1) & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix64_known_values() {
        assert_eq!(mix64(0), 0);
        assert_ne!(mix64(1), 1);
        assert_ne!(mix64(1), mix64(2));
    }

    #[test]
    fn mix64_avalanches() {
        // Neighbouring keys should differ in about half of the output bits.
        let mut total = 0u32;
        for k in 0..1024u64 {
            total += (mix64(k) ^ mix64(k + 1)).count_ones();
        }
        let avg = total as f64 / 1024.0;
        assert!((24.0..40.0).contains(&avg), "average flipped bits {avg}");
    }

    #[test]
    fn slot_is_deterministic() {
        for mask in [0usize, 1, 7, 31, 1023] {
            for k in -50i64..50 {
                assert_eq!(slot(hash(k), mask), slot(hash(k), mask));
                assert!(slot(hash(k), mask) <= mask);
            }
        }
    }

    #[test]
    fn probe_visits_every_bucket_once() {
        for shift in 0..8 {
            let capacity = 1usize << shift;
            let mask = capacity - 1;
            for start in 0..capacity {
                let mut seen = vec![false; capacity];
                let mut pos = start;
                for _ in 0..capacity {
                    assert!(!seen[pos], "bucket {pos} visited twice");
                    seen[pos] = true;
                    pos = next_slot(pos, mask);
                }
                assert_eq!(pos, start);
                assert!(seen.iter().all(|&s| s));
            }
        }
    }
}
