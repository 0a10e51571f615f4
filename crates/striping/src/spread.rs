/// Avalanching finalizer applied to key hashes before stripe selection.
///
/// This is the murmur3 `fmix64` mixer: every input bit affects every output bit, so keys whose
/// hashes differ only in high bits (or cluster in low bits) still land on different stripes.
#[inline]
pub const fn spread(hash: u64) -> u64 {
	let mut h = hash;
	h ^= h >> 33;
	h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
	h ^= h >> 33;
	h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
	h ^= h >> 33;
	h
}
