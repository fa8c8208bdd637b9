use ethnum::U256;

/// Big-endian target for `nbits = 0x1d00ffff`, the dividend difficulty is
/// measured against.
const MAX_TARGET_DIVIDEND: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Expands the compact `nbits` encoding into a big-endian 256-bit target.
///
/// The exponent is the top byte, the mantissa the low 3 bytes with the
/// mantissa's sign bit masked off.  Mantissa bytes that an oversized or
/// undersized exponent pushes outside the 32-byte buffer are silently
/// dropped, matching the historical bitcoind behavior that deployed
/// light-client contracts rely on.
pub fn nbits_to_target(nbits: u32) -> [u8; 32] {
    let mut target = [0u8; 32];
    let size = (nbits >> 24) & 0xFF;
    let word = [
        ((nbits >> 16) & 0x7F) as u8,
        ((nbits >> 8) & 0xFF) as u8,
        (nbits & 0xFF) as u8,
    ];

    let start = 32i64 - size as i64;
    for (i, byte) in word.into_iter().enumerate() {
        let pos = start + i as i64;
        if (0..32).contains(&pos) {
            target[pos as usize] = byte;
        }
    }
    target
}

/// Base-256 long division of a 32-byte big-endian integer by a small
/// scalar, quotient written in place.
fn div_in_place(arr: &mut [u8; 32], divisor: u32) {
    let mut remainder = 0u32;
    for byte in arr.iter_mut() {
        let val = *byte as u32 + remainder;
        *byte = (val / divisor) as u8;
        remainder = (val % divisor) * 256;
    }
}

/// Computes the difficulty for `nbits` as a big-endian 256-bit integer,
/// defined as `target(0x1d00ffff) / target(nbits)` with truncation at each
/// digit of the byte-wise long division.
///
/// Total over all inputs; an all-zero target (or one truncated down to a
/// zero mantissa) yields an all-zero difficulty.
pub fn difficulty(nbits: u32) -> [u8; 32] {
    let target = nbits_to_target(nbits);
    let start = target.iter().position(|b| *b != 0).unwrap_or(0);

    // The nonzero mantissa triplet sits at `start` by construction, so the
    // quotient is realigned by the remaining byte count.  Truncated targets
    // can drive `shift` negative; bytes falling off either end are dropped.
    let shift = 32 - start as i64 - 3;

    let mut num = 0u32;
    for i in 0..3usize {
        if let Some(byte) = target.get(start + i) {
            num |= (*byte as u32) << ((2 - i) * 8);
        }
    }
    if num == 0 {
        return [0u8; 32];
    }

    let mut quot = MAX_TARGET_DIVIDEND;
    div_in_place(&mut quot, num);

    let mut result = [0u8; 32];
    for i in 0..(32 - shift) {
        let pos = i + shift;
        if !(0..32).contains(&pos) {
            continue;
        }
        if let Some(byte) = quot.get(i as usize) {
            result[pos as usize] = *byte;
        }
    }
    result
}

/// Computes the expected work of a single header with the given `nbits`,
/// `⌊2^256 / (target + 1)⌋`, as a big-endian 256-bit integer.
///
/// Evaluated as `(!T) / (T + 1) + 1` in 256-bit arithmetic with wrapping
/// adds, so the function stays total: the zero target wraps to zero work,
/// and no compact encoding can produce the all-ones target.
pub fn chainwork(nbits: u32) -> [u8; 32] {
    let t = U256::from_be_bytes(nbits_to_target(nbits));
    let w = ((!t) / t.wrapping_add(U256::ONE)).wrapping_add(U256::ONE);
    w.to_be_bytes()
}
