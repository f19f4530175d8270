//! Placement Hash
//!
//! Maps a secondary key onto the signed 32-bit hash space used by the partition table.
//!
//! Nodes recompute this hash independently, so it has to be bit-identical everywhere.
//! That rules out `std::hash::Hash` (the `DefaultHasher` algorithm is not stable across
//! Rust releases). Keys instead expose a stable 32-bit code through [`HashCode`], which is
//! then spread across the full range by one round of a 128-bit Murmur-style mix.

const SEED: u64 = 9001;
const H1_INIT: u64 = 0x9368_e53c_2f6a_f274 ^ SEED;
const H2_INIT: u64 = 0x586d_cd20_8f7c_d3fd ^ SEED;
const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

/// A 32-bit hash code that is identical on every node of the cluster.
///
/// The built-in implementations are fixed formulas with no per-process state:
/// strings fold their UTF-16 code units with `h = 31 * h + unit`, 64-bit integers
/// fold their halves together, smaller integers are used as-is.
pub trait HashCode {
    fn hash_code(&self) -> i32;
}

impl HashCode for str {
    fn hash_code(&self) -> i32 {
        self.encode_utf16()
            .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
    }
}

impl HashCode for String {
    fn hash_code(&self) -> i32 {
        self.as_str().hash_code()
    }
}

impl<T: HashCode + ?Sized> HashCode for &T {
    fn hash_code(&self) -> i32 {
        (**self).hash_code()
    }
}

impl HashCode for i64 {
    fn hash_code(&self) -> i32 {
        (*self ^ ((*self as u64) >> 32) as i64) as i32
    }
}

impl HashCode for u64 {
    fn hash_code(&self) -> i32 {
        (*self ^ (*self >> 32)) as i32
    }
}

impl HashCode for bool {
    fn hash_code(&self) -> i32 {
        if *self { 1231 } else { 1237 }
    }
}

impl HashCode for char {
    fn hash_code(&self) -> i32 {
        *self as i32
    }
}

macro_rules! widening_hash_code {
    ($($ty:ty),*) => {
        $(
            impl HashCode for $ty {
                fn hash_code(&self) -> i32 {
                    *self as i32
                }
            }
        )*
    };
}

widening_hash_code!(i8, u8, i16, u16, i32, u32);

/// Hash used to place `key` into a partition range.
pub fn placement_hash<T: HashCode + ?Sized>(key: &T) -> i32 {
    mix(key.hash_code())
}

/// Spreads a 32-bit hash code over the whole `i32` range.
///
/// The code is treated as a single 4-byte block: each byte is sign-extended and
/// xored into `k1` at its position, the block is mixed once and finalized with
/// length 4, and the high 32 bits of `h1` are returned.
pub fn mix(code: i32) -> i32 {
    let mut h1 = H1_INIT;
    let mut h2 = H2_INIT;

    let mut k1 = pack_block(code);
    let mut k2 = 0u64;

    k1 = k1.wrapping_mul(C1);
    k1 = k1.rotate_left(23);
    k1 = k1.wrapping_mul(C2);
    h1 ^= k1;
    h1 = h1.wrapping_add(h2);
    h2 = h2.rotate_left(41);

    k2 = k2.wrapping_mul(C2);
    k2 = k2.rotate_left(23);
    k2 = k2.wrapping_mul(C1);
    h2 ^= k2;
    h2 = h2.wrapping_add(h1);

    h1 = h1.wrapping_mul(3).wrapping_add(0x52dc_e729);
    h2 = h2.wrapping_mul(3).wrapping_add(0x3849_5ab5);

    h2 ^= 4;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);

    (h1 >> 32) as u32 as i32
}

/// Packs the little-endian bytes of `code` into one block word. Bytes are signed, so
/// a byte of `0x80` or more also flips every bit above its position.
fn pack_block(code: i32) -> u64 {
    let [b0, b1, b2, b3] = code.to_le_bytes();

    let block = ((b3 as i8 as i64) << 24)
        ^ ((b2 as i8 as i64) << 16)
        ^ ((b1 as i8 as i64) << 8)
        ^ (b0 as i8 as i64);
    block as u64
}

fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}
