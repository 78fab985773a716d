//! Bob Jenkins' lookup3 integer hashing.
//!
//! Original algorithm by Bob Jenkins (public domain). This crate only exposes
//! the fixed-length word variants (1 to 4 `u32` words) that are used to derive
//! stable element ids, not the byte-stream hash.
//!
//! All functions are pure: the same input always produces the same output on
//! every platform.

/// Seed shared by all variants, offset by the word count like `hashword`.
#[inline]
const fn seed(words: u32) -> u32 {
    0xdeadbeef_u32
        .wrapping_add(words << 2)
        .wrapping_add(13)
}

/// Reversible mixing of three words.
#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*a);
    *c ^= a.rotate_left(8);
    *b = b.wrapping_add(*a);

    *a = a.wrapping_sub(*b);
    *a ^= b.rotate_left(16);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*c);
    *b ^= c.rotate_left(19);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*a);
    *c ^= a.rotate_left(4);
    *b = b.wrapping_add(*a);
}

/// Final mixing of three words into `c`.
#[inline]
fn final_mix(mut a: u32, mut b: u32, mut c: u32) -> u32 {
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(14));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(11));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(25));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(16));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(4));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(14));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(24));
    c
}

/// Hash a single word.
#[inline]
pub fn hash1(kx: u32) -> u32 {
    let s = seed(1);
    final_mix(s.wrapping_add(kx), s, s)
}

/// Hash two words. Argument order matters: `hash2(a, b) != hash2(b, a)` in general.
#[inline]
pub fn hash2(kx: u32, ky: u32) -> u32 {
    let s = seed(2);
    final_mix(s.wrapping_add(kx), s.wrapping_add(ky), s)
}

/// Hash three words.
#[inline]
pub fn hash3(kx: u32, ky: u32, kz: u32) -> u32 {
    let s = seed(3);
    final_mix(s.wrapping_add(kx), s.wrapping_add(ky), s.wrapping_add(kz))
}

/// Hash four words.
#[inline]
pub fn hash4(kx: u32, ky: u32, kz: u32, kw: u32) -> u32 {
    let s = seed(4);
    let mut a = s.wrapping_add(kx);
    let mut b = s.wrapping_add(ky);
    let mut c = s.wrapping_add(kz);
    mix(&mut a, &mut b, &mut c);
    a = a.wrapping_add(kw);
    final_mix(a, b, c)
}
