//! Deterministic hash-based type identity.
//!
//! [`TypeHash`] is a 64-bit hash that identifies a host type. Hashes are computed
//! from names, so the same type described twice (for example a generic instance
//! built by two separate lookups) compares equal without any shared registry.
//!
//! # Examples
//!
//! ```
//! use tether_core::TypeHash;
//!
//! let list = TypeHash::from_name("List");
//! let int = TypeHash::from_name("int");
//! let string = TypeHash::from_name("string");
//!
//! let a = TypeHash::from_generic_instance(list, &[int]);
//! let b = TypeHash::from_generic_instance(list, &[string]);
//! assert_ne!(a, b);
//! assert_eq!(a, TypeHash::from_generic_instance(list, &[int]));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for composite hashes
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for array, nullable and by-reference wrappers
    pub const WRAPPER: u64 = 0x3e9f5d2a8c7b1403;

    /// Argument position mixing constants, so argument order matters.
    pub const ARG_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a host type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create the hash of a generic instance from its definition and type arguments.
    ///
    /// Argument order matters: `Map<int, string>` differs from `Map<string, int>`.
    #[inline]
    pub fn from_generic_instance(definition: TypeHash, args: &[TypeHash]) -> Self {
        TypeHash(mix(definition.0, args))
    }

    /// Create the hash of a wrapper type (array, nullable, by-reference) around `inner`.
    ///
    /// `tag` distinguishes the wrapper flavour, e.g. `"[]"`, `"[,]"`, `"?"` or `"&"`.
    #[inline]
    pub fn from_wrapper(tag: &str, inner: TypeHash) -> Self {
        let seed = hash_constants::WRAPPER ^ xxh64(tag.as_bytes(), 0);
        TypeHash(mix(seed, &[inner]))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix(seed: u64, args: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, arg) in args.iter().enumerate() {
        let marker = hash_constants::ARG_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::ARG_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the combination order-sensitive
        hash = hash
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(marker ^ arg.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
