//! Packed k-mers and sequence utilities.
//!
//! A [`Kmer`] stores up to [`Kmer::MAX_K`] nucleotides in a single 64-bit word using two bits per base.
//! Only `ACGT` (case-insensitive) can be encoded.
//! [`KmerIter`] iterates over the k-mers of a sequence, skipping windows that contain other symbols.

use crate::error::{LinkError, Result};

use std::fmt::{self, Display};
use std::str::FromStr;

//-----------------------------------------------------------------------------

const DECODE: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Returns the 2-bit code of a nucleotide, or [`None`] if the symbol is not in `acgtACGT`.
#[inline]
pub fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Returns `true` if the symbol is a nucleotide in `acgtACGT`.
#[inline]
pub fn is_valid_base(base: u8) -> bool {
    encode_base(base).is_some()
}

/// Returns the reverse complement of a DNA sequence.
///
/// The case of `acgtACGT` is preserved and all other symbols become `N`.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|base| match base {
        b'A' => b'T', b'C' => b'G', b'G' => b'C', b'T' => b'A',
        b'a' => b't', b'c' => b'g', b'g' => b'c', b't' => b'a',
        _ => b'N',
    }).collect()
}

//-----------------------------------------------------------------------------

/// A k-mer packed into a 64-bit integer.
///
/// The first base is stored in the most significant position, so k-mers of the same length compare in lexicographic order.
/// The canonical form of a k-mer ([`Kmer::rep`]) is the smaller of the k-mer and its reverse complement.
///
/// # Examples
///
/// ```
/// use linked_dbg::Kmer;
///
/// let kmer: Kmer = "TTCGA".parse().unwrap();
/// assert_eq!(kmer.k(), 5);
/// assert_eq!(kmer.reverse_complement().to_string(), "TCGAA");
/// assert_eq!(kmer.rep().to_string(), "TCGAA");
/// assert_eq!(kmer.forward_base(b'T').unwrap().to_string(), "TCGAT");
/// assert_eq!(kmer.last_base(), b'A');
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kmer {
    value: u64,
    len: u8,
}

impl Kmer {
    /// Maximum supported k-mer length.
    pub const MAX_K: usize = 32;

    #[inline]
    fn mask(k: usize) -> u64 {
        if k >= Self::MAX_K { u64::MAX } else { (1u64 << (2 * k)) - 1 }
    }

    /// Creates a k-mer from a sequence of length `1..=MAX_K`.
    ///
    /// Returns [`None`] if the length is not supported or the sequence contains symbols other than `acgtACGT`.
    pub fn from_bytes(sequence: &[u8]) -> Option<Self> {
        if sequence.is_empty() || sequence.len() > Self::MAX_K {
            return None;
        }
        let mut value = 0;
        for base in sequence {
            value = (value << 2) | encode_base(*base)?;
        }
        Some(Kmer { value, len: sequence.len() as u8 })
    }

    /// Returns the length of the k-mer.
    #[inline]
    pub fn k(&self) -> usize {
        self.len as usize
    }

    /// Returns the base at the given offset as an uppercase ASCII symbol.
    ///
    /// # Panics
    ///
    /// Panics if `offset >= self.k()`.
    #[inline]
    pub fn base(&self, offset: usize) -> u8 {
        assert!(offset < self.k(), "Offset {} out of bounds for a {}-mer", offset, self.k());
        let shift = 2 * (self.k() - 1 - offset);
        DECODE[((self.value >> shift) & 3) as usize]
    }

    /// Returns the first base.
    #[inline]
    pub fn first_base(&self) -> u8 {
        self.base(0)
    }

    /// Returns the last base, which is the symbol an edge into this k-mer adds.
    #[inline]
    pub fn last_base(&self) -> u8 {
        DECODE[(self.value & 3) as usize]
    }

    /// Returns the k-mer obtained by dropping the first base and appending `base`.
    ///
    /// Returns [`None`] if `base` is not a nucleotide.
    pub fn forward_base(&self, base: u8) -> Option<Self> {
        let code = encode_base(base)?;
        let value = ((self.value << 2) | code) & Self::mask(self.k());
        Some(Kmer { value, len: self.len })
    }

    /// Returns the k-mer obtained by dropping the last base and prepending `base`.
    ///
    /// Returns [`None`] if `base` is not a nucleotide.
    pub fn backward_base(&self, base: u8) -> Option<Self> {
        let code = encode_base(base)?;
        let value = (self.value >> 2) | (code << (2 * (self.k() - 1)));
        Some(Kmer { value, len: self.len })
    }

    /// Returns the reverse complement of the k-mer.
    pub fn reverse_complement(&self) -> Self {
        let mut source = !self.value;
        let mut value = 0;
        for _ in 0..self.k() {
            value = (value << 2) | (source & 3);
            source >>= 2;
        }
        Kmer { value, len: self.len }
    }

    /// Returns the canonical representative: the smaller of the k-mer and its reverse complement.
    pub fn rep(&self) -> Self {
        let rc = self.reverse_complement();
        if rc < *self { rc } else { *self }
    }

    /// Returns `true` if the k-mer is its own canonical representative.
    pub fn is_canonical(&self) -> bool {
        self.rep() == *self
    }

    /// Returns the k-mer as an uppercase ASCII sequence.
    pub fn to_bytes(&self) -> Vec<u8> {
        (0..self.k()).map(|offset| self.base(offset)).collect()
    }
}

impl Display for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for offset in 0..self.k() {
            write!(f, "{}", self.base(offset) as char)?;
        }
        Ok(())
    }
}

impl FromStr for Kmer {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        Kmer::from_bytes(s.as_bytes()).ok_or_else(|| LinkError::InvalidInput(format!("Invalid k-mer: {}", s)))
    }
}

//-----------------------------------------------------------------------------

/// An iterator over the k-mers of a sequence.
///
/// Yields `(offset, kmer)` pairs in sequence order.
/// Windows containing symbols other than `acgtACGT` are skipped.
///
/// # Examples
///
/// ```
/// use linked_dbg::KmerIter;
///
/// let kmers: Vec<(usize, String)> = KmerIter::new(b"ACGTNACGTA", 3)
///     .map(|(offset, kmer)| (offset, kmer.to_string()))
///     .collect();
/// assert_eq!(kmers, vec![
///     (0, String::from("ACG")), (1, String::from("CGT")),
///     (5, String::from("ACG")), (6, String::from("CGT")), (7, String::from("GTA")),
/// ]);
/// ```
#[derive(Clone, Debug)]
pub struct KmerIter<'a> {
    sequence: &'a [u8],
    k: usize,
    // Offset of the next symbol to consume.
    next: usize,
    value: u64,
    // Number of valid symbols at the end of the current window.
    valid: usize,
}

impl<'a> KmerIter<'a> {
    /// Creates an iterator over the `k`-mers of the sequence.
    ///
    /// The iterator is empty if `k` is zero or larger than [`Kmer::MAX_K`].
    pub fn new(sequence: &'a [u8], k: usize) -> Self {
        let next = if k == 0 || k > Kmer::MAX_K { sequence.len() } else { 0 };
        KmerIter { sequence, k, next, value: 0, valid: 0 }
    }
}

impl<'a> Iterator for KmerIter<'a> {
    type Item = (usize, Kmer);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.sequence.len() {
            let symbol = self.sequence[self.next];
            self.next += 1;
            match encode_base(symbol) {
                Some(code) => {
                    self.value = ((self.value << 2) | code) & Kmer::mask(self.k);
                    self.valid += 1;
                    if self.valid >= self.k {
                        let kmer = Kmer { value: self.value, len: self.k as u8 };
                        return Some((self.next - self.k, kmer));
                    }
                },
                None => {
                    self.value = 0;
                    self.valid = 0;
                },
            }
        }
        None
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
