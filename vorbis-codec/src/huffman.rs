// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical Huffman tree construction and bit-by-bit decode (§4.4).
//!
//! The teacher builds codewords with a "next codeword per depth" table
//! (`codebook.rs::synthesize_codewords`) and hands them to a separate
//! `io::vlc::CodebookBuilder`, whose supporting module was not present in
//! the retrieved pack. Per §9's explicit design note, this module instead
//! represents the tree itself as an arena: a `Vec<Node>` with `u32` child
//! indices, avoiding the pointer-graph-with-up-references style of the
//! original algorithm described in §4.4. Codeword synthesis reuses the
//! teacher's "next codeword per depth" approach (the canonical-Huffman
//! algorithm the Vorbis reference decoder itself uses), since that part
//! is orthogonal to how the tree is stored.

use vorbis_core::bits::BitReaderRtl;
use vorbis_core::errors::{decode_error, Result};

#[derive(Clone, Copy)]
enum Child {
    Empty,
    Leaf(u32),
    Node(u32),
}

struct Node {
    children: [Child; 2],
}

/// A canonical Huffman tree over a codebook's entries, stored as an arena
/// of nodes with index-based children (§9's "arena + index" guidance).
pub struct HuffmanTree {
    nodes: Vec<Node>,
}

/// Assigns a canonical codeword to each used entry given its codeword
/// length (`0` marks an unused/sparse entry). This is the same "next
/// codeword per depth" construction the Vorbis reference decoder uses;
/// only the representation built from it (a tree vs. a flat codeword
/// table) differs from the teacher.
fn synthesize_codewords(lens: &[u8]) -> Result<Vec<Option<(u32, u8)>>> {
    let mut codewords = Vec::with_capacity(lens.len());
    let mut next_codeword = [0u32; 33];

    for &len in lens {
        if len == 0 {
            codewords.push(None);
            continue;
        }

        let n = usize::from(len);
        let codeword = next_codeword[n];

        if len < 32 && (codeword >> len) > 0 {
            return decode_error("vorbis: codebook overspecified");
        }

        // Advance the per-depth "next codeword" table: find the shallowest
        // depth at or below `n` whose codeword still has a free low bit,
        // flip it, and rebuild everything below as a fresh left-leaning
        // chain.
        for i in (0..n + 1).rev() {
            if next_codeword[i] & 1 == 1 {
                next_codeword[i] = next_codeword[i - 1] << 1;
                break;
            }
            next_codeword[i] += 1;
        }

        // Any deeper "next codeword" entries that used `codeword` as a
        // prefix must be redirected to branch off the new sibling instead.
        let branch = next_codeword[n];
        for (i, next) in next_codeword[n..].iter_mut().enumerate().skip(1) {
            if *next == codeword << i {
                *next = branch << i;
            }
            else {
                break;
            }
        }

        codewords.push(Some((codeword, len)));
    }

    Ok(codewords)
}

impl HuffmanTree {
    /// Builds a canonical Huffman tree from per-entry codeword lengths.
    /// `lens[i] == 0` marks entry `i` as unused (sparse codebook, §4.5).
    pub fn new(lens: &[u8]) -> Result<Self> {
        let codewords = synthesize_codewords(lens)?;
        let used = codewords.iter().filter(|c| c.is_some()).count();

        let mut tree = HuffmanTree { nodes: vec![Node { children: [Child::Empty, Child::Empty] }] };

        for (entry, codeword) in codewords.into_iter().enumerate() {
            let Some((bits, len)) = codeword else { continue };
            tree.insert(bits, len, entry as u32)?;
        }

        // Errata 20150226: a codebook with exactly one used entry is
        // permitted to leave its tree incomplete (the single codeword
        // "0" with no sibling at "1").
        if used != 1 && !tree.is_complete() {
            return decode_error("vorbis: codebook underspecified");
        }

        Ok(tree)
    }

    fn insert(&mut self, codeword: u32, len: u8, entry: u32) -> Result<()> {
        let mut current = 0u32;

        for bit_idx in 0..len {
            let shift = len - 1 - bit_idx;
            let bit = ((codeword >> shift) & 1) as usize;
            let is_last = bit_idx + 1 == len;

            match self.nodes[current as usize].children[bit] {
                Child::Empty => {
                    if is_last {
                        self.nodes[current as usize].children[bit] = Child::Leaf(entry);
                    }
                    else {
                        let idx = self.nodes.len() as u32;
                        self.nodes.push(Node { children: [Child::Empty, Child::Empty] });
                        self.nodes[current as usize].children[bit] = Child::Node(idx);
                        current = idx;
                    }
                }
                Child::Node(idx) => {
                    if is_last {
                        return decode_error("vorbis: codebook overspecified");
                    }
                    current = idx;
                }
                Child::Leaf(_) => return decode_error("vorbis: codebook overspecified"),
            }
        }

        Ok(())
    }

    /// True if every internal node in the tree has both children filled
    /// (either a leaf or a further internal node) -- the Kraft-equality
    /// condition of §8 item 2.
    fn is_complete(&self) -> bool {
        self.nodes.iter().all(|node| node.children.iter().all(|c| !matches!(c, Child::Empty)))
    }

    /// Descends the tree one bit at a time, returning the leaf's entry
    /// index once reached.
    pub fn read_entry(&self, bits: &mut BitReaderRtl<'_>) -> Result<u32> {
        let mut current = 0u32;

        loop {
            let bit = bits.read_bits_leq32(1)? as usize;

            match self.nodes[current as usize].children[bit] {
                Child::Leaf(entry) => return Ok(entry),
                Child::Node(idx) => current = idx,
                Child::Empty => return decode_error("vorbis: huffman descent into empty node"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// §8 item 3: decoding the codeword of each entry returns that entry.
    #[test]
    fn verify_decode_round_trip() {
        // A small complete tree: 4 entries of length 2 each.
        let lens = [2u8, 2, 2, 2];
        let tree = HuffmanTree::new(&lens).unwrap();

        for entry in 0..4u32 {
            // Re-derive this entry's codeword the same way the tree did.
            let codewords = synthesize_codewords(&lens).unwrap();
            let (codeword, len) = codewords[entry as usize].unwrap();

            let mut byte = 0u8;
            for i in 0..len {
                let bit = (codeword >> (len - 1 - i)) & 1;
                byte |= (bit as u8) << i;
            }

            let data = [byte];
            let mut reader = BitReaderRtl::new(&data);
            assert_eq!(tree.read_entry(&mut reader).unwrap(), entry);
        }
    }

    #[test]
    fn verify_sparse_entries_are_skipped() {
        let lens = [2u8, 0, 2, 2, 2];
        assert!(HuffmanTree::new(&lens).is_ok());
    }

    #[test]
    fn verify_single_entry_codebook_is_accepted() {
        let lens = [1u8];
        assert!(HuffmanTree::new(&lens).is_ok());
    }

    #[test]
    fn verify_underpopulated_tree_is_rejected() {
        // Two entries of length 2 leave half the tree unfilled.
        let lens = [2u8, 2];
        assert!(HuffmanTree::new(&lens).is_err());
    }

    #[test]
    fn verify_overpopulated_tree_is_rejected() {
        // Three entries of length 1 cannot fit in a binary tree.
        let lens = [1u8, 1, 1];
        assert!(HuffmanTree::new(&lens).is_err());
    }

    #[test]
    fn verify_matches_teacher_codeword_assignment() {
        let lens = [2u8, 4, 4, 4, 4, 2, 3, 3];
        let expected = [0u32, 0x4, 0x5, 0x6, 0x7, 0x2, 0x6, 0x7];

        let codewords = synthesize_codewords(&lens).unwrap();
        for (i, &exp) in expected.iter().enumerate() {
            assert_eq!(codewords[i].unwrap().0, exp, "entry {i}");
        }
    }
}
