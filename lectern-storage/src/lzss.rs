//! LZSS ring-buffer compression.
//!
//! The legacy codec some older modules declare. A 4096-byte ring buffer,
//! initially space-filled, slides over the stream; output is groups of
//! eight units prefixed by a flag byte, consumed low bit first:
//!
//! ```text
//! flags: 1 bit per unit, LSB first; 1 = literal, 0 = back-reference
//! literal:        1 byte, copied through
//! back-reference: 2 bytes  b0       = position bits 0-7
//!                          b1 >> 4  = position bits 8-11
//!                          b1 & 0xF = copy length - 3
//! ```
//!
//! A reference copies `length` bytes (3..=18) out of the ring at `position`.
//! The encoder finds matches with a binary tree of ring positions, one root
//! per possible first byte. Ring indices are unsigned bytes throughout;
//! streams containing bytes >= 0x80 encode and decode consistently.

/// Ring buffer size. Positions fit in 12 bits.
const RING_SIZE: usize = 4096;

/// Longest copyable match. Lengths 3..=18 fit the 4-bit field.
const MAX_STORE_LENGTH: usize = 18;

/// Shortest match worth a back-reference; shorter runs ship as literals.
const THRESHOLD: usize = 3;

/// Absent-node sentinel in the match tree.
const NOT_USED: u16 = RING_SIZE as u16;

/// Decode an LZSS stream. `expected` sizes the output buffer when the
/// caller's index declares an uncompressed length; decoding itself runs to
/// the end of the input either way. Truncated input decodes to the prefix
/// the complete units cover.
pub fn decode(input: &[u8], expected: Option<usize>) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected.unwrap_or(input.len().saturating_mul(2)));
    let mut ring = [0u8; RING_SIZE];
    ring[..RING_SIZE - MAX_STORE_LENGTH].fill(b' ');
    let mut r = RING_SIZE - MAX_STORE_LENGTH;

    let mut pos_in = 0usize;
    let mut flags = 0u8;
    let mut flag_count = 0u8;

    loop {
        if flag_count > 0 {
            flags >>= 1;
            flag_count -= 1;
        } else {
            let Some(&b) = input.get(pos_in) else { break };
            pos_in += 1;
            flags = b;
            flag_count = 7;
        }

        if flags & 1 != 0 {
            let Some(&b) = input.get(pos_in) else { break };
            pos_in += 1;
            out.push(b);
            ring[r] = b;
            r = (r + 1) & (RING_SIZE - 1);
        } else {
            if pos_in + 2 > input.len() {
                break;
            }
            let b0 = input[pos_in] as usize;
            let b1 = input[pos_in + 1] as usize;
            pos_in += 2;
            let pos = b0 | ((b1 & 0xF0) << 4);
            let len = (b1 & 0x0F) + THRESHOLD;
            for k in 0..len {
                let c = ring[(pos + k) & (RING_SIZE - 1)];
                ring[r] = c;
                r = (r + 1) & (RING_SIZE - 1);
                out.push(c);
            }
        }
    }
    out
}

/// Encode a buffer as an LZSS stream.
pub fn encode(input: &[u8]) -> Vec<u8> {
    // The ring carries MAX_STORE_LENGTH - 1 extra bytes mirroring its front
    // so match comparisons near the wrap point need no index adjustment.
    let mut ring = [0u8; RING_SIZE + MAX_STORE_LENGTH - 1];
    let mut tree = MatchTree::new();
    let mut find = MatchState {
        position: 0,
        length: 0,
    };

    let start = RING_SIZE - MAX_STORE_LENGTH;
    ring[..start].fill(b' ');
    let mut len = input.len().min(MAX_STORE_LENGTH);
    ring[start..start + len].copy_from_slice(&input[..len]);
    if len == 0 {
        return Vec::new();
    }
    let mut read_offset = len;

    let mut s = 0usize;
    let mut r = start;

    // Seed the tree with the space-prefixed strings leading into the data,
    // then the string at r itself, which primes the first match.
    for i in 1..=MAX_STORE_LENGTH {
        tree.insert(&ring, r - i, &mut find);
    }
    tree.insert(&ring, r, &mut find);

    let mut out = Vec::with_capacity(input.len() / 2 + 17);
    let mut code_buf = [0u8; 17];
    let mut code_pos = 1usize;
    let mut mask = 1u8;

    loop {
        // The tree can report matches running past the live data near the
        // end of the stream.
        if find.length > len {
            find.length = len;
        }

        if find.length < THRESHOLD {
            find.length = 1;
            code_buf[0] |= mask;
            code_buf[code_pos] = ring[r];
            code_pos += 1;
        } else {
            code_buf[code_pos] = find.position as u8;
            code_buf[code_pos + 1] =
                (((find.position >> 4) & 0xF0) as u8) | ((find.length - THRESHOLD) as u8);
            code_pos += 2;
        }

        mask <<= 1;
        if mask == 0 {
            out.extend_from_slice(&code_buf[..code_pos]);
            code_buf[0] = 0;
            code_pos = 1;
            mask = 1;
        }

        let last_match_length = find.length;
        let mut i = 0usize;
        while i < last_match_length {
            let Some(&c) = input.get(read_offset) else {
                break;
            };
            read_offset += 1;

            tree.delete(s);
            ring[s] = c;
            if s < MAX_STORE_LENGTH - 1 {
                ring[s + RING_SIZE] = c;
            }
            s = (s + 1) & (RING_SIZE - 1);
            r = (r + 1) & (RING_SIZE - 1);
            tree.insert(&ring, r, &mut find);
            i += 1;
        }

        // Input ran dry mid-match: retire the remaining positions without
        // refilling. `len` reaching 0 ends the encode.
        while i < last_match_length {
            tree.delete(s);
            s = (s + 1) & (RING_SIZE - 1);
            r = (r + 1) & (RING_SIZE - 1);
            len -= 1;
            if len != 0 {
                tree.insert(&ring, r, &mut find);
            }
            i += 1;
        }

        if len == 0 {
            break;
        }
    }

    if code_pos > 1 {
        out.extend_from_slice(&code_buf[..code_pos]);
    }
    out
}

/// Longest match located by the most recent [`MatchTree::insert`].
struct MatchState {
    position: usize,
    length: usize,
}

/// Binary tree over ring positions.
///
/// Nodes 0..RING_SIZE are ring positions; slots RING_SIZE+1+c in `right`
/// are the roots of the per-first-byte subtrees. Slot RING_SIZE is the
/// absent sentinel and doubles as scratch for writes through absent links.
/// Roots attach children on the `right` side only.
struct MatchTree {
    dad: Box<[u16; RING_SIZE + 1]>,
    left: Box<[u16; RING_SIZE + 1]>,
    right: Box<[u16; RING_SIZE + 257]>,
}

impl MatchTree {
    fn new() -> MatchTree {
        MatchTree {
            dad: Box::new([NOT_USED; RING_SIZE + 1]),
            left: Box::new([NOT_USED; RING_SIZE + 1]),
            right: Box::new([NOT_USED; RING_SIZE + 257]),
        }
    }

    /// Insert the string at ring position `pos`, recording the longest
    /// existing match in `find`. A full-length match replaces the old node
    /// with the new one, since the old one retires from the ring sooner.
    fn insert(&mut self, ring: &[u8], pos: usize, find: &mut MatchState) {
        let key = pos;
        let mut cmp = 1i32;
        let mut p = RING_SIZE + 1 + ring[key] as usize;

        self.left[pos] = NOT_USED;
        self.right[pos] = NOT_USED;
        find.length = 0;

        loop {
            if cmp >= 0 {
                if self.right[p] != NOT_USED {
                    p = self.right[p] as usize;
                } else {
                    self.right[p] = pos as u16;
                    self.dad[pos] = p as u16;
                    return;
                }
            } else if self.left[p] != NOT_USED {
                p = self.left[p] as usize;
            } else {
                self.left[p] = pos as u16;
                self.dad[pos] = p as u16;
                return;
            }

            let mut i = 1;
            while i < MAX_STORE_LENGTH {
                cmp = ring[key + i] as i32 - ring[p + i] as i32;
                if cmp != 0 {
                    break;
                }
                i += 1;
            }

            if i > find.length {
                find.position = p;
                find.length = i;
                if i >= MAX_STORE_LENGTH {
                    break;
                }
            }
        }

        // Full match: splice pos into p's place and drop p.
        self.dad[pos] = self.dad[p];
        self.left[pos] = self.left[p];
        self.right[pos] = self.right[p];
        self.dad[self.left[p] as usize] = pos as u16;
        self.dad[self.right[p] as usize] = pos as u16;
        if self.right[self.dad[p] as usize] == p as u16 {
            self.right[self.dad[p] as usize] = pos as u16;
        } else {
            self.left[self.dad[p] as usize] = pos as u16;
        }
        self.dad[p] = NOT_USED;
    }

    /// Unlink ring position `node` ahead of its cell being overwritten.
    fn delete(&mut self, node: usize) {
        if self.dad[node] == NOT_USED {
            return;
        }

        let q: usize;
        if self.right[node] == NOT_USED {
            q = self.left[node] as usize;
        } else if self.left[node] == NOT_USED {
            q = self.right[node] as usize;
        } else {
            // Both children: lift the rightmost node of the left subtree.
            let mut m = self.left[node] as usize;
            if self.right[m] != NOT_USED {
                loop {
                    m = self.right[m] as usize;
                    if self.right[m] == NOT_USED {
                        break;
                    }
                }
                self.right[self.dad[m] as usize] = self.left[m];
                self.dad[self.left[m] as usize] = self.dad[m];
                self.left[m] = self.left[node];
                self.dad[self.left[node] as usize] = m as u16;
            }
            self.right[m] = self.right[node];
            self.dad[self.right[node] as usize] = m as u16;
            q = m;
        }

        self.dad[q] = self.dad[node];
        if self.right[self.dad[node] as usize] == node as u16 {
            self.right[self.dad[node] as usize] = q as u16;
        } else {
            self.left[self.dad[node] as usize] = q as u16;
        }
        self.dad[node] = NOT_USED;
    }
}
