//! Adaptive Huffman coding over byte symbols.
//!
//! This is the legacy self-learning entropy coder: 256 byte symbols plus one
//! NYT ("not yet transmitted") sentinel. Every symbol starts as NYT; the
//! first occurrence is sent as the NYT code followed by the raw 8 bits, and
//! each occurrence rebalances the tree via [`Huff::add_ref`] while preserving
//! the sibling property. Among nodes of equal weight the most recently
//! inserted one ranks highest, and that tie-break is part of the wire format, so
//! the tree is held in index-linked arrays (node indices plus a block-head
//! arena mirroring the legacy rank bookkeeping), never a pointer graph, and
//! the update order is reproduced exactly rather than re-derived.
//!
//! A [`Huff`] instance is private to a single compress-or-decompress call.
//! Encoder and decoder trees must start empty and receive symbols in
//! identical order to stay synchronized; reusing an instance across
//! independent operations breaks that invariant.

/// Number of real byte symbols.
pub const HMAX: usize = 256;

/// The "not yet transmitted" sentinel symbol.
pub const NYT: usize = HMAX;

const INTERNAL: u16 = (HMAX as u16) + 1;
const NONE: u16 = u16::MAX;

/// Append one bit to `window` at `*bloc`, LSB-first within each byte.
/// Each byte is zeroed when its first bit lands in it.
pub fn add_bit(bit: u8, window: &mut [u8], bloc: &mut usize) {
    if *bloc & 7 == 0 {
        window[*bloc >> 3] = 0;
    }
    window[*bloc >> 3] |= bit << (*bloc & 7);
    *bloc += 1;
}

/// Read one bit from `window` at `*bloc`, LSB-first within each byte.
pub fn get_bit(window: &[u8], bloc: &mut usize) -> u8 {
    let b = (window[*bloc >> 3] >> (*bloc & 7)) & 1;
    *bloc += 1;
    b
}

#[derive(Debug, Clone, Copy)]
struct Node {
    left: u16,
    right: u16,
    parent: u16,
    /// Neighbors in the weight-ordered list; `next` points toward higher
    /// rank.
    next: u16,
    prev: u16,
    /// Index into the block-head arena; the slot holds the highest-ranked
    /// node of this node's equal-weight block.
    head: u16,
    weight: u32,
    symbol: u16,
}

const EMPTY_NODE: Node = Node {
    left: NONE,
    right: NONE,
    parent: NONE,
    next: NONE,
    prev: NONE,
    head: NONE,
    weight: 0,
    symbol: 0,
};

/// Adaptive Huffman tree state for one coding direction of one call.
#[derive(Debug, Clone)]
pub struct Huff {
    nodes: Vec<Node>,
    /// Block-head arena; each slot holds a node index or `NONE`.
    heads: Vec<u16>,
    free_heads: Vec<u16>,
    tree: u16,
    lhead: u16,
    loc: [u16; HMAX + 1],
}

impl Default for Huff {
    fn default() -> Self {
        Self::new()
    }
}

impl Huff {
    /// A fresh tree holding only the NYT node at weight 0.
    pub fn new() -> Self {
        let mut huff = Self {
            nodes: Vec::with_capacity(2 * HMAX + 1),
            heads: Vec::with_capacity(HMAX + 1),
            free_heads: Vec::new(),
            tree: NONE,
            lhead: NONE,
            loc: [NONE; HMAX + 1],
        };
        let root = huff.alloc_node();
        huff.nodes[root as usize].symbol = NYT as u16;
        huff.tree = root;
        huff.lhead = root;
        huff.loc[NYT] = root;
        huff
    }

    fn alloc_node(&mut self) -> u16 {
        self.nodes.push(EMPTY_NODE);
        (self.nodes.len() - 1) as u16
    }

    fn alloc_head(&mut self) -> u16 {
        if let Some(h) = self.free_heads.pop() {
            h
        } else {
            self.heads.push(NONE);
            (self.heads.len() - 1) as u16
        }
    }

    fn free_head(&mut self, h: u16) {
        self.free_heads.push(h);
    }

    /// Current weight of a symbol (0 if not yet seen). NYT itself always
    /// reports 0. Exposed so tests can check encoder/decoder synchronization.
    pub fn weight(&self, symbol: usize) -> u32 {
        match self.loc[symbol] {
            NONE => 0,
            n => self.nodes[n as usize].weight,
        }
    }

    /// Swap two nodes' positions in the tree (their parent links).
    fn swap(&mut self, a: u16, b: u16) {
        let par1 = self.nodes[a as usize].parent;
        let par2 = self.nodes[b as usize].parent;

        if par1 != NONE {
            if self.nodes[par1 as usize].left == a {
                self.nodes[par1 as usize].left = b;
            } else {
                self.nodes[par1 as usize].right = b;
            }
        } else {
            self.tree = b;
        }
        if par2 != NONE {
            if self.nodes[par2 as usize].left == b {
                self.nodes[par2 as usize].left = a;
            } else {
                self.nodes[par2 as usize].right = a;
            }
        } else {
            self.tree = a;
        }
        self.nodes[a as usize].parent = par2;
        self.nodes[b as usize].parent = par1;
    }

    /// Swap two nodes' positions in the weight-ordered list.
    fn swap_list(&mut self, a: u16, b: u16) {
        let t = self.nodes[a as usize].next;
        self.nodes[a as usize].next = self.nodes[b as usize].next;
        self.nodes[b as usize].next = t;

        let t = self.nodes[a as usize].prev;
        self.nodes[a as usize].prev = self.nodes[b as usize].prev;
        self.nodes[b as usize].prev = t;

        if self.nodes[a as usize].next == a {
            self.nodes[a as usize].next = b;
        }
        if self.nodes[b as usize].next == b {
            self.nodes[b as usize].next = a;
        }
        if self.nodes[a as usize].prev == a {
            self.nodes[a as usize].prev = b;
        }
        if self.nodes[b as usize].prev == b {
            self.nodes[b as usize].prev = a;
        }

        let an = self.nodes[a as usize].next;
        if an != NONE {
            self.nodes[an as usize].prev = a;
        }
        let bn = self.nodes[b as usize].next;
        if bn != NONE {
            self.nodes[bn as usize].prev = b;
        }
        let ap = self.nodes[a as usize].prev;
        if ap != NONE {
            self.nodes[ap as usize].next = a;
        }
        let bp = self.nodes[b as usize].prev;
        if bp != NONE {
            self.nodes[bp as usize].next = b;
        }
    }

    fn increment(&mut self, n: u16) {
        if n == NONE {
            return;
        }

        // If the next-ranked node has the same weight, this node must move
        // to the top of its block before gaining weight.
        let next = self.nodes[n as usize].next;
        if next != NONE && self.nodes[next as usize].weight == self.nodes[n as usize].weight {
            let lnode = self.heads[self.nodes[n as usize].head as usize];
            if lnode != self.nodes[n as usize].parent {
                self.swap(lnode, n);
            }
            self.swap_list(lnode, n);
        }

        // Leave the old block: hand the head slot down or release it.
        let prev = self.nodes[n as usize].prev;
        let h = self.nodes[n as usize].head;
        if prev != NONE && self.nodes[prev as usize].weight == self.nodes[n as usize].weight {
            self.heads[h as usize] = prev;
        } else {
            self.heads[h as usize] = NONE;
            self.free_head(h);
        }

        self.nodes[n as usize].weight += 1;

        // Join the block above, or start a new one.
        let next = self.nodes[n as usize].next;
        if next != NONE && self.nodes[next as usize].weight == self.nodes[n as usize].weight {
            self.nodes[n as usize].head = self.nodes[next as usize].head;
        } else {
            let h = self.alloc_head();
            self.heads[h as usize] = n;
            self.nodes[n as usize].head = h;
        }

        let parent = self.nodes[n as usize].parent;
        if parent != NONE {
            self.increment(parent);
            if self.nodes[n as usize].prev == parent {
                self.swap_list(n, parent);
                let h = self.nodes[n as usize].head;
                if self.heads[h as usize] == n {
                    self.heads[h as usize] = parent;
                }
            }
        }
    }

    /// Account one occurrence of `ch`, splitting the NYT node on first sight
    /// and rebalancing the tree. Must be called in identical order on both
    /// endpoints.
    pub fn add_ref(&mut self, ch: u8) {
        let sym = ch as usize;
        if self.loc[sym] != NONE {
            let n = self.loc[sym];
            self.increment(n);
            return;
        }

        // First occurrence: split the NYT node into (internal, symbol).
        let tnode = self.alloc_node();
        let tnode2 = self.alloc_node();
        let lhead = self.lhead;

        self.nodes[tnode2 as usize].symbol = INTERNAL;
        self.nodes[tnode2 as usize].weight = 1;
        let lnext = self.nodes[lhead as usize].next;
        self.nodes[tnode2 as usize].next = lnext;
        if lnext != NONE {
            self.nodes[lnext as usize].prev = tnode2;
            if self.nodes[lnext as usize].weight == 1 {
                self.nodes[tnode2 as usize].head = self.nodes[lnext as usize].head;
            } else {
                let h = self.alloc_head();
                self.heads[h as usize] = tnode2;
                self.nodes[tnode2 as usize].head = h;
            }
        } else {
            let h = self.alloc_head();
            self.heads[h as usize] = tnode2;
            self.nodes[tnode2 as usize].head = h;
        }
        self.nodes[lhead as usize].next = tnode2;
        self.nodes[tnode2 as usize].prev = lhead;

        self.nodes[tnode as usize].symbol = sym as u16;
        self.nodes[tnode as usize].weight = 1;
        let lnext = self.nodes[lhead as usize].next;
        self.nodes[tnode as usize].next = lnext;
        if lnext != NONE {
            self.nodes[lnext as usize].prev = tnode;
            if self.nodes[lnext as usize].weight == 1 {
                self.nodes[tnode as usize].head = self.nodes[lnext as usize].head;
            } else {
                let h = self.alloc_head();
                self.heads[h as usize] = tnode2;
                self.nodes[tnode as usize].head = h;
            }
        } else {
            let h = self.alloc_head();
            self.heads[h as usize] = tnode;
            self.nodes[tnode as usize].head = h;
        }
        self.nodes[lhead as usize].next = tnode;
        self.nodes[tnode as usize].prev = lhead;

        let lparent = self.nodes[lhead as usize].parent;
        if lparent != NONE {
            if self.nodes[lparent as usize].left == lhead {
                self.nodes[lparent as usize].left = tnode2;
            } else {
                self.nodes[lparent as usize].right = tnode2;
            }
        } else {
            self.tree = tnode2;
        }
        self.nodes[tnode2 as usize].right = tnode;
        self.nodes[tnode2 as usize].left = lhead;
        self.nodes[tnode2 as usize].parent = lparent;
        self.nodes[lhead as usize].parent = tnode2;
        self.nodes[tnode as usize].parent = tnode2;
        self.loc[sym] = tnode;

        let p = self.nodes[tnode2 as usize].parent;
        self.increment(p);
    }

    /// Emit the code path for `node`, root-first.
    fn send(&self, node: u16, window: &mut [u8], bloc: &mut usize) {
        let mut path = [0u8; 2 * HMAX + 1];
        let mut depth = 0;

        let mut child = node;
        let mut parent = self.nodes[node as usize].parent;
        while parent != NONE {
            path[depth] = (self.nodes[parent as usize].right == child) as u8;
            depth += 1;
            child = parent;
            parent = self.nodes[parent as usize].parent;
        }
        for i in (0..depth).rev() {
            add_bit(path[i], window, bloc);
        }
    }

    /// Emit the code for `ch`: its current Huffman code if seen before,
    /// otherwise the NYT code followed by the raw 8 bits (MSB first).
    pub fn transmit(&self, ch: usize, window: &mut [u8], bloc: &mut usize) {
        if ch < HMAX && self.loc[ch] == NONE {
            self.transmit(NYT, window, bloc);
            for i in (0..8).rev() {
                add_bit(((ch >> i) & 1) as u8, window, bloc);
            }
        } else {
            self.send(self.loc[ch], window, bloc);
        }
    }

    /// Walk the tree bit by bit from the root until a leaf. Returns the leaf
    /// symbol, which may be [`NYT`] (the caller then reads the raw byte).
    pub fn receive(&self, window: &[u8], bloc: &mut usize) -> usize {
        let mut n = self.tree;
        while n != NONE && self.nodes[n as usize].symbol == INTERNAL {
            n = if get_bit(window, bloc) == 1 {
                self.nodes[n as usize].right
            } else {
                self.nodes[n as usize].left
            };
        }
        if n == NONE {
            return 0;
        }
        self.nodes[n as usize].symbol as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_symbol_is_nyt_plus_raw_byte() {
        let huff = Huff::new();
        let mut window = [0u8; 16];
        let mut bloc = 0;
        huff.transmit(0x41, &mut window, &mut bloc);
        // NYT is the root, so its code is empty; the raw byte follows MSB
        // first, laid down LSB-first in the byte: 0b01000001 -> 0b10000010.
        assert_eq!(bloc, 8);
        assert_eq!(window[0], 0b1000_0010);
    }

    #[test]
    fn seen_symbol_uses_short_code() {
        let mut huff = Huff::new();
        let mut window = [0u8; 64];
        let mut bloc = 0;
        huff.transmit(7, &mut window, &mut bloc);
        huff.add_ref(7);
        let before = bloc;
        huff.transmit(7, &mut window, &mut bloc);
        assert!(bloc - before < 8, "repeat of a seen symbol must be shorter than raw");
    }

    #[test]
    fn encoder_decoder_trees_stay_synchronized() {
        let data: Vec<u8> = (0..200u8).chain([3, 3, 3, 9, 9, 250].into_iter()).collect();

        let mut enc = Huff::new();
        let mut window = vec![0u8; 8 * data.len() + 16];
        let mut bloc = 0;
        for &b in &data {
            enc.transmit(b as usize, &mut window, &mut bloc);
            enc.add_ref(b);
        }

        let mut dec = Huff::new();
        let mut rbloc = 0;
        let mut out = Vec::new();
        for _ in 0..data.len() {
            let mut sym = dec.receive(&window, &mut rbloc);
            if sym == NYT {
                sym = 0;
                for _ in 0..8 {
                    sym = (sym << 1) + get_bit(&window, &mut rbloc) as usize;
                }
            }
            dec.add_ref(sym as u8);
            out.push(sym as u8);
        }

        assert_eq!(out, data);
        assert_eq!(rbloc, bloc);
        for sym in 0..HMAX {
            assert_eq!(enc.weight(sym), dec.weight(sym), "weight of symbol {sym}");
        }
    }

    #[test]
    fn identical_input_yields_identical_bitstream() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut streams = Vec::new();
        for _ in 0..2 {
            let mut huff = Huff::new();
            let mut window = vec![0u8; 8 * data.len()];
            let mut bloc = 0;
            for &b in data.iter() {
                huff.transmit(b as usize, &mut window, &mut bloc);
                huff.add_ref(b);
            }
            streams.push((window, bloc));
        }
        assert_eq!(streams[0], streams[1]);
    }
}
