//! Tree-keyed book storage.
//!
//! Three files: `.idx` is a flat array of 4-byte little-endian offsets into
//! `.dat`, and a node is addressed by its byte position in `.idx`. A `.dat`
//! record is a 12-byte header of `.idx` positions `{parent, next_sibling,
//! first_child}` (−1 when absent), a NUL-terminated node name, then a
//! `u16` length-prefixed user-data blob. Content nodes carry an 8-byte
//! blob `{start: u32, size: u32}` locating their text in `.bdt`.

use tracing::warn;

use lectern_core::bytes::{decode_u16_le, decode_u32_le};
use lectern_core::Charset;
use lectern_crypto::decipher_in_place;

use crate::backend::prefixed;
use crate::error::Result;
use crate::module_file::ModuleFile;
use crate::session::ModuleSpec;

/// One node of the book tree. The `parent`, `next_sibling`, and
/// `first_child` fields are `.idx` byte positions, −1 when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub offset: i32,
    pub name: String,
    pub parent: i32,
    pub next_sibling: i32,
    pub first_child: i32,
    pub user_data: Vec<u8>,
}

/// An open tree-keyed book.
pub struct TreeSession {
    index: ModuleFile,
    nodes: ModuleFile,
    content: ModuleFile,
    charset: Charset,
    cipher_key: Option<Vec<u8>>,
}

impl TreeSession {
    pub fn open(spec: &ModuleSpec) -> Result<TreeSession> {
        Ok(TreeSession {
            index: ModuleFile::open(&prefixed(spec, "idx"))?,
            nodes: ModuleFile::open(&prefixed(spec, "dat"))?,
            content: ModuleFile::open(&prefixed(spec, "bdt"))?,
            charset: Charset::resolve(spec.charset.as_deref()),
            cipher_key: spec.cipher().map(<[u8]>::to_vec),
        })
    }

    /// The tree root, at `.idx` position 0.
    pub fn root(&self) -> Option<TreeNode> {
        self.node_at(0)
    }

    pub fn parent(&self, node: &TreeNode) -> Option<TreeNode> {
        self.follow(node.parent)
    }

    pub fn first_child(&self, node: &TreeNode) -> Option<TreeNode> {
        self.follow(node.first_child)
    }

    pub fn next_sibling(&self, node: &TreeNode) -> Option<TreeNode> {
        self.follow(node.next_sibling)
    }

    /// Walk a path of node names down from the root. The empty path is the
    /// root itself.
    pub fn find(&self, path: &[String]) -> Option<TreeNode> {
        let mut node = self.root()?;
        for segment in path {
            node = self.first_child(&node)?;
            while node.name != *segment {
                node = self.next_sibling(&node)?;
            }
        }
        Some(node)
    }

    pub fn contains(&self, path: &[String]) -> bool {
        self.find(path).is_some()
    }

    /// Stored size of a node's text, 0 for misses and structural nodes.
    pub fn length(&self, path: &[String]) -> u32 {
        match self.find(path) {
            Some(node) if node.user_data.len() == 8 => decode_u32_le(&node.user_data, 4),
            _ => 0,
        }
    }

    /// Read a node's text. Misses and nodes without content read as empty.
    pub fn read(&self, path: &[String]) -> String {
        match self.find(path) {
            Some(node) => self.node_text(&node),
            None => String::new(),
        }
    }

    /// Every node path in depth-first preorder, the root excluded.
    pub fn read_index(&self) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        if let Some(root) = self.root() {
            if let Some(child) = self.first_child(&root) {
                let mut prefix = Vec::new();
                self.walk(child, &mut prefix, &mut paths);
            }
        }
        paths
    }

    fn walk(&self, first: TreeNode, prefix: &mut Vec<String>, paths: &mut Vec<Vec<String>>) {
        let mut next = Some(first);
        while let Some(node) = next {
            prefix.push(node.name.clone());
            paths.push(prefix.clone());
            if let Some(child) = self.first_child(&node) {
                self.walk(child, prefix, paths);
            }
            prefix.pop();
            next = self.next_sibling(&node);
        }
    }

    fn follow(&self, offset: i32) -> Option<TreeNode> {
        if offset < 0 {
            return None;
        }
        self.node_at(offset as u32)
    }

    fn node_at(&self, offset: u32) -> Option<TreeNode> {
        let row = self.index.read_at(offset as usize, 4);
        if row.len() < 4 {
            warn!(offset, "tree index position out of range");
            return None;
        }
        let record = decode_u32_le(&row, 0) as usize;
        let header = self.nodes.read_at(record, 12);
        if header.len() < 12 {
            warn!(offset, record, "tree node header truncated");
            return None;
        }

        let mut name_bytes = self.nodes.read_until(record + 12, 0);
        let consumed = name_bytes.len();
        if name_bytes.last() == Some(&0) {
            name_bytes.pop();
        }

        let after_name = record + 12 + consumed;
        let len_bytes = self.nodes.read_at(after_name, 2);
        let user_data = if len_bytes.len() == 2 {
            let len = decode_u16_le(&len_bytes, 0) as usize;
            self.nodes.read_at(after_name + 2, len)
        } else {
            Vec::new()
        };

        Some(TreeNode {
            offset: offset as i32,
            name: self.charset.decode(&name_bytes).trim().to_string(),
            parent: decode_u32_le(&header, 0) as i32,
            next_sibling: decode_u32_le(&header, 4) as i32,
            first_child: decode_u32_le(&header, 8) as i32,
            user_data,
        })
    }

    fn node_text(&self, node: &TreeNode) -> String {
        if node.user_data.len() != 8 {
            return String::new();
        }
        let start = decode_u32_le(&node.user_data, 0);
        let size = decode_u32_le(&node.user_data, 4);
        if size == 0 {
            return String::new();
        }
        let mut data = self.content.read_at(start as usize, size as usize);
        if let Some(cipher) = &self.cipher_key {
            decipher_in_place(cipher, &mut data);
        }
        self.charset.decode(&data)
    }
}
