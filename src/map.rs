//! Map: ordered map as a red-black tree whose nodes live in allocator-backed
//! arrays and refer to each other by index.
//!
//! Layout
//! - `links[i]` holds the tree structure of node `i` (`left`, `right`,
//!   `parent`, `color`). Slot 0 is the sentinel: the shared black leaf that
//!   every missing child points at. The root's parent is `NIL`.
//! - `entries[i - 1]` holds the key and value of node `i`. Keeping them apart
//!   from the links means the sentinel needs no key or value, and iteration
//!   is a plain slice walk.
//!
//! Storage order is not key order. Removal physically deletes the *last*
//! slot: when the removed node is elsewhere, the last node is moved into its
//! slot and its neighbours are repointed. Node indices are therefore only
//! meaningful between two mutations.
//!
//! `set` on a present key overwrites the value in place; the tree never
//! holds two nodes with equivalent keys.

use crate::allocator::Allocator;
use crate::array::Array;
use crate::error::MapInvariantError;
use crate::vector::Vector;
use core::cmp::Ordering;
use core::fmt;
use core::mem;

const SENTINEL: u32 = 0;
const NIL: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug)]
struct Link {
    left: u32,
    right: u32,
    parent: u32,
    color: Color,
}

impl Link {
    const SENTINEL: Link = Link {
        left: NIL,
        right: NIL,
        parent: NIL,
        color: Color::Black,
    };
}

/// A key/value pair as stored in the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

pub struct Map<'a, K, V> {
    root: u32,
    links: Array<'a, Link>,
    entries: Vector<'a, Entry<K, V>>,
}

impl<'a, K: Ord, V> Map<'a, K, V> {
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        let mut links = Array::new(allocator);
        links.push(Link::SENTINEL);
        Self {
            root: SENTINEL,
            links,
            entries: Vector::new(allocator),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.links.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has(&self, key: &K) -> bool {
        self.find_node(key) != SENTINEL
    }

    /// Returns the value for `key`, or `default` when the key is absent.
    pub fn get<'m>(&'m self, key: &K, default: &'m V) -> &'m V {
        self.find(key).unwrap_or(default)
    }

    pub fn find(&self, key: &K) -> Option<&V> {
        match self.find_node(key) {
            SENTINEL => None,
            n => Some(&self.entry(n).value),
        }
    }

    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.find_node(key) {
            SENTINEL => None,
            n => Some(&mut self.entries[n as usize - 1].value),
        }
    }

    /// Inserts `value` under `key`. An existing value is replaced in place and
    /// returned.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let mut parent = NIL;
        let mut x = self.root;
        let mut went_left = false;
        while x != SENTINEL {
            parent = x;
            match key.cmp(&self.entry(x).key) {
                Ordering::Less => {
                    went_left = true;
                    x = self.left(x);
                }
                Ordering::Greater => {
                    went_left = false;
                    x = self.right(x);
                }
                Ordering::Equal => {
                    let slot = &mut self.entries[x as usize - 1].value;
                    return Some(mem::replace(slot, value));
                }
            }
        }

        assert!(self.links.len() < NIL as usize, "map exceeds {} nodes", NIL - 1);
        let n = self.links.push(Link {
            left: SENTINEL,
            right: SENTINEL,
            parent,
            color: Color::Red,
        }) as u32;
        self.entries.push(Entry { key, value });

        if parent == NIL {
            self.root = n;
        } else if went_left {
            self.links[parent as usize].left = n;
        } else {
            self.links[parent as usize].right = n;
        }

        self.insert_fixup(n);
        let root = self.root;
        self.links[root as usize].color = Color::Black;
        self.verify();
        None
    }

    /// Removes `key` and returns its value; absent keys are a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let n = self.find_node(key);
        if n == SENTINEL {
            return None;
        }

        // `y` is the node spliced out of the tree: `n` itself when it has a
        // free side, otherwise its in-order successor.
        let y = if self.left(n) == SENTINEL || self.right(n) == SENTINEL {
            n
        } else {
            self.min(self.right(n))
        };
        let x = if self.left(y) != SENTINEL {
            self.left(y)
        } else {
            self.right(y)
        };

        // `x` may be the sentinel; its parent is read by the fixup.
        let yp = self.parent(y);
        self.links[x as usize].parent = yp;
        if yp == NIL {
            self.root = x;
        } else if y == self.left(yp) {
            self.links[yp as usize].left = x;
        } else {
            self.links[yp as usize].right = x;
        }

        if y != n {
            // `n` takes over the successor's pair; the removed pair rides out
            // with `y`.
            self.entries.swap(n as usize - 1, y as usize - 1);
        }

        if self.color(y) == Color::Black {
            self.delete_fixup(x);
        }

        let removed = self.destroy(y);
        self.verify();
        Some(removed.value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.links.clear();
        self.links.push(Link::SENTINEL);
        self.root = SENTINEL;
    }

    /// Entries in storage order, which is not key order.
    pub fn iter(&self) -> core::slice::Iter<'_, Entry<K, V>> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Entry<K, V>] {
        self.entries.as_slice()
    }

    /// Keys with mutable values, in storage order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> + '_ {
        self.entries.iter_mut().map(|e| (&e.key, &mut e.value))
    }

    /// Checks every structural invariant: search order, parent back-links,
    /// black root, no red node with a red child, equal black height on every
    /// path, and that all stored nodes are reachable.
    pub fn validate(&self) -> Result<(), MapInvariantError> {
        if self.root != SENTINEL {
            if self.color(self.root) != Color::Black {
                return Err(MapInvariantError::RedRoot(self.root));
            }
            if self.parent(self.root) != NIL {
                return Err(MapInvariantError::RootHasParent(self.root));
            }
        }
        let mut reachable = 0;
        self.check_subtree(self.root, &mut reachable)?;
        if reachable != self.len() {
            return Err(MapInvariantError::Size {
                reachable,
                stored: self.len(),
            });
        }

        let mut n = self.min(self.root);
        let mut prev: Option<u32> = None;
        while n != SENTINEL && n != NIL {
            if let Some(p) = prev {
                if self.entry(p).key >= self.entry(n).key {
                    return Err(MapInvariantError::Order(n));
                }
                if self.predecessor(n) != p {
                    return Err(MapInvariantError::Order(n));
                }
            }
            prev = Some(n);
            n = self.successor(n);
        }
        if prev.unwrap_or(SENTINEL) != self.max(self.root) {
            return Err(MapInvariantError::Order(self.max(self.root)));
        }
        Ok(())
    }

    // Returns the black height of the subtree rooted at `n`.
    fn check_subtree(&self, n: u32, count: &mut usize) -> Result<usize, MapInvariantError> {
        if n == SENTINEL {
            return Ok(1);
        }
        *count += 1;
        let (l, r) = (self.left(n), self.right(n));
        for child in [l, r] {
            if child != SENTINEL {
                if self.parent(child) != n {
                    return Err(MapInvariantError::ParentLink(n));
                }
                if self.color(n) == Color::Red && self.color(child) == Color::Red {
                    return Err(MapInvariantError::RedRed(n));
                }
            }
        }
        let bl = self.check_subtree(l, count)?;
        let br = self.check_subtree(r, count)?;
        if bl != br {
            return Err(MapInvariantError::BlackHeight(n));
        }
        Ok(bl + usize::from(self.color(n) == Color::Black))
    }

    #[inline]
    fn verify(&self) {
        #[cfg(feature = "verify")]
        if let Err(e) = self.validate() {
            panic!("red-black invariant broken: {e}");
        }
    }

    // ---- node access ----

    #[inline]
    fn entry(&self, n: u32) -> &Entry<K, V> {
        &self.entries[n as usize - 1]
    }

    #[inline]
    fn left(&self, n: u32) -> u32 {
        self.links[n as usize].left
    }

    #[inline]
    fn right(&self, n: u32) -> u32 {
        self.links[n as usize].right
    }

    #[inline]
    fn parent(&self, n: u32) -> u32 {
        self.links[n as usize].parent
    }

    #[inline]
    fn color(&self, n: u32) -> Color {
        self.links[n as usize].color
    }

    #[inline]
    fn set_color(&mut self, n: u32, color: Color) {
        self.links[n as usize].color = color;
    }

    fn find_node(&self, key: &K) -> u32 {
        let mut x = self.root;
        while x != SENTINEL {
            match key.cmp(&self.entry(x).key) {
                Ordering::Less => x = self.left(x),
                Ordering::Greater => x = self.right(x),
                Ordering::Equal => return x,
            }
        }
        SENTINEL
    }

    // ---- in-order navigation ----

    fn min(&self, mut x: u32) -> u32 {
        if x == SENTINEL {
            return x;
        }
        while self.left(x) != SENTINEL {
            x = self.left(x);
        }
        x
    }

    fn max(&self, mut x: u32) -> u32 {
        if x == SENTINEL {
            return x;
        }
        while self.right(x) != SENTINEL {
            x = self.right(x);
        }
        x
    }

    /// Next node in key order, `NIL` past the largest.
    fn successor(&self, mut x: u32) -> u32 {
        if self.right(x) != SENTINEL {
            return self.min(self.right(x));
        }
        let mut y = self.parent(x);
        while y != NIL && x == self.right(y) {
            x = y;
            y = self.parent(y);
        }
        y
    }

    /// Previous node in key order, `NIL` before the smallest.
    fn predecessor(&self, mut x: u32) -> u32 {
        if self.left(x) != SENTINEL {
            return self.max(self.left(x));
        }
        let mut y = self.parent(x);
        while y != NIL && x == self.left(y) {
            x = y;
            y = self.parent(y);
        }
        y
    }

    // ---- rebalancing ----

    fn rotate_left(&mut self, x: u32) {
        let y = self.right(x);
        let yl = self.left(y);
        self.links[x as usize].right = yl;
        if yl != SENTINEL {
            self.links[yl as usize].parent = x;
        }

        let xp = self.parent(x);
        self.links[y as usize].parent = xp;
        if xp == NIL {
            self.root = y;
        } else if x == self.left(xp) {
            self.links[xp as usize].left = y;
        } else {
            self.links[xp as usize].right = y;
        }

        self.links[y as usize].left = x;
        self.links[x as usize].parent = y;
    }

    fn rotate_right(&mut self, x: u32) {
        let y = self.left(x);
        let yr = self.right(y);
        self.links[x as usize].left = yr;
        if yr != SENTINEL {
            self.links[yr as usize].parent = x;
        }

        let xp = self.parent(x);
        self.links[y as usize].parent = xp;
        if xp == NIL {
            self.root = y;
        } else if x == self.left(xp) {
            self.links[xp as usize].left = y;
        } else {
            self.links[xp as usize].right = y;
        }

        self.links[y as usize].right = x;
        self.links[x as usize].parent = y;
    }

    fn insert_fixup(&mut self, mut n: u32) {
        while n != self.root && self.color(self.parent(n)) == Color::Red {
            // A red parent is never the root, so the grandparent exists.
            let p = self.parent(n);
            let g = self.parent(p);
            if p == self.left(g) {
                let uncle = self.right(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    n = g;
                } else {
                    if n == self.right(p) {
                        n = p;
                        self.rotate_left(n);
                    }
                    let p = self.parent(n);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.color(uncle) == Color::Red {
                    self.set_color(p, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(g, Color::Red);
                    n = g;
                } else {
                    if n == self.left(p) {
                        n = p;
                        self.rotate_right(n);
                    }
                    let p = self.parent(n);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_left(g);
                }
            }
        }
    }

    fn delete_fixup(&mut self, mut x: u32) {
        while x != self.root && self.color(x) == Color::Black {
            let p = self.parent(x);
            if x == self.left(p) {
                let mut w = self.right(p);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_left(p);
                    w = self.right(self.parent(x));
                }
                if self.color(self.left(w)) == Color::Black && self.color(self.right(w)) == Color::Black {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.right(w)) == Color::Black {
                        let wl = self.left(w);
                        self.set_color(wl, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = self.right(self.parent(x));
                    }
                    let p = self.parent(x);
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    let wr = self.right(w);
                    self.set_color(wr, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                }
            } else {
                let mut w = self.left(p);
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_right(p);
                    w = self.left(self.parent(x));
                }
                if self.color(self.right(w)) == Color::Black && self.color(self.left(w)) == Color::Black {
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.left(w)) == Color::Black {
                        let wr = self.right(w);
                        self.set_color(wr, Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = self.left(self.parent(x));
                    }
                    let p = self.parent(x);
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    let wl = self.left(w);
                    self.set_color(wl, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Physically removes unlinked node `n` by moving the last node into its
    /// slot, then shrinking storage by one.
    fn destroy(&mut self, n: u32) -> Entry<K, V> {
        let last = (self.links.len() - 1) as u32;
        if n != last {
            let moved = self.links[last as usize];
            if moved.parent == NIL {
                self.root = n;
            } else if self.left(moved.parent) == last {
                self.links[moved.parent as usize].left = n;
            } else {
                self.links[moved.parent as usize].right = n;
            }
            if moved.left != SENTINEL {
                self.links[moved.left as usize].parent = n;
            }
            if moved.right != SENTINEL {
                self.links[moved.right as usize].parent = n;
            }
        }
        self.links.swap_remove(n as usize);
        self.entries.swap_remove(n as usize - 1)
    }
}

impl<'a, K: Ord + Clone, V: Clone> Clone for Map<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root,
            links: self.links.clone(),
            entries: self.entries.clone(),
        }
    }
}

impl<'a, K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for Map<'a, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|e| (&e.key, &e.value)))
            .finish()
    }
}

impl<'a, 'b, K: Ord, V> IntoIterator for &'b Map<'a, K, V> {
    type Item = &'b Entry<K, V>;
    type IntoIter = core::slice::Iter<'b, Entry<K, V>>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
