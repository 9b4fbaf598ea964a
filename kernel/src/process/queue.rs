//! Queue discipline
//!
//! Ready, blocked and zombie processes each sit on an intrusive
//! doubly-linked list. Links are table slot indices stored next to each
//! record, so unlinking is O(1) given the slot and no pointer ever outlives
//! the record it points at.
//!
//! Insertion is always at the head. Fairness is the scheduler's job, not
//! the queue order's.

use pcore_api::ProcessState;

/// The three process queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Ready,
    Blocked,
    Zombie,
}

impl QueueKind {
    /// Every queue, in index order
    pub const ALL: [QueueKind; 3] = [QueueKind::Ready, QueueKind::Blocked, QueueKind::Zombie];

    /// The queue a record in `state` must be on, if any
    pub const fn for_state(state: ProcessState) -> Option<QueueKind> {
        match state {
            ProcessState::Ready => Some(QueueKind::Ready),
            ProcessState::Blocked => Some(QueueKind::Blocked),
            ProcessState::Zombie => Some(QueueKind::Zombie),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            QueueKind::Ready => 0,
            QueueKind::Blocked => 1,
            QueueKind::Zombie => 2,
        }
    }
}

/// Per-record queue linkage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueLink {
    /// Queue the record is on; `None` when unlinked
    pub queue: Option<QueueKind>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// Storage the links of a queue live in
///
/// Implemented by the process table; anything indexable works.
pub trait Links {
    /// Link of slot `index`; unlinked for unknown slots
    fn link(&self, index: usize) -> QueueLink;

    /// Overwrite the link of slot `index`; ignored for unknown slots
    fn set_link(&mut self, index: usize, link: QueueLink);
}

/// Head of one intrusive queue
#[derive(Debug, Clone)]
pub struct ProcessQueue {
    kind: QueueKind,
    head: Option<usize>,
    len: usize,
}

impl ProcessQueue {
    pub const fn new(kind: QueueKind) -> Self {
        Self { kind, head: None, len: 0 }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Check whether slot `index` is linked into this queue
    pub fn contains<L: Links + ?Sized>(&self, links: &L, index: usize) -> bool {
        links.link(index).queue == Some(self.kind)
    }

    /// Successor of slot `index`, `None` at the tail
    pub fn next_of<L: Links + ?Sized>(&self, links: &L, index: usize) -> Option<usize> {
        let link = links.link(index);
        if link.queue == Some(self.kind) { link.next } else { None }
    }

    /// Insert slot `index` at the head
    ///
    /// The slot must not be on any queue.
    pub fn push_front<L: Links + ?Sized>(&mut self, links: &mut L, index: usize) {
        debug_assert!(links.link(index).queue.is_none(), "slot {} is already queued", index);

        let old_head = self.head;
        links.set_link(index, QueueLink { queue: Some(self.kind), prev: None, next: old_head });
        if let Some(old_head) = old_head {
            let mut link = links.link(old_head);
            link.prev = Some(index);
            links.set_link(old_head, link);
        }
        self.head = Some(index);
        self.len += 1;
    }

    /// Remove slot `index` from this queue
    ///
    /// Returns `false` and changes nothing if the slot is not on this queue.
    pub fn unlink<L: Links + ?Sized>(&mut self, links: &mut L, index: usize) -> bool {
        let link = links.link(index);
        if link.queue != Some(self.kind) {
            return false;
        }

        match link.prev {
            // Removing the head: advance it
            None => self.head = link.next,
            Some(prev) => {
                let mut prev_link = links.link(prev);
                prev_link.next = link.next;
                links.set_link(prev, prev_link);
            }
        }
        if let Some(next) = link.next {
            let mut next_link = links.link(next);
            next_link.prev = link.prev;
            links.set_link(next, next_link);
        }

        links.set_link(index, QueueLink::default());
        self.len -= 1;
        true
    }

    /// Walk the queue head to tail
    pub fn iter<'a, L: Links + ?Sized>(&self, links: &'a L) -> QueueIter<'a, L> {
        QueueIter { links, kind: self.kind, cursor: self.head }
    }
}

/// Head-to-tail iterator over slot indices
pub struct QueueIter<'a, L: ?Sized> {
    links: &'a L,
    kind: QueueKind,
    cursor: Option<usize>,
}

impl<L: Links + ?Sized> Iterator for QueueIter<'_, L> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.cursor?;
        let link = self.links.link(index);
        self.cursor = if link.queue == Some(self.kind) { link.next } else { None };
        Some(index)
    }
}
