//! Fixed-capacity request slots
//!
//! Every slot is on exactly one of three lists: free, non-recurring active
//! or recurring active. Moving a slot between lists is the only way its
//! contents change, and every move asserts the list the slot is leaving.

use std::collections::VecDeque;

use crate::protocol::DiagnosticRequest;
use crate::request::ActiveRequest;

/// Index of a slot in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The list a slot is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotList {
    Free,
    NonRecurring,
    Recurring,
}

#[derive(Debug)]
pub struct RequestPool {
    slots: Vec<Option<ActiveRequest>>,
    membership: Vec<SlotList>,
    free: Vec<SlotId>,
    nonrecurring: VecDeque<SlotId>,
    recurring: VecDeque<SlotId>,
}

impl RequestPool {
    pub fn new(capacity: usize) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            membership: Vec::new(),
            free: Vec::new(),
            nonrecurring: VecDeque::new(),
            recurring: VecDeque::new(),
        };
        pool.slots.resize_with(capacity, || None);
        pool.reset();
        pool
    }

    /// Put every slot back on the free list
    pub fn reset(&mut self) {
        let capacity = self.slots.len();
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.membership = vec![SlotList::Free; capacity];
        self.free = (0..capacity).rev().map(SlotId).collect();
        self.nonrecurring.clear();
        self.recurring.clear();
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn nonrecurring_count(&self) -> usize {
        self.nonrecurring.len()
    }

    pub fn recurring_count(&self) -> usize {
        self.recurring.len()
    }

    pub fn list_of(&self, id: SlotId) -> SlotList {
        self.membership[id.0]
    }

    /// Take a free slot for `request`, placing it at the head of its list
    pub fn insert(&mut self, request: ActiveRequest) -> Option<SlotId> {
        let id = self.free.pop()?;
        assert_eq!(self.membership[id.0], SlotList::Free, "slot {} on free list twice", id.0);

        let list = if request.recurring {
            self.recurring.push_front(id);
            SlotList::Recurring
        } else {
            self.nonrecurring.push_front(id);
            SlotList::NonRecurring
        };
        self.membership[id.0] = list;
        self.slots[id.0] = Some(request);
        Some(id)
    }

    /// Replace a recurring slot's contents and move it to the queue head
    pub fn update_recurring(&mut self, id: SlotId, request: ActiveRequest) {
        assert!(request.recurring, "recurring slot updated with a one-shot request");
        self.detach(id, SlotList::Recurring);
        self.recurring.push_front(id);
        self.membership[id.0] = SlotList::Recurring;
        self.slots[id.0] = Some(request);
    }

    /// Move a recurring slot to the tail of the queue
    pub fn requeue_recurring(&mut self, id: SlotId) {
        self.detach(id, SlotList::Recurring);
        self.recurring.push_back(id);
        self.membership[id.0] = SlotList::Recurring;
    }

    /// Return an active slot to the free list, handing back its request
    pub fn release(&mut self, id: SlotId) -> Option<ActiveRequest> {
        let list = self.membership[id.0];
        assert_ne!(list, SlotList::Free, "slot {} released twice", id.0);
        self.detach(id, list);
        self.membership[id.0] = SlotList::Free;
        self.free.push(id);
        self.slots[id.0].take()
    }

    fn detach(&mut self, id: SlotId, expected: SlotList) {
        assert_eq!(
            self.membership[id.0], expected,
            "slot {} is not on the {:?} list",
            id.0, expected
        );
        let list = match expected {
            SlotList::NonRecurring => &mut self.nonrecurring,
            SlotList::Recurring => &mut self.recurring,
            SlotList::Free => unreachable!("free slots are not detached"),
        };
        let position = list.iter().position(|&entry| entry == id);
        assert!(position.is_some(), "slot {} missing from its list", id.0);
        if let Some(position) = position {
            list.remove(position);
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&ActiveRequest> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut ActiveRequest> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Non-recurring slots, head first
    pub fn nonrecurring_ids(&self) -> Vec<SlotId> {
        self.nonrecurring.iter().copied().collect()
    }

    /// Recurring slots, head first
    pub fn recurring_ids(&self) -> Vec<SlotId> {
        self.recurring.iter().copied().collect()
    }

    /// Every active slot with its request: non-recurring first, then recurring
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotId, &ActiveRequest)> {
        self.nonrecurring
            .iter()
            .chain(self.recurring.iter())
            .filter_map(|&id| self.get(id).map(|request| (id, request)))
    }

    /// Recurring slot sending the same request on the same bus
    pub fn find_recurring(&self, bus: u8, request: &DiagnosticRequest) -> Option<SlotId> {
        self.recurring.iter().copied().find(|&id| {
            self.get(id)
                .is_some_and(|active| active.bus == bus && active.request() == request)
        })
    }

    /// Whether every slot is on exactly one list and only active slots hold a request
    pub fn check_invariants(&self) -> bool {
        let mut seen = vec![0usize; self.slots.len()];
        for id in self
            .free
            .iter()
            .chain(self.nonrecurring.iter())
            .chain(self.recurring.iter())
        {
            seen[id.0] += 1;
        }
        let on_one_list = seen.iter().all(|&count| count == 1);

        let consistent = (0..self.slots.len()).all(|index| {
            let id = SlotId(index);
            let listed = match self.membership[index] {
                SlotList::Free => self.free.contains(&id),
                SlotList::NonRecurring => self.nonrecurring.contains(&id),
                SlotList::Recurring => self.recurring.contains(&id),
            };
            let occupied = self.slots[index].is_some() == (self.membership[index] != SlotList::Free);
            listed && occupied
        });

        on_one_list && consistent
    }
}
