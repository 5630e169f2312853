//! Session (transaction) state.

use crate::error::{StoreError, StoreResult};
use crate::types::{SequenceNumber, SessionId};
use std::collections::HashMap;

/// State of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session is active and can perform operations.
    Active,
    /// Session has been committed.
    Committed,
    /// Session has been aborted.
    Aborted,
}

/// Represents a pending write in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// Create a document that did not exist when the session wrote it.
    Insert {
        /// Document payload (CBOR bytes).
        payload: Vec<u8>,
    },
    /// Overwrite an existing document.
    Put {
        /// Document payload (CBOR bytes).
        payload: Vec<u8>,
    },
    /// Delete a document.
    Delete,
}

/// (collection name, storage key)
pub(crate) type SlotKey = (String, Vec<u8>);

/// A transactional session.
///
/// Writes made through a session are buffered and become visible to other
/// readers only when the session commits. Reads made through a session see
/// the session's own writes and are remembered: commit fails if any document
/// the session read was changed by someone else in the meantime.
///
/// Dropping an uncommitted session discards its writes.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    writes: HashMap<SlotKey, PendingWrite>,
    /// Observed commit sequence per document; `None` means observed absent.
    reads: HashMap<SlotKey, Option<SequenceNumber>>,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Active,
            writes: HashMap::new(),
            reads: HashMap::new(),
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Checks if the session is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Returns the number of pending writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    pub(crate) fn insert(&mut self, key: SlotKey, payload: Vec<u8>) -> StoreResult<()> {
        self.ensure_active()?;
        let write = match self.writes.get(&key) {
            // Re-creating something this session deleted overwrites it.
            Some(PendingWrite::Delete) => PendingWrite::Put { payload },
            _ => PendingWrite::Insert { payload },
        };
        self.writes.insert(key, write);
        Ok(())
    }

    pub(crate) fn put(&mut self, key: SlotKey, payload: Vec<u8>) -> StoreResult<()> {
        self.ensure_active()?;
        let write = match self.writes.get(&key) {
            Some(PendingWrite::Insert { .. }) => PendingWrite::Insert { payload },
            _ => PendingWrite::Put { payload },
        };
        self.writes.insert(key, write);
        Ok(())
    }

    pub(crate) fn delete(&mut self, key: SlotKey) -> StoreResult<()> {
        self.ensure_active()?;
        if let Some(PendingWrite::Insert { .. }) = self.writes.get(&key) {
            self.writes.remove(&key);
        } else {
            self.writes.insert(key, PendingWrite::Delete);
        }
        Ok(())
    }

    /// Records a read for conflict detection.
    pub(crate) fn record_read(&mut self, key: SlotKey, observed: Option<SequenceNumber>) {
        // Only the first observation counts; later reads see our own writes.
        if !self.writes.contains_key(&key) {
            self.reads.entry(key).or_insert(observed);
        }
    }

    pub(crate) fn pending(&self, collection: &str, key: &[u8]) -> Option<&PendingWrite> {
        self.writes.get(&(collection.to_string(), key.to_vec()))
    }

    pub(crate) fn pending_in<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = (&'a [u8], &'a PendingWrite)> + 'a {
        self.writes
            .iter()
            .filter(move |((c, _), _)| c == collection)
            .map(|((_, k), w)| (k.as_slice(), w))
    }

    pub(crate) fn pending_writes(&self) -> impl Iterator<Item = (&SlotKey, &PendingWrite)> {
        self.writes.iter()
    }

    pub(crate) fn read_set(&self) -> impl Iterator<Item = (&SlotKey, &Option<SequenceNumber>)> {
        self.reads.iter()
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = SessionState::Committed;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.state = SessionState::Aborted;
        self.writes.clear();
        self.reads.clear();
    }

    pub(crate) fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Committed => {
                Err(StoreError::invalid_operation("session already committed"))
            }
            SessionState::Aborted => Err(StoreError::invalid_operation("session already aborted")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: u8) -> SlotKey {
        ("live".to_string(), vec![k])
    }

    fn session() -> Session {
        Session::new(SessionId::new(1))
    }

    #[test]
    fn new_session_is_active() {
        let s = session();
        assert!(s.is_active());
        assert_eq!(s.write_count(), 0);
    }

    #[test]
    fn insert_then_put_stays_insert() {
        let mut s = session();
        s.insert(key(1), vec![1]).unwrap();
        s.put(key(1), vec![2]).unwrap();
        assert_eq!(
            s.pending("live", &[1]),
            Some(&PendingWrite::Insert { payload: vec![2] })
        );
    }

    #[test]
    fn insert_then_delete_cancels() {
        let mut s = session();
        s.insert(key(1), vec![1]).unwrap();
        s.delete(key(1)).unwrap();
        assert_eq!(s.write_count(), 0);
    }

    #[test]
    fn delete_then_insert_becomes_put() {
        let mut s = session();
        s.delete(key(1)).unwrap();
        s.insert(key(1), vec![3]).unwrap();
        assert_eq!(
            s.pending("live", &[1]),
            Some(&PendingWrite::Put { payload: vec![3] })
        );
    }

    #[test]
    fn cannot_write_after_commit() {
        let mut s = session();
        s.mark_committed();
        assert!(s.put(key(1), vec![]).is_err());
    }

    #[test]
    fn abort_discards_writes() {
        let mut s = session();
        s.put(key(1), vec![1]).unwrap();
        s.mark_aborted();
        assert_eq!(s.write_count(), 0);
        assert!(s.delete(key(1)).is_err());
    }

    #[test]
    fn first_read_wins_and_own_writes_are_not_tracked() {
        let mut s = session();
        s.record_read(key(1), Some(SequenceNumber::new(5)));
        s.record_read(key(1), Some(SequenceNumber::new(9)));
        s.put(key(2), vec![0]).unwrap();
        s.record_read(key(2), None);

        let reads: Vec<_> = s.read_set().collect();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].1, &Some(SequenceNumber::new(5)));
    }

    #[test]
    fn pending_in_filters_collection() {
        let mut s = session();
        s.put(key(1), vec![1]).unwrap();
        s.put(("versions".to_string(), vec![1]), vec![2]).unwrap();
        assert_eq!(s.pending_in("live").count(), 1);
    }
}
