//! Invariant checkers for archived history.
//!
//! Each checker returns `Err` with a readable description of the first
//! violation, so it can be used from plain tests and from proptest bodies.

use histodb_codec::{Timestamp, Value};
use histodb_core::{fields, history_id, VersionedCollection};
use histodb_store::{Document, Filter, FindOptions};

/// Result of an invariant check.
pub type CheckResult = Result<(), String>;

/// Checks the history of one record id.
///
/// - archived versions are exactly `1..=n` in order, each under its
///   composite `{_id, _version}` key
/// - every validity interval is closed and non-inverted
/// - consecutive intervals meet: `end(v) == start(v + 1)`, except that a
///   version following a deletion (a re-inserted id) may start later
/// - a live record is at version `n + 1` and starts where the last
///   archived interval ends, or after it if that archive was a deletion
/// - a record with history but no live copy was archived by a deletion
pub fn check_history(collection: &VersionedCollection, id: &Value) -> CheckResult {
    let history = collection.history_of(id, None).map_err(|e| e.to_string())?;
    let live = collection
        .find_one(
            &Filter::eq(fields::ID, id.clone()),
            &FindOptions::default(),
            None,
        )
        .map_err(|e| e.to_string())?;

    let mut previous: Option<Boundary> = None;
    for (index, snapshot) in history.iter().enumerate() {
        let expected = index as i64 + 1;
        let version = integer(snapshot, fields::VERSION)?;
        if version != expected {
            return Err(format!("{id:?}: archived version {version}, expected {expected}"));
        }
        if snapshot.id() != Some(&history_id(id, expected as u64)) {
            return Err(format!("{id:?} v{version}: wrong history _id {:?}", snapshot.id()));
        }

        let start = timestamp(snapshot, fields::VALIDITY_START)?;
        let end = timestamp(snapshot, fields::VALIDITY_END)?;
        if end < start {
            return Err(format!("{id:?} v{version}: validity ends at {end} before {start}"));
        }
        if let Some(boundary) = previous {
            if !boundary.admits(start) {
                return Err(format!(
                    "{id:?} v{version}: starts at {start}, previous version ended at {}",
                    boundary.end
                ));
            }
        }
        previous = Some(Boundary {
            end,
            deleted: snapshot.get(fields::DELETER).is_some(),
        });
    }

    match live {
        Some(record) => {
            let version = integer(&record, fields::VERSION)?;
            let expected = history.len() as i64 + 1;
            if version != expected {
                return Err(format!("{id:?}: live version {version}, expected {expected}"));
            }
            if record.get(fields::EDITOR).is_some() || record.get(fields::DELETER).is_some() {
                return Err(format!("{id:?}: live record carries attribution"));
            }
            let start = timestamp(&record, fields::VALIDITY_START)?;
            if let Some(boundary) = previous {
                if !boundary.admits(start) {
                    return Err(format!(
                        "{id:?}: live version starts at {start}, previous ended at {}",
                        boundary.end
                    ));
                }
            }
        }
        None => {
            if let Some(last) = history.last() {
                if last.get(fields::DELETER).is_none() {
                    return Err(format!("{id:?}: gone from live but last archive has no deleter"));
                }
            }
        }
    }
    Ok(())
}

/// Checks [`check_history`] for every id found live or in history.
pub fn check_all_histories(collection: &VersionedCollection) -> CheckResult {
    let live = collection
        .find(&Filter::All, &FindOptions::default(), None)
        .map_err(|e| e.to_string())?;
    let archived = collection
        .store()
        .find(
            collection.history_collection(),
            &Filter::All,
            &FindOptions::default(),
            None,
        )
        .map_err(|e| e.to_string())?;

    let mut ids: Vec<Value> = Vec::new();
    let candidates = live
        .iter()
        .filter_map(Document::id)
        .chain(archived.iter().filter_map(|d| d.get_path(fields::HISTORY_ID)));
    for id in candidates {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    for id in &ids {
        check_history(collection, id)?;
    }
    Ok(())
}

/// Where an archived interval ended, and whether a deletion ended it.
#[derive(Clone, Copy)]
struct Boundary {
    end: Timestamp,
    deleted: bool,
}

impl Boundary {
    /// Whether the next version may start at `start`.
    fn admits(self, start: Timestamp) -> bool {
        if self.deleted {
            start >= self.end
        } else {
            start == self.end
        }
    }
}

fn integer(doc: &Document, path: &str) -> Result<i64, String> {
    doc.get_path(path)
        .and_then(Value::as_integer)
        .ok_or_else(|| format!("{:?}: missing integer {path}", doc.id()))
}

fn timestamp(doc: &Document, path: &str) -> Result<Timestamp, String> {
    doc.get_path(path)
        .and_then(Value::as_timestamp)
        .ok_or_else(|| format!("{:?}: missing timestamp {path}", doc.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{person, TestCollection};
    use histodb_core::MutationOptions;

    #[test]
    fn clean_history_passes() {
        let items = TestCollection::new();
        let mut doc = items.saved(person("p1", "Ann"));
        for age in 20..25i64 {
            doc.insert("age", age);
            doc = items.saved(doc);
        }
        items.saved(person("p2", "Bob"));
        items
            .remove(&doc, None, &MutationOptions::default())
            .unwrap();

        check_all_histories(&items).unwrap();
    }

    #[test]
    fn reinserted_history_passes() {
        let items = TestCollection::new();
        let doc = items.saved(person("p1", "Ann"));
        items
            .remove(&doc, None, &MutationOptions::default())
            .unwrap();
        let mut doc = items.saved(person("p1", "Ann"));
        doc.insert("age", 30i64);
        items.saved(doc);

        assert_eq!(items.history("p1").len(), 2);
        check_all_histories(&items).unwrap();
    }

    #[test]
    fn tampered_history_is_reported() {
        let items = TestCollection::new();
        let mut doc = items.saved(person("p1", "Ann"));
        doc = items.saved(doc);
        items.saved(doc);

        items
            .store()
            .delete_one(
                items.history_collection(),
                &Filter::eq("_id", history_id(&Value::from("p1"), 1)),
                None,
            )
            .unwrap();

        let err = check_history(&items, &Value::from("p1")).unwrap_err();
        assert!(err.contains("expected 1"), "{err}");
    }
}
