//! Point-in-time and by-version reads.

use super::VersionedCollection;
use crate::error::VersionResult;
use crate::fields;
use histodb_codec::{Timestamp, Value};
use histodb_store::{Document, Filter, FindOptions, Session, Sort};

impl VersionedCollection {
    /// Returns `id` as it was at `version`.
    ///
    /// The live record answers if it is at that version; otherwise the
    /// history record archived for that version, if any.
    pub fn find_version(
        &self,
        id: &Value,
        version: u64,
        mut session: Option<&mut Session>,
    ) -> VersionResult<Option<Document>> {
        let current = self.store.find_one(
            &self.live,
            &Self::at_version(id, version),
            &FindOptions::default(),
            session.as_deref_mut(),
        )?;
        if current.is_some() {
            return Ok(current);
        }

        Ok(self.store.find_one(
            &self.config.collection,
            &Self::archived(id, version),
            &FindOptions::default(),
            session,
        )?)
    }

    /// Returns `id` as it was at instant `at`.
    ///
    /// The live record answers if it became valid at or before `at`;
    /// otherwise the history record whose validity interval
    /// `[start, end)` contains `at`, if any.
    pub fn find_valid_version(
        &self,
        id: &Value,
        at: Timestamp,
        mut session: Option<&mut Session>,
    ) -> VersionResult<Option<Document>> {
        let live = Filter::eq(fields::ID, id.clone()).and(Filter::lte(fields::VALIDITY_START, at));
        let current =
            self.store
                .find_one(&self.live, &live, &FindOptions::default(), session.as_deref_mut())?;
        if current.is_some() {
            return Ok(current);
        }

        let archived = Filter::eq(fields::HISTORY_ID, id.clone())
            .and(Filter::lte(fields::VALIDITY_START, at))
            .and(Filter::gt(fields::VALIDITY_END, at));
        let newest_first = FindOptions::sorted(Sort::descending(fields::VERSION));
        Ok(self
            .store
            .find_one(&self.config.collection, &archived, &newest_first, session)?)
    }
}
