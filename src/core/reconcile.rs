//! Record reconciler.
//!
//! Pure decision step: given one parsed event and the records already stored
//! for its key, decide whether to create a record, widen an existing one, or
//! refuse the merge. No I/O happens in [`reconcile`]; [`reconcile_and_write`]
//! pairs it with the store writes so a store can run both under one lock.

use crate::errors::{AppError, AppResult};
use crate::models::{
    AttachmentList, AttendanceEvent, AttendanceRecord, NewAttendanceRecord, RecordUpdate,
};
use thiserror::Error;

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Create(NewAttendanceRecord),
    Update(RecordUpdate),
    Rejected(MergeRejection),
}

/// What a reconciled event did once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Created(AttendanceRecord),
    Updated(RecordUpdate),
    /// The target record already held this interval and attachment.
    Unchanged(RecordUpdate),
    Rejected(MergeRejection),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeRejection {
    #[error("attachment list for record {record_id:?} would reach {len} chars (limit {limit}) adding {attachment}")]
    Overflow {
        record_id: Option<i64>,
        attachment: String,
        len: usize,
        limit: usize,
    },
}

impl From<MergeRejection> for AppError {
    fn from(r: MergeRejection) -> Self {
        match r {
            MergeRejection::Overflow {
                attachment,
                len,
                limit,
                ..
            } => AppError::MergeOverflow {
                attachment,
                len,
                limit,
            },
        }
    }
}

/// Decide what `event` does to the records of its key.
///
/// - records whose key differs from the event's (person/project compared
///   case-sensitively, date exactly) are ignored
/// - with no matching record, a new one spans `[event.time, event.time]`
/// - otherwise the lowest-id record is the target; its interval becomes the
///   min/max of every matching record's bounds and the event time, and the
///   event's file name is appended to its attachments if not already there
/// - an attachment list whose serialized form would exceed
///   `attachment_limit` chars is refused and nothing changes
pub fn reconcile(
    event: &AttendanceEvent,
    existing: &[AttendanceRecord],
    attachment_limit: usize,
) -> Reconciliation {
    let key = event.key();

    let mut matching: Vec<&AttendanceRecord> = existing.iter().filter(|r| r.key() == key).collect();
    matching.sort_by_key(|r| r.id);

    let Some((target, others)) = matching.split_first() else {
        let attachments = AttachmentList::from_names([event.attachment_name.as_str()]);
        if attachments.serialized_len() > attachment_limit {
            return Reconciliation::Rejected(MergeRejection::Overflow {
                record_id: None,
                attachment: event.attachment_name.clone(),
                len: attachments.serialized_len(),
                limit: attachment_limit,
            });
        }

        return Reconciliation::Create(NewAttendanceRecord {
            person: event.person.clone(),
            project: event.project.clone(),
            date: event.date,
            start_time: event.time,
            end_time: event.time,
            attachments,
        });
    };

    let (start_time, end_time) = matching
        .iter()
        .flat_map(|r| [r.start_time, r.end_time])
        .fold((event.time, event.time), |(lo, hi), t| (lo.min(t), hi.max(t)));

    let mut attachments = target.attachments.clone();
    let added = attachments.push_unique(&event.attachment_name);

    if added && attachments.serialized_len() > attachment_limit {
        return Reconciliation::Rejected(MergeRejection::Overflow {
            record_id: Some(target.id),
            attachment: event.attachment_name.clone(),
            len: attachments.serialized_len(),
            limit: attachment_limit,
        });
    }

    Reconciliation::Update(RecordUpdate {
        id: target.id,
        start_time,
        end_time,
        attachments,
        conflicting_ids: others.iter().map(|r| r.id).collect(),
    })
}

/// Reconcile `event` against `existing` and perform the write it calls for.
///
/// `existing` must come from the same snapshot the writes go to.
pub fn reconcile_and_write<C, U>(
    event: &AttendanceEvent,
    existing: &[AttendanceRecord],
    attachment_limit: usize,
    create: C,
    update: U,
) -> AppResult<Applied>
where
    C: FnOnce(&NewAttendanceRecord) -> AppResult<AttendanceRecord>,
    U: FnOnce(&RecordUpdate) -> AppResult<()>,
{
    match reconcile(event, existing, attachment_limit) {
        Reconciliation::Create(new) => Ok(Applied::Created(create(&new)?)),
        Reconciliation::Update(upd) => {
            let noop = existing
                .iter()
                .find(|r| r.id == upd.id)
                .is_some_and(|current| upd.is_noop(current));
            if noop {
                return Ok(Applied::Unchanged(upd));
            }
            update(&upd)?;
            Ok(Applied::Updated(upd))
        }
        Reconciliation::Rejected(rejection) => Ok(Applied::Rejected(rejection)),
    }
}
