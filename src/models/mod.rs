pub mod activity;
pub mod attachments;
pub mod attendance;
pub mod project;

pub use attachments::AttachmentList;
pub use attendance::{AttendanceEvent, AttendanceRecord, NewAttendanceRecord, RecordKey, RecordUpdate};
