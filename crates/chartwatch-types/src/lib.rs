pub mod notification;
pub mod types;

pub use notification::{
    BroadcastMessage, CompanionReport, HistoryEntry, HistoryStatus, MessageKind,
    NotificationRecord, StatusPatch,
};
pub use types::{
    ActiveContext, AlertAction, AppEvent, CandidateIdentity, CaptureRegion, PatientMatch,
    ScoredMatch,
};
