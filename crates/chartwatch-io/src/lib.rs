pub mod alert;
pub mod companion;
pub mod hub;
pub mod origin;

pub use alert::CommandAlertSink;
pub use companion::{FeedClick, FeedItem, NotificationFeed, run_companion_listener};
pub use hub::{CompanionHub, CompanionWindow};
pub use origin::OriginPolicy;
