pub mod error;
pub mod extract;
pub mod fanout;
pub mod preprocess;
pub mod tracker;

pub use error::{Error, Result};
pub use extract::{IdentityExtractor, PatternExtractor};
pub use fanout::{
    AlertOutcome, AlertSink, DesktopAlert, Destination, DestinationRegistry, DispatchContext,
    DispatchReport, Dispatcher,
};
pub use tracker::{ContextTracker, Transition};
