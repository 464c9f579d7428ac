mod form;
mod format;
mod store;
mod types;

pub use form::{EditOutcome, InputForm, RejectReason, RenderedField, parse_edit};
pub use format::{GROUPING_SEPARATOR, format_grouped, parse_number, strip_grouping};
pub use store::{InputStore, Subscription};
pub use types::{InputField, InputSnapshot, UnknownFieldError};
