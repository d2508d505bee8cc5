pub mod error;
pub mod feature_flags;

// Chapter-case domain modules
pub mod case;
pub mod case_file;
pub mod content;
pub mod event;
pub mod form;
pub mod locale;
pub mod page;
pub mod person;
pub mod roznama;

pub use error::*;
pub use feature_flags::*;

pub use case::*;
pub use case_file::*;
pub use event::*;
pub use form::*;
pub use locale::*;
pub use page::*;
pub use person::*;
pub use roznama::*;
// content helpers are used through `shared_types::content::*` to keep the
// alias tables out of the crate root.
