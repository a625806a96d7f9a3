//! `conseil-core` - Student, bulletin and field-parser types shared by every crate.

pub mod model;
pub mod parse;
pub mod row;

pub use model::{Bulletin, Half, HalfRecord, Student, SubjectAppreciation};
pub use parse::{parse_decimal, parse_duration, split_recap_field, RecapFields};
pub use row::SourceRow;
