mod categories;
mod sessions;

pub(crate) use categories::credit_category_row;
pub(crate) use sessions::{close_session_row, insert_session_row};
