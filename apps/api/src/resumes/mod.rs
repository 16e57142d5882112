//! Resume uploads: the file lives in object storage, the row keeps its key and the
//! extracted text used for analysis.

pub mod extract;
pub mod handlers;
