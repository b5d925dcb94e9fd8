pub mod prelude;

pub mod share_records;
