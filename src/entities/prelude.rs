pub use super::share_records::Entity as ShareRecords;
