pub mod check_messages;
pub mod check_release;
pub mod check_reminder;
pub mod upload_characteristics;

pub use check_messages::CheckMessages;
pub use check_release::CheckRelease;
pub use check_reminder::CheckReminder;
pub use upload_characteristics::UploadCharacteristics;
