pub mod lifecycle;
pub mod retry;
pub mod usecases;

#[cfg(test)]
pub(crate) mod testing;

pub use lifecycle::Lifecycle;
pub use usecases::{CheckMessages, CheckRelease, CheckReminder, UploadCharacteristics};
