pub mod optimize;
pub mod profile;
