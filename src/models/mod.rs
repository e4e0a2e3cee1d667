pub mod audio;
pub mod job;
pub mod reference;
pub mod song;
