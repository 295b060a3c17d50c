//! Out-of-band delivery channels.

pub mod email;
