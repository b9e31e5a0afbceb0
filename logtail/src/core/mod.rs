//! Pure deployment-log logic.
//!
//! Nothing here touches the filesystem or the clock directly, so every rule can be
//! tested in isolation.

pub mod record;
pub mod status;
pub mod tail;
pub mod token;
