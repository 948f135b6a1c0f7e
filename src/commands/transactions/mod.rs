mod discard;
mod exec;
mod multi;

pub use discard::discard;
pub use exec::{exec, run_queued_commands};
pub use multi::multi;
