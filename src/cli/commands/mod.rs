mod init;
mod tree;

pub use init::cmd_init;
pub use tree::{cmd_ancestors, cmd_descendants, cmd_team};
