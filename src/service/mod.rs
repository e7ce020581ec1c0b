pub mod accounts;
pub mod follow_graph;
pub mod microposts;

pub use accounts::{Accounts, Session};
pub use follow_graph::FollowGraph;
pub use microposts::Microposts;
