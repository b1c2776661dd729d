mod catalog;
mod edit;
mod lifecycle;
mod manager;
mod node;
mod simulator;

pub use catalog::NodeCatalog;
pub use manager::ChainManager;
pub use node::*;
pub use simulator::Simulator;
