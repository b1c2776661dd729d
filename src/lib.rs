//! 规则链编辑模型与无副作用的模拟执行器.
//!
//! 规则链由节点和有向连接组成, 只能通过图编辑操作和生命周期操作修改.
//! 模拟执行对规则链做一次拓扑遍历, 所有动作类节点都只记录调用而不产生外部影响.

pub mod aop;
pub mod components;
pub mod config;
pub mod engine;
pub mod expr;
pub mod logging;
pub mod session;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::{ChainManager, NodeCatalog, Simulator};
pub use session::EditorSession;
pub use store::{BuiltinTemplates, ChainStore, FileStore, MemoryStore, TemplateSource};
pub use types::*;
