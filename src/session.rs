use crate::config::EditorConfig;
use crate::engine::ChainManager;
use crate::types::{NodeKind, Position, Result, RuleError, RuleNode};
use tracing::debug;
use uuid::Uuid;

/// 正在进行的拖拽
#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    node_id: Uuid,
    pointer: Position,
    origin: Position,
}

/// 单个规则链的编辑会话, 把画布手势转换为图编辑操作
#[derive(Debug)]
pub struct EditorSession {
    manager: ChainManager,
    chain_id: Uuid,
    selected: Option<Uuid>,
    drag: Option<Drag>,
}

impl EditorSession {
    /// 打开会话, 规则链必须已由管理器持有
    pub async fn open(manager: ChainManager, chain_id: Uuid) -> Result<Self> {
        manager.get_chain(chain_id).await?;
        Ok(Self {
            manager,
            chain_id,
            selected: None,
            drag: None,
        })
    }

    pub fn chain_id(&self) -> Uuid {
        self.chain_id
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    fn editor(&self) -> &EditorConfig {
        self.manager.editor_config()
    }

    pub async fn select(&mut self, node_id: Uuid) -> Result<()> {
        let chain = self.manager.get_chain(self.chain_id).await?;
        if !chain.contains_node(node_id) {
            return Err(RuleError::NodeNotFound(node_id));
        }
        self.selected = Some(node_id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// 从节点面板添加节点, 类型以名称给出
    pub async fn add_node(&mut self, kind: &str, position: Option<Position>) -> Result<Uuid> {
        let kind: NodeKind = kind.parse()?;
        let position = position.unwrap_or(self.editor().default_position);
        let node_id = self
            .manager
            .add_node(self.chain_id, kind, Some(position), None)
            .await?;
        self.selected = Some(node_id);
        Ok(node_id)
    }

    pub async fn begin_drag(&mut self, node_id: Uuid, pointer: Position) -> Result<()> {
        let chain = self.manager.get_chain(self.chain_id).await?;
        let node = chain.node(node_id).ok_or(RuleError::NodeNotFound(node_id))?;
        self.drag = Some(Drag {
            node_id,
            pointer,
            origin: node.position,
        });
        self.selected = Some(node_id);
        Ok(())
    }

    /// 按指针相对拖拽起点的位移移动节点, 没有拖拽时忽略
    pub async fn drag_to(&mut self, pointer: Position) -> Result<Option<Position>> {
        let Some(drag) = self.drag else {
            return Ok(None);
        };
        let position = drag
            .origin
            .offset(pointer.x - drag.pointer.x, pointer.y - drag.pointer.y);
        self.manager
            .move_node(self.chain_id, drag.node_id, position)
            .await?;
        Ok(Some(position))
    }

    pub fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            debug!(chain_id = %self.chain_id, node_id = %drag.node_id, "拖拽结束");
        }
    }

    pub async fn connect(&mut self, source_id: Uuid, target_id: Uuid) -> Result<Uuid> {
        self.manager
            .edit(self.chain_id, |chain| chain.add_connection(source_id, target_id))
            .await
    }

    /// 提交节点表单
    pub async fn submit_node_form(
        &mut self,
        node_id: Uuid,
        name: &str,
        description: Option<&str>,
        configuration: &str,
    ) -> Result<()> {
        self.manager
            .edit(self.chain_id, |chain| {
                chain.update_node(node_id, name, description, configuration)
            })
            .await
    }

    /// 删除节点, 被删除的节点若处于选中或拖拽状态则一并清除
    pub async fn delete_node(&mut self, node_id: Uuid) -> Result<RuleNode> {
        let removed = self
            .manager
            .edit(self.chain_id, |chain| chain.delete_node(node_id))
            .await?;
        if self.selected == Some(node_id) {
            self.selected = None;
        }
        if self.drag.map(|d| d.node_id) == Some(node_id) {
            self.drag = None;
        }
        Ok(removed)
    }
}
