//! 目标着色语言的代码生成
//!
//! 后端负责：接口声明（header）、main 的入口/出口、`gl_Position` 和 `gl_FragColor` 的改写。

mod glsl;
mod hlsl;

pub use glsl::GlslBackend;
pub use hlsl::HlslBackend;

use spear_crate_tools::config::BackendKind;

use crate::compiler::ShaderInterface;
use crate::layout::{BlockLayout, LayoutItem};
use crate::types::{Stage, UniformBlock, ValueType};

/// HLSL 结构体成员的临时前缀，避免名字宏递归展开；最终输出时会被删除
pub const TEMP_PREFIX: &str = "__sp__temp__";

pub trait Backend: Send + Sync {
    /// 中间文件的扩展名
    fn extension(&self) -> &'static str;

    /// 编译时额外定义的宏
    fn defines(&self) -> Vec<(String, String)>;

    fn header(&self, stage: Stage, interface: &ShaderInterface) -> Vec<String>;

    fn main_begin(&self, stage: Stage) -> Vec<String>;

    fn main_end(&self, stage: Stage) -> Vec<String>;

    fn position(&self, interface: &ShaderInterface, indent: &str, expr: &str) -> Vec<String>;

    fn frag_color(&self, indent: &str, expr: &str) -> Vec<String>;
}

pub fn create_backend(kind: BackendKind, version: &str) -> Box<dyn Backend> {
    match kind {
        BackendKind::Glsl => Box::new(GlslBackend::new(version)),
        BackendKind::Hlsl => Box::new(HlslBackend::new()),
    }
}

/// uniform block 的成员声明，按布局插入 `float sp_<block>_pad<n>;`
fn block_members(block: &UniformBlock, type_name: impl Fn(ValueType) -> &'static str) -> Vec<String> {
    let layout = BlockLayout::new(&block.uniforms);
    let mut lines = Vec::with_capacity(layout.items.len());
    let mut pad = 0;

    for item in &layout.items {
        match *item {
            LayoutItem::Padding { words } => {
                for _ in 0..words {
                    lines.push(format!("\tfloat sp_{}_pad{};", block.name, pad));
                    pad += 1;
                }
            }
            LayoutItem::Field { uniform, .. } => {
                let ty = type_name(uniform.ty);
                match uniform.count {
                    Some(count) => lines.push(format!("\t{} {}[{}];", ty, uniform.name, count)),
                    None => lines.push(format!("\t{} {};", ty, uniform.name)),
                }
            }
        }
    }

    lines
}
