//! 着色器 permutation 编译器
//!
//! 读取 `<root>/shader` 下的 GLSL 方言源码，对每个目标平台：
//! 收集并展开 permutation，改写为目标语言（GLSL / HLSL，可选翻译为 Metal），
//! 把全部结果打包成压缩数据，并生成 `GameShaders_<target>.h` / `GameShadersImp_<target>.h`。

pub mod backend;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod layout;
pub mod package;
pub mod preprocess;
pub mod registry;
pub mod shader;
pub mod target;
pub mod translate;
pub mod types;

pub use error::ShaderError;
