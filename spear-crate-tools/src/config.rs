//! `spear.toml` 配置
//!
//! 所有字段都有默认值，配置文件不存在时直接使用默认值。

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 配置文件的默认文件名，位于工程根目录
pub const CONFIG_FILE_NAME: &str = "spear.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpearConfig {
    pub paths: PathsConfig,
    pub shader: ShaderConfig,
    pub shdc: ShdcConfig,
    pub wasm: WasmConfig,
}

/// 相对于工程根目录的路径
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// 引擎源码目录
    pub src: String,
    /// 外部工具目录，实际使用时会追加平台子目录
    pub tool: String,
    /// 中间文件目录
    pub temp: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: "src".to_string(),
            tool: "tool".to_string(),
            temp: "temp".to_string(),
        }
    }
}

/// 着色器后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Glsl,
    Hlsl,
}

/// 对后端输出的二次翻译
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslateKind {
    MetalMacos,
    MetalIos,
}

/// 一个输出目标，对应一组 `GameShaders_<name>.h` / `GameShadersImp_<name>.h`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub backend: BackendKind,
    /// GLSL: "300 es" / "300" / "450"；HLSL: "5"
    pub version: String,
    #[serde(default)]
    pub translate: Option<TranslateKind>,
}

impl TargetConfig {
    fn new(name: &str, backend: BackendKind, version: &str, translate: Option<TranslateKind>) -> Self {
        Self {
            name: name.to_string(),
            backend,
            version: version.to_string(),
            translate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// 生成文件所在目录，同时也是默认的 include 目录
    pub root: String,
    /// 着色器源文件目录，相对于 `root`
    pub shader_dir: String,
    /// 额外的 include 目录，相对于工程根目录；为空时使用 `root`
    pub include_dirs: Vec<String>,
    pub targets: Vec<TargetConfig>,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            root: "src/game/shader2".to_string(),
            shader_dir: "shader".to_string(),
            include_dirs: Vec::new(),
            targets: vec![
                TargetConfig::new("gles", BackendKind::Glsl, "300 es", None),
                TargetConfig::new("glsl", BackendKind::Glsl, "300", None),
                TargetConfig::new("hlsl", BackendKind::Hlsl, "5", None),
                TargetConfig::new("macos", BackendKind::Glsl, "450", Some(TranslateKind::MetalMacos)),
                TargetConfig::new("ios", BackendKind::Glsl, "450", Some(TranslateKind::MetalIos)),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShdcConfig {
    pub languages: String,
    pub format: String,
    /// 路径中包含这些片段的文件会被跳过
    pub exclude: Vec<String>,
}

impl Default for ShdcConfig {
    fn default() -> Self {
        Self {
            languages: "glsl300es:glsl330:hlsl5:metal_macos:metal_ios".to_string(),
            format: "sokol_impl".to_string(),
            exclude: vec!["game/shader2".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmConfig {
    pub compiler: String,
    pub output: String,
    pub total_memory: u64,
    pub cpp_std: String,
    /// .o 文件的输出目录，相对于工程根目录
    pub object_dir: String,
}

impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            compiler: "emcc".to_string(),
            output: "spear.js".to_string(),
            total_memory: 268_435_456,
            cpp_std: "c++11".to_string(),
            object_dir: ".".to_string(),
        }
    }
}

impl SpearConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;

        Self::parse(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path.as_ref()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 配置文件存在时加载，否则使用默认值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            log::info!("Loading config: {:?}", path);
            Self::from_file(path)
        } else {
            log::info!("Config {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// 保存配置到 TOML 文件（用于生成模板）
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;

        fs::write(path.as_ref(), content).with_context(|| format!("写入配置文件失败: {:?}", path.as_ref()))?;

        Ok(())
    }
}
