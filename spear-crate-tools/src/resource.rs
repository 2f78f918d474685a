use std::path::{Path, PathBuf};

use crate::config::SpearConfig;

/// 统一路径管理
///
/// 所有路径基于工程根目录：命令行 `--root` > 环境变量 `SPEAR_ROOT` > 当前工作目录。
/// 相对路径统一来自 [`SpearConfig`]，避免在各个工具里硬编码。
///
/// # 使用示例
/// ```ignore
/// let path = SpearPath::new(root, config);
/// let shaders = path.shader_src_path(); // src/game/shader2/shader
/// let shdc = path.tool_exe("sokol-shdc"); // tool/linux/sokol-shdc
/// ```
#[derive(Debug, Clone)]
pub struct SpearPath {
    root: PathBuf,
    config: SpearConfig,
}

impl SpearPath {
    pub fn new(root: impl Into<PathBuf>, config: SpearConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// 解析工程根目录
    pub fn resolve_root(cli_root: Option<&Path>) -> std::io::Result<PathBuf> {
        if let Some(root) = cli_root {
            return Ok(root.to_path_buf());
        }
        if let Some(root) = std::env::var_os("SPEAR_ROOT") {
            return Ok(PathBuf::from(root));
        }
        std::env::current_dir()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SpearConfig {
        &self.config
    }

    /// 引擎源码目录 `src/`
    pub fn src_path(&self) -> PathBuf {
        self.root.join(&self.config.paths.src)
    }

    /// 中间文件目录 `temp/`
    pub fn temp_path(&self) -> PathBuf {
        self.root.join(&self.config.paths.temp)
    }

    /// 着色器中间文件目录 `temp/shaders/<target>`
    pub fn shader_temp_path(&self, target: &str) -> PathBuf {
        self.temp_path().join("shaders").join(target)
    }

    /// 生成文件的输出目录，也是默认的 include 目录
    pub fn shader_root_path(&self) -> PathBuf {
        self.root.join(&self.config.shader.root)
    }

    /// 着色器源文件目录
    pub fn shader_src_path(&self) -> PathBuf {
        self.shader_root_path().join(&self.config.shader.shader_dir)
    }

    pub fn shader_include_paths(&self) -> Vec<PathBuf> {
        if self.config.shader.include_dirs.is_empty() {
            vec![self.shader_root_path()]
        } else {
            self.config.shader.include_dirs.iter().map(|dir| self.root.join(dir)).collect()
        }
    }

    /// 当前平台的外部工具目录，例如 `tool/linux`
    pub fn tools_path(&self) -> PathBuf {
        self.root.join(&self.config.paths.tool).join(platform_dir())
    }

    /// 外部工具的可执行文件路径，Windows 下追加 `.exe`
    pub fn tool_exe(&self, name: &str) -> PathBuf {
        self.tools_path().join(exe_name(name))
    }
}

/// 工具目录下的平台子目录名
pub fn platform_dir() -> &'static str {
    if cfg!(target_os = "windows") {
        "win32"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else {
        "linux"
    }
}

pub fn exe_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let path = SpearPath::new("/proj", SpearConfig::default());

        assert_eq!(path.src_path(), PathBuf::from("/proj/src"));
        assert_eq!(path.shader_src_path(), PathBuf::from("/proj/src/game/shader2/shader"));
        assert_eq!(path.shader_temp_path("hlsl"), PathBuf::from("/proj/temp/shaders/hlsl"));
        assert_eq!(path.shader_include_paths(), vec![PathBuf::from("/proj/src/game/shader2")]);
        assert!(path.tools_path().starts_with("/proj/tool"));
    }

    #[test]
    fn test_include_dirs_override() {
        let mut config = SpearConfig::default();
        config.shader.include_dirs = vec!["a".to_string(), "b/c".to_string()];
        let path = SpearPath::new("/proj", config);

        assert_eq!(path.shader_include_paths(), vec![PathBuf::from("/proj/a"), PathBuf::from("/proj/b/c")]);
    }

    #[test]
    fn test_cli_root_wins() {
        let root = SpearPath::resolve_root(Some(Path::new("/somewhere"))).unwrap();
        assert_eq!(root, PathBuf::from("/somewhere"));
    }
}
