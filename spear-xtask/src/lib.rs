//! 引擎构建过程中用到的辅助工具
//!
//! 每个模块对应 `src/bin` 下的一个命令行工具，命令行只负责参数解析和日志初始化。

pub mod halton;
pub mod reflection;
pub mod shdc;
pub mod wasm;

use std::path::{Path, PathBuf};

/// 递归列出目录下的文件，按路径排序
pub(crate) fn sorted_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// 统一使用 `/` 的路径字符串，用于匹配路径片段
pub(crate) fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
