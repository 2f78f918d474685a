//! Spear 工具集
//!
//! 提供日志初始化、工程路径管理、TOML 配置、过期检查和外部命令执行等通用工具。
//!
//! # SpearPath
//! 基于工程根目录的统一路径管理，避免硬编码相对路径。
//!
//! # SpearConfig
//! 可选的 `spear.toml`，缺省时使用内置默认值。

pub mod cli;
pub mod command;
pub mod config;
pub mod init_log;
pub mod resource;
pub mod staleness;
