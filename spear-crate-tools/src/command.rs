//! 外部工具调用
//!
//! 命令先以数据的形式构造（方便测试参数），执行前打印 `$ cmd args...`，失败时返回错误。

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 参数列表的字符串形式
    pub fn arg_strings(&self) -> Vec<String> {
        self.args.iter().map(|arg| arg.to_string_lossy().into_owned()).collect()
    }

    /// 用于日志的命令行
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.arg_strings());
        parts.join(" ")
    }

    /// 执行命令，退出码非 0 时返回错误
    pub fn run(&self) -> anyhow::Result<()> {
        log::info!("$ {}", self.command_line());

        let output = std::process::Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to execute {:?}", self.program))?;
        Self::process_cmd_output(&output);

        if !output.status.success() {
            anyhow::bail!("Command failed ({}): {}", output.status, self.command_line());
        }
        Ok(())
    }

    /// 根据 cmd 执行的结果，处理输出信息
    fn process_cmd_output(output: &std::process::Output) {
        if !output.stdout.is_empty() {
            log::info!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            if output.status.success() {
                log::warn!("stderr: {}", String::from_utf8_lossy(&output.stderr));
            } else {
                log::error!("stderr: {}", String::from_utf8_lossy(&output.stderr));
            }
        }
    }
}
