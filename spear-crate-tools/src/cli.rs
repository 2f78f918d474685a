//! 各个命令行工具共用的参数

use std::path::PathBuf;

use crate::config::{CONFIG_FILE_NAME, SpearConfig};
use crate::resource::SpearPath;

#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// 工程根目录，默认取 SPEAR_ROOT 或当前目录
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// 配置文件，默认为 <root>/spear.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 配置文件不存在时写出一份默认配置
    #[arg(long)]
    pub init_config: bool,
}

impl CommonArgs {
    /// 解析根目录并加载配置
    pub fn load(&self) -> anyhow::Result<SpearPath> {
        let root = SpearPath::resolve_root(self.root.as_deref())?;
        let config_path = self.config.clone().unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
        let config = SpearConfig::load_or_default(&config_path)?;
        if self.init_config && !config_path.exists() {
            config.save_to_file(&config_path)?;
            log::info!("Wrote default config to {:?}", config_path);
        }

        log::info!("Project root: {:?}", root);
        Ok(SpearPath::new(root, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("spear-cli-{}", std::process::id()));
        let args = CommonArgs {
            root: Some(dir.clone()),
            ..Default::default()
        };

        let paths = args.load().unwrap();
        assert_eq!(paths.root(), dir.as_path());
        assert_eq!(paths.shader_root_path(), dir.join("src/game/shader2"));
    }

    #[test]
    fn test_init_config_writes_template() {
        let dir = std::env::temp_dir().join(format!("spear-cli-init-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let args = CommonArgs {
            root: Some(dir.clone()),
            init_config: true,
            ..Default::default()
        };

        args.load().unwrap();
        let written = SpearConfig::from_file(dir.join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(written.shader.targets, SpearConfig::default().shader.targets);

        std::fs::remove_dir_all(dir).ok();
    }
}
