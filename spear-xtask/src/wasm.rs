//! 用 emscripten 把 `src` 下的 C/C++ 源码编译链接为 WASM

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use spear_crate_tools::command::ToolCommand;
use spear_crate_tools::config::WasmConfig;
use spear_crate_tools::resource::SpearPath;
use spear_crate_tools::staleness::is_up_to_date;

use crate::sorted_files;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLang {
    C,
    Cpp,
}

impl SourceLang {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "c" => Some(SourceLang::C),
            "cpp" => Some(SourceLang::Cpp),
            _ => None,
        }
    }
}

/// 一个源文件和它对应的 .o
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    pub source: PathBuf,
    pub object: PathBuf,
    pub lang: SourceLang,
}

/// 所有 .o 放在同一个目录下，不同目录的同名源文件视为错误
pub fn collect_units(src: &Path, object_dir: &Path) -> anyhow::Result<Vec<CompileUnit>> {
    let mut units = Vec::new();
    let mut seen: HashMap<PathBuf, PathBuf> = HashMap::new();

    for source in sorted_files(src)? {
        let Some(lang) = SourceLang::from_path(&source) else {
            continue;
        };
        let Some(stem) = source.file_stem() else {
            continue;
        };

        let mut object_name = stem.to_os_string();
        object_name.push(".o");
        let object = object_dir.join(object_name);

        if let Some(previous) = seen.insert(object.clone(), source.clone()) {
            anyhow::bail!("Duplicated .o file {:?}: {:?} and {:?}", object, previous, source);
        }

        units.push(CompileUnit { source, object, lang });
    }

    Ok(units)
}

pub struct WasmBuild<'a> {
    pub config: &'a WasmConfig,
    /// 源码目录，同时作为 include 目录
    pub src: PathBuf,
    pub optimize: bool,
}

impl WasmBuild<'_> {
    fn opt_flag(&self) -> &'static str {
        if self.optimize { "-O2" } else { "-g" }
    }

    pub fn compile_command(&self, unit: &CompileUnit) -> ToolCommand {
        let mut include = std::ffi::OsString::from("-I");
        include.push(&self.src);

        let mut cmd = ToolCommand::new(&self.config.compiler)
            .arg(&unit.source)
            .arg("-c")
            .arg(include)
            .arg(self.opt_flag());
        if unit.lang == SourceLang::Cpp {
            cmd = cmd.arg(format!("-std={}", self.config.cpp_std));
        }
        cmd.arg("-o").arg(&unit.object)
    }

    pub fn link_command(&self, objects: &[PathBuf], output: &Path) -> ToolCommand {
        ToolCommand::new(&self.config.compiler)
            .args(objects)
            .arg(self.opt_flag())
            .args(["-s", "WASM=1", "-o"])
            .arg(output)
            .arg("-s")
            .arg(format!("TOTAL_MEMORY={}", self.config.total_memory))
    }
}

pub fn run(paths: &SpearPath, optimize: bool) -> anyhow::Result<()> {
    let config = &paths.config().wasm;
    let build = WasmBuild {
        config,
        src: paths.src_path(),
        optimize,
    };

    let object_dir = paths.root().join(&config.object_dir);
    std::fs::create_dir_all(&object_dir)?;

    let units = collect_units(&build.src, &object_dir)?;
    for unit in &units {
        if is_up_to_date(&unit.source, &unit.object) {
            log::info!("Up to date: {:?}", unit.source);
            continue;
        }
        build.compile_command(unit).run()?;
    }

    let objects: Vec<PathBuf> = units.into_iter().map(|unit| unit.object).collect();
    build.link_command(&objects, &paths.root().join(&config.output)).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str, files: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spear-wasm-{}-{}", name, std::process::id()));
        for file in files {
            let path = dir.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        dir
    }

    #[test]
    fn test_collect_units() {
        let dir = scratch("units", &["main.cpp", "ext/stb.c", "ext/stb.h", "README.md"]);

        let units = collect_units(&dir, Path::new("obj")).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].source, dir.join("ext/stb.c"));
        assert_eq!(units[0].object, PathBuf::from("obj/stb.o"));
        assert_eq!(units[0].lang, SourceLang::C);
        assert_eq!(units[1].lang, SourceLang::Cpp);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_duplicated_object() {
        let dir = scratch("dup", &["a/util.cpp", "b/util.c"]);

        let err = collect_units(&dir, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("Duplicated .o file"));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_commands() {
        let config = WasmConfig::default();
        let build = WasmBuild {
            config: &config,
            src: PathBuf::from("/spear/src"),
            optimize: false,
        };
        let unit = CompileUnit {
            source: PathBuf::from("/spear/src/game/Game.cpp"),
            object: PathBuf::from("Game.o"),
            lang: SourceLang::Cpp,
        };

        let compile = build.compile_command(&unit);
        assert_eq!(compile.program, PathBuf::from("emcc"));
        assert_eq!(
            compile.arg_strings(),
            vec!["/spear/src/game/Game.cpp", "-c", "-I/spear/src", "-g", "-std=c++11", "-o", "Game.o"]
        );

        let optimized = WasmBuild {
            optimize: true,
            ..build
        };
        let link = optimized.link_command(&[PathBuf::from("a.o"), PathBuf::from("b.o")], Path::new("spear.js"));
        assert_eq!(
            link.arg_strings(),
            vec!["a.o", "b.o", "-O2", "-s", "WASM=1", "-o", "spear.js", "-s", "TOTAL_MEMORY=268435456"]
        );
    }

    #[test]
    fn test_c_has_no_std_flag() {
        let config = WasmConfig::default();
        let build = WasmBuild {
            config: &config,
            src: PathBuf::from("src"),
            optimize: true,
        };
        let unit = CompileUnit {
            source: PathBuf::from("src/miniz.c"),
            object: PathBuf::from("miniz.o"),
            lang: SourceLang::C,
        };
        let args = build.compile_command(&unit).arg_strings();
        assert!(args.contains(&"-O2".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("-std")));
    }
}
