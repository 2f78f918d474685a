//! 基于修改时间的过期检查

use std::path::Path;

/// 输出比输入新时返回 true
///
/// 任意一个文件不存在或无法读取修改时间时视为过期。
pub fn is_up_to_date(input: &Path, output: &Path) -> bool {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|meta| meta.modified()).ok();

    match (modified(input), modified(output)) {
        (Some(input_time), Some(output_time)) => output_time > input_time,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("spear-staleness-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(path: &Path, time: SystemTime) {
        let file = File::create(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_missing_output_is_stale() {
        let dir = scratch_dir("missing");
        let input = dir.join("a.glsl");
        touch(&input, SystemTime::now());

        assert!(!is_up_to_date(&input, &dir.join("a.h")));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_newer_output_is_up_to_date() {
        let dir = scratch_dir("newer");
        let input = dir.join("a.glsl");
        let output = dir.join("a.h");
        let now = SystemTime::now();
        touch(&input, now - Duration::from_secs(60));
        touch(&output, now);

        assert!(is_up_to_date(&input, &output));
        assert!(!is_up_to_date(&output, &input));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_equal_time_is_stale() {
        let dir = scratch_dir("equal");
        let input = dir.join("a.c");
        let output = dir.join("a.o");
        let now = SystemTime::now();
        touch(&input, now);
        touch(&output, now);

        assert!(!is_up_to_date(&input, &output));

        fs::remove_dir_all(dir).ok();
    }
}
