//! 阴影 PCF 采样偏移的 Halton 序列
//!
//! 输出可以直接粘贴进 shader 的 GLSL 代码。

/// 从 3 开始的奇素数
pub fn odd_primes() -> impl Iterator<Item = u32> {
    (3u32..)
        .step_by(2)
        .filter(|&n| (3..).step_by(2).take_while(|d| d * d <= n).all(|d| n % d != 0))
}

/// `index` 在 `base` 进制下的 radical inverse
pub fn radical_inverse(mut index: u32, base: u32) -> f64 {
    let mut result = 0.0;
    let mut denom = 1.0;
    while index > 0 {
        denom *= base as f64;
        result += (index % base) as f64 / denom;
        index /= base;
    }
    result
}

/// `count` 个 `dims` 维采样点，跳过第一个素数 3，即使用 5, 7, 11, ...
pub fn halton_points(count: u32, dims: usize) -> Vec<Vec<f64>> {
    let bases: Vec<u32> = odd_primes().skip(1).take(dims).collect();
    (0..count)
        .map(|i| bases.iter().map(|&base| radical_inverse(i, base)).collect())
        .collect()
}

pub fn shadow_sample_lines(count: u32) -> Vec<String> {
    let mut lines: Vec<String> = halton_points(count, 3)
        .iter()
        .map(|p| {
            format!(
                "\tsum += dist < texture(shadowDepth, pos + radius*vec3({:.6},{:.6},{:.6})).x ? 1.0 : 0.0;",
                p[0] - 0.5,
                p[1] - 0.5,
                p[2] - 0.5
            )
        })
        .collect();
    lines.push(format!("\tsum *= 1.0 / {count}.0;"));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primes() {
        assert_eq!(odd_primes().take(6).collect::<Vec<_>>(), vec![3, 5, 7, 11, 13, 17]);
    }

    #[test]
    fn test_radical_inverse() {
        assert_eq!(radical_inverse(0, 5), 0.0);
        assert_eq!(radical_inverse(1, 2), 0.5);
        assert_eq!(radical_inverse(3, 2), 0.75);
        assert!((radical_inverse(6, 5) - (1.0 / 5.0 + 1.0 / 25.0)).abs() < 1e-12);
    }

    #[test]
    fn test_shadow_lines() {
        let lines = shadow_sample_lines(32);
        assert_eq!(lines.len(), 33);
        assert_eq!(
            lines[0],
            "\tsum += dist < texture(shadowDepth, pos + radius*vec3(-0.500000,-0.500000,-0.500000)).x ? 1.0 : 0.0;"
        );
        assert_eq!(
            lines[1],
            "\tsum += dist < texture(shadowDepth, pos + radius*vec3(-0.300000,-0.357143,-0.409091)).x ? 1.0 : 0.0;"
        );
        assert_eq!(lines[32], "\tsum *= 1.0 / 32.0;");
    }
}
