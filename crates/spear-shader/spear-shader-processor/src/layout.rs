//! uniform block 的内存布局
//!
//! GLSL、HLSL 和 C++ 头文件都使用同一份布局结果，保证三者的偏移一致。

use crate::types::Uniform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutItem<'a> {
    /// 对齐产生的空隙，单位 word
    Padding { words: u32 },
    Field { uniform: &'a Uniform, offset: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout<'a> {
    pub items: Vec<LayoutItem<'a>>,
    /// 总大小，单位 word
    pub size: u32,
}

impl<'a> BlockLayout<'a> {
    pub fn new(uniforms: &'a [Uniform]) -> Self {
        let mut items = Vec::with_capacity(uniforms.len());
        let mut offset = 0;

        for uniform in uniforms {
            let align = uniform.ty.align();
            let padding = (align - offset % align) % align;
            if padding > 0 {
                items.push(LayoutItem::Padding { words: padding });
                offset += padding;
            }

            items.push(LayoutItem::Field { uniform, offset });
            offset += uniform.words();
        }

        Self { items, size: offset }
    }

    /// 每个 uniform 的偏移，单位 word
    pub fn offsets(&self) -> impl Iterator<Item = (&'a Uniform, u32)> + '_ {
        self.items.iter().filter_map(|item| match *item {
            LayoutItem::Field { uniform, offset } => Some((uniform, offset)),
            LayoutItem::Padding { .. } => None,
        })
    }
}

/// 元素大小不是 4 word 倍数的数组，std140 下的步长会和这里的紧密排列不同
pub fn irregular_arrays(uniforms: &[Uniform]) -> impl Iterator<Item = &Uniform> {
    uniforms
        .iter()
        .filter(|u| u.count.is_some() && u.ty.size() % 4 != 0)
}

/// block 的大小，单位 word
pub fn block_size(uniforms: &[Uniform]) -> u32 {
    BlockLayout::new(uniforms).size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;

    fn uniform(ty: ValueType, name: &str, count: Option<u32>) -> Uniform {
        Uniform {
            ty,
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn test_padding_before_vec3() {
        let uniforms = vec![
            uniform(ValueType::Float, "numLightsF", None),
            uniform(ValueType::Vec3, "cameraPosition", None),
            uniform(ValueType::Vec4, "diffuseEnvmapMad", None),
            uniform(ValueType::Vec4, "pointLightData", Some(64)),
        ];
        let layout = BlockLayout::new(&uniforms);

        let offsets: Vec<u32> = layout.offsets().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0, 4, 8, 12]);
        assert_eq!(layout.size, 12 + 256);
        assert_eq!(
            layout.items.iter().filter(|i| matches!(i, LayoutItem::Padding { .. })).count(),
            2
        );
        assert!(matches!(layout.items[1], LayoutItem::Padding { words: 3 }));
        assert!(matches!(layout.items[3], LayoutItem::Padding { words: 1 }));
    }

    #[test]
    fn test_tight_packing() {
        let uniforms = vec![
            uniform(ValueType::Mat4, "worldToClip", None),
            uniform(ValueType::Vec4, "sphereGridMad", None),
            uniform(ValueType::IVec2, "sphereGridSize", None),
            uniform(ValueType::Vec4, "layerHeights", None),
            uniform(ValueType::Int, "numLayers", None),
            uniform(ValueType::Float, "sphereRadius", None),
        ];
        let layout = BlockLayout::new(&uniforms);

        let offsets: Vec<u32> = layout.offsets().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0, 16, 20, 24, 28, 29]);
        assert_eq!(layout.size, 30);
    }

    #[test]
    fn test_vec2_alignment() {
        let uniforms = vec![
            uniform(ValueType::Float, "a", None),
            uniform(ValueType::Vec2, "b", None),
            uniform(ValueType::Float, "c", None),
            uniform(ValueType::Vec3, "d", None),
        ];
        let offsets: Vec<u32> = BlockLayout::new(&uniforms).offsets().map(|(_, o)| o).collect();
        assert_eq!(offsets, vec![0, 2, 4, 8]);
        assert_eq!(block_size(&uniforms), 11);
    }

    #[test]
    fn test_offsets_respect_alignment() {
        let mut uniforms = Vec::new();
        for (i, ty) in ValueType::ALL.into_iter().cycle().take(40).enumerate() {
            let count = if i % 5 == 0 { Some(2) } else { None };
            uniforms.push(uniform(ty, &format!("u{i}"), count));
        }

        let layout = BlockLayout::new(&uniforms);
        let mut end = 0;
        for (u, offset) in layout.offsets() {
            assert_eq!(offset % u.ty.align(), 0, "{} misaligned", u.name);
            assert!(offset >= end);
            end = offset + u.words();
        }
        assert_eq!(layout.size, end);
    }

    #[test]
    fn test_irregular_arrays() {
        let uniforms = vec![
            uniform(ValueType::Vec4, "lights", Some(8)),
            uniform(ValueType::Vec2, "offsets", Some(4)),
            uniform(ValueType::Float, "weights", Some(3)),
            uniform(ValueType::Vec3, "single", None),
            uniform(ValueType::Mat4, "bones", Some(2)),
        ];
        let names: Vec<&str> = irregular_arrays(&uniforms).map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["offsets", "weights"]);
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(block_size(&[]), 0);
    }
}
