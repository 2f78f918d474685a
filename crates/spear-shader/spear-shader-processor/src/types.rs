//! 着色器接口的数据类型
//!
//! 类型表中 size/align 以 word（4 字节）为单位。

/// uniform / attribute / varying 可以使用的数值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Uint,
    UVec2,
    UVec3,
    UVec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Mat4,
}

impl ValueType {
    pub const ALL: [ValueType; 13] = [
        ValueType::Float,
        ValueType::Vec2,
        ValueType::Vec3,
        ValueType::Vec4,
        ValueType::Uint,
        ValueType::UVec2,
        ValueType::UVec3,
        ValueType::UVec4,
        ValueType::Int,
        ValueType::IVec2,
        ValueType::IVec3,
        ValueType::IVec4,
        ValueType::Mat4,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// GLSL 中的类型名
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Vec2 => "vec2",
            ValueType::Vec3 => "vec3",
            ValueType::Vec4 => "vec4",
            ValueType::Uint => "uint",
            ValueType::UVec2 => "uvec2",
            ValueType::UVec3 => "uvec3",
            ValueType::UVec4 => "uvec4",
            ValueType::Int => "int",
            ValueType::IVec2 => "ivec2",
            ValueType::IVec3 => "ivec3",
            ValueType::IVec4 => "ivec4",
            ValueType::Mat4 => "mat4",
        }
    }

    pub fn hlsl_name(self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Vec2 => "float2",
            ValueType::Vec3 => "float3",
            ValueType::Vec4 => "float4",
            ValueType::Uint => "uint",
            ValueType::UVec2 => "uint2",
            ValueType::UVec3 => "uint3",
            ValueType::UVec4 => "uint4",
            ValueType::Int => "int",
            ValueType::IVec2 => "int2",
            ValueType::IVec3 => "int3",
            ValueType::IVec4 => "int4",
            ValueType::Mat4 => "float4x4",
        }
    }

    /// 大小，单位 word
    pub fn size(self) -> u32 {
        match self {
            ValueType::Float | ValueType::Uint | ValueType::Int => 1,
            ValueType::Vec2 | ValueType::UVec2 | ValueType::IVec2 => 2,
            ValueType::Vec3 | ValueType::UVec3 | ValueType::IVec3 => 3,
            ValueType::Vec4 | ValueType::UVec4 | ValueType::IVec4 => 4,
            ValueType::Mat4 => 16,
        }
    }

    /// 对齐，单位 word
    pub fn align(self) -> u32 {
        match self {
            ValueType::Float | ValueType::Uint | ValueType::Int => 1,
            ValueType::Vec2 | ValueType::UVec2 | ValueType::IVec2 => 2,
            _ => 4,
        }
    }

    /// C++ 侧的类型，以及需要额外追加的数组维度（uvec 没有对应的向量类型）
    pub fn cpp_name(self) -> (&'static str, Option<u32>) {
        match self {
            ValueType::Float => ("float", None),
            ValueType::Vec2 => ("sf::Vec2", None),
            ValueType::Vec3 => ("sf::Vec3", None),
            ValueType::Vec4 => ("sf::Vec4", None),
            ValueType::Uint => ("uint32_t", None),
            ValueType::UVec2 => ("uint32_t", Some(2)),
            ValueType::UVec3 => ("uint32_t", Some(3)),
            ValueType::UVec4 => ("uint32_t", Some(4)),
            ValueType::Int => ("int32_t", None),
            ValueType::IVec2 => ("sf::Vec2i", None),
            ValueType::IVec3 => ("sf::Vec3i", None),
            ValueType::IVec4 => ("sf::Vec4i", None),
            ValueType::Mat4 => ("sf::Mat44", None),
        }
    }
}

/// 纹理采样器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DArray,
}

impl SamplerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sampler2D" => Some(SamplerKind::Sampler2D),
            "sampler3D" => Some(SamplerKind::Sampler3D),
            "samplerCube" => Some(SamplerKind::SamplerCube),
            "sampler2DArray" => Some(SamplerKind::Sampler2DArray),
            _ => None,
        }
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            SamplerKind::Sampler2D => "sampler2D",
            SamplerKind::Sampler3D => "sampler3D",
            SamplerKind::SamplerCube => "samplerCube",
            SamplerKind::Sampler2DArray => "sampler2DArray",
        }
    }

    pub fn hlsl_texture(self) -> &'static str {
        match self {
            SamplerKind::Sampler2D => "Texture2D<float4>",
            SamplerKind::Sampler3D => "Texture3D<float4>",
            SamplerKind::SamplerCube => "TextureCube<float4>",
            SamplerKind::Sampler2DArray => "Texture2DArray<float4>",
        }
    }

    /// 运行时 `sg_image_type` 枚举名
    pub fn image_type(self) -> &'static str {
        match self {
            SamplerKind::Sampler2D => "SG_IMAGETYPE_2D",
            SamplerKind::Sampler3D => "SG_IMAGETYPE_3D",
            SamplerKind::SamplerCube => "SG_IMAGETYPE_CUBE",
            SamplerKind::Sampler2DArray => "SG_IMAGETYPE_ARRAY",
        }
    }
}

/// varying 的插值方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Smooth,
    Flat,
    NoPerspective,
}

impl Interpolation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "smooth" => Some(Interpolation::Smooth),
            "flat" => Some(Interpolation::Flat),
            "noperspective" => Some(Interpolation::NoPerspective),
            _ => None,
        }
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            Interpolation::Smooth => "smooth",
            Interpolation::Flat => "flat",
            Interpolation::NoPerspective => "noperspective",
        }
    }

    pub fn hlsl_name(self) -> &'static str {
        match self {
            Interpolation::Smooth => "linear",
            Interpolation::Flat => "nointerpolation",
            Interpolation::NoPerspective => "noperspective",
        }
    }
}

/// Shader 的执行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Vertex, Stage::Fragment];

    /// 中间文件名后缀
    pub fn suffix(self) -> &'static str {
        match self {
            Stage::Vertex => "vs",
            Stage::Fragment => "fs",
        }
    }

    /// 预处理时定义的宏
    pub fn define(self) -> &'static str {
        match self {
            Stage::Vertex => "SP_VS",
            Stage::Fragment => "SP_FS",
        }
    }

    /// glslangValidator / spirv-cross 的 stage 参数
    pub fn tool_stage(self) -> &'static str {
        match self {
            Stage::Vertex => "vert",
            Stage::Fragment => "frag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub location: u32,
    pub ty: ValueType,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Varying {
    pub interp: Option<Interpolation>,
    pub ty: ValueType,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub ty: ValueType,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sampler {
    pub kind: SamplerKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uniform {
    pub ty: ValueType,
    pub name: String,
    /// 数组长度，`None` 表示非数组
    pub count: Option<u32>,
}

impl Uniform {
    /// 占用的 word 数
    pub fn words(&self) -> u32 {
        self.ty.size() * self.count.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: String,
    pub uniforms: Vec<Uniform>,
    /// 布局后的大小，单位 word
    pub size: u32,
}

impl UniformBlock {
    pub fn size_bytes(&self) -> u32 {
        self.size * 4
    }
}

/// `#pragma permutation NAME COUNT` 声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationDecl {
    pub name: String,
    pub count: u32,
}

/// 某个 permutation 开关的取值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationValue {
    pub name: String,
    pub value: u32,
}

/// 在多个 shader 之间按名字去重的条目
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for UniformBlock {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Sampler {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Attribute {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_table() {
        for ty in ValueType::ALL {
            assert_eq!(ValueType::from_name(ty.name()), Some(ty));
            assert!(ty.size() >= 1);
            assert_eq!(4 % ty.align(), 0);
        }
        assert_eq!(ValueType::Vec3.size(), 3);
        assert_eq!(ValueType::Vec3.align(), 4);
        assert_eq!(ValueType::Mat4.size(), 16);
        assert_eq!(ValueType::from_name("dvec2"), None);
    }

    #[test]
    fn test_uniform_words() {
        let u = Uniform {
            ty: ValueType::Vec4,
            name: "lights".to_string(),
            count: Some(8),
        };
        assert_eq!(u.words(), 32);
    }
}
