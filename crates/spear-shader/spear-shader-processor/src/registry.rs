//! 跨 shader 去重的全局名字表

use indexmap::{IndexMap, IndexSet};

use crate::error::ShaderError;
use crate::types::Named;

/// 按首次出现的顺序编号，索引从 1 开始（0 为生成代码中的空条目）
#[derive(Debug, Clone)]
pub struct NameTable<T> {
    what: &'static str,
    entries: IndexMap<String, T>,
}

impl<T: Named + PartialEq> NameTable<T> {
    pub fn new(what: &'static str) -> Self {
        Self {
            what,
            entries: IndexMap::new(),
        }
    }

    /// 登记一个条目，返回 1-based 索引；同名但定义不同时报错
    pub fn add(&mut self, item: T) -> Result<u32, ShaderError> {
        if let Some((index, _, existing)) = self.entries.get_full(item.name()) {
            if *existing != item {
                return Err(ShaderError::Conflict {
                    what: self.what,
                    name: item.name().to_string(),
                });
            }
            return Ok(index as u32 + 1);
        }

        let (index, _) = self.entries.insert_full(item.name().to_string(), item);
        Ok(index as u32 + 1)
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.entries.get_index_of(name).map(|i| i as u32 + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// permutation 开关名，0-based
#[derive(Debug, Clone, Default)]
pub struct PermutationNames {
    names: IndexSet<String>,
}

impl PermutationNames {
    pub fn add(&mut self, name: &str) -> usize {
        match self.names.get_index_of(name) {
            Some(index) => index,
            None => self.names.insert_full(name.to_string()).0,
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
