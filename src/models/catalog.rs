use crate::error::{CubeRecError, Result};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Catalog {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(names: Vec<String>) -> Self {
        let lookup = names
            .iter()
            .enumerate()
            .map(|(index, name)| (Self::normalize_name(name), index))
            .collect();
        Self { names, lookup }
    }

    /// Builds a catalog from an `{"0": "name", "1": "name", ...}` id map.
    /// Keys must cover `0..N` with no gaps.
    pub fn from_id_map(id_map: HashMap<String, String>) -> Result<Self> {
        let num_items = id_map.len();
        let mut names = vec![None; num_items];

        for (key, name) in id_map {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| CubeRecError::InvalidConfig(format!("id map key {:?} is not an index", key)))?;
            if index >= num_items {
                return Err(CubeRecError::IndexOutOfRange {
                    collection: 0,
                    index,
                    num_items,
                });
            }
            names[index] = Some(name);
        }

        let names = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                name.ok_or_else(|| CubeRecError::InvalidConfig(format!("id map is missing index {}", index)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(names))
    }

    /// Lowercases and transliterates to ASCII, so "Lim-Dûl's Vault" and
    /// "lim-dul's vault" resolve to the same card.
    pub fn normalize_name(name: &str) -> String {
        deunicode::deunicode(name.trim()).to_lowercase()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(&Self::normalize_name(name)).copied()
    }

    pub fn resolve<'a, I>(&self, names: I) -> (Vec<usize>, usize)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut indices = Vec::new();
        let mut unknown = 0;
        for name in names {
            if name.trim().is_empty() {
                continue;
            }
            match self.index_of(name) {
                Some(index) => indices.push(index),
                None => unknown += 1,
            }
        }
        (indices, unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_lookup_ignores_case_and_diacritics() {
        let catalog = Catalog::new(vec!["lim-dul's vault".to_string(), "Sol Ring".to_string()]);
        assert_eq!(catalog.index_of("Lim-Dûl's Vault"), Some(0));
        assert_eq!(catalog.index_of("SOL RING"), Some(1));
        assert_eq!(catalog.index_of("Black Lotus"), None);
    }

    #[test]
    fn test_resolve_skips_unknown_and_blank_names() {
        let catalog = Catalog::new(vec!["a".to_string(), "b".to_string()]);
        let (indices, unknown) = catalog.resolve(["b", "", "my custom card", "A"]);
        assert_eq!(indices, vec![1, 0]);
        assert_eq!(unknown, 1);
    }

    #[test]
    fn test_from_id_map() {
        let catalog = Catalog::from_id_map(id_map(&[("1", "b"), ("0", "a")])).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name(0), Some("a"));
        assert_eq!(catalog.name(1), Some("b"));
    }

    #[test]
    fn test_from_id_map_rejects_gaps() {
        assert!(Catalog::from_id_map(id_map(&[("0", "a"), ("2", "c")])).is_err());
        assert!(Catalog::from_id_map(id_map(&[("zero", "a")])).is_err());
    }
}
