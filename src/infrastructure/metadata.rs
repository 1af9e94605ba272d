//! Process-environment metadata source.

use crate::domain::{Metadata, MetadataSource};

/// Maps `<prefix>KEY=value` environment variables to `key = value`.
///
/// `COVTREE_META_TEST=unit` becomes `test = unit` with the default prefix.
#[derive(Debug, Clone)]
pub struct EnvMetadataSource {
    prefix: String,
}

impl EnvMetadataSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Same mapping over an explicit variable list.
    pub fn collect(&self, vars: impl IntoIterator<Item = (String, String)>) -> Metadata {
        vars.into_iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(&self.prefix)?;
                if key.is_empty() {
                    return None;
                }
                Some((key.to_lowercase(), value))
            })
            .collect()
    }
}

impl MetadataSource for EnvMetadataSource {
    fn metadata(&self) -> Metadata {
        self.collect(std::env::vars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_prefixed_vars_when_collecting_then_keys_are_lowercased() {
        let source = EnvMetadataSource::new("COVTREE_META_");
        let vars = vec![
            ("COVTREE_META_TEST".to_string(), "unit".to_string()),
            ("COVTREE_META_".to_string(), "ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];

        let metadata = source.collect(vars);

        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("test").map(String::as_str), Some("unit"));
    }
}
