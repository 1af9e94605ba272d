//! Reference decoder for JSON-encoded capture directories.
//!
//! Layout of one capture directory:
//! - `covmeta.<hash>`: package/function/unit structure of one instrumented build
//! - `covcounters.<hash>.<pid>.<time>`: execution counts of one run of that build
//!
//! Every meta artifact forms one pod. The counts of all counter artifacts of a
//! pod are summed unit by unit; units without counters keep a count of 0.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::ArtifactConfig;
use crate::domain::{DecodedPackage, DecodedPod};
use crate::infrastructure::error::DecodeError;
use crate::infrastructure::traits::{FileSystem, PodDecoder};

#[derive(Debug, Deserialize)]
struct MetaFile {
    #[serde(default)]
    packages: Vec<DecodedPackage>,
}

#[derive(Debug, Deserialize)]
struct CounterFile {
    #[serde(default)]
    counters: Vec<FunctionCounters>,
}

#[derive(Debug, Deserialize)]
struct FunctionCounters {
    package: usize,
    function: usize,
    counts: Vec<u64>,
}

pub struct JsonPodDecoder {
    fs: Arc<dyn FileSystem>,
    artifacts: ArtifactConfig,
}

impl JsonPodDecoder {
    pub fn new(fs: Arc<dyn FileSystem>, artifacts: ArtifactConfig) -> Self {
        Self { fs, artifacts }
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T, DecodeError> {
        let content = self.fs.read_to_string(path).map_err(|e| DecodeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| DecodeError::malformed(path, e.to_string()))
    }

    /// Adds the counts of one counter artifact onto the pod's units.
    fn apply_counters(
        &self,
        packages: &mut [DecodedPackage],
        path: &Path,
    ) -> Result<(), DecodeError> {
        let counters: CounterFile = self.read_json(path)?;
        for entry in counters.counters {
            let function = packages
                .get_mut(entry.package)
                .and_then(|p| p.functions.get_mut(entry.function))
                .ok_or_else(|| {
                    DecodeError::malformed(
                        path,
                        format!(
                            "counter references unknown function {}/{}",
                            entry.package, entry.function
                        ),
                    )
                })?;
            if function.units.len() != entry.counts.len() {
                return Err(DecodeError::malformed(
                    path,
                    format!(
                        "function {} has {} units but {} counts",
                        function.name,
                        function.units.len(),
                        entry.counts.len()
                    ),
                ));
            }
            for (unit, count) in function.units.iter_mut().zip(entry.counts) {
                unit.count = unit.count.saturating_add(count);
            }
        }
        Ok(())
    }
}

impl PodDecoder for JsonPodDecoder {
    #[instrument(level = "debug", skip(self))]
    fn decode_pods(&self, location: &Path) -> Result<Vec<DecodedPod>, DecodeError> {
        let files = self.fs.list_files(location).map_err(|e| DecodeError::Io {
            path: location.to_path_buf(),
            source: e,
        })?;

        let mut metas: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut counters: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in files {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(hash) = name.strip_prefix(&self.artifacts.meta_prefix) {
                metas.insert(hash.to_string(), path.clone());
            } else if let Some(rest) = name.strip_prefix(&self.artifacts.counter_prefix) {
                let hash = rest.split('.').next().unwrap_or_default().to_string();
                counters.entry(hash).or_default().push(path.clone());
            }
        }

        for (hash, paths) in &counters {
            if !metas.contains_key(hash) {
                warn!(
                    "{}: {} counter file(s) without meta file for {}",
                    location.display(),
                    paths.len(),
                    hash
                );
            }
        }

        let mut pods = Vec::with_capacity(metas.len());
        for (hash, meta_path) in metas {
            let meta: MetaFile = self.read_json(&meta_path)?;
            let mut packages = meta.packages;
            for function in packages.iter_mut().flat_map(|p| p.functions.iter_mut()) {
                for unit in &mut function.units {
                    unit.count = 0;
                }
            }
            for counter_path in counters.get(&hash).into_iter().flatten() {
                self.apply_counters(&mut packages, counter_path)?;
            }
            debug!(
                "decoded pod {} with {} packages from {}",
                hash,
                packages.len(),
                location.display()
            );
            pods.push(DecodedPod {
                meta_hash: hash,
                packages,
            });
        }
        Ok(pods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    const META: &str = r#"{"packages":[{"import_path":"a/b","module_path":"a","functions":[
        {"name":"F","file":"b.go","units":[
            {"start_line":1,"start_col":1,"end_line":2,"end_col":5},
            {"start_line":3,"start_col":1,"end_line":3,"end_col":9}]}]}]}"#;

    fn decoder() -> JsonPodDecoder {
        JsonPodDecoder::new(Arc::new(RealFileSystem), ArtifactConfig::default())
    }

    #[test]
    fn given_two_counter_files_when_decoding_then_counts_are_summed() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("covmeta.h1"), META).unwrap();
        std::fs::write(
            temp.path().join("covcounters.h1.10.1"),
            r#"{"counters":[{"package":0,"function":0,"counts":[1,0]}]}"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join("covcounters.h1.11.2"),
            r#"{"counters":[{"package":0,"function":0,"counts":[2,0]}]}"#,
        )
        .unwrap();

        let pods = decoder().decode_pods(temp.path()).unwrap();

        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].meta_hash, "h1");
        let units = &pods[0].packages[0].functions[0].units;
        assert_eq!(units[0].count, 3);
        assert_eq!(units[1].count, 0);
    }

    #[test]
    fn given_counter_for_unknown_function_when_decoding_then_malformed() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("covmeta.h1"), META).unwrap();
        std::fs::write(
            temp.path().join("covcounters.h1.10.1"),
            r#"{"counters":[{"package":0,"function":4,"counts":[1]}]}"#,
        )
        .unwrap();

        let err = decoder().decode_pods(temp.path()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn given_count_length_mismatch_when_decoding_then_malformed() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("covmeta.h1"), META).unwrap();
        std::fs::write(
            temp.path().join("covcounters.h1.10.1"),
            r#"{"counters":[{"package":0,"function":0,"counts":[1,2,3]}]}"#,
        )
        .unwrap();

        assert!(decoder().decode_pods(temp.path()).is_err());
    }

    #[test]
    fn given_orphan_counter_file_when_decoding_then_ignored() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("covmeta.h1"), META).unwrap();
        std::fs::write(temp.path().join("covcounters.zz.1.1"), "not even json").unwrap();

        let pods = decoder().decode_pods(temp.path()).unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].packages[0].functions[0].units[0].count, 0);
    }
}
