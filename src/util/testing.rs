//! Test support: logging setup and capture fixtures.

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;

use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let noisy_modules = ["globset", "rayon"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Package of a capture fixture: one function `F` in `<last segment>.go`,
/// one unit per `(lines, count)` pair laid out back to back.
pub struct FixturePackage<'a> {
    pub import_path: &'a str,
    pub units: &'a [(u32, u64)],
}

impl<'a> FixturePackage<'a> {
    pub fn new(import_path: &'a str, units: &'a [(u32, u64)]) -> Self {
        Self { import_path, units }
    }
}

/// Writes `covmeta.<hash>` plus one `covcounters.<hash>.1.1` into `dir`.
pub fn write_capture(dir: &Path, hash: &str, packages: &[FixturePackage<'_>]) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    let mut meta_packages = Vec::new();
    let mut counters = Vec::new();
    for (pkg_idx, package) in packages.iter().enumerate() {
        let mut units = Vec::new();
        let mut line = 1;
        for &(lines, _) in package.units {
            units.push(json!({
                "start_line": line,
                "start_col": 1,
                "end_line": line + lines.saturating_sub(1),
                "end_col": 2,
            }));
            line += lines;
        }
        let file = package
            .import_path
            .rsplit('/')
            .next()
            .unwrap_or(package.import_path);
        meta_packages.push(json!({
            "import_path": package.import_path,
            "module_path": "example.com/fixture",
            "functions": [{ "name": "F", "file": format!("{file}.go"), "units": units }],
        }));
        let counts: Vec<u64> = package.units.iter().map(|&(_, count)| count).collect();
        counters.push(json!({ "package": pkg_idx, "function": 0, "counts": counts }));
    }

    fs::write(
        dir.join(format!("covmeta.{hash}")),
        json!({ "packages": meta_packages }).to_string(),
    )?;
    fs::write(
        dir.join(format!("covcounters.{hash}.1.1")),
        json!({ "counters": counters }).to_string(),
    )
}

/// Writes a capture whose meta artifact is not valid JSON.
pub fn write_corrupt_capture(dir: &Path, hash: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(format!("covmeta.{hash}")), "not json")?;
    fs::write(dir.join(format!("covcounters.{hash}.1.1")), "{}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_fixture_when_written_then_both_artifacts_exist() {
        let temp = TempDir::new().unwrap();
        write_capture(temp.path(), "h1", &[FixturePackage::new("a/b", &[(3, 1)])]).unwrap();

        assert!(temp.path().join("covmeta.h1").is_file());
        assert!(temp.path().join("covcounters.h1.1.1").is_file());
    }
}
