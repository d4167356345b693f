//! Loading and saving JSON documents: configuration, captured feed payloads and snapshots.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads a JSON-encoded type from a given file `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<D> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot decode {}", path.display()))
}

/// JSON-encodes the `value` in pretty-printed form and writes it to a given `path`.
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("cannot write {}", path.display()))
}

pub trait ReadJsonFile<D> {
    fn read_json_file(path: impl AsRef<Path>) -> anyhow::Result<D>;
}

impl<D: DeserializeOwned> ReadJsonFile<D> for D {
    fn read_json_file(path: impl AsRef<Path>) -> anyhow::Result<D> {
        read_json(path)
    }
}

pub trait WriteJsonFile<S: Serialize> {
    fn write_json_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()>;
}

impl<S: Serialize> WriteJsonFile<S> for S {
    fn write_json_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::sim::SimConfig;

    #[test]
    fn config_round_trip_through_file() {
        let path = env::temp_dir().join(format!("hipodrom-sim-config-{}.json", std::process::id()));
        let config = SimConfig::track();
        config.write_json_file(&path).unwrap();
        let loaded = SimConfig::read_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SimConfig::read_json_file("/nonexistent/hipodrom.json").unwrap_err();
        assert_eq!("cannot open /nonexistent/hipodrom.json", err.to_string());
    }
}
