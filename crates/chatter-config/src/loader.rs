use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::CoordinatorConfig;

/// Ordered list of config file locations searched from lowest to highest
/// priority. Later files override earlier ones.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("/etc/chatter/config.yaml"));
    paths.push(PathBuf::from("/etc/chatter/config.yml"));

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/chatter/config.yaml"));
        paths.push(home.join(".config/chatter/config.yml"));
    }
    if let Some(cfg) = dirs::config_dir() {
        paths.push(cfg.join("chatter/config.yaml"));
        paths.push(cfg.join("chatter/config.yml"));
    }

    paths.push(PathBuf::from(".chatter/config.yaml"));
    paths.push(PathBuf::from(".chatter/config.yml"));
    paths.push(PathBuf::from("chatter.yaml"));
    paths.push(PathBuf::from("chatter.yml"));

    paths
}

/// Load configuration by deep-merging all discovered YAML layers, with
/// `extra` (e.g. a `--config` flag) applied last.
pub fn load(extra: Option<&Path>) -> anyhow::Result<CoordinatorConfig> {
    let mut merged = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());

    for path in config_search_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let layer: serde_yaml::Value = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            merge_yaml(&mut merged, layer);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        let text =
            std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
        let layer: serde_yaml::Value =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", p.display()))?;
        merge_yaml(&mut merged, layer);
    }

    let config: CoordinatorConfig =
        if matches!(merged, serde_yaml::Value::Mapping(ref m) if m.is_empty()) {
            CoordinatorConfig::default()
        } else {
            serde_yaml::from_value(merged).context("deserializing merged config")?
        };
    Ok(config)
}

fn merge_yaml(dst: &mut serde_yaml::Value, src: serde_yaml::Value) {
    match (dst, src) {
        (serde_yaml::Value::Mapping(d), serde_yaml::Value::Mapping(s)) => {
            for (k, v) in s {
                let entry = d
                    .entry(k)
                    .or_insert(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
                merge_yaml(entry, v);
            }
        }
        (dst, src) => *dst = src,
    }
}
