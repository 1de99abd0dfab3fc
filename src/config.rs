//! Component K: line-oriented `key=value` configuration, grounded on
//! `CheekyLayer::config`. Supplements the original key set with
//! `singleQueueFamily` and `layer_version` (see DESIGN.md's Open Question
//! resolutions).

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut values = HashMap::new();
        for (k, v) in DEFAULTS {
            values.insert((*k).to_owned(), (*v).to_owned());
        }
        Config { values }
    }
}

/// The original's built-in default key set, plus the two keys this crate
/// supplements (`singleQueueFamily`, `layer_version`).
const DEFAULTS: &[(&str, &str)] = &[
    ("dump", "false"),
    ("dumpDirectory", "/tmp/wiretap_dump"),
    ("override", "true"),
    ("overrideDirectory", "./override"),
    ("logFile", "wiretap_{{pid}}.log"),
    ("ruleFile", "rules.txt"),
    ("hookDraw", "false"),
    ("application", ""),
    ("pluginDirectory", "./plugins"),
    ("singleQueueFamily", "false"),
    ("layer_version", "1"),
];

impl Config {
    pub fn parse(source: &str) -> Self {
        let mut config = Config::default();
        for line in source.lines() {
            let Some((key, rest)) = line.split_once('=') else { continue };
            if key.starts_with('#') {
                continue;
            }
            config.values.insert(key.to_owned(), rest.to_owned());
        }
        config
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key) == "true"
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_present() {
        let config = Config::default();
        assert_eq!(config.get("ruleFile"), "rules.txt");
        assert!(!config.get_bool("hookDraw"));
    }

    #[test]
    fn parse_overrides_defaults_and_skips_comments() {
        let config = Config::parse("# comment line\nhookDraw=true\nruleFile=custom.txt\n");
        assert!(config.get_bool("hookDraw"));
        assert_eq!(config.get("ruleFile"), "custom.txt");
        assert_eq!(config.get("dump"), "false");
    }

    #[test]
    fn unknown_key_reads_as_empty() {
        let config = Config::default();
        assert_eq!(config.get("notAKey"), "");
        assert!(!config.has("notAKey"));
    }
}
