//! Load `.pardu.toml` from a directory (CLI only). Lib callers pass [`WalkOpts`](crate::WalkOpts) directly.

use serde::Deserialize;
use std::path::Path;

use crate::utils::config::PackagePaths;
use crate::{Opts, SizeUnit};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ParduToml {
    #[serde(default)]
    settings: Settings,
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    follow_links: Option<bool>,
    all: Option<bool>,
    one_file_system: Option<bool>,
    human: Option<bool>,
    kilo: Option<bool>,
    total: Option<bool>,
    jobs: Option<usize>,
    verbose: Option<bool>,
    channel_cap: Option<usize>,
}

/// Load the config file from `dir` if present. Returns None if missing, unreadable or malformed.
pub(crate) fn load_pardu_toml(dir: &Path) -> Option<ParduToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_pardu_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_pardu_toml(s: &str) -> Result<ParduToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($set:expr, $opts:expr, $set_field:ident => $opts_field:ident) => {
        if let Some(v) = $set.$set_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &ParduToml, opts: &mut Opts) {
    let set = &file.settings;
    apply_file_opt!(set, opts, follow_links => follow_links);
    apply_file_opt!(set, opts, all => show_all);
    apply_file_opt!(set, opts, one_file_system => one_filesystem);
    apply_file_opt!(set, opts, total => total);
    apply_file_opt!(set, opts, verbose => verbose);
    apply_file_opt!(set, opts, channel_cap => channel_cap);
    if let Some(jobs) = set.jobs {
        opts.num_threads = Some(jobs);
    }
    if set.kilo == Some(true) {
        opts.unit = SizeUnit::Kilo;
    }
    if set.human == Some(true) {
        opts.unit = SizeUnit::Human;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_settings_override_defaults() {
        let file = parse_pardu_toml(
            "[settings]\nall = true\none_file_system = true\nhuman = true\njobs = 3\n",
        )
        .unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert!(opts.show_all);
        assert!(opts.one_filesystem);
        assert!(!opts.follow_links);
        assert_eq!(opts.unit, SizeUnit::Human);
        assert_eq!(opts.num_threads, Some(3));
    }

    #[test]
    fn missing_settings_table_is_empty() {
        let file = parse_pardu_toml("").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert!(!opts.show_all);
        assert_eq!(opts.unit, SizeUnit::Bytes);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(parse_pardu_toml("[settings]\njobs = \"many\"\n").is_err());
    }
}
