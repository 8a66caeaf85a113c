// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporter configuration.

use crate::{errors::ConfigParseError, output::Color, reporter::ReporterKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

/// Settings for the reporter, read from the default config and an optional repository config.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReporterConfig {
    kind: ReporterKind,
    show_timing_info: bool,
    show_line_numbers: bool,
    color: Color,
    helper_frames: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigImpl {
    reporter: ReporterConfig,
}

impl ReporterConfig {
    /// The path, relative to the repository root, of the config file.
    pub const CONFIG_PATH: &'static str = ".config/dtester.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from `.config/dtester.toml`
    /// under `root`.
    ///
    /// A file passed in explicitly must exist. If no file is passed in and `root` doesn't have
    /// `.config/dtester.toml`, the default config is used.
    pub fn from_sources(
        root: impl AsRef<Utf8Path>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (
                file.to_owned(),
                File::new(file.as_str(), FileFormat::Toml),
            ),
            None => {
                let file = config_path(root.as_ref());
                let source = File::new(file.as_str(), FileFormat::Toml).required(false);
                (file, source)
            }
        };

        let config = Self::make_default_config()
            .add_source(source)
            .build()
            .and_then(|config| config.try_deserialize::<ConfigImpl>())
            .map_err(|err| ConfigParseError::new(config_file, err))?;
        Ok(config.reporter)
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        let config = Self::make_default_config()
            .build()
            .expect("default config is always valid");
        config
            .try_deserialize::<ConfigImpl>()
            .expect("default config is always valid")
            .reporter
    }

    /// Returns the backend to report with.
    pub fn kind(&self) -> ReporterKind {
        self.kind
    }

    /// Returns whether the summary includes the elapsed time.
    pub fn show_timing_info(&self) -> bool {
        self.show_timing_info
    }

    /// Returns whether source locations include line numbers.
    pub fn show_line_numbers(&self) -> bool {
        self.show_line_numbers
    }

    /// Returns when to use colors.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Returns the functions whose frames are skipped when locating a failure.
    pub fn helper_frames(&self) -> &[String] {
        &self.helper_frames
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }
}

/// Returns the path a repository's config is read from.
pub fn config_path(root: &Utf8Path) -> Utf8PathBuf {
    root.join(ReporterConfig::CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorClassifier;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write_config(dir: &Utf8TempDir, contents: &str) -> Utf8PathBuf {
        let path = config_path(dir.path());
        fs::create_dir_all(path.parent().expect("config path has a parent")).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn default_config_is_valid() {
        let config = ReporterConfig::default_config();
        assert_eq!(config.kind(), ReporterKind::Auto);
        assert!(config.show_timing_info());
        assert!(config.show_line_numbers());
        assert_eq!(config.color(), Color::Auto);
        assert_eq!(
            config.helper_frames(),
            ErrorClassifier::DEFAULT_HELPER_FRAMES
        );
    }

    #[test]
    fn missing_repository_config_uses_defaults() {
        let dir = Utf8TempDir::new().unwrap();
        let config = ReporterConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config.kind(), ReporterKind::Auto);
        assert!(config.show_timing_info());
    }

    #[test]
    fn repository_config_overrides_defaults() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(
            &dir,
            indoc! {r#"
                [reporter]
                kind = "tap"
                show-line-numbers = false
                color = "never"
            "#},
        );

        let config = ReporterConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config.kind(), ReporterKind::Tap);
        assert!(!config.show_line_numbers());
        assert_eq!(config.color(), Color::Never);
        // Not set in the file.
        assert!(config.show_timing_info());
        assert_eq!(config.helper_frames().len(), 3);
    }

    #[test]
    fn explicit_config_file() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("ci.toml");
        fs::write(&path, "[reporter]\nshow-timing-info = false\n").unwrap();

        let config = ReporterConfig::from_sources(dir.path(), Some(&path)).unwrap();
        assert!(!config.show_timing_info());
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");

        let error = ReporterConfig::from_sources(dir.path(), Some(&path)).unwrap_err();
        assert_eq!(error.config_file(), path);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(&dir, "[reporter]\nkind = \"junit\"\n");

        let error = ReporterConfig::from_sources(dir.path(), None).unwrap_err();
        assert_eq!(error.config_file(), path);
    }
}
