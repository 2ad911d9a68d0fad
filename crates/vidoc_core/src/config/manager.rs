//! Loading and persisting the settings file.
//!
//! Every write lands in a sibling temp file first and is renamed over the
//! target. Section updates edit one table of the on-disk document with
//! `toml_edit` so hand-written comments in other tables are kept.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not edit config document: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("[{section}] {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Owns the settings file and the in-memory [`Settings`] read from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Nothing is read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until [`save`](Self::save) or
    /// [`update_section`](Self::update_section).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read an existing file. Values are range-checked.
    pub fn load(&mut self) -> ConfigResult<()> {
        let content = self.read_existing()?;
        let settings: Settings = toml::from_str(&content)?;
        check_ranges(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Read the file, or write the defaults when there is none.
    ///
    /// A file with missing keys or unknown tables is rewritten in normalized
    /// form after loading.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            self.settings = Settings::default();
            self.save()?;
            tracing::info!("[Config] Wrote defaults to {}", self.config_path.display());
            return Ok(());
        }

        let content = self.read_existing()?;
        let settings: Settings = toml::from_str(&content)?;
        check_ranges(&settings)?;
        let stale = needs_rewrite(&content, &settings)?;
        self.settings = settings;

        if stale {
            tracing::debug!("[Config] Normalizing {}", self.config_path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Create every folder named in `[paths]`.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let p = &self.settings.paths;
        for dir in [
            &p.upload_folder,
            &p.segments_folder,
            &p.output_folder,
            &p.jobs_folder,
            &p.logs_folder,
            &p.temp_root,
        ] {
            let dir = Path::new(dir);
            fs::create_dir_all(dir).map_err(io_at(dir))?;
        }
        Ok(())
    }

    /// Rewrite the whole file from the in-memory settings.
    pub fn save(&self) -> ConfigResult<()> {
        let mut out = String::from("# vidoc settings\n");
        for section in ConfigSection::ALL {
            out.push_str(&format!(
                "\n# {}\n[{}]\n",
                section.comment(),
                section.table_name()
            ));
            out.push_str(&self.section_body(section)?);
        }
        self.write_atomic(&out)
    }

    /// Replace one table on disk with its in-memory values.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        check_ranges(&self.settings)?;
        let mut doc = if self.config_path.exists() {
            self.read_existing()?.parse::<DocumentMut>()?
        } else {
            DocumentMut::new()
        };

        let table: DocumentMut = self.section_body(section)?.parse()?;
        doc[section.table_name()] = Item::Table(table.as_table().clone());
        self.write_atomic(&doc.to_string())
    }

    fn read_existing(&self) -> ConfigResult<String> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        fs::read_to_string(&self.config_path).map_err(io_at(&self.config_path))
    }

    fn section_body(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        Ok(match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Validation => toml::to_string_pretty(&s.validation)?,
            ConfigSection::Transcription => toml::to_string_pretty(&s.transcription)?,
            ConfigSection::Scenes => toml::to_string_pretty(&s.scenes)?,
            ConfigSection::Segments => toml::to_string_pretty(&s.segments)?,
            ConfigSection::Clips => toml::to_string_pretty(&s.clips)?,
            ConfigSection::Gif => toml::to_string_pretty(&s.gif)?,
            ConfigSection::Workers => toml::to_string_pretty(&s.workers)?,
            ConfigSection::Cleanup => toml::to_string_pretty(&s.cleanup)?,
        })
    }

    fn write_atomic(&self, content: &str) -> ConfigResult<()> {
        let target = &self.config_path;
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_at(parent))?;
        }

        let tmp = target.with_extension("toml.tmp");
        let mut file = fs::File::create(&tmp).map_err(io_at(&tmp))?;
        file.write_all(content.as_bytes()).map_err(io_at(&tmp))?;
        file.sync_all().map_err(io_at(&tmp))?;
        drop(file);
        fs::rename(&tmp, target).map_err(io_at(target))
    }
}

/// True when `content` has unknown tables or differs in value from what
/// `settings` serializes to.
fn needs_rewrite(content: &str, settings: &Settings) -> ConfigResult<bool> {
    let doc: DocumentMut = content.parse()?;
    let unknown = doc
        .iter()
        .any(|(key, _)| !ConfigSection::ALL.iter().any(|s| s.table_name() == key));
    if unknown {
        return Ok(true);
    }

    let on_disk: toml::Table = toml::from_str(content)?;
    let normalized: toml::Table = toml::from_str(&toml::to_string_pretty(settings)?)?;
    Ok(on_disk != normalized)
}

/// Reject values the pipeline cannot work with.
fn check_ranges(s: &Settings) -> ConfigResult<()> {
    let invalid = |section: &'static str, message: String| {
        Err(ConfigError::Invalid { section, message })
    };

    if !(s.clips.min_len > 0.0 && s.clips.min_len <= s.clips.max_len) {
        return invalid(
            "clips",
            format!(
                "min_len ({}) must be positive and not above max_len ({})",
                s.clips.min_len, s.clips.max_len
            ),
        );
    }
    if s.segments.min_length < 0.0 {
        return invalid(
            "segments",
            format!("min_length must not be negative, got {}", s.segments.min_length),
        );
    }
    if s.validation.max_duration_secs <= 0.0 {
        return invalid(
            "validation",
            format!(
                "max_duration_secs must be positive, got {}",
                s.validation.max_duration_secs
            ),
        );
    }
    if s.gif.quality == 0 || s.gif.quality > 100 {
        return invalid("gif", format!("quality must be 1-100, got {}", s.gif.quality));
    }
    Ok(())
}
