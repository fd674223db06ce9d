//! INI file configuration adapter.

use crate::domain::error::TallyError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TallyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_string(content: &str) -> Result<Self, TallyError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, file: &str) -> Result<Self, TallyError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TallyError::ConfigParse {
                file: file.to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    fn typed<T>(
        &self,
        section: &str,
        key: &str,
        expected: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, TallyError> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) => parse(raw.trim()).map(Some).ok_or_else(|| {
                TallyError::invalid(section, key, format!("'{}' is not {}", raw, expected))
            }),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .filter(|v| !v.trim().is_empty())
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, TallyError> {
        self.typed(section, key, "an integer", |v| v.parse().ok())
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, TallyError> {
        self.typed(section, key, "a number", |v| {
            v.parse::<f64>().ok().filter(|x| x.is_finite())
        })
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, TallyError> {
        self.typed(section, key, "a boolean", Self::parse_bool)
    }
}
