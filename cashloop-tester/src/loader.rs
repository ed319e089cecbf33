use cashloop_game::{BuildingCatalog, DataLoader, QuizBank, RulesConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads rules and content from JSON files, falling back to the built-in
/// data for anything not given.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    pub rules: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub quizzes: Option<PathBuf>,
}

fn read_json<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> Result<T, serde_json::Error>,
) -> Result<T, LoaderError> {
    let raw = fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&raw).map_err(|source| LoaderError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl DataLoader for FileLoader {
    type Error = LoaderError;

    fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
        self.rules.as_deref().map_or_else(
            || Ok(RulesConfig::default_config()),
            |path| read_json(path, RulesConfig::from_json),
        )
    }

    fn load_catalog(&self) -> Result<BuildingCatalog, Self::Error> {
        self.catalog.as_deref().map_or_else(
            || Ok(BuildingCatalog::default_catalog()),
            |path| read_json(path, BuildingCatalog::from_json),
        )
    }

    fn load_quizzes(&self) -> Result<QuizBank, Self::Error> {
        self.quizzes.as_deref().map_or_else(
            || Ok(QuizBank::default_bank()),
            |path| read_json(path, QuizBank::from_json),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashloop_game::ChapterId;

    #[test]
    fn defaults_to_builtin_content() {
        let loader = FileLoader::default();
        assert_eq!(loader.load_rules().unwrap(), RulesConfig::default_config());
        assert_eq!(
            loader.load_catalog().unwrap().len(),
            BuildingCatalog::default_catalog().len()
        );
    }

    #[test]
    fn reads_rule_overrides_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "cashloop-rules-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{ "economy": { "win_threshold": 320 } }"#).unwrap();
        let loader = FileLoader {
            rules: Some(path.clone()),
            ..FileLoader::default()
        };
        assert_eq!(loader.load_rules().unwrap().economy.win_threshold, 320);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn reads_quiz_bank_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "cashloop-quizzes-{}.json",
            std::process::id()
        ));
        let raw = r#"{
            "budgeting": [
                { "prompt": "Need or want?", "options": ["Need", "Want"], "answer": 0 }
            ]
        }"#;
        fs::write(&path, raw).unwrap();
        let loader = FileLoader {
            quizzes: Some(path.clone()),
            ..FileLoader::default()
        };
        let bank = loader.load_quizzes().unwrap();
        assert_eq!(bank.questions(ChapterId::Budgeting).len(), 1);
        assert!(bank.questions(ChapterId::Saving).is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let loader = FileLoader {
            catalog: Some(PathBuf::from("/nonexistent/catalog.json")),
            ..FileLoader::default()
        };
        assert!(matches!(
            loader.load_catalog(),
            Err(LoaderError::Io { .. })
        ));
    }
}
