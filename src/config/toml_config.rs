use crate::core::pipeline::{PipelineDefinition, DEFAULT_PREVIEW_ROWS};
use crate::domain::model::{FieldRule, Origin};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for the cleaned-data preview.
const MAX_PREVIEW_ROWS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preview_rows: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Api {
        endpoint: String,
        #[serde(default)]
        timeout_seconds: Option<u64>,
    },
    Csv {
        path: String,
        #[serde(default)]
        delimiter: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    pub database: String,
    pub table: String,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_BASE})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    /// Built-in definitions mirroring the two original jobs.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "users" => Ok(Self::users_preset()),
            "movies" => Ok(Self::movies_preset()),
            other => Err(EtlError::InvalidConfigValueError {
                field: "preset".to_string(),
                value: other.to_string(),
                reason: "Unknown preset. Available presets: users, movies".to_string(),
            }),
        }
    }

    fn users_preset() -> Self {
        Self {
            pipeline: PipelineConfig {
                name: "users".to_string(),
                description: Some("Registered users from JSONPlaceholder".to_string()),
                preview_rows: None,
            },
            source: SourceConfig::Api {
                endpoint: "https://jsonplaceholder.typicode.com/users".to_string(),
                timeout_seconds: Some(30),
            },
            fields: vec![
                FieldRule::new("id").renamed("user_id"),
                FieldRule::new("name"),
                FieldRule::new("username"),
                FieldRule::new("email"),
                FieldRule::new("phone"),
                FieldRule::new("website"),
                FieldRule::new("city").derived_from("address.city"),
            ],
            load: LoadConfig {
                database: "users.db".to_string(),
                table: "registered_users".to_string(),
            },
        }
    }

    fn movies_preset() -> Self {
        Self {
            pipeline: PipelineConfig {
                name: "movies".to_string(),
                description: Some("Movie votes from a local CSV export".to_string()),
                preview_rows: None,
            },
            source: SourceConfig::Csv {
                path: "data/update.csv".to_string(),
                delimiter: None,
            },
            fields: vec![
                FieldRule::new("id"),
                FieldRule::new("title"),
                FieldRule::new("vote_average"),
                FieldRule::new("vote_count"),
            ],
            load: LoadConfig {
                database: "movies.db".to_string(),
                table: "vote_movies".to_string(),
            },
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.load.database)
    }

    pub fn preview_rows(&self) -> usize {
        self.pipeline.preview_rows.unwrap_or(DEFAULT_PREVIEW_ROWS)
    }

    pub fn origin(&self) -> Result<Origin> {
        match &self.source {
            SourceConfig::Api {
                endpoint,
                timeout_seconds,
            } => Ok(Origin::RemoteEndpoint {
                url: endpoint.clone(),
                timeout: timeout_seconds.map(Duration::from_secs),
            }),
            SourceConfig::Csv { path, delimiter } => {
                let delimiter = match delimiter {
                    Some(d) => validation::validate_delimiter("source.delimiter", d)?,
                    None => b',',
                };
                Ok(Origin::LocalFile {
                    path: PathBuf::from(path),
                    delimiter,
                })
            }
        }
    }

    /// Validates and converts into the definition handed to the pipeline.
    pub fn to_definition(&self) -> Result<PipelineDefinition> {
        self.validate()?;
        Ok(PipelineDefinition {
            name: self.pipeline.name.clone(),
            origin: self.origin()?,
            fields: self.fields.clone(),
            table: self.load.table.clone(),
            preview_rows: self.preview_rows(),
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        match &self.source {
            SourceConfig::Api {
                endpoint,
                timeout_seconds,
            } => {
                validation::validate_url("source.endpoint", endpoint)?;
                if let Some(timeout) = timeout_seconds {
                    validation::validate_range("source.timeout_seconds", *timeout, 1, 3600)?;
                }
            }
            SourceConfig::Csv { path, delimiter } => {
                validation::validate_path("source.path", path)?;
                if let Some(d) = delimiter {
                    validation::validate_delimiter("source.delimiter", d)?;
                }
            }
        }

        if self.fields.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "fields".to_string(),
            });
        }
        for rule in &self.fields {
            validation::validate_non_empty_string("fields.name", &rule.name)?;
            if let Some(from) = &rule.from {
                if from.split('.').any(|segment| segment.trim().is_empty()) {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "fields.from".to_string(),
                        value: from.clone(),
                        reason: "Path segments cannot be empty".to_string(),
                    });
                }
            }
            if let Some(rename) = &rule.rename {
                validation::validate_non_empty_string("fields.rename", rename)?;
            }
        }
        validation::validate_unique_names("fields", self.fields.iter().map(|f| f.output_name()))?;

        validation::validate_path("load.database", &self.load.database)?;
        validation::validate_non_empty_string("load.table", &self.load.table)?;

        validation::validate_range("pipeline.preview_rows", self.preview_rows(), 0, MAX_PREVIEW_ROWS)?;

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FieldType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const API_CONFIG: &str = r#"
[pipeline]
name = "users"
preview_rows = 3

[source]
type = "api"
endpoint = "https://api.example.com/users"
timeout_seconds = 10

[[fields]]
name = "id"
rename = "user_id"

[[fields]]
name = "city"
from = "address.city"
type = "text"

[load]
database = "./out/users.db"
table = "registered_users"
"#;

    #[test]
    fn test_parse_api_config() {
        let config = TomlConfig::from_toml_str(API_CONFIG).unwrap();
        assert!(config.validate().is_ok());

        let definition = config.to_definition().unwrap();
        assert_eq!(definition.name, "users");
        assert_eq!(definition.preview_rows, 3);
        assert_eq!(definition.table, "registered_users");
        assert_eq!(
            definition.origin,
            Origin::RemoteEndpoint {
                url: "https://api.example.com/users".to_string(),
                timeout: Some(Duration::from_secs(10)),
            }
        );
        assert_eq!(
            definition.fields,
            vec![
                FieldRule::new("id").renamed("user_id"),
                FieldRule::new("city")
                    .derived_from("address.city")
                    .typed(FieldType::Text),
            ]
        );
    }

    #[test]
    fn test_parse_csv_config() {
        let content = r#"
[pipeline]
name = "movies"

[source]
type = "csv"
path = "data/update.csv"
delimiter = ";"

[[fields]]
name = "id"

[load]
database = "movies.db"
table = "vote_movies"
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        let definition = config.to_definition().unwrap();

        assert_eq!(definition.preview_rows, DEFAULT_PREVIEW_ROWS);
        assert_eq!(
            definition.origin,
            Origin::LocalFile {
                path: PathBuf::from("data/update.csv"),
                delimiter: b';',
            }
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TABLOAD_TEST_API_BASE", "https://test.api.com");

        let content = API_CONFIG.replace("https://api.example.com", "${TABLOAD_TEST_API_BASE}");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(
            config.source,
            SourceConfig::Api {
                endpoint: "https://test.api.com/users".to_string(),
                timeout_seconds: Some(10),
            }
        );

        std::env::remove_var("TABLOAD_TEST_API_BASE");
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = API_CONFIG.replace("https://api.example.com/users", "invalid-url");
        let config = TomlConfig::from_toml_str(&invalid_url).unwrap();
        assert!(config.validate().is_err());

        let duplicate = API_CONFIG.replace("rename = \"user_id\"", "rename = \"city\"");
        let config = TomlConfig::from_toml_str(&duplicate).unwrap();
        assert!(config.validate().is_err());

        // 只差大小寫的欄位在 SQLite 中視為同名
        let case_clash = API_CONFIG.replace("rename = \"user_id\"", "rename = \"CITY\"");
        let config = TomlConfig::from_toml_str(&case_clash).unwrap();
        assert!(config.validate().is_err());

        let bad_path = API_CONFIG.replace("address.city", "address..city");
        let config = TomlConfig::from_toml_str(&bad_path).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_source_type_is_rejected() {
        let content = API_CONFIG.replace("type = \"api\"", "type = \"ftp\"");
        assert!(matches!(
            TomlConfig::from_toml_str(&content),
            Err(EtlError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_presets() {
        let users = TomlConfig::preset("users").unwrap();
        assert!(users.validate().is_ok());
        assert_eq!(users.load.table, "registered_users");
        assert_eq!(users.fields[0].output_name(), "user_id");

        let movies = TomlConfig::preset("movies").unwrap();
        assert!(movies.validate().is_ok());
        assert_eq!(movies.database_path(), PathBuf::from("movies.db"));

        assert!(TomlConfig::preset("orders").is_err());
    }

    #[test]
    fn test_shipped_pipeline_files() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("pipelines");

        let movies = TomlConfig::from_file(dir.join("movies.toml")).unwrap();
        let definition = movies.to_definition().unwrap();
        assert_eq!(definition.table, "vote_movies");
        assert_eq!(
            definition.fields[3],
            FieldRule::new("vote_count").typed(FieldType::Integer)
        );

        let users = TomlConfig::from_file(dir.join("users.toml")).unwrap();
        let definition = users.to_definition().unwrap();
        assert_eq!(
            definition.origin,
            Origin::RemoteEndpoint {
                url: "https://jsonplaceholder.typicode.com/users".to_string(),
                timeout: Some(Duration::from_secs(30)),
            }
        );
        assert_eq!(definition.fields.len(), 7);
        assert!(users.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(API_CONFIG.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "users");
    }
}
