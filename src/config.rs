use std::ffi::OsStr;
use std::fs::File;

use anyhow::{anyhow, Context};
use justconfig::error::ConfigError;
use justconfig::item::{MapAction, StringItem, ValueExtractor};
use justconfig::processors::Trim;
use justconfig::sources::env::Env;
use justconfig::sources::text::ConfigText;
use justconfig::ConfPath;
use justconfig::Config;

use crate::knn::strategy::CellValue;

// Set some default values
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_NEIGHBORHOOD_SIZE_K: usize = 5;
const DEFAULT_MAX_GROUP_RECOMMENDATIONS: usize = 10;
const DEFAULT_ACTOR_SIMILARITY_THRESHOLD: f64 = 0.5;
const DEFAULT_GROUPING_CELL_VALUE: &str = "presence";

pub struct AppConfig {
    pub log: LogConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
    pub logic: LogicConfig,
}

pub struct LogConfig {
    pub level: String,
}

pub struct DataConfig {
    pub purchases_path: String,
    pub listings_path: String,
    pub restaurants_path: String,
}

pub struct ModelConfig {
    pub neighborhood_size_k: usize,
    pub max_group_recommendations: usize,
    pub actor_similarity_threshold: f64,
    pub grouping_cell_value: CellValue,
}

pub struct LogicConfig {
    pub same_category_only: bool,
    pub exclude_interacted: bool,
}

impl AppConfig {
    /// Reads the config file if it exists, then lets environment variables
    /// fill in the data paths and the log level.
    pub fn new(config_path: &str) -> anyhow::Result<AppConfig> {
        let mut conf = Config::default();

        if let Ok(config_file) = File::open(config_path) {
            let config_text = ConfigText::new(config_file, config_path)
                .map_err(|error| anyhow!("{:?}", error))
                .with_context(|| format!("loading configuration file {} failed", config_path))?;
            conf.add_source(config_text);
        }

        let config_env = Env::new(&[
            (
                ConfPath::from(&["data", "purchases_path"]),
                OsStr::new("PURCHASES_DATA"),
            ),
            (
                ConfPath::from(&["data", "listings_path"]),
                OsStr::new("LISTINGS_DATA"),
            ),
            (
                ConfPath::from(&["data", "restaurants_path"]),
                OsStr::new("RESTAURANTS_DATA"),
            ),
            (ConfPath::from(&["log", "level"]), OsStr::new("LOG_LEVEL")),
        ]);
        conf.add_source(config_env);

        AppConfig::parse(&conf)
    }

    fn parse(conf: &Config) -> anyhow::Result<AppConfig> {
        Ok(AppConfig {
            log: LogConfig::parse(conf, ConfPath::from(&["log"])),
            data: DataConfig::parse(conf, ConfPath::from(&["data"]))?,
            model: ModelConfig::parse(conf, ConfPath::from(&["model"]))?,
            logic: LogicConfig::parse(conf, ConfPath::from(&["logic"])),
        })
    }
}

impl LogConfig {
    fn parse(conf: &Config, path: ConfPath) -> LogConfig {
        LogConfig {
            level: conf
                .get(path.push("level"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(DEFAULT_LOG_LEVEL)),
        }
    }
}

impl DataConfig {
    fn parse(conf: &Config, path: ConfPath) -> anyhow::Result<DataConfig> {
        let required = |key: &str| -> anyhow::Result<String> {
            conf.get(path.push(key))
                .unquote()
                .value()
                .map_err(|error| anyhow!("data.{} is not configured: {:?}", key, error))
        };

        Ok(DataConfig {
            purchases_path: required("purchases_path")?,
            listings_path: required("listings_path")?,
            restaurants_path: required("restaurants_path")?,
        })
    }
}

impl ModelConfig {
    fn parse(conf: &Config, path: ConfPath) -> anyhow::Result<ModelConfig> {
        let grouping_cell_value: String = conf
            .get(path.push("grouping_cell_value"))
            .unquote()
            .value()
            .unwrap_or_else(|_| String::from(DEFAULT_GROUPING_CELL_VALUE));

        Ok(ModelConfig {
            neighborhood_size_k: conf
                .get(path.push("neighborhood_size_k"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_NEIGHBORHOOD_SIZE_K),
            max_group_recommendations: conf
                .get(path.push("max_group_recommendations"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_MAX_GROUP_RECOMMENDATIONS),
            actor_similarity_threshold: conf
                .get(path.push("actor_similarity_threshold"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_ACTOR_SIMILARITY_THRESHOLD),
            grouping_cell_value: grouping_cell_value
                .parse()
                .map_err(|error: String| anyhow!("model.grouping_cell_value: {}", error))?,
        })
    }
}

impl LogicConfig {
    fn parse(conf: &Config, path: ConfPath) -> LogicConfig {
        LogicConfig {
            same_category_only: conf
                .get(path.push("same_category_only"))
                .trim()
                .value()
                .unwrap_or(true),
            exclude_interacted: conf
                .get(path.push("exclude_interacted"))
                .trim()
                .value()
                .unwrap_or(true),
        }
    }
}

/// Remove quotes from configuration strings.
trait Unquote
where
    Self: Sized,
{
    fn unquote(self) -> Result<StringItem, ConfigError>;
}

impl Unquote for Result<StringItem, ConfigError> {
    /// Trims the value and strips one pair of surrounding double quotes, if
    /// present. Unquoted values are kept as they are.
    fn unquote(self) -> Result<StringItem, ConfigError> {
        self?.map(|v| {
            let v = v.trim();

            if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
                MapAction::Replace(vec![v[1..v.len() - 1].to_owned()])
            } else {
                MapAction::Keep
            }
        })
    }
}
