use crate::model::MonitorConfig;
use config::{Config, File, FileFormat};
use pulse_core::{PulseError, Result};
use std::path::{Path, PathBuf};

/// 配置加载器
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// 加载配置；文件不存在时返回带示例目标的默认配置
    pub fn load(&self) -> Result<MonitorConfig> {
        if !self.config_path.exists() {
            return Ok(MonitorConfig::with_default_targets());
        }

        let path = self
            .config_path
            .to_str()
            .ok_or_else(|| PulseError::Config("Invalid config path".to_string()))?;

        let config = Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .build()
            .map_err(|e| PulseError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| PulseError::Config(e.to_string()))
    }

    /// 加载并校验；校验失败在启动期即是致命错误
    pub fn load_validated(&self) -> Result<MonitorConfig> {
        let config = self.load()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("pulse.toml"));

        let config = loader.load().unwrap();
        assert_eq!(config.targets.len(), 4);
        assert_eq!(config.schedules.quick.interval_minutes, 15);
        assert_eq!(config.thresholds.critical.health_score, 70.0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pulse.toml");

        let content = r#"
[[targets]]
id = "prod-shop"
name = "Production Shop"
url = "https://shop.example.com"
environment = "production"
criticality = "high"
enabled = true
tags = ["storefront"]

[schedules.quick]
enabled = true
interval_minutes = 5
targets = ["prod-shop"]

[schedules.comprehensive]
enabled = true
interval_minutes = 30

[schedules.deep]
enabled = false
interval_minutes = 1440

[maintenance]
windows = ["01:00-03:00"]
skip_during_maintenance = true
"#;
        fs::write(&path, content).unwrap();

        let config = ConfigLoader::new(&path).load_validated().unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].id, "prod-shop");
        assert_eq!(config.schedules.quick.interval_minutes, 5);
        assert!(!config.schedules.deep.enabled);
        assert_eq!(config.maintenance.windows, vec!["01:00-03:00".to_string()]);
        // 未出现在文件里的段落回落到默认值
        assert_eq!(config.history.retention_days, 90);
    }

    #[test]
    fn test_validation_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pulse.toml");

        let content = r#"
[[targets]]
id = "prod-shop"
name = "Production Shop"
url = ""
environment = "production"
criticality = "high"
enabled = true
tags = []
"#;
        fs::write(&path, content).unwrap();

        assert!(ConfigLoader::new(&path).load_validated().is_err());
    }
}
