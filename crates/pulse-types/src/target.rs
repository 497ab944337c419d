use serde::{Deserialize, Serialize};

/// 部署环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
        }
    }
}

/// 目标重要程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

/// 监控目标
///
/// 由配置提供的只读参考数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringTarget {
    /// 目标 ID
    pub id: String,

    /// 目标名称
    pub name: String,

    /// 目标 URL
    pub url: String,

    /// 部署环境
    pub environment: Environment,

    /// 重要程度
    pub criticality: Criticality,

    /// 是否启用
    pub enabled: bool,

    /// 目标标签
    pub tags: Vec<String>,
}

impl MonitoringTarget {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            environment,
            criticality: Criticality::Medium,
            enabled: true,
            tags: Vec::new(),
        }
    }

    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_builder() {
        let target = MonitoringTarget::new(
            "prod-admin",
            "Production Admin",
            "https://example.com/admin",
            Environment::Production,
        )
        .with_criticality(Criticality::High);

        assert_eq!(target.id, "prod-admin");
        assert_eq!(target.criticality, Criticality::High);
        assert!(target.enabled);
    }

    #[test]
    fn test_environment_serialization() {
        let json = serde_json::to_string(&Environment::Production).unwrap();
        assert_eq!(json, "\"production\"");
    }
}
