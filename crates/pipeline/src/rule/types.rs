//! 매칭 룰 데이터 타입
//!
//! 설정 파일의 `[[rules.rule]]`과 YAML 룰 파일에서 역직렬화되는 구조체를 정의합니다.

use serde::{Deserialize, Serialize};

use syslog_relay_core::config::RuleConfig;

use crate::error::RelayPipelineError;

/// 룰 ID 최대 길이
const MAX_RULE_ID_LEN: usize = 256;

/// 패턴 최대 길이
const MAX_PATTERN_LEN: usize = 4096;

/// 매칭 룰 -- 이름 있는 정규식 하나
///
/// # YAML 스키마
/// ```yaml
/// id: ios-reload
/// pattern: "%SYS-5-RELOAD"
/// description: Device reload requested
/// enabled: true
/// ```
///
/// 패턴은 라인 전체가 아니라 라인 안의 어느 위치와도 매칭될 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRule {
    /// 룰 고유 ID
    pub id: String,
    /// 정규식 패턴
    pub pattern: String,
    /// 룰 설명
    #[serde(default)]
    pub description: String,
    /// 활성화 여부 (비활성 룰은 로드되지만 평가되지 않음)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl MatchRule {
    /// 새 활성 룰을 생성합니다.
    pub fn new(id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            description: String::new(),
            enabled: true,
        }
    }

    /// 룰의 유효성을 검증합니다. 정규식 컴파일은 분류기가 수행합니다.
    pub fn validate(&self) -> Result<(), RelayPipelineError> {
        if self.id.trim().is_empty() {
            return Err(RelayPipelineError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(RelayPipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
            });
        }

        if self.pattern.is_empty() {
            return Err(RelayPipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "pattern must not be empty".to_owned(),
            });
        }

        if self.pattern.len() > MAX_PATTERN_LEN {
            return Err(RelayPipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("pattern must not exceed {MAX_PATTERN_LEN} characters"),
            });
        }

        Ok(())
    }
}

impl From<&RuleConfig> for MatchRule {
    fn from(rule: &RuleConfig) -> Self {
        Self {
            id: rule.id.clone(),
            pattern: rule.pattern.clone(),
            description: rule.description.clone(),
            enabled: rule.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_yaml() {
        let rule: MatchRule = serde_yaml::from_str("id: r1\npattern: \"%SYS-5-RELOAD\"").unwrap();
        assert_eq!(rule.id, "r1");
        assert!(rule.enabled);
        assert!(rule.description.is_empty());
    }

    #[test]
    fn deserialize_disabled_rule() {
        let rule: MatchRule =
            serde_yaml::from_str("id: r1\npattern: x\nenabled: false").unwrap();
        assert!(!rule.enabled);
    }

    #[test]
    fn validate_rejects_empty_id() {
        let rule = MatchRule::new("  ", "x");
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_pattern() {
        let err = MatchRule::new("r1", "").validate().unwrap_err();
        assert!(err.to_string().contains("r1"));
    }

    #[test]
    fn validate_rejects_long_id() {
        let rule = MatchRule::new("a".repeat(MAX_RULE_ID_LEN + 1), "x");
        assert!(rule.validate().is_err());
    }

    #[test]
    fn converts_from_config() {
        let config = RuleConfig {
            id: "config-change".to_owned(),
            pattern: "%SYS-5-CONFIG_I".to_owned(),
            description: "desc".to_owned(),
            enabled: false,
        };
        let rule = MatchRule::from(&config);
        assert_eq!(rule.id, "config-change");
        assert!(!rule.enabled);
    }
}
