//! 이벤트 분류기 -- 정규식 룰로 syslog 라인을 분류합니다.
//!
//! # 룰 소스 (평가 순서)
//! 1. 설정 파일의 `[[rules.rule]]` (선언 순서)
//! 2. 설정 파일의 `rules.patterns` (`pattern-1`, `pattern-2`, ...)
//! 3. `rules.rule_dir`의 YAML 파일 (파일 이름 순서)
//!
//! # 아키텍처
//! - [`EventClassifier`]: 컴파일된 룰 집합과 매칭 정책
//! - [`loader`]: YAML 파일 로딩 및 유효성 검증
//! - [`types`]: 룰 데이터 구조 정의
//!
//! 분류는 (라인, 룰 집합)의 순수 함수입니다. 카운터나 상태를 건드리지 않으며,
//! 시작 후 룰 집합은 변경되지 않습니다.

pub mod loader;
pub mod types;

pub use loader::RuleLoader;
pub use types::MatchRule;

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use syslog_relay_core::event::{MatchedEvent, SyslogLine};

use crate::config::{MatchPolicy, PipelineConfig};
use crate::error::RelayPipelineError;

/// 컴파일된 정규식 크기 상한 (바이트)
const REGEX_SIZE_LIMIT: usize = 1024 * 1024;

/// 컴파일된 룰
#[derive(Debug)]
struct CompiledRule {
    id: String,
    regex: Regex,
}

/// 이벤트 분류기
///
/// # 사용 예시
/// ```ignore
/// let classifier = EventClassifier::load(&config).await?;
///
/// for event in classifier.classify(&line) {
///     dispatcher.dispatch(event);
/// }
/// ```
#[derive(Debug)]
pub struct EventClassifier {
    /// 활성 룰 (평가 순서)
    rules: Vec<CompiledRule>,
    /// 로드되었지만 비활성인 룰 수
    disabled: usize,
    /// 다중 매칭 정책
    policy: MatchPolicy,
}

impl EventClassifier {
    /// 룰 목록을 검증하고 정규식을 컴파일합니다.
    ///
    /// # Errors
    /// - 룰 ID 중복
    /// - 정규식 컴파일 실패
    /// - 활성 룰이 하나도 없음
    pub fn new(rules: Vec<MatchRule>, policy: MatchPolicy) -> Result<Self, RelayPipelineError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());
        let mut disabled = 0;

        for rule in rules {
            rule.validate()?;

            if !seen.insert(rule.id.clone()) {
                return Err(RelayPipelineError::RuleValidation {
                    rule_id: rule.id,
                    reason: "duplicate rule id".to_owned(),
                });
            }

            // 비활성 룰도 정규식은 검증
            let regex = RegexBuilder::new(&rule.pattern)
                .size_limit(REGEX_SIZE_LIMIT)
                .build()
                .map_err(|e| RelayPipelineError::RuleValidation {
                    rule_id: rule.id.clone(),
                    reason: format!("invalid regex: {e}"),
                })?;

            if rule.enabled {
                compiled.push(CompiledRule { id: rule.id, regex });
            } else {
                tracing::debug!(rule_id = %rule.id, "rule disabled, not evaluated");
                disabled += 1;
            }
        }

        if compiled.is_empty() {
            return Err(RelayPipelineError::Config {
                field: "rules".to_owned(),
                reason: "at least one enabled rule must be configured".to_owned(),
            });
        }

        Ok(Self {
            rules: compiled,
            disabled,
            policy,
        })
    }

    /// 설정의 인라인 룰과 룰 디렉토리를 합쳐 분류기를 만듭니다.
    ///
    /// 디렉토리 룰의 ID가 이미 사용 중이면 경고 후 건너뜁니다.
    /// 인라인 룰끼리의 중복은 에러입니다.
    pub async fn load(config: &PipelineConfig) -> Result<Self, RelayPipelineError> {
        let mut rules: Vec<MatchRule> = config.rules.iter().map(MatchRule::from).collect();

        if let Some(dir) = &config.rule_dir {
            let mut ids: HashSet<String> = rules.iter().map(|r| r.id.clone()).collect();
            for rule in RuleLoader::load_directory(dir).await? {
                if !ids.insert(rule.id.clone()) {
                    tracing::warn!(
                        rule_id = %rule.id,
                        dir = %dir.display(),
                        "duplicate rule id, skipping"
                    );
                    continue;
                }
                rules.push(rule);
            }
        }

        let classifier = Self::new(rules, config.match_policy)?;
        tracing::info!(
            rules = classifier.rule_count(),
            disabled = classifier.disabled,
            policy = ?classifier.policy(),
            "event classifier ready"
        );
        Ok(classifier)
    }

    /// 라인을 분류하여 매칭된 이벤트를 반환합니다.
    ///
    /// 룰은 라인 전체가 아니라 부분 일치(search)로 평가됩니다.
    /// 매칭이 없으면 빈 벡터를 반환합니다.
    pub fn classify(&self, line: &SyslogLine) -> Vec<MatchedEvent> {
        let mut matched = self
            .rules
            .iter()
            .filter(|rule| rule.regex.is_match(line.text()));

        match self.policy {
            MatchPolicy::All => matched
                .map(|rule| MatchedEvent::new(line, rule.id.clone()))
                .collect(),
            MatchPolicy::First => matched
                .next()
                .map(|rule| MatchedEvent::new(line, rule.id.clone()))
                .into_iter()
                .collect(),
        }
    }

    /// 평가되는(활성) 룰 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 비활성 룰 수를 반환합니다.
    pub fn disabled_count(&self) -> usize {
        self.disabled
    }

    /// 활성 룰 ID를 평가 순서대로 반환합니다.
    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.id.as_str())
    }

    /// 매칭 정책을 반환합니다.
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }
}
