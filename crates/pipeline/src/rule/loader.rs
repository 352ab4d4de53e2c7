//! 룰 파일 로더 -- YAML 룰 파일을 디스크에서 로드합니다.
//!
//! 룰 디렉토리 내의 `.yml`/`.yaml` 파일을 파일 이름 순서로 로드합니다.
//! 파일 하나에 룰 하나를 담습니다.
//! 개별 파일 파싱 실패는 경고 로그를 남기고 건너뜁니다.

use std::path::{Path, PathBuf};

use crate::error::RelayPipelineError;

use super::types::MatchRule;

const MAX_RULE_FILE_SIZE: u64 = 1024 * 1024; // 1MB
const MAX_RULES_COUNT: usize = 10_000;

/// 룰 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// 디렉토리에서 모든 YAML 룰 파일을 파일 이름 순서로 로드합니다.
    ///
    /// 중복 ID는 분류기가 처리하므로 여기서는 걸러내지 않습니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 룰 수가 `MAX_RULES_COUNT`를 초과하는 경우
    pub async fn load_directory(
        dir: impl AsRef<Path>,
    ) -> Result<Vec<MatchRule>, RelayPipelineError> {
        let dir = dir.as_ref();

        let mut entries =
            tokio::fs::read_dir(dir)
                .await
                .map_err(|e| RelayPipelineError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("failed to read directory: {e}"),
                })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| RelayPipelineError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("failed to read directory entry: {e}"),
                })?
        {
            let path = entry.path();

            // .yml / .yaml 확장자만 처리
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");

            if is_yaml {
                paths.push(path);
            }
        }

        if paths.len() > MAX_RULES_COUNT {
            return Err(RelayPipelineError::RuleLoad {
                path: dir.display().to_string(),
                reason: format!("too many rules: max {MAX_RULES_COUNT}"),
            });
        }

        // read_dir 순서는 플랫폼마다 다름
        paths.sort();

        let mut rules = Vec::with_capacity(paths.len());
        for path in &paths {
            match Self::load_file(path).await {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load rule file, skipping"
                    );
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            count = rules.len(),
            "loaded rule files"
        );

        Ok(rules)
    }

    /// 단일 YAML 파일에서 룰을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<MatchRule, RelayPipelineError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| RelayPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(RelayPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| RelayPipelineError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하여 룰을 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<MatchRule, RelayPipelineError> {
        let rule: MatchRule =
            serde_yaml::from_str(yaml_str).map_err(|e| RelayPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        rule.validate()?;

        Ok(rule)
    }
}
